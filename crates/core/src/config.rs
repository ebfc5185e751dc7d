//! 설정 관리 -- honeyaws.toml 파싱 및 런타임 설정
//!
//! [`HoneyawsConfig`]는 파이프라인, 샘플러, 싱크 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 데몬에서 적용)
//! 2. 환경변수 (`HONEYAWS_PUBLISHER_EDGE_MODE=true` 형식)
//! 3. 설정 파일 (`honeyaws.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), honeyaws_core::error::HoneyawsError> {
//! use honeyaws_core::config::HoneyawsConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HoneyawsConfig::load("honeyaws.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HoneyawsConfig::parse("[sampler]\nsampler_type = \"ema\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HoneyawsError};
use crate::types::LogFormat;

/// 데이터셋 이름에서 로그 형식의 서비스명으로 치환되는 자리표시자
pub const SERVICE_PLACEHOLDER: &str = "$SERVICE";

/// honeyaws 통합 설정
///
/// `honeyaws.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoneyawsConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 퍼블리셔(파싱/보강) 설정
    #[serde(default)]
    pub publisher: PublisherSection,
    /// 동적 샘플러 설정
    #[serde(default)]
    pub sampler: SamplerSection,
    /// 구조화 이벤트 싱크 (Honeycomb) 설정
    #[serde(default)]
    pub honeycomb: HoneycombSection,
    /// HTTP 로그 집계 싱크 (Loki) 설정
    #[serde(default)]
    pub loki: LokiSection,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl HoneyawsConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HoneyawsError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HoneyawsError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HoneyawsError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HoneyawsError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HoneyawsError> {
        toml::from_str(toml_str).map_err(|e| {
            HoneyawsError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `HONEYAWS_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "HONEYAWS_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "HONEYAWS_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.state_dir, "HONEYAWS_GENERAL_STATE_DIR");

        // Publisher
        override_parsed(&mut self.publisher.format, "HONEYAWS_PUBLISHER_FORMAT");
        override_string(&mut self.publisher.dataset, "HONEYAWS_PUBLISHER_DATASET");
        override_parsed(
            &mut self.publisher.sample_rate,
            "HONEYAWS_PUBLISHER_SAMPLE_RATE",
        );
        override_string(
            &mut self.publisher.environment,
            "HONEYAWS_PUBLISHER_ENVIRONMENT",
        );
        override_parsed(&mut self.publisher.edge_mode, "HONEYAWS_PUBLISHER_EDGE_MODE");
        override_parsed(
            &mut self.publisher.trace_enrichment,
            "HONEYAWS_PUBLISHER_TRACE_ENRICHMENT",
        );
        override_parsed(
            &mut self.publisher.channel_capacity,
            "HONEYAWS_PUBLISHER_CHANNEL_CAPACITY",
        );
        override_parsed(
            &mut self.publisher.flush_interval_ms,
            "HONEYAWS_PUBLISHER_FLUSH_INTERVAL_MS",
        );

        // Sampler
        override_string(
            &mut self.sampler.sampler_type,
            "HONEYAWS_SAMPLER_SAMPLER_TYPE",
        );
        override_parsed(
            &mut self.sampler.interval_secs,
            "HONEYAWS_SAMPLER_INTERVAL_SECS",
        );
        override_parsed(&mut self.sampler.decay, "HONEYAWS_SAMPLER_DECAY");

        // Honeycomb
        override_parsed(&mut self.honeycomb.enabled, "HONEYAWS_HONEYCOMB_ENABLED");
        override_string(&mut self.honeycomb.api_host, "HONEYAWS_HONEYCOMB_API_HOST");
        override_string(
            &mut self.honeycomb.write_key,
            "HONEYAWS_HONEYCOMB_WRITE_KEY",
        );
        override_parsed(
            &mut self.honeycomb.batch_size,
            "HONEYAWS_HONEYCOMB_BATCH_SIZE",
        );
        override_parsed(
            &mut self.honeycomb.timeout_secs,
            "HONEYAWS_HONEYCOMB_TIMEOUT_SECS",
        );

        // Loki
        override_parsed(&mut self.loki.enabled, "HONEYAWS_LOKI_ENABLED");
        override_string(&mut self.loki.endpoint, "HONEYAWS_LOKI_ENDPOINT");
        override_string(&mut self.loki.user_id, "HONEYAWS_LOKI_USER_ID");
        override_string(&mut self.loki.api_key, "HONEYAWS_LOKI_API_KEY");
        override_parsed(&mut self.loki.timeout_secs, "HONEYAWS_LOKI_TIMEOUT_SECS");

        // Metrics
        override_parsed(&mut self.metrics.enabled, "HONEYAWS_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "HONEYAWS_METRICS_LISTEN_ADDR",
        );
        override_parsed(&mut self.metrics.port, "HONEYAWS_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HoneyawsError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.publisher.sample_rate == 0 {
            return Err(invalid("publisher.sample_rate", "must be at least 1"));
        }

        if self.publisher.channel_capacity == 0 {
            return Err(invalid("publisher.channel_capacity", "must be at least 1"));
        }

        if self.publisher.flush_interval_ms == 0 {
            return Err(invalid("publisher.flush_interval_ms", "must be greater than 0"));
        }

        let valid_samplers = ["simple", "ema"];
        if !valid_samplers.contains(&self.sampler.sampler_type.as_str()) {
            return Err(invalid(
                "sampler.sampler_type",
                format!("must be one of: {}", valid_samplers.join(", ")),
            ));
        }

        if self.sampler.interval_secs == 0 {
            return Err(invalid("sampler.interval_secs", "must be greater than 0"));
        }

        // decay는 (0, 1) 개구간이어야 함
        if !(self.sampler.decay > 0.0 && self.sampler.decay < 1.0) {
            return Err(invalid("sampler.decay", "must lie in (0, 1)"));
        }

        if self.honeycomb.enabled {
            if self.honeycomb.write_key.is_empty() {
                return Err(invalid(
                    "honeycomb.write_key",
                    "must not be empty when honeycomb is enabled",
                ));
            }
            if self.honeycomb.batch_size == 0 {
                return Err(invalid("honeycomb.batch_size", "must be at least 1"));
            }
        }

        if self.loki.enabled && self.loki.endpoint.is_empty() {
            return Err(invalid(
                "loki.endpoint",
                "must not be empty when loki is enabled",
            ));
        }

        Ok(())
    }

    /// `$SERVICE` 자리표시자를 로그 형식의 서비스명으로 치환한 데이터셋 이름
    pub fn resolved_dataset(&self) -> String {
        self.publisher
            .dataset
            .replace(SERVICE_PLACEHOLDER, self.publisher.format.service())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> HoneyawsError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 처리 상태 파일을 저장할 디렉토리
    pub state_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            state_dir: ".".to_owned(),
        }
    }
}

/// 퍼블리셔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSection {
    /// 입력 로그 형식
    pub format: LogFormat,
    /// 데이터셋 이름 (`$SERVICE`는 서비스명으로 치환)
    pub dataset: String,
    /// 목표 샘플 레이트 (N개 중 1개 전송)
    pub sample_rate: u32,
    /// 스트림 레이블에 사용하는 환경 이름
    pub environment: String,
    /// 로드 밸런서의 부모 trace id를 무시하고 항상 루트 스팬으로 취급
    pub edge_mode: bool,
    /// ALB trace 헤더로부터 trace 필드를 재구성할지 여부
    pub trace_enrichment: bool,
    /// 단계 간 채널 용량 (1이면 사실상 무버퍼 핸드오프)
    pub channel_capacity: usize,
    /// 배치 싱크에 쌓인 이벤트를 주기적으로 flush하는 간격 (ms)
    pub flush_interval_ms: u64,
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self {
            format: LogFormat::Elb,
            dataset: "aws-$SERVICE-access".to_owned(),
            sample_rate: 1,
            environment: "dev".to_owned(),
            edge_mode: false,
            trace_enrichment: false,
            channel_capacity: 1,
            flush_interval_ms: 1000,
        }
    }
}

/// 동적 샘플러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSection {
    /// 샘플러 종류 (simple, ema)
    pub sampler_type: String,
    /// 샘플 레이트 재계산 주기 (초)
    pub interval_secs: u64,
    /// EMA 가중치. (0,1) 범위이며 클수록 최근 관측에 민감
    pub decay: f64,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            sampler_type: "simple".to_owned(),
            interval_secs: 300,
            decay: 0.5,
        }
    }
}

/// 구조화 이벤트 싱크 (Honeycomb batch API) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoneycombSection {
    /// 활성화 여부
    pub enabled: bool,
    /// API 호스트
    pub api_host: String,
    /// 팀 write key
    pub write_key: String,
    /// 한 번에 전송할 최대 이벤트 수
    pub batch_size: usize,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for HoneycombSection {
    fn default() -> Self {
        Self {
            enabled: false,
            api_host: "https://api.honeycomb.io/".to_owned(),
            write_key: String::new(),
            batch_size: 50,
            timeout_secs: 10,
        }
    }
}

/// HTTP 로그 집계 싱크 (Loki push API) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LokiSection {
    /// 활성화 여부
    pub enabled: bool,
    /// push 엔드포인트 전체 URL
    pub endpoint: String,
    /// Basic 인증 사용자 ID
    pub user_id: String,
    /// Basic 인증 API 키
    pub api_key: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for LokiSection {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            user_id: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}
