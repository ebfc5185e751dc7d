//! 퍼블리셔 설정
//!
//! [`PublisherConfig`]는 core의 [`HoneyawsConfig`]에서 `[publisher]`와
//! `[sampler]` 섹션을 모아 파이프라인 전용 설정으로 변환합니다.
//!
//! # 사용 예시
//! ```
//! use honeyaws_core::config::HoneyawsConfig;
//! use honeyaws_publisher::config::PublisherConfig;
//!
//! let core_config = HoneyawsConfig::default();
//! let config = PublisherConfig::from_core(&core_config);
//! assert_eq!(config.dataset, "aws-elb-access");
//! ```

use std::str::FromStr;
use std::time::Duration;

use honeyaws_core::config::HoneyawsConfig;
use honeyaws_core::types::LogFormat;
use serde::{Deserialize, Serialize};

use crate::error::PublisherError;

/// 동적 샘플러 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    /// 키마다 고정 비율 N (기본값)
    #[default]
    Simple,
    /// 지수 이동 평균 기반 처리량 균등화
    Ema,
}

impl FromStr for SamplerKind {
    type Err = PublisherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "ema" => Ok(Self::Ema),
            other => Err(PublisherError::Config {
                field: "sampler_type".to_owned(),
                reason: format!("unknown sampler '{other}', expected simple or ema"),
            }),
        }
    }
}

/// 퍼블리셔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// 입력 로그 형식
    pub format: LogFormat,
    /// `$SERVICE`가 치환된 데이터셋 이름
    pub dataset: String,
    /// 목표 샘플 레이트
    pub sample_rate: u32,
    /// 환경 이름 (Loki 스트림 레이블)
    pub environment: String,
    /// ALB 부모 trace id 무시 여부
    pub edge_mode: bool,
    /// ALB trace 필드 재구성 여부
    pub trace_enrichment: bool,
    /// 단계 간 채널 용량
    pub channel_capacity: usize,
    /// 싱크 주기적 flush 간격
    pub flush_interval: Duration,
    /// 샘플러 종류
    pub sampler: SamplerKind,
    /// 샘플 레이트 재계산 주기
    pub sampler_interval: Duration,
    /// EMA 가중치
    pub decay: f64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Elb,
            dataset: "aws-elb-access".to_owned(),
            sample_rate: 1,
            environment: "dev".to_owned(),
            edge_mode: false,
            trace_enrichment: false,
            channel_capacity: 1,
            flush_interval: Duration::from_secs(1),
            sampler: SamplerKind::Simple,
            sampler_interval: Duration::from_secs(300),
            decay: 0.5,
        }
    }
}

impl PublisherConfig {
    /// core 설정에서 퍼블리셔 설정을 생성합니다.
    ///
    /// 알 수 없는 샘플러 이름은 `validate()`가 core 단계에서 이미 거르므로
    /// 여기서는 기본값(simple)으로 대체합니다.
    pub fn from_core(core: &HoneyawsConfig) -> Self {
        Self {
            format: core.publisher.format,
            dataset: core.resolved_dataset(),
            sample_rate: core.publisher.sample_rate,
            environment: core.publisher.environment.clone(),
            edge_mode: core.publisher.edge_mode,
            trace_enrichment: core.publisher.trace_enrichment,
            channel_capacity: core.publisher.channel_capacity,
            flush_interval: Duration::from_millis(core.publisher.flush_interval_ms),
            sampler: core.sampler.sampler_type.parse().unwrap_or_default(),
            sampler_interval: Duration::from_secs(core.sampler.interval_secs),
            decay: core.sampler.decay,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PublisherError> {
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

        if self.sample_rate == 0 {
            return Err(config_error("sample_rate", "must be at least 1"));
        }

        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(config_error(
                "channel_capacity",
                format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            ));
        }

        if self.flush_interval.is_zero() {
            return Err(config_error("flush_interval", "must be greater than 0"));
        }

        if self.sampler_interval.is_zero() {
            return Err(config_error("sampler_interval", "must be greater than 0"));
        }

        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(config_error("decay", "must lie in (0, 1)"));
        }

        if self.dataset.is_empty() {
            return Err(config_error("dataset", "must not be empty"));
        }

        Ok(())
    }
}

fn config_error(field: &str, reason: impl Into<String>) -> PublisherError {
    PublisherError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// 퍼블리셔 설정 빌더
#[derive(Default)]
pub struct PublisherConfigBuilder {
    config: PublisherConfig,
}

impl PublisherConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 입력 로그 형식을 설정합니다.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    /// 데이터셋 이름을 설정합니다.
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.config.dataset = dataset.into();
        self
    }

    /// 목표 샘플 레이트를 설정합니다.
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.config.sample_rate = rate;
        self
    }

    /// 환경 이름을 설정합니다.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = environment.into();
        self
    }

    pub fn edge_mode(mut self, edge_mode: bool) -> Self {
        self.config.edge_mode = edge_mode;
        self
    }

    pub fn trace_enrichment(mut self, enabled: bool) -> Self {
        self.config.trace_enrichment = enabled;
        self
    }

    /// 단계 간 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 싱크 주기적 flush 간격을 설정합니다.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// 샘플러 종류를 설정합니다.
    pub fn sampler(mut self, sampler: SamplerKind) -> Self {
        self.config.sampler = sampler;
        self
    }

    /// 샘플 레이트 재계산 주기를 설정합니다.
    pub fn sampler_interval(mut self, interval: Duration) -> Self {
        self.config.sampler_interval = interval;
        self
    }

    /// EMA 가중치를 설정합니다.
    pub fn decay(mut self, decay: f64) -> Self {
        self.config.decay = decay;
        self
    }

    /// 설정을 검증하고 `PublisherConfig`를 생성합니다.
    pub fn build(self) -> Result<PublisherConfig, PublisherError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
