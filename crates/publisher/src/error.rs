//! 퍼블리셔 에러 타입
//!
//! [`PublisherError`]는 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! 전파 정책은 에러 종류마다 다릅니다.
//!
//! - `MalformedRecord`: 라인 단위. 로깅 후 건너뛰며 절대 상위로 전파되지 않음
//! - `ParseFailure`: 오브젝트 단위. `publish()` 호출자에게 반환, 정리(cleanup) 없음
//! - `CleanupFailure`: 오브젝트 단위. 이벤트는 이미 전달된 뒤 반환됨
//! - `PublishFailure`: 이벤트 단위. 로깅 후 이벤트 폐기, 파이프라인 계속 진행
//!
//! `From<PublisherError> for HoneyawsError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다. 오브젝트 단위 에러는
//! `PipelineError::ObjectFailed`로, 설정 에러는 `ConfigError::InvalidValue`로 변환됩니다.

use std::path::PathBuf;

use honeyaws_core::error::{ConfigError, HoneyawsError, ParseError, PipelineError, SinkError};

/// 퍼블리셔 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    /// 라인 하나를 파싱하지 못함
    #[error("malformed {format} record at line {line}: {reason}")]
    MalformedRecord {
        /// 로그 형식 (aws_elb 등)
        format: String,
        /// 1부터 시작하는 라인 번호
        line: usize,
        /// 실패 사유
        reason: String,
    },

    /// 오브젝트 전체를 읽을 수 없음
    #[error("failed to parse object '{object}': {reason}")]
    ParseFailure {
        /// 오브젝트 키
        object: String,
        /// 실패 사유
        reason: String,
    },

    /// 파싱 후 로컬 파일 삭제 실패
    #[error("error cleaning up downloaded object {}: {source}", path.display())]
    CleanupFailure {
        /// 삭제하지 못한 로컬 경로
        path: PathBuf,
        /// 원인 I/O 에러
        source: std::io::Error,
    },

    /// 싱크 전송 실패
    #[error("publish to {sink} failed: {source}")]
    PublishFailure {
        /// 싱크 이름
        sink: String,
        /// 원인 에러
        source: SinkError,
    },

    /// 라인 포맷 정의 에러 (시작 시점의 복구 불가 에러)
    #[error("invalid line format: {0}")]
    LineFormat(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),
}

impl From<PublisherError> for HoneyawsError {
    fn from(err: PublisherError) -> Self {
        match err {
            PublisherError::MalformedRecord { format, reason, .. } => {
                HoneyawsError::Parse(ParseError::Malformed { format, reason })
            }
            PublisherError::LineFormat(reason) => {
                HoneyawsError::Parse(ParseError::InvalidLineFormat(reason))
            }
            PublisherError::PublishFailure { source, .. } => HoneyawsError::Sink(source),
            PublisherError::Channel(reason) => {
                HoneyawsError::Pipeline(PipelineError::ChannelSend(reason))
            }
            PublisherError::ParseFailure { object, reason } => {
                HoneyawsError::Pipeline(PipelineError::ObjectFailed { object, reason })
            }
            PublisherError::CleanupFailure { path, source } => {
                HoneyawsError::Pipeline(PipelineError::ObjectFailed {
                    object: path.display().to_string(),
                    reason: format!("cleanup failed: {source}"),
                })
            }
            PublisherError::Config { field, reason } => {
                HoneyawsError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
