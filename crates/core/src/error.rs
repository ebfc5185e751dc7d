//! 에러 타입 -- 도메인별 에러 정의

/// honeyaws 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HoneyawsError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 텔레메트리 싱크 전송 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// 처리 상태 저장소 에러
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 오브젝트 처리 실패
    #[error("object '{object}' failed: {reason}")]
    ObjectFailed { object: String, reason: String },
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 지원하지 않는 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 라인 파싱 실패
    #[error("malformed {format} record: {reason}")]
    Malformed { format: String, reason: String },

    /// 라인 포맷 정의 컴파일 실패
    #[error("invalid line format: {0}")]
    InvalidLineFormat(String),
}

/// 싱크 전송 에러
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// HTTP 요청 실패 (네트워크, 타임아웃 등)
    #[error("{sink}: request failed: {reason}")]
    Request { sink: String, reason: String },

    /// 백엔드가 비정상 상태 코드로 응답
    #[error("{sink}: unexpected status {status}")]
    Status { sink: String, status: u16 },

    /// 이벤트 직렬화 실패
    #[error("{sink}: serialization failed: {reason}")]
    Serialize { sink: String, reason: String },
}

/// 처리 상태 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// 상태 파일 읽기/쓰기 실패
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    /// 상태 데이터 손상
    #[error("state store corrupted: {0}")]
    Corrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_convert_to_top_level() {
        let err: HoneyawsError = ParseError::UnsupportedFormat("aws_nlb".to_owned()).into();
        assert!(matches!(err, HoneyawsError::Parse(_)));
        assert!(err.to_string().contains("aws_nlb"));
    }

    #[test]
    fn sink_status_display() {
        let err = SinkError::Status {
            sink: "loki".to_owned(),
            status: 401,
        };
        assert_eq!(err.to_string(), "loki: unexpected status 401");
    }
}
