//! honeyaws 공통 크레이트
//!
//! 파이프라인의 모든 단계가 공유하는 타입, 에러, 설정, trait을 정의합니다.
//!
//! # 모듈 구성
//!
//! - [`event`]: 텔레메트리 이벤트([`Event`])와 필드 값
//! - [`types`]: 로그 형식([`LogFormat`])과 다운로드된 오브젝트 참조
//! - [`pipeline`]: 파서/싱크/상태 저장소 확장 trait
//! - [`config`]: `honeyaws.toml` 설정
//! - [`error`]: 에러 타입
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ConfigError, HoneyawsError, ParseError, PipelineError, SinkError, StateError,
};

// 설정
pub use config::HoneyawsConfig;

// 이벤트
pub use event::{Event, FieldValue};

// 파이프라인 trait
pub use pipeline::{BoxFuture, DynEventSink, EventSink, LogParser, Stater};

// 도메인 타입
pub use types::{DownloadedObject, LogFormat};
