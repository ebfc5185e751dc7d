//! honeyaws 퍼블리셔 -- AWS 액세스 로그를 텔레메트리 이벤트로 변환해 전달
//!
//! 다운로드된 ELB/ALB/CloudFront 로그 오브젝트를 라인 단위로 파싱하고,
//! 요청 정보를 보강한 뒤 샘플링하여 Honeycomb이나 Loki 같은 백엔드로 보냅니다.
//!
//! # 모듈 구성
//!
//! - [`parser`]: 공백 구분 + 따옴표 필드 라인 파서 (ELB, ALB, CloudFront)
//! - [`shaper`]: 요청 라인을 method/path/query shape로 분해
//! - [`enrich`]: 음수 지연 시간 정리, 분산 추적 필드 재구성
//! - [`sampler`]: 키별 동적 샘플러 (simple, EMA)
//! - [`sink`]: 백엔드 싱크 (Honeycomb batch, Loki push, 채널)
//! - [`pipeline`]: 파싱 -> 샘플링 -> 싱크 전달 오케스트레이션
//! - [`config`]: 퍼블리셔 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! DownloadedObject -> FormatParser -> RequestShaper/Enricher -> Sampler -> Sinks
//!                        |                                          |           |
//!                  ELB/ALB/CloudFront                         simple/EMA   Honeycomb/Loki
//! ```

pub mod config;
pub mod enrich;
pub mod error;
pub mod pipeline;
pub mod shaper;

pub mod parser;
pub mod sampler;
pub mod sink;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{PublishSummary, Publisher, PublisherBuilder};

// 설정
pub use config::{PublisherConfig, PublisherConfigBuilder, SamplerKind};

// 에러
pub use error::PublisherError;

// 파서
pub use parser::{AlbParser, CloudFrontParser, ElbParser, FormatParser};

// 보강
pub use enrich::Enricher;
pub use shaper::RequestShaper;

// 샘플러
pub use sampler::{EmaSampler, SampleDecision, Sampler, SimpleSampler};

// 싱크
pub use sink::{ChannelSink, HoneycombSink, LokiSink};
