//! 파이프라인 trait -- 파서, 싱크, 상태 저장소 확장 포인트 정의

use std::future::Future;
use std::pin::Pin;

use crate::error::{HoneyawsError, ParseError, SinkError};
use crate::event::Event;
use crate::types::LogFormat;

/// `dyn` 호환 trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 로그 라인 파서 trait
///
/// 새로운 액세스 로그 형식을 지원하려면 이 trait을 구현합니다.
pub trait LogParser: Send + Sync {
    /// 파서가 처리하는 로그 형식
    fn format(&self) -> LogFormat;

    /// 원시 라인 하나를 이벤트로 파싱합니다.
    ///
    /// 빈 줄이나 헤더 지시어처럼 이벤트가 없는 라인은 `Ok(None)`을 반환합니다.
    fn parse_line(&self, line: &str) -> Result<Option<Event>, ParseError>;
}

/// 텔레메트리 백엔드로 이벤트를 전달하는 싱크 trait
///
/// 배치/재시도 정책은 구현체가 소유합니다. 파이프라인은 이벤트 단위 에러를
/// 로깅만 하고 재시도하지 않습니다.
pub trait EventSink: Send + Sync {
    /// 로그와 메트릭 레이블에 사용하는 싱크 이름
    fn name(&self) -> &str;

    /// 이벤트 하나를 전송합니다.
    fn send(&mut self, event: &Event) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// 버퍼링된 전송을 모두 내보냅니다. 종료 시 한 번 호출됩니다.
    fn flush(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// dyn-compatible 싱크 trait
///
/// `EventSink`는 RPITIT를 사용하므로 `dyn EventSink`가 불가합니다.
/// `DynEventSink`는 `BoxFuture`를 반환하여 `Vec<Box<dyn DynEventSink>>`로
/// 여러 싱크를 함께 관리할 수 있게 합니다.
pub trait DynEventSink: Send + Sync {
    /// 싱크 이름
    fn name(&self) -> &str;

    /// 이벤트 하나를 전송합니다.
    fn send<'a>(&'a mut self, event: &'a Event) -> BoxFuture<'a, Result<(), SinkError>>;

    /// 버퍼링된 전송을 모두 내보냅니다.
    fn flush(&mut self) -> BoxFuture<'_, Result<(), SinkError>>;
}

/// EventSink를 구현한 타입은 자동으로 DynEventSink도 구현됩니다.
impl<T: EventSink> DynEventSink for T {
    fn name(&self) -> &str {
        EventSink::name(self)
    }

    fn send<'a>(&'a mut self, event: &'a Event) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(EventSink::send(self, event))
    }

    fn flush(&mut self) -> BoxFuture<'_, Result<(), SinkError>> {
        Box::pin(EventSink::flush(self))
    }
}

/// 오브젝트 처리 상태 저장소 trait
///
/// 여러 인스턴스가 같은 오브젝트 집합을 처리할 때의 조정(잠금) 방식은
/// 구현체의 책임입니다. 파이프라인은 `Publish` 전후로 조회/기록만 합니다.
pub trait Stater: Send + Sync {
    /// 오브젝트가 이미 처리되었는지 확인합니다.
    fn is_processed(&self, object: &str)
    -> impl Future<Output = Result<bool, HoneyawsError>> + Send;

    /// 오브젝트를 처리 완료로 기록합니다.
    fn mark_processed(&self, object: &str)
    -> impl Future<Output = Result<(), HoneyawsError>> + Send;
}
