//! 채널 싱크

use honeyaws_core::error::SinkError;
use honeyaws_core::event::Event;
use honeyaws_core::pipeline::EventSink;
use tokio::sync::mpsc;

/// 유지된 이벤트를 mpsc 채널로 넘기는 싱크
///
/// 라이브러리로 임베딩할 때나 테스트에서 전달된 이벤트를 관찰할 때 사용합니다.
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    async fn send(&mut self, event: &Event) -> Result<(), SinkError> {
        self.tx
            .send(event.clone())
            .await
            .map_err(|_| SinkError::Request {
                sink: "channel".to_owned(),
                reason: "receiver dropped".to_owned(),
            })
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
