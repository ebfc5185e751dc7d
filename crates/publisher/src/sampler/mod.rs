//! 동적 샘플러 -- 키별 유지/드롭 결정과 샘플 레이트 부여
//!
//! 파싱된 이벤트마다 샘플링 키(상태 코드, 로드 밸런서/호스트 조합)를 만들고
//! [`Sampler`]가 유지 여부와 유효 샘플 레이트를 결정합니다.
//! 유지된 이벤트에는 `sample_rate` 필드가 기록되어, 하위 집계에서
//! `count = rate`로 가중할 수 있습니다.
//!
//! # 상태 소유 규칙
//! 키별 상태([`SamplerState`])는 [`dyn_sample`] 태스크 하나만 소유합니다.
//! 결정과 주기적 재계산은 같은 `select!` 루프에서 순차 실행되므로 잠금이 없습니다.
//!
//! # 구현체
//! - [`SimpleSampler`]: 고정 비율 N
//! - [`EmaSampler`]: 지수 이동 평균으로 키별 처리량 균등화

pub mod ema;
pub mod simple;

pub use ema::EmaSampler;
pub use simple::SimpleSampler;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use honeyaws_core::event::Event;
use honeyaws_core::metrics as m;
use honeyaws_core::types::LogFormat;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SamplerKind;

/// 샘플러 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleDecision {
    /// 이벤트를 유지할지 여부
    pub keep: bool,
    /// 유효 샘플 레이트 (유지된 이벤트 하나가 대표하는 이벤트 수)
    pub rate: u32,
}

impl SampleDecision {
    pub fn kept(rate: u32) -> Self {
        Self { keep: true, rate }
    }

    pub fn dropped(rate: u32) -> Self {
        Self { keep: false, rate }
    }
}

/// 키 하나의 샘플링 상태
#[derive(Debug, Clone, PartialEq)]
pub struct KeyState {
    /// 누적 관측 이벤트 수
    pub seen: u64,
    /// 현재 주기 동안 관측된 이벤트 수
    pub interval_count: u64,
    /// 주기별 관측 수의 이동 평균
    pub moving_avg: f64,
    /// 현재 적용 중인 샘플 레이트
    pub rate: u32,
    /// 마지막 관측 시각
    pub last_seen: Instant,
}

impl KeyState {
    fn new(now: Instant, rate: u32) -> Self {
        Self {
            seen: 0,
            interval_count: 0,
            moving_avg: 0.0,
            rate,
            last_seen: now,
        }
    }
}

/// 샘플링 키 → 상태 맵
///
/// 두 샘플러 구현이 공유하는 저장소입니다.
#[derive(Debug, Default)]
pub struct SamplerState {
    keys: HashMap<String, KeyState>,
}

impl SamplerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 키의 관측을 기록하고 상태를 반환합니다. 새 키는 `initial_rate`로 시작합니다.
    pub fn observe(&mut self, key: &str, now: Instant, initial_rate: u32) -> &mut KeyState {
        let state = self
            .keys
            .entry(key.to_owned())
            .or_insert_with(|| KeyState::new(now, initial_rate));
        state.seen += 1;
        state.interval_count += 1;
        state.last_seen = now;
        state
    }

    pub fn get(&self, key: &str) -> Option<&KeyState> {
        self.keys.get(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut KeyState)> {
        self.keys.iter_mut()
    }

    pub fn values(&self) -> impl Iterator<Item = &KeyState> {
        self.keys.values()
    }

    /// 조건을 만족하지 않는 키를 제거하고 제거된 수를 반환합니다.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &KeyState) -> bool) -> usize {
        let before = self.keys.len();
        self.keys.retain(|k, v| keep(k, v));
        before - self.keys.len()
    }
}

/// 샘플링 전략
pub trait Sampler: Send {
    /// 로그에 사용하는 전략 이름
    fn name(&self) -> &'static str;

    /// 키의 이벤트 하나에 대한 유지 여부와 레이트를 결정합니다.
    fn decide(&mut self, key: &str, now: Instant) -> SampleDecision;

    /// 주기마다 호출되어 키별 레이트를 재계산합니다.
    fn recompute(&mut self, now: Instant);
}

/// 설정에 맞는 샘플러를 생성합니다.
pub fn build_sampler(
    kind: SamplerKind,
    sample_rate: u32,
    decay: f64,
    interval: Duration,
) -> Box<dyn Sampler> {
    match kind {
        SamplerKind::Simple => Box::new(SimpleSampler::new(sample_rate, interval)),
        SamplerKind::Ema => Box::new(EmaSampler::new(sample_rate, decay)),
    }
}

/// 이벤트의 샘플링 키
///
/// - ELB/ALB: `{elb_status_code}_{backend_status_code}_{elb}`
/// - CloudFront: `{sc_status}_{x_edge_result_type}_{cs_host}`
///
/// 없는 필드는 `-`로 표시됩니다.
pub fn sample_key(format: LogFormat, event: &Event) -> String {
    let fields: [&str; 3] = match format {
        LogFormat::Elb | LogFormat::Alb => ["elb_status_code", "backend_status_code", "elb"],
        LogFormat::CloudFront => ["sc_status", "x_edge_result_type", "cs_host"],
    };
    fields
        .iter()
        .map(|f| {
            event
                .get(f)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_owned())
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// 파싱된 이벤트를 샘플링해 다음 단계로 넘기는 장기 실행 루프
///
/// `input`이 닫히거나 `output` 수신측이 사라지면 종료합니다.
/// `interval`마다 샘플러 레이트를 재계산합니다.
pub async fn dyn_sample(
    mut sampler: Box<dyn Sampler>,
    format: LogFormat,
    interval: Duration,
    mut input: mpsc::Receiver<Event>,
    output: mpsc::Sender<Event>,
) {
    info!(
        sampler = sampler.name(),
        interval_secs = interval.as_secs(),
        "sampler started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 첫 tick은 즉시 완료됨
    ticker.tick().await;

    let mut kept: u64 = 0;
    let mut dropped: u64 = 0;

    loop {
        tokio::select! {
            received = input.recv() => {
                let Some(mut event) = received else {
                    debug!("parsed channel closed");
                    break;
                };
                let key = sample_key(format, &event);
                let decision = sampler.decide(&key, tokio::time::Instant::now().into_std());
                if !decision.keep {
                    dropped += 1;
                    metrics::counter!(m::SAMPLER_EVENTS_DROPPED_TOTAL).increment(1);
                    continue;
                }

                event.set_sample_rate(decision.rate);
                kept += 1;
                metrics::counter!(m::SAMPLER_EVENTS_KEPT_TOTAL).increment(1);
                if output.send(event).await.is_err() {
                    warn!("sampled channel closed, stopping sampler");
                    break;
                }
            }
            _ = ticker.tick() => {
                sampler.recompute(tokio::time::Instant::now().into_std());
                debug!(sampler = sampler.name(), kept, dropped, "sample rates recomputed");
            }
        }
    }

    info!(kept, dropped, "sampler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lb_event(status: i64, backend: Option<i64>, elb: &str) -> Event {
        let mut ev = Event::new(Utc::now());
        ev.insert("elb_status_code", status);
        if let Some(b) = backend {
            ev.insert("backend_status_code", b);
        }
        ev.insert("elb", elb);
        ev
    }

    #[test]
    fn sample_key_for_load_balancers() {
        let ev = lb_event(200, Some(200), "my-lb");
        assert_eq!(sample_key(LogFormat::Elb, &ev), "200_200_my-lb");
        let ev = lb_event(504, None, "my-lb");
        assert_eq!(sample_key(LogFormat::Alb, &ev), "504_-_my-lb");
    }

    #[test]
    fn sample_key_for_cloudfront() {
        let mut ev = Event::new(Utc::now());
        ev.insert("sc_status", 200_i64);
        ev.insert("x_edge_result_type", "Hit");
        ev.insert("cs_host", "d111111abcdef8.cloudfront.net");
        assert_eq!(
            sample_key(LogFormat::CloudFront, &ev),
            "200_Hit_d111111abcdef8.cloudfront.net"
        );
        assert_eq!(sample_key(LogFormat::CloudFront, &Event::new(Utc::now())), "-_-_-");
    }

    #[test]
    fn state_observe_counts_and_retains() {
        let now = Instant::now();
        let mut state = SamplerState::new();
        state.observe("a", now, 1);
        state.observe("a", now, 1);
        state.observe("b", now, 7);
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("a").unwrap().seen, 2);
        assert_eq!(state.get("b").unwrap().rate, 7);

        let removed = state.retain(|k, _| k == "a");
        assert_eq!(removed, 1);
        assert!(state.get("b").is_none());
    }

    #[tokio::test]
    async fn dyn_sample_annotates_and_drops() {
        let (in_tx, in_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let sampler = build_sampler(SamplerKind::Simple, 2, 0.5, Duration::from_secs(300));
        let task = tokio::spawn(dyn_sample(
            sampler,
            LogFormat::Elb,
            Duration::from_secs(300),
            in_rx,
            out_tx,
        ));

        for _ in 0..4 {
            in_tx.send(lb_event(200, Some(200), "lb")).await.unwrap();
        }
        drop(in_tx);
        task.await.unwrap();

        let mut kept = Vec::new();
        while let Some(ev) = out_rx.recv().await {
            kept.push(ev);
        }
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|ev| ev.sample_rate() == 2));
    }

    #[tokio::test]
    async fn dyn_sample_stops_when_output_closes() {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, out_rx) = mpsc::channel(1);
        drop(out_rx);
        let sampler = build_sampler(SamplerKind::Simple, 1, 0.5, Duration::from_secs(300));
        let task = tokio::spawn(dyn_sample(
            sampler,
            LogFormat::Elb,
            Duration::from_secs(300),
            in_rx,
            out_tx,
        ));
        in_tx.send(lb_event(200, Some(200), "lb")).await.unwrap();
        task.await.unwrap();
    }
}
