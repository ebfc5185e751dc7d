//! 고정 비율 샘플러
//!
//! 키마다 1번째, N+1번째, 2N+1번째 ... 이벤트를 유지합니다 (결정적).
//! 한 주기 동안 관측되지 않은 키는 재계산 시 제거되어 메모리가 키 수에 비례해
//! 무한히 늘지 않습니다.

use std::time::{Duration, Instant};

use super::{SampleDecision, Sampler, SamplerState};

/// 고정 비율 N 샘플러
#[derive(Debug)]
pub struct SimpleSampler {
    rate: u32,
    idle_timeout: Duration,
    state: SamplerState,
}

impl SimpleSampler {
    /// `rate`개 중 1개를 유지하는 샘플러를 생성합니다. 0은 1로 취급합니다.
    pub fn new(rate: u32, idle_timeout: Duration) -> Self {
        Self {
            rate: rate.max(1),
            idle_timeout,
            state: SamplerState::new(),
        }
    }

    pub fn state(&self) -> &SamplerState {
        &self.state
    }
}

impl Sampler for SimpleSampler {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn decide(&mut self, key: &str, now: Instant) -> SampleDecision {
        let rate = self.rate;
        let state = self.state.observe(key, now, rate);
        if (state.seen - 1) % u64::from(rate) == 0 {
            SampleDecision::kept(rate)
        } else {
            SampleDecision::dropped(rate)
        }
    }

    fn recompute(&mut self, now: Instant) {
        let idle_timeout = self.idle_timeout;
        self.state
            .retain(|_, s| now.saturating_duration_since(s.last_seen) < idle_timeout);
        for (_, s) in self.state.iter_mut() {
            s.interval_count = 0;
        }
    }
}
