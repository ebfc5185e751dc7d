//! 지수 이동 평균(EMA) 샘플러
//!
//! 주기마다 키별 관측 수의 이동 평균을 갱신합니다.
//!
//! ```text
//! avg_n = avg_{n-1} * (1 - decay) + count_n * decay,   avg_0 = 0
//! ```
//!
//! 목표 샘플 레이트 N에 대해 키당 목표 처리량은 `(Σavg / N) / 키 수`이고,
//! 각 키의 레이트는 `max(1, round(avg / 목표))`입니다. 트래픽이 많은 키일수록
//! 레이트가 커져 모든 키가 비슷한 절대 처리량을 유지합니다.
//! 첫 주기가 끝나기 전의 키는 레이트 1로 전부 유지됩니다.

use std::time::Instant;

use super::{SampleDecision, Sampler, SamplerState};

/// 이동 평균이 이 값 아래로 떨어진 키는 제거됩니다.
pub const EVICTION_FLOOR: f64 = 0.01;

/// EMA 샘플러
#[derive(Debug)]
pub struct EmaSampler {
    goal_rate: u32,
    decay: f64,
    state: SamplerState,
}

impl EmaSampler {
    /// 전체 목표 샘플 레이트와 가중치로 샘플러를 생성합니다.
    pub fn new(goal_rate: u32, decay: f64) -> Self {
        Self {
            goal_rate: goal_rate.max(1),
            decay,
            state: SamplerState::new(),
        }
    }

    /// 키의 현재 이동 평균
    pub fn moving_average(&self, key: &str) -> Option<f64> {
        self.state.get(key).map(|s| s.moving_avg)
    }

    /// 키에 적용 중인 레이트. 관측되지 않은 키는 1입니다.
    pub fn rate_for(&self, key: &str) -> u32 {
        self.state.get(key).map_or(1, |s| s.rate)
    }

    pub fn state(&self) -> &SamplerState {
        &self.state
    }
}

impl Sampler for EmaSampler {
    fn name(&self) -> &'static str {
        "ema"
    }

    fn decide(&mut self, key: &str, now: Instant) -> SampleDecision {
        let state = self.state.observe(key, now, 1);
        let rate = state.rate.max(1);
        if (state.interval_count - 1) % u64::from(rate) == 0 {
            SampleDecision::kept(rate)
        } else {
            SampleDecision::dropped(rate)
        }
    }

    fn recompute(&mut self, _now: Instant) {
        let decay = self.decay;
        for (_, s) in self.state.iter_mut() {
            s.moving_avg = s.moving_avg * (1.0 - decay) + s.interval_count as f64 * decay;
            s.interval_count = 0;
        }

        self.state.retain(|_, s| s.moving_avg >= EVICTION_FLOOR);
        if self.state.is_empty() {
            return;
        }

        let total: f64 = self.state.values().map(|s| s.moving_avg).sum();
        let per_key_target = total / f64::from(self.goal_rate) / self.state.len() as f64;

        for (_, s) in self.state.iter_mut() {
            s.rate = if per_key_target > 0.0 {
                let rate = (s.moving_avg / per_key_target).round();
                rate.clamp(1.0, f64::from(u32::MAX)) as u32
            } else {
                1
            };
        }
    }
}
