use std::env;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

pub const TPS_ENV_VAR: &str = "ROOM_TPS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub target_tps: u32,
    #[serde(with = "millis")]
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    /// Wall-clock frame length the headless driver simulates when waiting.
    #[serde(with = "millis")]
    pub simulated_frame: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            simulated_frame: Duration::from_millis(16),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// What one frame of wall time turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    /// Time past the per-frame tick cap that was thrown away instead of queued.
    pub dropped_backlog: Duration,
}

/// Fixed-step accumulator. Frames of arbitrary length go in, whole ticks come out.
///
/// Frames longer than `max_frame_delta` are clamped, and anything left over after
/// `max_ticks_per_frame` ticks is dropped so a stall never snowballs.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
    total_ticks: u64,
}

impl FixedStepClock {
    /// Tick rate comes from `ROOM_TPS` when set, otherwise from `config`.
    pub fn new(config: &LoopConfig) -> Self {
        Self::with_tick_rate(resolve_target_tps(config.target_tps), config)
    }

    fn with_tick_rate(target_tps: u32, config: &LoopConfig) -> Self {
        let max_frame_delta = if config.max_frame_delta.is_zero() {
            LoopConfig::default().max_frame_delta
        } else {
            config.max_frame_delta
        };
        Self {
            fixed_dt: Duration::from_secs_f64(1.0 / f64::from(target_tps.max(1))),
            max_frame_delta,
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
            total_ticks: 0,
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        self.fixed_dt.as_secs_f32()
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn advance_frame(&mut self, frame_dt: Duration) -> StepPlan {
        self.accumulator += frame_dt.min(self.max_frame_delta);
        let mut ticks_to_run = 0u32;
        while self.accumulator >= self.fixed_dt && ticks_to_run < self.max_ticks_per_frame {
            self.accumulator -= self.fixed_dt;
            ticks_to_run += 1;
        }

        let mut dropped_backlog = Duration::ZERO;
        if self.accumulator >= self.fixed_dt {
            dropped_backlog = std::mem::take(&mut self.accumulator);
            warn!(
                dropped_ms = dropped_backlog.as_millis() as u64,
                "sim_backlog_dropped"
            );
        }
        self.total_ticks = self.total_ticks.saturating_add(u64::from(ticks_to_run));
        StepPlan {
            ticks_to_run,
            dropped_backlog,
        }
    }
}

fn resolve_target_tps(config_tps: u32) -> u32 {
    let fallback = config_tps.max(1);
    match env::var(TPS_ENV_VAR) {
        Ok(value) => match value.parse::<u32>() {
            Ok(tps) if tps > 0 => tps,
            _ => {
                warn!(
                    env_var = TPS_ENV_VAR,
                    value = value.as_str(),
                    "invalid tick-rate env var value; falling back to config"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(
                env_var = TPS_ENV_VAR,
                error = %err,
                "unable to read tick-rate env var; falling back to config"
            );
            fallback
        }
    }
}
