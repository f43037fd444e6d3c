//! Jittered periodic ticks
//!
//! The first tick fires after a random delay in `[period/2, 3*period/2)` so a
//! fleet started at the same moment does not poll the lock in lockstep.
//! Subsequent ticks follow every `period`.

use rand::Rng;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub struct DelayTick {
    interval: Interval,
}

impl DelayTick {
    /// Panics if `period` is zero.
    pub fn new<R: Rng + ?Sized>(period: Duration, rng: &mut R) -> Self {
        let delay = initial_delay(period, rng);
        let mut interval = interval_at(Instant::now() + delay, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

pub fn initial_delay<R: Rng + ?Sized>(period: Duration, rng: &mut R) -> Duration {
    let span = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
    if span == 0 {
        return Duration::ZERO;
    }
    period / 2 + Duration::from_nanos(rng.gen_range(0..span))
}
