use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Fixed-rate repeating task. Each tick runs to completion; the token is
/// checked before every tick, so cancelling never cuts a frame short.
pub(crate) struct FrameLoop {
    period: Duration,
    cancel: CancellationToken,
}

impl FrameLoop {
    pub(crate) fn new(fps: u32, cancel: CancellationToken) -> Self {
        let fps = fps.clamp(1, 240);
        Self {
            period: Duration::from_secs_f64(1.0 / fps as f64),
            cancel,
        }
    }

    #[cfg(test)]
    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    /// Runs `tick(dt)` until cancelled or until a tick fails. Returns the
    /// number of completed ticks.
    pub(crate) async fn run<F>(&self, mut tick: F) -> anyhow::Result<u64>
    where
        F: FnMut(Duration) -> anyhow::Result<()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = Instant::now();
        let mut frames = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            if self.cancel.is_cancelled() {
                break;
            }
            let now = Instant::now();
            let dt = now.saturating_duration_since(last);
            last = now;
            tick(dt)?;
            frames += 1;
        }
        Ok(frames)
    }
}
