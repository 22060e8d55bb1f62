//! Cancellable once-per-period tick source.
//!
//! Each `arm()` aborts the previous task before spawning a new one, so at
//! most one tick task is alive per ticker. Ticks carry the generation they
//! were armed with; receivers drop ticks from older generations that were
//! already queued when the ticker was re-armed or cancelled.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// One elapsed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    tx: mpsc::UnboundedSender<Tick>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl Ticker {
    /// Create a disarmed ticker delivering into `tx`.
    pub fn new(period: Duration, tx: mpsc::UnboundedSender<Tick>) -> Self {
        Self {
            period,
            tx,
            handle: None,
            generation: 0,
        }
    }

    /// Start ticking, replacing any running task. Returns the new generation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(Tick { generation }).is_err() {
                    break;
                }
            }
        }));

        tracing::trace!(generation, "ticker armed");
        generation
    }

    /// Stop ticking. Ticks already queued become stale.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.generation += 1;
            tracing::trace!(generation = self.generation, "ticker cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `tick` came from the currently armed task.
    pub fn accepts(&self, tick: Tick) -> bool {
        self.is_armed() && tick.generation == self.generation
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn delivers_one_tick_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(Duration::from_secs(1), tx);
        let generation = ticker.arm();

        for _ in 0..3 {
            let tick = rx.recv().await.unwrap();
            assert_eq!(tick.generation, generation);
            assert!(ticker.accepts(tick));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_invalidates_old_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(Duration::from_secs(1), tx);
        let first = ticker.arm();
        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.generation, first);

        let second = ticker.arm();
        assert_ne!(first, second);
        assert!(!ticker.accepts(tick));

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.generation, second);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_delivery() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(Duration::from_secs(1), tx);
        ticker.arm();
        rx.recv().await.unwrap();

        ticker.cancel();
        assert!(!ticker.is_armed());

        time::sleep(Duration::from_secs(5)).await;
        while let Ok(tick) = rx.try_recv() {
            assert!(!ticker.accepts(tick));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut ticker = Ticker::new(Duration::from_secs(1), tx);
            ticker.arm();
        }
        // The only sender lived in the aborted task and the dropped ticker.
        time::sleep(Duration::from_secs(2)).await;
        assert!(rx.recv().await.is_none());
    }
}
