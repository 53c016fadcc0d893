//! Subscriber-counted broadcast scheduler.
//!
//! One periodic timer is shared by every connected client. The timer exists
//! exactly while at least one client is connected; every change to the
//! subscriber count goes through [`BroadcastScheduler::transition`], which
//! reconciles the timer with the new count under a single lock. After
//! [`BroadcastScheduler::stop`] the count is still tracked but no timer is
//! ever started again.

use crate::ws_server::{BroadcastSender, ServerEvent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use ticker_feeds::PriceAggregator;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Identifier handed to each downstream connection.
pub type ClientId = u64;

/// Externally visible scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No subscribers, no timer.
    Idle,
    /// At least one subscriber and exactly one timer.
    Streaming,
    /// Torn down; never streams again.
    Stopped,
}

#[derive(Debug, Default)]
struct Inner {
    subscriber_count: usize,
    timer: Option<JoinHandle<()>>,
    stopped: bool,
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Connect,
    Disconnect,
    Stop,
}

pub struct BroadcastScheduler {
    aggregator: Arc<PriceAggregator>,
    tx: BroadcastSender,
    period: Duration,
    inner: Mutex<Inner>,
}

impl BroadcastScheduler {
    pub fn new(aggregator: Arc<PriceAggregator>, tx: BroadcastSender, period: Duration) -> Self {
        Self {
            aggregator,
            tx,
            period,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register a subscriber. The first one starts the timer.
    pub fn on_connect(&self, client_id: ClientId) {
        let count = self.transition(Transition::Connect).0;
        info!("Client {} subscribed ({} connected)", client_id, count);
    }

    /// Unregister a subscriber. The last one stops the timer.
    pub fn on_disconnect(&self, client_id: ClientId) {
        let count = self.transition(Transition::Disconnect).0;
        info!("Client {} unsubscribed ({} connected)", client_id, count);
    }

    /// Cancel the timer for good. Subscribers keep being counted.
    ///
    /// Returns whether a running timer was cancelled; calling it again is a no-op.
    pub fn stop(&self) -> bool {
        self.transition(Transition::Stop).1
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscriber_count
    }

    pub fn is_streaming(&self) -> bool {
        self.lock().timer.is_some()
    }

    pub fn state(&self) -> SchedulerState {
        let inner = self.lock();
        if inner.stopped {
            SchedulerState::Stopped
        } else if inner.timer.is_some() {
            SchedulerState::Streaming
        } else {
            SchedulerState::Idle
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a count change, then start or cancel the timer to match.
    /// Returns the new count and whether a timer was cancelled.
    fn transition(&self, transition: Transition) -> (usize, bool) {
        let mut inner = self.lock();

        let count = inner.subscriber_count;
        match transition {
            Transition::Connect => inner.subscriber_count = count.saturating_add(1),
            Transition::Disconnect => inner.subscriber_count = count.saturating_sub(1),
            Transition::Stop => inner.stopped = true,
        }

        let wants_timer = inner.subscriber_count > 0 && !inner.stopped;
        let mut cancelled = false;
        if wants_timer && inner.timer.is_none() {
            inner.timer = Some(self.spawn_timer());
            debug!("Broadcast timer started ({:?})", self.period);
        } else if !wants_timer {
            if let Some(timer) = inner.timer.take() {
                timer.abort();
                cancelled = true;
                debug!("Broadcast timer stopped");
            }
        }

        (inner.subscriber_count, cancelled)
    }

    fn spawn_timer(&self) -> JoinHandle<()> {
        let aggregator = Arc::clone(&self.aggregator);
        let tx = self.tx.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                // Err only means nobody is listening right now.
                let _ = tx.send(ServerEvent::DataUpdate(aggregator.all_data()));
            }
        })
    }
}

impl Drop for BroadcastScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ticker_core::{now_ms, TradingPair};
    use tokio::sync::broadcast;

    const PERIOD: Duration = Duration::from_millis(1000);

    fn scheduler() -> (BroadcastScheduler, broadcast::Receiver<ServerEvent>) {
        let (tx, rx) = broadcast::channel(16);
        let scheduler = BroadcastScheduler::new(Arc::new(PriceAggregator::new()), tx, PERIOD);
        (scheduler, rx)
    }

    fn drain(rx: &mut broadcast::Receiver<ServerEvent>) -> usize {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_timer_lifecycle() {
        let (scheduler, _rx) = scheduler();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.on_connect(1);
        assert_eq!(scheduler.state(), SchedulerState::Streaming);

        scheduler.on_connect(2);
        assert_eq!(scheduler.subscriber_count(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Streaming);

        scheduler.on_disconnect(1);
        assert_eq!(scheduler.subscriber_count(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Streaming);

        scheduler.on_disconnect(2);
        assert_eq!(scheduler.subscriber_count(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_subscribers_share_one_timer() {
        let (scheduler, mut rx) = scheduler();

        scheduler.on_connect(1);
        scheduler.on_connect(2);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(drain(&mut rx), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (scheduler, mut rx) = scheduler();
        let start = Instant::now();

        scheduler.on_connect(1);
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_emissions_while_idle() {
        let (scheduler, mut rx) = scheduler();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(drain(&mut rx), 0);

        scheduler.on_connect(1);
        scheduler.on_disconnect(1);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(drain(&mut rx), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clamps_at_zero() {
        let (scheduler, _rx) = scheduler();

        scheduler.on_disconnect(7);
        scheduler.on_disconnect(7);
        assert_eq!(scheduler.subscriber_count(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        // A later connect still starts from one.
        scheduler.on_connect(8);
        assert_eq!(scheduler.subscriber_count(), 1);
        assert!(scheduler.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let (scheduler, mut rx) = scheduler();

        scheduler.on_connect(1);
        scheduler.on_connect(2);
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(scheduler.subscriber_count(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(drain(&mut rx), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_terminal_and_keeps_counting() {
        let (scheduler, mut rx) = scheduler();

        scheduler.on_connect(1);
        assert!(scheduler.stop());

        // Late connections during shutdown are counted but never streamed to.
        scheduler.on_connect(2);
        scheduler.on_disconnect(1);
        assert_eq!(scheduler.subscriber_count(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(!scheduler.is_streaming());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(drain(&mut rx), 0);

        scheduler.on_disconnect(2);
        assert_eq!(scheduler.subscriber_count(), 0);
        assert!(!scheduler.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_payload_has_every_pair() {
        let (tx, mut rx) = broadcast::channel(16);
        let aggregator = Arc::new(PriceAggregator::new());
        aggregator.handle_trade(TradingPair::EthUsdt, 2501.0, now_ms());
        let scheduler = BroadcastScheduler::new(aggregator, tx, PERIOD);

        scheduler.on_connect(1);
        let ServerEvent::DataUpdate(data) = rx.recv().await.unwrap();

        let pairs: Vec<_> = data.iter().map(|s| s.pair).collect();
        assert_eq!(pairs, TradingPair::ALL.to_vec());
        assert_eq!((data[0].price, data[0].average), (0.0, 0.0));
        assert_eq!((data[1].price, data[1].average), (2501.0, 2501.0));
        assert_eq!((data[2].price, data[2].average), (0.0, 0.0));
    }
}
