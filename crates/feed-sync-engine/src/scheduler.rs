//! Timers for push sessions: the forced session lifetime and the delayed
//! reconnect.
//!
//! Each slot holds at most one armed timer. Arming a slot replaces (and
//! aborts) whatever it held, and every timer carries a token so a timer that
//! was replaced just as it woke up does not fire.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerSlot {
    Lifetime,
    Reconnect,
}

struct ArmedTimer {
    token: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    lifetime: Option<ArmedTimer>,
    reconnect: Option<ArmedTimer>,
    next_token: u64,
}

impl Timers {
    fn slot(&mut self, slot: TimerSlot) -> &mut Option<ArmedTimer> {
        match slot {
            TimerSlot::Lifetime => &mut self.lifetime,
            TimerSlot::Reconnect => &mut self.reconnect,
        }
    }
}

pub struct ReconnectScheduler {
    runtime: Handle,
    timers: Mutex<Timers>,
}

impl ReconnectScheduler {
    pub fn new(runtime: Handle) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            timers: Mutex::new(Timers::default()),
        })
    }

    /// Start (or restart) the session lifetime countdown.
    pub fn arm_lifetime<F>(self: &Arc<Self>, after: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm(TimerSlot::Lifetime, after, on_expire);
    }

    /// Run `on_fire` after `after`, replacing any pending reconnect.
    pub fn schedule_reconnect<F>(self: &Arc<Self>, after: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm(TimerSlot::Reconnect, after, on_fire);
    }

    /// Cancel the lifetime countdown.
    pub fn disarm_lifetime(&self) {
        self.cancel(TimerSlot::Lifetime);
    }

    /// Cancel everything. Safe to call at any time, any number of times.
    pub fn disarm(&self) {
        self.cancel(TimerSlot::Lifetime);
        self.cancel(TimerSlot::Reconnect);
    }

    pub fn is_lifetime_armed(&self) -> bool {
        self.timers.lock().lifetime.is_some()
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.timers.lock().reconnect.is_some()
    }

    fn arm<F>(self: &Arc<Self>, slot: TimerSlot, after: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut timers = self.timers.lock();
        timers.next_token += 1;
        let token = timers.next_token;

        let scheduler: Weak<Self> = Arc::downgrade(self);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            let Some(scheduler) = scheduler.upgrade() else {
                return;
            };
            if scheduler.claim(slot, token) {
                callback();
            }
        });

        debug!(?slot, token, after_ms = after.as_millis() as u64, "Timer armed");
        if let Some(previous) = timers.slot(slot).replace(ArmedTimer { token, handle }) {
            previous.handle.abort();
        }
    }

    fn cancel(&self, slot: TimerSlot) {
        if let Some(timer) = self.timers.lock().slot(slot).take() {
            debug!(?slot, token = timer.token, "Timer disarmed");
            timer.handle.abort();
        }
    }

    /// Empty the slot if it still holds `token`. A fired timer owns the
    /// callback only when this succeeds.
    fn claim(&self, slot: TimerSlot, token: u64) -> bool {
        let mut timers = self.timers.lock();
        let entry = timers.slot(slot);
        if entry.as_ref().is_some_and(|timer| timer.token == token) {
            *entry = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = count.clone();
            move || {
                let count = count.clone();
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn FnOnce() + Send>
            }
        };
        (count, make)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifetime_fires_once() {
        let scheduler = ReconnectScheduler::new(Handle::current());
        let (fired, callback) = counter();

        scheduler.arm_lifetime(Duration::from_secs(15), callback());
        assert!(scheduler.is_lifetime_armed());

        tokio::time::sleep(Duration::from_millis(14_900)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_lifetime_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_restarts_countdown() {
        let scheduler = ReconnectScheduler::new(Handle::current());
        let (fired, callback) = counter();

        scheduler.arm_lifetime(Duration::from_secs(10), callback());
        tokio::time::sleep(Duration::from_secs(8)).await;
        scheduler.arm_lifetime(Duration::from_secs(10), callback());

        tokio::time::sleep(Duration::from_secs(8)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_everything() {
        let scheduler = ReconnectScheduler::new(Handle::current());
        let (fired, callback) = counter();

        scheduler.arm_lifetime(Duration::from_secs(1), callback());
        scheduler.schedule_reconnect(Duration::from_secs(1), callback());
        scheduler.disarm();
        scheduler.disarm();

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_reconnect_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_independent() {
        let scheduler = ReconnectScheduler::new(Handle::current());
        let (fired, callback) = counter();

        scheduler.arm_lifetime(Duration::from_secs(1), callback());
        scheduler.schedule_reconnect(Duration::from_secs(2), callback());
        scheduler.disarm_lifetime();

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_may_rearm() {
        let scheduler = ReconnectScheduler::new(Handle::current());
        let (fired, callback) = counter();

        let inner = scheduler.clone();
        let second = callback();
        scheduler.schedule_reconnect(Duration::from_secs(1), move || {
            inner.schedule_reconnect(Duration::from_secs(1), second);
        });

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
