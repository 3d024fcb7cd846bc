//! Live recompute driver.
//!
//! A background thread that keeps a "current" estimate fresh: it
//! recomputes on a fixed cadence and immediately whenever the events or
//! profile change. Commands reach the worker over an mpsc channel; the
//! periodic tick is the channel's receive timeout, so there is never more
//! than one pending timer and shutting down cancels it.

use crate::engine::estimate;
use crate::{BacEstimate, ConsumptionEvent, Profile, Result};
use chrono::{DateTime, Utc};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Shortest refresh interval the worker accepts
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Source of "now" for the worker
pub trait Clock: Send + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Receiver of fresh estimates
///
/// Returning `false` means nobody is listening anymore and the worker
/// stops.
pub trait EstimateSink: Send + 'static {
    fn publish(&mut self, estimate: BacEstimate) -> bool;
}

impl EstimateSink for Sender<BacEstimate> {
    fn publish(&mut self, estimate: BacEstimate) -> bool {
        self.send(estimate).is_ok()
    }
}

impl EstimateSink for Box<dyn FnMut(BacEstimate) + Send> {
    fn publish(&mut self, estimate: BacEstimate) -> bool {
        (**self)(estimate);
        true
    }
}

/// Cadence and window for the live estimate
#[derive(Clone, Copy, Debug)]
pub struct LiveSettings {
    pub refresh_interval: Duration,
    /// Events older than this are ignored
    pub lookback: chrono::Duration,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
            lookback: chrono::Duration::hours(24),
        }
    }
}

enum Command {
    UpdateEvents(Vec<ConsumptionEvent>),
    UpdateProfile(Profile),
    Recompute,
    Shutdown,
}

/// Handle to the running recompute worker
///
/// Dropping the handle stops and joins the worker.
pub struct LiveMonitor {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl LiveMonitor {
    /// Start the worker with the wall clock
    pub fn spawn<S: EstimateSink>(
        settings: LiveSettings,
        events: Vec<ConsumptionEvent>,
        profile: Profile,
        sink: S,
    ) -> Result<Self> {
        Self::spawn_with_clock(settings, events, profile, SystemClock, sink)
    }

    /// Start the worker; the first estimate is published immediately
    ///
    /// Refresh intervals below [`MIN_REFRESH_INTERVAL`] are raised to it.
    pub fn spawn_with_clock<C: Clock, S: EstimateSink>(
        mut settings: LiveSettings,
        events: Vec<ConsumptionEvent>,
        profile: Profile,
        clock: C,
        sink: S,
    ) -> Result<Self> {
        settings.refresh_interval = settings.refresh_interval.max(MIN_REFRESH_INTERVAL);
        let (tx, rx) = mpsc::channel();

        let worker = Worker {
            settings,
            events,
            profile,
            clock,
            sink,
        };
        let handle = std::thread::Builder::new()
            .name("bac-live".into())
            .spawn(move || worker.run(rx))?;

        tracing::info!(
            "Live estimate started (refresh every {:?})",
            settings.refresh_interval
        );

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Replace the event snapshot and recompute now
    ///
    /// Returns `false` if the worker has already stopped.
    pub fn update_events(&self, events: Vec<ConsumptionEvent>) -> bool {
        self.tx.send(Command::UpdateEvents(events)).is_ok()
    }

    /// Replace the profile and recompute now
    pub fn update_profile(&self, profile: Profile) -> bool {
        self.tx.send(Command::UpdateProfile(profile)).is_ok()
    }

    /// Recompute now without changing inputs
    pub fn recompute(&self) -> bool {
        self.tx.send(Command::Recompute).is_ok()
    }

    /// Stop the worker and wait for it to exit
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(Command::Shutdown);
            if handle.join().is_err() {
                tracing::warn!("Live estimate worker panicked");
            }
            tracing::info!("Live estimate stopped");
        }
    }
}

impl Drop for LiveMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<C, S> {
    settings: LiveSettings,
    events: Vec<ConsumptionEvent>,
    profile: Profile,
    clock: C,
    sink: S,
}

impl<C: Clock, S: EstimateSink> Worker<C, S> {
    fn run(mut self, rx: Receiver<Command>) {
        if !self.publish() {
            return;
        }

        let interval = self.settings.refresh_interval;
        let mut next_tick = Instant::now() + interval;

        loop {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            let keep_going = match rx.recv_timeout(timeout) {
                Ok(Command::UpdateEvents(events)) => {
                    tracing::debug!("Live estimate: {} events", events.len());
                    self.events = events;
                    self.publish()
                }
                Ok(Command::UpdateProfile(profile)) => {
                    self.profile = profile;
                    self.publish()
                }
                Ok(Command::Recompute) => self.publish(),
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => false,
                Err(RecvTimeoutError::Timeout) => {
                    next_tick = Instant::now() + interval;
                    self.publish()
                }
            };

            if !keep_going {
                break;
            }
        }

        tracing::debug!("Live estimate worker exiting");
    }

    fn publish(&mut self) -> bool {
        let estimate = self.compute();
        self.sink.publish(estimate)
    }

    fn compute(&self) -> BacEstimate {
        if !self.profile.is_configured() {
            return BacEstimate::not_configured();
        }

        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.settings.lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let relevant: Vec<ConsumptionEvent> = self
            .events
            .iter()
            .filter(|e| e.occurred_at > cutoff)
            .copied()
            .collect();

        estimate(&relevant, self.profile.mass_kg, self.profile.category, now)
    }
}
