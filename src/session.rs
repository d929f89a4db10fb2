//! Session aggregator: one historical fetch, one alert stream, two buffers,
//! and a published snapshot for the presentation layer.
//!
//! All state lives in a single driver task. Every event (command, fetch
//! completion, poll tick, transport event, reconnect expiry) is handled to
//! completion before the next one is looked at, and a fresh
//! [`SessionSnapshot`] is published after each one that changes something.

use std::{
    future,
    num::{NonZeroU32, NonZeroUsize},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    task::{JoinError, JoinHandle},
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    Alert, AlertBuffer, Config, ConnectionState, Connector, FetchError, HistoricalFetcher,
    Reading, StreamConnection, StreamUpdate, TimeSeriesBuffer,
};

// ---

/// Read-only view of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    // ---
    pub connection_status: ConnectionState,
    pub is_loading: bool,
    /// Most recent fetch or stream failure; cleared when the stream opens.
    pub last_error: Option<String>,
    /// Most recent first.
    pub alerts: Vec<Alert>,
    /// Oldest first.
    pub readings: Vec<Reading>,
}

impl SessionSnapshot {
    /// The current temperature/humidity, if any reading is known.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }
}

/// Tunables for a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    // ---
    pub history_limit: NonZeroUsize,
    pub max_alerts: NonZeroUsize,
    pub reconnect_delay: Duration,
    /// Zero disables latest-reading polling.
    pub poll_interval: Duration,
}

impl SessionOptions {
    pub fn from_config(cfg: &Config) -> Self {
        // ---
        Self {
            history_limit: NonZeroUsize::new(cfg.history_limit as usize)
                .unwrap_or(NonZeroUsize::MIN),
            max_alerts: NonZeroUsize::new(cfg.max_alerts as usize).unwrap_or(NonZeroUsize::MIN),
            reconnect_delay: cfg.reconnect_delay,
            poll_interval: cfg.poll_interval,
        }
    }
}

#[derive(Debug)]
enum Command {
    Dismiss(u64),
    Shutdown,
}

/// Handle to a running session.
///
/// Dropping the handle shuts the session down as well; [`shutdown`](Self::shutdown)
/// additionally waits until the driver has stopped.
#[derive(Debug)]
pub struct Session {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Start the historical fetch and the alert stream concurrently.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<C: Connector>(
        options: SessionOptions,
        fetcher: HistoricalFetcher,
        connector: C,
    ) -> Session {
        // ---
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let mut driver = Driver {
            options,
            fetcher,
            stream: StreamConnection::new(connector, options.reconnect_delay),
            alerts: AlertBuffer::new(options.max_alerts.get()),
            readings: TimeSeriesBuffer::new(options.history_limit.get()),
            early_readings: Vec::new(),
            is_loading: true,
            last_error: None,
            fetch: None,
            poll: None,
            poll_timer: None,
            commands: commands_rx,
            state: watch::channel(initial_snapshot()).0,
        };
        driver.fetch = Some(driver.spawn_fetch());
        driver.stream.start();

        let state = driver.state.subscribe();
        driver.publish();

        let task = tokio::spawn(driver.run());
        Session {
            commands: commands_tx,
            state,
            task: Some(task),
        }
    }

    /// Copy of the most recently published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every published state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Remove the alert with `id` from the list. Unknown ids are ignored.
    pub fn dismiss(&self, id: u64) {
        let _ = self.commands.send(Command::Dismiss(id));
    }

    /// Cancel any pending fetch, close the stream and wait for the driver to stop.
    ///
    /// Idempotent. After it returns no further state is published.
    pub async fn shutdown(&mut self) {
        // ---
        let Some(task) = self.task.take() else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = task.await {
            error!("Session driver ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

fn initial_snapshot() -> SessionSnapshot {
    SessionSnapshot {
        connection_status: ConnectionState::Disconnected,
        is_loading: true,
        last_error: None,
        alerts: Vec::new(),
        readings: Vec::new(),
    }
}

enum Wake {
    Command(Option<Command>),
    Fetched(Result<Result<Vec<Reading>, FetchError>, JoinError>),
    Polled(Result<Result<Option<Reading>, FetchError>, JoinError>),
    PollDue,
    Stream(StreamUpdate),
}

struct Driver<C> {
    options: SessionOptions,
    fetcher: HistoricalFetcher,
    stream: StreamConnection<C>,
    alerts: AlertBuffer,
    readings: TimeSeriesBuffer,
    /// Live readings streamed in before the historical window was seeded.
    early_readings: Vec<Reading>,
    is_loading: bool,
    last_error: Option<String>,
    fetch: Option<JoinHandle<Result<Vec<Reading>, FetchError>>>,
    poll: Option<JoinHandle<Result<Option<Reading>, FetchError>>>,
    poll_timer: Option<Interval>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<SessionSnapshot>,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        // ---
        info!("Session started");
        loop {
            let wake = tokio::select! {
                biased;
                cmd = self.commands.recv() => Wake::Command(cmd),
                res = join_pending(&mut self.fetch) => Wake::Fetched(res),
                res = join_pending(&mut self.poll) => Wake::Polled(res),
                _ = tick_pending(&mut self.poll_timer) => Wake::PollDue,
                update = self.stream.next_update() => Wake::Stream(update),
            };

            match wake {
                Wake::Command(Some(Command::Dismiss(id))) => {
                    if self.alerts.dismiss(id) {
                        debug!("Dismissed alert {}", id);
                        self.publish();
                    }
                }
                Wake::Command(Some(Command::Shutdown)) | Wake::Command(None) => break,
                Wake::Fetched(res) => self.on_fetched(res),
                Wake::Polled(res) => self.on_polled(res),
                Wake::PollDue => {
                    if self.poll.is_none() {
                        let fetcher = self.fetcher.clone();
                        self.poll = Some(tokio::spawn(async move { fetcher.fetch_latest().await }));
                    }
                }
                Wake::Stream(update) => self.on_stream(update),
            }
        }
        self.shutdown();
    }

    fn spawn_fetch(&self) -> JoinHandle<Result<Vec<Reading>, FetchError>> {
        let fetcher = self.fetcher.clone();
        let limit = NonZeroU32::try_from(self.options.history_limit).unwrap_or(NonZeroU32::MAX);
        tokio::spawn(async move { fetcher.fetch_recent(limit).await })
    }

    fn on_fetched(&mut self, res: Result<Result<Vec<Reading>, FetchError>, JoinError>) {
        // ---
        match res {
            Ok(Ok(readings)) => {
                info!("Loaded {} historical readings", readings.len());
                self.readings.seed(readings);
                let mut replayed = 0;
                for reading in std::mem::take(&mut self.early_readings) {
                    if self.append_newer(reading) {
                        replayed += 1;
                    }
                }
                if replayed > 0 {
                    debug!("Kept {} live readings newer than the history", replayed);
                }
            }
            Ok(Err(e)) => {
                warn!("Historical fetch failed: {}", e);
                self.last_error = Some(e.to_string());
            }
            Err(e) => {
                error!("Historical fetch task failed: {}", e);
                self.last_error = Some(format!("historical fetch task failed: {e}"));
            }
        }
        self.early_readings.clear();
        self.is_loading = false;
        self.start_polling();
        self.publish();
    }

    fn start_polling(&mut self) {
        // ---
        let period = self.options.poll_interval;
        if period.is_zero() {
            return;
        }
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.poll_timer = Some(timer);
    }

    fn on_polled(&mut self, res: Result<Result<Option<Reading>, FetchError>, JoinError>) {
        // ---
        let reading = match res {
            Ok(Ok(Some(reading))) => reading,
            Ok(Ok(None)) => return,
            Ok(Err(e)) => {
                warn!("Latest-reading poll failed: {}", e);
                return;
            }
            Err(e) => {
                error!("Latest-reading poll task failed: {}", e);
                return;
            }
        };

        if self.append_newer(reading) {
            self.publish();
        }
    }

    /// Append `reading` only if it is strictly newer than the window's tail.
    fn append_newer(&mut self, reading: Reading) -> bool {
        // ---
        let is_newer = self
            .readings
            .latest()
            .map_or(true, |tail| reading.timestamp > tail.timestamp);
        is_newer && self.readings.append(reading)
    }

    fn on_stream(&mut self, update: StreamUpdate) {
        // ---
        match update {
            StreamUpdate::Status(status) => {
                debug!("Stream status: {}", status);
                if status == ConnectionState::Connected {
                    self.last_error = None;
                }
                self.publish();
            }
            StreamUpdate::Failed(message) => {
                self.last_error = Some(message);
                self.publish();
            }
            StreamUpdate::Alert(alert) => {
                info!("Alert {} [{:?}]: {}", alert.id, alert.severity, alert.message);
                self.alerts.append(alert);
                self.publish();
            }
            StreamUpdate::Reading(reading) => {
                if self.is_loading {
                    // Seeding replaces the window; keep a copy to replay afterwards.
                    self.early_readings.push(reading.clone());
                }
                if self.readings.append(reading) {
                    self.publish();
                }
            }
            StreamUpdate::Dropped | StreamUpdate::Ignored => {}
        }
    }

    fn shutdown(&mut self) {
        // ---
        if let Some(fetch) = self.fetch.take() {
            debug!("Cancelling pending historical fetch");
            fetch.abort();
        }
        if let Some(poll) = self.poll.take() {
            poll.abort();
        }
        self.poll_timer = None;
        self.stream.shutdown();
        self.is_loading = false;
        self.publish();
        info!("Session stopped");
    }

    fn snapshot(&self) -> SessionSnapshot {
        // ---
        SessionSnapshot {
            connection_status: self.stream.state(),
            is_loading: self.is_loading,
            last_error: self.last_error.clone(),
            alerts: self.alerts.to_vec(),
            readings: self.readings.to_vec(),
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.snapshot());
    }
}

/// Await the task in `slot`, clearing it once finished. Pending while empty.
async fn join_pending<T>(slot: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    // ---
    let Some(handle) = slot.as_mut() else {
        return future::pending().await;
    };
    let res = handle.await;
    *slot = None;
    res
}

/// Wait for the next tick of `timer`. Pending while there is no timer.
async fn tick_pending(timer: &mut Option<Interval>) {
    match timer.as_mut() {
        Some(timer) => {
            timer.tick().await;
        }
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_options_from_config() {
        // ---
        let cfg = Config {
            history_limit: 45,
            max_alerts: 5,
            poll_interval: Duration::ZERO,
            ..Config::default()
        };
        let options = SessionOptions::from_config(&cfg);
        assert_eq!(options.history_limit.get(), 45);
        assert_eq!(options.max_alerts.get(), 5);
        assert_eq!(options.reconnect_delay, cfg.reconnect_delay);
        assert!(options.poll_interval.is_zero());
    }

    #[test]
    fn test_options_never_zero() {
        // ---
        let cfg = Config {
            history_limit: 0,
            max_alerts: 0,
            ..Config::default()
        };
        let options = SessionOptions::from_config(&cfg);
        assert_eq!(options.history_limit, NonZeroUsize::MIN);
        assert_eq!(options.max_alerts, NonZeroUsize::MIN);
    }
}
