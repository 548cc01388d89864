//! The upload → processing → result lifecycle controller.
//!
//! ## States
//!
//! ```text
//!            select_file            process()           2xx + success
//!   Idle ──────────────▶ Idle ──────────────▶ Processing ─────────────▶ Complete
//!    ▲   (file pending)                          │                          │
//!    │                                           │ transport / status /     │
//!    │                                           ▼ shape / success:false    │
//!    └──────────── select_file ─────────────── Failed ◀─────────────────────┘
//! ```
//!
//! While Processing two timer tasks run: one advances the simulated progress
//! percentage, the other rotates the status line. Both belong to a guard
//! that aborts them when the request leaves Processing for any reason,
//! including the `process` future being dropped.
//!
//! The published [`LifecycleSnapshot`] lives in a `tokio::sync::watch`
//! channel; front ends either poll [`ExtractionController::snapshot`] or
//! subscribe. Every tick re-checks that the snapshot still belongs to the
//! same in-flight request before touching it.

use crate::config::ClientConfig;
use crate::error::FinExtractError;
use crate::output::{ExtractionResult, PendingFile};
use crate::pipeline::export;
use crate::pipeline::intake::{self, counter_for, PageCounter};
use crate::pipeline::normalize;
use crate::pipeline::upload::{ExtractionBackend, HttpBackend};
use crate::progress::{LifecycleObserver, ObserverHandle, ProgressSchedule, StatusRotation};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Phase of the current (or last) extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Idle,
    Processing,
    Complete,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Processing => "processing",
            LifecycleState::Complete => "complete",
            LifecycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything a front end needs to draw the upload panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleSnapshot {
    pub phase: LifecycleState,
    /// 0–100. Exactly 100 in Complete, exactly 0 in Failed.
    pub progress: u8,
    /// Rotating status line; `Some` only while Processing.
    pub status: Option<String>,
    /// User-facing error; `Some` only in Failed.
    pub error: Option<String>,
    /// Name of the accepted file, if any.
    pub pending_file: Option<String>,
    /// Incremented on every entry into Processing.
    pub request: u64,
}

impl LifecycleSnapshot {
    fn initial() -> Self {
        Self {
            phase: LifecycleState::Idle,
            progress: 0,
            status: None,
            error: None,
            pending_file: None,
            request: 0,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.phase == LifecycleState::Processing
    }

    /// Whether the "extract" action should be enabled.
    pub fn submit_enabled(&self) -> bool {
        !self.is_processing() && self.pending_file.is_some()
    }

    fn reset_indicators(&mut self) {
        self.progress = 0;
        self.status = None;
        self.error = None;
    }
}

#[derive(Default)]
struct Session {
    pending: Option<PendingFile>,
    result: Option<ExtractionResult>,
}

/// Owns the pending file, the last result and the lifecycle state.
///
/// Share it behind an `Arc` when a UI task needs to read state while
/// another task awaits [`process`](Self::process).
pub struct ExtractionController {
    config: ClientConfig,
    backend: Arc<dyn ExtractionBackend>,
    counter: Arc<dyn PageCounter>,
    state: Arc<watch::Sender<LifecycleSnapshot>>,
    session: Mutex<Session>,
}

impl ExtractionController {
    pub fn new(config: ClientConfig, backend: Arc<dyn ExtractionBackend>) -> Self {
        let counter = counter_for(config.page_counter);
        Self::with_page_counter(config, backend, counter)
    }

    /// Controller talking to the configured base URL over HTTP.
    pub fn http(config: ClientConfig) -> Result<Self, FinExtractError> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    pub fn with_page_counter(
        config: ClientConfig,
        backend: Arc<dyn ExtractionBackend>,
        counter: Arc<dyn PageCounter>,
    ) -> Self {
        let (tx, _rx) = watch::channel(LifecycleSnapshot::initial());
        Self {
            config,
            backend,
            counter,
            state: Arc::new(tx),
            session: Mutex::new(Session::default()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleSnapshot> {
        self.state.subscribe()
    }

    /// Snapshot stream starting with the current value.
    pub fn snapshots(&self) -> WatchStream<LifecycleSnapshot> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn pending_file(&self) -> Option<PendingFile> {
        self.lock_session().pending.clone()
    }

    /// The last successful result, until the next selection or request.
    pub fn result(&self) -> Option<ExtractionResult> {
        self.lock_session().result.clone()
    }

    // ── File intake ──────────────────────────────────────────────────────

    /// Validate `bytes` and make them the pending file.
    ///
    /// On rejection nothing changes: the previous pending file, result and
    /// phase stay as they were. On acceptance a finished (Complete/Failed)
    /// controller returns to Idle and drops its stale result; an in-flight
    /// request is left alone.
    pub async fn select_file(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<PendingFile, FinExtractError> {
        let name = name.into();
        let file = match intake::inspect_bytes(
            name.clone(),
            bytes,
            &self.config,
            Arc::clone(&self.counter),
        )
        .await
        {
            Ok(file) => file,
            Err(e) => {
                warn!("Rejected '{}': {}", name, e);
                return Err(e);
            }
        };

        let mut session = self.lock_session();
        session.pending = Some(file.clone());
        let file_name = file.name.clone();
        let mut cleared = false;
        self.state.send_modify(|s| {
            s.pending_file = Some(file_name);
            if s.phase != LifecycleState::Processing {
                s.phase = LifecycleState::Idle;
                s.reset_indicators();
                cleared = true;
            }
        });
        if cleared {
            session.result = None;
        }
        Ok(file)
    }

    /// Read a local file and pass it to [`select_file`](Self::select_file).
    pub async fn select_path(&self, path: impl AsRef<Path>) -> Result<PendingFile, FinExtractError> {
        let (name, bytes) = intake::read_path(path.as_ref()).await?;
        self.select_file(name, bytes).await
    }

    // ── Extraction ───────────────────────────────────────────────────────

    /// Upload the pending file and wait for the extracted tables.
    ///
    /// # Errors
    /// - [`FinExtractError::NoPendingFile`] — nothing selected
    /// - [`FinExtractError::AlreadyProcessing`] — a request is in flight
    /// - any extraction failure; the snapshot then shows the generic message
    pub async fn process(&self) -> Result<ExtractionResult, FinExtractError> {
        let (file, request) = self.enter_processing()?;

        info!(
            "Extraction #{} started for '{}' ({} pages) via {} backend",
            request,
            file.name,
            file.page_count,
            self.backend.name()
        );
        self.notify(|o| {
            o.on_processing_start(&file.name, file.page_count);
            o.on_progress(0);
            if let Some(first) = self.config.status_messages.first() {
                o.on_status(first);
            }
        });

        let guard = ProcessingGuard::start(&self.config, Arc::clone(&self.state), request);
        let outcome = match self.backend.upload(&file).await {
            Ok(response) => normalize::into_result(response),
            Err(e) => Err(e),
        };
        guard.finish();

        match outcome {
            Ok(result) => {
                let total_rows = result.total_rows();
                {
                    let mut session = self.lock_session();
                    session.result = Some(result.clone());
                    self.state.send_modify(|s| {
                        s.phase = LifecycleState::Complete;
                        s.progress = 100;
                        s.status = None;
                        s.error = None;
                    });
                }
                info!("Extraction #{} complete: {} rows", request, total_rows);
                self.notify(|o| {
                    o.on_progress(100);
                    o.on_complete(total_rows);
                });
                Ok(result)
            }
            Err(e) => {
                let user_message = e.user_message();
                warn!("Extraction #{} failed: {}", request, e);
                self.state.send_modify(|s| {
                    s.phase = LifecycleState::Failed;
                    s.progress = 0;
                    s.status = None;
                    s.error = Some(user_message.clone());
                });
                self.notify(|o| {
                    o.on_progress(0);
                    o.on_failed(&user_message);
                });
                Err(e)
            }
        }
    }

    /// Write the last result's workbook into `dir`.
    ///
    /// `Ok(None)` when there is no result to export.
    pub fn export(&self, dir: &Path) -> Result<Option<PathBuf>, FinExtractError> {
        let payload = self
            .lock_session()
            .result
            .as_ref()
            .and_then(|r| r.export.clone());
        export::export_payload(payload.as_ref(), dir)
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// Check-and-set into Processing under the session lock.
    fn enter_processing(&self) -> Result<(PendingFile, u64), FinExtractError> {
        let mut session = self.lock_session();
        let file = session
            .pending
            .clone()
            .ok_or(FinExtractError::NoPendingFile)?;

        let first_status = self.config.status_messages.first().cloned();
        let mut request = None;
        self.state.send_if_modified(|s| {
            if s.phase == LifecycleState::Processing {
                return false;
            }
            s.request += 1;
            s.phase = LifecycleState::Processing;
            s.reset_indicators();
            s.status = first_status;
            request = Some(s.request);
            true
        });

        let request = request.ok_or(FinExtractError::AlreadyProcessing)?;
        session.result = None;
        Ok((file, request))
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, f: impl FnOnce(&dyn LifecycleObserver)) {
        if let Some(ref observer) = self.config.observer {
            f(observer.as_ref());
        }
    }
}

/// Owns the two Processing timers for one request.
///
/// Dropping it aborts both. Dropping it without [`finish`](Self::finish)
/// (the `process` future was cancelled) also reverts the snapshot to Idle.
struct ProcessingGuard {
    state: Arc<watch::Sender<LifecycleSnapshot>>,
    request: u64,
    tickers: Vec<JoinHandle<()>>,
    armed: bool,
}

impl ProcessingGuard {
    fn start(config: &ClientConfig, state: Arc<watch::Sender<LifecycleSnapshot>>, request: u64) -> Self {
        let progress = spawn_progress_ticker(
            Arc::clone(&state),
            request,
            config.progress,
            config.progress_tick,
            config.observer.clone(),
        );
        let mut tickers = vec![progress];
        if !config.status_messages.is_empty() {
            tickers.push(spawn_status_ticker(
                Arc::clone(&state),
                request,
                StatusRotation::new(Arc::clone(&config.status_messages)),
                config.status_tick,
                config.observer.clone(),
            ));
        }
        Self {
            state,
            request,
            tickers,
            armed: true,
        }
    }

    /// Stop the timers; the caller sets the terminal state.
    fn finish(mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        for ticker in &self.tickers {
            ticker.abort();
        }
        if self.armed {
            let request = self.request;
            let reverted = self.state.send_if_modified(|s| {
                if s.phase != LifecycleState::Processing || s.request != request {
                    return false;
                }
                s.phase = LifecycleState::Idle;
                s.reset_indicators();
                true
            });
            if reverted {
                debug!("Extraction #{} abandoned; back to idle", request);
            }
        }
    }
}

/// `interval_at` panics on a zero period.
const MIN_TICK: Duration = Duration::from_millis(1);

fn spawn_progress_ticker(
    state: Arc<watch::Sender<LifecycleSnapshot>>,
    request: u64,
    schedule: ProgressSchedule,
    period: Duration,
    observer: Option<ObserverHandle>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = period.max(MIN_TICK);
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let mut advanced = None;
            state.send_if_modified(|s| {
                if s.phase != LifecycleState::Processing || s.request != request {
                    return false;
                }
                let next = schedule.advance(s.progress);
                if next == s.progress {
                    return false;
                }
                s.progress = next;
                advanced = Some(next);
                true
            });
            if let Some(percent) = advanced {
                debug!("Extraction #{} progress {}%", request, percent);
                if let Some(ref o) = observer {
                    o.on_progress(percent);
                }
            }
        }
    })
}

fn spawn_status_ticker(
    state: Arc<watch::Sender<LifecycleSnapshot>>,
    request: u64,
    mut rotation: StatusRotation,
    period: Duration,
    observer: Option<ObserverHandle>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = period.max(MIN_TICK);
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let message = rotation.advance().to_string();
            let mut changed = false;
            state.send_if_modified(|s| {
                if s.phase != LifecycleState::Processing || s.request != request {
                    return false;
                }
                s.status = Some(message.clone());
                changed = true;
                true
            });
            if changed {
                if let Some(ref o) = observer {
                    o.on_status(&message);
                }
            }
        }
    })
}
