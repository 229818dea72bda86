//! Student scan loop.
//!
//! A poller task pulls decode attempts from a [`FrameDecoder`] at a fixed
//! interval and pushes them into a bounded channel. The [`Scanner`] consumes
//! that channel, drives the [`ScanSession`], and hands each accepted
//! candidate to the [`SubmissionDispatcher`] on a separate task so frames keep
//! flowing (and are ignored) while a report is in flight.
//!
//! Status messages are published on a `watch` channel. An outcome message
//! stays visible until the next outcome replaces it.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use visitlog_core::messages;
use visitlog_core::scan::{DecodeAttempt, ScanOutcome, ScanSession};
use visitlog_core::visit::VisitAck;

use crate::decoder::{DecodeError, FrameDecoder};
use crate::dispatcher::{resolve_outcome, SubmissionDispatcher, SubmissionError};

/// Default decode interval, matching a camera sampling every 300 ms.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Default depth of the frame channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Default time an outcome is held before the session accepts new codes.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Scan-loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerConfig {
    /// How often the frame source is asked for a decode attempt.
    pub poll_interval: Duration,
    /// Frames buffered between the poller and the scanner.
    pub channel_capacity: usize,
    /// How long an outcome is held before returning to idle. Zero
    /// acknowledges immediately.
    pub settle_delay: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// One decode attempt, or the reason the frame could not be decoded.
pub type FrameEvent = Result<DecodeAttempt, DecodeError>;

/// Spawn the frame poller.
///
/// The task stops when `cancel` fires, when the decoder runs out of frames,
/// or when the receiver is dropped. Dropping the returned receiver is enough
/// to stop it.
pub fn spawn_frame_poller<D>(
    mut decoder: D,
    config: &ScannerConfig,
    cancel: CancellationToken,
) -> (mpsc::Receiver<FrameEvent>, JoinHandle<()>)
where
    D: FrameDecoder + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let poll_interval = config.poll_interval;

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => tokio::select! {
                    _ = cancel.cancelled() => break,
                    frame = decoder.next_frame() => frame,
                },
            };

            let Some(frame) = frame else {
                tracing::debug!("Frame source closed");
                break;
            };
            if tx.send(frame).await.is_err() {
                tracing::debug!("Scanner dropped the frame channel");
                break;
            }
        }
    });

    (rx, handle)
}

/// Counters for one scanner run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Frames received, decoded or not.
    pub frames: usize,
    /// Candidates handed to the dispatcher.
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub decode_errors: usize,
}

type DispatchResult = Result<VisitAck, SubmissionError>;

enum LoopEvent {
    Cancelled,
    Settled,
    Dispatched(Result<DispatchResult, JoinError>),
    Frame(Option<FrameEvent>),
}

/// Owns the scan session for one student.
pub struct Scanner {
    dispatcher: Arc<SubmissionDispatcher>,
    student_id: String,
    settle_delay: Duration,
    session: ScanSession,
    status_tx: watch::Sender<String>,
}

impl Scanner {
    pub fn new(
        dispatcher: Arc<SubmissionDispatcher>,
        student_id: impl Into<String>,
        settle_delay: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(messages::SCANNING.to_string());
        Self {
            dispatcher,
            student_id: student_id.into(),
            settle_delay,
            session: ScanSession::new(),
            status_tx,
        }
    }

    /// Receiver for status-line updates, starting at "Scanning QR Code...".
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.status_tx.subscribe()
    }

    /// Consume frames until the channel closes (and any in-flight report and
    /// settle period finish) or `cancel` fires.
    ///
    /// On cancellation an in-flight report is detached rather than aborted,
    /// so a request already on the wire still completes.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<FrameEvent>,
        cancel: CancellationToken,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        let mut in_flight: Option<JoinHandle<DispatchResult>> = None;
        let mut settle: Option<Pin<Box<Sleep>>> = None;
        let mut frames_open = true;

        tracing::info!(student_id = %self.student_id, "Scanner started");

        loop {
            if !frames_open && in_flight.is_none() && settle.is_none() {
                break;
            }

            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => LoopEvent::Cancelled,
                _ = wait_settle(&mut settle) => LoopEvent::Settled,
                joined = wait_dispatch(&mut in_flight) => LoopEvent::Dispatched(joined),
                frame = frames.recv(), if frames_open => LoopEvent::Frame(frame),
            };

            match event {
                LoopEvent::Cancelled => {
                    if in_flight.take().is_some() {
                        tracing::info!("Scanner cancelled with a report in flight; detaching it");
                    }
                    break;
                }
                LoopEvent::Settled => {
                    settle = None;
                    self.acknowledge();
                }
                LoopEvent::Dispatched(joined) => {
                    in_flight = None;
                    let result = joined.unwrap_or_else(|e| {
                        tracing::error!(error = %e, "Dispatch task failed");
                        Err(SubmissionError::Aborted)
                    });
                    let (outcome, message) = resolve_outcome(&result);
                    match outcome {
                        ScanOutcome::Succeeded => report.succeeded += 1,
                        ScanOutcome::Failed => report.failed += 1,
                    }
                    if let Err(e) = self.session.complete(outcome) {
                        tracing::error!(error = %e, "Dispatch completed out of order");
                    }
                    self.publish(message);
                    settle = self.begin_settle();
                }
                LoopEvent::Frame(None) => {
                    tracing::debug!("Frame channel closed");
                    frames_open = false;
                }
                LoopEvent::Frame(Some(Ok(attempt))) => {
                    report.frames += 1;
                    if let Some(candidate) = self.session.observe(attempt) {
                        report.dispatched += 1;
                        tracing::info!(
                            company_qr = %candidate.text,
                            presentation_id = %candidate.presentation_id,
                            "Code detected",
                        );
                        let dispatcher = Arc::clone(&self.dispatcher);
                        let student_id = self.student_id.clone();
                        in_flight = Some(tokio::spawn(async move {
                            dispatcher.submit(&candidate, &student_id).await
                        }));
                    }
                }
                LoopEvent::Frame(Some(Err(e))) => {
                    report.frames += 1;
                    report.decode_errors += 1;
                    if self.session.decode_failed() {
                        tracing::warn!(error = %e, "QR code scan error");
                        self.publish(messages::SCAN_ERROR.to_string());
                        settle = self.begin_settle();
                    } else {
                        tracing::debug!(error = %e, state = %self.session.state(), "Decode error ignored");
                    }
                }
            }
        }

        tracing::info!(
            frames = report.frames,
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed,
            decode_errors = report.decode_errors,
            "Scanner stopped",
        );
        report
    }

    /// Start the settle timer for a freshly rendered outcome, or acknowledge
    /// straight away when there is no delay.
    fn begin_settle(&mut self) -> Option<Pin<Box<Sleep>>> {
        if self.settle_delay.is_zero() {
            self.acknowledge();
            None
        } else {
            Some(Box::pin(tokio::time::sleep(self.settle_delay)))
        }
    }

    fn acknowledge(&mut self) {
        match self.session.acknowledge_outcome() {
            Ok(outcome) => tracing::debug!(?outcome, "Outcome acknowledged"),
            Err(e) => tracing::error!(error = %e, "Nothing to acknowledge"),
        }
    }

    fn publish(&self, message: String) {
        self.status_tx.send_replace(message);
    }
}

async fn wait_settle(settle: &mut Option<Pin<Box<Sleep>>>) {
    match settle {
        Some(sleep) => sleep.await,
        None => pending().await,
    }
}

async fn wait_dispatch(
    in_flight: &mut Option<JoinHandle<DispatchResult>>,
) -> Result<DispatchResult, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => pending().await,
    }
}
