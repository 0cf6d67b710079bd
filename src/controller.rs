//! Scan controller: the frame-to-commit state machine.
//!
//! ```text
//!   Idle --start--> Scanning --stop / end of stream / read failure--> Stopped
//!                      ^                                                 |
//!                      +-----------------------start---------------------+
//! ```
//!
//! One controller drives one capture device at a time. Each step reads a
//! frame, runs the detector, crops the primary box, runs the recognizer and
//! feeds the normalized token into the consensus buffer. A successful
//! resolution is classified and committed to the session ledger, and the
//! buffer is cleared for the next item.
//!
//! Cancellation is cooperative: the stop flag is checked once per step, so a
//! stop request lands after the current frame (including a blocking
//! recognizer call) has finished. The device is released on every exit from
//! `Scanning`.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::category::CategoryTable;
use crate::consensus::{ConsensusBuffer, ConsensusSettings, Observation, Resolution};
use crate::detect::{DetectionPriority, DetectorBackend};
use crate::ingest::CaptureDevice;
use crate::ledger::LedgerEntry;
use crate::normalize::{normalize, Token};
use crate::recognize::TextRecognizer;
use crate::region::expand;
use crate::session::ScanSession;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Stopped,
}

/// Hard failures of the controller. Everything else is a per-frame outcome.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("capture device {device}: {message}")]
    Device { device: String, message: String },
    #[error("a scan is already running")]
    AlreadyScanning,
    #[error("no scan is running")]
    NotScanning,
    #[error("cannot start a new session while scanning")]
    SessionActive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    EndOfStream,
    DeviceError(String),
}

/// Why a frame produced no observation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Inside the minimum interval since the last frame with a detection.
    Throttled,
    NoDetection,
    DetectorFailed,
    EmptyRegion,
    RecognitionFailed,
    /// Text did not normalize to a token.
    Rejected,
}

/// A committed item together with the ledger total right after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub entry: LedgerEntry,
    pub running_total: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Skipped(SkipReason),
    /// Token buffered; no consensus yet.
    Buffered { token: Token, pending: usize },
    Committed(Commit),
    Stopped(StopReason),
}

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum ScanEvent {
    Observed { token: Token, pending: usize },
    Committed(Commit),
    Stopped(StopReason),
}

/// Loop parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanSettings {
    pub padding: u32,
    pub detection_threshold: f32,
    pub priority: DetectionPriority,
    /// Minimum time between two frames with a detection; frames in between are dropped.
    pub min_interval: Duration,
    /// Pause between loop iterations.
    pub idle_sleep: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            padding: 20,
            detection_threshold: 0.5,
            priority: DetectionPriority::FirstInList,
            min_interval: Duration::from_millis(500),
            idle_sleep: Duration::from_millis(30),
        }
    }
}

/// Cloneable handle that asks a running loop to stop.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

pub struct ScanController {
    state: ScanState,
    device: Option<Box<dyn CaptureDevice>>,
    detector: Box<dyn DetectorBackend>,
    recognizer: Box<dyn TextRecognizer>,
    categories: CategoryTable,
    buffer: ConsensusBuffer,
    settings: ScanSettings,
    stop: StopHandle,
    last_processed: Option<Instant>,
    stopped_by: Option<StopReason>,
}

impl ScanController {
    pub fn new(
        detector: Box<dyn DetectorBackend>,
        recognizer: Box<dyn TextRecognizer>,
        categories: CategoryTable,
        consensus: ConsensusSettings,
        settings: ScanSettings,
    ) -> Result<Self> {
        Ok(Self {
            state: ScanState::Idle,
            device: None,
            detector,
            recognizer,
            categories,
            buffer: ConsensusBuffer::new(consensus)?,
            settings,
            stop: StopHandle::default(),
            last_processed: None,
            stopped_by: None,
        })
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Observations waiting for consensus on the current item.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Open `device` and enter `Scanning` with an empty buffer.
    ///
    /// On open failure the state is unchanged and the device is dropped.
    pub fn start(&mut self, mut device: Box<dyn CaptureDevice>) -> Result<(), ScanError> {
        if self.state == ScanState::Scanning {
            return Err(ScanError::AlreadyScanning);
        }
        let label = device.label();
        if let Err(err) = device.open() {
            device.release();
            log::error!("failed to open capture device {}: {:#}", label, err);
            return Err(ScanError::Device {
                device: label,
                message: format!("{:#}", err),
            });
        }
        if let Err(err) = self.detector.warm_up() {
            log::warn!("detector {} warm-up failed: {:#}", self.detector.name(), err);
        }

        self.buffer.clear();
        self.stop.reset();
        self.last_processed = None;
        self.stopped_by = None;
        self.device = Some(device);
        self.state = ScanState::Scanning;
        log::info!(
            "scanning started on {} (detector={}, recognizer={})",
            label,
            self.detector.name(),
            self.recognizer.name()
        );
        Ok(())
    }

    /// Stop immediately and release the device.
    pub fn stop(&mut self) -> Result<StopReason, ScanError> {
        if self.state != ScanState::Scanning {
            return Err(ScanError::NotScanning);
        }
        self.finish(StopReason::Requested);
        Ok(StopReason::Requested)
    }

    /// Clear the ledger and the pending buffer. Only valid while not scanning.
    pub fn new_session(&mut self, session: &mut ScanSession) -> Result<(), ScanError> {
        if self.state == ScanState::Scanning {
            return Err(ScanError::SessionActive);
        }
        self.buffer.clear();
        session.reset();
        log::info!("new session {}", session.id());
        Ok(())
    }

    /// Process one frame.
    ///
    /// A read failure stops the scan, releases the device and is returned as
    /// `ScanError::Device`. Detector and recognizer failures only skip the frame.
    pub fn step(&mut self, session: &mut ScanSession) -> Result<StepOutcome, ScanError> {
        if self.state != ScanState::Scanning {
            return Err(ScanError::NotScanning);
        }
        if self.stop.is_requested() {
            self.finish(StopReason::Requested);
            return Ok(StepOutcome::Stopped(StopReason::Requested));
        }

        let Some(device) = self.device.as_mut() else {
            self.state = ScanState::Stopped;
            return Err(ScanError::NotScanning);
        };
        let frame = match device.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.finish(StopReason::EndOfStream);
                return Ok(StepOutcome::Stopped(StopReason::EndOfStream));
            }
            Err(err) => {
                let device = device.label();
                let message = format!("{:#}", err);
                log::error!("capture read failed on {}: {}", device, message);
                self.finish(StopReason::DeviceError(message.clone()));
                return Err(ScanError::Device { device, message });
            }
        };

        if let Some(last) = self.last_processed {
            if last.elapsed() < self.settings.min_interval {
                return Ok(StepOutcome::Skipped(SkipReason::Throttled));
            }
        }

        let detections = match self
            .detector
            .detect(&frame, self.settings.detection_threshold)
        {
            Ok(detections) => detections,
            Err(err) => {
                log::warn!("detection failed on frame {}: {:#}", frame.sequence, err);
                return Ok(StepOutcome::Skipped(SkipReason::DetectorFailed));
            }
        };
        let Some(primary) = detections.primary(self.settings.priority) else {
            return Ok(StepOutcome::Skipped(SkipReason::NoDetection));
        };
        // Only frames with an item restart the interval.
        self.last_processed = Some(Instant::now());

        let region = expand(
            &primary.bbox,
            frame.width,
            frame.height,
            self.settings.padding,
        );
        if region.is_empty() {
            log::debug!("frame {}: empty region for {:?}", frame.sequence, primary.bbox);
            return Ok(StepOutcome::Skipped(SkipReason::EmptyRegion));
        }
        let image = match frame.crop(&region) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("frame {}: crop failed: {:#}", frame.sequence, err);
                return Ok(StepOutcome::Skipped(SkipReason::EmptyRegion));
            }
        };

        let text = match self.recognizer.recognize(&image) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("recognition failed on frame {}: {:#}", frame.sequence, err);
                return Ok(StepOutcome::Skipped(SkipReason::RecognitionFailed));
            }
        };
        let Some(token) = normalize(&text) else {
            log::debug!("frame {}: rejected text {:?}", frame.sequence, text);
            return Ok(StepOutcome::Skipped(SkipReason::Rejected));
        };

        self.buffer.add(Observation::new(token.clone(), image));
        if !self.buffer.ready_to_resolve() {
            return Ok(StepOutcome::Buffered {
                token,
                pending: self.buffer.len(),
            });
        }

        match self.buffer.resolve() {
            Resolution::Agreed(consensus) => {
                let classification = self.categories.resolve(Some(&consensus.token));
                let entry = session
                    .ledger_mut()
                    .commit(consensus.token, &classification, consensus.image)
                    .clone();
                self.buffer.clear();
                let running_total = session.ledger().running_total();
                log::info!(
                    "committed {} as {} ({}), {}/{} votes, running total {}",
                    entry.token,
                    entry.category,
                    entry.value,
                    consensus.votes,
                    consensus.total,
                    running_total
                );
                Ok(StepOutcome::Committed(Commit {
                    entry,
                    running_total,
                }))
            }
            Resolution::NoConsensus { leader, ratio } => {
                log::debug!(
                    "no consensus over {} readings (leader {:?}, ratio {:.2})",
                    self.buffer.len(),
                    leader.as_ref().map(Token::as_str),
                    ratio
                );
                Ok(StepOutcome::Buffered {
                    token,
                    pending: self.buffer.len(),
                })
            }
        }
    }

    /// Step until one item is committed or the scan stops.
    ///
    /// Returns the commit, or `None` when the scan stopped first.
    pub fn scan_item<F>(
        &mut self,
        session: &mut ScanSession,
        on_event: &mut F,
    ) -> Result<Option<Commit>, ScanError>
    where
        F: FnMut(&ScanEvent),
    {
        loop {
            match self.step(session) {
                Ok(StepOutcome::Committed(commit)) => {
                    on_event(&ScanEvent::Committed(commit.clone()));
                    return Ok(Some(commit));
                }
                Ok(StepOutcome::Stopped(reason)) => {
                    on_event(&ScanEvent::Stopped(reason));
                    return Ok(None);
                }
                Ok(StepOutcome::Buffered { token, pending }) => {
                    on_event(&ScanEvent::Observed { token, pending });
                }
                Ok(StepOutcome::Skipped(_)) => {}
                Err(err) => {
                    if let ScanError::Device { message, .. } = &err {
                        on_event(&ScanEvent::Stopped(StopReason::DeviceError(
                            message.clone(),
                        )));
                    }
                    return Err(err);
                }
            }
            if !self.settings.idle_sleep.is_zero() {
                std::thread::sleep(self.settings.idle_sleep);
            }
        }
    }

    /// Scan items until stopped, end of stream or a device error.
    pub fn run<F>(&mut self, session: &mut ScanSession, mut on_event: F) -> Result<StopReason, ScanError>
    where
        F: FnMut(&ScanEvent),
    {
        while self.scan_item(session, &mut on_event)?.is_some() {}
        Ok(self.stopped_by.clone().unwrap_or(StopReason::EndOfStream))
    }

    /// Why the last scan left `Scanning`, if it has.
    pub fn stopped_by(&self) -> Option<&StopReason> {
        self.stopped_by.as_ref()
    }

    fn finish(&mut self, reason: StopReason) {
        if let Some(mut device) = self.device.take() {
            let stats = device.stats();
            device.release();
            log::info!(
                "scanning stopped on {} after {} frames: {:?}",
                stats.device,
                stats.frames_captured,
                reason
            );
        }
        self.stopped_by = Some(reason);
        self.state = ScanState::Stopped;
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.release();
        }
    }
}
