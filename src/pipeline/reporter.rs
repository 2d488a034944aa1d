//! Queue-depth reporting from the transport thread.
//!
//! The transport layer runs on its own cadence, but the drift controller's
//! state belongs to the pipeline owner.  [`QueueDepthReporter`] bridges the
//! two without a lock: reports go over a bounded mpsc channel that the
//! pipeline drains at the start of every block, and the resulting ratio comes
//! back through an atomic.
//!
//! The channel holds at most [`REPORT_CAPACITY`] reports.  While capture is
//! stalled further reports are refused with [`ReportError::Full`], so the
//! next block never has more than that many to apply.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;

use thiserror::Error;

/// Reports buffered between two blocks; also the most a block will apply.
pub const REPORT_CAPACITY: usize = 64;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    /// The pipeline has not drained earlier reports yet; this one was
    /// dropped.
    #[error("queue-depth report dropped, earlier reports still pending")]
    Full,
    /// The pipeline that created the reporter no longer exists.
    #[error("audio pipeline has been dropped")]
    PipelineGone,
}

// ---------------------------------------------------------------------------
// SharedRatio
// ---------------------------------------------------------------------------

/// An `f64` published through atomic bits.
#[derive(Debug, Clone)]
pub(crate) struct SharedRatio(Arc<AtomicU64>);

impl SharedRatio {
    pub(crate) fn new(value: f64) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    pub(crate) fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// QueueDepthReporter
// ---------------------------------------------------------------------------

/// Cloneable, `Send` handle for reporting downstream queue depth.
///
/// ```rust
/// use mic_conditioner::pipeline::AudioProcessorPipeline;
///
/// let mut pipeline = AudioProcessorPipeline::default();
/// let reporter = pipeline.queue_depth_reporter();
///
/// std::thread::spawn(move || {
///     reporter.report(200).unwrap();
/// })
/// .join()
/// .unwrap();
///
/// // applied at the start of the next block
/// pipeline.process(vec![0; 960], 2);
/// assert_eq!(pipeline.playback_ratio(), 1.10);
/// ```
#[derive(Debug, Clone)]
pub struct QueueDepthReporter {
    tx: SyncSender<u64>,
    ratio: SharedRatio,
}

impl QueueDepthReporter {
    pub(crate) fn new(tx: SyncSender<u64>, ratio: SharedRatio) -> Self {
        Self { tx, ratio }
    }

    /// Queue one observation of how many milliseconds are waiting to be
    /// sent or played.  Call once per transmitted block.  Never blocks.
    pub fn report(&self, queued_ms: u64) -> Result<(), ReportError> {
        self.tx.try_send(queued_ms).map_err(|e| match e {
            TrySendError::Full(_) => ReportError::Full,
            TrySendError::Disconnected(_) => ReportError::PipelineGone,
        })
    }

    /// Ratio produced by the most recently applied report.
    pub fn current_ratio(&self) -> f64 {
        self.ratio.load()
    }
}
