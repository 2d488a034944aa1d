//! Pipeline orchestrator module.
//!
//! # Architecture
//!
//! ```text
//! capture callback (one block per call)
//!        │
//!        ▼
//! AudioProcessorPipeline::process()
//!        │
//!        ├─ drain QueueDepthReporter channel → DriftController
//!        ├─ NoiseReducer → DereverbEffect → AgcEffect → VadEffect
//!        └─ AmplifierEffect → ResamplerEffect → returned block → sink
//!
//! transport thread ── QueueDepthReporter::report(queued_ms) ──▶ (bounded mpsc)
//!                  ◀─ QueueDepthReporter::current_ratio() ───── (atomic)
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use mic_conditioner::config::PipelineConfig;
//! use mic_conditioner::pipeline::AudioProcessorPipeline;
//!
//! let mut config = PipelineConfig::default();
//! config.agc.enabled = true;
//! config.vad.enabled = true;
//!
//! let mut pipeline = AudioProcessorPipeline::new(&config);
//! let reporter = pipeline.queue_depth_reporter(); // hand to the sender thread
//!
//! let block = vec![0_i16; 960]; // 10 ms stereo @ 48 kHz
//! let out = pipeline.process(block, 2);
//! assert_eq!(out, vec![0; 960]); // silence is gated
//!
//! reporter.report(75).unwrap();
//! pipeline.release().unwrap();
//! ```

pub mod processor;
pub mod reporter;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use processor::{AudioProcessorPipeline, ReleaseError};
pub use reporter::{QueueDepthReporter, ReportError, REPORT_CAPACITY};
