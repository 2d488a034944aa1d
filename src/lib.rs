//! Real-time microphone conditioning pipeline.
//!
//! Raw interleaved `i16` capture blocks go in; denoised, levelled, gated and
//! drift-corrected blocks come out, ready for a virtual device or network
//! sender.
//!
//! ```text
//! capture callback ──▶ AudioProcessorPipeline::process ──▶ sink
//!                                 ▲
//! transport layer ── queued ms ───┘  (QueueDepthReporter / update_playback_ratio)
//! ```

pub mod audio;
pub mod config;
pub mod pipeline;
