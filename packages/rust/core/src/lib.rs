//! Pipeline orchestration for larkdoc.
//!
//! This crate ties URL resolution, the Lark client, and the summarizer into
//! the two end-to-end flows exposed as tools: summarize a document, or read
//! its raw content.

pub mod pipeline;

pub use pipeline::{
    DocumentPipeline, FAILURE_PREFIX, PipelineStage, ProgressReporter, SilentProgress,
    UNKNOWN_ERROR, failure_text,
};
