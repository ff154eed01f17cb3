#![forbid(unsafe_code)]

//! # planforge
//!
//! Generates candidate project plans by prompting a text-generation backend,
//! then filters, validates and ranks the results so a caller sees a small set
//! of distinct, quality-checked options.
//!
//! The pipeline handles non-deterministic, possibly malformed model output:
//! tolerant JSON extraction, clamped normalization, cheap signature dedup, a
//! batched validation critique with per-entry fallback, Jaccard-based
//! diversity penalties, and a deterministic final ordering despite stochastic
//! inputs.

pub mod brief;
pub mod dedup;
pub mod diversity;
pub mod gateway;
pub mod generator;
pub mod mentor;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod validator;

pub use brief::{
    Candidate, CourseProgram, FocusMode, GenerationRequest, Milestone, ProjectBrief,
    ValidationResult, Verdict,
};
pub use gateway::{
    Attribution, ChatGateway, GatewayConfig, GroqConfig, NoopUsageSink, ProviderError,
    ProviderGateway, StderrUsageSink, UsageSink,
};
pub use pipeline::{generate_candidates, PipelineError, PipelineRun};
