//! Live WGSL execution engine.
//!
//! A host hands [`ShaderPayload`]s to a [`ShaderRunner`], which prepends the
//! `Params` declaration, compiles the fragment behind a fixed full-screen
//! vertex stage, and swaps the new pipeline in only when it compiled cleanly:
//!
//! ```text
//!   host ──submit()──▶ ShaderRunner ──▶ PipelineCompiler ──▶ Pipeline
//!     │                     │                  └─▶ CompileDiagnostics ──▶ error channel
//!     └──render_frame()──▶ FrameScheduler ──▶ UniformParams ──▶ one draw
//! ```
//!
//! Device acquisition failures surface once as [`UnsupportedError`]. Compile
//! failures are data, never errors.

mod compile;
mod error;
mod gpu;
mod probe;
mod runner;
mod types;

pub use compile::{
    inject_params_preamble, preflight, CompileDiagnostics, Diagnostic, PARAMS_MARKER,
    PARAMS_PREAMBLE,
};
pub use error::{EngineError, UnsupportedError};
pub use gpu::{UniformParams, UNIFORM_SIZE};
pub use runner::{RunnerOptions, ShaderRunner, Snapshot};
pub use types::{
    CanvasMetrics, FrameStatus, Liveness, RenderTarget, ShaderPayload, SubmitOutcome,
};
