//! GPU side of the engine.
//!
//! - `context` owns the device, the frame target, and the 32-byte parameter
//!   buffer with its bind group; it reconfigures the target lazily on resize.
//! - `pipeline` turns fragment source into a render pipeline, or into
//!   diagnostics when the module has errors.
//! - `frame` keeps the animation clock and records the per-frame draw.
//! - `uniforms` mirrors the WGSL `Params` block.

mod context;
mod frame;
mod pipeline;
mod uniforms;

pub(crate) use context::GraphicsContext;
pub(crate) use frame::{encode_draw, FrameScheduler};
pub(crate) use pipeline::{Pipeline, PipelineCompiler};
pub use uniforms::{UniformParams, UNIFORM_SIZE};
