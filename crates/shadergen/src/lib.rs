//! Client side of the natural-language shader generation service.
//!
//! The service is opaque: it takes a prompt, a model choice, and recent chat
//! history, and answers with a fragment shader, an optional compute shader,
//! and a one-line description. Anything else it answers is a
//! [`GenerationError`].

mod client;
mod contract;
mod error;

pub use client::{GenerationClient, ShaderGenerator, DEFAULT_ENDPOINT};
pub use contract::{
    parse_response, GeneratedShader, GenerationRequest, HistoryEntry, Model, Role, MAX_HISTORY,
};
pub use error::GenerationError;
