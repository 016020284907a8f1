//! Session state for the prompt-to-shader loop.
//!
//! `StudioState` is the single owner of what the user sees (transcript,
//! current shader, playback, last error). `SelfHealCoordinator` decides when a
//! compile failure earns an automatic correction, and `Conversation` ties both
//! to the generation contract without touching the GPU.

mod conversation;
mod heal;
mod prompt;
mod store;

pub use conversation::{Conversation, OutgoingRequest, RequestPurpose};
pub use heal::{
    FailureDisposition, FixRequest, HealState, SelfHealCoordinator, DEFAULT_MAX_ATTEMPTS,
};
pub use prompt::fix_prompt;
pub use store::{Message, ShaderDraft, StudioState};
