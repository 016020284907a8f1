use std::sync::Arc;

use shadergen::{GeneratedShader, GenerationError, GenerationRequest, Role, MAX_HISTORY};

use crate::heal::{FailureDisposition, SelfHealCoordinator};
use crate::store::{ShaderDraft, StudioState};

/// Transcript notes for shaders that arrive without a description.
const GENERATED_FALLBACK: &str = "Shader generated successfully.";
const CORRECTED_FALLBACK: &str = "Shader corrected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPurpose {
    UserPrompt,
    SelfHeal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub purpose: RequestPurpose,
    pub request: GenerationRequest,
}

/// Drives the chat side of the loop: prompts out, shaders in, compile
/// results back, and corrective requests when the coordinator asks for one.
#[derive(Debug)]
pub struct Conversation {
    state: StudioState,
    heal: SelfHealCoordinator,
    history_limit: usize,
}

impl Conversation {
    pub fn new(state: StudioState, heal: SelfHealCoordinator) -> Self {
        Self {
            state,
            heal,
            history_limit: MAX_HISTORY,
        }
    }

    /// Prior messages sent with each prompt, capped at [`MAX_HISTORY`].
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.min(MAX_HISTORY);
        self
    }

    pub fn state(&self) -> &StudioState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StudioState {
        &mut self.state
    }

    pub fn heal(&self) -> &SelfHealCoordinator {
        &self.heal
    }

    /// Blank prompts and prompts sent while generating are dropped.
    pub fn submit_prompt(&mut self, prompt: &str) -> Option<OutgoingRequest> {
        let prompt = prompt.trim();
        if prompt.is_empty() || self.state.is_generating() {
            return None;
        }
        let history = self.state.history();
        let recent = &history[history.len().saturating_sub(self.history_limit)..];
        let request = GenerationRequest::new(prompt, self.state.model(), recent);
        self.state.dismiss_error();
        self.state.add_message(Role::User, prompt);
        self.state.set_generating(true);
        self.heal.user_prompt_started();
        Some(OutgoingRequest {
            purpose: RequestPurpose::UserPrompt,
            request,
        })
    }

    /// Returns the shader to submit to the engine, if the round-trip produced one.
    pub fn on_generation_result(
        &mut self,
        purpose: RequestPurpose,
        result: Result<GeneratedShader, GenerationError>,
    ) -> Option<ShaderDraft> {
        self.state.set_generating(false);
        match result {
            Ok(shader) => {
                let description = if shader.description.trim().is_empty() {
                    match purpose {
                        RequestPurpose::UserPrompt => GENERATED_FALLBACK.to_string(),
                        RequestPurpose::SelfHeal => CORRECTED_FALLBACK.to_string(),
                    }
                } else {
                    shader.description
                };
                let draft = ShaderDraft {
                    fragment: Arc::from(shader.fragment),
                    compute: shader.compute,
                    description,
                };
                let note = match purpose {
                    RequestPurpose::UserPrompt => draft.description.clone(),
                    RequestPurpose::SelfHeal => format!("Fixed: {}", draft.description),
                };
                self.state.add_message(Role::Assistant, note);
                self.state.dismiss_error();
                self.state.set_current_shader(draft.clone());
                self.heal.track_ai_submission(draft.fragment.clone());
                Some(draft)
            }
            Err(err) => {
                tracing::warn!(?purpose, error = %err, "shader generation failed");
                match purpose {
                    RequestPurpose::UserPrompt => {
                        self.state.add_message(Role::Assistant, format!("Error: {err}"));
                        self.state.set_error(err.to_string());
                    }
                    RequestPurpose::SelfHeal => {
                        self.state
                            .add_message(Role::Assistant, format!("Auto-fix failed: {err}"));
                        self.heal.regeneration_failed();
                    }
                }
                None
            }
        }
    }

    /// Feeds the engine's verdict on `fragment` back into the session.
    pub fn on_compile_result(&mut self, fragment: &Arc<str>, result: Result<(), &str>) {
        match result {
            Ok(()) => self.heal.record_success(),
            Err(message) => {
                self.state.set_error(message);
                if let FailureDisposition::Exhausted { attempts } =
                    self.heal.record_failure(fragment, message)
                {
                    self.state.add_message(
                        Role::Assistant,
                        format!("Auto-fix gave up after {attempts} attempts"),
                    );
                }
            }
        }
    }

    /// The corrective request for a pending fix, sent without chat history.
    pub fn next_fix_request(&mut self) -> Option<OutgoingRequest> {
        let fix = self.heal.take_fix_request(self.state.is_generating())?;
        let headline = fix.error.lines().next().unwrap_or_default();
        self.state.add_message(
            Role::Assistant,
            format!("WGSL error detected, auto-fixing: {headline}"),
        );
        self.state.set_generating(true);
        Some(OutgoingRequest {
            purpose: RequestPurpose::SelfHeal,
            request: GenerationRequest::new(fix.prompt, self.state.model(), &[]),
        })
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.heal.reset();
    }
}
