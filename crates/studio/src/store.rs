use std::sync::Arc;

use shadergen::{HistoryEntry, Model, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
}

/// The shader the studio currently shows.
#[derive(Debug, Clone)]
pub struct ShaderDraft {
    pub fragment: Arc<str>,
    pub compute: Option<String>,
    pub description: String,
}

/// Explicit owner of the session state; every change goes through a method.
#[derive(Debug)]
pub struct StudioState {
    model: Model,
    messages: Vec<Message>,
    next_message_id: u64,
    generating: bool,
    current_shader: Option<ShaderDraft>,
    playing: bool,
    error: Option<String>,
}

impl StudioState {
    pub fn new(model: Model, playing: bool) -> Self {
        Self {
            model,
            messages: Vec::new(),
            next_message_id: 1,
            generating: false,
            current_shader: None,
            playing,
            error: None,
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn add_message(&mut self, role: Role, content: impl Into<String>) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        self.messages.push(Message {
            id,
            role,
            content: content.into(),
        });
        id
    }

    /// The transcript in the shape the generation service expects.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .map(|message| HistoryEntry::new(message.role, message.content.clone()))
            .collect()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn set_generating(&mut self, generating: bool) {
        self.generating = generating;
    }

    pub fn current_shader(&self) -> Option<&ShaderDraft> {
        self.current_shader.as_ref()
    }

    pub fn set_current_shader(&mut self, shader: ShaderDraft) {
        self.current_shader = Some(shader);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Returns the new playback state.
    pub fn toggle_play(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Clears the transcript, shader and error. Model and playback survive.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.generating = false;
        self.current_shader = None;
        self.error = None;
    }
}

impl Default for StudioState {
    fn default() -> Self {
        Self::new(Model::default(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_get_increasing_ids() {
        let mut state = StudioState::default();
        let first = state.add_message(Role::User, "hello");
        let second = state.add_message(Role::Assistant, "hi");
        assert!(second > first);
        assert_eq!(state.history().len(), 2);
        assert_eq!(state.history()[1].role, Role::Assistant);
    }

    #[test]
    fn toggle_play_flips_state() {
        let mut state = StudioState::new(Model::Claude, true);
        assert!(!state.toggle_play());
        assert!(state.toggle_play());
    }

    #[test]
    fn reset_keeps_model_and_playback() {
        let mut state = StudioState::new(Model::Gpt4o, false);
        state.add_message(Role::User, "stars");
        state.set_error("boom");
        state.set_generating(true);
        state.set_current_shader(ShaderDraft {
            fragment: Arc::from("x"),
            compute: None,
            description: String::new(),
        });
        state.reset();
        assert!(state.messages().is_empty());
        assert!(state.error().is_none());
        assert!(!state.is_generating());
        assert!(state.current_shader().is_none());
        assert_eq!(state.model(), Model::Gpt4o);
        assert!(!state.is_playing());
    }
}
