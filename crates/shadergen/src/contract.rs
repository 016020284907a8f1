use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Most recent chat messages sent along with a prompt.
pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    #[default]
    Claude,
    Gpt4o,
}

impl Model {
    pub fn as_str(self) -> &'static str {
        match self {
            Model::Claude => "claude",
            Model::Gpt4o => "gpt4o",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Model::Claude),
            "gpt4o" | "gpt-4o" => Ok(Model::Gpt4o),
            other => Err(format!("unknown model '{other}' (expected claude or gpt4o)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of `POST <endpoint>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    model: Model,
    #[serde(rename = "messages")]
    history: Vec<HistoryEntry>,
}

impl GenerationRequest {
    /// Keeps only the [`MAX_HISTORY`] most recent entries of `history`.
    pub fn new(prompt: impl Into<String>, model: Model, history: &[HistoryEntry]) -> Self {
        let start = history.len().saturating_sub(MAX_HISTORY);
        Self {
            prompt: prompt.into(),
            model,
            history: history[start..].to_vec(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

/// A schema-valid shader returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShader {
    pub fragment: String,
    pub compute: Option<String>,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<EnvelopeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    fragment: Option<String>,
    #[serde(default)]
    compute: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Validates a response body. Schema violations are generation failures.
pub fn parse_response(body: &str) -> Result<GeneratedShader, GenerationError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|err| GenerationError::Schema(format!("invalid JSON: {err}")))?;

    if !envelope.success {
        let message = envelope
            .error
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| "generation failed".to_string());
        return Err(GenerationError::Service(message));
    }

    let data = envelope
        .data
        .ok_or_else(|| GenerationError::Schema("missing `data`".to_string()))?;
    match data.mode.as_deref() {
        Some("shader") => {}
        Some(other) => {
            return Err(GenerationError::Schema(format!(
                "unsupported mode '{other}'"
            )))
        }
        None => return Err(GenerationError::Schema("missing `mode`".to_string())),
    }
    let fragment = data
        .fragment
        .filter(|fragment| !fragment.trim().is_empty())
        .ok_or_else(|| GenerationError::Schema("missing or empty `fragment`".to_string()))?;

    Ok(GeneratedShader {
        fragment,
        compute: data.compute.filter(|compute| !compute.trim().is_empty()),
        description: data.description.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(count: usize) -> Vec<HistoryEntry> {
        (0..count)
            .map(|index| {
                let role = if index % 2 == 0 {
                    Role::User
                } else {
                    Role::Assistant
                };
                HistoryEntry::new(role, format!("message {index}"))
            })
            .collect()
    }

    #[test]
    fn request_keeps_ten_most_recent_messages() {
        let request = GenerationRequest::new("plasma", Model::Claude, &history(14));
        assert_eq!(request.history().len(), MAX_HISTORY);
        assert_eq!(request.history()[0].content, "message 4");
        assert_eq!(request.history()[9].content, "message 13");
    }

    #[test]
    fn request_serializes_to_service_shape() {
        let request = GenerationRequest::new("waves", Model::Gpt4o, &history(1));
        let value = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(
            value,
            serde_json::json!({
                "prompt": "waves",
                "model": "gpt4o",
                "messages": [{ "role": "user", "content": "message 0" }],
            })
        );
    }

    #[test]
    fn model_parses_known_names() {
        assert_eq!("Claude".parse::<Model>(), Ok(Model::Claude));
        assert_eq!("gpt-4o".parse::<Model>(), Ok(Model::Gpt4o));
        assert!("llama".parse::<Model>().is_err());
    }

    #[test]
    fn successful_envelope_yields_shader() {
        let body = r#"{
            "success": true,
            "data": {
                "mode": "shader",
                "fragment": "@fragment fn fs_main() {}",
                "compute": null,
                "description": "Blue plasma"
            }
        }"#;
        let shader = parse_response(body).expect("valid response");
        assert_eq!(shader.fragment, "@fragment fn fs_main() {}");
        assert_eq!(shader.compute, None);
        assert_eq!(shader.description, "Blue plasma");
    }

    #[test]
    fn service_error_is_reported_verbatim() {
        let err = parse_response(r#"{ "success": false, "error": "Prompt is required" }"#)
            .expect_err("service error");
        assert!(matches!(err, GenerationError::Service(ref msg) if msg == "Prompt is required"));
    }

    #[test]
    fn wrong_mode_is_a_schema_error() {
        let body = r#"{ "success": true, "data": { "mode": "scene", "fragment": "x" } }"#;
        assert!(matches!(
            parse_response(body),
            Err(GenerationError::Schema(_))
        ));
    }

    #[test]
    fn blank_fragment_is_a_schema_error() {
        let body = r#"{ "success": true, "data": { "mode": "shader", "fragment": "  " } }"#;
        assert!(matches!(
            parse_response(body),
            Err(GenerationError::Schema(_))
        ));
    }

    #[test]
    fn non_json_body_is_a_schema_error() {
        assert!(matches!(
            parse_response("<html>502</html>"),
            Err(GenerationError::Schema(_))
        ));
    }
}
