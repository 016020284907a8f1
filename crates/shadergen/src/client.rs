use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use tracing::debug;

use crate::contract::{parse_response, GeneratedShader, GenerationRequest};
use crate::error::GenerationError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/generate";

/// Anything that can turn a request into a shader. The HTTP client is the
/// production implementation; tests substitute their own.
pub trait ShaderGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedShader, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: Client,
    endpoint: Url,
}

impl GenerationClient {
    /// `timeout` bounds the whole round-trip; `None` waits indefinitely.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, GenerationError> {
        let endpoint = Url::parse(endpoint).map_err(|err| GenerationError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        })?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ShaderGenerator for GenerationClient {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedShader, GenerationError> {
        if request.prompt().trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        debug!(
            endpoint = %self.endpoint,
            model = %request.model(),
            history = request.history().len(),
            "requesting shader"
        );
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        interpret(status, &body)
    }
}

/// Maps an HTTP status and body onto the response contract. Error statuses
/// still carry a JSON envelope when the service produced them.
fn interpret(status: u16, body: &str) -> Result<GeneratedShader, GenerationError> {
    if (200..300).contains(&status) {
        return parse_response(body);
    }
    match parse_response(body) {
        Err(err @ GenerationError::Service(_)) => Err(err),
        _ => Err(GenerationError::Status {
            status,
            message: summarize(body),
        }),
    }
}

fn summarize(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response".to_string();
    }
    match trimmed.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_prefers_service_message() {
        let err = interpret(400, r#"{ "success": false, "error": "Prompt is required" }"#)
            .expect_err("bad request");
        assert_eq!(err.to_string(), "Prompt is required");
    }

    #[test]
    fn error_status_without_envelope_keeps_status() {
        let err = interpret(502, "Bad Gateway").expect_err("gateway error");
        assert!(matches!(err, GenerationError::Status { status: 502, ref message } if message == "Bad Gateway"));
    }

    #[test]
    fn ok_status_goes_through_schema_validation() {
        let err = interpret(200, r#"{ "success": true }"#).expect_err("missing data");
        assert!(matches!(err, GenerationError::Schema(_)));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let err = GenerationClient::new("not a url", None).expect_err("invalid url");
        assert!(matches!(err, GenerationError::InvalidEndpoint { .. }));
    }

    #[test]
    fn blank_prompt_is_rejected_before_sending() {
        let client = GenerationClient::new(DEFAULT_ENDPOINT, Some(Duration::from_secs(1)))
            .expect("client builds");
        let request = GenerationRequest::new("   ", crate::Model::Claude, &[]);
        assert!(matches!(
            client.generate(&request),
            Err(GenerationError::EmptyPrompt)
        ));
    }
}
