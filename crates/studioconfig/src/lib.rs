use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use shadergen::{DEFAULT_ENDPOINT, MAX_HISTORY};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSetting {
    #[default]
    Claude,
    #[serde(alias = "gpt-4o")]
    Gpt4o,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StudioConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub heal: HealSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub model: ModelSetting,
    /// `None` waits for the service indefinitely.
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt"
    )]
    pub timeout: Option<Duration>,
    #[serde(default = "default_history")]
    pub history: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub start_paused: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_version() -> u32 {
    1
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> Option<Duration> {
    Some(Duration::from_secs(90))
}

fn default_history() -> usize {
    MAX_HISTORY
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: ModelSetting::default(),
            timeout: default_timeout(),
            history: default_history(),
        }
    }
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            start_paused: false,
        }
    }
}

impl Default for HealSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            generation: GenerationSection::default(),
            render: RenderSection::default(),
            heal: HealSection::default(),
        }
    }
}

/// Accepts `"90s"`-style strings, whole or fractional seconds, or `"none"`.
fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as seconds, a human-readable string, or \"none\"")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.trim().eq_ignore_ascii_case("none") {
                return Ok(None);
            }
            humantime::parse_duration(v.trim())
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(|secs| Some(Duration::from_secs(secs)))
                .map_err(|_| E::custom("duration must be non-negative"))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a non-negative number"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_str(&humantime::format_duration(*duration).to_string())
        }
        None => serializer.serialize_str("none"),
    }
}

impl StudioConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: StudioConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Budget handed to the self-heal coordinator; 0 disables it.
    pub fn heal_attempts(&self) -> u32 {
        if self.heal.enabled {
            self.heal.max_attempts
        } else {
            0
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }
        if self.generation.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "generation.endpoint must not be empty".into(),
            ));
        }
        if self.generation.history > MAX_HISTORY {
            return Err(ConfigError::Invalid(format!(
                "generation.history must be at most {MAX_HISTORY}"
            )));
        }
        if let Some(timeout) = self.generation.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::Invalid(
                    "generation.timeout must be greater than zero".into(),
                ));
            }
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "render size {}x{} must be non-zero",
                self.render.width, self.render.height
            )));
        }
        if self.heal.enabled && self.heal.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "heal.max_attempts must be at least 1 when healing is enabled".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[generation]
endpoint = "https://shaders.example.com/api/generate"
model = "gpt4o"
timeout = "45s"
history = 6

[render]
width = 800
height = 600
start_paused = true

[heal]
max_attempts = 2
"#;

    #[test]
    fn parses_full_config() {
        let config = StudioConfig::from_toml_str(SAMPLE).expect("config parses");
        assert_eq!(
            config.generation.endpoint,
            "https://shaders.example.com/api/generate"
        );
        assert_eq!(config.generation.model, ModelSetting::Gpt4o);
        assert_eq!(config.generation.timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.generation.history, 6);
        assert_eq!((config.render.width, config.render.height), (800, 600));
        assert!(config.render.start_paused);
        assert_eq!(config.heal_attempts(), 2);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = StudioConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config.generation.endpoint, shadergen::DEFAULT_ENDPOINT);
        assert_eq!(config.generation.history, shadergen::MAX_HISTORY);
        assert_eq!(config.generation.model, ModelSetting::Claude);
        assert_eq!(config.generation.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.heal_attempts(), 3);
        assert!(!config.render.start_paused);
    }

    #[test]
    fn timeout_accepts_seconds_and_none() {
        let config = StudioConfig::from_toml_str("[generation]\ntimeout = 30\n").unwrap();
        assert_eq!(config.generation.timeout, Some(Duration::from_secs(30)));
        let config = StudioConfig::from_toml_str("[generation]\ntimeout = \"none\"\n").unwrap();
        assert_eq!(config.generation.timeout, None);
    }

    #[test]
    fn disabled_heal_means_zero_attempts() {
        let config =
            StudioConfig::from_toml_str("[heal]\nenabled = false\nmax_attempts = 0\n").unwrap();
        assert_eq!(config.heal_attempts(), 0);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = StudioConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_attempts_when_enabled() {
        let err = StudioConfig::from_toml_str("[heal]\nmax_attempts = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn rejects_history_beyond_limit() {
        let err = StudioConfig::from_toml_str("[generation]\nhistory = 11\n").unwrap_err();
        assert!(err.to_string().contains("history"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = StudioConfig::from_toml_str("[render]\nfps = 60\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialized_defaults_parse_back() {
        let rendered = StudioConfig::default()
            .to_toml_string()
            .expect("serialize defaults");
        let parsed = StudioConfig::from_toml_str(&rendered).expect("round trip");
        assert_eq!(parsed.generation.timeout, Some(Duration::from_secs(90)));
    }
}
