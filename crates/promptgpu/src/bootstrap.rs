use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use shadergen::Model;
use studioconfig::StudioConfig;
use tracing::{debug, info};

use crate::bindings::model_from_setting;
use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Shown until the first generated shader arrives.
pub const INITIAL_SHADER: &str = r#"@fragment
fn fs_main(@builtin(position) frag: vec4f) -> @location(0) vec4f {
    let uv = frag.xy / params.resolution;
    let t = params.time;
    let r = 0.5 + 0.5 * sin(t + uv.x * 3.0);
    let g = 0.5 + 0.5 * sin(t * 1.3 + uv.y * 3.0 + 2.0);
    let b = 0.5 + 0.5 * sin(t * 0.7 + (uv.x + uv.y) * 2.0 + 4.0);
    return vec4f(r, g, b, 1.0);
}
"#;

pub const INITIAL_DESCRIPTION: &str = "Animated RGB gradient";

/// Everything a run needs once the file, env, and flags have been merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub model: Model,
    pub timeout: Option<Duration>,
    pub history: usize,
    pub width: u32,
    pub height: u32,
    pub start_paused: bool,
    pub heal_attempts: u32,
    pub initial_fragment: String,
    pub initial_description: String,
}

impl Settings {
    pub fn resolve(args: &RunArgs, config: &StudioConfig) -> Result<Self> {
        let (width, height) = match args.size.as_deref() {
            Some(size) => parse_surface_size(size)?,
            None => (config.render.width, config.render.height),
        };
        let (initial_fragment, initial_description) = match args.shader.as_deref() {
            Some(path) => (load_fragment(path)?, describe_file(path)),
            None => (INITIAL_SHADER.to_string(), INITIAL_DESCRIPTION.to_string()),
        };
        Ok(Self {
            endpoint: args
                .endpoint
                .clone()
                .unwrap_or_else(|| config.generation.endpoint.clone()),
            model: args
                .model
                .unwrap_or_else(|| model_from_setting(config.generation.model)),
            timeout: config.generation.timeout,
            history: config.generation.history,
            width,
            height,
            start_paused: args.paused || config.render.start_paused,
            heal_attempts: config.heal_attempts(),
            initial_fragment,
            initial_description,
        })
    }
}

/// The `--config` path if given, otherwise `config.toml` in the config directory.
pub fn config_path(args: &RunArgs, paths: &AppPaths) -> PathBuf {
    args.config.clone().unwrap_or_else(|| paths.config_file())
}

/// A missing file yields defaults; an unreadable or invalid one is an error.
pub fn load_config(path: &Path) -> Result<StudioConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(StudioConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = StudioConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X'])
        .with_context(|| format!("size must be WIDTHxHEIGHT, got {trimmed}"))?;
    let width: u32 = w
        .trim()
        .parse()
        .with_context(|| format!("invalid width in {trimmed}"))?;
    let height: u32 = h
        .trim()
        .parse()
        .with_context(|| format!("invalid height in {trimmed}"))?;
    if width == 0 || height == 0 {
        bail!("size must be non-zero, got {width}x{height}");
    }
    Ok((width, height))
}

fn load_fragment(path: &Path) -> Result<String> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read shader {}", path.display()))?;
    if source.trim().is_empty() {
        bail!("shader file {} is empty", path.display());
    }
    Ok(source)
}

fn describe_file(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_surface_size() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 64X32 ").unwrap(), (64, 32));
        assert!(parse_surface_size("0x10").is_err());
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("axb").is_err());
    }

    #[test]
    fn flags_override_config() {
        let config = StudioConfig::from_toml_str(
            r#"
            [generation]
            endpoint = "http://studio.local/api/generate"
            model = "gpt4o"

            [render]
            width = 640
            height = 480
            "#,
        )
        .unwrap();
        let args = RunArgs {
            model: Some(Model::Claude),
            size: Some("320x200".into()),
            paused: true,
            ..RunArgs::default()
        };
        let settings = Settings::resolve(&args, &config).unwrap();
        assert_eq!(settings.endpoint, "http://studio.local/api/generate");
        assert_eq!(settings.model, Model::Claude);
        assert_eq!((settings.width, settings.height), (320, 200));
        assert!(settings.start_paused);
        assert_eq!(settings.heal_attempts, 3);
        assert_eq!(settings.initial_description, INITIAL_DESCRIPTION);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.render.width, 1280);
        assert!(config.heal.enabled);
    }

    #[test]
    fn shader_flag_loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "@fragment fn fs_main() -> @location(0) vec4f {{ return vec4f(1.0); }}")
            .unwrap();
        let args = RunArgs {
            shader: Some(file.path().to_path_buf()),
            ..RunArgs::default()
        };
        let settings = Settings::resolve(&args, &StudioConfig::default()).unwrap();
        assert!(settings.initial_fragment.contains("fs_main"));
        assert_ne!(settings.initial_description, INITIAL_DESCRIPTION);
    }

    #[test]
    fn initial_shader_passes_front_end() {
        let diagnostics = engine::preflight(INITIAL_SHADER);
        assert!(diagnostics.is_empty(), "{diagnostics}");
    }
}
