use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shadergen::Model;

#[derive(Parser, Debug)]
#[command(
    name = "promptgpu",
    author,
    version,
    about = "Describe a visual effect and watch it render as a live WGSL shader"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "PATH", env = "PROMPTGPU_CONFIG")]
    pub config: Option<PathBuf>,

    /// Generation service endpoint.
    #[arg(long, value_name = "URL", env = "PROMPTGPU_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model the generation service should use: `claude` or `gpt4o`.
    #[arg(long, value_name = "MODEL", value_parser = parse_model)]
    pub model: Option<Model>,

    /// Start from a hand-written WGSL fragment instead of the built-in gradient.
    #[arg(long, value_name = "FILE")]
    pub shader: Option<PathBuf>,

    /// Start with playback paused.
    #[arg(long)]
    pub paused: bool,

    /// Window or snapshot size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Render a single frame offscreen to this PNG and exit.
    #[arg(long, value_name = "PNG")]
    pub snapshot: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate a config file (or the discovered one) and print resolved values.
    Check {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// Print where the config file is looked up.
    Path,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_model(value: &str) -> Result<Model, String> {
    value.parse()
}
