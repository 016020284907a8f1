use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{config_path, load_config, Settings};
use crate::cli::{Cli, Command, ConfigAction, RunArgs};
use crate::paths::AppPaths;
use crate::{host, snapshot};

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing(cli.run.verbose);

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved promptgpu paths");

    match cli.command {
        Some(Command::Config(command)) => run_config(command.action, &cli.run, &paths),
        None => {
            let config = load_config(&config_path(&cli.run, &paths))?;
            let settings = Settings::resolve(&cli.run, &config)?;
            match cli.run.snapshot.as_deref() {
                Some(output) => snapshot::export(&settings, output),
                None => {
                    tracing::info!(
                        model = %settings.model,
                        size = %format!("{}x{}", settings.width, settings.height),
                        "starting shader studio"
                    );
                    host::run_studio(settings)
                }
            }
        }
    }
}

fn initialise_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_config(action: ConfigAction, args: &RunArgs, paths: &AppPaths) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", config_path(args, paths).display());
            Ok(())
        }
        ConfigAction::Check { path } => {
            let explicit = path.is_some();
            let path: PathBuf = path.unwrap_or_else(|| config_path(args, paths));
            if explicit && !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            let config = load_config(&path)?;
            let rendered = config
                .to_toml_string()
                .context("failed to render resolved configuration")?;
            if path.exists() {
                println!("config ok: {}", path.display());
            } else {
                println!("no config at {}; defaults apply", path.display());
            }
            print!("{rendered}");
            Ok(())
        }
    }
}
