mod bindings;
mod bootstrap;
mod cli;
mod host;
mod input;
mod paths;
mod run;
mod snapshot;
mod status;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::run(args)
}
