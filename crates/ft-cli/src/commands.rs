use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::Context;
use ft_tree::TreeConfig;
use tracing::debug;

use crate::cli::*;
use crate::session::{Session, Summary};

/// Run the selected subcommand and report whether every command succeeded.
pub fn run_command(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "tree configuration");

    let mut session = Session::new(config, cli.format);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = match cli.command {
        Command::Run(args) => cmd_run(&mut session, &args, &mut out)?,
        Command::Shell => session.run(io::stdin().lock(), &mut out)?,
    };
    debug!(executed = summary.executed, failed = summary.failed, "run finished");
    Ok(summary.succeeded())
}

fn cmd_run<W: io::Write>(
    session: &mut Session,
    args: &RunArgs,
    out: &mut W,
) -> anyhow::Result<Summary> {
    let file = File::open(&args.script)
        .with_context(|| format!("failed to open script {}", args.script.display()))?;
    session.run(BufReader::new(file), out)
}

/// Read tree settings from a TOML file, or use the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<TreeConfig> {
    let Some(path) = path else {
        return Ok(TreeConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}
