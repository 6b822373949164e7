#![forbid(unsafe_code)]

use std::fs;
use std::io::{IsTerminal, Write};
use std::path::Path;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pls::cli::Args;
use pls::config::{CascadePolicy, Config, ConfigLoader};
use pls::git::{GitCli, VcsStatusMap};
use pls::node::Owners;
use pls::options::Options;
use pls::render::{listing_to_lines, RenderConfig};
use pls::terminal;
use pls::tree::{absolute_target, is_real_dir, Context, Listing};

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "PLS_LOG";

fn main() {
    if let Err(e) = run_app() {
        eprintln!("pls: {e:#}");
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let args = Args::parse().validated();
    init_tracing(&args);

    let unresolved = || format!("{}: failed to resolve path", args.path.display());
    let path = absolute_target(&args.path).with_context(unresolved)?;
    // A broken symlink still exists as a node; only a missing path is an error.
    fs::symlink_metadata(&path).with_context(unresolved)?;
    let dir = if is_real_dir(&path) {
        path.as_path()
    } else {
        path.parent().unwrap_or(&path)
    };

    let vcs = VcsStatusMap::discover(&GitCli, dir);
    let policy = CascadePolicy::from_env(vcs.root().map(Path::to_path_buf));
    let mut loader = ConfigLoader::new();
    let config = Config::resolve(&path, &policy, &mut loader)?;
    debug!(files = ?config.files, "configuration resolved");
    let options = Options::resolve(&args, &config.prefs)?;

    let owners = Owners::new();
    let ctx = Context {
        config: &config,
        vcs: &vcs,
        options: &options,
        owners: &owners,
    };
    let listing = Listing::read(&path, &ctx)
        .with_context(|| format!("{}: failed to read directory", path.display()))?;

    let render_config = RenderConfig {
        use_color: !args.no_color && std::io::stdout().is_terminal(),
    };
    let lines = listing_to_lines(&listing, &ctx, &render_config);

    let mut stdout = terminal::buffered_stdout();
    terminal::write_lines(&mut stdout, &lines, render_config.use_color)
        .context("failed to write listing")?;
    stdout.flush().context("failed to write listing")?;
    Ok(())
}

/// Log to stderr. `PLS_LOG` takes a filter directive; without it the level
/// follows `-v`. `--quiet` always limits output to errors.
fn init_tracing(args: &Args) {
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if args.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
