//! Komodo release packager CLI entrypoint.
//!
//! This binary turns the prebuilt binaries under a Komodo checkout's
//! `releases/` directory into signed, per-platform release archives.

use clap::Parser;
use komodo_packager::cli::Cli;
use komodo_packager::error::Result;
use komodo_packager::output::{DryRunInfo, quiet_sink, write_stderr_line};
use komodo_packager::pipeline::ReleasePipeline;
use komodo_packager::runner::SystemCommandRunner;
use komodo_packager::workspace::resolve_repository_root;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Installs `env_logger` with a default filter from `-v`/`-q`; `RUST_LOG`
/// takes precedence.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let repo_root = resolve_repository_root(cli.repo_root.as_deref())?;
    let config = cli.to_config(&repo_root);
    log::debug!("repository root: {repo_root}");

    if cli.dry_run {
        write_stderr_line(stderr, DryRunInfo { config: &config }.display_text());
        return Ok(());
    }

    let runner = match config.command_timeout {
        Some(timeout) => SystemCommandRunner::with_timeout(timeout),
        None => SystemCommandRunner::new(),
    };

    let mut sink = quiet_sink();
    let progress: &mut dyn Write = if cli.quiet { &mut sink } else { stderr };
    let summary = ReleasePipeline::new(&config, &runner).run(progress)?;

    if cli.json {
        writeln!(stdout, "{}", summary.to_json()?)?;
    } else {
        write_stderr_line(progress, "");
        write_stderr_line(progress, summary.display_text());
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("Error: {err}"));
            1
        }
    }
}
