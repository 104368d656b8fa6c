//! vaultutil binary
//!
//! ```text
//! eval "$(vaultutil aws --path aws --role admin)"
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use vaultutil::cli::{self, CliError, EXIT_OK, exit_code_for, render_error};
use vaultutil::commands::{self, Context};
use vaultutil::tracing::{LogLevel, init_tracing};

fn main() {
    // tracing may be unusable while panicking
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: cli::Cli) -> i32 {
    if let Err(e) = init_tracing(cli.tracing_config()) {
        eprintln!("{e:?}");
    }
    if matches!(cli.level, LogLevel::Trace) {
        tracing::warn!("Trace logging prints raw vault output, which includes secrets");
    }

    // The console command talks HTTPS to the AWS federation endpoint
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("A rustls crypto provider was already installed");
    }

    let ctx = Context {
        vault_bin: cli.vault_bin.clone(),
        json: cli.json,
    };
    let span = vaultutil::command_span!(cli.command.name());
    let _guard = span.enter();

    match commands::execute(&cli.command, &ctx) {
        Ok(output) => {
            print!("{output}");
            EXIT_OK
        }
        Err(err) => report(&err, cli.json),
    }
}

fn report(err: &CliError, json: bool) -> i32 {
    render_error(err, json);
    exit_code_for(err)
}
