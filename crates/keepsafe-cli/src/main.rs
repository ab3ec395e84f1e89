mod cli;
mod commands;
mod config;
mod vault;

use std::io::{self, Write};

use crate::cli::ConfigCommand;
use crate::commands::PasswordSource;
use clap::Parser;
use color_eyre::Result;
use keepsafe_vault::generator::generate_password;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the vault.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    let mut out = io::stdout().lock();
    match cli.command {
        cli::Command::Add {
            website,
            username,
            password,
            generate,
            length,
        } => {
            let source = match (password, generate) {
                (Some(password), _) => PasswordSource::Given(password),
                (None, true) => PasswordSource::Generate(commands::generator_length(length, &config)),
                (None, false) => PasswordSource::Stdin,
            };
            let vault = vault::vault_from_config(&config)?;
            commands::add(&vault, &website, &username, source, &mut out)?;
        }
        cli::Command::List { query, json } => {
            let vault = vault::vault_from_config(&config)?;
            commands::list(&vault, query.as_deref(), json, &mut out)?;
        }
        cli::Command::Reveal { id } => {
            let vault = vault::vault_from_config(&config)?;
            commands::reveal(&vault, id, &mut out)?;
        }
        cli::Command::Delete { id } => {
            let vault = vault::vault_from_config(&config)?;
            commands::delete(&vault, id, &mut out)?;
        }
        cli::Command::Generate { length } => {
            let password = generate_password(commands::generator_length(length, &config));
            writeln!(out, "{}", password.as_str())?;
        }
        cli::Command::Health => run_health_check(&config)?,
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to warn. Logs go to stderr so
    // revealed passwords on stdout can be piped cleanly.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("keepsafe {}", env!("CARGO_PKG_VERSION"));
}

/// Runs a quick health check of the key file, cipher and database.
fn run_health_check(config: &config::Config) -> Result<()> {
    let vault = vault::vault_from_config(config)?;
    commands::health(&vault)?;
    println!("Vault: ok");
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
