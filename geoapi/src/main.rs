//! Point d'entrée CLI pour geoapi

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::{fmt, EnvFilter};

use geoapi::{AppConfig, ErrorBody};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Propriétés géocodées sur PostGIS et statistiques de zone
#[derive(Parser)]
#[command(name = "geoapi")]
#[command(author, version)]
#[command(about = "Propriétés géocodées sur PostGIS et statistiques de zone")]
#[command(long_about = "Stocke des propriétés (géocode, parcelle, bâtiment, emprise d'image) dans PostGIS et calcule les statistiques d'une zone autour d'une propriété.\n\nLes erreurs sont écrites en JSON sur la sortie d'erreur avec un code de statut HTTP équivalent.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON (défaut : env GEOAPI_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, cli.quiet, Level::INFO);
            return report(&e);
        }
    };

    // La configuration est validée : le niveau est lisible
    init_logging(cli.verbose, cli.quiet, config.level().unwrap_or(Level::INFO));

    match cli::run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(e: &anyhow::Error) -> ExitCode {
    let body = ErrorBody::from_error(e);
    error!(status = body.status, "{e:#}");
    eprintln!(
        "{}",
        serde_json::to_string(&body).unwrap_or_else(|_| body.detail.message.clone())
    );
    ExitCode::FAILURE
}

fn init_logging(verbose: u8, quiet: bool, default: Level) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => default,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_stats_help() {
        let mut command = Cli::command();
        let help = command
            .find_subcommand_mut("stats")
            .unwrap()
            .render_help()
            .to_string();
        assert!(help.contains("Zone radius in meters (default: statistics.default_distance)"));
    }
}
