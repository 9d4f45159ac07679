use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use token_sheller::cache::record;
use token_sheller::config::broker::{BrokerConfig, ConfigOverrides};
use token_sheller::config::proc_loader::file_to_settings;
use token_sheller::config::proc_validator::validate_broker_config;
use token_sheller::config::settings::BrokerSettings;
use token_sheller::observability::metrics::get_metrics;
use token_sheller::profile::TomlProfileStore;
use token_sheller::utils::logging::{self, LogLevel};
use token_sheller::TokenBroker;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional YAML settings file
    #[arg(short, long, env = "AKEYLESS_SHELLER_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "AKEYLESS_SHELLER_LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Shortcut for `--log-level debug`
    #[arg(
        long,
        env = "AKEYLESS_SHELLER_DEBUG",
        action = clap::ArgAction::Set,
        value_parser = parse_flag,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    debug: bool,
    /// akeyless binary, or a directory containing it
    #[arg(long, env = "AKEYLESS_SHELLER_CLI_PATH")]
    cli_path: Option<PathBuf>,
    #[arg(long, env = "AKEYLESS_SHELLER_PROFILE")]
    profile: Option<String>,
    /// The .akeyless home directory
    #[arg(long = "home", env = "AKEYLESS_SHELLER_HOME_DIRECTORY_PATH")]
    home_path: Option<PathBuf>,
    /// e.g. `10m`, `90s`
    #[arg(long, env = "AKEYLESS_SHELLER_EXPIRY_BUFFER", value_parser = humantime::parse_duration)]
    expiry_buffer: Option<Duration>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a valid token for the profile (default)
    Token {
        /// Print the whole token record as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the profiles found in the home directory
    Profiles,
    /// Validate the configuration and exit
    Check,
}

/// Any non-empty value other than `false`/`0` turns the flag on.
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(!matches!(value.trim().to_ascii_lowercase().as_str(), "" | "false" | "0" | "no"))
}

fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args and env, load settings
    // -------------------------------

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => file_to_settings(path)?,
        None => BrokerSettings::default(),
    };

    let logging_config = logging::resolve_logging_config(settings.logging.as_ref(), args.log_level, args.debug);
    logging::init_logging(&logging_config);

    // -------------------------------
    // 2. Assemble and validate the broker configuration
    // -------------------------------

    let overrides = ConfigOverrides {
        cli_path: args.cli_path.clone(),
        profile: args.profile.clone(),
        home_path: args.home_path.clone(),
        expiry_buffer: args.expiry_buffer,
    };
    let config = BrokerConfig::resolve(&settings, &overrides)?;

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    let result = run(args.command.unwrap_or(Command::Token { json: false }), &config);

    // -------------------------------
    // 4. Export metrics, even when the command failed
    // -------------------------------

    if let Some(path) = settings.metrics.as_ref().and_then(|m| m.textfile_path.as_ref()) {
        if let Err(err) = get_metrics().write_textfile(path) {
            warn!(path = %path.display(), error = %err, "failed to write metrics");
        }
    }

    result
}

fn run(command: Command, config: &BrokerConfig) -> Result<()> {
    match command {
        Command::Token { json } => {
            validate_broker_config(config)?;
            let broker = TokenBroker::from_config(config);
            let token = broker
                .get_token(&config.profile, config)
                .with_context(|| format!("failed to get a token for profile '{}'", config.profile))?;

            if json {
                let bytes = record::encode(&token)?;
                println!("{}", String::from_utf8(bytes)?);
            } else {
                println!("{}", token.token);
            }
        }
        Command::Profiles => {
            let store = TomlProfileStore::new(config.profiles_dir());
            for name in store.list_profiles()? {
                println!("{name}");
            }
        }
        Command::Check => {
            validate_broker_config(config)?;
            info!(
                cli_path = %config.cli_path.display(),
                profile = %config.profile,
                home_path = %config.home_path.display(),
                expiry_buffer = ?config.expiry_buffer,
                "configuration ok"
            );
            println!("ok");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_overrides_and_subcommand() {
        let args = Args::try_parse_from([
            "token-sheller",
            "--cli-path", "/opt/akeyless",
            "--profile", "prod",
            "--home", "/srv/.akeyless",
            "--expiry-buffer", "15m",
            "token", "--json",
        ])
        .unwrap();

        assert_eq!(args.profile.as_deref(), Some("prod"));
        assert_eq!(args.expiry_buffer, Some(Duration::from_secs(900)));
        assert!(matches!(args.command, Some(Command::Token { json: true })));
        assert!(!args.debug);

        let args = Args::try_parse_from(["token-sheller", "--debug", "profiles"]).unwrap();
        assert!(args.debug);
        assert!(matches!(args.command, Some(Command::Profiles)));
    }

    #[test]
    fn debug_flag_values() {
        assert_eq!(parse_flag("true"), Ok(true));
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag("false"), Ok(false));
        assert_eq!(parse_flag(""), Ok(false));
    }
}
