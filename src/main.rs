//! CLI entrypoint for `breachwatch`.
//!
//! Parses command-line arguments, configures logging and color, builds the
//! shared session (HTTP client, endpoints, API keys) and hands stdin/stdout to
//! the interactive menu. Reports are written under `--reports-dir`.
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use breachwatch::console::Console;
use breachwatch::prelude::*;
use breachwatch::session::{ApiKeys, Endpoints};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{LevelFilter, error, info};

#[derive(Parser, Debug)]
#[command(
    name = "breachwatch",
    version,
    about = "Breach intelligence and OSINT reporter (Rust)"
)]
struct Args {
    /// Directory where reports are saved
    #[arg(long = "reports-dir", default_value = "reports")]
    reports_dir: PathBuf,

    /// Override every source's request timeout (seconds, at least 1)
    #[arg(long = "timeout", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Have I Been Pwned API key
    #[arg(long = "hibp-key", env = "HIBP_API_KEY", hide_env_values = true)]
    hibp_key: Option<String>,

    /// Dehashed API key (sent as the Basic authorization token)
    #[arg(long = "dehashed-key", env = "DEHASHED_API_KEY", hide_env_values = true)]
    dehashed_key: Option<String>,

    /// XposedOrNot API key for domain breach lookups
    #[arg(long = "xon-key", env = "XON_API_KEY", hide_env_values = true)]
    xon_key: Option<String>,

    /// Send every HTTP lookup to this base URL instead of the public services
    #[arg(long = "endpoint-base", hide = true)]
    endpoint_base: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress the banner
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

const ASCII_TITLE: &str = r#"
 ____                      _    __        __    _       _
| __ ) _ __ ___  __ _  ___| |__ \ \      / /_ _| |_ ___| |__
|  _ \| '__/ _ \/ _` |/ __| '_ \ \ \ /\ / / _` | __/ __| '_ \
| |_) | | |  __/ (_| | (__| | | | \ V  V / (_| | || (__| | | |
|____/|_|  \___|\__,_|\___|_| |_|  \_/\_/ \__,_|\__\___|_| |_|
"#;

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn session_config(args: &Args) -> SessionConfig {
    SessionConfig {
        endpoints: args
            .endpoint_base
            .as_deref()
            .map(Endpoints::all_at)
            .unwrap_or_default(),
        keys: ApiKeys::new(
            args.hibp_key.clone(),
            args.dehashed_key.clone(),
            args.xon_key.clone(),
        ),
        timeout_override: args.timeout.map(Duration::from_secs),
        ..SessionConfig::default()
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }

    let session = match Session::new(session_config(&args)) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    };

    if !args.quiet {
        println!("{}", ASCII_TITLE.bold().green());
        println!(
            "{}",
            "For authorized security research and self-assessment only.".dimmed()
        );
    }

    let console = Console::new(&session, args.reports_dir);
    info!("reports directory: {}", console.reports_dir().display());
    let stdin = io::stdin();
    if let Err(e) = console.run(stdin.lock(), io::stdout()) {
        error!("console I/O failed: {:#}", e);
        std::process::exit(3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_must_be_positive() {
        assert!(Args::try_parse_from(["breachwatch", "--timeout", "0"]).is_err());
        let args = Args::try_parse_from(["breachwatch", "--timeout", "5"]).unwrap();
        assert_eq!(
            session_config(&args).timeout_override,
            Some(Duration::from_secs(5))
        );
    }
}
