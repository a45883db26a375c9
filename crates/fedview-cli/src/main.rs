//! fedview - entry point

use anyhow::Context;
use tracing::{error, info};

use fedview_cli::{Action, App, Args, CliError, FedviewConfig};
use fedview_telemetry::init_telemetry;

fn print_help() {
    println!(
        r"fedview - resolve federated posts and accounts

USAGE:
    fedview [OPTIONS] <COMMAND>

COMMANDS:
    resolve <IDENTIFIER>        Resolve a post URL or account handle
    post <URL>                  Resolve a post and its author
    profile <HANDLE>            Resolve an account profile
    recent <HANDLE>             List an account's most recent posts
    hashtag <TAG>               Search a hashtag and resolve every hit
    normalize <IDENTIFIER>      Print the normalized identifier
    classify <HOST> <MESSAGE>   Classify a raw error message for a host

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -n, --limit <N>        Number of posts for `recent` (default: 6)
        --chunked          Report `hashtag` results chunk by chunk
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    FEDVIEW_FETCH_TIMEOUT           Per-fetch timeout (default: 10s)
    FEDVIEW_PROBE_TIMEOUT           Host probe timeout (default: 5s)
    FEDVIEW_USER_AGENT              User-Agent for outgoing requests
    FEDVIEW_BLOCKED_HOSTS           Comma-separated hosts known to block us
    FEDVIEW_CHUNK_SIZE              Identifiers per chunk (default: 5)
    FEDVIEW_SEARCH_ENDPOINT         Search endpoint (default: floss.social)
    FEDVIEW_SEARCH_ACCESS_TOKEN     Search bearer token (or MASTODON_ACCESS_TOKEN)
    FEDVIEW_LOG_LEVEL               Log filter (default: warn)
    FEDVIEW_LOG_FORMAT              json, pretty or compact (default: json)
    FEDVIEW_METRICS_ADDR            Expose Prometheus metrics on this address

EXAMPLES:
    fedview post https://elk.zone/mastodon.social/@Gargron/1
    fedview recent --limit 3 @Gargron@mastodon.social
    fedview classify down.example 'fetch failed: ECONNREFUSED'
"
    );
}

fn load_config(args: &Args) -> anyhow::Result<FedviewConfig> {
    let config = match &args.config {
        Some(path) => FedviewConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => FedviewConfig::default(),
    }
    .with_env_overrides();

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let command = match args.action {
        Action::Help => {
            print_help();
            return;
        }
        Action::Version => {
            println!("fedview {}", fedview_cli::VERSION);
            return;
        }
        Action::Run(ref command) => command.clone(),
    };

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.telemetry_config()) {
        eprintln!("Failed to initialize telemetry: {e}");
        std::process::exit(1);
    }

    info!(version = fedview_cli::VERSION, "starting fedview");

    let app = match App::from_config(&config) {
        Ok(app) => app,
        Err(e) => {
            error!(category = e.category(), "failed to set up: {e}");
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    match app.run(command, &mut stdout).await {
        Ok(()) => {}
        // Already written to stdout as a classified-error record.
        Err(CliError::Resolution(_)) => std::process::exit(1),
        Err(e) => {
            error!(category = e.category(), "command failed: {e}");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
