//! GameDash Auth - operator tool for the request-signing configuration.

use std::env;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gamedash_auth::auth::{Clock, RequestSigner, SystemClock};
use gamedash_auth::config::Settings;
use gamedash_auth::error::AuthError;
use gamedash_auth::protocol::SignedRequestEnvelope;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");
const DEFAULT_CONFIG_PATH: &str = "/etc/gamedash/auth.toml";

fn main() -> ExitCode {
    // Parse command line arguments (simple std::env approach)
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let (config_path, positional) = split_args(&args);
    let Some((command, rest)) = positional.split_first() else {
        print_help();
        return ExitCode::FAILURE;
    };

    let settings = match Settings::load(&config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration loaded from: {}", config_path);

    let result = match command.as_str() {
        "check" => run_check(&settings),
        "sign" => run_sign(&settings, rest),
        other => {
            eprintln!("Unknown command '{}'", other);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, command = %command, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load every secret the configuration references.
fn run_check(settings: &Settings) -> Result<(), AuthError> {
    let registry = settings.client_registry()?;
    println!("clients:        {} provisioned", registry.len());

    if !settings.clients.is_empty() {
        settings.session_secret()?;
        println!("session secret: ok");
    }

    println!("session ttl:    {}s", settings.session.ttl_seconds);
    println!(
        "signature:      window {}s, nonce ttl {}s, nonce capacity {}",
        settings.signature.timestamp_window_seconds,
        settings.signature.nonce_ttl_seconds,
        settings.signature.nonce_capacity
    );

    if let Some(client) = &settings.client {
        client.secret()?;
        println!("client:         {} -> {}", client.client_id, client.base_url);
    }

    println!("configuration ok");
    Ok(())
}

/// Print the signature headers the `[client]` identity would send.
fn run_sign(settings: &Settings, args: &[String]) -> Result<(), AuthError> {
    let (method, path, body) = match args {
        [method, path] => (method, path, ""),
        [method, path, body] => (method, path, body.as_str()),
        _ => {
            return Err(AuthError::Config {
                message: "usage: sign METHOD PATH [BODY]".to_string(),
            })
        }
    };

    let client = settings.client.as_ref().ok_or_else(|| AuthError::Config {
        message: "No [client] section configured".to_string(),
    })?;
    let secret = client.secret()?;
    let signer = RequestSigner::new(client.client_id.clone(), &secret);

    let method = method.to_ascii_uppercase();
    let signature = signer.sign_request(&method, path, body.as_bytes(), SystemClock.now())?;
    let envelope =
        SignedRequestEnvelope::signed(&method, path, body.as_bytes().to_vec(), signature);

    for (name, value) in envelope.signature_headers() {
        println!("{}: {}", name, value);
    }
    Ok(())
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Request-signing and session configuration tool for GameDash.

USAGE:
    {} [OPTIONS] <COMMAND>

COMMANDS:
    check                      Validate configuration and load every secret
    sign METHOD PATH [BODY]    Print signature headers for a request

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {}]
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME, DEFAULT_CONFIG_PATH
    );
}

/// Separate the config path from positional arguments.
fn split_args(args: &[String]) -> (String, Vec<String>) {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--config" || arg == "-c" {
            if let Some(path) = iter.next() {
                config_path = path.clone();
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config_path = path.to_string();
        } else {
            positional.push(arg.clone());
        }
    }

    (config_path, positional)
}

/// Initialize logging based on settings.
///
/// Logs go to stderr so `sign` output stays pipeable.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            // Default to pretty format
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
