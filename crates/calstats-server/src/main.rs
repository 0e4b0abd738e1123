//! calstats server entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use calstats_core::{TracingConfig, init_tracing};
use calstats_server::{AppState, ServerConfig, ServerError, ServerResult, StatsTimezone, serve};

/// calstats - Google Calendar statistics backend
#[derive(Debug, Parser)]
#[command(name = "calstats-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short, env = "CALSTATS_CONFIG")]
    config: Option<PathBuf>,

    /// OAuth client ID
    #[arg(long, env = "GOOGLE_CLIENT_ID", hide_env_values = true)]
    google_client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    google_client_secret: Option<String>,

    /// Google Cloud Console credentials JSON
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
    google_credentials_file: Option<PathBuf>,

    /// OAuth redirect URI
    #[arg(long, env = "GOOGLE_REDIRECT_URI")]
    google_redirect_uri: Option<String>,

    /// Dashboard URL (CORS origin and redirect target)
    #[arg(long, env = "FRONTEND_URL")]
    frontend_url: Option<String>,

    /// Session signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Session lifetime, e.g. 7d, 12h, 30m
    #[arg(long, env = "JWT_EXPIRES_IN")]
    jwt_expires_in: Option<String>,

    /// Listen address
    #[arg(long, env = "BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Listen port
    #[arg(long, short, env = "BACKEND_PORT")]
    port: Option<u16>,

    /// SQLite database file (tokens stay in memory when unset)
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Secure, strict session cookies
    #[arg(long, env = "CALSTATS_PRODUCTION")]
    production: Option<bool>,

    /// Log format: pretty, compact or json
    #[arg(long, env = "CALSTATS_LOG_FORMAT")]
    log_format: Option<String>,

    /// Timezone for the busiest day: local or utc
    #[arg(long, env = "STATS_TIMEZONE")]
    stats_timezone: Option<StatsTimezone>,
}

impl Cli {
    /// Overrides file settings with flags and environment variables.
    fn apply(self, config: &mut ServerConfig) {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut config.google_client_id, self.google_client_id.map(Some));
        set(&mut config.google_client_secret, self.google_client_secret.map(Some));
        set(&mut config.google_credentials_file, self.google_credentials_file.map(Some));
        set(&mut config.jwt_secret, self.jwt_secret.map(Some));
        set(&mut config.database_path, self.database_path.map(Some));
        set(&mut config.google_redirect_uri, self.google_redirect_uri);
        set(&mut config.frontend_url, self.frontend_url);
        set(&mut config.jwt_expires_in, self.jwt_expires_in);
        set(&mut config.bind_address, self.bind_address);
        set(&mut config.port, self.port);
        set(&mut config.production, self.production);
        set(&mut config.log_format, self.log_format);
        set(&mut config.stats_timezone, self.stats_timezone);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ServerError::MissingSettings { settings }) => {
            eprintln!("error: missing required settings:");
            for name in settings {
                eprintln!("  - {}", name);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load()?,
    };
    cli.apply(&mut config);
    config.validate()?;

    let tracing = if config.production {
        TracingConfig::production()
    } else {
        TracingConfig::server()
    };
    init_tracing(tracing.with_format(config.tracing_format()?))
        .map_err(|e| ServerError::config(e.to_string()))?;

    let state = AppState::new(&config)?;
    serve(&config, state).await
}
