use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use joblinker_session::{
    token, ApiClient, FileTokenStore, HttpRefreshClient, LoginRequest, NavigationOutcome,
    RegisterRequest, RouteGuard, SessionConfig, SessionContext, SessionError,
};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "joblinker-session", about = "Drive a JobLinker session from the command line")]
struct Cli {
    /// Session file to use instead of SESSION_FILE.
    #[arg(long, env = "SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the issued tokens.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBLINKER_PASSWORD")]
        password: String,
    },
    /// Create an account and persist the issued tokens.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBLINKER_PASSWORD")]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Revoke the refresh token and clear the local session.
    Logout,
    /// Show the profile of the signed-in user.
    Whoami,
    /// Show what is stored locally without contacting the backend.
    Status,
    /// Run the route guard for a path.
    Check { path: String },
    /// Authenticated GET against the API, printing the JSON response.
    Get { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "joblinker_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = SessionConfig::load()?;
    if let Some(path) = cli.session_file {
        config.session_file = path;
    }
    tracing::debug!(
        api_base_url = %config.api_base_url,
        is_production = config.is_production,
        timeout_secs = config.request_timeout.as_secs(),
        session_file = %config.session_file.display(),
        "Loaded configuration from environment/.env"
    );

    let store = Arc::new(FileTokenStore::new(config.session_file.clone()));
    let refresher = Arc::new(HttpRefreshClient::new(&config)?);
    let session = Arc::new(SessionContext::new(store, refresher));
    let api = ApiClient::new(&config, session.clone())?;

    let result = match cli.command {
        Command::Login { email, password } => api
            .login(&LoginRequest { email, password })
            .await
            .map(|response| print_user(response.user.as_ref())),
        Command::Register {
            email,
            password,
            name,
        } => api
            .register(&RegisterRequest {
                email,
                password,
                name,
            })
            .await
            .map(|response| print_user(response.user.as_ref())),
        Command::Logout => api.logout().await.map(|_| println!("Signed out")),
        Command::Whoami => api.profile().await.map(|user| print_user(Some(&user))),
        Command::Status => {
            print_status(&session);
            Ok(())
        }
        Command::Check { path } => {
            let guard = RouteGuard::from_config(&config, session.clone());
            match guard.check(&path).await {
                NavigationOutcome::Proceed => println!("proceed {}", path),
                NavigationOutcome::RedirectToSignIn(redirect) => {
                    println!("redirect {}", redirect.location)
                }
            }
            Ok(())
        }
        Command::Get { path } => api.get::<Value>(&path).await.map(|body| {
            println!(
                "{}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
            )
        }),
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.requires_sign_in() {
                eprintln!("Session expired; sign in again with `joblinker-session login`.");
            }
            Err(report(err))
        }
    }
}

fn print_user(user: Option<&joblinker_session::UserSummary>) {
    match user {
        Some(user) => println!("{} <{}> (id {})", user.name, user.email, user.id),
        None => println!("Signed in"),
    }
}

fn print_status(session: &SessionContext) {
    let snapshot = session.snapshot();
    match snapshot.access_token.as_deref() {
        Some(access) => {
            let expiry = token::expires_at(access)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".into());
            let state = if token::is_expired(access) { "expired" } else { "valid" };
            println!("access token: {} ({}, expires {})", token::mask(access), state, expiry);
        }
        None => println!("access token: none"),
    }
    println!(
        "refresh token: {}",
        snapshot
            .refresh_token
            .as_deref()
            .map(token::mask)
            .unwrap_or_else(|| "none".into())
    );
    match snapshot.user {
        Some(user) => println!("user: {} <{}> (id {})", user.name, user.email, user.id),
        None => println!("user: none"),
    }
}

fn report(err: SessionError) -> anyhow::Error {
    match err.status() {
        Some(status) => anyhow::anyhow!("{} (HTTP {})", err, status),
        None => anyhow::Error::new(err),
    }
}
