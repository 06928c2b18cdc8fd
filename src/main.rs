// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authsession command-line client.
//!
//! Drives the session manager against a real backend, persisting the
//! session in the file store so it survives between invocations.

use anyhow::{bail, Context, Result};
use authsession::{
    config::Config,
    session::{InvalidationReason, SessionEvent},
    validation::{validate_registration, RegistrationInput},
    AuthClient,
};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::Receiver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "authsession")]
#[command(author, version, about = "Client-side session manager", long_about = None)]
struct Cli {
    /// Backend URL (overrides API_URL)
    #[arg(long, env = "API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in with email and password
    Login {
        email: String,
        #[arg(long, env = "AUTHSESSION_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Register a new account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTHSESSION_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Exchange a Google ID token for a session
    Google {
        id_token: String,
        #[arg(long)]
        access_token: Option<String>,
    },

    /// Fetch the current profile from the backend
    Me,

    /// Renew the access token
    Refresh,

    /// Clear the local session
    Logout,

    /// Show the locally stored session (no network)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url {
        config = config
            .with_api_url(&api_url)
            .context("Invalid --api-url")?;
    }

    let client = AuthClient::with_file_storage(config).context("Failed to build HTTP client")?;
    let mut events = client.state.subscribe();

    let outcome = run(&client, cli.command).await;
    report_invalidation(&mut events, &client.config.login_path);
    outcome
}

async fn run(client: &AuthClient, command: Commands) -> Result<()> {
    let sessions = &client.sessions;

    match command {
        Commands::Login { email, password } => {
            let session = sessions.login(&email, &password).await?;
            println!("Logged in as {}", session.user.name_for_display());
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            confirm_password,
        } => {
            let input = RegistrationInput {
                first_name,
                last_name,
                email,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
            };
            let errors = validate_registration(&input);
            if !errors.is_empty() {
                for (field, message) in &errors {
                    eprintln!("{}: {}", field, message);
                }
                bail!("Registration form is invalid");
            }
            let session = sessions.register(&input).await?;
            println!("Registered {}", session.user.email);
        }
        Commands::Google {
            id_token,
            access_token,
        } => {
            let session = sessions
                .exchange_oauth(&id_token, access_token.as_deref())
                .await?;
            println!("Signed in with Google as {}", session.user.name_for_display());
        }
        Commands::Me => {
            let user = sessions.refresh_profile().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::Refresh => {
            let credential = sessions.renew_token().await?;
            println!("Token renewed, expires in {}s", credential.expires_in);
        }
        Commands::Logout => {
            sessions.logout();
            println!("Logged out");
        }
        Commands::Status => match sessions.current_user() {
            Some(user) if sessions.is_authenticated() => {
                println!(
                    "Signed in as {} <{}> ({} plan)",
                    user.name_for_display(),
                    user.email,
                    user.subscription_tier
                );
            }
            _ => println!("Not signed in"),
        },
    }
    Ok(())
}

/// Tell the user when a command ended their session.
fn report_invalidation(events: &mut Receiver<SessionEvent>, login_path: &str) {
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Invalidated(InvalidationReason::AuthorityRejected) = event {
            eprintln!(
                "Session is no longer valid; sign in again ({})",
                login_path
            );
        }
    }
}

/// `RUST_LOG` directives plus the crate at debug and everything else at info.
fn log_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("authsession=debug".parse().unwrap())
        .add_directive("info".parse().unwrap())
}

/// Initialize logging: JSON when `LOG_FORMAT=json`, human-readable otherwise.
fn init_logging() {
    let registry = tracing_subscriber::registry().with(log_filter());

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
