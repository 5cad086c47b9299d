use std::io::{BufRead, IsTerminal};
use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use http::{header, Method};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroize;

use rotorgate::{config::Config, error::AppError, routes, state::AppState};

#[derive(Parser)]
#[command(name = "rotorgate", about = "Access token and refresh session service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server.
    Serve {
        /// Overrides BIND_ADDR.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Register a user. The password is read from stdin.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config).await
        }
        Command::CreateUser { username, email } => create_user(config, username, email).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    let app = routes::router(state).layer(cors);

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Reads the new user's password without echoing it.
///
/// Piped stdin (scripts, CI) is read as a single line instead of prompting.
fn read_password(input: &mut impl BufRead, interactive: bool) -> std::io::Result<String> {
    if interactive {
        rpassword::prompt_password("Enter password: ")
    } else {
        rpassword::read_password_from_bufread(input)
    }
}

async fn create_user(config: Config, username: String, email: String) -> anyhow::Result<()> {
    let state = AppState::new(&config).await?;

    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut password = read_password(&mut stdin.lock(), interactive)?;

    let result = state.auth.register(&username, &email, &password).await;
    password.zeroize();

    match result {
        Ok(user) => {
            println!("User created successfully (id {})", user.id);
            Ok(())
        }
        Err(AppError::UserExists) => {
            println!("User already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn piped_password_drops_line_ending() {
        let mut input = Cursor::new(b"Str0ngPassword\n".to_vec());
        assert_eq!(read_password(&mut input, false).unwrap(), "Str0ngPassword");
    }

    #[test]
    fn piped_password_reads_first_line_only() {
        let mut input = Cursor::new(b"Str0ngPassword\nleftover\n".to_vec());
        assert_eq!(read_password(&mut input, false).unwrap(), "Str0ngPassword");
    }

    #[test]
    fn parses_create_user_arguments() {
        let cli = Cli::try_parse_from([
            "rotorgate",
            "create-user",
            "--username",
            "alice",
            "--email",
            "alice@x.com",
        ])
        .unwrap();

        match cli.command {
            Command::CreateUser { username, email } => {
                assert_eq!(username, "alice");
                assert_eq!(email, "alice@x.com");
            }
            Command::Serve { .. } => panic!("expected create-user"),
        }
    }
}
