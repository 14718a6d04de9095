use blingo::{
    api::{handlers::AppState, routes},
    auth::Authenticator,
    cli::{commands, Cli, Commands},
    config::Settings,
    db::{self, KeyStore},
    github::GitHubClient,
    summarizer::Summarizer,
    Error, Result,
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    // Silently ignore if file doesn't exist
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,blingo=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;
    settings.validate()?;

    match cli.command {
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Migrate => {
            migrate(settings).await?;
        }
        Commands::CreateKey { email, name } => {
            let store = KeyStore::from_config(&settings.database).await?;
            commands::create_key(&store, &email, name).await?;
        }
        Commands::ListKeys { email } => {
            let store = KeyStore::from_config(&settings.database).await?;
            commands::list_keys(&store, &email, settings.quota.usage_limit).await?;
        }
        Commands::ResetUsage { id } => {
            let store = KeyStore::from_config(&settings.database).await?;
            commands::reset_usage(&store, id).await?;
        }
    }

    Ok(())
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    // Override settings with CLI arguments
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting Blingo summarizer server");
    info!("Server: {}:{}", settings.server.host, settings.server.port);

    // Initialize the key store; the service runs without a database, with
    // auth-gated routes reporting 503 until one is configured
    let store = KeyStore::from_config(&settings.database).await?;
    if store.is_configured() {
        store.migrate().await?;
        info!("Database connection established, migrations applied");
    } else {
        warn!("DATABASE_URL not set - key store unconfigured, gated routes will return 503");
    }

    if settings.quota.dev_bypass {
        warn!("DEV_BYPASS_AUTH is enabled - key validation is bypassed for blingo- keys");
    }

    if settings.summarizer.is_configured() {
        info!("Summarizer: model {} (live)", settings.summarizer.model);
    } else {
        warn!("OPENAI_API_KEY not set - summaries will use the mock fallback");
    }

    let authenticator = Authenticator::new(
        store.clone(),
        settings.quota.usage_limit,
        settings.quota.dev_bypass,
    );
    let github = GitHubClient::new(&settings.github)?;
    let summarizer = Summarizer::new(settings.summarizer.clone())?;

    // Create application state
    let state = AppState {
        store,
        authenticator,
        github,
        summarizer,
        settings: settings.clone(),
    };

    // Create router with rate limiting
    let app = routes::create_router(state, &settings);

    // Start server
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Blingo GitHub Summarizer");
    println!("========================================");
    println!("Status: Running");
    println!("Address: http://{addr}");
    println!("Usage limit: {} requests per key", settings.quota.usage_limit);
    println!("\nAPI Endpoints:");
    println!("  GET  /api/github-summarizer");
    println!("  POST /api/github-summarizer");
    println!("  GET  /api/api-keys");
    println!("  POST /api/api-keys");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}

async fn migrate(settings: Settings) -> Result<()> {
    info!("Running database migrations");

    let url = settings
        .database
        .url
        .as_deref()
        .ok_or(Error::StoreUnconfigured)?;
    let pool = db::init_pool(url).await?;
    db::run_migrations(&pool).await?;

    println!("Database migrations completed successfully");
    Ok(())
}
