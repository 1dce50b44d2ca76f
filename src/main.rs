use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use fibia_server::config::AppConfig;
use fibia_server::db::{schema, DriverFactory};
use fibia_server::handlers;
use fibia_server::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "fibia-server")]
#[command(about = "Inventory management backend for Variedades Fibia")]
struct Args {
    /// Configuration file path (default: config.yaml)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config file)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // .env is optional; config file values win over raw env defaults
    dotenvy::dotenv().ok();

    // Initialize tracing for better debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load configuration from specified file or use defaults
    let mut app_config = if args.config == "config.yaml" && !std::path::Path::new("config.yaml").exists() {
        println!("⚠️  No config.yaml found, using default configuration:");
        println!("   - Local SQLite database (database.sqlite)");
        println!("   - Development JWT secret");
        println!("   🚀 Fine for development, not for production!\n");
        AppConfig::default_config()
    } else {
        AppConfig::load_from_file(&args.config)
            .map_err(|e| format!("Failed to load configuration: {}", e))?
    };

    // Override with command line arguments if provided
    if let Some(port) = args.port {
        app_config.server.port = port;
    }
    if let Some(host) = args.host {
        app_config.server.host = host;
    }

    println!("🔧 Configuration loaded:");
    println!("   Server: {}:{}", app_config.server.host, app_config.server.port);
    println!(
        "   Database: {} ({})",
        app_config.database.engine, app_config.database.url
    );
    println!("   CORS origin: {}", app_config.cors.origin);

    // Connect the configured engine; a failed connection is fatal
    let db_config = app_config.database_config()?;
    println!("Setting up {} database...", db_config.engine.as_str());
    let db = DriverFactory::create(&db_config)
        .await
        .map_err(|e| format!("Failed to connect to database: {}", e))?;

    // Idempotent schema bootstrap plus the seeded admin account
    schema::bootstrap(&db).await?;

    let state = AppState::new(db, Arc::new(app_config.clone()));
    let app = handlers::router(state);

    // Start the server
    let host: std::net::IpAddr = app_config.server.host.parse().unwrap_or_else(|_| {
        eprintln!("Invalid host address: {}, using 127.0.0.1", app_config.server.host);
        [127, 0, 0, 1].into()
    });
    let addr = SocketAddr::from((host, app_config.server.port));
    println!("🚀 Variedades Fibia backend listening on {}", addr);
    println!("   ❤️  Health:    GET  /health");
    println!("   🗄️  DB status: GET  /api/db/status");
    println!("   🔑 Login:     POST /api/auth/login");
    println!("   📦 Products:  /api/products");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
