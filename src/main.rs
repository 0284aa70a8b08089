use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedstore::datastore::MemoryDatastore;
use feedstore::oauth::issuer::random_hex64;
use feedstore::oauth::Issuer;
use feedstore::store::{CredentialStore, PgStore};
use feedstore::{api, cli, config, jobs, oauth, web, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "feedstore=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Client { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_client_command(&db, command).await
        }
        Some(cli::Commands::User { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_user_command(&db, command).await
        }
        Some(cli::Commands::Feed { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_feed_command(&db, command).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let issuer = Issuer::new(cfg.access_token_lifetime_secs);

    let state = Arc::new(AppState {
        db: db.clone(),
        datastore: Arc::new(MemoryDatastore::new()),
        issuer,
        config: cfg,
    });

    let app = axum::Router::new()
        // Health endpoint (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        // OAuth2 token endpoint and the REST API, both session-free
        .nest("/oauth", oauth::oauth_router())
        .nest("/api/v1", api::api_router())
        // Session-backed web routes
        .merge(web::web_router(state.clone()))
        .with_state(state.clone())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware));

    jobs::cleanup::spawn(db);
    tracing::info!("Background session cleanup job started (hourly)");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Feedstore listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response so clients
/// can correlate errors with server logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: standard hardening headers on every response.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        axum::http::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "X-Frame-Options",
        axum::http::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        "Cache-Control",
        axum::http::HeaderValue::from_static("no-store"),
    );
    headers.insert(
        "Referrer-Policy",
        axum::http::HeaderValue::from_static("no-referrer"),
    );
    headers.remove("Server");

    resp
}

async fn handle_client_command(db: &PgStore, cmd: cli::ClientCommands) -> anyhow::Result<()> {
    match cmd {
        cli::ClientCommands::Create {
            display_name,
            name,
            secret,
        } => {
            if secret.len() < 10 {
                anyhow::bail!("client secret must be at least 10 characters");
            }
            let client = db
                .insert_client(&display_name, &name, &secret)
                .await?
                .ok_or_else(|| anyhow::anyhow!("client name '{}' is already in use", name))?;
            println!(
                "Client created:\n  ID:    {}\n  Name:  {}\n  Label: {}",
                client.id, client.client_name, client.display_name
            );
        }
        cli::ClientCommands::List => {
            let clients = db.list_clients().await?;
            if clients.is_empty() {
                println!("No clients registered.");
            } else {
                println!("{:<8} {:<28} {:<28}", "ID", "NAME", "DISPLAY NAME");
                for c in clients {
                    println!("{:<8} {:<28} {:<28}", c.id, c.client_name, c.display_name);
                }
            }
        }
    }
    Ok(())
}

async fn handle_user_command(db: &PgStore, cmd: cli::UserCommands) -> anyhow::Result<()> {
    match cmd {
        cli::UserCommands::Create {
            email,
            password,
            display_name,
        } => {
            let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)?;
            let user = db
                .insert_user(&email.to_lowercase(), &hash, display_name.as_deref())
                .await?
                .ok_or_else(|| anyhow::anyhow!("email '{}' is already registered", email))?;
            println!("User created:\n  ID:    {}\n  Email: {}", user.id, user.email);
        }
    }
    Ok(())
}

async fn handle_feed_command(db: &PgStore, cmd: cli::FeedCommands) -> anyhow::Result<()> {
    match cmd {
        cli::FeedCommands::Create {
            name,
            user_id,
            public,
        } => {
            if db.find_user_by_id(user_id).await?.is_none() {
                anyhow::bail!("no user with id {}", user_id);
            }
            let api_key = random_hex64();
            let api_key_read_only = random_hex64();
            let feed = db
                .insert_feed(&name, user_id, public, &api_key, &api_key_read_only)
                .await?;
            println!(
                "Feed created:\n  ID:              {}\n  Name:            {}\n  Public:          {}\n  API key (rw):    {}\n  API key (ro):    {}",
                feed.id, feed.name, feed.is_public, feed.api_key, feed.api_key_read_only
            );
        }
    }
    Ok(())
}
