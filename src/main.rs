use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use gigboard::auth::password;
use gigboard::cache::TieredCache;
use gigboard::feed::NotificationFeed;
use gigboard::models::category::slugify;
use gigboard::models::user::Role;
use gigboard::store::postgres::{NewUser, PgStore};
use gigboard::webhook::WebhookNotifier;
use gigboard::{api, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "gigboard=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::User { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_user_command(&db, command).await
        }
        Some(cli::Commands::Category { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_category_command(&db, command).await
        }
        Some(cli::Commands::Notification { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_notification_command(&db, &cfg, command).await
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

    tracing::info!("Connecting to Redis...");
    let redis_client = redis::Client::open(cfg.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let cache = TieredCache::new(redis_conn);

    let webhook = WebhookNotifier::new(cfg.webhook_urls.clone(), cfg.webhook_secret.clone());
    if webhook.is_configured() {
        tracing::info!(urls = cfg.webhook_urls.len(), "webhook fan-out enabled");
    }

    let retention_days = cfg.retention_days;
    let state = Arc::new(AppState {
        db: db.clone(),
        cache: cache.clone(),
        feed: NotificationFeed::new(),
        webhook,
        config: cfg,
    });

    let app = axum::Router::new()
        // Health endpoints (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .route("/readyz", axum::routing::get(readiness_check))
        .merge(api::api_router(state.clone()))
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer({
            use axum::http::{HeaderName, Method};
            use tower_http::cors::AllowOrigin;
            let app_origin = std::env::var("GIGBOARD_APP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:19006".to_string());
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(move |origin, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str == app_origin
                        || origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                }))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("authorization"),
                    HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true)
        })
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware));

    jobs::cleanup::spawn(db, cache, retention_days);
    tracing::info!("Notification retention job started (hourly)");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("gigboard listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn readiness_check() -> &'static str {
    "ok"
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

/// Middleware: security headers on every response.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());
    headers.insert("Cache-Control", "no-store".parse().unwrap());
    headers.insert("Referrer-Policy", "no-referrer".parse().unwrap());
    headers.remove("Server");

    resp
}

async fn handle_user_command(db: &PgStore, cmd: cli::UserCommands) -> anyhow::Result<()> {
    match cmd {
        cli::UserCommands::Create {
            email,
            name,
            role,
            password: pw,
        } => {
            let role = Role::parse(&role)
                .with_context(|| format!("invalid role: {} (employer|worker)", role))?;
            if pw.len() < 8 {
                anyhow::bail!("password must be at least 8 characters");
            }
            let salt = password::generate_salt();
            let hash = password::hash_password(&pw, &salt);
            let created = db
                .create_user(&NewUser {
                    email: email.clone(),
                    display_name: name,
                    role: role.as_str().to_string(),
                    password_hash: hash,
                    password_salt: salt,
                })
                .await?;
            match created {
                Some(u) => println!(
                    "User created:\n  ID:    {}\n  Email: {}\n  Role:  {}",
                    u.id, u.email, u.role
                ),
                None => println!("Email already registered: {}", email),
            }
        }
        cli::UserCommands::List => {
            let users = db.list_users().await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<38} {:<30} {:<10}", "ID", "EMAIL", "ROLE");
                for u in users {
                    println!("{:<38} {:<30} {:<10}", u.id, u.email, u.role);
                }
            }
        }
        cli::UserCommands::Deactivate { id } => {
            let id = uuid::Uuid::parse_str(&id).context("Invalid user ID")?;
            if db.deactivate_user(id).await? {
                println!("User deactivated.");
            } else {
                println!("User not found.");
            }
        }
    }
    Ok(())
}

async fn handle_category_command(db: &PgStore, cmd: cli::CategoryCommands) -> anyhow::Result<()> {
    match cmd {
        cli::CategoryCommands::Add { name } => {
            let slug = slugify(&name);
            if slug.is_empty() {
                anyhow::bail!("category name must contain letters or digits");
            }
            match db.insert_category(&name, &slug).await? {
                Some(c) => println!("Category created:\n  ID:   {}\n  Slug: {}", c.id, c.slug),
                None => println!("Category already exists: {}", slug),
            }
        }
        cli::CategoryCommands::List => {
            let categories = db.list_categories().await?;
            if categories.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<38} {:<24} SLUG", "ID", "NAME");
                for c in categories {
                    println!("{:<38} {:<24} {}", c.id, c.name, c.slug);
                }
            }
        }
    }
    Ok(())
}

async fn handle_notification_command(
    db: &PgStore,
    cfg: &config::Config,
    cmd: cli::NotificationCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::NotificationCommands::Purge { days } => {
            let days = days.unwrap_or(cfg.retention_days);
            let purged = db.purge_read_notifications(days).await?;
            println!("Purged {} read notifications older than {} days.", purged, days);
        }
    }
    Ok(())
}
