mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use pantry_api::state::{AppState, AppStateInner};
use pantry_mail::{
    CodeCache, ConsoleMailer, DispatcherConfig, Mailer, MailQueue, SmtpMailer,
    VerificationDispatcher,
};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry_server=debug,pantry_api=debug,pantry_mail=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    };

    // Init database
    let db = pantry_db::Database::open(&config.db_path)?;

    // Verification code cache
    let cache = CodeCache::connect(config.redis_url.as_deref()).await?;
    if let CodeCache::Memory(memory) = &cache {
        info!("PANTRY_REDIS_URL not set, using in-process code cache");
        tokio::spawn(memory.clone().run_prune_loop(Duration::from_secs(60)));
    }

    // Outbound mail
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(
            &smtp.host,
            smtp.port,
            smtp.username.clone(),
            smtp.password.clone(),
        )?),
        None => {
            info!("PANTRY_SMTP_HOST not set, mail will be logged");
            Arc::new(ConsoleMailer)
        }
    };
    let (queue, _mail_worker) = MailQueue::start(mailer);

    let verifier = VerificationDispatcher::new(
        cache,
        queue,
        DispatcherConfig {
            code_ttl: config.code_ttl,
            verify_base_url: config.verify_base_url.clone(),
            from: config.email_from.clone(),
        },
    );

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        verifier,
    });

    let app = pantry_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pantry server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
