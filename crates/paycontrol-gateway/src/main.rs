use std::{net::SocketAddr, sync::Arc};

use anyhow::Result as AnyResult;
use paycontrol_core::{AuditLog, Store};
use paycontrol_gateway::{AppState, TokenSigner, build_router};
use paycontrol_platform::{
    PgStore, PublishingAuditLog, RedisBus, ServiceConfig, apply_schema, connect_database,
};
use paycontrol_service::PaymentControl;
use paycontrol_store::{InMemoryAuditLog, InMemoryStore};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "paycontrol_gateway=info,paycontrol_service=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;

    let (store, audit): (Arc<dyn Store>, Arc<dyn AuditLog>) = match &config.database_url {
        Some(database_url) => {
            let pool = connect_database(database_url).await?;
            apply_schema(&pool).await?;
            let pg = Arc::new(PgStore::new(pool));
            let store: Arc<dyn Store> = pg.clone();
            let audit: Arc<dyn AuditLog> = pg;
            (store, audit)
        }
        None => {
            warn!("DATABASE_URL not set; records are kept in memory only");
            let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
            let audit: Arc<dyn AuditLog> = Arc::new(InMemoryAuditLog::new());
            (store, audit)
        }
    };

    let audit: Arc<dyn AuditLog> = match &config.redis_url {
        Some(redis_url) => {
            let bus = RedisBus::connect(redis_url)?;
            Arc::new(PublishingAuditLog::new(audit, bus))
        }
        None => audit,
    };

    let service = PaymentControl::new(store, config.options);
    let tokens = TokenSigner::new(&config.auth_secret)?;
    let router = build_router(AppState::new(service, audit, tokens));

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("paycontrol gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
