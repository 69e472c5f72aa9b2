//! Shared application state

use std::sync::Arc;

use crate::config::Config;
use crate::email::Mailer;
use crate::gateway::GatewayClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub gateway: Option<Arc<GatewayClient>>,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let gateway = config.gateway.clone().map(|cfg| Arc::new(GatewayClient::new(cfg)));
        Self { db, config: Arc::new(config), mailer, gateway }
    }
}
