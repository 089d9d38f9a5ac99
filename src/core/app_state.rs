use anyhow::Result;

use crate::core::{
    config::Config,
    db::{self, DbPool},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: reqwest::Client,
    pub surcharge_cents: i64,
}

impl AppState {
    pub async fn init(config: &Config) -> Result<Self> {
        let db_pool = db::create_pool(&config.database.url).await?;
        Ok(Self {
            db_pool,
            http_client: reqwest::Client::new(),
            surcharge_cents: config.surcharge_cents,
        })
    }
}
