use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub port: u16,
    /// Fixed delivery surcharge applied to a user's first pay order of the day.
    pub surcharge_cents: i64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

pub fn load() -> Result<Config> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let port = match std::env::var("PORT") {
        Ok(port) => port.parse().context("PORT must be a valid port number")?,
        Err(_) => 3000,
    };

    let surcharge_cents = match std::env::var("DELIVERY_SURCHARGE_CENTS") {
        Ok(raw) => raw
            .parse()
            .context("DELIVERY_SURCHARGE_CENTS must be an integer amount of cents")?,
        Err(_) => 160,
    };

    Ok(Config {
        database: DatabaseConfig { url },
        port,
        surcharge_cents,
    })
}
