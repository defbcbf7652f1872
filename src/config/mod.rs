use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub events: EventPublisherConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Outbound event collector. Publishing is best-effort and disabled when no
/// URL is configured.
#[derive(Deserialize, Clone, Debug)]
pub struct EventPublisherConfig {
    pub collector_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("RENTROLL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("RENTROLL_PORT")
            .unwrap_or_else(|_| "3010".to_string())
            .parse()?;

        let db_url = env::var("RENTROLL_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| anyhow::anyhow!("RENTROLL_DATABASE_URL or DATABASE_URL must be set"))?;
        let max_connections = env::var("RENTROLL_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let min_connections = env::var("RENTROLL_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let collector_url = env::var("RENTROLL_EVENT_COLLECTOR_URL").ok();
        let log_level = env::var("RENTROLL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let otlp_endpoint = env::var("RENTROLL_OTLP_ENDPOINT").ok();

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections,
                min_connections,
            },
            events: EventPublisherConfig { collector_url },
            service_name: "rentroll-service".to_string(),
            log_level,
            otlp_endpoint,
        })
    }
}
