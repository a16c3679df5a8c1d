use anyhow::Result;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub bootstrap_admin_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let store_backend =
            parse_backend(&env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string()))?;

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            store_backend,
            database_url: env::var("DATABASE_URL").ok(),
            bootstrap_admin_email: env::var("BOOTSTRAP_ADMIN_EMAIL")
                .ok()
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty()),
        })
    }
}

fn parse_backend(raw: &str) -> Result<StoreBackend> {
    match raw.trim().to_lowercase().as_str() {
        "memory" => Ok(StoreBackend::Memory),
        "postgres" => Ok(StoreBackend::Postgres),
        other => anyhow::bail!("STORE_BACKEND must be 'memory' or 'postgres', got '{other}'"),
    }
}
