use std::path::PathBuf;

use anyhow::{Context, Result};

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("SAKINA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("SAKINA_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("SAKINA_PORT must be a port number")?;
        let db_path = lookup("SAKINA_DB_PATH")
            .unwrap_or_else(|| "sakina.db".into())
            .into();

        Ok(Self { host, port, db_path })
    }
}
