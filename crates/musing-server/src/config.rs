use std::path::PathBuf;

use anyhow::Context;

/// Server settings, read from `MUSING_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("MUSING_DB_PATH").unwrap_or_else(|| "musing.db".into());
        let host = lookup("MUSING_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("MUSING_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MUSING_PORT must be a port number, got '{}'", raw))?,
            None => 3001,
        };

        Ok(Self {
            db_path: db_path.into(),
            host,
            port,
        })
    }
}
