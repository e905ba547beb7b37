use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;

use crate::store::{KeyValueStore, MemoryStore, SqliteStore, UpstashStore};

pub const DEFAULT_ADDR: &str = "0.0.0.0:3333";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    Memory,
    Sqlite { url: String },
    Upstash { url: String, token: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub addr: SocketAddr,
    pub store: StoreSettings,
}

impl Settings {
    /// Reads settings from the process environment, after loading any `.env` file.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("SHOVEL_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("SHOVEL_ADDR is not a socket address: {}", addr))?;

        let upstash_url = lookup("UPSTASH_REDIS_REST_URL").filter(|v| !v.is_empty());
        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());

        let backend = match lookup("SHOVEL_STORE") {
            Some(name) => name.to_lowercase(),
            None if upstash_url.is_some() => "upstash".to_string(),
            None if database_url.is_some() => "sqlite".to_string(),
            None => "memory".to_string(),
        };

        let store = match backend.as_str() {
            "memory" => StoreSettings::Memory,
            "sqlite" => StoreSettings::Sqlite {
                url: database_url.context("DATABASE_URL env var must be set!")?,
            },
            "upstash" => StoreSettings::Upstash {
                url: upstash_url.context("UPSTASH_REDIS_REST_URL env var must be set!")?,
                token: lookup("UPSTASH_REDIS_REST_TOKEN")
                    .context("UPSTASH_REDIS_REST_TOKEN env var must be set!")?,
            },
            other => return Err(anyhow!("Unknown SHOVEL_STORE backend: {}", other)),
        };

        Ok(Settings { addr, store })
    }
}

impl StoreSettings {
    pub async fn connect(&self) -> Result<Arc<dyn KeyValueStore>> {
        let store: Arc<dyn KeyValueStore> = match self {
            StoreSettings::Memory => Arc::new(MemoryStore::new()),
            StoreSettings::Sqlite { url } => Arc::new(
                SqliteStore::connect(url)
                    .await
                    .with_context(|| format!("Failed to open sqlite store at {}", url))?,
            ),
            StoreSettings::Upstash { url, token } => Arc::new(UpstashStore::new(url, token)),
        };

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_memory() -> Result<()> {
        let settings = Settings::from_lookup(lookup_from(&[]))?;

        assert_eq!(settings.addr, DEFAULT_ADDR.parse::<SocketAddr>()?);
        assert_eq!(settings.store, StoreSettings::Memory);

        Ok(())
    }

    #[test]
    fn test_backend_inferred_from_urls() -> Result<()> {
        let settings = Settings::from_lookup(lookup_from(&[("DATABASE_URL", "sqlite://shovel.db")]))?;
        assert_eq!(
            settings.store,
            StoreSettings::Sqlite {
                url: "sqlite://shovel.db".to_string()
            }
        );

        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite://shovel.db"),
            ("UPSTASH_REDIS_REST_URL", "https://eu1.upstash.io"),
            ("UPSTASH_REDIS_REST_TOKEN", "abc"),
        ]))?;
        assert_eq!(
            settings.store,
            StoreSettings::Upstash {
                url: "https://eu1.upstash.io".to_string(),
                token: "abc".to_string()
            }
        );

        Ok(())
    }

    #[test]
    fn test_missing_variables_are_named() {
        let err = Settings::from_lookup(lookup_from(&[("SHOVEL_STORE", "upstash")])).unwrap_err();
        assert!(err.to_string().contains("UPSTASH_REDIS_REST_URL"));

        let err = Settings::from_lookup(lookup_from(&[
            ("SHOVEL_STORE", "upstash"),
            ("UPSTASH_REDIS_REST_URL", "https://eu1.upstash.io"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("UPSTASH_REDIS_REST_TOKEN"));

        let err = Settings::from_lookup(lookup_from(&[("SHOVEL_STORE", "etcd")])).unwrap_err();
        assert!(err.to_string().contains("etcd"));
    }

    #[test]
    fn test_custom_addr() -> Result<()> {
        let settings = Settings::from_lookup(lookup_from(&[("SHOVEL_ADDR", "127.0.0.1:8080")]))?;
        assert_eq!(settings.addr.port(), 8080);

        assert!(Settings::from_lookup(lookup_from(&[("SHOVEL_ADDR", "nowhere")])).is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_connect_memory() -> Result<()> {
        let store = StoreSettings::Memory.connect().await?;
        assert_eq!(store.backend(), "memory");

        Ok(())
    }
}
