use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use inquiry_api::slug::{DEFAULT_SLUG_LENGTH, MAX_SLUG_LENGTH, MIN_SLUG_LENGTH};

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub slug_length: usize,
    /// `None` means any origin may call the API.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("INQUIRY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("INQUIRY_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("INQUIRY_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path: PathBuf = lookup("INQUIRY_DB_PATH")
            .unwrap_or_else(|| "inquiry.db".into())
            .into();

        let slug_length = match lookup("INQUIRY_SLUG_LENGTH") {
            Some(raw) => raw
                .parse::<usize>()
                .context("INQUIRY_SLUG_LENGTH must be a number")?,
            None => DEFAULT_SLUG_LENGTH,
        };
        if !(MIN_SLUG_LENGTH..=MAX_SLUG_LENGTH).contains(&slug_length) {
            bail!(
                "INQUIRY_SLUG_LENGTH must be between {} and {}, got {}",
                MIN_SLUG_LENGTH,
                MAX_SLUG_LENGTH,
                slug_length
            );
        }

        let cors_origin = lookup("INQUIRY_CORS_ORIGIN").filter(|v| !v.trim().is_empty());

        Ok(Self {
            addr,
            db_path,
            slug_length,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.db_path, PathBuf::from("inquiry.db"));
        assert_eq!(cfg.slug_length, DEFAULT_SLUG_LENGTH);
        assert!(cfg.cors_origin.is_none());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("INQUIRY_HOST", "127.0.0.1"),
            ("INQUIRY_PORT", "8080"),
            ("INQUIRY_DB_PATH", "/tmp/x.db"),
            ("INQUIRY_SLUG_LENGTH", "16"),
            ("INQUIRY_CORS_ORIGIN", "https://example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.slug_length, 16);
        assert_eq!(cfg.cors_origin.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("INQUIRY_PORT", "http")]).is_err());
        assert!(config(&[("INQUIRY_SLUG_LENGTH", "3")]).is_err());
        assert!(config(&[("INQUIRY_SLUG_LENGTH", "ten")]).is_err());
    }
}
