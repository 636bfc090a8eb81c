use std::env;
use std::net::{Ipv4Addr, SocketAddr};

use axum::http::HeaderValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub port: u16,
    pub cors_origin: HeaderValue,
    pub max_page_size: u32,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://coursemaster.db".to_string());

        let cors_origin = env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let cors_origin = HeaderValue::from_str(&cors_origin).map_err(|_| ConfigError::Invalid {
            name: "CORS_ORIGIN",
            value: cors_origin.clone(),
        })?;

        Ok(Self {
            database_url,
            db_max_connections: positive_var("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            port: positive_var("PORT", 5000)?,
            cors_origin,
            max_page_size: positive_var("MAX_PAGE_SIZE", 100)?,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn positive_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .filter(|v| *v > T::default())
            .ok_or(ConfigError::Invalid { name, value: raw }),
    }
}
