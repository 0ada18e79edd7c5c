use crate::error::{AppError, AppResult};
use std::path::PathBuf;

pub const DEFAULT_ASSOCIATION_NAME: &str = "Associação dos Moradores da Praia do Meio";

/// Service configuration, read from the environment
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    /// Mongo connection string. Without it the registry only lives in memory.
    pub mongodb_uri: Option<String>,
    /// Session token signing key
    pub session_secret: String,
    pub session_ttl_secs: i64,
    pub users_file: PathBuf,
    /// Printed in the header of every report
    pub association_name: String,
    /// Browser origin of the front end, if it is served from elsewhere
    pub allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let session_secret = lookup("SESSION_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::Config("SESSION_SECRET must be set".to_string()))?;
        Ok(Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            mongodb_uri: lookup("MONGODB_URI").filter(|uri| !uri.is_empty()),
            session_secret,
            session_ttl_secs: lookup("SESSION_TTL_SECS")
                .and_then(|ttl| ttl.parse().ok())
                .unwrap_or(12 * 60 * 60),
            users_file: lookup("USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("users.json")),
            association_name: lookup("ASSOCIATION_NAME")
                .unwrap_or_else(|| DEFAULT_ASSOCIATION_NAME.to_string()),
            allowed_origin: lookup("ALLOWED_ORIGIN").filter(|origin| !origin.is_empty()),
        })
    }
}
