//! Runtime settings read from the environment (and `.env`, when present).

use std::path::PathBuf;

use actix_web::cookie::Key;

pub struct AppConfig {
    pub database_path: PathBuf,
    pub bind: String,
    pub session_key: Key,
    pub seed_password: String,
    pub seed_demo: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env loaded: {}", e);
        }

        AppConfig {
            database_path: PathBuf::from(env_or("BACKADMIN_DATABASE", "data/backadmin.db")),
            bind: env_or("BACKADMIN_BIND", "127.0.0.1:8080"),
            session_key: session_key(std::env::var("SESSION_KEY").ok()),
            seed_password: env_or("BACKADMIN_SEED_PASSWORD", "admin123"),
            seed_demo: parse_flag(std::env::var("BACKADMIN_SEED_DEMO").ok().as_deref(), true),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Session encryption key. Without a persistent key, sessions are lost on restart.
pub fn session_key(raw: Option<String>) -> Key {
    match raw {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    }
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
