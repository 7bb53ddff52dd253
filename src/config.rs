//! Environment-based configuration.
//!
//! All settings come from environment variables. Missing required keys are
//! collected and reported together so a misconfigured deployment fails
//! with one complete message instead of one key per restart.

use crate::store::BackendKind;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Transport credential, passed through to the chat adapter untouched.
    pub bot_token: String,
    /// Channel identifier answers are published to.
    pub channel: String,
    /// Group chat that receives new-question alerts.
    pub admin_group: i64,
    /// User ids allowed to run admin actions.
    pub admin_ids: Vec<i64>,
    /// Public channel link included in answer notifications, if any.
    pub channel_url: Option<String>,
    pub backend: BackendKind,
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |key: &str| match env::var(key) {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ => {
                missing.push(key.to_string());
                None
            }
        };

        let bot_token = require("BOT_TOKEN");
        let channel = require("CHANNEL_ID");
        let admin_group = require("ADMIN_GROUP_ID");
        let admin_ids = require("ADMIN_IDS");

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let admin_group = admin_group
            .unwrap()
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "ADMIN_GROUP_ID".to_string(),
                reason: "expected a numeric chat id".to_string(),
            })?;

        let admin_ids = parse_admin_ids(&admin_ids.unwrap())?;

        let backend = match env::var("DB_BACKEND") {
            Ok(v) => v.parse().map_err(|reason| ConfigError::Invalid {
                key: "DB_BACKEND".to_string(),
                reason,
            })?,
            Err(_) => BackendKind::Json,
        };

        let db_path = env::var("DB_PATH").map_or_else(
            |_| {
                PathBuf::from(match backend {
                    BackendKind::Json => "questions.json",
                    BackendKind::Sqlite => "questions.db",
                })
            },
            PathBuf::from,
        );

        let backup_dir = env::var("BACKUP_DIR").map_or_else(|_| PathBuf::from("backups"), PathBuf::from);

        Ok(Config {
            bot_token: bot_token.unwrap(),
            channel: channel.unwrap(),
            admin_group,
            admin_ids,
            channel_url: env::var("CHANNEL_URL").ok().filter(|v| !v.trim().is_empty()),
            backend,
            db_path,
            backup_dir,
        })
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<i64>, ConfigError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part.parse().map_err(|_| ConfigError::Invalid {
            key: "ADMIN_IDS".to_string(),
            reason: format!("{part} is not a numeric user id"),
        })?;
        ids.push(id);
    }
    if ids.is_empty() {
        return Err(ConfigError::Invalid {
            key: "ADMIN_IDS".to_string(),
            reason: "at least one admin id is required".to_string(),
        });
    }
    Ok(ids)
}
