//! Runtime configuration
//!
//! Grade rules are injected into the session context so tests can run the
//! parser, validator, and calculator against non-default bounds.

use crate::state_machine::UserId;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Weight multiplier for advanced courses taken by exact-sciences students
pub const DEFAULT_ADVANCED_MULTIPLIER: f64 = 1.5;

/// Longest accepted course description, in characters
pub const DEFAULT_MAX_DESCRIPTION_LEN: usize = 40;

/// Domain bounds for grade entries
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRules {
    pub score_range: RangeInclusive<u32>,
    pub credit_range: RangeInclusive<u32>,
    pub max_description_len: usize,
    pub advanced_multiplier: f64,
}

impl Default for GradeRules {
    fn default() -> Self {
        Self {
            score_range: 60..=100,
            credit_range: 1..=8,
            max_description_len: DEFAULT_MAX_DESCRIPTION_LEN,
            advanced_multiplier: DEFAULT_ADVANCED_MULTIPLIER,
        }
    }
}

impl GradeRules {
    pub fn with_max_description_len(mut self, max: usize) -> Self {
        self.max_description_len = max;
        self
    }

    pub fn score_in_range(&self, score: f64) -> bool {
        f64::from(*self.score_range.start()) <= score && score <= f64::from(*self.score_range.end())
    }

    pub fn credits_in_range(&self, credits: f64) -> bool {
        f64::from(*self.credit_range.start()) <= credits
            && credits <= f64::from(*self.credit_range.end())
    }
}

/// Process-level configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub port: u16,
    pub admin_ids: Vec<UserId>,
    pub broadcast_delay: Duration,
    pub session_idle_timeout: Duration,
    pub rules: GradeRules,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let db_path = std::env::var("AVERAGE_BOT_DB_PATH").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            format!("{home}/.average-bot/average_bot.db")
        });

        let port = env_parse("AVERAGE_BOT_PORT").unwrap_or(8000);

        let admin_ids = std::env::var("AVERAGE_BOT_ADMIN_IDS")
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default();

        let broadcast_delay =
            Duration::from_millis(env_parse("AVERAGE_BOT_BROADCAST_DELAY_MS").unwrap_or(50));
        let session_idle_timeout =
            Duration::from_secs(env_parse("AVERAGE_BOT_SESSION_IDLE_SECS").unwrap_or(1800));

        let rules = GradeRules::default().with_max_description_len(
            env_parse("AVERAGE_BOT_MAX_DESCRIPTION").unwrap_or(DEFAULT_MAX_DESCRIPTION_LEN),
        );

        Self {
            db_path,
            port,
            admin_ids,
            broadcast_delay,
            session_idle_timeout,
            rules,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a comma-separated admin list, skipping entries that are not ids
fn parse_admin_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(value = %part, "Ignoring malformed admin id");
                    None
                }
            }
        })
        .collect()
}
