//! Server configuration: optional scout.toml, then SCOUT_* environment overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use scout_core::user::UserRole;

pub const DEFAULT_CONFIG_PATH: &str = "scout.toml";
/// One year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 525_600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Login seeded at start when no user with that email exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub evidence_dir: PathBuf,
    pub report_dir: PathBuf,
    pub session_ttl_minutes: i64,
    pub operator_secret: String,
    pub admin: SeedUser,
    pub analyst: SeedUser,
    pub sme: SeedUser,
    pub scheduler_interval_secs: u64,
    pub log_level: String,
    pub json_logs: bool,
}

/// Raw deserialization target for scout.toml. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind_addr: Option<String>,
    database_url: Option<String>,
    evidence_dir: Option<PathBuf>,
    report_dir: Option<PathBuf>,
    session_ttl_minutes: Option<i64>,
    operator_secret: Option<String>,
    admin_email: Option<String>,
    admin_password: Option<String>,
    analyst_email: Option<String>,
    analyst_password: Option<String>,
    sme_email: Option<String>,
    sme_password: Option<String>,
    scheduler_interval_secs: Option<u64>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        other => Err(ConfigError::invalid(field, format!("expected a boolean, got `{other}`"))),
    }
}

fn parse_num<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, format!("expected a number, got `{raw}`")))
}

impl Config {
    /// Read `path` if it exists, then apply the process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_sources(path, contents.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        path: &Path,
        contents: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = match contents {
            Some(text) => toml::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            None => FileConfig::default(),
        };
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str, from_file: Option<String>, default: &str| {
            var(key).or(from_file).unwrap_or_else(|| default.to_string())
        };

        let bind_addr = text("SCOUT_BIND_ADDR", file.bind_addr, "0.0.0.0:8000");
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|_| ConfigError::invalid("bind_addr", format!("`{bind_addr}` is not a socket address")))?;

        let session_ttl_minutes = match var("SCOUT_SESSION_TTL_MINUTES") {
            Some(raw) => parse_num("session_ttl_minutes", &raw)?,
            None => file.session_ttl_minutes.unwrap_or(480),
        };
        let scheduler_interval_secs = match var("SCOUT_SCHEDULER_INTERVAL_SECS") {
            Some(raw) => parse_num("scheduler_interval_secs", &raw)?,
            None => file.scheduler_interval_secs.unwrap_or(60),
        };
        let json_logs = match var("SCOUT_JSON_LOGS") {
            Some(raw) => parse_bool("json_logs", &raw)?,
            None => file.json_logs.unwrap_or(false),
        };

        let config = Self {
            bind_addr,
            database_url: text("SCOUT_DATABASE_URL", file.database_url, "sqlite://scout.db?mode=rwc"),
            evidence_dir: var("SCOUT_EVIDENCE_DIR")
                .map(PathBuf::from)
                .or(file.evidence_dir)
                .unwrap_or_else(|| PathBuf::from("data/evidences")),
            report_dir: var("SCOUT_REPORT_DIR")
                .map(PathBuf::from)
                .or(file.report_dir)
                .unwrap_or_else(|| PathBuf::from("data/reports")),
            session_ttl_minutes,
            operator_secret: text("SCOUT_OPERATOR_SECRET", file.operator_secret, ""),
            admin: SeedUser {
                email: text("SCOUT_ADMIN_EMAIL", file.admin_email, "admin@osint.com"),
                password: text("SCOUT_ADMIN_PASSWORD", file.admin_password, ""),
            },
            analyst: SeedUser {
                email: text("SCOUT_ANALYST_EMAIL", file.analyst_email, "analyst@osint.com"),
                password: text("SCOUT_ANALYST_PASSWORD", file.analyst_password, ""),
            },
            sme: SeedUser {
                email: text("SCOUT_SME_EMAIL", file.sme_email, "sme@osint.com"),
                password: text("SCOUT_SME_PASSWORD", file.sme_password, ""),
            },
            scheduler_interval_secs,
            log_level: text("SCOUT_LOG_LEVEL", file.log_level, "info"),
            json_logs,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&self.session_ttl_minutes) {
            return Err(ConfigError::invalid(
                "session_ttl_minutes",
                format!("must be between 1 and {MAX_SESSION_TTL_MINUTES}"),
            ));
        }
        if self.scheduler_interval_secs == 0 {
            return Err(ConfigError::invalid("scheduler_interval_secs", "must be positive"));
        }
        if self.operator_secret.trim().len() < 16 {
            return Err(ConfigError::invalid(
                "operator_secret",
                "must be set and at least 16 characters long",
            ));
        }
        for (field, seed) in [("admin", &self.admin), ("analyst", &self.analyst), ("sme", &self.sme)] {
            if seed.email.trim().is_empty() {
                return Err(ConfigError::invalid(field, "email must not be empty"));
            }
        }
        Ok(())
    }

    /// Seed users with a configured password. Blank passwords are skipped.
    pub fn seed_users(&self) -> impl Iterator<Item = (&SeedUser, UserRole)> {
        [
            (&self.admin, UserRole::Admin),
            (&self.analyst, UserRole::Analyst),
            (&self.sme, UserRole::Sme),
        ]
        .into_iter()
        .filter(|(seed, _)| !seed.password.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "operator-secret-0123456789";

    fn load(file: Option<&str>, env: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(Path::new("scout.toml"), file, |key| env.get(key).cloned())
    }

    #[test]
    fn defaults_need_only_a_secret() {
        let config = load(None, &[("SCOUT_OPERATOR_SECRET", SECRET)]).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.scheduler_interval_secs, 60);
        assert_eq!(config.session_ttl_minutes, 480);
        assert!(!config.json_logs);
        assert_eq!(config.seed_users().count(), 0);
    }

    #[test]
    fn environment_overrides_file() {
        let file = r#"
            bind_addr = "127.0.0.1:9000"
            operator_secret = "from-file-secret-value"
            scheduler_interval_secs = 30
            admin_password = "file-pw"
        "#;
        let config = load(
            Some(file),
            &[("SCOUT_SCHEDULER_INTERVAL_SECS", "5"), ("SCOUT_JSON_LOGS", "yes")],
        )
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.operator_secret, "from-file-secret-value");
        assert_eq!(config.scheduler_interval_secs, 5);
        assert!(config.json_logs);
        let seeded: Vec<_> = config.seed_users().map(|(s, _)| s.email.as_str()).collect();
        assert_eq!(seeded, vec!["admin@osint.com"]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(load(None, &[]), Err(ConfigError::Validation { field, .. }) if field == "operator_secret"));
        assert!(matches!(
            load(None, &[("SCOUT_OPERATOR_SECRET", SECRET), ("SCOUT_JSON_LOGS", "maybe")]),
            Err(ConfigError::Validation { .. })
        ));
        assert!(matches!(
            load(Some("unknown_key = 1"), &[("SCOUT_OPERATOR_SECRET", SECRET)]),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            load(None, &[("SCOUT_OPERATOR_SECRET", SECRET), ("SCOUT_BIND_ADDR", "nowhere")]),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn session_ttl_is_bounded() {
        let ttl = |raw: &str| {
            load(
                None,
                &[("SCOUT_OPERATOR_SECRET", SECRET), ("SCOUT_SESSION_TTL_MINUTES", raw)],
            )
        };
        assert_eq!(ttl("525600").unwrap().session_ttl_minutes, MAX_SESSION_TTL_MINUTES);
        for raw in ["0", "525601", "9223372036854775807"] {
            assert!(
                matches!(ttl(raw), Err(ConfigError::Validation { field, .. }) if field == "session_ttl_minutes"),
                "{raw} accepted"
            );
        }
    }
}
