//! Server configuration read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `BIND_ADDR` | `127.0.0.1` |
//! | `PORT` | `8080` |
//! | `SOF_DATA_DIR` | `data` |
//! | `SOF_MAX_UPLOAD_MB` | `50` |
//! | `SOF_RETENTION_HOURS` | `24` |
//! | `SOF_RULES_PATH` | built-in rule table |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sof_events_intake::StagingConfig;

const DEFAULT_MAX_UPLOAD_MB: usize = 50;
const DEFAULT_RETENTION_HOURS: u64 = 24;

/// Runtime configuration for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Root of the staging directories.
    pub data_dir: PathBuf,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// How long staged files and reports are kept.
    pub retention: Duration,
    /// Custom rule table replacing the built-in one.
    pub rules_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("data"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            retention: Duration::from_secs(DEFAULT_RETENTION_HOURS * 3600),
            rules_path: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from environment variables, falling back to
    /// defaults for unset or unparseable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let max_upload_mb: usize = parse_var(&lookup, "SOF_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB);
        let retention_hours: u64 =
            parse_var(&lookup, "SOF_RETENTION_HOURS", DEFAULT_RETENTION_HOURS);

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_var(&lookup, "PORT", defaults.port),
            data_dir: lookup("SOF_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            retention: Duration::from_secs(retention_hours.saturating_mul(3600)),
            rules_path: lookup("SOF_RULES_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Staging directory layout under [`Self::data_dir`].
    #[must_use]
    pub fn staging(&self) -> StagingConfig {
        StagingConfig::under(&self.data_dir)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {name}={raw:?}");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(ServerConfig::from_lookup(lookup(&[])), ServerConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "9000"),
            ("SOF_DATA_DIR", "/srv/sof"),
            ("SOF_MAX_UPLOAD_MB", "5"),
            ("SOF_RETENTION_HOURS", "1"),
            ("SOF_RULES_PATH", "rules.toml"),
        ]));

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/srv/sof"));
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.retention, Duration::from_secs(3600));
        assert_eq!(config.rules_path, Some(PathBuf::from("rules.toml")));
        assert_eq!(
            config.staging().output_dir,
            PathBuf::from("/srv/sof").join("outputs")
        );
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "http"), ("SOF_MAX_UPLOAD_MB", "-1")]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    }
}
