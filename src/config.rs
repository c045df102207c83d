//! Deployment configuration, read once at startup from the environment.
//!
//! | variable             | meaning                                    | default          |
//! |----------------------|--------------------------------------------|------------------|
//! | `MORPH_DICT_PATH`    | dictionary file                            | built-in sample  |
//! | `MORFEUSZ_DICT_PATH` | dictionary file, read when the above unset | none             |
//! | `DISAMB_EXECUTABLE`  | disambiguator program                      | disabled         |
//! | `DISAMB_MODEL`       | model passed to the disambiguator          | disabled         |
//! | `MORPH_BIND`         | listen address                             | `127.0.0.1:5000` |
//! | `MORPH_TIMEOUT_SECS` | per-request engine and disambiguator limit | `30`             |
//!
//! Empty values count as absent.
//!
//! One disambiguator exchange may take at most four fifths of the request
//! timeout.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DICT_PATH_VAR: &str = "MORPH_DICT_PATH";
/// Dictionary variable read by older deployments.
pub const LEGACY_DICT_PATH_VAR: &str = "MORFEUSZ_DICT_PATH";
pub const DISAMB_EXECUTABLE_VAR: &str = "DISAMB_EXECUTABLE";
pub const DISAMB_MODEL_VAR: &str = "DISAMB_MODEL";
pub const BIND_VAR: &str = "MORPH_BIND";
pub const TIMEOUT_VAR: &str = "MORPH_TIMEOUT_SECS";

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Auxiliary disambiguator launch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisambiguatorConfig {
    pub executable: PathBuf,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    /// `None` selects the built-in dictionary.
    pub dict_path: Option<PathBuf>,
    /// `None` disables disambiguation.
    pub disambiguator: Option<DisambiguatorConfig>,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind = match var(BIND_VAR) {
            Some(value) => parse_bind(BIND_VAR, &value)?,
            None => parse_bind(BIND_VAR, DEFAULT_BIND)?,
        };

        let timeout = match var(TIMEOUT_VAR) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout { var: TIMEOUT_VAR, value }),
            },
            None => DEFAULT_TIMEOUT,
        };

        let disambiguator = match (var(DISAMB_EXECUTABLE_VAR), var(DISAMB_MODEL_VAR)) {
            (Some(executable), Some(model)) => Some(DisambiguatorConfig { executable: PathBuf::from(executable), model }),
            _ => None,
        };

        let dict_path = var(DICT_PATH_VAR).or_else(|| var(LEGACY_DICT_PATH_VAR)).map(PathBuf::from);

        Ok(Self { bind, dict_path, disambiguator, timeout })
    }

    /// Deadline for one disambiguator exchange.
    pub fn exchange_timeout(&self) -> Duration {
        self.timeout * 4 / 5
    }
}

/// Parse a listen address, reporting `var` on failure.
pub fn parse_bind(var: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidBind { var, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert!(cfg.dict_path.is_none());
        assert!(cfg.disambiguator.is_none());
    }

    #[test]
    fn test_full_environment() {
        let cfg = config(&[
            (DICT_PATH_VAR, "/srv/sgjp.dict"),
            (DISAMB_EXECUTABLE_VAR, "/usr/bin/concraft"),
            (DISAMB_MODEL_VAR, "/srv/model.gz"),
            (BIND_VAR, "0.0.0.0:8080"),
            (TIMEOUT_VAR, "5"),
        ])
        .unwrap();

        assert_eq!(cfg.dict_path, Some(PathBuf::from("/srv/sgjp.dict")));
        assert_eq!(
            cfg.disambiguator,
            Some(DisambiguatorConfig { executable: PathBuf::from("/usr/bin/concraft"), model: "/srv/model.gz".into() })
        );
        assert_eq!(cfg.bind.port(), 8080);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_disambiguator_needs_both_variables() {
        assert!(config(&[(DISAMB_EXECUTABLE_VAR, "/usr/bin/concraft")]).unwrap().disambiguator.is_none());
        assert!(config(&[(DISAMB_MODEL_VAR, "model")]).unwrap().disambiguator.is_none());
        assert!(config(&[(DISAMB_EXECUTABLE_VAR, "x"), (DISAMB_MODEL_VAR, "")]).unwrap().disambiguator.is_none());
    }

    #[test]
    fn test_empty_values_are_absent() {
        let cfg = config(&[(DICT_PATH_VAR, ""), (BIND_VAR, "  "), (TIMEOUT_VAR, "")]).unwrap();
        assert!(cfg.dict_path.is_none());
        assert_eq!(cfg.bind.port(), 5000);
        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_legacy_dictionary_variable() {
        let cfg = config(&[(LEGACY_DICT_PATH_VAR, "/srv/old.dict")]).unwrap();
        assert_eq!(cfg.dict_path, Some(PathBuf::from("/srv/old.dict")));

        let cfg = config(&[(LEGACY_DICT_PATH_VAR, "/srv/old.dict"), (DICT_PATH_VAR, "/srv/new.dict")]).unwrap();
        assert_eq!(cfg.dict_path, Some(PathBuf::from("/srv/new.dict")));

        let cfg = config(&[(LEGACY_DICT_PATH_VAR, "/srv/old.dict"), (DICT_PATH_VAR, "")]).unwrap();
        assert_eq!(cfg.dict_path, Some(PathBuf::from("/srv/old.dict")));
    }

    #[test]
    fn test_exchange_timeout_is_shorter_than_request_timeout() {
        let cfg = config(&[(TIMEOUT_VAR, "10")]).unwrap();
        assert_eq!(cfg.exchange_timeout(), Duration::from_secs(8));

        let cfg = config(&[(TIMEOUT_VAR, "1")]).unwrap();
        assert_eq!(cfg.exchange_timeout(), Duration::from_millis(800));
        assert!(cfg.exchange_timeout() < cfg.timeout);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(config(&[(BIND_VAR, "localhost")]), Err(ConfigError::InvalidBind { .. })));
        assert!(matches!(config(&[(TIMEOUT_VAR, "0")]), Err(ConfigError::InvalidTimeout { .. })));
        assert!(matches!(config(&[(TIMEOUT_VAR, "1.5")]), Err(ConfigError::InvalidTimeout { .. })));
    }
}
