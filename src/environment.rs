//! Deployment environment detection.
//!
//! Two strategies that are deliberately kept apart: [`resolve_by_hostname`]
//! infers the environment from where the app is served, while
//! [`resolve_public_env`] trusts the operator-supplied `PUBLIC_ENV` flag.

use serde::Serialize;
use std::fmt;

use crate::config::ConfigSource;
use crate::constants::{HOSTNAME_VAR, PUBLIC_ENV_VAR, QA_HOSTNAMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Qa,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Qa => "qa",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_qa(&self) -> bool {
        matches!(self, Environment::Qa)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Qa` for the known non-production hosts, `Production` for everything else.
pub fn resolve_by_hostname(hostname: &str) -> Environment {
    if QA_HOSTNAMES.contains(&hostname) {
        Environment::Qa
    } else {
        Environment::Production
    }
}

/// The ambient host identity, for callers that have no request to look at.
pub fn current_hostname(source: &(impl ConfigSource + ?Sized)) -> Option<String> {
    source.get(HOSTNAME_VAR)
}

/// Strips the port from a `Host` header value, keeping bracketed IPv6 intact.
pub fn hostname_from_host_header(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_once(']').map_or(host, |(addr, _)| &addr[1..]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// Strict resolver: only the exact strings `qa` and `production` count.
/// Anything else, including an absent value, is `None`.
pub fn resolve_public_env(value: Option<&str>) -> Option<Environment> {
    match value? {
        "qa" => Some(Environment::Qa),
        "production" => Some(Environment::Production),
        _ => None,
    }
}

pub fn is_production(value: Option<&str>) -> bool {
    value == Some("production")
}

pub fn is_qa_environment(value: Option<&str>) -> bool {
    value == Some("qa")
}

/// Reads `PUBLIC_ENV` from `source` and resolves it strictly.
pub fn public_env(source: &(impl ConfigSource + ?Sized)) -> Option<Environment> {
    resolve_public_env(source.get(PUBLIC_ENV_VAR).as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn allow_listed_hosts_are_qa() {
        for host in QA_HOSTNAMES {
            assert_eq!(resolve_by_hostname(host), Environment::Qa, "{host}");
        }
    }

    #[test]
    fn other_hosts_are_production() {
        for host in [
            "",
            "portal.app",
            "www.portal.app",
            "LOCALHOST",
            "localhost.",
            "qa.portal.app.evil.com",
            "127.0.0.2",
            "localhost:3000",
        ] {
            assert_eq!(resolve_by_hostname(host), Environment::Production, "{host}");
        }
    }

    #[test]
    fn host_header_port_is_stripped() {
        assert_eq!(hostname_from_host_header("localhost:3000"), "localhost");
        assert_eq!(hostname_from_host_header("qa.portal.app"), "qa.portal.app");
        assert_eq!(hostname_from_host_header("[::1]:8080"), "::1");
        assert_eq!(hostname_from_host_header("[::1]"), "::1");
    }

    #[test]
    fn strict_resolver() {
        assert_eq!(resolve_public_env(None), None);
        assert_eq!(resolve_public_env(Some("qa")), Some(Environment::Qa));
        assert_eq!(
            resolve_public_env(Some("production")),
            Some(Environment::Production)
        );
        assert_eq!(resolve_public_env(Some("staging")), None);
        assert_eq!(resolve_public_env(Some("Production")), None);
        assert_eq!(resolve_public_env(Some(" qa")), None);
        assert_eq!(resolve_public_env(Some("")), None);
    }

    #[test]
    fn predicates_are_exclusive() {
        for value in [None, Some("qa"), Some("production"), Some("staging"), Some("")] {
            assert!(!(is_production(value) && is_qa_environment(value)), "{value:?}");
        }
    }

    #[test]
    fn production_flag() {
        assert!(is_production(Some("production")));
        assert!(!is_qa_environment(Some("production")));
    }

    #[test]
    fn absent_flag() {
        assert!(!is_production(None));
        assert!(!is_qa_environment(None));
        assert_eq!(public_env(&HashMap::new()), None);
    }

    #[test]
    fn public_env_reads_source() {
        let mut source = HashMap::new();
        source.insert(PUBLIC_ENV_VAR.to_string(), "qa".to_string());
        assert_eq!(public_env(&source), Some(Environment::Qa));

        source.insert(PUBLIC_ENV_VAR.to_string(), "dev".to_string());
        assert_eq!(public_env(&source), None);
    }

    #[test]
    fn current_hostname_from_source() {
        let mut source = HashMap::new();
        assert_eq!(current_hostname(&source), None);
        source.insert(HOSTNAME_VAR.to_string(), "localhost".to_string());
        assert_eq!(
            current_hostname(&source).map(|h| resolve_by_hostname(&h)),
            Some(Environment::Qa)
        );
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Environment::Qa).unwrap(), "\"qa\"");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
