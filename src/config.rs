use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::constants::{
    DATABASE_AUTH_TOKEN_VAR, DATABASE_URL_VAR, FIREBASE_API_KEY_VAR, FIREBASE_APP_ID_VAR,
    FIREBASE_AUTH_DOMAIN_VAR, FIREBASE_MESSAGING_SENDER_ID_VAR, FIREBASE_PROJECT_ID_VAR,
    FIREBASE_STORAGE_BUCKET_VAR, SUPABASE_ANON_KEY_VAR, SUPABASE_URL_VAR,
};
use crate::error::{PortalError, Result};

/// Where ambient configuration values come from.
///
/// Empty values are reported as absent, so `FOO=` in a `.env` file behaves
/// the same as not setting `FOO` at all.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Load `.env` from the working directory if there is one.
pub fn load_dotenv() {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!("No .env file found, using process environment only"),
    }
}

fn require(source: &(impl ConfigSource + ?Sized), key: &str) -> Result<String> {
    source
        .get(key)
        .ok_or_else(|| PortalError::Config(format!("{key} environment variable not set")))
}

/// Endpoint and anonymous key of the Supabase project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    pub fn from_source(source: &(impl ConfigSource + ?Sized)) -> Result<Self> {
        let url = require(source, SUPABASE_URL_VAR)?;
        let anon_key = require(source, SUPABASE_ANON_KEY_VAR)?;
        Ok(Self::new(url, anon_key))
    }

    /// First label of the URL host, e.g. `abcd` for `https://abcd.supabase.co`.
    pub fn project_ref(&self) -> &str {
        let host = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        let host = host.split(['/', ':']).next().unwrap_or(host);
        host.split('.').next().unwrap_or(host)
    }

    pub fn auth_cookie_name(&self) -> String {
        format!("sb-{}-auth-token", self.project_ref())
    }

    pub fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path.trim_start_matches('/'))
    }
}

/// Client-side identity provider settings. Only relayed, never used here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl FirebaseConfig {
    pub fn from_source(source: &(impl ConfigSource + ?Sized)) -> Result<Self> {
        Ok(Self {
            api_key: require(source, FIREBASE_API_KEY_VAR)?,
            auth_domain: require(source, FIREBASE_AUTH_DOMAIN_VAR)?,
            project_id: require(source, FIREBASE_PROJECT_ID_VAR)?,
            storage_bucket: require(source, FIREBASE_STORAGE_BUCKET_VAR)?,
            messaging_sender_id: require(source, FIREBASE_MESSAGING_SENDER_ID_VAR)?,
            app_id: require(source, FIREBASE_APP_ID_VAR)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
}

impl DatabaseConfig {
    pub fn from_source(source: &(impl ConfigSource + ?Sized)) -> Result<Self> {
        Ok(Self {
            url: require(source, DATABASE_URL_VAR)?,
            auth_token: source.get(DATABASE_AUTH_TOKEN_VAR),
        })
    }

    /// Remote URLs talk to a libSQL server; anything else is a local file path.
    pub fn is_remote(&self) -> bool {
        ["libsql://", "https://", "http://", "wss://", "ws://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

/// Settings for the `portal-server` binary, read from an optional TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No server config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            PortalError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn supabase_config_requires_both_values() {
        let only_url = source(&[(SUPABASE_URL_VAR, "https://abcd.supabase.co")]);
        let err = SupabaseConfig::from_source(&only_url).unwrap_err();
        assert!(matches!(err, PortalError::Config(msg) if msg.contains(SUPABASE_ANON_KEY_VAR)));

        let empty_key = source(&[
            (SUPABASE_URL_VAR, "https://abcd.supabase.co"),
            (SUPABASE_ANON_KEY_VAR, ""),
        ]);
        assert!(SupabaseConfig::from_source(&empty_key).is_err());
    }

    #[test]
    fn project_ref_and_cookie_name() {
        let config = SupabaseConfig::new("https://abcd.supabase.co/", "anon");
        assert_eq!(config.url, "https://abcd.supabase.co");
        assert_eq!(config.project_ref(), "abcd");
        assert_eq!(config.auth_cookie_name(), "sb-abcd-auth-token");
        assert_eq!(
            config.auth_endpoint("/user"),
            "https://abcd.supabase.co/auth/v1/user"
        );

        let local = SupabaseConfig::new("http://127.0.0.1:54321", "anon");
        assert_eq!(local.project_ref(), "127");
    }

    #[test]
    fn firebase_config_serializes_camel_case() {
        let src = source(&[
            (FIREBASE_API_KEY_VAR, "key"),
            (FIREBASE_AUTH_DOMAIN_VAR, "portal.firebaseapp.com"),
            (FIREBASE_PROJECT_ID_VAR, "portal"),
            (FIREBASE_STORAGE_BUCKET_VAR, "portal.appspot.com"),
            (FIREBASE_MESSAGING_SENDER_ID_VAR, "1234"),
            (FIREBASE_APP_ID_VAR, "1:1234:web:abcd"),
        ]);
        let config = FirebaseConfig::from_source(&src).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["authDomain"], "portal.firebaseapp.com");
        assert_eq!(json["messagingSenderId"], "1234");
    }

    #[test]
    fn database_config_detects_remote_urls() {
        let remote = DatabaseConfig::from_source(&source(&[
            (DATABASE_URL_VAR, "libsql://portal.turso.io"),
            (DATABASE_AUTH_TOKEN_VAR, "token"),
        ]))
        .unwrap();
        assert!(remote.is_remote());
        assert_eq!(remote.auth_token.as_deref(), Some("token"));

        let local = DatabaseConfig::from_source(&source(&[(DATABASE_URL_VAR, "portal.db")])).unwrap();
        assert!(!local.is_remote());
        assert!(local.auth_token.is_none());
    }

    #[test]
    fn server_config_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(dir.path().join("portal.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn server_config_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 8081\nallowed_origins = [\"https://portal.app\"]").unwrap();
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.allowed_origins, vec!["https://portal.app".to_string()]);
    }

    #[test]
    fn server_config_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(PortalError::Toml(_))
        ));
    }
}
