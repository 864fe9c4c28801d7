//! Web configuration loading for TLS and basic authentication.
//!
//! The configuration file is YAML with two optional sections:
//!
//! ```yaml
//! tls_server_config:
//!   cert_file: /path/to/cert.pem
//!   key_file: /path/to/key.pem
//! basic_auth_users:
//!   admin: secret
//! ```
//!
//! TLS is enabled only when both paths are non-empty; basic auth is enabled
//! only when the user map is non-empty. Unknown keys are ignored.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// TLS certificate and key paths. Empty strings mean "not configured".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsServerConfig {
    #[serde(default)]
    pub cert_file: String,

    #[serde(default)]
    pub key_file: String,
}

/// Web configuration loaded once at startup, read-only afterward.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebConfig {
    #[serde(default)]
    pub tls_server_config: TlsServerConfig,

    #[serde(default)]
    pub basic_auth_users: HashMap<String, String>,
}

impl WebConfig {
    /// Loads and parses the YAML web configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading web config file {}", path.display()))?;

        let config: WebConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing web config file {}", path.display()))?;

        Ok(config)
    }

    pub fn basic_auth_enabled(&self) -> bool {
        !self.basic_auth_users.is_empty()
    }

    /// Returns the certificate and key paths when both are configured.
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        let tls = &self.tls_server_config;
        if tls.cert_file.is_empty() || tls.key_file.is_empty() {
            return None;
        }
        Some((Path::new(&tls.cert_file), Path::new(&tls.key_file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(yaml: &str) -> WebConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            "tls_server_config:\n\
             \x20 cert_file: /etc/ssl/server.crt\n\
             \x20 key_file: /etc/ssl/server.key\n\
             basic_auth_users:\n\
             \x20 admin: secret\n\
             \x20 viewer: hunter2\n",
        );

        let (cert, key) = config.tls_paths().unwrap();
        assert_eq!(cert, Path::new("/etc/ssl/server.crt"));
        assert_eq!(key, Path::new("/etc/ssl/server.key"));
        assert!(config.basic_auth_enabled());
        assert_eq!(config.basic_auth_users["admin"], "secret");
        assert_eq!(config.basic_auth_users.len(), 2);
    }

    #[test]
    fn test_auth_only_config_disables_tls() {
        let config = parse("basic_auth_users:\n  admin: secret\n");
        assert!(config.tls_paths().is_none());
        assert!(config.basic_auth_enabled());
    }

    #[test]
    fn test_cert_without_key_disables_tls() {
        let config = parse("tls_server_config:\n  cert_file: /etc/ssl/server.crt\n");
        assert!(config.tls_paths().is_none());
        assert!(!config.basic_auth_enabled());
    }

    #[test]
    fn test_empty_config() {
        let config = parse("{}");
        assert!(config.tls_paths().is_none());
        assert!(!config.basic_auth_enabled());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = parse("http_server_config:\n  http2: true\nbasic_auth_users:\n  a: b\n");
        assert!(config.basic_auth_enabled());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "basic_auth_users:").unwrap();
        writeln!(file, "  admin: secret").unwrap();

        let config = WebConfig::load(file.path()).unwrap();
        assert!(config.basic_auth_enabled());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(WebConfig::load(Path::new("/nonexistent/web.yml")).is_err());
    }

    #[test]
    fn test_load_malformed_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "basic_auth_users: [unclosed").unwrap();

        assert!(WebConfig::load(file.path()).is_err());
    }
}
