//! Provider configuration: where the AWX API is, how to authenticate, and how to secure the
//! connection.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the AWX base URL.
pub const HOSTNAME_VAR: &str = "AWX_HOSTNAME";

pub const USERNAME_VAR: &str = "AWX_USERNAME";

pub const PASSWORD_VAR: &str = "AWX_PASSWORD";

pub const DEFAULT_HOSTNAME: &str = "http://localhost";

pub const DEFAULT_USERNAME: &str = "admin";

pub const DEFAULT_PASSWORD: &str = "password";

/// The name of the configuration file in [config_dir].
pub const CONFIG_FILE: &str = "provider.yaml";

/// Returns a [PathBuf] to the directory where the provider's configuration should live.
///
/// When compiled for testing, this returns `CARGO_MANIFEST_DIR` plus `resources/etc/awx-provider`.
/// Otherwise, it returns `/etc/awx-provider`.
pub fn config_dir() -> PathBuf {
    // Omit the leading slash so that PathBuf::push appends instead of replacing.
    const CONFIG_DIR: &str = "etc/awx-provider";

    let mut path = PathBuf::new();

    #[cfg(test)]
    {
        path.push(env!("CARGO_MANIFEST_DIR"));
        path.push("resources");
    }

    #[cfg(not(test))]
    path.push("/");

    path.push(CONFIG_DIR);
    path
}

/// A configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Everything needed to build an authenticated AWX client.
///
/// `client_cert`, `client_key` and `ca_cert` are PEM text, not paths. Mutual TLS is used only
/// when all three are present; see [crate::transport].
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,

    /// Skip verification of the server's certificate.
    pub insecure: bool,

    pub client_cert: Option<String>,
    pub client_key: Option<String>,
    pub ca_cert: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| crate::schema::REDACTED);
        f.debug_struct("ProviderConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &crate::schema::REDACTED)
            .field("insecure", &self.insecure)
            .field("client_cert", &self.client_cert.is_some())
            .field("client_key", &redacted(&self.client_key))
            .field("ca_cert", &self.ca_cert.is_some())
            .finish()
    }
}

// The on-disk form. Every key is optional; missing keys take the environment defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    hostname: Option<String>,
    username: Option<String>,
    password: Option<String>,
    insecure: Option<bool>,
    client_cert: Option<String>,
    client_key: Option<String>,
    ca_cert: Option<String>,
}

impl ProviderConfig {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// Empty variables count as unset.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str, default: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        ProviderConfig {
            hostname: var(HOSTNAME_VAR, DEFAULT_HOSTNAME),
            username: var(USERNAME_VAR, DEFAULT_USERNAME),
            password: var(PASSWORD_VAR, DEFAULT_PASSWORD),
            insecure: false,
            client_cert: None,
            client_key: None,
            ca_cert: None,
        }
    }

    /// Parses a YAML configuration. Keys the YAML leaves out take their values from
    /// [ProviderConfig::from_env].
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let file: ConfigFile = match yaml.trim().is_empty() {
            true => ConfigFile::default(),
            false => serde_yaml::from_str(yaml)?,
        };
        Ok(Self::from_env().overlay(file))
    }

    /// Loads a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [ConfigError] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_yaml_str(&yaml).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads [CONFIG_FILE] from [config_dir] if it exists, or falls back to the environment.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = config_dir().join(CONFIG_FILE);
        match path.try_exists() {
            Ok(true) => Self::load(&path),
            Ok(false) => Ok(Self::from_env()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    fn overlay(self, file: ConfigFile) -> Self {
        ProviderConfig {
            hostname: file.hostname.unwrap_or(self.hostname),
            username: file.username.unwrap_or(self.username),
            password: file.password.unwrap_or(self.password),
            insecure: file.insecure.unwrap_or(self.insecure),
            client_cert: file.client_cert.or(self.client_cert),
            client_key: file.client_key.or(self.client_key),
            ca_cert: file.ca_cert.or(self.ca_cert),
        }
    }
}
