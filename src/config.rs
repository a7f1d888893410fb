//! Server configuration.
//!
//! Configuration is an immutable value built once at startup and shared by
//! reference with the listener and every connection task.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var naming a YAML configuration file.
pub const CONFIG_ENV: &str = "SERVER_CONFIG";
/// Env var overriding the listen address.
pub const LISTEN_ENV: &str = "LISTEN";

/// Legacy deployment files: one holds the root directory, the other the port.
pub const LEGACY_ROOT_FILE: &str = "archivos_config.txt";
pub const LEGACY_PORT_FILE: &str = "puerto_config.txt";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub audit: AuditConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1:8080"
    pub listen_addr: String,
}

/// Where served assets come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root directory of the served tree
    pub root: PathBuf,
    /// File served for an empty request path
    pub index_file: String,
    /// File served (with 404) when the requested resource is missing
    pub not_found_file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory holding the daily `YYYY-MM-DD.log` files
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_body_bytes: usize,
    pub max_head_bytes: usize,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./public"),
            index_file: "index.html".to_string(),
            not_found_file: "error_404.html".to_string(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            max_head_bytes: 16 * 1024,
            read_timeout_secs: 30,
            write_timeout_secs: 30,
        }
    }
}

impl LimitsConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Config {
    /// Parses a YAML document. Missing sections and fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(yaml).context("invalid YAML configuration")?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// Builds a configuration from the two-file legacy layout: the first file
    /// holds the root directory, the second the TCP port. The server then
    /// listens on localhost only.
    pub fn from_legacy_files(root_file: impl AsRef<Path>, port_file: impl AsRef<Path>) -> Result<Self> {
        let root_file = root_file.as_ref();
        let port_file = port_file.as_ref();

        let root = std::fs::read_to_string(root_file)
            .with_context(|| format!("failed to read {}", root_file.display()))?;
        let port = std::fs::read_to_string(port_file)
            .with_context(|| format!("failed to read {}", port_file.display()))?;
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("invalid port in {}: {:?}", port_file.display(), port.trim()))?;

        let root = root.trim();
        if root.is_empty() {
            bail!("{} does not name a root directory", root_file.display());
        }

        let mut cfg = Config::default();
        cfg.site.root = PathBuf::from(root);
        cfg.server.listen_addr = format!("127.0.0.1:{}", port);
        Ok(cfg)
    }

    /// Loads configuration from the environment.
    ///
    /// `SERVER_CONFIG` wins when set. Otherwise the legacy file pair is used if
    /// both files are present in the working directory, and defaults if not.
    /// `LISTEN` overrides the listen address in every case.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => {
                if Path::new(LEGACY_ROOT_FILE).is_file() && Path::new(LEGACY_PORT_FILE).is_file() {
                    Self::from_legacy_files(LEGACY_ROOT_FILE, LEGACY_PORT_FILE)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(listen) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen;
        }

        Ok(cfg)
    }

    /// Checks the served tree before the listener starts.
    ///
    /// Returns the canonical root. A missing root or fallback resource is a
    /// configuration fault and is fatal at startup.
    pub fn validate(&self) -> Result<PathBuf> {
        if self.site.index_file.is_empty() || self.site.not_found_file.is_empty() {
            bail!("index_file and not_found_file must not be empty");
        }
        if self.limits.max_head_bytes == 0 {
            bail!("limits.max_head_bytes must be greater than zero");
        }

        let root = self.site.root.canonicalize().with_context(|| {
            format!("root directory {} is not accessible", self.site.root.display())
        })?;
        if !root.is_dir() {
            bail!("root {} is not a directory", root.display());
        }

        let fallback = root.join(&self.site.not_found_file);
        if !fallback.is_file() {
            bail!(
                "fallback resource {} is missing from {}",
                self.site.not_found_file,
                root.display()
            );
        }

        Ok(root)
    }
}
