use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Root of the upstream site, e.g. `https://anime.example`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Address the API dispatcher listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    /// Forward proxy, `scheme://[user:pass@]host:port`. Absent means direct.
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Timeout for HTML page requests in seconds
    #[serde(default = "default_html_timeout")]
    pub html_timeout_secs: u64,

    /// Timeout for AJAX/JSON requests in seconds
    #[serde(default = "default_json_timeout")]
    pub json_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    /// How many suggestions to return at most
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,

    /// Server name fragments tried first when picking a stream source
    #[serde(default = "default_preferred_servers")]
    pub preferred_servers: Vec<String>,
}

fn default_base_url() -> String { "https://anime.example".to_string() }
fn default_bind_addr() -> String { "127.0.0.1:8080".to_string() }
fn default_html_timeout() -> u64 { 15 }
fn default_json_timeout() -> u64 { 10 }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_accept_language() -> String { "en-US,en;q=0.9".to_string() }
fn default_suggestion_limit() -> usize { 10 }
fn default_preferred_servers() -> Vec<String> { vec!["mirror".to_string(), "vmoly".to_string()] }

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            html_timeout_secs: default_html_timeout(),
            json_timeout_secs: default_json_timeout(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: default_suggestion_limit(),
            preferred_servers: default_preferred_servers(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bind_addr: default_bind_addr(),
            transport: TransportConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, then apply environment
    /// overrides. A missing or broken file falls back to defaults.
    pub fn load() -> Self {
        let mut cfg = match Self::from_file(Path::new("config.toml")) {
            Ok(Some(cfg)) => cfg,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring config.toml: {}", e);
                Self::default()
            }
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(Self::from_toml_str(&content)?))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<Config>(content)?)
    }

    /// Apply `PROXY_URL`, `ANIME_BASE_URL` and `BIND_ADDR`. An empty
    /// `PROXY_URL` clears any proxy from the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(proxy) = lookup("PROXY_URL") {
            self.transport.proxy_url = Some(proxy);
        }
        if let Some(base) = lookup("ANIME_BASE_URL").filter(|s| !s.trim().is_empty()) {
            self.base_url = base;
        }
        if let Some(addr) = lookup("BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr;
        }
        self.transport.proxy_url = self
            .transport
            .proxy_url
            .take()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
    }
}

impl TransportConfig {
    /// Create the reqwest-backed transport from this configuration
    pub fn create_transport(
        &self,
        base_url: &str,
    ) -> Result<crate::http_client::HttpTransport, reqwest::Error> {
        use crate::http_client::{HttpTransport, HttpTransportConfig};
        use std::time::Duration;

        let config = HttpTransportConfig {
            html_timeout: Duration::from_secs(self.html_timeout_secs),
            json_timeout: Duration::from_secs(self.json_timeout_secs),
            proxy_url: self.proxy_url.clone(),
            user_agent: self.user_agent.clone(),
            referer: base_url.to_string(),
            accept_language: self.accept_language.clone(),
        };

        HttpTransport::with_config(config)
    }
}

impl Config {
    pub fn create_transport(&self) -> Result<crate::http_client::HttpTransport, reqwest::Error> {
        self.transport.create_transport(&self.base_url)
    }
}
