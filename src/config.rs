use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use url::Url;

pub const DEFAULT_PORT: u16 = 3000;

/// Optional on-disk settings. Everything has an environment override; the
/// credential itself is never read from the file.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    bind_addr: Option<String>,
    github_api_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub github_token: String,
    pub bind_addr: String,
    pub github_api_base: Url,
}

impl ServerConfig {
    /// Reads `config/server.toml` (path override: `GITHUB_MCP_CONFIG`) if it
    /// exists, then applies environment overrides. A missing `GITHUB_TOKEN`
    /// is a fatal configuration error.
    pub fn load() -> Result<Self> {
        let default_path = "config/server.toml";
        let path =
            std::env::var("GITHUB_MCP_CONFIG").unwrap_or_else(|_| default_path.to_string());
        let file = read_file_config(Path::new(&path))?;

        let Ok(github_token) = std::env::var("GITHUB_TOKEN") else {
            bail!("GITHUB_TOKEN environment variable is not set");
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT value: {raw}"))?,
            Err(_) => DEFAULT_PORT,
        };

        // Precedence: env bind addr, then file, then 0.0.0.0:<PORT>.
        let bind_addr = std::env::var("GITHUB_MCP_BIND_ADDR")
            .ok()
            .or(file.bind_addr)
            .unwrap_or_else(|| format!("0.0.0.0:{port}"));

        let api_base = std::env::var("GITHUB_API_BASE")
            .ok()
            .or(file.github_api_base)
            .unwrap_or_else(|| crate::github::DEFAULT_API_BASE.to_string());
        let github_api_base = Url::parse(&api_base)
            .with_context(|| format!("invalid GitHub API base url: {api_base}"))?;

        Ok(Self {
            github_token,
            bind_addr,
            github_api_base,
        })
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    let cfg = toml::from_str(&content)
        .with_context(|| format!("invalid config file: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_parses_known_keys() {
        let cfg: FileConfig = toml::from_str(
            "bind_addr = \"127.0.0.1:8080\"\ngithub_api_base = \"https://ghe.example.com\"\n",
        )
        .unwrap();
        assert_eq!(cfg.bind_addr.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(cfg.github_api_base.as_deref(), Some("https://ghe.example.com"));
    }

    #[test]
    fn empty_file_config_is_all_defaults() {
        let cfg: FileConfig = toml::from_str("").unwrap();
        assert!(cfg.bind_addr.is_none());
        assert!(cfg.github_api_base.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = read_file_config(Path::new("does/not/exist.toml")).unwrap();
        assert!(cfg.bind_addr.is_none());
    }
}
