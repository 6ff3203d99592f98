//! Optional config file loading. Search order: ./chapterchain.toml, then
//! $XDG_CONFIG_HOME/chapterchain/config.toml (or ~/.config/chapterchain/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Default output directory when -o is not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// Fixed User-Agent for every request. Disables random sampling.
    pub user_agent: Option<String>,
    /// Pool sampled once per session when `user_agent` is not set. Replaces the built-in list.
    pub user_agents: Option<Vec<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Search order: (1) ./chapterchain.toml, (2) $XDG_CONFIG_HOME/chapterchain/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("chapterchain.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("chapterchain").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.output_dir.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.user_agents.is_none());
        assert!(c.timeout_secs.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            output_dir = "books"
            user_agent = "Custom/1.0"
            user_agents = ["A/1.0", "B/2.0"]
            timeout_secs = 60
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.output_dir.as_deref(), Some(std::path::Path::new("books")));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(
            c.user_agents,
            Some(vec!["A/1.0".to_string(), "B/2.0".to_string()])
        );
        assert_eq!(c.timeout_secs, Some(60));
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("timeout_secs = 5").unwrap();
        assert!(c.output_dir.is_none());
        assert!(c.user_agents.is_none());
        assert_eq!(c.timeout_secs, Some(5));
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("output_dir = [").is_err());
        assert!(toml::from_str::<Config>("timeout_secs = \"soon\"").is_err());
    }
}
