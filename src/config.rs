//! Optional config file loading. Search order: ./chapterscrape.toml, then
//! $XDG_CONFIG_HOME/chapterscrape/config.toml (or ~/.config/chapterscrape/config.toml).

use crate::scraper::RegionLocators;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Site root, e.g. "https://centralnovel.com".
    pub base_url: Option<String>,
    /// Chapter path with a `{n}` placeholder, e.g. "supreme-magus-capitulo-{n}".
    pub path_template: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Lower bound of the pause after each retrieved chapter, in seconds.
    pub delay_min_secs: Option<f64>,
    /// Upper bound of the pause after each retrieved chapter, in seconds.
    pub delay_max_secs: Option<f64>,
    /// Default output directory when --txt/--epub are not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// EPUB title and base of the default output file names.
    pub book_title: Option<String>,
    /// CSS selectors for the page regions. Missing keys keep the built-in locators.
    pub locators: Option<RegionLocators>,
}

fn read_config(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

/// Search order: (1) ./chapterscrape.toml, (2) $XDG_CONFIG_HOME/chapterscrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("chapterscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("chapterscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading config");
            return read_config(path).map(Some);
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
        assert!(c.base_url.is_none());
        assert!(c.path_template.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.delay_min_secs.is_none());
        assert!(c.delay_max_secs.is_none());
        assert!(c.output_dir.is_none());
        assert!(c.book_title.is_none());
        assert!(c.locators.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            base_url = "https://example.com"
            path_template = "novel-chapter-{n}"
            user_agent = "Custom/1.0"
            timeout_secs = 20
            delay_min_secs = 0.5
            delay_max_secs = 3
            output_dir = "out"
            book_title = "Another Novel"

            [locators]
            number = "h1.num"
            title = "h2.title"
            content = "div.text"
            paragraph = "p, div.line"
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(c.path_template.as_deref(), Some("novel-chapter-{n}"));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.timeout_secs, Some(20));
        assert_eq!(c.delay_min_secs, Some(0.5));
        assert_eq!(c.delay_max_secs, Some(3.0));
        assert_eq!(c.output_dir.as_deref(), Some(Path::new("out")));
        assert_eq!(c.book_title.as_deref(), Some("Another Novel"));
        let locators = c.locators.unwrap();
        assert_eq!(locators.number, "h1.num");
        assert_eq!(locators.paragraph, "p, div.line");
    }

    #[test]
    fn partial_locators_keep_defaults() {
        let s = r#"
            [locators]
            content = "div.text"
        "#;
        let c: Config = toml::from_str(s).unwrap();
        let locators = c.locators.unwrap();
        let defaults = RegionLocators::default();
        assert_eq!(locators.content, "div.text");
        assert_eq!(locators.number, defaults.number);
        assert_eq!(locators.title, defaults.title);
        assert_eq!(locators.paragraph, "p");
    }

    #[test]
    fn read_config_reports_path_for_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapterscrape.toml");
        std::fs::write(&path, "base_url = [").unwrap();
        let err = read_config(&path).unwrap_err();
        assert!(err.starts_with("Invalid config"));
        assert!(err.contains("chapterscrape.toml"));
    }

    #[test]
    fn read_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapterscrape.toml");
        std::fs::write(&path, "timeout_secs = 5\n").unwrap();
        let c = read_config(&path).unwrap();
        assert_eq!(c.timeout_secs, Some(5));
    }
}
