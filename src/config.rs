use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "gh-issue-batch";
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

const SETTINGS_FILE: &str = ".gh-issue-batch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("COMMENT_ID must be a positive integer, got {0:?}")]
    InvalidCommentId(String),

    #[error("batch.max_concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Failed to read settings file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Optional non-secret settings loaded from .gh-issue-batch.toml.
/// Every field has a default, so the tool works without the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github: GitHubSettings,

    #[serde(default)]
    pub batch: BatchSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubSettings {
    /// API base URL; GITHUB_API_URL takes precedence when set.
    pub api_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSettings {
    /// Upper bound on in-flight create requests.
    pub max_concurrency: Option<usize>,
}

impl Settings {
    pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let settings = toml::from_str(&contents)?;
        Ok(settings)
    }
}

/// Process-wide configuration, built once in main and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub repo_owner: String,
    pub repo_name: String,
    pub auth_token: String,
    /// Comment to update with the summary. Without it the summary is only printed.
    pub comment_id: Option<u64>,
    pub api_url: String,
    pub user_agent: String,
    pub max_concurrency: usize,
}

impl Config {
    /// Load settings from .gh-issue-batch.toml in the current directory (if it
    /// exists) and the rest from the process environment.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(SETTINGS_FILE);
        let settings = if path.exists() {
            Settings::load_from(path)?
        } else {
            Settings::default()
        };

        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// Build a Config from settings and a variable lookup.
    pub fn from_lookup<F>(settings: Settings, lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let repo_owner = required("REPO_OWNER")?;
        let repo_name = required("REPO_NAME")?;
        let auth_token = required("AUTH_TOKEN")?;

        let comment_id = match lookup("COMMENT_ID").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(parse_comment_id(&raw)?),
            None => None,
        };

        let api_url = lookup("GITHUB_API_URL")
            .filter(|v| !v.trim().is_empty())
            .or(settings.github.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let max_concurrency = settings
            .batch
            .max_concurrency
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        Ok(Config {
            repo_owner,
            repo_name,
            auth_token,
            comment_id,
            api_url,
            user_agent: settings
                .github
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            max_concurrency,
        })
    }
}

fn parse_comment_id(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ConfigError::InvalidCommentId(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(Settings::default(), |name| vars.get(name).cloned())
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("REPO_OWNER", "octo"),
            ("REPO_NAME", "widgets"),
            ("AUTH_TOKEN", "t0ken"),
        ])
    }

    #[test]
    fn test_required_vars() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.repo_owner, "octo");
        assert_eq!(config.repo_name, "widgets");
        assert_eq!(config.auth_token, "t0ken");
        assert_eq!(config.comment_id, None);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn test_each_missing_required_var() {
        for name in ["REPO_OWNER", "REPO_NAME", "AUTH_TOKEN"] {
            let mut vars = full_env();
            vars.remove(name);
            match load(&vars) {
                Err(ConfigError::MissingVar(missing)) => assert_eq!(missing, name),
                other => panic!("expected MissingVar({name}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_required_var_is_missing() {
        let mut vars = full_env();
        vars.insert("AUTH_TOKEN".to_string(), "  ".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingVar("AUTH_TOKEN"))
        ));
    }

    #[test]
    fn test_comment_id() {
        let mut vars = full_env();
        vars.insert("COMMENT_ID".to_string(), "123456".to_string());
        assert_eq!(load(&vars).unwrap().comment_id, Some(123456));

        vars.insert("COMMENT_ID".to_string(), "abc".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidCommentId(_))
        ));

        vars.insert("COMMENT_ID".to_string(), "0".to_string());
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_api_url_precedence() {
        let settings: Settings = toml::from_str(
            r#"
[github]
api_url = "https://ghe.example.com/api/v3/"
"#,
        )
        .unwrap();

        let vars = full_env();
        let config = Config::from_lookup(settings.clone(), |n| vars.get(n).cloned()).unwrap();
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");

        let mut vars = full_env();
        vars.insert("GITHUB_API_URL".to_string(), "http://localhost:9000".to_string());
        let config = Config::from_lookup(settings, |n| vars.get(n).cloned()).unwrap();
        assert_eq!(config.api_url, "http://localhost:9000");
    }

    #[test]
    fn test_parse_settings_toml() {
        let toml_str = r#"
[github]
user_agent = "ci-bot"

[batch]
max_concurrency = 2
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        let vars = full_env();
        let config = Config::from_lookup(settings, |n| vars.get(n).cloned()).unwrap();
        assert_eq!(config.user_agent, "ci-bot");
        assert_eq!(config.max_concurrency, 2);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let settings: Settings = toml::from_str("[batch]\nmax_concurrency = 0\n").unwrap();
        let vars = full_env();
        assert!(matches!(
            Config::from_lookup(settings, |n| vars.get(n).cloned()),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.github.api_url.is_none());
        assert!(settings.batch.max_concurrency.is_none());
    }
}
