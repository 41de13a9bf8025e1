//! Service settings: optional TOML file, overridden by environment variables.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "pagesmith.toml";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_LLM_BASE_URL: &str = "https://aipipe.org/openrouter/v1";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-5-nano";

/// Older variable names still honored when the current name is unset.
const LEGACY_ENV_NAMES: &[(&str, &str)] = &[
    ("PAGESMITH_SECRET", "MY_SECRET"),
    ("LLM_API_KEY", "AIPIPE_TOKEN"),
    ("LLM_BASE_URL", "OPENAI_BASE_URL"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Shape of `pagesmith.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub secret: Option<String>,
    pub port: Option<u16>,
    pub branch: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub notify_timeout_secs: Option<u64>,
    pub github: GitHubFileSettings,
    pub llm: LlmFileSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubFileSettings {
    pub token: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmFileSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl FileSettings {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Clone)]
pub struct GitHubSettings {
    pub token: String,
    pub username: String,
}

#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone)]
pub struct Settings {
    pub secret: String,
    pub port: u16,
    pub branch: String,
    pub static_dir: Option<PathBuf>,
    /// Deadline for delivering the evaluation payload
    pub notify_timeout: Duration,
    pub github: GitHubSettings,
    pub llm: LlmSettings,
}

impl Settings {
    /// Loads `path`, or `pagesmith.toml` in the working directory when it
    /// exists, then applies the process environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileSettings::read(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    FileSettings::read(default)?
                } else {
                    debug!("No config file, using environment only");
                    FileSettings::default()
                }
            }
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merges file values with `env`. Environment wins, including the legacy
    /// variable names; blank values count as unset.
    pub fn from_sources<F>(file: FileSettings, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let env = |key: &str| {
            set(key).or_else(|| {
                LEGACY_ENV_NAMES
                    .iter()
                    .find(|(current, _)| *current == key)
                    .and_then(|(_, legacy)| set(*legacy))
            })
        };

        let secret = env("PAGESMITH_SECRET")
            .or(file.secret)
            .ok_or(ConfigError::Missing("PAGESMITH_SECRET"))?;

        let port = match env("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let notify_timeout_secs = match env("PAGESMITH_NOTIFY_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PAGESMITH_NOTIFY_TIMEOUT_SECS",
                value: raw,
            })?,
            None => file
                .notify_timeout_secs
                .unwrap_or(DEFAULT_NOTIFY_TIMEOUT_SECS),
        };
        if notify_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "PAGESMITH_NOTIFY_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        let github = GitHubSettings {
            token: env("GITHUB_TOKEN")
                .or(file.github.token)
                .ok_or(ConfigError::Missing("GITHUB_TOKEN"))?,
            username: env("GITHUB_USERNAME")
                .or(file.github.username)
                .ok_or(ConfigError::Missing("GITHUB_USERNAME"))?,
        };

        let llm = LlmSettings {
            api_key: env("LLM_API_KEY")
                .or(file.llm.api_key)
                .ok_or(ConfigError::Missing("LLM_API_KEY"))?,
            base_url: env("LLM_BASE_URL")
                .or(file.llm.base_url)
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: env("LLM_MODEL")
                .or(file.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        };

        Ok(Self {
            secret,
            port,
            branch: env("PAGESMITH_BRANCH")
                .or(file.branch)
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            static_dir: env("PAGESMITH_STATIC_DIR")
                .map(PathBuf::from)
                .or(file.static_dir),
            notify_timeout: Duration::from_secs(notify_timeout_secs),
            github,
            llm,
        })
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("secret", &redact(&self.secret))
            .field("port", &self.port)
            .field("branch", &self.branch)
            .field("static_dir", &self.static_dir)
            .field("notify_timeout", &self.notify_timeout)
            .field("github_token", &redact(&self.github.token))
            .field("github_username", &self.github.username)
            .field("llm_api_key", &redact(&self.llm.api_key))
            .field("llm_base_url", &self.llm.base_url)
            .field("llm_model", &self.llm.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("PAGESMITH_SECRET", "s3cret"),
        ("GITHUB_TOKEN", "ghp_token"),
        ("GITHUB_USERNAME", "octo"),
        ("LLM_API_KEY", "llm-key"),
    ];

    #[test]
    fn test_env_only_uses_defaults() {
        let settings = Settings::from_sources(FileSettings::default(), env(REQUIRED)).unwrap();

        assert_eq!(settings.secret, "s3cret");
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.branch, "main");
        assert_eq!(settings.notify_timeout, Duration::from_secs(600));
        assert_eq!(settings.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(settings.llm.model, DEFAULT_LLM_MODEL);
        assert!(settings.static_dir.is_none());
    }

    #[test]
    fn test_missing_secret() {
        let err = Settings::from_sources(
            FileSettings::default(),
            env(&[("GITHUB_TOKEN", "t"), ("PAGESMITH_SECRET", "  ")]),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Missing("PAGESMITH_SECRET")));
    }

    #[test]
    fn test_legacy_env_names_accepted() {
        let settings = Settings::from_sources(
            FileSettings::default(),
            env(&[
                ("MY_SECRET", "old-secret"),
                ("GITHUB_TOKEN", "ghp_token"),
                ("GITHUB_USERNAME", "octo"),
                ("AIPIPE_TOKEN", "aipipe-key"),
                ("OPENAI_BASE_URL", "https://proxy.example/v1"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.secret, "old-secret");
        assert_eq!(settings.llm.api_key, "aipipe-key");
        assert_eq!(settings.llm.base_url, "https://proxy.example/v1");
    }

    #[test]
    fn test_current_env_names_win_over_legacy() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MY_SECRET", "old-secret"));
        pairs.push(("AIPIPE_TOKEN", "aipipe-key"));
        pairs.push(("LLM_BASE_URL", "https://llm.example/v1"));
        pairs.push(("OPENAI_BASE_URL", "https://proxy.example/v1"));

        let settings = Settings::from_sources(FileSettings::default(), env(&pairs)).unwrap();

        assert_eq!(settings.secret, "s3cret");
        assert_eq!(settings.llm.api_key, "llm-key");
        assert_eq!(settings.llm.base_url, "https://llm.example/v1");
    }

    #[test]
    fn test_legacy_env_name_beats_file() {
        let file = FileSettings {
            secret: Some("from-file".to_string()),
            ..FileSettings::default()
        };
        let settings = Settings::from_sources(
            file,
            env(&[
                ("MY_SECRET", "old-secret"),
                ("GITHUB_TOKEN", "t"),
                ("GITHUB_USERNAME", "octo"),
                ("LLM_API_KEY", "k"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.secret, "old-secret");
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "http"));

        let err = Settings::from_sources(FileSettings::default(), env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_file_values_overridden_by_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pagesmith.toml");
        std::fs::write(
            &path,
            r#"
secret = "from-file"
port = 9000
branch = "gh-pages"
notify_timeout_secs = 30

[github]
token = "file-token"
username = "file-user"

[llm]
api_key = "file-key"
model = "openai/gpt-4o-mini"
"#,
        )
        .unwrap();

        let file = FileSettings::read(&path).unwrap();
        let settings = Settings::from_sources(
            file,
            env(&[("PAGESMITH_SECRET", "from-env"), ("LLM_MODEL", "other/model")]),
        )
        .unwrap();

        assert_eq!(settings.secret, "from-env");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.branch, "gh-pages");
        assert_eq!(settings.notify_timeout, Duration::from_secs(30));
        assert_eq!(settings.github.username, "file-user");
        assert_eq!(settings.llm.api_key, "file-key");
        assert_eq!(settings.llm.model, "other/model");
    }

    #[test]
    fn test_unknown_file_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pagesmith.toml");
        std::fs::write(&path, "secrte = \"typo\"\n").unwrap();

        let err = FileSettings::read(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings::from_sources(FileSettings::default(), env(REQUIRED)).unwrap();
        let debug = format!("{:?}", settings);

        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("ghp_token"));
        assert!(!debug.contains("llm-key"));
        assert!(debug.contains("octo"));
    }
}
