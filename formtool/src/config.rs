//! Tool configuration.
//!
//! Settings are read from `.formtool.toml` in the working directory, or
//! from the file passed with `--config`.
//!
//! # Configuration File Format
//!
//! ```toml
//! edit_mode = "update"
//!
//! [fetch]
//! timeout_secs = 10
//! user_agent = "my-forms/1.0"
//!
//! [[fetch.rewrites]]
//! pattern = "^https://schemas\\.example\\.com"
//! replacement = "${env:SCHEMA_MIRROR}"
//! ```

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use anyhow::{Context, bail};
use clap::ValueEnum;
use formschema::{
    EditMode,
    inliner::{FetchOptions, UrlRewrite},
};
use log::{debug, info};
use regex::{Captures, Regex};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".formtool.toml";

/// Root configuration structure.
#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct FormToolConfig {
    /// Edit mode used when a command does not specify one.
    pub edit_mode: Mode,
    /// Remote schema fetching.
    pub fetch: FetchConfig,
}

/// Edit mode selector, mirrors [`EditMode`].
#[derive(ValueEnum, Default, Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Creating a new record.
    #[default]
    Create,
    /// Editing an existing record.
    Update,
    /// Read-only display.
    View,
}

impl From<Mode> for EditMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Create => EditMode::Create,
            Mode::Update => EditMode::Update,
            Mode::View => EditMode::View,
        }
    }
}

/// Settings of the HTTP schema fetcher.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header; defaults to `formschema/<version>`.
    pub user_agent: Option<String>,
    /// URL rewrites applied in order before every fetch.
    pub rewrites: Vec<RewriteRule>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
            rewrites: Vec::new(),
        }
    }
}

/// A regex URL rewrite.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RewriteRule {
    /// Regular expression matched against the schema URL.
    pub pattern: String,
    /// Replacement, may use capture groups (`$1`) and `${env:VAR}`
    /// placeholders.
    pub replacement: String,
}

impl FormToolConfig {
    /// Load the configuration.
    ///
    /// Without an explicit `path`, a missing [`CONFIG_FILE`] yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any file cannot be
    /// parsed.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };

        if !explicit && !fs::try_exists(&path).await.unwrap_or(false) {
            debug!("no {CONFIG_FILE} found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("can not open config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// JSON Schema of the configuration file.
    pub fn json_schema() -> anyhow::Result<String> {
        let schema = schemars::schema_for!(FormToolConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    /// Options for [`formschema::inliner::HttpFetcher`].
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid rewrite pattern or a zero timeout.
    pub fn fetch_options(&self) -> anyhow::Result<FetchOptions> {
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be greater than zero");
        }

        let mut options = FetchOptions {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            ..FetchOptions::default()
        };
        if let Some(user_agent) = &self.fetch.user_agent {
            options.user_agent = user_agent.clone();
        }
        for rule in &self.fetch.rewrites {
            let replacement = replace_env_placeholders(&rule.replacement);
            let rewrite = UrlRewrite::new(&rule.pattern, replacement)
                .with_context(|| format!("invalid rewrite pattern: {}", rule.pattern))?;
            options.rewrites.push(rewrite);
        }
        Ok(options)
    }
}

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{env:([^}]*)\}").expect("static pattern is valid")
});

/// Replaces `${env:VAR_NAME}` placeholders with the value of the environment
/// variable. Unset variables become the empty string; other `${...}` text is
/// kept as is.
pub fn replace_env_placeholders(input: &str) -> String {
    ENV_PLACEHOLDER
        .replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => {
                    debug!("using {name}={value}");
                    value
                }
                Err(_) => String::new(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = FormToolConfig::parse(
            r#"
edit_mode = "view"

[fetch]
timeout_secs = 5
user_agent = "forms-test"

[[fetch.rewrites]]
pattern = "^https://schemas\\.example\\.com"
replacement = "http://localhost:3000"
"#,
        )
        .unwrap();
        assert_eq!(config.edit_mode, Mode::View);
        assert_eq!(config.fetch.timeout_secs, 5);

        let options = config.fetch_options().unwrap();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.user_agent, "forms-test");
        assert_eq!(
            options.rewrites[0].apply("https://schemas.example.com/a.json"),
            "http://localhost:3000/a.json"
        );
    }

    #[test]
    fn test_defaults() {
        let config = FormToolConfig::parse("").unwrap();
        assert_eq!(config, FormToolConfig::default());
        assert_eq!(EditMode::from(config.edit_mode), EditMode::Create);
        assert_eq!(config.fetch_options().unwrap().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_config() {
        assert!(FormToolConfig::parse("edit_mode = \"delete\"").is_err());

        let config = FormToolConfig::parse("[fetch]\ntimeout_secs = 0").unwrap();
        assert!(config.fetch_options().is_err());

        let config = FormToolConfig::parse(
            "[[fetch.rewrites]]\npattern = \"(\"\nreplacement = \"x\"",
        )
        .unwrap();
        assert!(config.fetch_options().is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "edit_mode = \"update\"\n").unwrap();

        let config = FormToolConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.edit_mode, Mode::Update);

        let missing = dir.path().join("missing.toml");
        assert!(FormToolConfig::load(Some(&missing)).await.is_err());
    }

    #[test]
    fn test_json_schema_lists_fields() {
        let schema = FormToolConfig::json_schema().unwrap();
        assert!(schema.contains("edit_mode"));
        assert!(schema.contains("timeout_secs"));
        assert!(schema.contains("rewrites"));
    }

    #[test]
    fn test_replace_env_placeholders() {
        unsafe {
            env::set_var("FORMTOOL_TEST_HOST", "mirror.local");
            env::set_var("FORMTOOL_TEST_PORT", "8080");
        }

        assert_eq!(
            replace_env_placeholders("http://${env:FORMTOOL_TEST_HOST}:${env:FORMTOOL_TEST_PORT}/"),
            "http://mirror.local:8080/"
        );
        assert_eq!(replace_env_placeholders("${env:FORMTOOL_TEST_UNSET}"), "");
        assert_eq!(replace_env_placeholders("${other:placeholder}"), "${other:placeholder}");
        assert_eq!(replace_env_placeholders("${env:FORMTOOL_TEST_HOST"), "${env:FORMTOOL_TEST_HOST");
        assert_eq!(replace_env_placeholders("$1/schemas"), "$1/schemas");
        assert_eq!(replace_env_placeholders(""), "");
    }
}
