use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::auth::Credentials;
use crate::report::OutputFormat;

pub const ID_ENV: &str = "RESULT_ANALYZER_ID";
pub const PASSWORD_ENV: &str = "RESULT_ANALYZER_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub id: String,
    pub password: String,
    pub default_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        let credentials = Credentials::default();
        Self {
            id: credentials.id,
            password: credentials.password,
            default_format: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(id) = lookup(ID_ENV) {
            self.id = id;
        }
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.password = password;
        }
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.id.clone(), self.password.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_builtin_pair() {
        let config = Config::default();
        assert!(config.credentials().authenticate("admin", "1234"));
        assert_eq!(config.default_format, OutputFormat::Text);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = Config::from_toml("password = \"letmein\"\n").unwrap();
        assert_eq!(config.id, "admin");
        assert_eq!(config.password, "letmein");
    }

    #[test]
    fn format_is_read_from_file() {
        let config = Config::from_toml("default_format = \"json\"\n").unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = Config::from_toml("id = \"tutor\"\npassword = \"a\"\n")
            .unwrap()
            .with_overrides(|key| (key == PASSWORD_ENV).then(|| "b".to_string()));
        assert_eq!(config.id, "tutor");
        assert_eq!(config.password, "b");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::from_toml("id = [").is_err());
    }
}
