use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Represents the complete configuration for git-lineage.
///
/// Covers the remote used by the optional remote-consistency checks, the
/// commit-message trailer vocabulary, and the prerelease label identifier.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub trailers: TrailersConfig,

    #[serde(default = "default_prerelease_identifier")]
    pub prerelease_identifier: String,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_prerelease_identifier() -> String {
    "alpha".to_string()
}

/// Returns the default trailer prefix.
fn default_trailer_prefix() -> String {
    "+semver:".to_string()
}

/// Returns the default list of trailer tokens that flag a breaking change.
fn default_breaking_tokens() -> Vec<String> {
    vec!["breaking".to_string(), "major".to_string()]
}

/// Returns the default list of trailer tokens that flag a feature change.
fn default_feature_tokens() -> Vec<String> {
    vec!["feature".to_string(), "minor".to_string()]
}

/// Configuration for commit-message trailer analysis.
///
/// A trailer is a trimmed message line of the form `+semver: breaking`.
/// Matching is case-sensitive; the token lists can be extended but the
/// defaults follow the conventional vocabulary.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrailersConfig {
    #[serde(default = "default_trailer_prefix")]
    pub prefix: String,

    #[serde(default = "default_breaking_tokens")]
    pub breaking_tokens: Vec<String>,

    #[serde(default = "default_feature_tokens")]
    pub feature_tokens: Vec<String>,
}

impl Default for TrailersConfig {
    fn default() -> Self {
        TrailersConfig {
            prefix: default_trailer_prefix(),
            breaking_tokens: default_breaking_tokens(),
            feature_tokens: default_feature_tokens(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote: default_remote(),
            trailers: TrailersConfig::default(),
            prerelease_identifier: default_prerelease_identifier(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitlineage.toml` in current directory
/// 3. `~/.config/.gitlineage.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new("./gitlineage.toml").exists() {
        fs::read_to_string("./gitlineage.toml")?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".gitlineage.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.remote, "origin");
        assert_eq!(config.prerelease_identifier, "alpha");
        assert_eq!(config.trailers.prefix, "+semver:");
        assert!(config
            .trailers
            .breaking_tokens
            .contains(&"breaking".to_string()));
        assert!(config
            .trailers
            .feature_tokens
            .contains(&"minor".to_string()));
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            remote = "upstream"

            [trailers]
            breaking_tokens = ["breaking"]
            "#,
        )
        .unwrap();

        assert_eq!(config.remote, "upstream");
        assert_eq!(config.trailers.breaking_tokens, vec!["breaking"]);
        // Unspecified fields keep their defaults
        assert_eq!(config.trailers.prefix, "+semver:");
        assert_eq!(config.prerelease_identifier, "alpha");
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }
}
