//! Gateway configuration loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! gateway on `127.0.0.1:8000` talking to a backend on `localhost:9200`.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [backend]
//! url = "http://localhost:9200"
//! max_retries = 2
//!
//! [aliases]
//! products = "catalog"
//!
//! [[rules]]
//! index = "catalog"
//! match_term = "iphone"
//! hide = ["42"]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use searchgate_core::suggestions::stopwords::Stopwords;
use searchgate_core::types::{HiddenDoc, RuleAction};
use searchgate_core::{AliasMap, BackendConfig, Rule};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Search backend.
    pub backend: BackendConfig,
    /// Suggestion engine defaults.
    pub suggestions: SuggestionsConfig,
    /// Index name to public alias.
    pub aliases: BTreeMap<String, String>,
    /// Merchandising rules.
    pub rules: Vec<RuleConfig>,
    /// Log output.
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks a free port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

/// Suggestion engine defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionsConfig {
    /// Replaces the built-in English stopword list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopwords: Option<Vec<String>>,
}

/// One merchandising rule, scoped to the index name clients search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Index or alias as named in client requests.
    pub index: String,
    /// Query term that triggers the rule, compared case-insensitively.
    pub match_term: String,
    /// Payload stored under `promoted`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promote: Option<serde_json::Value>,
    /// Document ids removed from the hits.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hide: Vec<String>,
}

impl RuleConfig {
    /// Convert into the pipeline's rule type.
    pub fn to_rule(&self) -> Rule {
        Rule {
            match_term: self.match_term.clone(),
            then: RuleAction {
                promote: self.promote.clone(),
                hide: (!self.hide.is_empty()).then(|| {
                    self.hide
                        .iter()
                        .map(|id| HiddenDoc { doc_id: id.clone() })
                        .collect()
                }),
            },
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    ///
    /// `$SEARCHGATE_CONFIG_DIR/config.toml` when set, else
    /// `dirs::config_dir()/searchgate/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(dir) = std::env::var_os("SEARCHGATE_CONFIG_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        dirs::config_dir()
            .map(|d| d.join("searchgate"))
            .unwrap_or_else(|| PathBuf::from("/tmp/searchgate-config"))
            .join("config.toml")
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - the backend section (see [`BackendConfig::validate`])
    /// - `server.host` is not blank
    /// - no alias is assigned twice
    /// - every rule names an index and a match term
    /// - no configured stopword is blank
    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        if self.server.host.trim().is_empty() {
            return Err(AppError::Config("server.host must not be empty".into()));
        }

        let mut aliases = HashSet::new();
        for alias in self.aliases.values() {
            if !aliases.insert(alias.as_str()) {
                return Err(AppError::Config(format!(
                    "alias `{alias}` is assigned to more than one index"
                )));
            }
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if rule.index.trim().is_empty() {
                return Err(AppError::Config(format!("rules[{i}].index must not be empty")));
            }
            if rule.match_term.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "rules[{i}].match_term must not be empty"
                )));
            }
        }

        if let Some(words) = &self.suggestions.stopwords {
            if words.iter().any(|w| w.trim().is_empty()) {
                return Err(AppError::Config(
                    "suggestions.stopwords must not contain blank words".into(),
                ));
            }
        }
        Ok(())
    }

    /// Build the alias table.
    ///
    /// # Errors
    ///
    /// Returns an error if an alias is assigned twice.
    pub fn alias_map(&self) -> Result<AliasMap> {
        Ok(AliasMap::from_pairs(
            self.aliases.iter().map(|(index, alias)| (index.as_str(), alias.as_str())),
        )?)
    }

    /// Default stopwords for predictive suggestions.
    pub fn stopwords(&self) -> Stopwords {
        match &self.suggestions.stopwords {
            Some(words) => Stopwords::from_words(words),
            None => Stopwords::english(),
        }
    }
}
