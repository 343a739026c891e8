//! Configuration loading and management for the invoice inspector
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean domain objects
//! - Default configurations are embedded in the domain, not infrastructure
//! - Profiles act as a repository of rule selections and evaluation settings

use crate::domain::{InspectorError, InspectorResult};
use crate::rules::{RuleContext, RuleEngine, BUILTIN_RULE_IDS, DEFAULT_SCALE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// File names searched, in order, when no configuration path is given
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "ubl_inspector.yaml",
    "ubl_inspector.yml",
    ".ubl_inspector.yaml",
];

/// Profile used when neither the configuration nor the caller names one
pub const DEFAULT_PROFILE: &str = "einvoice";

/// Largest scale a decimal amount can carry
const MAX_SCALE: u32 = 28;

/// Main configuration structure for the inspector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Configuration format version
    pub version: String,
    /// Where the XSD schema set lives
    #[serde(default)]
    pub schemas: SchemaConfig,
    /// Profile used when `--profile` is not given
    #[serde(default = "default_profile_name")]
    pub default_profile: String,
    /// Named rule selections
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// Schema discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Directory searched recursively for `*.xsd` files
    #[serde(default = "default_schema_directory")]
    pub directory: PathBuf,
    /// Entry schema relative to `directory`; discovered when absent
    #[serde(default)]
    pub entry: Option<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            directory: default_schema_directory(),
            entry: None,
        }
    }
}

/// A named set of rules plus the context they run with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Fractional digits used when no currency-specific scale applies
    #[serde(default = "default_scale")]
    pub scale: u32,
    /// Rule identifiers in evaluation order
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,
    /// Evaluate rules on the rayon pool
    #[serde(default)]
    pub parallel: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            rules: default_rules(),
            parallel: false,
        }
    }
}

impl ProfileConfig {
    pub fn rule_context(&self) -> RuleContext {
        RuleContext::new(self.scale)
    }

    /// Build an engine with this profile's rules in configured order
    pub fn build_engine(&self) -> InspectorResult<RuleEngine> {
        Ok(RuleEngine::from_rule_ids(&self.rules)?.with_parallel(self.parallel))
    }
}

impl InspectorConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> InspectorResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            InspectorError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            InspectorError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> InspectorResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| InspectorError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the first known configuration file in `directory`, or the defaults
    pub fn discover<P: AsRef<Path>>(directory: P) -> InspectorResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let candidate = directory.as_ref().join(name);
            if candidate.is_file() {
                return Self::load_from_file(candidate);
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::with_defaults())
    }

    /// Get default configuration with the built-in profile
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            schemas: SchemaConfig::default(),
            default_profile: default_profile_name(),
            profiles: default_profiles(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> InspectorResult<()> {
        // Check version compatibility
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(InspectorError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        if self.profiles.is_empty() {
            return Err(InspectorError::config("At least one profile must be defined"));
        }

        if !self.profiles.contains_key(&self.default_profile) {
            return Err(InspectorError::config(format!(
                "Default profile '{}' is not defined",
                self.default_profile
            )));
        }

        for (name, profile) in &self.profiles {
            if profile.scale > MAX_SCALE {
                return Err(InspectorError::config(format!(
                    "Profile '{}' has scale {}; the maximum is {}",
                    name, profile.scale, MAX_SCALE
                )));
            }

            let mut seen = HashSet::new();
            for id in &profile.rules {
                if !BUILTIN_RULE_IDS.contains(&id.as_str()) {
                    return Err(InspectorError::config(format!(
                        "Unknown rule '{}' in profile '{}'. Known rules: {}",
                        id,
                        name,
                        BUILTIN_RULE_IDS.join(", ")
                    )));
                }
                if !seen.insert(id.as_str()) {
                    return Err(InspectorError::config(format!(
                        "Duplicate rule ID '{}' in profile '{}'",
                        id, name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Look up a profile, falling back to the default profile when `name` is `None`
    pub fn profile(&self, name: Option<&str>) -> InspectorResult<&ProfileConfig> {
        let name = name.unwrap_or(&self.default_profile);
        self.profiles.get(name).ok_or_else(|| {
            InspectorError::config(format!(
                "Unknown profile '{}'. Available profiles: {}",
                name,
                self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_schema_directory() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_scale() -> u32 {
    DEFAULT_SCALE
}

fn default_rules() -> Vec<String> {
    BUILTIN_RULE_IDS.iter().map(|id| id.to_string()).collect()
}

fn default_profiles() -> BTreeMap<String, ProfileConfig> {
    let mut profiles = BTreeMap::new();
    profiles.insert(default_profile_name(), ProfileConfig::default());
    profiles
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: InspectorConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: InspectorConfig::default(),
        }
    }

    /// Set the schema directory
    pub fn schema_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.schemas.directory = directory.into();
        self
    }

    /// Set the entry schema file name
    pub fn entry_schema(mut self, entry: impl Into<String>) -> Self {
        self.config.schemas.entry = Some(entry.into());
        self
    }

    /// Add or replace a profile
    pub fn add_profile(mut self, name: impl Into<String>, profile: ProfileConfig) -> Self {
        self.config.profiles.insert(name.into(), profile);
        self
    }

    pub fn default_profile(mut self, name: impl Into<String>) -> Self {
        self.config.default_profile = name.into();
        self
    }

    /// Build the final configuration
    pub fn build(self) -> InspectorResult<InspectorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
