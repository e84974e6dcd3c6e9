use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for building and importing interchange documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Language tag written to exported documents and used for imported
    /// definitions.
    lang: String,

    /// Tool identifier written to the document header.
    tool_id: String,

    /// Whether model validation failures found during export are ignored
    /// (and reported) rather than aborting the build.
    pub ignore_validation_failures: bool,

    /// The number of digits in generated short-names.
    ///
    /// Counters are padded to this width with leading zeros, e.g. `REQ_0001`
    /// for 4 digits.
    short_name_digits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            tool_id: default_tool_id(),
            ignore_validation_failures: false,
            short_name_digits: default_short_name_digits(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The document language.
    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Sets the document language.
    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.lang = lang.into();
    }

    /// The tool identifier written to document headers.
    #[must_use]
    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    /// The number of digits for padding generated short-names.
    #[must_use]
    pub const fn short_name_digits(&self) -> usize {
        self.short_name_digits
    }
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_tool_id() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

const fn default_short_name_digits() -> usize {
    4
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_lang")]
        lang: String,

        #[serde(default = "default_tool_id")]
        tool_id: String,

        #[serde(default)]
        ignore_validation_failures: bool,

        /// The number of digits in generated short-names.
        #[serde(default = "default_short_name_digits")]
        short_name_digits: usize,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                lang,
                tool_id,
                ignore_validation_failures,
                short_name_digits,
            } => Self {
                lang,
                tool_id,
                ignore_validation_failures,
                short_name_digits,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            lang: config.lang,
            tool_id: config.tool_id,
            ignore_validation_failures: config.ignore_validation_failures,
            short_name_digits: config.short_name_digits,
        }
    }
}
