use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub repair: RepairConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Treat any interleave desync as a failure
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepairConfig {
    /// Suffix inserted before the extension of the default output path
    /// (`movie.film` becomes `movie.fixed.film`)
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Re-validate the repaired film before writing it
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            output_suffix: default_output_suffix(),
            verify: default_verify(),
        }
    }
}

fn default_output_suffix() -> String {
    "fixed".to_string()
}

fn default_verify() -> bool {
    true
}
