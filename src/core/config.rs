//! Layered configuration
//!
//! Values are merged from, lowest priority first: built-in defaults, the user
//! config (`config.yaml` in the platform config directory), the project config
//! (`.calcert/config.yaml`) and the environment.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::budget::LabConstants;
use crate::core::project::Project;

/// Default number of decimals for printed uncertainty values
pub const DEFAULT_DECIMALS: usize = 4;

/// Laboratory details printed on certificates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Laboratory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Accreditation number (e.g. ISO/IEC 17025 scope)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accreditation: Option<String>,
}

/// Output formatting options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub decimals: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
        }
    }
}

/// One config file as written on disk; every key optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    author: Option<String>,
    laboratory: Option<LaboratoryFile>,
    constants: Option<ConstantsFile>,
    display: Option<DisplayFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LaboratoryFile {
    name: Option<String>,
    address: Option<String>,
    accreditation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConstantsFile {
    gas_temperature_effect: Option<f64>,
    gas_flow_rate_effect: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DisplayFile {
    decimals: Option<usize>,
}

/// Overwrite `target` only when the file sets the key
fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    pub author: Option<String>,
    pub laboratory: Laboratory,
    pub constants: LabConstants,
    pub display: DisplayOptions,
}

impl Config {
    /// Load user config plus the given project's config, if any
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        if let Some(path) = user_config_path() {
            config.merge_file(&path);
        }
        if let Some(project) = project {
            config.merge_file(&project.meta_dir().join("config.yaml"));
        }
        if let Ok(author) = std::env::var("CALCERT_AUTHOR") {
            if !author.trim().is_empty() {
                config.author = Some(author);
            }
        }

        config
    }

    /// Merge one YAML file over the current values; unreadable files are skipped
    fn merge_file(&mut self, path: &Path) {
        let Ok(content) = std::fs::read_to_string(path) else {
            return;
        };
        let blank = content.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            return;
        }

        match serde_yml::from_str::<ConfigFile>(&content) {
            Ok(file) => self.merge(file),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            }
        }
    }

    /// Merge key by key so a later file only overrides what it sets
    fn merge(&mut self, file: ConfigFile) {
        if file.author.is_some() {
            self.author = file.author;
        }

        let lab = file.laboratory.unwrap_or_default();
        if lab.name.is_some() {
            self.laboratory.name = lab.name;
        }
        if lab.address.is_some() {
            self.laboratory.address = lab.address;
        }
        if lab.accreditation.is_some() {
            self.laboratory.accreditation = lab.accreditation;
        }

        let constants = file.constants.unwrap_or_default();
        set(
            &mut self.constants.gas_temperature_effect,
            constants.gas_temperature_effect,
        );
        set(
            &mut self.constants.gas_flow_rate_effect,
            constants.gas_flow_rate_effect,
        );

        let display = file.display.unwrap_or_default();
        set(&mut self.display.decimals, display.decimals);
    }

    /// Author name for new records
    ///
    /// Falls back to `git config user.name`, then the login name.
    pub fn author(&self) -> String {
        if let Some(author) = &self.author {
            return author.clone();
        }

        if let Ok(output) = Command::new("git").args(["config", "user.name"]).output() {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Location of the per-user config file
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "calcert").map(|dirs| dirs.config_dir().join("config.yaml"))
}
