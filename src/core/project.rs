//! Project discovery and layout
//!
//! A calcert project is any directory containing a `.calcert/` folder.
//! Entities live in one directory per type below the project root.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::EntityPrefix;

/// Name of the metadata directory marking a project root
pub const PROJECT_DIR: &str = ".calcert";

/// Errors from locating or creating a project
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not inside a calcert project (no .calcert/ found from {0}); run `calcert init` first")]
    NotFound(PathBuf),

    #[error("project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A located calcert project
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Find the project containing the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let cwd = std::env::current_dir()?;
        Self::discover_from(&cwd)
    }

    /// Find the project containing `start`, walking up through its parents
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = Some(start);
        while let Some(dir) = current {
            if dir.join(PROJECT_DIR).is_dir() {
                tracing::debug!(root = %dir.display(), "found project");
                return Ok(Self {
                    root: dir.to_path_buf(),
                });
            }
            current = dir.parent();
        }
        Err(ProjectError::NotFound(start.to_path_buf()))
    }

    /// Create the project skeleton at `root`
    ///
    /// With `force`, an existing project is re-initialised; missing
    /// directories are created and the config file is left untouched.
    pub fn init(root: &Path, force: bool) -> Result<Self, ProjectError> {
        let meta = root.join(PROJECT_DIR);
        if meta.exists() && !force {
            return Err(ProjectError::AlreadyExists(root.to_path_buf()));
        }

        fs::create_dir_all(&meta)?;
        for prefix in EntityPrefix::all() {
            fs::create_dir_all(root.join(Self::dir_for(*prefix)))?;
        }

        let config_path = meta.join("config.yaml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)?;
        }

        tracing::info!(root = %root.display(), "initialized project");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the `.calcert/` metadata directory
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Project-relative directory for an entity type
    pub fn dir_for(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Cust => "customers",
            EntityPrefix::Eqp => "equipment",
            EntityPrefix::Tool => "tools",
            EntityPrefix::Cert => "certificates",
        }
    }
}

const DEFAULT_CONFIG: &str = "\
# calcert project configuration
#
# author: Jane Technician
#
# laboratory:
#   name: Example Calibration Laboratory
#   address: 1 Sample Street
#   accreditation: LAB-0000
#
# constants:
#   gas_temperature_effect: 0.0
#   gas_flow_rate_effect: 0.0
#
# display:
#   decimals: 4
";
