//! File-per-record storage
//!
//! Each entity is one `<ID>.cal.yaml` file in its type directory. Records are
//! located by full id, partial id or short id (`CERT@1`).

use miette::Diagnostic;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::core::shortid::ShortIdIndex;
use crate::yaml::{parse_yaml_file, write_yaml_file, YamlError};

/// File suffix of stored records
pub const RECORD_SUFFIX: &str = ".cal.yaml";

/// Errors from locating, reading or writing records
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("no {kind} found matching '{reference}'")]
    #[diagnostic(help("run `calcert {command} list` to see available records"))]
    NotFound {
        kind: &'static str,
        command: &'static str,
        reference: String,
    },

    #[error("'{reference}' matches more than one {kind}")]
    Ambiguous {
        kind: &'static str,
        reference: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Path where a record with this id is stored
pub fn record_path(project: &Project, id: &EntityId) -> PathBuf {
    project
        .root()
        .join(Project::dir_for(id.prefix()))
        .join(format!("{}{}", id, RECORD_SUFFIX))
}

/// Write a record, creating its directory if needed
pub fn save<E: Entity>(project: &Project, entity: &E) -> Result<PathBuf, StoreError> {
    let path = record_path(project, entity.id());
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    write_yaml_file(&path, entity)?;
    Ok(path)
}

/// Read a single record file
pub fn load<E: Entity>(path: &Path) -> Result<E, StoreError> {
    Ok(parse_yaml_file(path)?)
}

/// All record files of one entity type, sorted by file name
fn record_files<E: Entity>(project: &Project) -> Result<Vec<PathBuf>, StoreError> {
    let dir = project.root().join(Project::dir_for(E::PREFIX));
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        let is_record = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(RECORD_SUFFIX));
        if is_record {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every record of one type, oldest first
pub fn list<E: Entity>(project: &Project) -> Result<Vec<(E, PathBuf)>, StoreError> {
    let mut records = Vec::new();
    for path in record_files::<E>(project)? {
        let entity: E = load(&path)?;
        records.push((entity, path));
    }
    records.sort_by_key(|(e, _)| e.created());
    tracing::debug!(kind = %E::PREFIX, count = records.len(), "listed records");
    Ok(records)
}

/// Find one record by full id, unique partial id, or short id
pub fn find<E: Entity>(
    project: &Project,
    reference: &str,
    kind: &'static str,
    command: &'static str,
) -> Result<(E, PathBuf), StoreError> {
    let not_found = || StoreError::NotFound {
        kind,
        command,
        reference: reference.to_string(),
    };

    let short_ids = ShortIdIndex::load(project);
    let resolved = short_ids.resolve(reference).ok_or_else(not_found)?;

    let matches: Vec<PathBuf> = record_files::<E>(project)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(&resolved))
        })
        .collect();

    match matches.as_slice() {
        [] => Err(not_found()),
        [path] => {
            let entity = load(path)?;
            Ok((entity, path.clone()))
        }
        _ => Err(StoreError::Ambiguous {
            kind,
            reference: reference.to_string(),
        }),
    }
}
