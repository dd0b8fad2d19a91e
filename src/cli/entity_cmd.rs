//! Shared entity command infrastructure
//!
//! Common show/list/new plumbing for the record types, so each command file
//! only carries its own arguments and pretty printer.

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::cli::filters::StatusFilter;
use crate::cli::output::{effective_format, print_rows};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::Project;
use crate::core::shortid::ShortIdIndex;
use crate::core::store;

// =========================================================================
// Entity Configuration
// =========================================================================

/// Static configuration for an entity type
pub struct EntityConfig {
    /// Entity prefix (e.g., EntityPrefix::Tool)
    pub prefix: EntityPrefix,
    /// Singular name for messages (e.g., "reference standard")
    pub name: &'static str,
    /// Plural name for messages
    pub name_plural: &'static str,
    /// Subcommand that manages this type (e.g., "tool")
    pub command: &'static str,
}

// =========================================================================
// Lookup
// =========================================================================

/// Find one record by full, partial or short id
pub fn find<E: Entity>(
    project: &Project,
    reference: &str,
    config: &EntityConfig,
) -> Result<(E, PathBuf)> {
    Ok(store::find(project, reference, config.name, config.command)?)
}

// =========================================================================
// Common Show Implementation
// =========================================================================

/// Generic show command that handles YAML/JSON/ID output formats
///
/// Returns the record when the caller should pretty-print it.
pub fn run_show_generic<E: Entity>(
    project: &Project,
    reference: &str,
    config: &EntityConfig,
    global: &GlobalOpts,
) -> Result<Option<(E, PathBuf)>> {
    let (entity, path): (E, PathBuf) = find(project, reference, config)?;

    match global.format {
        OutputFormat::Yaml => {
            let content = fs::read_to_string(&path).into_diagnostic()?;
            print!("{}", content);
            Ok(None)
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&entity).into_diagnostic()?;
            println!("{}", json);
            Ok(None)
        }
        OutputFormat::Id | OutputFormat::ShortId => {
            print_entity_id(entity.id(), global.format, project);
            Ok(None)
        }
        OutputFormat::Path => {
            println!("{}", path.display());
            Ok(None)
        }
        _ => Ok(Some((entity, path))),
    }
}

/// Print entity ID in the requested format
pub fn print_entity_id(id: &EntityId, format: OutputFormat, project: &Project) {
    match format {
        OutputFormat::ShortId => {
            let short_ids = ShortIdIndex::load(project);
            let short_id = short_ids.get_short_id(&id.to_string()).unwrap_or_default();
            println!("{}", short_id);
        }
        _ => {
            println!("{}", id);
        }
    }
}

/// Display label for a linked record: short id plus title when it resolves
pub fn link_label<E: Entity>(project: &Project, id: &EntityId, short_ids: &ShortIdIndex) -> String {
    let display_id = short_ids
        .get_short_id(&id.to_string())
        .unwrap_or_else(|| id.to_string());
    let path = store::record_path(project, id);
    match store::load::<E>(&path) {
        Ok(entity) => format!("{} ({})", display_id, entity.title()),
        Err(_) => display_id,
    }
}

/// Footer line shared by pretty printers
pub fn print_footer<E: Entity>(entity: &E) {
    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {} | {}: {} | {}: {}",
        style("Author").dim(),
        entity.author(),
        style("Created").dim(),
        entity.created().format("%Y-%m-%d %H:%M"),
        style("Status").dim(),
        entity.status()
    );
}

// =========================================================================
// Common New Implementation
// =========================================================================

/// Write a new record and give it a short id
pub fn save_new<E: Entity>(project: &Project, entity: &E) -> Result<(PathBuf, String)> {
    let path = store::save(project, entity)?;

    let mut short_ids = ShortIdIndex::load(project);
    let short_id = short_ids.add(entity.id());
    short_ids.save(project).into_diagnostic()?;

    tracing::info!(id = %entity.id(), path = %path.display(), "created record");
    Ok((path, short_id))
}

/// Report a newly created record according to the output format
pub fn output_new_entity(
    id: &EntityId,
    path: &Path,
    short_id: &str,
    config: &EntityConfig,
    detail: &str,
    global: &GlobalOpts,
) {
    match global.format {
        OutputFormat::Id => println!("{}", id),
        OutputFormat::ShortId => println!("{}", short_id),
        OutputFormat::Path => println!("{}", path.display()),
        _ => {
            println!(
                "{} Created {} {}",
                style("✓").green(),
                config.name,
                style(short_id).cyan()
            );
            println!("   {}", style(path.display()).dim());
            if !detail.is_empty() {
                println!("   {}", detail);
            }
        }
    }
}

// =========================================================================
// Common List Implementation
// =========================================================================

/// Load every record of a type that passes the status filter
///
/// Short ids are assigned to anything listed for the first time.
pub fn load_filtered<E: Entity>(
    project: &Project,
    status: StatusFilter,
) -> Result<Vec<(E, PathBuf)>> {
    let records: Vec<(E, PathBuf)> = store::list::<E>(project)?
        .into_iter()
        .filter(|(e, _)| status.matches(e.status()))
        .collect();

    let mut short_ids = ShortIdIndex::load(project);
    let before = short_ids.len();
    for (entity, _) in &records {
        short_ids.add(entity.id());
    }
    if short_ids.len() != before {
        short_ids.save(project).into_diagnostic()?;
    }

    Ok(records)
}

/// Print a list of records
///
/// `to_row` flattens one record into its table row for Table/TSV/CSV output.
pub fn output_list<E, R, F>(
    project: &Project,
    records: &[(E, PathBuf)],
    config: &EntityConfig,
    global: &GlobalOpts,
    count_only: bool,
    to_row: F,
) -> Result<()>
where
    E: Entity,
    R: Tabled + Serialize,
    F: Fn(&E, &ShortIdIndex) -> R,
{
    if count_only {
        println!("{}", records.len());
        return Ok(());
    }

    if records.is_empty() {
        println!("No {} found.", config.name_plural);
        return Ok(());
    }

    let short_ids = ShortIdIndex::load(project);
    let format = effective_format(global.format, true);

    match format {
        OutputFormat::Json => {
            let entities: Vec<&E> = records.iter().map(|(e, _)| e).collect();
            println!("{}", serde_json::to_string_pretty(&entities).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            let entities: Vec<&E> = records.iter().map(|(e, _)| e).collect();
            print!("{}", serde_yml::to_string(&entities).into_diagnostic()?);
        }
        OutputFormat::Id | OutputFormat::ShortId => {
            for (entity, _) in records {
                if format == OutputFormat::ShortId {
                    let short_id = short_ids
                        .get_short_id(&entity.id().to_string())
                        .unwrap_or_default();
                    println!("{}", short_id);
                } else {
                    println!("{}", entity.id());
                }
            }
        }
        OutputFormat::Path => {
            for (_, path) in records {
                println!("{}", path.display());
            }
        }
        _ => {
            let rows: Vec<R> = records.iter().map(|(e, _)| to_row(e, &short_ids)).collect();
            print_rows(&rows, format)?;
            if format == OutputFormat::Table {
                println!(
                    "{}",
                    style(format!("{} {} found", records.len(), config.name_plural)).dim()
                );
            }
        }
    }

    Ok(())
}

/// Short id for a record, falling back to the full id
pub fn short_or_full(id: &EntityId, short_ids: &ShortIdIndex) -> String {
    short_ids
        .get_short_id(&id.to_string())
        .unwrap_or_else(|| id.to_string())
}
