//! Short ID system for easier record selection
//!
//! Maps session-friendly aliases such as `CERT@1` or `TOOL@3` to full entity
//! ids. Aliases are numbered per prefix in creation/listing order and persisted
//! in `.calcert/shortids.json`.

use std::collections::HashMap;
use std::fs;

use crate::core::identity::EntityId;
use crate::core::project::Project;

/// Index file location within the project metadata directory
const INDEX_FILE: &str = "shortids.json";

/// A mapping of prefixed short IDs to full entity IDs
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    /// Maps "PREFIX@N" to full entity ID string (e.g., "CERT@1" -> "CERT-01ABC...")
    entries: HashMap<String, String>,
    /// Reverse lookup, rebuilt on load
    #[serde(skip)]
    reverse: HashMap<String, String>,
    /// Next available number per prefix
    next_ids: HashMap<String, u32>,
}

impl ShortIdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from a project, or create empty if not found
    pub fn load(project: &Project) -> Self {
        let path = project.meta_dir().join(INDEX_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(mut index) = serde_json::from_str::<ShortIdIndex>(&content) {
                index.reverse = index
                    .entries
                    .iter()
                    .map(|(k, v)| (v.clone(), k.clone()))
                    .collect();
                return index;
            }
            tracing::warn!(path = %path.display(), "short id index unreadable, starting fresh");
        }
        Self::new()
    }

    /// Save the index to a project
    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let path = project.meta_dir().join(INDEX_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Add an entity id, returning its prefixed short id
    ///
    /// Ids already present keep their existing alias.
    pub fn add(&mut self, entity_id: &EntityId) -> String {
        let id = entity_id.to_string();
        if let Some(existing) = self.reverse.get(&id) {
            return existing.clone();
        }

        let prefix = entity_id.prefix().as_str().to_string();
        let next = self.next_ids.entry(prefix.clone()).or_insert(1);
        let short = format!("{}@{}", prefix, next);
        *next += 1;

        self.entries.insert(short.clone(), id.clone());
        self.reverse.insert(id, short.clone());
        short
    }

    /// Resolve a reference to a full entity id string
    ///
    /// `PREFIX@N` references are looked up in the index (prefix is
    /// case-insensitive); anything else is passed through for partial
    /// matching against file names.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        if let Some((prefix, num)) = reference.split_once('@') {
            if !prefix.is_empty() && num.chars().all(|c| c.is_ascii_digit()) {
                let key = format!("{}@{}", prefix.to_uppercase(), num);
                return self.entries.get(&key).cloned();
            }
        }
        Some(reference.to_string())
    }

    /// Prefixed short id for a full entity id (e.g., "CERT@1")
    pub fn get_short_id(&self, entity_id: &str) -> Option<String> {
        self.reverse.get(entity_id).cloned()
    }

    /// Number of aliases across all prefixes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use tempfile::TempDir;

    #[test]
    fn test_prefixed_short_ids_are_independent() {
        let mut index = ShortIdIndex::new();
        let cert1 = EntityId::new(EntityPrefix::Cert);
        let cert2 = EntityId::new(EntityPrefix::Cert);
        let tool1 = EntityId::new(EntityPrefix::Tool);

        assert_eq!(index.add(&cert1), "CERT@1");
        assert_eq!(index.add(&cert2), "CERT@2");
        assert_eq!(index.add(&tool1), "TOOL@1");

        assert_eq!(index.resolve("CERT@2"), Some(cert2.to_string()));
        assert_eq!(index.resolve("tool@1"), Some(tool1.to_string()));
        assert_eq!(index.resolve("CERT@9"), None);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut index = ShortIdIndex::new();
        let id = EntityId::new(EntityPrefix::Eqp);
        assert_eq!(index.add(&id), index.add(&id));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_passthrough_for_full_ids() {
        let index = ShortIdIndex::new();
        assert_eq!(index.resolve("CERT-01ABC"), Some("CERT-01ABC".to_string()));
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let project = Project::init(tmp.path(), false).unwrap();

        let mut index = ShortIdIndex::new();
        let id = EntityId::new(EntityPrefix::Cust);
        index.add(&id);
        index.save(&project).unwrap();

        let loaded = ShortIdIndex::load(&project);
        assert_eq!(loaded.get_short_id(&id.to_string()), Some("CUST@1".to_string()));
        assert_eq!(loaded.resolve("CUST@1"), Some(id.to_string()));
    }
}
