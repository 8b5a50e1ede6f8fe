use std::collections::HashSet;
use std::fs;
use std::path::Path;
use subwatch_core::{CoreError, StateError};
use tracing::{info, warn};

/// Identifiers already processed, persisted across restarts. Ids are never
/// removed within the process lifetime; the dirty flag tracks additions not
/// yet flushed to disk.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
    dirty: bool,
}

impl SeenSet {
    /// Loads prior state, or persists a fresh empty set when no state file
    /// exists yet. Any other read or parse failure is fatal: without prior
    /// state, every old item would be re-notified.
    pub fn load_or_init(path: &Path) -> Result<Self, CoreError> {
        match fs::read(path) {
            Ok(bytes) => {
                let ids: HashSet<String> = serde_json::from_slice(&bytes).map_err(|e| {
                    CoreError::State(StateError::Corrupt {
                        path: path.display().to_string(),
                        details: e.to_string(),
                    })
                })?;
                info!("Loaded {} seen ids from {}", ids.len(), path.display());
                Ok(Self { ids, dirty: false })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("State file not found, starting with an empty seen set");
                let set = Self::default();
                set.save(path)?;
                Ok(set)
            }
            Err(e) => Err(CoreError::State(StateError::Unreadable {
                path: path.display().to_string(),
                source: e,
            })),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn add(&mut self, id: String) {
        if self.ids.insert(id) {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Writes the set if it has unsaved additions. The dirty flag is only
    /// cleared on a successful write, so a failed save is retried at the
    /// end of the next cycle.
    pub fn save_if_dirty(&mut self, path: &Path) -> Result<(), CoreError> {
        if !self.dirty {
            return Ok(());
        }
        self.save(path)?;
        self.dirty = false;
        info!("Saved {} seen ids to {}", self.ids.len(), path.display());
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(&self.ids)?;
        fs::write(path, bytes).map_err(|e| {
            CoreError::State(StateError::WriteFailed {
                path: path.display().to_string(),
                source: e,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subwatch_core::StateError;

    #[test]
    fn test_first_run_creates_empty_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_items.json");

        let seen = SeenSet::load_or_init(&path).unwrap();
        assert!(seen.is_empty());
        assert!(!seen.is_dirty());

        // The file is established immediately so a later save failure is a
        // write problem, not a missing-file ambiguity.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "[]");
    }

    #[test]
    fn test_add_marks_dirty_only_on_new_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_items.json");
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        seen.add("abc".to_string());
        assert!(seen.is_dirty());
        assert!(seen.contains("abc"));

        seen.save_if_dirty(&path).unwrap();
        assert!(!seen.is_dirty());

        // Re-adding a known id does not dirty the set again.
        seen.add("abc".to_string());
        assert!(!seen.is_dirty());
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_items.json");

        let mut seen = SeenSet::load_or_init(&path).unwrap();
        seen.add("abc".to_string());
        seen.add("xyz".to_string());
        seen.save_if_dirty(&path).unwrap();

        let reloaded = SeenSet::load_or_init(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("abc"));
        assert!(reloaded.contains("xyz"));
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_save_without_additions_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_items.json");
        let mut seen = SeenSet::load_or_init(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        seen.save_if_dirty(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_state_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_items.json");
        std::fs::write(&path, "not json").unwrap();

        let err = SeenSet::load_or_init(&path).unwrap_err();
        assert!(matches!(
            err,
            CoreError::State(StateError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_failed_save_keeps_dirty_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_items.json");
        let mut seen = SeenSet::load_or_init(&path).unwrap();
        seen.add("abc".to_string());

        let missing_dir = dir.path().join("missing").join("seen_items.json");
        let err = seen.save_if_dirty(&missing_dir).unwrap_err();
        assert!(matches!(
            err,
            CoreError::State(StateError::WriteFailed { .. })
        ));
        assert!(seen.is_dirty());

        // The original path still works on the retry.
        seen.save_if_dirty(&path).unwrap();
        assert!(!seen.is_dirty());
    }
}
