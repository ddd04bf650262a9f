//! Named snapshots of pipeline results

use crate::pipeline::LayoutOutput;
use crate::LayoutError;
use std::collections::HashMap;
use tracing::debug;

/// Keeps [`LayoutOutput`]s under string ids so earlier layouts can be
/// restored later
#[derive(Debug, Clone, Default)]
pub struct StateStorage {
    states: HashMap<String, LayoutOutput>,
}

impl StateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// [`LayoutError::DuplicateState`] when `id` is already taken.
    pub fn save(&mut self, id: impl Into<String>, output: LayoutOutput) -> Result<(), LayoutError> {
        let id = id.into();
        if self.states.contains_key(&id) {
            return Err(LayoutError::DuplicateState(id));
        }
        debug!("Saved layout state {id}");
        self.states.insert(id, output);
        Ok(())
    }

    /// Store `output` under `id`, returning what was there before
    pub fn replace(&mut self, id: impl Into<String>, output: LayoutOutput) -> Option<LayoutOutput> {
        self.states.insert(id.into(), output)
    }

    pub fn load(&self, id: &str) -> Result<&LayoutOutput, LayoutError> {
        self.states
            .get(id)
            .ok_or_else(|| LayoutError::StateNotFound(id.to_string()))
    }

    pub fn remove(&mut self, id: &str) -> Result<LayoutOutput, LayoutError> {
        self.states
            .remove(id)
            .ok_or_else(|| LayoutError::StateNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    /// Stored ids in lexicographic order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.states.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Point, VertexId};
    use test_log::test;

    fn output(x: f64) -> LayoutOutput {
        LayoutOutput {
            positions: [(VertexId(1), Point::new(x, 0.0))].into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let mut storage = StateStorage::new();
        storage.save("first", output(1.0)).unwrap();
        storage.save("second", output(2.0)).unwrap();
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.load("second").unwrap(), &output(2.0));
        assert_eq!(storage.ids(), vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_id() {
        let mut storage = StateStorage::new();
        storage.save("a", output(1.0)).unwrap();
        let err = storage.save("a", output(2.0)).unwrap_err();
        assert_eq!(err, LayoutError::DuplicateState("a".into()));
        assert_eq!(err.kind(), ErrorKind::Consistency);
        assert_eq!(storage.load("a").unwrap(), &output(1.0));

        assert_eq!(storage.replace("a", output(3.0)), Some(output(1.0)));
        assert_eq!(storage.load("a").unwrap(), &output(3.0));
    }

    #[test]
    fn test_missing_state() {
        let mut storage = StateStorage::new();
        assert_eq!(
            storage.load("nope").unwrap_err().kind(),
            ErrorKind::ObjectNotFound
        );
        assert!(storage.remove("nope").is_err());

        storage.save("x", output(0.0)).unwrap();
        assert_eq!(storage.remove("x").unwrap(), output(0.0));
        assert!(!storage.contains("x"));
        assert!(storage.is_empty());
    }
}
