//! Listing deduplication

use std::collections::HashSet;

/// Remembers which listings were already stored
///
/// Seeded with the keys found in the existing output and extended with
/// every record accepted during the run.
#[derive(Debug, Clone, Default)]
pub struct DuplicateChecker {
    seen: HashSet<String>,
}

impl DuplicateChecker {
    pub fn new(known: HashSet<String>) -> Self {
        Self { seen: known }
    }

    pub fn is_duplicate(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Remembers `key`; returns false if it was already known
    pub fn insert(&mut self, key: &str) -> bool {
        self.seen.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_keys_are_duplicates() {
        let checker = DuplicateChecker::new(["1001".to_string()].into_iter().collect());
        assert!(checker.is_duplicate("1001"));
        assert!(!checker.is_duplicate("1002"));
    }

    #[test]
    fn test_insert() {
        let mut checker = DuplicateChecker::default();
        assert!(checker.is_empty());
        assert!(checker.insert("1001"));
        assert!(!checker.insert("1001"));
        assert_eq!(checker.len(), 1);
    }
}
