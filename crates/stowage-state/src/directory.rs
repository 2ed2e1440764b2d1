//! In-memory instance table.

use std::collections::HashMap;

use stowage_core::{InstanceKey, InstanceRecord};

/// All tracked instances, in insertion order, indexed by instance name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceDirectory {
    records: Vec<InstanceRecord>,
    index: HashMap<String, usize>,
    /// Persisted rows that could not be decoded, as raw key and value.
    undecoded: Vec<(String, Vec<u8>)>,
}

impl InstanceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from rows. A row whose instance name repeats an
    /// earlier one is dropped.
    pub fn from_records(records: impl IntoIterator<Item = InstanceRecord>) -> Self {
        let mut dir = Self::new();
        for record in records {
            dir.insert(record);
        }
        dir
    }

    /// Append a row unless its instance name is already present.
    /// Returns `true` if the row was added.
    pub fn insert(&mut self, record: InstanceRecord) -> bool {
        let name = record.instance_name();
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name, self.records.len());
        self.records.push(record);
        true
    }

    /// Append a zero-initialized row for every discovered key not yet
    /// tracked. Returns the number of rows added.
    pub fn merge(&mut self, discovered: impl IntoIterator<Item = InstanceKey>) -> usize {
        discovered
            .into_iter()
            .filter(|key| self.insert(InstanceRecord::new(key.clone())))
            .count()
    }

    /// Carry a row that failed to decode so it is written back unchanged.
    pub(crate) fn keep_undecoded(&mut self, key: String, raw: Vec<u8>) {
        self.undecoded.push((key, raw));
    }

    /// Raw rows carried through from the last load, skipping any whose key
    /// is now taken by a live record.
    pub(crate) fn undecoded(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.undecoded
            .iter()
            .filter(|(key, _)| !self.index.contains_key(key))
            .map(|(key, raw)| (key.as_str(), raw.as_slice()))
    }

    /// Keys of rows that could not be decoded.
    pub fn undecoded_keys(&self) -> impl Iterator<Item = &str> {
        self.undecoded.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    /// Rows are mutable in place; identity fields must not be changed.
    pub fn records_mut(&mut self) -> &mut [InstanceRecord] {
        &mut self.records
    }

    pub fn contains(&self, instance_name: &str) -> bool {
        self.index.contains_key(instance_name)
    }

    pub fn get(&self, instance_name: &str) -> Option<&InstanceRecord> {
        self.index.get(instance_name).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, instance_name: &str) -> Option<&mut InstanceRecord> {
        self.index.get(instance_name).map(|&i| &mut self.records[i])
    }

    /// Drop the named rows. Returns how many were removed.
    pub fn remove_all<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> usize {
        let doomed: Vec<usize> = names
            .into_iter()
            .filter_map(|name| self.index.get(name).copied())
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        let before = self.records.len();
        let mut position = 0;
        self.records.retain(|_| {
            let keep = !doomed.contains(&position);
            position += 1;
            keep
        });
        self.reindex();
        before - self.records.len()
    }

    /// Number of ghost rows.
    pub fn ghost_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_ghost()).count()
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.instance_name(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, name: &str, path: &str) -> InstanceKey {
        InstanceKey::new(id, name, path)
    }

    #[test]
    fn merge_appends_only_new_keys() {
        let mut dir = InstanceDirectory::new();
        let added = dir.merge([key("aaa", "web", "/"), key("bbb", "db", "/data")]);
        assert_eq!(added, 2);

        let added = dir.merge([key("aaa", "web", "/"), key("aaa", "web", "/etc")]);
        assert_eq!(added, 1);
        assert_eq!(dir.len(), 3);
        assert_eq!(dir.records()[2].path_backed, "/etc");
        assert!(dir.records().iter().all(|r| r.dt_last_backed.is_none()));
    }

    #[test]
    fn renamed_container_is_a_new_instance() {
        let mut dir = InstanceDirectory::new();
        dir.merge([key("aaa", "web", "/")]);
        assert_eq!(dir.merge([key("aaa", "web2", "/")]), 1);
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn lookup_by_instance_name() {
        let dir = InstanceDirectory::from_records([InstanceRecord::new(key("aaa", "web", "/"))]);
        assert!(dir.contains("aaa-web-%"));
        assert!(dir.get("aaa-web-%").is_some());
        assert!(dir.get("aaa-web-%etc").is_none());
    }

    #[test]
    fn from_records_drops_duplicate_names() {
        // "a/b" and "a:b" sanitize to the same instance name.
        let dir = InstanceDirectory::from_records([
            InstanceRecord::new(key("aaa", "a/b", "/")),
            InstanceRecord::new(key("aaa", "a:b", "/")),
        ]);
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.records()[0].container_name, "a/b");
    }

    #[test]
    fn remove_all_reindexes() {
        let mut dir = InstanceDirectory::new();
        dir.merge([key("a", "x", "/"), key("b", "y", "/"), key("c", "z", "/")]);

        assert_eq!(dir.remove_all(["a-x-%", "missing"]), 1);
        assert_eq!(dir.len(), 2);
        assert!(!dir.contains("a-x-%"));
        assert_eq!(dir.get("c-z-%").unwrap().container_id, "c");

        dir.get_mut("c-z-%").unwrap().size_last_backed = Some(9);
        assert_eq!(dir.records()[1].size_last_backed, Some(9));
    }
}
