use std::cell::RefCell;
use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{ContentEntry, ContentStore, EntryType, StoreError, UntitledRequest};
use crate::kind::{file_name, join_path};

/// In-process content store keyed by path.
/// 以路徑為鍵的行程內內容儲存區。
///
/// Listings come back sorted by name. Untitled entries are named the way a
/// notebook server names them (`untitled.txt`, `untitled1.txt`, `Untitled
/// Folder 1`, ...).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, EntryType>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file entry, creating missing parent directories.
    pub fn insert_file(&self, path: &str) {
        let path = normalize(path);
        let entry_type = if path.ends_with(".ipynb") {
            EntryType::Notebook
        } else {
            EntryType::File
        };
        self.insert_parents(&path);
        self.entries.borrow_mut().insert(path, entry_type);
    }

    /// Seeds a directory entry, creating missing parent directories.
    pub fn insert_directory(&self, path: &str) {
        let path = normalize(path);
        if path.is_empty() {
            return;
        }
        self.insert_parents(&path);
        self.entries
            .borrow_mut()
            .insert(path, EntryType::Directory);
    }

    pub fn contains(&self, path: &str) -> bool {
        let path = normalize(path);
        path.is_empty() || self.entries.borrow().contains_key(&path)
    }

    pub fn entry_type(&self, path: &str) -> Option<EntryType> {
        let path = normalize(path);
        if path.is_empty() {
            return Some(EntryType::Directory);
        }
        self.entries.borrow().get(&path).copied()
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    fn insert_parents(&self, path: &str) {
        let mut entries = self.entries.borrow_mut();
        let mut current = parent_of(path);
        while !current.is_empty() {
            entries
                .entry(current.to_string())
                .or_insert(EntryType::Directory);
            current = parent_of(current);
        }
    }

    fn require_directory(&self, path: &str) -> Result<(), StoreError> {
        match self.entry_type(path) {
            Some(EntryType::Directory) => Ok(()),
            Some(_) => Err(StoreError::NotADirectory(path.to_string())),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn entry(&self, path: &str, entry_type: EntryType) -> ContentEntry {
        ContentEntry {
            name: file_name(path).to_string(),
            path: path.to_string(),
            entry_type,
        }
    }
}

#[async_trait(?Send)]
impl ContentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        let path = normalize(path);
        self.require_directory(&path)?;
        let entries = self.entries.borrow();
        Ok(entries
            .iter()
            .filter(|(key, _)| parent_of(key) == path)
            .map(|(key, entry_type)| self.entry(key, *entry_type))
            .collect())
    }

    async fn new_untitled(&self, request: UntitledRequest) -> Result<ContentEntry, StoreError> {
        let base = normalize(&request.path);
        self.require_directory(&base)?;
        let mut index = 0usize;
        let path = loop {
            let name = request.untitled_name(index);
            let candidate = join_path(&base, &name);
            if !self.contains(&candidate) {
                break candidate;
            }
            index += 1;
        };

        self.entries
            .borrow_mut()
            .insert(path.clone(), request.entry_type);
        Ok(self.entry(&path, request.entry_type))
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<ContentEntry, StoreError> {
        let old_path = normalize(old_path);
        let new_path = normalize(new_path);
        if old_path.is_empty() || new_path.is_empty() {
            return Err(StoreError::InvalidPath(String::new()));
        }
        let entry_type = self
            .entry_type(&old_path)
            .ok_or_else(|| StoreError::NotFound(old_path.clone()))?;
        if old_path == new_path {
            return Ok(self.entry(&new_path, entry_type));
        }
        if self.contains(&new_path) {
            return Err(StoreError::Conflict(new_path));
        }
        self.require_directory(parent_of(&new_path))?;

        let mut entries = self.entries.borrow_mut();
        let prefix = format!("{old_path}/");
        let moved: Vec<(String, EntryType)> = entries
            .iter()
            .filter(|(key, _)| **key == old_path || key.starts_with(&prefix))
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        for (key, value) in moved {
            entries.remove(&key);
            let renamed = format!("{new_path}{}", &key[old_path.len()..]);
            entries.insert(renamed, value);
        }
        drop(entries);

        let entry_type = match entry_type {
            EntryType::Directory => EntryType::Directory,
            _ if new_path.ends_with(".ipynb") => EntryType::Notebook,
            _ => EntryType::File,
        };
        self.entries
            .borrow_mut()
            .insert(new_path.clone(), entry_type);
        Ok(self.entry(&new_path, entry_type))
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let path = normalize(path);
        if path.is_empty() {
            return Err(StoreError::InvalidPath(path));
        }
        if !self.contains(&path) {
            return Err(StoreError::NotFound(path));
        }
        let prefix = format!("{path}/");
        self.entries
            .borrow_mut()
            .retain(|key, _| *key != path && !key.starts_with(&prefix));
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}
