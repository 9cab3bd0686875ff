use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{ContentEntry, ContentStore, EntryType, StoreError, UntitledRequest};
use crate::kind::{file_name, join_path};

/// Content store backed by a directory on the local file system.
/// 以本機資料夾為後端的內容儲存區。
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a store path onto the disk, rejecting anything that leaves the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path.trim_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => resolved.push(segment),
                Component::CurDir => {}
                _ => return Err(StoreError::InvalidPath(path.to_string())),
            }
        }
        Ok(resolved)
    }

    async fn entry_type_at(disk_path: &Path) -> Result<Option<EntryType>, StoreError> {
        match fs::metadata(disk_path).await {
            Ok(metadata) if metadata.is_dir() => Ok(Some(EntryType::Directory)),
            Ok(_) => Ok(Some(file_entry_type(disk_path))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

fn file_entry_type(path: &Path) -> EntryType {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ipynb") => EntryType::Notebook,
        _ => EntryType::File,
    }
}

fn empty_notebook() -> Vec<u8> {
    let notebook = serde_json::json!({
        "cells": [],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    });
    serde_json::to_vec_pretty(&notebook).unwrap_or_default()
}

#[async_trait(?Send)]
impl ContentStore for LocalStore {
    async fn get(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        let base = path.trim_matches('/');
        let dir = self.resolve(base)?;
        match Self::entry_type_at(&dir).await? {
            Some(EntryType::Directory) => {}
            Some(_) => return Err(StoreError::NotADirectory(base.to_string())),
            None => return Err(StoreError::NotFound(base.to_string())),
        }

        let mut listing = Vec::new();
        let mut reader = fs::read_dir(&dir).await?;
        while let Some(item) = reader.next_entry().await? {
            let Ok(name) = item.file_name().into_string() else {
                tracing::warn!(dir = %dir.display(), "skipping non UTF-8 entry");
                continue;
            };
            let entry_type = if item.file_type().await?.is_dir() {
                EntryType::Directory
            } else {
                file_entry_type(&item.path())
            };
            listing.push(ContentEntry {
                path: join_path(base, &name),
                name,
                entry_type,
            });
        }
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn new_untitled(&self, request: UntitledRequest) -> Result<ContentEntry, StoreError> {
        let base = request.path.trim_matches('/').to_string();
        let dir = self.resolve(&base)?;
        if Self::entry_type_at(&dir).await? != Some(EntryType::Directory) {
            return Err(StoreError::NotFound(base));
        }

        let mut index = 0usize;
        let (path, disk_path) = loop {
            let candidate = join_path(&base, &request.untitled_name(index));
            let disk_path = self.resolve(&candidate)?;
            if Self::entry_type_at(&disk_path).await?.is_none() {
                break (candidate, disk_path);
            }
            index += 1;
        };

        match request.entry_type {
            EntryType::Directory => fs::create_dir(&disk_path).await?,
            EntryType::Notebook => fs::write(&disk_path, empty_notebook()).await?,
            EntryType::File => fs::write(&disk_path, b"").await?,
        }
        tracing::debug!(path = %path, "created untitled entry on disk");
        Ok(ContentEntry {
            name: file_name(&path).to_string(),
            path,
            entry_type: request.entry_type,
        })
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<ContentEntry, StoreError> {
        let old_path = old_path.trim_matches('/');
        let new_path = new_path.trim_matches('/');
        if old_path.is_empty() || new_path.is_empty() {
            return Err(StoreError::InvalidPath(String::new()));
        }
        let from = self.resolve(old_path)?;
        let to = self.resolve(new_path)?;
        if Self::entry_type_at(&from).await?.is_none() {
            return Err(StoreError::NotFound(old_path.to_string()));
        }
        if old_path != new_path && Self::entry_type_at(&to).await?.is_some() {
            return Err(StoreError::Conflict(new_path.to_string()));
        }
        fs::rename(&from, &to).await?;
        let entry_type = Self::entry_type_at(&to)
            .await?
            .ok_or_else(|| StoreError::NotFound(new_path.to_string()))?;
        Ok(ContentEntry {
            name: file_name(new_path).to_string(),
            path: new_path.to_string(),
            entry_type,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(StoreError::InvalidPath(String::new()));
        }
        let target = self.resolve(path)?;
        match Self::entry_type_at(&target).await? {
            Some(EntryType::Directory) => fs::remove_dir_all(&target).await?,
            Some(_) => fs::remove_file(&target).await?,
            None => return Err(StoreError::NotFound(path.to_string())),
        }
        Ok(())
    }
}
