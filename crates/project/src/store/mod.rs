//! Content-store abstraction backing the project tree.
//! 專案樹背後的內容儲存區抽象層。
//!
//! The tree never caches listings; every read goes through a [`ContentStore`].
//! Three stores ship with the crate: [`MemoryStore`] for in-process use,
//! [`LocalStore`] for a directory on disk and [`JupyterStore`] for a notebook
//! server's contents API.

use std::io;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::FileKind;

mod jupyter;
mod local;
mod memory;

pub use jupyter::JupyterStore;
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Entry type as reported by the notebook-server contents model.
/// 內容模型回報的項目類型。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Notebook,
    Directory,
}

impl EntryType {
    /// Store type used when creating an entry of the given kind.
    pub fn for_kind(kind: FileKind) -> Self {
        match kind {
            FileKind::Directory => EntryType::Directory,
            FileKind::JupyterNotebook => EntryType::Notebook,
            _ => EntryType::File,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Notebook => "notebook",
            EntryType::Directory => "directory",
        }
    }
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

/// Parameters for creating an untitled entry under `path`.
/// 在 `path` 下建立未命名項目的參數。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UntitledRequest {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
}

impl UntitledRequest {
    pub fn new(path: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            path: path.into(),
            entry_type,
            ext: None,
        }
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.ext = if ext.is_empty() { None } else { Some(ext) };
        self
    }

    /// Extension including the leading dot, or an empty string.
    pub(crate) fn dotted_ext(&self) -> String {
        match self.ext.as_deref() {
            Some(ext) if ext.starts_with('.') => ext.to_string(),
            Some(ext) => format!(".{ext}"),
            None if self.entry_type == EntryType::Notebook => ".ipynb".to_string(),
            None => String::new(),
        }
    }

    /// Name of the `index`-th untitled candidate, matching notebook-server naming.
    pub(crate) fn untitled_name(&self, index: usize) -> String {
        let ext = self.dotted_ext();
        match (self.entry_type, index) {
            (EntryType::Directory, 0) => "Untitled Folder".to_string(),
            (EntryType::Directory, n) => format!("Untitled Folder {n}"),
            (EntryType::Notebook, 0) => format!("Untitled{ext}"),
            (EntryType::Notebook, n) => format!("Untitled{n}{ext}"),
            (EntryType::File, 0) => format!("untitled{ext}"),
            (EntryType::File, n) => format!("untitled{n}{ext}"),
        }
    }
}

/// Errors surfaced by content stores. Propagated to callers unchanged.
/// 內容儲存區回報的錯誤，原樣傳遞給呼叫端。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("`{0}` already exists")]
    Conflict(String),
    #[error("invalid store path `{0}`")]
    InvalidPath(String),
    #[error("`{0}` is not a directory")]
    NotADirectory(String),
    #[error("content store IO error: {0}")]
    Io(#[from] io::Error),
    #[error("content store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid content store payload: {0}")]
    Decode(String),
}

/// Remote content store contract.
/// 遠端內容儲存區的介面。
///
/// Paths are slash-delimited and relative to the store root; `""` is the root.
#[async_trait(?Send)]
pub trait ContentStore {
    /// Lists the entries of the directory at `path`.
    async fn get(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError>;

    /// Creates a new untitled entry and returns its model.
    async fn new_untitled(&self, request: UntitledRequest) -> Result<ContentEntry, StoreError>;

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<ContentEntry, StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_type_uses_contents_model_names() {
        let entry: ContentEntry =
            serde_json::from_str(r#"{"name":"a.ipynb","path":"x/a.ipynb","type":"notebook"}"#)
                .unwrap();
        assert_eq!(entry.entry_type, EntryType::Notebook);
        assert_eq!(EntryType::for_kind(FileKind::Directory).as_str(), "directory");
    }

    #[test]
    fn untitled_request_serialises_without_empty_ext() {
        let request = UntitledRequest::new("src", EntryType::File).with_ext("");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"path": "src", "type": "file"}));

        let request = UntitledRequest::new("", EntryType::Notebook);
        assert_eq!(request.dotted_ext(), ".ipynb");
        let request = UntitledRequest::new("", EntryType::File).with_ext("rs");
        assert_eq!(request.dotted_ext(), ".rs");
    }
}
