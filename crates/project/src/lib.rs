//! Project tree, content stores and notebook glue for wastudio.
//! 管理 wastudio 專案樹、內容儲存區與筆記本整合的核心模組。

mod directory;
mod error;
mod node;
mod pattern;

pub mod config;
pub mod dispatcher;
pub mod kind;
pub mod project;
pub mod store;

pub use config::{ConfigError, ConfigStore, ServerSettings, StudioConfig};
pub use directory::Directory;
pub use dispatcher::{Callback, EventDispatcher};
pub use error::ProjectError;
pub use kind::FileKind;
pub use node::{File, Node};
pub use pattern::PathGlob;
pub use project::{
    NotebookHandle, NotebookHost, NotebookHostError, Project, StatusStack, IDLE_STATUS,
};
pub use store::{
    ContentEntry, ContentStore, EntryType, JupyterStore, LocalStore, MemoryStore, StoreError,
    UntitledRequest,
};
