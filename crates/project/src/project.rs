use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use thiserror::Error;

use crate::directory::Directory;
use crate::dispatcher::EventDispatcher;
use crate::error::ProjectError;
use crate::store::ContentStore;

/// Bottom entry of every status stack; never popped.
pub const IDLE_STATUS: &str = "Idle";

/// Always-non-empty stack of busy labels.
/// 永不為空的忙碌狀態堆疊。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusStack {
    labels: Vec<String>,
}

impl Default for StatusStack {
    fn default() -> Self {
        Self {
            labels: vec![IDLE_STATUS.to_string()],
        }
    }
}

impl StatusStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>) {
        self.labels.push(label.into());
    }

    /// Pops the top label; the idle sentinel cannot be popped.
    pub fn pop(&mut self) -> Result<String, ProjectError> {
        if self.labels.len() <= 1 {
            return Err(ProjectError::StatusUnderflow);
        }
        self.labels.pop().ok_or(ProjectError::StatusUnderflow)
    }

    /// `true` when something other than the sentinel is on the stack.
    pub fn has_status(&self) -> bool {
        self.labels.len() > 1
    }

    /// Top label, or `""` when only the sentinel remains.
    pub fn current(&self) -> &str {
        if self.has_status() {
            self.labels.last().map(String::as_str).unwrap_or_default()
        } else {
            ""
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Opaque handle to a notebook widget owned by a [`NotebookHost`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotebookHandle {
    id: u64,
    path: String,
}

impl NotebookHandle {
    pub fn new(id: u64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct NotebookHostError(pub String);

/// Document-manager capability used to show notebooks. Hosts keep their own
/// registry of open documents and kernel sessions.
/// 開啟筆記本所需的文件管理能力；已開啟文件與核心工作階段由宿主自行管理。
pub trait NotebookHost {
    fn open_or_reveal(&self, path: &str) -> Result<NotebookHandle, NotebookHostError>;
}

/// A workspace session: the root directory, the status stack and the
/// notebook host.
/// 工作區工作階段：根資料夾、狀態堆疊與筆記本宿主。
pub struct Project {
    root: Directory,
    status: RefCell<StatusStack>,
    on_did_change_status: EventDispatcher,
    notebook_host: Option<Rc<dyn NotebookHost>>,
}

impl Project {
    pub fn new(store: Option<Rc<dyn ContentStore>>) -> Self {
        Self {
            root: Directory::root(store),
            status: RefCell::new(StatusStack::new()),
            on_did_change_status: EventDispatcher::new("Status Change"),
            notebook_host: None,
        }
    }

    pub fn with_notebook_host(mut self, host: Rc<dyn NotebookHost>) -> Self {
        self.notebook_host = Some(host);
        self
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Fires whenever anything below the root changes.
    pub fn on_did_change(&self) -> &EventDispatcher {
        self.root.on_did_change_children()
    }

    pub fn on_did_change_status(&self) -> &EventDispatcher {
        &self.on_did_change_status
    }

    pub fn push_status(&self, label: impl Into<String>) {
        let label = label.into();
        tracing::debug!(status = %label, "push status");
        self.status.borrow_mut().push(label);
        self.on_did_change_status.dispatch();
    }

    pub fn pop_status(&self) -> Result<String, ProjectError> {
        let popped = self.status.borrow_mut().pop();
        match popped {
            Ok(label) => {
                tracing::debug!(status = %label, "pop status");
                self.on_did_change_status.dispatch();
                Ok(label)
            }
            Err(err) => {
                tracing::error!("pop_status called with only the idle sentinel left");
                Err(err)
            }
        }
    }

    pub fn has_status(&self) -> bool {
        self.status.borrow().has_status()
    }

    pub fn get_status(&self) -> String {
        self.status.borrow().current().to_string()
    }

    pub fn status_depth(&self) -> usize {
        self.status.borrow().len()
    }

    /// Runs `work` with `label` pushed on the status stack.
    /// 執行 `work` 期間將 `label` 推入狀態堆疊。
    pub async fn with_status<T, F>(&self, label: impl Into<String>, work: F) -> T
    where
        F: Future<Output = T>,
    {
        self.push_status(label);
        let output = work.await;
        if let Err(err) = self.pop_status() {
            tracing::warn!(error = %err, "status stack was unwound during with_status");
        }
        output
    }

    /// Asks the notebook host to open (or focus) the notebook at `path`.
    pub fn open_notebook(&self, path: &str) -> Result<NotebookHandle, ProjectError> {
        let host = self
            .notebook_host
            .as_ref()
            .ok_or(ProjectError::NoNotebookHost)?;
        host.open_or_reveal(path)
            .map_err(|err| ProjectError::Notebook {
                path: path.to_string(),
                message: err.0,
            })
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("status", &*self.status.borrow())
            .field("has_notebook_host", &self.notebook_host.is_some())
            .finish()
    }
}
