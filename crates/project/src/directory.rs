use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::dispatcher::EventDispatcher;
use crate::error::ProjectError;
use crate::kind::{join_path, split_path, FileKind};
use crate::node::{Entry, File, Node};
use crate::pattern::PathGlob;
use crate::store::{ContentStore, EntryType, UntitledRequest};

/// Store handle plus the transient-path registry, shared by every directory
/// reached from the same root.
pub(crate) struct TreeContext {
    store: Option<Rc<dyn ContentStore>>,
    transient: RefCell<HashSet<String>>,
}

impl TreeContext {
    fn new(store: Option<Rc<dyn ContentStore>>) -> Rc<Self> {
        Rc::new(Self {
            store,
            transient: RefCell::new(HashSet::new()),
        })
    }

    fn is_transient(&self, path: &str) -> bool {
        self.transient.borrow().contains(path)
    }

    fn set_transient(&self, path: &str, transient: bool) {
        let mut registry = self.transient.borrow_mut();
        if transient {
            registry.insert(path.to_string());
        } else {
            registry.remove(path);
        }
    }

    fn forget(&self, path: &str) {
        let prefix = format!("{path}/");
        self.transient
            .borrow_mut()
            .retain(|known| known != path && !known.starts_with(&prefix));
    }

    fn rename(&self, old_path: &str, new_path: &str) {
        let prefix = format!("{old_path}/");
        let mut registry = self.transient.borrow_mut();
        let moved: Vec<String> = registry
            .iter()
            .filter(|known| *known == old_path || known.starts_with(&prefix))
            .cloned()
            .collect();
        for known in moved {
            registry.remove(&known);
            registry.insert(format!("{new_path}{}", &known[old_path.len()..]));
        }
    }
}

struct DirectoryInner {
    entry: Entry,
    base: RefCell<String>,
    context: RefCell<Rc<TreeContext>>,
    is_open: Cell<bool>,
    on_did_change_children: EventDispatcher,
}

/// Directory node: a live, non-cached view of one directory of a content store.
/// 資料夾節點：內容儲存區中某個資料夾的即時（不快取）檢視。
///
/// Every read re-lists the store. Mutations go to the store first, then the
/// change notification bubbles from this directory up to the root.
#[derive(Clone)]
pub struct Directory {
    inner: Rc<DirectoryInner>,
}

impl Directory {
    /// Creates a detached directory with no store attached.
    /// 建立尚未加入樹且未連接儲存區的資料夾。
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::build(name.clone(), name, TreeContext::new(None))
    }

    /// Creates a directory bound to `store` at store path `base`.
    pub fn with_store(
        name: impl Into<String>,
        base: impl Into<String>,
        store: Rc<dyn ContentStore>,
    ) -> Self {
        Self::build(name.into(), base.into(), TreeContext::new(Some(store)))
    }

    /// Root of a store (empty name and base).
    pub fn root(store: Option<Rc<dyn ContentStore>>) -> Self {
        Self::build(String::new(), String::new(), TreeContext::new(store))
    }

    fn build(name: String, base: String, context: Rc<TreeContext>) -> Self {
        Self {
            inner: Rc::new(DirectoryInner {
                entry: Entry::new(name, FileKind::Directory),
                base: RefCell::new(base.trim_matches('/').to_string()),
                context: RefCell::new(context),
                is_open: Cell::new(true),
                on_did_change_children: EventDispatcher::new("Directory Changed"),
            }),
        }
    }

    pub(crate) fn entry(&self) -> &Entry {
        &self.inner.entry
    }

    fn context(&self) -> Rc<TreeContext> {
        self.inner.context.borrow().clone()
    }

    pub(crate) fn record_transient(&self, path: &str, transient: bool) {
        self.context().set_transient(path, transient);
    }

    pub fn name(&self) -> String {
        self.inner.entry.name()
    }

    pub fn kind(&self) -> FileKind {
        FileKind::Directory
    }

    /// Store path of this directory (`""` for the root).
    pub fn base(&self) -> String {
        self.inner.base.borrow().clone()
    }

    pub fn path(&self) -> String {
        self.base()
    }

    pub fn store(&self) -> Option<Rc<dyn ContentStore>> {
        self.context().store.clone()
    }

    pub fn parent(&self) -> Option<Directory> {
        self.inner.entry.parent()
    }

    pub fn is_transient(&self) -> bool {
        self.inner.entry.is_transient()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open.get()
    }

    pub fn set_open(&self, open: bool) {
        self.inner.is_open.set(open);
    }

    pub fn on_did_change_children(&self) -> &EventDispatcher {
        &self.inner.on_did_change_children
    }

    pub fn ptr_eq(&self, other: &Directory) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Dispatches the change event on this directory and every ancestor.
    /// 在此資料夾及所有上層資料夾觸發變更事件。
    pub fn notify_did_change_children(&self) {
        let mut current = Some(self.clone());
        while let Some(directory) = current {
            directory.inner.on_did_change_children.dispatch();
            current = directory.parent();
        }
    }

    /// Lists the directory from the store. Never cached; empty without a store.
    /// 自儲存區重新列舉子項（不快取）；未連接儲存區時回傳空集合。
    pub async fn children(&self) -> Result<Vec<Node>, ProjectError> {
        let context = self.context();
        let Some(store) = context.store.clone() else {
            return Ok(Vec::new());
        };
        let base = self.base();
        tracing::debug!(path = %base, "listing directory");
        let listing = store.get(&base).await.map_err(|err| {
            tracing::warn!(path = %base, error = %err, "directory listing failed");
            err
        })?;

        let children = listing
            .into_iter()
            .map(|item| {
                let path = join_path(&base, &item.name);
                let node = match item.entry_type {
                    EntryType::Directory => Node::Directory(Self::build(
                        item.name,
                        path.clone(),
                        context.clone(),
                    )),
                    EntryType::Notebook => {
                        Node::File(File::new(item.name, FileKind::JupyterNotebook))
                    }
                    EntryType::File => Node::File(File::named(item.name)),
                };
                node.entry().set_parent(self);
                node.entry().set_transient_flag(context.is_transient(&path));
                node
            })
            .collect();
        Ok(children)
    }

    pub async fn has_children(&self) -> Result<bool, ProjectError> {
        Ok(!self.children().await?.is_empty())
    }

    pub async fn get_immediate_child(&self, name: &str) -> Result<Option<Node>, ProjectError> {
        Ok(self
            .children()
            .await?
            .into_iter()
            .find(|child| child.name() == name))
    }

    /// Resolves a slash-delimited relative path; `None` when any segment is
    /// missing or an intermediate segment is a file.
    /// 解析以斜線分隔的相對路徑；任一段不存在或中間段為檔案時回傳 `None`。
    pub async fn get_file(&self, path: &str) -> Result<Option<Node>, ProjectError> {
        let segments = split_path(path);
        let Some((last, intermediate)) = segments.split_last() else {
            return Ok(None);
        };
        let mut directory = self.clone();
        for segment in intermediate {
            match directory.get_immediate_child(segment).await? {
                Some(Node::Directory(next)) => directory = next,
                _ => return Ok(None),
            }
        }
        directory.get_immediate_child(last).await
    }

    /// Picks a free name for `name` among the current children.
    /// 為 `name` 在目前子項中挑選未被使用的名稱。
    pub async fn handle_name_collision(
        &self,
        name: &str,
        is_directory: bool,
    ) -> Result<String, ProjectError> {
        let taken = child_names(&self.children().await?);
        resolve_collision(name, is_directory, &taken)
    }

    /// Adds a detached node, renaming it first if its name is taken.
    /// 加入尚未隸屬任何資料夾的節點；名稱衝突時先重新命名。
    ///
    /// File names that would list back as another kind get the kind's
    /// extension appended before the collision check.
    pub async fn add_file(&self, node: &Node) -> Result<(), ProjectError> {
        if node.parent().is_some() {
            tracing::error!(name = %node.name(), "add_file called on a node that already has a parent");
            return Err(ProjectError::AlreadyParented { name: node.name() });
        }

        if let Node::File(file) = node {
            let named = file.kind().name_with_extension(&file.name());
            if named != file.name() {
                tracing::debug!(from = %file.name(), to = %named, "appended kind extension");
                file.entry().set_name(named);
            }
        }

        let children = self.children().await?;
        let taken = child_names(&children);
        let requested = node.name();
        if taken.contains(&requested) {
            let resolved = resolve_collision(&requested, node.is_directory(), &taken)?;
            tracing::debug!(from = %requested, to = %resolved, "renamed to avoid collision");
            node.entry().set_name(resolved);
        }

        let name = node.name();
        let base = self.base();
        let target = join_path(&base, &name);
        if let Some(store) = self.store() {
            let kind = node.kind();
            let request = UntitledRequest::new(base.clone(), EntryType::for_kind(kind))
                .with_ext(kind.extension());
            let created = store.new_untitled(request).await?;
            if created.path != target {
                store.rename(&created.path, &target).await?;
            }
            tracing::debug!(path = %target, kind = %kind, "created entry");
        }

        if let Node::Directory(directory) = node {
            *directory.inner.base.borrow_mut() = target.clone();
            *directory.inner.context.borrow_mut() = self.context();
        }
        node.entry().set_parent(self);
        if node.is_transient() {
            self.record_transient(&target, true);
        }
        self.notify_did_change_children();
        Ok(())
    }

    /// Deletes a child from the store and detaches it.
    /// 自儲存區刪除子項並解除其隸屬關係。
    pub async fn remove_file(&self, node: &Node) -> Result<(), ProjectError> {
        self.require_child(node)?;
        let path = join_path(&self.base(), &node.name());
        if let Some(store) = self.store() {
            store.delete(&path).await?;
            tracing::debug!(path = %path, "deleted entry");
        }
        self.context().forget(&path);
        node.entry().clear_parent();
        self.notify_did_change_children();
        Ok(())
    }

    /// Renames a child in place; fails if a sibling already uses `new_name`.
    pub async fn rename_file(&self, node: &Node, new_name: &str) -> Result<(), ProjectError> {
        self.require_child(node)?;
        if new_name.is_empty() || new_name.contains('/') {
            return Err(ProjectError::InvalidPath {
                path: new_name.to_string(),
                reason: "names cannot contain `/`",
            });
        }
        let old_name = node.name();
        if old_name == new_name {
            return Ok(());
        }
        if self.get_immediate_child(new_name).await?.is_some() {
            return Err(ProjectError::NameTaken {
                name: new_name.to_string(),
                directory: self.base(),
            });
        }

        let base = self.base();
        let old_path = join_path(&base, &old_name);
        let new_path = join_path(&base, new_name);
        if let Some(store) = self.store() {
            store.rename(&old_path, &new_path).await?;
        }
        self.context().rename(&old_path, &new_path);
        node.entry().set_name(new_name);
        if let Node::Directory(directory) = node {
            *directory.inner.base.borrow_mut() = new_path;
        }
        self.notify_did_change_children();
        Ok(())
    }

    /// Walks (and creates where missing) each segment of `path`.
    /// 逐段走訪 `path`，缺少的資料夾會被建立。
    pub async fn new_directory(&self, path: &str) -> Result<Directory, ProjectError> {
        let mut directory = self.clone();
        for segment in split_path(path) {
            match directory.get_immediate_child(segment).await? {
                Some(Node::Directory(existing)) => directory = existing,
                Some(Node::File(file)) => {
                    return Err(ProjectError::NotADirectory { path: file.path() });
                }
                None => {
                    let created = Directory::new(segment);
                    directory.add_file(&Node::Directory(created.clone())).await?;
                    directory = created;
                }
            }
        }
        Ok(directory)
    }

    /// Creates (or returns the existing) file at `path`, creating parent
    /// directories on the way.
    ///
    /// With `handle_name_collision`, an existing entry never gets reused and
    /// the new file is renamed instead. The last segment is looked up with the
    /// kind's extension appended when it does not already imply `kind`.
    pub async fn new_file(
        &self,
        path: &str,
        kind: FileKind,
        is_transient: bool,
        handle_name_collision: bool,
    ) -> Result<File, ProjectError> {
        if kind.is_directory() {
            return Err(ProjectError::InvalidPath {
                path: path.to_string(),
                reason: "use new_directory for directories",
            });
        }
        let segments = split_path(path);
        let Some((name, parents)) = segments.split_last() else {
            return Err(ProjectError::InvalidPath {
                path: path.to_string(),
                reason: "empty file name",
            });
        };
        let directory = if parents.is_empty() {
            self.clone()
        } else {
            self.new_directory(&parents.join("/")).await?
        };

        let name = kind.name_with_extension(name);
        let existing = directory.get_immediate_child(&name).await?;
        let file = match existing {
            Some(node) if !handle_name_collision => {
                if node.kind() != kind {
                    return Err(ProjectError::KindMismatch {
                        path: node.path(),
                        expected: kind,
                        found: node.kind(),
                    });
                }
                match node.into_file() {
                    Some(file) => file,
                    None => {
                        return Err(ProjectError::KindMismatch {
                            path: path.to_string(),
                            expected: kind,
                            found: FileKind::Directory,
                        })
                    }
                }
            }
            _ => {
                let file = File::new(name, kind);
                directory.add_file(&Node::File(file.clone())).await?;
                file
            }
        };
        file.set_transient(is_transient);
        Ok(file)
    }

    /// Applies `callback` to each child; with `recurse`, descends depth-first
    /// into sub-directories and only reports files.
    /// 對每個子項套用 `callback`；`recurse` 時深度優先進入子資料夾並只回報檔案。
    ///
    /// The returned future settles once the whole walk is done.
    pub async fn for_each_file<F>(
        &self,
        mut callback: F,
        exclude_transient: bool,
        recurse: bool,
    ) -> Result<(), ProjectError>
    where
        F: FnMut(&Node),
    {
        self.walk(&mut callback, exclude_transient, recurse).await
    }

    fn walk<'a, F>(
        &'a self,
        callback: &'a mut F,
        exclude_transient: bool,
        recurse: bool,
    ) -> LocalBoxFuture<'a, Result<(), ProjectError>>
    where
        F: FnMut(&Node) + 'a,
    {
        async move {
            for child in self.children().await? {
                if exclude_transient && child.is_transient() {
                    continue;
                }
                match &child {
                    Node::Directory(directory) if recurse => {
                        directory
                            .walk(&mut *callback, exclude_transient, recurse)
                            .await?;
                    }
                    _ => callback(&child),
                }
            }
            Ok(())
        }
        .boxed_local()
    }

    pub async fn map_each_file<T, F>(
        &self,
        f: F,
        exclude_transient: bool,
    ) -> Result<Vec<T>, ProjectError>
    where
        F: FnMut(&Node) -> T,
    {
        Ok(self
            .children()
            .await?
            .iter()
            .filter(|child| !(exclude_transient && child.is_transient()))
            .map(f)
            .collect())
    }

    /// Relative paths of every file below this directory, depth-first in
    /// store order. Each listing is awaited before moving on.
    /// 依儲存區順序深度優先列出所有子孫檔案的相對路徑。
    pub async fn list(&self) -> Result<Vec<String>, ProjectError> {
        let mut paths = Vec::new();
        self.collect_paths(String::new(), &mut paths).await?;
        Ok(paths)
    }

    fn collect_paths<'a>(
        &'a self,
        prefix: String,
        out: &'a mut Vec<String>,
    ) -> LocalBoxFuture<'a, Result<(), ProjectError>> {
        async move {
            for child in self.children().await? {
                let path = join_path(&prefix, &child.name());
                match child {
                    Node::Directory(directory) => {
                        directory.collect_paths(path, &mut *out).await?;
                    }
                    Node::File(_) => out.push(path),
                }
            }
            Ok(())
        }
        .boxed_local()
    }

    /// `list()` filtered by a shell-style glob (`*`, `**`, `?`, `[...]`, `{a,b}`).
    pub async fn glob(&self, pattern: &str) -> Result<Vec<String>, ProjectError> {
        let glob = PathGlob::new(pattern)?;
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|path| glob.matches(path))
            .collect())
    }

    fn require_child(&self, node: &Node) -> Result<(), ProjectError> {
        match node.parent() {
            Some(parent) if parent.ptr_eq(self) => Ok(()),
            _ => {
                tracing::error!(
                    name = %node.name(),
                    directory = %self.base(),
                    "node is not a child of this directory"
                );
                Err(ProjectError::ParentMismatch {
                    name: node.name(),
                    directory: self.base(),
                })
            }
        }
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("name", &self.name())
            .field("base", &self.base())
            .field("has_store", &self.store().is_some())
            .field("is_open", &self.is_open())
            .finish()
    }
}

fn child_names(children: &[Node]) -> HashSet<String> {
    children.iter().map(Node::name).collect()
}

/// Tries `stem.N.ext` (files) or `nameN` (directories) for N = 2, 3, ...
/// The candidate count is bounded by `taken.len() + 1`.
pub(crate) fn resolve_collision(
    name: &str,
    is_directory: bool,
    taken: &HashSet<String>,
) -> Result<String, ProjectError> {
    let split = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !is_directory => Some((stem, ext)),
        _ => None,
    };
    for attempt in 1..=taken.len() + 1 {
        let suffix = attempt + 1;
        let candidate = match (is_directory, split) {
            (true, _) => format!("{name}{suffix}"),
            (false, Some((stem, ext))) => format!("{stem}.{suffix}.{ext}"),
            (false, None) => format!("{name}.{suffix}"),
        };
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
    }
    tracing::error!(name, "name collision not handled");
    Err(ProjectError::NameCollision {
        name: name.to_string(),
    })
}
