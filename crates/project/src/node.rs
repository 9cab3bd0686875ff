use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::directory::Directory;
use crate::kind::{join_path, FileKind};

/// State shared by every node: name, kind, transient flag and the
/// back-reference to the owning directory.
///
/// Directories never hold their children, so the parent link can be strong
/// without forming a cycle; it keeps the ancestor chain alive for bubbling.
pub(crate) struct Entry {
    name: RefCell<String>,
    kind: FileKind,
    transient: Cell<bool>,
    parent: RefCell<Option<Directory>>,
}

impl Entry {
    pub(crate) fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: RefCell::new(name.into()),
            kind,
            transient: Cell::new(false),
            parent: RefCell::new(None),
        }
    }

    pub(crate) fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub(crate) fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    pub(crate) fn kind(&self) -> FileKind {
        self.kind
    }

    pub(crate) fn is_transient(&self) -> bool {
        self.transient.get()
    }

    pub(crate) fn set_transient_flag(&self, transient: bool) {
        self.transient.set(transient);
    }

    pub(crate) fn parent(&self) -> Option<Directory> {
        self.parent.borrow().clone()
    }

    pub(crate) fn set_parent(&self, parent: &Directory) {
        *self.parent.borrow_mut() = Some(parent.clone());
    }

    pub(crate) fn clear_parent(&self) {
        *self.parent.borrow_mut() = None;
    }

    /// Store path: the parent's base joined with the name, or the bare name
    /// when detached.
    pub(crate) fn path(&self) -> String {
        let name = self.name();
        match self.parent() {
            Some(parent) => join_path(&parent.base(), &name),
            None => name,
        }
    }
}

/// Leaf node of the project tree.
/// 專案樹的葉節點（檔案）。
///
/// Handles are cheap clones sharing one node; a fresh listing produces fresh
/// nodes even for the same store path.
#[derive(Clone)]
pub struct File {
    entry: Rc<Entry>,
}

impl File {
    /// Creates a detached file node.
    /// 建立尚未加入資料夾的檔案節點。
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            entry: Rc::new(Entry::new(name, kind)),
        }
    }

    /// Detached file whose kind is derived from `name`.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = FileKind::from_name(&name);
        Self::new(name, kind)
    }

    pub fn name(&self) -> String {
        self.entry.name()
    }

    pub fn kind(&self) -> FileKind {
        self.entry.kind()
    }

    pub fn is_transient(&self) -> bool {
        self.entry.is_transient()
    }

    /// Flags the file as transient; attached files are also recorded with the
    /// tree so later listings report the flag.
    /// 標記為暫存檔；已加入資料夾的檔案會登記於樹中，之後的列舉亦會帶出此旗標。
    pub fn set_transient(&self, transient: bool) {
        self.entry.set_transient_flag(transient);
        if let Some(parent) = self.parent() {
            parent.record_transient(&self.entry.path(), transient);
        }
    }

    pub fn parent(&self) -> Option<Directory> {
        self.entry.parent()
    }

    pub fn path(&self) -> String {
        self.entry.path()
    }

    /// `true` when both handles refer to the same node instance.
    pub fn ptr_eq(&self, other: &File) -> bool {
        Rc::ptr_eq(&self.entry, &other.entry)
    }

    pub(crate) fn entry(&self) -> &Entry {
        &self.entry
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path())
            .field("kind", &self.kind())
            .field("transient", &self.is_transient())
            .finish()
    }
}

/// A node of the project tree: either a file or a directory.
/// 專案樹節點：檔案或資料夾。
#[derive(Clone, Debug)]
pub enum Node {
    File(File),
    Directory(Directory),
}

impl Node {
    pub fn name(&self) -> String {
        self.entry().name()
    }

    pub fn kind(&self) -> FileKind {
        self.entry().kind()
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn is_transient(&self) -> bool {
        self.entry().is_transient()
    }

    pub fn parent(&self) -> Option<Directory> {
        self.entry().parent()
    }

    pub fn path(&self) -> String {
        match self {
            Node::File(file) => file.path(),
            Node::Directory(directory) => directory.path(),
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Node::Directory(directory) => Some(directory),
            Node::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<File> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    pub fn into_directory(self) -> Option<Directory> {
        match self {
            Node::Directory(directory) => Some(directory),
            Node::File(_) => None,
        }
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::File(a), Node::File(b)) => a.ptr_eq(b),
            (Node::Directory(a), Node::Directory(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub(crate) fn entry(&self) -> &Entry {
        match self {
            Node::File(file) => file.entry(),
            Node::Directory(directory) => directory.entry(),
        }
    }
}

impl From<File> for Node {
    fn from(file: File) -> Self {
        Node::File(file)
    }
}

impl From<Directory> for Node {
    fn from(directory: Directory) -> Self {
        Node::Directory(directory)
    }
}
