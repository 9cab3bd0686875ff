use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic kind of a project entry, derived from its name.
/// 專案項目的語意類型，依檔名推導。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Directory,
    JavaScript,
    TypeScript,
    Html,
    Css,
    C,
    Cpp,
    Rust,
    Wat,
    Wasm,
    Markdown,
    Json,
    Toml,
    Dot,
    Log,
    JupyterNotebook,
    PlainText,
}

impl FileKind {
    /// Maps a file name to its kind using the last extension (case-insensitive).
    /// 依最後一個副檔名（不分大小寫）判斷檔案類型。
    pub fn from_name(name: &str) -> Self {
        let Some((stem, ext)) = name.rsplit_once('.') else {
            return FileKind::PlainText;
        };
        if stem.is_empty() {
            // Dotfiles such as `.gitignore` have no extension.
            return FileKind::PlainText;
        }
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" => FileKind::JavaScript,
            "ts" => FileKind::TypeScript,
            "html" | "htm" => FileKind::Html,
            "css" => FileKind::Css,
            "c" | "h" => FileKind::C,
            "cpp" | "cc" | "cxx" | "hpp" => FileKind::Cpp,
            "rs" => FileKind::Rust,
            "wat" | "wast" => FileKind::Wat,
            "wasm" => FileKind::Wasm,
            "md" | "markdown" => FileKind::Markdown,
            "json" => FileKind::Json,
            "toml" => FileKind::Toml,
            "dot" | "gv" => FileKind::Dot,
            "log" => FileKind::Log,
            "ipynb" => FileKind::JupyterNotebook,
            _ => FileKind::PlainText,
        }
    }

    /// Canonical extension (without the dot); empty for directories and plain text.
    /// 標準副檔名（不含句點）；資料夾與純文字為空字串。
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Directory | FileKind::PlainText => "",
            FileKind::JavaScript => "js",
            FileKind::TypeScript => "ts",
            FileKind::Html => "html",
            FileKind::Css => "css",
            FileKind::C => "c",
            FileKind::Cpp => "cpp",
            FileKind::Rust => "rs",
            FileKind::Wat => "wat",
            FileKind::Wasm => "wasm",
            FileKind::Markdown => "md",
            FileKind::Json => "json",
            FileKind::Toml => "toml",
            FileKind::Dot => "dot",
            FileKind::Log => "log",
            FileKind::JupyterNotebook => "ipynb",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FileKind::Directory => "Directory",
            FileKind::JavaScript => "JavaScript",
            FileKind::TypeScript => "TypeScript",
            FileKind::Html => "HTML",
            FileKind::Css => "CSS",
            FileKind::C => "C",
            FileKind::Cpp => "C++",
            FileKind::Rust => "Rust",
            FileKind::Wat => "WebAssembly Text",
            FileKind::Wasm => "WebAssembly",
            FileKind::Markdown => "Markdown",
            FileKind::Json => "JSON",
            FileKind::Toml => "TOML",
            FileKind::Dot => "DOT",
            FileKind::Log => "Log",
            FileKind::JupyterNotebook => "Jupyter Notebook",
            FileKind::PlainText => "Plain Text",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileKind::Directory => "inode/directory",
            FileKind::JavaScript => "application/javascript",
            FileKind::TypeScript => "application/typescript",
            FileKind::Html => "text/html",
            FileKind::Css => "text/css",
            FileKind::C => "text/x-csrc",
            FileKind::Cpp => "text/x-c++src",
            FileKind::Rust => "text/x-rustsrc",
            FileKind::Wat => "text/x-wat",
            FileKind::Wasm => "application/wasm",
            FileKind::Markdown => "text/markdown",
            FileKind::Json => "application/json",
            FileKind::Toml => "application/toml",
            FileKind::Dot => "text/vnd.graphviz",
            FileKind::Log => "text/x-log",
            FileKind::JupyterNotebook => "application/x-ipynb+json",
            FileKind::PlainText => "text/plain",
        }
    }

    pub fn is_directory(self) -> bool {
        matches!(self, FileKind::Directory)
    }

    /// `name` with this kind's extension appended unless [`FileKind::from_name`]
    /// already maps it to `self`, so a later listing reports the same kind.
    /// 若名稱推導出的類型不符，補上此類型的副檔名。
    pub fn name_with_extension(self, name: &str) -> String {
        if self.is_directory() || FileKind::from_name(name) == self {
            return name.to_string();
        }
        let ext = match self {
            FileKind::PlainText => "txt",
            other => other.extension(),
        };
        format!("{name}.{ext}")
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Joins a store base path and a child name (`""` base yields the bare name).
/// 組合內容儲存區的基底路徑與子項名稱。
pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

/// Splits a slash-delimited relative path, dropping empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Returns the final segment of a store path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_derived_from_last_extension() {
        assert_eq!(FileKind::from_name("main.rs"), FileKind::Rust);
        assert_eq!(FileKind::from_name("module.test.WAT"), FileKind::Wat);
        assert_eq!(FileKind::from_name("Analysis.ipynb"), FileKind::JupyterNotebook);
        assert_eq!(FileKind::from_name("README"), FileKind::PlainText);
        assert_eq!(FileKind::from_name(".gitignore"), FileKind::PlainText);
        assert_eq!(FileKind::from_name("archive.unknown"), FileKind::PlainText);
    }

    #[test]
    fn name_with_extension_keeps_matching_names() {
        assert_eq!(FileKind::Markdown.name_with_extension("notes"), "notes.md");
        assert_eq!(FileKind::Markdown.name_with_extension("notes.MD"), "notes.MD");
        assert_eq!(
            FileKind::JupyterNotebook.name_with_extension("analysis"),
            "analysis.ipynb"
        );
        assert_eq!(FileKind::PlainText.name_with_extension("README"), "README");
        assert_eq!(FileKind::PlainText.name_with_extension("lib.rs"), "lib.rs.txt");
        assert_eq!(FileKind::Directory.name_with_extension("src.rs"), "src.rs");
        for kind in [FileKind::Wat, FileKind::PlainText, FileKind::Json] {
            assert_eq!(FileKind::from_name(&kind.name_with_extension("x.c")), kind);
        }
    }

    #[test]
    fn extension_maps_back_to_same_kind() {
        for kind in [
            FileKind::JavaScript,
            FileKind::Rust,
            FileKind::Wasm,
            FileKind::JupyterNotebook,
            FileKind::Toml,
        ] {
            let name = format!("file.{}", kind.extension());
            assert_eq!(FileKind::from_name(&name), kind);
        }
        assert_eq!(FileKind::Directory.extension(), "");
    }

    #[test]
    fn path_helpers_handle_root_base() {
        assert_eq!(join_path("", "a.txt"), "a.txt");
        assert_eq!(join_path("src/", "lib.rs"), "src/lib.rs");
        assert_eq!(split_path("/sub//b.txt/"), vec!["sub", "b.txt"]);
        assert_eq!(file_name("sub/b.txt"), "b.txt");
        assert_eq!(file_name("b.txt"), "b.txt");
    }
}
