//! Shell-style path matching for project listings.
//!
//! `glob::Pattern` covers `*`, `**`, `?` and `[...]`; brace alternatives
//! (`{a,b}`) are expanded up front into one pattern per alternative.

use glob::{MatchOptions, Pattern};

use crate::error::ProjectError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Compiled glob used by [`Directory::glob`](crate::Directory::glob).
#[derive(Debug, Clone)]
pub struct PathGlob {
    source: String,
    patterns: Vec<Pattern>,
}

impl PathGlob {
    pub fn new(pattern: &str) -> Result<Self, ProjectError> {
        let expanded = expand_braces(pattern).ok_or_else(|| ProjectError::InvalidPattern {
            pattern: pattern.to_string(),
            message: format!("expands to more than {MAX_EXPANSIONS} patterns"),
        })?;
        let patterns = expanded
            .iter()
            .map(|expanded| Pattern::new(expanded))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ProjectError::InvalidPattern {
                pattern: pattern.to_string(),
                message: err.msg.to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            patterns,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(path, MATCH_OPTIONS))
    }
}

/// Upper bound on the patterns a single glob may expand into.
const MAX_EXPANSIONS: usize = 256;

/// Expands every `{...}` group; `None` past [`MAX_EXPANSIONS`] results.
/// Groups without a comma and unbalanced braces stay literal.
fn expand_braces(pattern: &str) -> Option<Vec<String>> {
    let mut expanded = Vec::new();
    expand_into(String::new(), pattern, &mut expanded).then_some(expanded)
}

fn expand_into(done: String, rest: &str, out: &mut Vec<String>) -> bool {
    let Some((open, close)) = find_brace_group(rest) else {
        if out.len() >= MAX_EXPANSIONS {
            return false;
        }
        out.push(done + rest);
        return true;
    };
    let alternatives = split_alternatives(&rest[open + 1..close]);
    if alternatives.len() < 2 {
        return expand_into(done + &rest[..=close], &rest[close + 1..], out);
    }
    let prefix = &rest[..open];
    let suffix = &rest[close + 1..];
    alternatives
        .into_iter()
        .all(|alternative| expand_into(done.clone(), &format!("{prefix}{alternative}{suffix}"), out))
}

fn find_brace_group(pattern: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut open = None;
    let mut in_class = false;
    let mut escaped = false;
    for (index, ch) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '{' if !in_class => {
                if depth == 0 {
                    open = Some(index);
                }
                depth += 1;
            }
            '}' if !in_class && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return open.map(|start| (start, index));
                }
            }
            _ => {}
        }
    }
    None
}

fn split_alternatives(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in inner.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_does_not_cross_separators() {
        let glob = PathGlob::new("sub/*.txt").unwrap();
        assert!(glob.matches("sub/b.txt"));
        assert!(!glob.matches("sub/deeper/b.txt"));
        assert!(!glob.matches("a.txt"));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let glob = PathGlob::new("**/*.rs").unwrap();
        assert!(glob.matches("lib.rs"));
        assert!(glob.matches("src/bin/main.rs"));
        assert!(!glob.matches("src/main.c"));
    }

    #[test]
    fn braces_and_classes_expand() {
        let glob = PathGlob::new("src/{main,lib}.{rs,wat}").unwrap();
        assert!(glob.matches("src/main.rs"));
        assert!(glob.matches("src/lib.wat"));
        assert!(!glob.matches("src/mod.rs"));

        let class = PathGlob::new("sub/[bc]?.txt").unwrap();
        assert!(class.matches("sub/b1.txt"));
        assert!(!class.matches("sub/a1.txt"));
    }

    #[test]
    fn nested_and_literal_braces() {
        assert_eq!(
            expand_braces("a{b,c{d,e}}f").unwrap(),
            vec!["abf", "acdf", "acef"]
        );
        assert_eq!(expand_braces("x{y}z").unwrap(), vec!["x{y}z"]);
        assert_eq!(expand_braces("open{only").unwrap(), vec!["open{only"]);
    }

    #[test]
    fn leading_dot_must_be_literal() {
        let glob = PathGlob::new("*").unwrap();
        assert!(!glob.matches(".hidden"));
        assert!(PathGlob::new(".*").unwrap().matches(".hidden"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = PathGlob::new("a/***").unwrap_err();
        assert!(matches!(err, ProjectError::InvalidPattern { .. }));
    }

    #[test]
    fn runaway_brace_expansion_is_rejected() {
        let eight = "{a,b}".repeat(8);
        assert_eq!(expand_braces(&eight).unwrap().len(), 256);
        assert!(PathGlob::new(&eight).is_ok());

        let err = PathGlob::new(&"{a,b}".repeat(25)).unwrap_err();
        assert!(matches!(err, ProjectError::InvalidPattern { .. }));
    }
}
