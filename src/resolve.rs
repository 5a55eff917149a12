//! Expansion of caller-supplied source patterns into concrete source ids.

use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use regex::Regex;
use walkdir::WalkDir;

use crate::{
    error::ScanError,
    observability::{log_debug, log_info},
    source::SourceProvider,
};

const GLOB_META: &[char] = &['*', '?', '['];

/// Whether `pattern` contains glob syntax.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_META)
}

/// Compiled glob matched against whole `/`-separated ids.
///
/// `*` and `?` stay within one segment, `**` spans any number of segments and
/// `[...]` / `[!...]` are character classes.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, ScanError> {
        let invalid = |reason: &str| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let mut translated = String::with_capacity(pattern.len() * 2 + 2);
        translated.push('^');
        let mut chars = pattern.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    // `**/` also matches zero directories
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        translated.push_str("(?:.*/)?");
                    } else {
                        translated.push_str(".*");
                    }
                }
                '*' => translated.push_str("[^/]*"),
                '?' => translated.push_str("[^/]"),
                '[' => {
                    translated.push('[');
                    match chars.peek() {
                        Some('!') | Some('^') => {
                            chars.next();
                            translated.push('^');
                        }
                        _ => {}
                    }
                    let mut closed = false;
                    for class_ch in chars.by_ref() {
                        if class_ch == ']' {
                            closed = true;
                            break;
                        }
                        if class_ch == '\\' {
                            translated.push('\\');
                        }
                        translated.push(class_ch);
                    }
                    if !closed {
                        return Err(invalid("unterminated character class"));
                    }
                    translated.push(']');
                }
                other => translated.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        translated.push('$');

        let regex = Regex::new(&translated).map_err(|err| invalid(&err.to_string()))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    fn recursive(&self) -> bool {
        self.pattern.contains("**")
    }

    /// Longest leading run of segments free of glob syntax, and how many
    /// pattern segments it consumed.
    fn literal_prefix(&self) -> (PathBuf, usize) {
        let mut prefix = PathBuf::new();
        let segments: Vec<&str> = self.pattern.split('/').collect();
        let mut consumed = 0;
        // last segment names files, never a directory to start from
        for (idx, segment) in segments.iter().enumerate() {
            if idx + 1 == segments.len() || is_glob(segment) {
                break;
            }
            if segment.is_empty() && idx == 0 {
                prefix.push("/");
            } else {
                prefix.push(segment);
            }
            consumed += 1;
        }
        (prefix, consumed)
    }

    fn segments(&self) -> usize {
        self.pattern.split('/').count()
    }
}

/// Expands one pattern against the local filesystem.
///
/// Literal paths expand to themselves when they exist. Glob matches are
/// returned in lexicographic order.
pub fn expand_path(pattern: &str) -> Result<Vec<String>, ScanError> {
    if !is_glob(pattern) {
        return Ok(if Path::new(pattern).exists() {
            vec![pattern.to_string()]
        } else {
            Vec::new()
        });
    }

    let glob = GlobPattern::new(pattern)?;
    let (root, consumed) = glob.literal_prefix();
    let relative = root.as_os_str().is_empty();
    let start = if relative { PathBuf::from(".") } else { root };
    if !start.is_dir() {
        return Ok(Vec::new());
    }
    let max_depth = if glob.recursive() {
        usize::MAX
    } else {
        glob.segments() - consumed
    };

    let mut matches = Vec::new();
    let walker = WalkDir::new(&start)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|err| ScanError::source_read(pattern, io::Error::from(err)))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let path = if relative {
            entry.path().strip_prefix(".").unwrap_or(entry.path())
        } else {
            entry.path()
        };
        if let Some(path) = path.to_str().filter(|path| glob.matches(path)) {
            matches.push(path.to_string());
        }
    }
    matches.sort();
    Ok(matches)
}

/// Expands every pattern through `provider`, keeping pattern order and the
/// first occurrence of each id.
pub fn resolve_sources(
    provider: &dyn SourceProvider,
    patterns: &[String],
) -> Result<Vec<String>, ScanError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for pattern in patterns {
        let expanded = provider.expand(pattern)?;
        log_debug!(
            component = "resolve",
            event = "pattern_expanded",
            pattern = %pattern,
            matches = expanded.len(),
        );
        for id in expanded {
            if seen.insert(id.clone()) {
                resolved.push(id);
            }
        }
    }
    if resolved.is_empty() {
        return Err(ScanError::NoMatchingSources {
            patterns: patterns.to_vec(),
        });
    }
    log_info!(
        component = "resolve",
        event = "sources_resolved",
        patterns = patterns.len(),
        sources = resolved.len(),
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};

    use super::*;

    #[test]
    fn glob_translation() {
        let glob = GlobPattern::new("data/part-*.parquet").unwrap();
        assert!(glob.matches("data/part-0.parquet"));
        assert!(glob.matches("data/part-.parquet"));
        assert!(!glob.matches("data/nested/part-0.parquet"));
        assert!(!glob.matches("data/part-0.parquet.tmp"));

        let glob = GlobPattern::new("data/**/*.parquet").unwrap();
        assert!(glob.matches("data/a.parquet"));
        assert!(glob.matches("data/x/y/a.parquet"));

        let glob = GlobPattern::new("f?le[0-9].[!c]sv").unwrap();
        assert!(glob.matches("file1.tsv"));
        assert!(!glob.matches("file1.csv"));
        assert!(!glob.matches("fi/e1.tsv"));

        let glob = GlobPattern::new("a.b+c(1)*").unwrap();
        assert!(glob.matches("a.b+c(1)x"));
        assert!(!glob.matches("aXb+c(1)"));
    }

    #[test]
    fn unterminated_class_is_rejected() {
        let err = GlobPattern::new("part[0-9.parquet").unwrap_err();
        assert!(matches!(err, ScanError::InvalidPattern { .. }));
    }

    #[test]
    fn expands_filesystem_globs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap().to_string();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        for name in ["b.parquet", "a.parquet", "c.txt", "nested/d.parquet"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let flat = expand_path(&format!("{root}/*.parquet")).unwrap();
        assert_eq!(
            flat,
            vec![format!("{root}/a.parquet"), format!("{root}/b.parquet")]
        );

        let deep = expand_path(&format!("{root}/**/*.parquet")).unwrap();
        assert_eq!(
            deep,
            vec![
                format!("{root}/a.parquet"),
                format!("{root}/b.parquet"),
                format!("{root}/nested/d.parquet"),
            ]
        );

        let literal = expand_path(&format!("{root}/c.txt")).unwrap();
        assert_eq!(literal, vec![format!("{root}/c.txt")]);
        assert!(expand_path(&format!("{root}/missing.parquet"))
            .unwrap()
            .is_empty());
        assert!(expand_path(&format!("{root}/nope/*.parquet"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn wildcard_directories_stop_at_pattern_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap().to_string();
        for name in ["2024-01/a.parquet", "2024-02/b.parquet", "2024-02/deep/c.parquet"] {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            File::create(path).unwrap();
        }
        File::create(dir.path().join("top.parquet")).unwrap();

        let months = expand_path(&format!("{root}/2024-*/*.parquet")).unwrap();
        assert_eq!(
            months,
            vec![
                format!("{root}/2024-01/a.parquet"),
                format!("{root}/2024-02/b.parquet"),
            ]
        );
    }
}
