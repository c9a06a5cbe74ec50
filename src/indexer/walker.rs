use std::io;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use ignore::gitignore::Gitignore;
use ignore::{Match, WalkBuilder};

use crate::error::{IndexerError, Result};

pub const PHP_EXTENSION: &str = "php";

/// `.ignore` and `.gitignore` files met while scanning one root. Each keeps
/// its own directory as the base its patterns are relative to.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    /// Deepest directory first; `.ignore` before `.gitignore` within one.
    matchers: Vec<Gitignore>,
}

impl IgnoreRules {
    pub fn add_dir(&mut self, dir: &Path) {
        let depth = dir.components().count();
        for name in [".ignore", ".gitignore"] {
            let file = dir.join(name);
            if !file.is_file() {
                continue;
            }
            let (matcher, err) = Gitignore::new(&file);
            if let Some(e) = err {
                tracing::warn!("Partially read {}: {}", file.display(), e);
            }
            if matcher.is_empty() {
                continue;
            }
            let at = self
                .matchers
                .partition_point(|m| m.path().components().count() >= depth);
            self.matchers.insert(at, matcher);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// The innermost ignore file with an opinion on `path` decides.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        for matcher in &self.matchers {
            if !path.starts_with(matcher.path()) {
                continue;
            }
            match matcher.matched_path_or_any_parents(path, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }
}

/// Decides which paths under a root are indexable: `.php` files outside
/// hidden directories whose root-relative path matches none of the ignore
/// globs nor the root's ignore files.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Pattern>,
    rules: IgnoreRules,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|g| Pattern::new(g.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            rules: IgnoreRules::default(),
        })
    }

    /// This filter narrowed to one root's ignore files.
    pub fn with_rules(mut self, rules: IgnoreRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn is_php(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case(PHP_EXTENSION))
            .unwrap_or(false)
    }

    pub fn is_hidden(relative: &Path) -> bool {
        relative.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    }

    pub fn is_ignored(&self, relative: &Path) -> bool {
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|p| p.matches(&relative))
    }

    pub fn accepts(&self, root: &Path, path: &Path) -> bool {
        if !Self::is_php(path) {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        !Self::is_hidden(relative)
            && !self.is_ignored(relative)
            && !self.rules.is_ignored(path, false)
    }
}

/// Files found under one root plus the ignore files that shaped the walk.
#[derive(Debug, Default)]
pub struct RootScan {
    pub files: Vec<PathBuf>,
    pub rules: IgnoreRules,
}

pub struct FileWalker {
    filter: PathFilter,
}

impl FileWalker {
    pub fn new(filter: PathFilter) -> Self {
        Self { filter }
    }

    /// Every indexable file under `root`, sorted.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        Ok(self.scan(root)?.files)
    }

    /// Like `walk`, also returning the ignore rules of every directory
    /// visited so a watcher on `root` can filter the same way.
    pub fn scan(&self, root: &Path) -> Result<RootScan> {
        if !root.is_dir() {
            return Err(IndexerError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            )));
        }

        let mut scan = RootScan::default();

        // Only ignore files inside the root count, git repository or not.
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .parents(false)
            .ignore(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(false)
            .require_git(false)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_dir()) {
                scan.rules.add_dir(path);
            } else if path.is_file() && self.filter.accepts(root, path) {
                scan.files.push(path.to_path_buf());
            }
        }

        scan.files.sort();
        tracing::debug!("Found {} PHP files under {}", scan.files.len(), root.display());
        Ok(scan)
    }
}
