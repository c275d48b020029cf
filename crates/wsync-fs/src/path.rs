//! Normalized path handling for cross-platform compatibility

use std::path::{Path, PathBuf};

/// A path normalized to use forward slashes internally.
///
/// Paths are cleaned lexically on construction: duplicate separators and
/// `.` segments are dropped and `..` segments are folded into their parent
/// where one exists. A relative path that climbs above its base keeps its
/// leading `..` segments, and the empty string denotes the base itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        Self { inner: clean(&raw) }
    }

    /// The empty relative path, i.e. the base directory itself.
    pub fn base() -> Self {
        Self::default()
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// True for the empty relative path.
    pub fn is_base(&self) -> bool {
        self.inner.is_empty()
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        if self.inner.is_empty() {
            return Self::new(segment);
        }
        Self::new(format!("{}/{}", self.inner, segment))
    }

    /// Get the parent directory.
    ///
    /// The parent of a single relative segment is the base path; the base
    /// path and `/` have no parent.
    pub fn parent(&self) -> Option<Self> {
        match self.inner.rfind('/') {
            Some(0) if self.inner.len() > 1 => Some(Self {
                inner: "/".to_string(),
            }),
            Some(0) => None,
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None if self.inner.is_empty() => None,
            None => Some(Self::base()),
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }

    /// Iterate over the path's segments.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|part| !part.is_empty())
    }

    /// Component-wise prefix test: `packages/a` is not a prefix of `packages/ab`.
    pub fn starts_with(&self, base: &NormalizedPath) -> bool {
        self.strip_prefix(base).is_some()
    }

    /// Remove `base` from the front of this path, component-wise.
    pub fn strip_prefix(&self, base: &NormalizedPath) -> Option<Self> {
        if base.inner.is_empty() {
            return Some(self.clone());
        }
        let rest = self.inner.strip_prefix(base.inner.as_str())?;
        if rest.is_empty() {
            return Some(Self::base());
        }
        if base.inner.ends_with('/') {
            return Some(Self::new(rest));
        }
        rest.strip_prefix('/').map(Self::new)
    }

    /// Express this path relative to `base`, inserting `..` as needed.
    ///
    /// Both paths must be relative to the same root (or both absolute).
    /// Returns `.` when the paths are equal.
    pub fn relative_to(&self, base: &NormalizedPath) -> Self {
        let target: Vec<&str> = self.components().collect();
        let from: Vec<&str> = base.components().collect();
        let common = target
            .iter()
            .zip(from.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = std::iter::repeat_n("..", from.len() - common).collect();
        parts.extend_from_slice(&target[common..]);
        if parts.is_empty() {
            return Self {
                inner: ".".to_string(),
            };
        }
        Self {
            inner: parts.join("/"),
        }
    }

    /// True when a relative path climbs above its base.
    pub fn escapes_base(&self) -> bool {
        self.inner == ".." || self.inner.starts_with("../")
    }

    /// True when any segment equals `name`.
    pub fn contains_component(&self, name: &str) -> bool {
        self.components().any(|part| part == name)
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }

    /// Resolve symlinks and make absolute, without UNC prefixes on Windows.
    pub fn canonicalize(&self) -> crate::Result<Self> {
        dunce::canonicalize(self.to_native())
            .map(Self::new)
            .map_err(|e| crate::Error::io(self.to_native(), e))
    }
}

fn clean(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}
