// PathResolver maps user-supplied paths onto disk and onto index keys.
//
// The layout on disk is:
//
//	<root>
//	└── <user id>
//	    └── <the user's own tree>
//
// A key (`RelPath`) is the path below `<root>/<user id>`, segments joined by
// a single `/`. It never starts or ends with `/`, never contains `\`, `.` or
// `..`, and the user root itself is the empty key.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    pub fn root() -> Self {
        RelPath(String::new())
    }

    /// Canonicalizes a user-supplied path.
    ///
    /// Both `/` and `\` separate segments. Empty and `.` segments vanish, and
    /// `..` pops the previous segment; a `..` with nothing left to pop is
    /// dropped, which clamps the result inside the user root.
    pub fn parse(raw: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        tracing::debug!(raw, "dropping traversal segment above user root");
                    }
                }
                s => segments.push(s),
            }
        }
        RelPath(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment; empty for the root.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn parent(&self) -> Option<RelPath> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rsplit_once('/') {
            Some((parent, _)) => RelPath(parent.to_string()),
            None => RelPath::root(),
        })
    }

    /// Appends one segment. `name` must not contain separators.
    pub fn join(&self, name: &str) -> RelPath {
        if self.is_root() {
            RelPath(name.to_string())
        } else {
            RelPath(format!("{}/{name}", self.0))
        }
    }

    /// Proper ancestors below the root, outermost first: `a/b/c` yields `a`, `a/b`.
    pub fn ancestors(&self) -> Vec<RelPath> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            if path.is_root() {
                break;
            }
            current = path.parent();
            ancestors.push(path);
        }
        ancestors.reverse();
        ancestors
    }

    /// True when `self` equals `base` or lies below it.
    pub fn starts_with(&self, base: &RelPath) -> bool {
        base.is_root()
            || self.0 == base.0
            || (self.0.starts_with(&base.0) && self.0.as_bytes()[base.0.len()] == b'/')
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user path in both of its forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub disk: PathBuf,
    pub key: RelPath,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PathResolver { root: root.into() }
    }

    pub fn user_root(&self, owner: &Uuid) -> PathBuf {
        self.root.join(owner.to_string())
    }

    pub fn locate(&self, owner: &Uuid, key: &RelPath) -> PathBuf {
        let mut path = self.user_root(owner);
        path.extend(key.segments());
        path
    }

    pub fn resolve(&self, owner: &Uuid, raw: &str) -> ResolvedPath {
        let key = RelPath::parse(raw);
        ResolvedPath {
            disk: self.locate(owner, &key),
            key,
        }
    }
}
