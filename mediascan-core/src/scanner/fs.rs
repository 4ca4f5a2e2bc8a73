use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

/// Minimal, async-capable filesystem abstraction used by the walker.
///
/// Read-only: nothing in discovery mutates the filesystem.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Open a directory for iteration.
    async fn read_dir(&self, path: &Path) -> io::Result<Box<dyn ReadDirStream + Send>>;

    /// Fetch lightweight metadata for a path.
    async fn metadata(&self, path: &Path) -> io::Result<FsMetadata>;
}

/// Lightweight metadata needed by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsMetadata {
    pub is_dir: bool,
    pub is_file: bool,
    pub is_symlink: bool,
    pub len: u64,
}

impl From<std::fs::Metadata> for FsMetadata {
    fn from(md: std::fs::Metadata) -> Self {
        Self {
            is_dir: md.is_dir(),
            is_file: md.is_file(),
            is_symlink: md.file_type().is_symlink(),
            len: md.len(),
        }
    }
}

/// Async directory iterator (similar to tokio::fs::ReadDir).
#[async_trait]
pub trait ReadDirStream {
    /// Return next entry's path, or None when exhausted.
    async fn next_entry(&mut self) -> io::Result<Option<PathBuf>>;
}

/// Real filesystem implementation backed by tokio::fs.
#[derive(Debug, Clone)]
pub struct RealFs {
    follow_symlinks: bool,
}

impl RealFs {
    /// Link-following filesystem.
    pub fn new() -> Self {
        Self {
            follow_symlinks: true,
        }
    }

    /// With `false`, metadata describes the link itself so symlinked
    /// directories are never descended into.
    pub fn with_follow_symlinks(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }
}

impl Default for RealFs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystem for RealFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Box<dyn ReadDirStream + Send>> {
        let rd = tokio::fs::read_dir(path).await?;
        Ok(Box::new(RealReadDir { inner: rd }))
    }

    async fn metadata(&self, path: &Path) -> io::Result<FsMetadata> {
        let md = if self.follow_symlinks {
            tokio::fs::metadata(path).await?
        } else {
            tokio::fs::symlink_metadata(path).await?
        };
        Ok(md.into())
    }
}

struct RealReadDir {
    inner: tokio::fs::ReadDir,
}

#[async_trait]
impl ReadDirStream for RealReadDir {
    async fn next_entry(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(self.inner.next_entry().await?.map(|entry| entry.path()))
    }
}

/// In-memory filesystem for tests.
///
/// Paths are treated literally; callers should use consistent absolute
/// paths. Individual paths can be marked as denied to simulate permission
/// failures on both metadata and listing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFs {
    nodes: HashMap<PathBuf, Node>,
    denied_listing: HashSet<PathBuf>,
    denied_metadata: HashSet<PathBuf>,
    interrupted_listing: HashMap<PathBuf, usize>,
}

#[derive(Debug, Clone)]
enum Node {
    Dir { children: Vec<PathBuf> },
    File { len: u64 },
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if self.nodes.contains_key(&path) {
            return;
        }
        self.ensure_parent_link(&path);
        self.nodes.insert(
            path,
            Node::Dir {
                children: Vec::new(),
            },
        );
    }

    pub fn add_file<P: Into<PathBuf>>(&mut self, path: P, len: u64) {
        let path = path.into();
        self.ensure_parent_link(&path);
        self.nodes.insert(path, Node::File { len });
    }

    /// Make listing `path` fail with `PermissionDenied`; its metadata stays
    /// readable, like a directory with mode `0o311`.
    pub fn deny_listing<P: Into<PathBuf>>(&mut self, path: P) {
        self.denied_listing.insert(path.into());
    }

    /// Make querying metadata of `path` fail with `PermissionDenied`.
    pub fn deny_metadata<P: Into<PathBuf>>(&mut self, path: P) {
        self.denied_metadata.insert(path.into());
    }

    /// Make listing `path` yield its first `after` entries and then fail
    /// with an I/O error, like a directory on a flaky mount.
    pub fn interrupt_listing<P: Into<PathBuf>>(&mut self, path: P, after: usize) {
        self.interrupted_listing.insert(path.into(), after);
    }

    /// Number of regular files currently held.
    pub fn file_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node, Node::File { .. }))
            .count()
    }

    fn ensure_parent_link(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            if parent.as_os_str().is_empty() {
                return;
            }
            if !self.nodes.contains_key(parent) {
                self.nodes.insert(
                    parent.to_path_buf(),
                    Node::Dir {
                        children: Vec::new(),
                    },
                );
                self.ensure_parent_link(parent);
            }
            if let Some(Node::Dir { children }) = self.nodes.get_mut(parent)
                && !children.iter().any(|p| p.as_path() == path)
            {
                children.push(path.to_path_buf());
            }
        }
    }

    fn denied(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("permission denied: {}", path.display()),
        )
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Box<dyn ReadDirStream + Send>> {
        if self.denied_listing.contains(path) {
            return Err(Self::denied(path));
        }
        match self.nodes.get(path) {
            Some(Node::Dir { children }) => Ok(Box::new(InMemReadDir {
                queue: children.clone().into(),
                remaining: self.interrupted_listing.get(path).copied(),
            })),
            Some(Node::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("read_dir on file: {}", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("read_dir on missing path: {}", path.display()),
            )),
        }
    }

    async fn metadata(&self, path: &Path) -> io::Result<FsMetadata> {
        if self.denied_metadata.contains(path) {
            return Err(Self::denied(path));
        }
        match self.nodes.get(path) {
            Some(Node::Dir { .. }) => Ok(FsMetadata {
                is_dir: true,
                is_file: false,
                is_symlink: false,
                len: 0,
            }),
            Some(Node::File { len }) => Ok(FsMetadata {
                is_dir: false,
                is_file: true,
                is_symlink: false,
                len: *len,
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("metadata on missing path: {}", path.display()),
            )),
        }
    }
}

struct InMemReadDir {
    queue: VecDeque<PathBuf>,
    /// Entries left before the listing breaks, if it is set to break.
    remaining: Option<usize>,
}

#[async_trait]
impl ReadDirStream for InMemReadDir {
    async fn next_entry(&mut self) -> io::Result<Option<PathBuf>> {
        match self.remaining.as_mut() {
            Some(0) => Err(io::Error::other("listing interrupted")),
            Some(left) => {
                *left -= 1;
                Ok(self.queue.pop_front())
            }
            None => Ok(self.queue.pop_front()),
        }
    }
}
