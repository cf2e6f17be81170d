//! The snapshot entry model.
//!
//! An `Entry` is the unit of snapshot comparison: one filesystem object and
//! the metadata the differ and the report need. Paths are carried as raw
//! bytes and are never required to be valid UTF-8. Entries are ordered by
//! raw-byte comparison of the path and nothing else; all other fields are
//! irrelevant to ordering.

use std::ffi::OsString;
use std::fs::Metadata;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

/// File type carried in the mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    /// Full mode bits, type included.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Byte length for regular files; zero for everything else.
    pub size: u64,
    /// Inode change time in seconds since the epoch. Zero for entries
    /// reconstructed from a filelist record.
    pub ctime: i64,
    pub dev: u64,
    pub ino: u64,
    pub link_target: Option<PathBuf>,
    /// Extended attribute names, captured only on request.
    pub xattrs: Vec<OsString>,
}

impl Entry {
    pub fn from_metadata(path: PathBuf, meta: &Metadata, link_target: Option<PathBuf>) -> Self {
        let size = if meta.file_type().is_file() {
            meta.size()
        } else {
            0
        };

        Entry {
            path,
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            size,
            ctime: meta.ctime(),
            dev: meta.dev(),
            ino: meta.ino(),
            link_target,
            xattrs: Vec::new(),
        }
    }

    /// Reconstruct an entry from a filelist record. Only the path, mode,
    /// device and inode are authoritative; the remaining fields default to
    /// zero and must not be compared as live metadata.
    pub fn from_record(path: PathBuf, mode: u32, dev: u64, ino: u64) -> Self {
        Entry {
            path,
            mode,
            uid: 0,
            gid: 0,
            size: 0,
            ctime: 0,
            dev,
            ino,
            link_target: None,
            xattrs: Vec::new(),
        }
    }

    pub fn path_bytes(&self) -> &[u8] {
        self.path.as_os_str().as_bytes()
    }

    pub fn kind(&self) -> EntryKind {
        match self.mode & libc::S_IFMT {
            libc::S_IFREG => EntryKind::Regular,
            libc::S_IFDIR => EntryKind::Directory,
            libc::S_IFLNK => EntryKind::Symlink,
            libc::S_IFBLK => EntryKind::BlockDevice,
            libc::S_IFCHR => EntryKind::CharDevice,
            libc::S_IFIFO => EntryKind::Fifo,
            libc::S_IFSOCK => EntryKind::Socket,
            _ => EntryKind::Unknown,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == EntryKind::Directory
    }
}

/// Lexically normalize a path: resolve `.` and `..` components and drop any
/// trailing separator. The filesystem is not consulted, so symlinked parents
/// are resolved the way the shell would resolve them.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
        }
    }
    out
}
