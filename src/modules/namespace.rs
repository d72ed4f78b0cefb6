use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use super::constants::*;

/// Who an account directory (and the posts inside it) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// The configured local account
    Local,
    /// A followed account
    Friend,
}

/// Position of a mount-relative path in the two-level namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location<'a> {
    /// The mount root itself
    Root,
    /// A directory directly under the root
    Account {
        /// Directory name
        handle: &'a str,
        /// Local user or friend
        owner: Owner,
    },
    /// A file inside an account directory
    Post {
        /// Name of the enclosing account directory
        handle: &'a str,
        /// File name, a post id for synchronized entries
        name: &'a str,
        /// Owner of the enclosing directory
        owner: Owner,
    },
    /// Anything deeper, or a name that is not valid UTF-8
    Other,
}

/// Classifies paths against the local handle.
#[derive(Debug, Clone)]
pub struct Namespace {
    local_handle: String,
}

impl Namespace {
    /// Creates a namespace for the local account `local_handle`
    pub fn new(local_handle: impl Into<String>) -> Self {
        Self {
            local_handle: local_handle.into(),
        }
    }

    /// Handle of the local account
    pub fn local_handle(&self) -> &str {
        &self.local_handle
    }

    /// Owner of the directory named `handle`
    pub fn owner_of(&self, handle: &str) -> Owner {
        if handle == self.local_handle {
            Owner::Local
        } else {
            Owner::Friend
        }
    }

    /// Locates `path` by depth and by comparing the first component with
    /// the local handle.
    pub fn locate<'a>(&self, path: &'a Path) -> Location<'a> {
        let mut names = Vec::with_capacity(2);
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir => continue,
                Component::Normal(name) => match name.to_str() {
                    Some(name) => names.push(name),
                    None => return Location::Other,
                },
                Component::ParentDir | Component::Prefix(_) => return Location::Other,
            }
        }

        match *names.as_slice() {
            [] => Location::Root,
            [handle] => Location::Account {
                handle,
                owner: self.owner_of(handle),
            },
            [handle, name] => Location::Post {
                handle,
                name,
                owner: self.owner_of(handle),
            },
            _ => Location::Other,
        }
    }
}

/// Bidirectional inode ↔ mount-relative path mapping.
///
/// Inodes are handed out monotonically and never reused; like the mirror
/// itself the table only grows, apart from entries dropped on removal.
#[derive(Debug)]
pub struct InodeTable {
    path_to_inode: HashMap<PathBuf, u64>,
    inode_to_path: HashMap<u64, PathBuf>,
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Creates a table with the root pre-registered
    pub fn new() -> Self {
        let mut table = Self {
            path_to_inode: HashMap::new(),
            inode_to_path: HashMap::new(),
            next_inode: INITIAL_INODE,
        };
        table.path_to_inode.insert(PathBuf::from("/"), ROOT_INODE);
        table.inode_to_path.insert(ROOT_INODE, PathBuf::from("/"));
        table
    }

    /// Path registered for `inode`
    pub fn path(&self, inode: u64) -> Option<&Path> {
        self.inode_to_path.get(&inode).map(PathBuf::as_path)
    }

    /// Path of `name` inside the directory `parent`
    pub fn child_path(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
        self.path(parent).map(|p| p.join(name))
    }

    /// Inode for `path`, allocating one on first sight
    pub fn get_or_create(&mut self, path: &Path) -> u64 {
        if let Some(&inode) = self.path_to_inode.get(path) {
            return inode;
        }
        let inode = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(path.to_path_buf(), inode);
        self.inode_to_path.insert(inode, path.to_path_buf());
        inode
    }

    /// Forgets `path`
    pub fn remove_path(&mut self, path: &Path) -> Option<u64> {
        let inode = self.path_to_inode.remove(path)?;
        self.inode_to_path.remove(&inode);
        Some(inode)
    }

    /// Moves `from` and everything below it to `to`.
    ///
    /// Whatever `to` pointed at before is dropped.
    pub fn rename(&mut self, from: &Path, to: &Path) {
        self.remove_path(to);
        let moved: Vec<(PathBuf, u64)> = self
            .path_to_inode
            .iter()
            .filter(|(path, _)| path.starts_with(from))
            .map(|(path, inode)| (path.clone(), *inode))
            .collect();

        for (old, inode) in moved {
            let new = match old.strip_prefix(from) {
                Ok(rest) if rest.as_os_str().is_empty() => to.to_path_buf(),
                Ok(rest) => to.join(rest),
                Err(_) => continue,
            };
            self.path_to_inode.remove(&old);
            self.path_to_inode.insert(new.clone(), inode);
            self.inode_to_path.insert(inode, new);
        }
    }

    /// Number of registered paths, root included
    pub fn len(&self) -> usize {
        self.path_to_inode.len()
    }

    /// Whether only the root is registered
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}
