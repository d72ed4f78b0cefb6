use super::constants::*;
use super::namespace::InodeTable;
use super::translator::Translator;
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use libc::{c_int, ENOENT};
use log::{debug, trace};
use std::ffi::OsStr;
use std::fs::{self, Metadata};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn system_time(secs: i64, nsecs: i64) -> SystemTime {
    if secs < 0 {
        return UNIX_EPOCH;
    }
    UNIX_EPOCH + Duration::new(secs as u64, nsecs as u32)
}

fn file_type(kind: fs::FileType) -> FileType {
    use std::os::unix::fs::FileTypeExt;

    if kind.is_dir() {
        FileType::Directory
    } else if kind.is_symlink() {
        FileType::Symlink
    } else if kind.is_fifo() {
        FileType::NamedPipe
    } else if kind.is_socket() {
        FileType::Socket
    } else if kind.is_char_device() {
        FileType::CharDevice
    } else if kind.is_block_device() {
        FileType::BlockDevice
    } else {
        FileType::RegularFile
    }
}

// Attributes of the backing entry, reported under our own inode number
fn file_attr(ino: u64, metadata: &Metadata) -> FileAttr {
    let mtime = system_time(metadata.mtime(), metadata.mtime_nsec());
    FileAttr {
        ino,
        size: metadata.size(),
        blocks: metadata.blocks(),
        atime: system_time(metadata.atime(), metadata.atime_nsec()),
        mtime,
        ctime: system_time(metadata.ctime(), metadata.ctime_nsec()),
        crtime: mtime,
        kind: file_type(metadata.file_type()),
        perm: (metadata.mode() & 0o7777) as u16,
        nlink: metadata.nlink() as u32,
        uid: metadata.uid(),
        gid: metadata.gid(),
        rdev: metadata.rdev() as u32,
        flags: 0,
        blksize: BLOCK_SIZE,
    }
}

fn resolve(time: TimeOrNow) -> SystemTime {
    match time {
        TimeOrNow::SpecificTime(t) => t,
        TimeOrNow::Now => SystemTime::now(),
    }
}

/// FUSE front end: turns inode requests into path operations.
pub struct TweetFs {
    translator: Arc<Translator>,
    inodes: InodeTable,
}

impl TweetFs {
    /// Creates the front end for `translator`
    pub fn new(translator: Arc<Translator>) -> Self {
        Self {
            translator,
            inodes: InodeTable::new(),
        }
    }

    fn path(&self, ino: u64) -> Result<PathBuf, c_int> {
        self.inodes.path(ino).map(Path::to_path_buf).ok_or(ENOENT)
    }

    fn child(&self, parent: u64, name: &OsStr) -> Result<PathBuf, c_int> {
        self.inodes.child_path(parent, name).ok_or(ENOENT)
    }

    fn attr(&mut self, path: &Path) -> Result<FileAttr, c_int> {
        let metadata = self.translator.getattr(path).map_err(|e| e as c_int)?;
        let ino = self.inodes.get_or_create(path);
        Ok(file_attr(ino, &metadata))
    }

    // Drops the inode once the backing entry is really gone; remote
    // no-ops leave it in place.
    fn forget_if_gone(&mut self, path: &Path) {
        if fs::symlink_metadata(self.translator.real(path)).is_err() {
            self.inodes.remove_path(path);
        }
    }

    fn setattr_path(
        &mut self,
        path: &Path,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        fh: Option<u64>,
    ) -> Result<FileAttr, c_int> {
        let t = &self.translator;
        if let Some(mode) = mode {
            t.chmod(path, mode).map_err(|e| e as c_int)?;
        }
        if uid.is_some() || gid.is_some() {
            t.chown(path, uid, gid).map_err(|e| e as c_int)?;
        }
        if let Some(size) = size {
            t.truncate(path, size, fh).map_err(|e| e as c_int)?;
        }
        if atime.is_some() || mtime.is_some() {
            t.utimens(path, atime.map(resolve), mtime.map(resolve))
                .map_err(|e| e as c_int)?;
        }
        self.attr(path)
    }
}

impl Filesystem for TweetFs {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        trace!("lookup(parent={}, name={:?})", parent, name);
        match self.child(parent, name).and_then(|path| self.attr(&path)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        trace!("getattr(ino={})", ino);
        match self.path(ino).and_then(|path| self.attr(&path)) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        trace!("setattr(ino={})", ino);
        let result = self
            .path(ino)
            .and_then(|path| self.setattr_path(&path, mode, uid, gid, size, atime, mtime, fh));
        match result {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        }
    }

    fn readlink(&mut self, _req: &Request, ino: u64, reply: ReplyData) {
        let result = self
            .path(ino)
            .and_then(|path| self.translator.readlink(&path).map_err(|e| e as c_int));
        match result {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(e) => reply.error(e),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        let result = self.child(parent, name).and_then(|path| {
            self.translator
                .mknod(&path, mode & !umask, rdev)
                .map_err(|e| e as c_int)?;
            self.attr(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        debug!("mkdir(parent={}, name={:?})", parent, name);
        // A refused follow leaves nothing behind, so the lookup below
        // reports ENOENT.
        let result = self.child(parent, name).and_then(|path| {
            self.translator
                .mkdir(&path, mode & !umask)
                .map_err(|e| e as c_int)?;
            self.attr(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("unlink(parent={}, name={:?})", parent, name);
        let result = self.child(parent, name).and_then(|path| {
            self.translator.unlink(&path).map_err(|e| e as c_int)?;
            self.forget_if_gone(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("rmdir(parent={}, name={:?})", parent, name);
        let result = self.child(parent, name).and_then(|path| {
            self.translator.rmdir(&path).map_err(|e| e as c_int)?;
            self.forget_if_gone(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let result = self.child(parent, link_name).and_then(|path| {
            self.translator
                .symlink(&path, target)
                .map_err(|e| e as c_int)?;
            self.attr(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let result = self.child(parent, name).and_then(|from| {
            let to = self.child(newparent, newname)?;
            self.translator.rename(&from, &to).map_err(|e| e as c_int)?;
            self.inodes.rename(&from, &to);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn link(
        &mut self,
        _req: &Request,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let result = self.path(ino).and_then(|existing| {
            let new = self.child(newparent, newname)?;
            self.translator
                .link(&existing, &new)
                .map_err(|e| e as c_int)?;
            self.attr(&new)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        trace!("open(ino={}, flags={:#x})", ino, flags);
        let result = self
            .path(ino)
            .and_then(|path| self.translator.open(&path, flags).map_err(|e| e as c_int));
        match result {
            Ok(fd) => reply.opened(fd as u64, 0),
            Err(e) => reply.error(e),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        trace!("read(ino={}, offset={}, size={})", ino, offset, size);
        match self.translator.read(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e as c_int),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        trace!("write(ino={}, offset={}, size={})", ino, offset, data.len());
        let result = self.path(ino).and_then(|path| {
            self.translator
                .write(&path, fh, offset, data)
                .map_err(|e| e as c_int)
        });
        match result {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e),
        }
    }

    fn flush(&mut self, _req: &Request, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        match self.translator.flush(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e as c_int),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.translator.release(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e as c_int),
        }
    }

    fn fsync(&mut self, _req: &Request, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        match self.translator.fsync(fh, datasync) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e as c_int),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        trace!("readdir(ino={}, offset={})", ino, offset);
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return reply.error(e),
        };
        let names = match self.translator.readdir(&path) {
            Ok(names) => names,
            Err(e) => return reply.error(e as c_int),
        };

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let (entry_ino, kind) = match name.as_bytes() {
                b"." => (ino, FileType::Directory),
                b".." => {
                    let parent = path.parent().unwrap_or(Path::new("/"));
                    (self.inodes.get_or_create(parent), FileType::Directory)
                }
                _ => {
                    let child = path.join(&name);
                    let kind = match fs::symlink_metadata(self.translator.real(&child)) {
                        Ok(metadata) => file_type(metadata.file_type()),
                        // Removed between listing and stat
                        Err(_) => continue,
                    };
                    (self.inodes.get_or_create(&child), kind)
                }
            };
            entries.push((entry_ino, kind, name));
        }

        for (i, (entry_ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            if reply.add(entry_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request, ino: u64, reply: ReplyStatfs) {
        let path = self.path(ino).unwrap_or_else(|_| PathBuf::from("/"));
        match self.translator.statfs(&path) {
            Ok(stat) => reply.statfs(
                stat.blocks() as u64,
                stat.blocks_free() as u64,
                stat.blocks_available() as u64,
                stat.files() as u64,
                stat.files_free() as u64,
                stat.block_size() as u32,
                stat.name_max() as u32,
                stat.fragment_size() as u32,
            ),
            Err(e) => reply.error(e as c_int),
        }
    }

    fn access(&mut self, _req: &Request, ino: u64, mask: i32, reply: ReplyEmpty) {
        let result = self
            .path(ino)
            .and_then(|path| self.translator.access(&path, mask).map_err(|e| e as c_int));
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        debug!("create(parent={}, name={:?})", parent, name);
        let result = self.child(parent, name).and_then(|path| {
            let fd = self
                .translator
                .create(&path, mode & !umask, flags)
                .map_err(|e| e as c_int)?;
            Ok((self.attr(&path)?, fd))
        });
        match result {
            Ok((attr, fd)) => reply.created(&TTL, &attr, 0, fd as u64, 0),
            Err(e) => reply.error(e),
        }
    }
}
