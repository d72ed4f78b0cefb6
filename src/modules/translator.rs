//! Filesystem operations on mount-relative paths.
//!
//! Structural calls (mkdir, rmdir, unlink) go to the remote service first
//! and are mirrored locally only when the service agrees. Writes publish a
//! post or send a direct message, then land in the backing file whatever
//! the service said. Everything else is a plain primitive on the mirror.
//!
//! Remote failures never become errno values here: they are logged and the
//! operation degrades to "no remote effect". Errors a caller does see come
//! from the backing filesystem or from placing something where the
//! namespace does not allow it (`EACCES`).

use super::config::{ChmodPolicy, Config};
use super::guard::DescriptorGuard;
use super::mirror::Mirror;
use super::namespace::{Location, Namespace, Owner};
use super::remote::{succeeded, PostId, RemoteError, SocialClient};
use log::{debug, info, trace, warn};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::{self, Mode, SFlag, UtimensatFlags};
use nix::sys::statvfs::{self, Statvfs};
use nix::sys::time::TimeSpec;
use nix::unistd::{self, AccessFlags, Gid, Uid};
use std::ffi::OsString;
use std::fs::{self, DirBuilder, Metadata, Permissions};
use std::io::{self, ErrorKind};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maps an I/O error onto the errno handed back to the caller.
pub fn errno(e: io::Error) -> Errno {
    match e.raw_os_error() {
        Some(code) => Errno::from_i32(code),
        None if e.kind() == ErrorKind::InvalidInput => Errno::EINVAL,
        None if e.kind() == ErrorKind::NotFound => Errno::ENOENT,
        None => Errno::EIO,
    }
}

/// Text sent to the service for a written chunk.
///
/// One trailing line terminator is dropped; the store adds it back when
/// the post is mirrored.
fn outgoing_text(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

fn timespec(time: Option<SystemTime>) -> TimeSpec {
    match time {
        Some(t) => {
            let since = t.duration_since(UNIX_EPOCH).unwrap_or_default();
            TimeSpec::new(since.as_secs() as libc::time_t, since.subsec_nanos() as _)
        }
        None => TimeSpec::new(0, libc::UTIME_OMIT as _),
    }
}

/// The operation handler set.
pub struct Translator {
    mirror: Mirror,
    client: Arc<dyn SocialClient>,
    namespace: Namespace,
    guard: DescriptorGuard,
    chmod: ChmodPolicy,
}

impl Translator {
    /// Creates a translator over `mirror`, talking to `client`.
    pub fn new(mirror: Mirror, client: Arc<dyn SocialClient>, config: &Config) -> Self {
        Self {
            mirror,
            client,
            namespace: Namespace::new(config.handle.clone()),
            guard: DescriptorGuard::new(),
            chmod: config.chmod,
        }
    }

    /// The backing store.
    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Path classification used by every operation.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Backing path for a mount-relative path.
    pub fn real(&self, path: &Path) -> PathBuf {
        self.mirror
            .root()
            .join(path.strip_prefix("/").unwrap_or(path))
    }

    /// Metadata of the backing entry, symlinks not followed.
    pub fn getattr(&self, path: &Path) -> nix::Result<Metadata> {
        fs::symlink_metadata(self.real(path)).map_err(errno)
    }

    /// Entry names of a directory, `.` and `..` first.
    ///
    /// Served from the mirror as it stands; listing never triggers a sync.
    pub fn readdir(&self, path: &Path) -> nix::Result<Vec<OsString>> {
        let mut names = vec![OsString::from("."), OsString::from("..")];
        for entry in fs::read_dir(self.real(path)).map_err(errno)? {
            names.push(entry.map_err(errno)?.file_name());
        }
        Ok(names)
    }

    /// Follows the account named by the new directory.
    ///
    /// When the service refuses, nothing is created and the call still
    /// succeeds; the caller notices the directory is missing on lookup.
    pub fn mkdir(&self, path: &Path, mode: u32) -> nix::Result<()> {
        match self.namespace.locate(path) {
            Location::Account {
                handle,
                owner: Owner::Local,
            } => self.create_account_dir(handle, mode),
            Location::Account {
                handle,
                owner: Owner::Friend,
            } => {
                if !succeeded(&format!("follow {}", handle), self.client.follow(handle)) {
                    return Ok(());
                }
                info!("now following {}", handle);
                self.create_account_dir(handle, mode)
            }
            _ => {
                warn!("mkdir {}: only account directories can be created", path.display());
                Err(Errno::EACCES)
            }
        }
    }

    /// Unfollows the account named by the directory.
    pub fn rmdir(&self, path: &Path) -> nix::Result<()> {
        match self.namespace.locate(path) {
            Location::Account {
                owner: Owner::Local,
                ..
            } => {
                warn!("rmdir {}: refusing to remove the local account", path.display());
                Err(Errno::EACCES)
            }
            Location::Account {
                handle,
                owner: Owner::Friend,
            } => self.unfollow(handle),
            _ => fs::remove_dir(self.real(path)).map_err(errno),
        }
    }

    /// Removes an entry.
    ///
    /// Own posts are deleted remotely first (the local file goes away
    /// whatever the outcome), friends' posts only locally.
    pub fn unlink(&self, path: &Path) -> nix::Result<()> {
        let real = self.real(path);
        match self.namespace.locate(path) {
            Location::Account { handle, owner } if real.is_dir() => match owner {
                Owner::Friend => self.unfollow(handle),
                Owner::Local => Err(Errno::EACCES),
            },
            Location::Post {
                name,
                owner: Owner::Local,
                ..
            } => {
                if let Ok(id) = name.parse::<PostId>() {
                    if succeeded(&format!("delete post {}", id), self.client.delete_post(id)) {
                        info!("deleted post {}", id);
                    }
                }
                fs::remove_file(real).map_err(errno)
            }
            _ => fs::remove_file(real).map_err(errno),
        }
    }

    /// Creates and opens a file. Only the local user's directory accepts
    /// new files.
    pub fn create(&self, path: &Path, mode: u32, flags: i32) -> nix::Result<RawFd> {
        match self.namespace.locate(path) {
            Location::Post {
                owner: Owner::Local,
                ..
            } => fcntl::open(
                self.real(path).as_path(),
                OFlag::from_bits_truncate(flags) | OFlag::O_CREAT,
                Mode::from_bits_truncate(mode as libc::mode_t),
            ),
            _ => {
                warn!("create {}: new files are only allowed in the local account", path.display());
                Err(Errno::EACCES)
            }
        }
    }

    /// Opens the backing file; the descriptor doubles as the file handle.
    pub fn open(&self, path: &Path, flags: i32) -> nix::Result<RawFd> {
        fcntl::open(
            self.real(path).as_path(),
            OFlag::from_bits_truncate(flags),
            Mode::empty(),
        )
    }

    /// Reads up to `size` bytes at `offset`.
    pub fn read(&self, fh: u64, offset: i64, size: u32) -> nix::Result<Vec<u8>> {
        self.guard.read_at(fh as RawFd, offset, size as usize)
    }

    /// Forwards `data` to the service according to where `path` lives, then
    /// writes it to the open file at `offset`.
    ///
    /// The remote step always happens before the local write, under the
    /// same guard.
    pub fn write(&self, path: &Path, fh: u64, offset: i64, data: &[u8]) -> nix::Result<usize> {
        let location = self.namespace.locate(path);
        self.guard
            .write_at(fh as RawFd, offset, data, || self.forward(location, data))
    }

    fn forward(&self, location: Location<'_>, data: &[u8]) {
        let (owner, handle) = match location {
            Location::Post { owner, handle, .. } => (owner, handle),
            _ => return,
        };
        let text = match std::str::from_utf8(data) {
            Ok(text) => outgoing_text(text),
            Err(_) => {
                warn!("message cannot be encoded, perhaps it contains non-UTF-8 bytes; not sending");
                return;
            }
        };
        if text.is_empty() {
            debug!("nothing to send for an empty write");
            return;
        }

        match owner {
            Owner::Local => match self.client.publish(text) {
                Ok(id) => info!("published post {}", id),
                Err(RemoteError::Encoding) => {
                    warn!("message cannot be encoded for the service; not published")
                }
                Err(e) => warn!("publish failed: {}", e),
            },
            Owner::Friend => {
                if succeeded(
                    &format!("direct message to {}", handle),
                    self.client.send_direct_message(handle, text),
                ) {
                    info!("sent direct message to {}", handle);
                }
            }
        }
    }

    /// Closes the handle.
    pub fn release(&self, fh: u64) -> nix::Result<()> {
        unistd::close(fh as RawFd)
    }

    /// Flushes the handle to disk.
    pub fn flush(&self, fh: u64) -> nix::Result<()> {
        unistd::fsync(fh as RawFd)
    }

    /// Syncs data, and metadata unless `datasync` is set.
    pub fn fsync(&self, fh: u64, datasync: bool) -> nix::Result<()> {
        if datasync {
            unistd::fdatasync(fh as RawFd)
        } else {
            unistd::fsync(fh as RawFd)
        }
    }

    /// Renames within the mirror. No remote effect.
    pub fn rename(&self, from: &Path, to: &Path) -> nix::Result<()> {
        fs::rename(self.real(from), self.real(to)).map_err(errno)
    }

    /// Truncates through the open handle when there is one, by path otherwise.
    pub fn truncate(&self, path: &Path, length: u64, fh: Option<u64>) -> nix::Result<()> {
        match fh {
            Some(fh) => unistd::ftruncate(fh as RawFd, length as libc::off_t),
            None => unistd::truncate(self.real(path).as_path(), length as libc::off_t),
        }
    }

    /// Hard-links `existing` as `new`.
    pub fn link(&self, existing: &Path, new: &Path) -> nix::Result<()> {
        fs::hard_link(self.real(existing), self.real(new)).map_err(errno)
    }

    /// Creates `link` pointing at `target`.
    pub fn symlink(&self, link: &Path, target: &Path) -> nix::Result<()> {
        std::os::unix::fs::symlink(target, self.real(link)).map_err(errno)
    }

    /// Target of a symlink.
    pub fn readlink(&self, path: &Path) -> nix::Result<PathBuf> {
        fs::read_link(self.real(path)).map_err(errno)
    }

    /// Capacity of the filesystem holding the mirror.
    pub fn statfs(&self, path: &Path) -> nix::Result<Statvfs> {
        statvfs::statvfs(self.real(path).as_path())
    }

    /// Checks `mask` against the backing entry.
    pub fn access(&self, path: &Path, mask: i32) -> nix::Result<()> {
        unistd::access(self.real(path).as_path(), AccessFlags::from_bits_truncate(mask))
    }

    /// Changes owner and group; `None` leaves one unchanged.
    pub fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> nix::Result<()> {
        unistd::chown(
            self.real(path).as_path(),
            uid.map(Uid::from_raw),
            gid.map(Gid::from_raw),
        )
    }

    /// Changes the mode bits, unless configured to ignore mode changes.
    pub fn chmod(&self, path: &Path, mode: u32) -> nix::Result<()> {
        match self.chmod {
            ChmodPolicy::Passthrough => {
                fs::set_permissions(self.real(path), Permissions::from_mode(mode)).map_err(errno)
            }
            ChmodPolicy::Ignore => {
                debug!("chmod {:o} on {} ignored", mode, path.display());
                Ok(())
            }
        }
    }

    /// Creates a special file; `mode` carries the file type bits.
    pub fn mknod(&self, path: &Path, mode: u32, rdev: u32) -> nix::Result<()> {
        let mode = mode as libc::mode_t;
        stat::mknod(
            self.real(path).as_path(),
            SFlag::from_bits_truncate(mode & libc::S_IFMT),
            Mode::from_bits_truncate(mode & !libc::S_IFMT),
            rdev as libc::dev_t,
        )
    }

    /// Sets access and modification times; `None` leaves a time unchanged.
    pub fn utimens(
        &self,
        path: &Path,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> nix::Result<()> {
        stat::utimensat(
            None,
            self.real(path).as_path(),
            &timespec(atime),
            &timespec(mtime),
            UtimensatFlags::NoFollowSymlink,
        )
    }

    fn create_account_dir(&self, handle: &str, mode: u32) -> nix::Result<()> {
        let dir = self.mirror.account_dir(handle).map_err(errno)?;
        match DirBuilder::new().mode(mode).create(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(errno(e)),
        }
    }

    fn unfollow(&self, handle: &str) -> nix::Result<()> {
        if !succeeded(&format!("unfollow {}", handle), self.client.unfollow(handle)) {
            return Ok(());
        }
        info!("stopped following {}", handle);
        trace!("removing {}", handle);
        self.mirror.remove_account_dir(handle).map_err(errno)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::memory::{Call, MemoryClient};
    use crate::modules::mirror::TextPolicy;
    use anyhow::Result;
    use std::os::unix::fs::{FileTypeExt, MetadataExt};
    use tempfile::TempDir;


    struct Fixture {
        _temp_dir: TempDir,
        client: Arc<MemoryClient>,
        translator: Translator,
    }

    fn setup_test_translator() -> Result<Fixture> {
        let temp_dir = tempfile::tempdir()?;
        let mirror = Mirror::new(temp_dir.path())?;
        mirror.ensure_account_dir("me")?;
        mirror.ensure_account_dir("bob")?;

        let client = Arc::new(MemoryClient::new("me"));
        client.add_friend("bob", vec![]);

        let config = Config {
            handle: "me".into(),
            ..Config::default()
        };
        let translator = Translator::new(mirror, client.clone(), &config);
        Ok(Fixture {
            _temp_dir: temp_dir,
            client,
            translator,
        })
    }

    fn write_file(t: &Translator, path: &str, data: &[u8]) -> Result<usize> {
        let path = Path::new(path);
        let fh = match t.create(path, 0o644, libc::O_WRONLY) {
            Ok(fd) => fd,
            Err(Errno::EACCES) => t.open(path, libc::O_WRONLY)?,
            Err(e) => return Err(e.into()),
        };
        let written = t.write(path, fh as u64, 0, data)?;
        t.release(fh as u64)?;
        Ok(written)
    }

    #[test]
    fn test_mkdir_follows_then_creates() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator.mkdir(Path::new("/alice"), 0o755)?;

        assert!(f.translator.real(Path::new("/alice")).is_dir());
        assert_eq!(f.client.calls(), vec![Call::Follow("alice".into())]);
        assert!(f.client.friend_handles().contains(&"alice".to_string()));
        Ok(())
    }

    #[test]
    fn test_mkdir_remote_failure_is_a_silent_no_op() -> Result<()> {
        let f = setup_test_translator()?;
        f.client.set_failing(true);

        f.translator.mkdir(Path::new("/alice"), 0o755)?;
        assert!(!f.translator.real(Path::new("/alice")).exists());
        assert_eq!(f.translator.getattr(Path::new("/alice")).unwrap_err(), Errno::ENOENT);
        Ok(())
    }

    #[test]
    fn test_mkdir_outside_root_level_is_denied() -> Result<()> {
        let f = setup_test_translator()?;
        assert_eq!(
            f.translator.mkdir(Path::new("/bob/sub"), 0o755).unwrap_err(),
            Errno::EACCES
        );
        assert!(f.client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_rmdir_unfollows() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator.rmdir(Path::new("/bob"))?;

        assert!(!f.translator.real(Path::new("/bob")).exists());
        assert_eq!(f.client.calls(), vec![Call::Unfollow("bob".into())]);
        Ok(())
    }

    #[test]
    fn test_rmdir_keeps_directory_when_remote_fails() -> Result<()> {
        let f = setup_test_translator()?;
        f.client.set_failing(true);

        f.translator.rmdir(Path::new("/bob"))?;
        assert!(f.translator.real(Path::new("/bob")).is_dir());
        Ok(())
    }

    #[test]
    fn test_rmdir_unfollow_removes_mirrored_posts() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .mirror()
            .ensure_post_file("bob", 1, "hi", TextPolicy::Ascii)?;

        f.translator.rmdir(Path::new("/bob"))?;
        assert!(!f.translator.real(Path::new("/bob")).exists());
        assert_eq!(f.client.calls(), vec![Call::Unfollow("bob".into())]);
        assert_eq!(f.translator.mirror().accounts()?, vec!["me".to_string()]);
        Ok(())
    }

    #[test]
    fn test_unlink_account_unfollows() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .mirror()
            .ensure_post_file("bob", 1, "hi", TextPolicy::Ascii)?;

        f.translator.unlink(Path::new("/bob"))?;
        assert!(!f.translator.real(Path::new("/bob")).exists());
        assert!(f.client.friend_handles().is_empty());
        Ok(())
    }

    #[test]
    fn test_rmdir_local_account_is_denied() -> Result<()> {
        let f = setup_test_translator()?;
        assert_eq!(f.translator.rmdir(Path::new("/me")).unwrap_err(), Errno::EACCES);
        assert!(f.client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_unlink_own_post_deletes_remotely() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .mirror()
            .ensure_post_file("me", 12345, "mine", TextPolicy::Verbatim)?;

        f.translator.unlink(Path::new("/me/12345"))?;
        assert_eq!(f.client.calls(), vec![Call::DeletePost(12345)]);
        assert!(!f.translator.real(Path::new("/me/12345")).exists());
        Ok(())
    }

    #[test]
    fn test_unlink_own_post_removes_file_even_when_remote_fails() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .mirror()
            .ensure_post_file("me", 12345, "mine", TextPolicy::Verbatim)?;
        f.client.set_failing(true);

        f.translator.unlink(Path::new("/me/12345"))?;
        assert_eq!(f.client.calls(), vec![Call::DeletePost(12345)]);
        assert!(!f.translator.real(Path::new("/me/12345")).exists());
        Ok(())
    }

    #[test]
    fn test_unlink_friend_post_is_local_only() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .mirror()
            .ensure_post_file("bob", 67890, "theirs", TextPolicy::Ascii)?;

        f.translator.unlink(Path::new("/bob/67890"))?;
        assert!(f.client.calls().is_empty());
        assert!(!f.translator.real(Path::new("/bob/67890")).exists());
        Ok(())
    }

    #[test]
    fn test_unlink_own_draft_has_no_remote_effect() -> Result<()> {
        let f = setup_test_translator()?;
        fs::write(f.translator.real(Path::new("/me/draft")), "wip")?;

        f.translator.unlink(Path::new("/me/draft"))?;
        assert!(f.client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_create_outside_own_directory_is_denied() -> Result<()> {
        let f = setup_test_translator()?;
        for path in ["/bob/new", "/new", "/me/a/b"] {
            assert_eq!(
                f.translator
                    .create(Path::new(path), 0o644, libc::O_WRONLY)
                    .unwrap_err(),
                Errno::EACCES,
                "{}",
                path
            );
        }
        assert!(f.client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_write_own_directory_publishes() -> Result<()> {
        let f = setup_test_translator()?;
        let written = write_file(&f.translator, "/me/newfile", b"hello")?;

        assert_eq!(written, 5);
        assert_eq!(f.client.calls(), vec![Call::Publish("hello".into())]);
        assert_eq!(fs::read(f.translator.real(Path::new("/me/newfile")))?, b"hello");
        Ok(())
    }

    #[test]
    fn test_write_keeps_local_bytes_when_publish_fails() -> Result<()> {
        let f = setup_test_translator()?;
        f.client.set_failing(true);

        write_file(&f.translator, "/me/newfile", b"hello\n")?;
        assert_eq!(f.client.calls(), vec![Call::Publish("hello".into())]);
        assert_eq!(fs::read(f.translator.real(Path::new("/me/newfile")))?, b"hello\n");
        Ok(())
    }

    #[test]
    fn test_write_keeps_local_bytes_when_text_cannot_be_encoded() -> Result<()> {
        let f = setup_test_translator()?;
        let written = write_file(&f.translator, "/me/newfile", b"ding\x07\n")?;

        assert_eq!(written, 6);
        assert_eq!(f.client.calls(), vec![Call::Publish("ding\u{7}".into())]);
        assert!(f.client.own_timeline("me", 10)?.is_empty());
        assert_eq!(
            fs::read(f.translator.real(Path::new("/me/newfile")))?,
            b"ding\x07\n"
        );
        Ok(())
    }

    #[test]
    fn test_write_non_utf8_skips_publish() -> Result<()> {
        let f = setup_test_translator()?;
        write_file(&f.translator, "/me/blob", &[0xff, 0xfe, 0x00])?;

        assert!(f.client.calls().is_empty());
        assert_eq!(
            fs::read(f.translator.real(Path::new("/me/blob")))?,
            vec![0xff, 0xfe, 0x00]
        );
        Ok(())
    }

    #[test]
    fn test_write_friend_directory_sends_direct_message() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .mirror()
            .ensure_post_file("bob", 1, "hey", TextPolicy::Ascii)?;

        write_file(&f.translator, "/bob/1", b"hi bob\n")?;
        assert_eq!(
            f.client.calls(),
            vec![Call::DirectMessage {
                to: "bob".into(),
                text: "hi bob".into()
            }]
        );
        assert_eq!(fs::read(f.translator.real(Path::new("/bob/1")))?, b"hi bob\n");
        Ok(())
    }

    #[test]
    fn test_read_at_offset() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .mirror()
            .ensure_post_file("bob", 3, "good morning", TextPolicy::Ascii)?;

        let fh = f.translator.open(Path::new("/bob/3"), libc::O_RDONLY)? as u64;
        assert_eq!(f.translator.read(fh, 5, 7)?, b"morning");
        f.translator.release(fh)?;
        Ok(())
    }

    #[test]
    fn test_readdir_lists_mirror() -> Result<()> {
        let f = setup_test_translator()?;
        let mut names = f.translator.readdir(Path::new("/"))?;
        names.sort();
        assert_eq!(names, vec![".", "..", "bob", "me"]);
        assert!(f.client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_chmod_policy() -> Result<()> {
        let f = setup_test_translator()?;
        let path = Path::new("/me/draft");
        fs::write(f.translator.real(path), "x")?;

        f.translator.chmod(path, 0o600)?;
        assert_eq!(f.translator.getattr(path)?.permissions().mode() & 0o777, 0o600);

        let ignoring = Translator::new(
            f.translator.mirror().clone(),
            f.client.clone(),
            &Config {
                handle: "me".into(),
                chmod: ChmodPolicy::Ignore,
                ..Config::default()
            },
        );
        ignoring.chmod(path, 0o644)?;
        assert_eq!(f.translator.getattr(path)?.permissions().mode() & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn test_truncate_and_rename() -> Result<()> {
        let f = setup_test_translator()?;
        fs::write(f.translator.real(Path::new("/me/draft")), "long draft")?;

        f.translator.truncate(Path::new("/me/draft"), 4, None)?;
        f.translator
            .rename(Path::new("/me/draft"), Path::new("/me/short"))?;
        assert_eq!(fs::read_to_string(f.translator.real(Path::new("/me/short")))?, "long");
        Ok(())
    }

    #[test]
    fn test_link_shares_content() -> Result<()> {
        let f = setup_test_translator()?;
        fs::write(f.translator.real(Path::new("/me/draft")), "shared")?;

        f.translator
            .link(Path::new("/me/draft"), Path::new("/me/copy"))?;
        assert_eq!(f.translator.getattr(Path::new("/me/draft"))?.nlink(), 2);
        assert_eq!(fs::read_to_string(f.translator.real(Path::new("/me/copy")))?, "shared");
        assert!(f.client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_mknod_creates_fifo() -> Result<()> {
        let f = setup_test_translator()?;
        let path = Path::new("/me/pipe");

        f.translator.mknod(path, libc::S_IFIFO as u32 | 0o644, 0)?;
        assert!(f.translator.getattr(path)?.file_type().is_fifo());
        assert!(f.client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_chown_to_current_owner() -> Result<()> {
        let f = setup_test_translator()?;
        let path = Path::new("/me/draft");
        fs::write(f.translator.real(path), "x")?;
        let (uid, gid) = (unistd::getuid().as_raw(), unistd::getgid().as_raw());

        f.translator.chown(path, Some(uid), Some(gid))?;
        f.translator.chown(path, None, None)?;
        let metadata = f.translator.getattr(path)?;
        assert_eq!((metadata.uid(), metadata.gid()), (uid, gid));
        Ok(())
    }

    #[test]
    fn test_access_checks_backing_entry() -> Result<()> {
        let f = setup_test_translator()?;
        assert!(f.translator.access(Path::new("/me"), libc::F_OK).is_ok());
        assert_eq!(
            f.translator.access(Path::new("/me/missing"), libc::F_OK),
            Err(Errno::ENOENT)
        );
        Ok(())
    }

    #[test]
    fn test_statfs_reports_backing_filesystem() -> Result<()> {
        let f = setup_test_translator()?;
        let stat = f.translator.statfs(Path::new("/"))?;
        assert!(stat.block_size() > 0);
        assert!(stat.blocks() >= stat.blocks_free());
        assert!(stat.name_max() > 0);
        Ok(())
    }

    #[test]
    fn test_symlink_and_readlink() -> Result<()> {
        let f = setup_test_translator()?;
        f.translator
            .symlink(Path::new("/me/latest"), Path::new("12345"))?;
        assert_eq!(
            f.translator.readlink(Path::new("/me/latest"))?,
            PathBuf::from("12345")
        );
        assert!(f
            .translator
            .getattr(Path::new("/me/latest"))?
            .file_type()
            .is_symlink());
        Ok(())
    }

    #[test]
    fn test_utimens_sets_mtime() -> Result<()> {
        let f = setup_test_translator()?;
        let path = Path::new("/me/draft");
        fs::write(f.translator.real(path), "x")?;

        let when = UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        f.translator.utimens(path, None, Some(when))?;
        assert_eq!(f.translator.getattr(path)?.modified()?, when);
        Ok(())
    }

    #[test]
    fn test_outgoing_text() {
        assert_eq!(outgoing_text("hello\n"), "hello");
        assert_eq!(outgoing_text("hello\r\n"), "hello");
        assert_eq!(outgoing_text("two\n\n"), "two\n");
        assert_eq!(outgoing_text("plain"), "plain");
    }
}
