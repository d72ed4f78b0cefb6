//! The on-disk mirror.
//!
//! `<root>/<handle>/` per account, `<root>/<handle>/<post-id>` per post,
//! file content is the post text plus a trailing newline. The store knows
//! nothing about the network; both the scheduler and the translator write
//! through it, and neither assumes exclusive access. Entries are only ever
//! created when absent, and post files appear fully written, so concurrent
//! writers converge on one complete file per id.

use super::remote::PostId;
use log::debug;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// How post text is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPolicy {
    /// Stored as received (the local user's own posts)
    Verbatim,
    /// Every non-ASCII character dropped (everyone else's posts)
    Ascii,
}

/// Applies `policy` to `text`.
pub fn transliterate(text: &str, policy: TextPolicy) -> Cow<'_, str> {
    match policy {
        TextPolicy::Verbatim => Cow::Borrowed(text),
        TextPolicy::Ascii if text.is_ascii() => Cow::Borrowed(text),
        TextPolicy::Ascii => Cow::Owned(text.chars().filter(char::is_ascii).collect()),
    }
}

/// Rejects names that would escape or alias the mirror tree.
fn component(name: &str) -> io::Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid mirror entry name: {:?}", name),
        ));
    }
    Ok(name)
}

/// Creates `path` with the content produced by `fill`, unless it exists.
///
/// `fill` writes into a temporary file in the same directory; only a
/// successful fill is linked to `path`. Returns whether this call created it.
fn create_exclusive<F>(path: &Path, fill: F) -> io::Result<bool>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    if fs::symlink_metadata(path).is_ok() {
        return Ok(false);
    }
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(ErrorKind::InvalidInput, format!("{} has no parent", path.display()))
    })?;

    let mut temp = NamedTempFile::new_in(dir)?;
    fill(temp.as_file_mut())?;
    match temp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

/// Local directory tree holding synchronized state.
#[derive(Debug, Clone)]
pub struct Mirror {
    root: PathBuf,
}

impl Mirror {
    /// Opens the mirror at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        let root = fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    /// Absolute path of the mirror root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an account directory.
    pub fn account_dir(&self, handle: &str) -> io::Result<PathBuf> {
        Ok(self.root.join(component(handle)?))
    }

    /// Path of a post file.
    pub fn post_path(&self, handle: &str, id: PostId) -> io::Result<PathBuf> {
        Ok(self.account_dir(handle)?.join(id.to_string()))
    }

    /// Creates the account directory unless it exists.
    ///
    /// Returns `true` when the directory was created by this call.
    pub fn ensure_account_dir(&self, handle: &str) -> io::Result<bool> {
        let dir = self.account_dir(handle)?;
        match fs::create_dir(&dir) {
            Ok(()) => {
                debug!("created account directory {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Writes a post file unless one with that id already exists.
    ///
    /// The content is written to a temporary file first and linked into
    /// place without replacing anything, so a post file is either complete
    /// or absent. Of two racing callers exactly one links and the other
    /// sees `Ok(false)`. Existing content is never touched.
    pub fn ensure_post_file(
        &self,
        handle: &str,
        id: PostId,
        text: &str,
        policy: TextPolicy,
    ) -> io::Result<bool> {
        let path = self.post_path(handle, id)?;
        let mut content = transliterate(text, policy).into_owned();
        content.push('\n');

        let created = create_exclusive(&path, |file| file.write_all(content.as_bytes()))?;
        if created {
            debug!("wrote post {} for {}", id, handle);
        }
        Ok(created)
    }

    /// Removes an account directory together with its mirrored posts.
    pub fn remove_account_dir(&self, handle: &str) -> io::Result<()> {
        let dir = self.account_dir(handle)?;
        fs::remove_dir_all(&dir)?;
        debug!("removed {}", dir.display());
        Ok(())
    }

    /// Removes a post file.
    pub fn remove_post_file(&self, handle: &str, id: PostId) -> io::Result<()> {
        fs::remove_file(self.post_path(handle, id)?)
    }

    /// Handles of all account directories, sorted.
    pub fn accounts(&self) -> io::Result<Vec<String>> {
        let mut handles = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    handles.push(name);
                }
            }
        }
        handles.sort();
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn setup_test_mirror() -> (TempDir, Mirror) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mirror = Mirror::new(temp_dir.path()).unwrap();
        (temp_dir, mirror)
    }

    #[test]
    fn test_transliterate() {
        assert_eq!(transliterate("caf\u{e9} \u{2615}", TextPolicy::Verbatim), "caf\u{e9} \u{2615}");
        assert_eq!(transliterate("caf\u{e9} \u{2615}", TextPolicy::Ascii), "caf ");
        assert!(matches!(
            transliterate("plain", TextPolicy::Ascii),
            Cow::Borrowed("plain")
        ));
    }

    #[test]
    fn test_ensure_account_dir_is_idempotent() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();

        assert!(mirror.ensure_account_dir("alice")?);
        assert!(!mirror.ensure_account_dir("alice")?);
        assert_eq!(mirror.accounts()?, vec!["alice".to_string()]);
        Ok(())
    }

    #[test]
    fn test_ensure_post_file_never_overwrites() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();
        mirror.ensure_account_dir("alice")?;

        assert!(mirror.ensure_post_file("alice", 1, "first", TextPolicy::Ascii)?);
        assert!(!mirror.ensure_post_file("alice", 1, "second", TextPolicy::Ascii)?);

        let content = fs::read_to_string(mirror.post_path("alice", 1)?)?;
        assert_eq!(content, "first\n");
        Ok(())
    }

    #[test]
    fn test_post_text_policy() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();
        mirror.ensure_account_dir("me")?;
        mirror.ensure_account_dir("bob")?;

        mirror.ensure_post_file("me", 1, "h\u{e9}llo", TextPolicy::Verbatim)?;
        mirror.ensure_post_file("bob", 2, "h\u{e9}llo", TextPolicy::Ascii)?;

        assert_eq!(fs::read_to_string(mirror.post_path("me", 1)?)?, "h\u{e9}llo\n");
        assert_eq!(fs::read_to_string(mirror.post_path("bob", 2)?)?, "hllo\n");
        Ok(())
    }

    #[test]
    fn test_post_file_without_account_dir_fails() {
        let (_temp_dir, mirror) = setup_test_mirror();
        let err = mirror
            .ensure_post_file("ghost", 1, "boo", TextPolicy::Ascii)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove_account_dir_takes_posts_along() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();
        mirror.ensure_account_dir("alice")?;
        mirror.ensure_post_file("alice", 9, "x", TextPolicy::Ascii)?;
        mirror.ensure_post_file("alice", 10, "y", TextPolicy::Ascii)?;

        mirror.remove_account_dir("alice")?;
        assert!(!mirror.account_dir("alice")?.exists());
        assert!(mirror.accounts()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_remove_post_file() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();
        mirror.ensure_account_dir("alice")?;
        mirror.ensure_post_file("alice", 9, "x", TextPolicy::Ascii)?;

        mirror.remove_post_file("alice", 9)?;
        assert!(!mirror.post_path("alice", 9)?.exists());
        assert_eq!(
            mirror.remove_post_file("alice", 9).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        Ok(())
    }

    #[test]
    fn test_failed_fill_leaves_nothing_behind() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();
        mirror.ensure_account_dir("alice")?;
        let path = mirror.post_path("alice", 7)?;

        let err = create_exclusive(&path, |file| {
            file.write_all(b"pi")?;
            Err(io::Error::new(ErrorKind::Other, "disk full"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
        assert_eq!(fs::read_dir(mirror.account_dir("alice")?)?.count(), 0);

        // The next cycle still gets to write it
        assert!(mirror.ensure_post_file("alice", 7, "ping", TextPolicy::Ascii)?);
        assert_eq!(fs::read_to_string(&path)?, "ping\n");
        Ok(())
    }

    #[test]
    fn test_existing_entry_is_not_refilled() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();
        mirror.ensure_account_dir("alice")?;
        let path = mirror.post_path("alice", 7)?;
        fs::write(&path, "kept\n")?;

        let mut called = false;
        assert!(!create_exclusive(&path, |_| {
            called = true;
            Ok(())
        })?);
        assert!(!called);
        assert_eq!(fs::read_to_string(&path)?, "kept\n");
        Ok(())
    }

    #[test]
    fn test_hostile_names_are_rejected() {
        let (_temp_dir, mirror) = setup_test_mirror();
        for name in ["", ".", "..", "a/b", "nul\0"] {
            let err = mirror.ensure_account_dir(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{:?}", name);
        }
    }

    #[test]
    fn test_racing_writers_create_one_file() -> Result<()> {
        let (_temp_dir, mirror) = setup_test_mirror();
        let mirror = Arc::new(mirror);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let mirror = Arc::clone(&mirror);
                thread::spawn(move || {
                    mirror.ensure_account_dir("alice").unwrap();
                    mirror
                        .ensure_post_file("alice", 77, &format!("writer {}", i), TextPolicy::Ascii)
                        .unwrap()
                })
            })
            .collect();

        let created: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(created, 1);

        let content = fs::read_to_string(mirror.post_path("alice", 77)?)?;
        assert!(content.starts_with("writer ") && content.ends_with('\n'));
        Ok(())
    }
}
