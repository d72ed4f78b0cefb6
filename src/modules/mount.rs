use super::constants::{FS_NAME, MOUNT_POLL_INTERVAL};
use super::filesystem::TweetFs;
use anyhow::{anyhow, Context, Result};
use fuser::MountOption;
use log::info;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Options passed to the kernel for every mount.
pub fn mount_options() -> Vec<MountOption> {
    vec![
        MountOption::FSName(FS_NAME.to_string()),
        MountOption::Subtype(FS_NAME.to_string()),
        MountOption::DefaultPermissions,
    ]
}

/// Resolves `mount_point`, which must be an existing directory.
pub fn check_mount_point(mount_point: &Path) -> Result<PathBuf> {
    let abs = fs::canonicalize(mount_point)
        .with_context(|| format!("mount point {} does not exist", mount_point.display()))?;
    if !abs.is_dir() {
        return Err(anyhow!("mount point {} is not a directory", abs.display()));
    }
    Ok(abs)
}

/// Why serving stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A termination signal arrived
    Signal(i32),
    /// The filesystem went away on its own, e.g. `fusermount -u`
    Unmounted,
}

/// Waits until one of `signals` is pending or `unmounted` reports true,
/// checking every `interval`.
pub fn wait_for_exit<F>(signals: &mut Signals, unmounted: F, interval: Duration) -> Exit
where
    F: Fn() -> bool,
{
    loop {
        if let Some(sig) = signals.pending().next() {
            return Exit::Signal(sig);
        }
        if unmounted() {
            return Exit::Unmounted;
        }
        thread::sleep(interval);
    }
}

/// Mounts `fs` at `mount_point` and serves it until SIGINT, SIGTERM or an
/// external unmount.
///
/// The filesystem is unmounted before this returns.
pub fn mount(fs: TweetFs, mount_point: &Path) -> Result<()> {
    let mount_point = check_mount_point(mount_point)?;
    let session = fuser::spawn_mount2(fs, &mount_point, &mount_options())
        .with_context(|| format!("mounting at {}", mount_point.display()))?;
    info!("mounted at {}", mount_point.display());

    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    match wait_for_exit(&mut signals, || session.guard.is_finished(), MOUNT_POLL_INTERVAL) {
        Exit::Signal(sig) => {
            info!("received signal {}, unmounting {}", sig, mount_point.display())
        }
        Exit::Unmounted => info!("{} was unmounted", mount_point.display()),
    }

    session.join();
    Ok(())
}
