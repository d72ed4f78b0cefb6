//! Background synchronization of remote state into the mirror.
//!
//! One cycle fetches the local user's recent posts, then the friend list,
//! then each friend's recent posts, writing whatever is new into the
//! mirror. A failed fetch counts as "nothing this time" and the cycle
//! moves on. Cycles repeat on a dedicated thread until the returned
//! [`SyncHandle`] is cancelled.
//!
//! There is no high-water mark: every cycle looks at the latest N posts per
//! account and relies on the mirror skipping ids it already has. Anything
//! that scrolls out of that window between two cycles is never mirrored.

use super::config::Config;
use super::mirror::{Mirror, TextPolicy};
use super::remote::{or_empty, Post, SocialClient};
use anyhow::{anyhow, Result};
use log::{debug, error, info};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Source of the pause between two cycles.
pub trait Clock: Send + Sync {
    /// Blocks for `interval` or until `stop` fires.
    ///
    /// Returns `false` when the scheduler should stop.
    fn wait(&self, interval: Duration, stop: &Receiver<()>) -> bool;
}

/// Wall-clock waiting on the stop channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn wait(&self, interval: Duration, stop: &Receiver<()>) -> bool {
        matches!(stop.recv_timeout(interval), Err(RecvTimeoutError::Timeout))
    }
}

/// What one cycle did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Account directories visited, the local one included
    pub accounts: usize,
    /// Post files newly written
    pub posts_written: usize,
    /// Local failures (directory or file creation) during the cycle
    pub failures: usize,
}

/// Fetch windows and identity used by each cycle.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Local account handle
    pub handle: String,
    /// Own posts fetched per cycle
    pub user_tweets: usize,
    /// Posts fetched per friend per cycle
    pub friend_tweets: usize,
    /// Pause between cycles
    pub interval: Duration,
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            handle: config.handle.clone(),
            user_tweets: config.user_tweets,
            friend_tweets: config.friend_tweets,
            interval: config.update_interval(),
        }
    }
}

/// Pulls remote state into the mirror.
pub struct Syncer {
    mirror: Mirror,
    client: Arc<dyn SocialClient>,
    settings: SyncSettings,
}

impl Syncer {
    /// Creates a syncer writing into `mirror`.
    pub fn new(mirror: Mirror, client: Arc<dyn SocialClient>, settings: SyncSettings) -> Self {
        Self {
            mirror,
            client,
            settings,
        }
    }

    /// Runs a single cycle.
    pub fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let handle = self.settings.handle.as_str();

        if self.ensure_account(handle, &mut report) {
            let posts = or_empty(
                "fetching own timeline",
                self.client.own_timeline(handle, self.settings.user_tweets),
            );
            self.store_posts(handle, &posts, TextPolicy::Verbatim, &mut report);
        }

        for friend in or_empty("fetching friend list", self.client.friends()) {
            if !self.ensure_account(&friend.handle, &mut report) {
                continue;
            }
            let posts = or_empty(
                &format!("fetching timeline of {}", friend.handle),
                self.client
                    .account_timeline(&friend.handle, self.settings.friend_tweets),
            );
            self.store_posts(&friend.handle, &posts, TextPolicy::Ascii, &mut report);
        }

        report
    }

    /// Runs cycles until `clock` reports a stop.
    pub fn run(&self, clock: &dyn Clock, stop: &Receiver<()>) {
        loop {
            let report = self.run_cycle();
            info!(
                "sync cycle done: {} accounts, {} new posts, {} failures",
                report.accounts, report.posts_written, report.failures
            );
            if !clock.wait(self.settings.interval, stop) {
                debug!("sync loop stopping");
                break;
            }
        }
    }

    /// Starts the loop on its own thread.
    pub fn spawn(self, clock: Arc<dyn Clock>) -> Result<SyncHandle> {
        let (stop_tx, stop_rx) = channel();
        let thread = thread::Builder::new()
            .name("tweetfs-sync".into())
            .spawn(move || self.run(clock.as_ref(), &stop_rx))?;
        Ok(SyncHandle {
            stop: stop_tx,
            thread,
        })
    }

    fn ensure_account(&self, handle: &str, report: &mut CycleReport) -> bool {
        match self.mirror.ensure_account_dir(handle) {
            Ok(_) => {
                report.accounts += 1;
                true
            }
            Err(e) => {
                error!("cannot create directory for {}: {}", handle, e);
                report.failures += 1;
                false
            }
        }
    }

    fn store_posts(
        &self,
        handle: &str,
        posts: &[Post],
        policy: TextPolicy,
        report: &mut CycleReport,
    ) {
        for post in posts {
            match self
                .mirror
                .ensure_post_file(handle, post.id, &post.text, policy)
            {
                Ok(true) => report.posts_written += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("cannot write post {} of {}: {}", post.id, handle, e);
                    report.failures += 1;
                }
            }
        }
    }
}

/// Handle to a running sync loop.
pub struct SyncHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl SyncHandle {
    /// Stops the loop and waits for the current cycle to finish.
    pub fn cancel(self) -> Result<()> {
        // The loop may already have exited on its own.
        let _ = self.stop.send(());
        self.thread
            .join()
            .map_err(|_| anyhow!("sync thread panicked"))
    }
}
