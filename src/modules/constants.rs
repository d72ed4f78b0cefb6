//! Filesystem constants and default values.

use std::time::Duration;

// File system constants

/// How long the kernel may cache attributes and entries
pub const TTL: Duration = Duration::from_secs(1);
/// Block size reported in file attributes
pub const BLOCK_SIZE: u32 = 512;
/// Inode of the mount root
pub const ROOT_INODE: u64 = 1;
/// First inode handed out below the root
pub const INITIAL_INODE: u64 = 2;
/// Filesystem name and subtype shown in the mount table
pub const FS_NAME: &str = "tweetfs";
/// How often the mount loop checks for signals and external unmounts
pub const MOUNT_POLL_INTERVAL: Duration = Duration::from_millis(200);

// Sync defaults

/// Seconds between two sync cycles
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;
/// Own posts fetched per cycle
pub const DEFAULT_USER_TWEETS: usize = 10;
/// Posts fetched per friend per cycle
pub const DEFAULT_FRIEND_TWEETS: usize = 10;

// Remote client defaults

/// REST base URL of the service
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";
/// Per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Accounts requested per page of the friend list
pub const FRIENDS_PAGE_SIZE: usize = 200;

// Environment overrides

/// Overrides the configured local handle
pub const ENV_HANDLE: &str = "TWEETFS_HANDLE";
/// Overrides the configured bearer token
pub const ENV_TOKEN: &str = "TWEETFS_TOKEN";
