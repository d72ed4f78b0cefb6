#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! tweetfs: a social network account mirrored as a filesystem
//!
//! The mount shows one directory per account, the local user's own and one
//! per followed account, holding one file per recent post named by its id.
//! A background scheduler keeps the mirror fresh; filesystem operations
//! inside it turn into remote actions.
//!
//! ## Features
//!
//! - `mkdir <handle>` follows an account, `rmdir <handle>` unfollows it
//! - Writing into a new file under your own directory publishes a post
//! - Writing into a friend's post sends that friend a direct message
//! - Removing one of your own post files deletes the post
//! - Everything else passes through to the backing directory
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tweetfs::{Config, MemoryClient, Mirror, SocialClient, Syncer, SyncSettings, Translator};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config {
//!     handle: "me".into(),
//!     ..Config::default()
//! };
//! let client: Arc<dyn SocialClient> = Arc::new(MemoryClient::new("me"));
//!
//! // Pull the current state once
//! let syncer = Syncer::new(Mirror::new("/tmp/tweetfs")?, client.clone(), SyncSettings::from(&config));
//! syncer.run_cycle();
//!
//! // Follow someone through the namespace
//! let translator = Translator::new(Mirror::new("/tmp/tweetfs")?, client, &config);
//! translator.mkdir("/alice".as_ref(), 0o755).ok();
//! # Ok(())
//! # }
//! ```

pub mod modules;

pub use modules::config::Config;
pub use modules::filesystem::TweetFs;
pub use modules::http::HttpClient;
pub use modules::memory::MemoryClient;
pub use modules::mirror::Mirror;
pub use modules::translator::Translator;

// Re-export commonly used types
pub use modules::remote::{Account, Post, PostId, RemoteError, SocialClient};
pub use modules::sync::{SyncHandle, SyncSettings, Syncer, SystemClock};
