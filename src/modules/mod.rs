//! Core filesystem modules.
//!
//! - `config`: Runtime configuration and credentials
//! - `constants`: Filesystem constants and default values
//! - `filesystem`: FUSE front end
//! - `guard`: Serialized positioned I/O
//! - `http`: REST client for the social service
//! - `memory`: In-process social service
//! - `mirror`: On-disk layout of mirrored accounts and posts
//! - `mount`: Mounting and signal handling
//! - `namespace`: Path classification and inode bookkeeping
//! - `remote`: Remote service abstraction
//! - `sync`: Background synchronization
//! - `translator`: Filesystem operations with remote side effects

pub mod config;
pub mod constants;
/// FUSE front end over the translator.
pub mod filesystem;
pub mod guard;
pub mod http;
pub mod memory;
pub mod mirror;
/// Mounting, signal handling and unmounting.
pub mod mount;
/// Path classification and inode bookkeeping.
pub mod namespace;
pub mod remote;
pub mod sync;
pub mod translator;
