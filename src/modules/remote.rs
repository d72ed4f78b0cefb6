//! The remote social service as seen by the rest of the crate.
//!
//! [`SocialClient`] is the only seam between the mirror logic and the
//! network. Every call returns a typed [`RemoteResult`]; callers log the
//! failure and degrade to "no results" or "no effect" instead of raising.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric identifier of a post.
pub type PostId = u64;

/// A single status as returned by a timeline fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Identifier, used as the file name in the mirror
    pub id: PostId,
    /// Text of the post
    #[serde(rename = "full_text", alias = "text")]
    pub text: String,
}

impl Post {
    /// Creates a post.
    pub fn new(id: PostId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// A followed account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Numeric account id
    pub id: u64,
    /// Screen name, used as the directory name in the mirror
    #[serde(rename = "screen_name")]
    pub handle: String,
}

/// Why a remote call produced nothing.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never got a response
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service refused the credentials
    #[error("authentication failed")]
    Unauthorized,
    /// The service asked us to slow down
    #[error("rate limited")]
    RateLimited,
    /// Any other non-success answer
    #[error("request rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Body or reason returned by the service
        message: String,
    },
    /// The payload cannot be represented in the service's encoding
    #[error("text cannot be encoded for the remote service")]
    Encoding,
    /// The response could not be understood
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Result of a remote call.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Operations the mirror needs from the social service.
///
/// Implementations block the calling thread for the whole round trip.
pub trait SocialClient: Send + Sync {
    /// Most recent posts of the local user, newest first.
    fn own_timeline(&self, handle: &str, limit: usize) -> RemoteResult<Vec<Post>>;

    /// Accounts the local user follows.
    fn friends(&self) -> RemoteResult<Vec<Account>>;

    /// Most recent posts of another account, newest first.
    fn account_timeline(&self, handle: &str, limit: usize) -> RemoteResult<Vec<Post>>;

    /// Starts following `handle`.
    fn follow(&self, handle: &str) -> RemoteResult<()>;

    /// Stops following `handle`.
    fn unfollow(&self, handle: &str) -> RemoteResult<()>;

    /// Publishes a new post and returns its id.
    fn publish(&self, text: &str) -> RemoteResult<PostId>;

    /// Sends a private message to `handle`.
    fn send_direct_message(&self, handle: &str, text: &str) -> RemoteResult<()>;

    /// Deletes one of the local user's posts.
    fn delete_post(&self, id: PostId) -> RemoteResult<()>;
}

/// Checks that `text` can be sent as a status or message.
///
/// The service takes UTF-8 but refuses control characters other than tab
/// and line breaks.
pub fn encodable(text: &str) -> RemoteResult<()> {
    if text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(RemoteError::Encoding);
    }
    Ok(())
}

/// Collapses a failed fetch into an empty result, logging the reason.
pub fn or_empty<T: Default>(what: &str, result: RemoteResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} failed, treating as empty: {}", what, e);
            T::default()
        }
    }
}

/// Logs a failed remote action and reports whether it went through.
pub fn succeeded<T>(what: &str, result: RemoteResult<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            warn!("{} failed: {}", what, e);
            false
        }
    }
}
