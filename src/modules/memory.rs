//! An in-process social service.
//!
//! Backs `--offline` mounts and the test suites. State lives behind a
//! `parking_lot` mutex; every mutating call is recorded so callers can
//! check exactly which remote actions an operation triggered.

use super::remote::{encodable, Account, Post, PostId, RemoteError, RemoteResult, SocialClient};
use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// A remote action recorded by [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Call {
    Follow(String),
    Unfollow(String),
    Publish(String),
    DirectMessage { to: String, text: String },
    DeletePost(PostId),
}

#[derive(Debug, Default)]
struct State {
    own: Vec<Post>,
    friends: Vec<Account>,
    timelines: BTreeMap<String, Vec<Post>>,
    calls: Vec<Call>,
    next_id: PostId,
    next_account: u64,
    failing: bool,
}

/// Social service kept entirely in memory.
#[derive(Debug)]
pub struct MemoryClient {
    handle: String,
    state: Mutex<State>,
}

impl MemoryClient {
    /// Creates an empty service for the local account `handle`.
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            state: Mutex::new(State {
                next_id: 1_000,
                next_account: 1,
                ..State::default()
            }),
        }
    }

    /// Adds a post to the local user's timeline.
    pub fn add_own_post(&self, post: Post) {
        let mut state = self.state.lock();
        state.next_id = state.next_id.max(post.id + 1);
        state.own.insert(0, post);
    }

    /// Adds a followed account and its timeline.
    pub fn add_friend(&self, handle: &str, posts: Vec<Post>) {
        let mut state = self.state.lock();
        if !state.friends.iter().any(|a| a.handle == handle) {
            let id = state.next_account;
            state.next_account += 1;
            state.friends.push(Account {
                id,
                handle: handle.to_string(),
            });
        }
        state.timelines.insert(handle.to_string(), posts);
    }

    /// Makes every subsequent call fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Remote actions performed so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Handles of the accounts currently followed.
    pub fn friend_handles(&self) -> Vec<String> {
        self.state.lock().friends.iter().map(|a| a.handle.clone()).collect()
    }

    fn check(state: &State) -> RemoteResult<()> {
        if state.failing {
            return Err(RemoteError::Transport("service unreachable".into()));
        }
        Ok(())
    }
}

impl SocialClient for MemoryClient {
    fn own_timeline(&self, _handle: &str, limit: usize) -> RemoteResult<Vec<Post>> {
        let state = self.state.lock();
        Self::check(&state)?;
        Ok(state.own.iter().take(limit).cloned().collect())
    }

    fn friends(&self) -> RemoteResult<Vec<Account>> {
        let state = self.state.lock();
        Self::check(&state)?;
        Ok(state.friends.clone())
    }

    fn account_timeline(&self, handle: &str, limit: usize) -> RemoteResult<Vec<Post>> {
        let state = self.state.lock();
        Self::check(&state)?;
        Ok(state
            .timelines
            .get(handle)
            .map(|posts| posts.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn follow(&self, handle: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Follow(handle.to_string()));
        Self::check(&state)?;
        if !state.friends.iter().any(|a| a.handle == handle) {
            let id = state.next_account;
            state.next_account += 1;
            state.friends.push(Account {
                id,
                handle: handle.to_string(),
            });
        }
        debug!("{} now follows {}", self.handle, handle);
        Ok(())
    }

    fn unfollow(&self, handle: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Unfollow(handle.to_string()));
        Self::check(&state)?;
        state.friends.retain(|a| a.handle != handle);
        Ok(())
    }

    fn publish(&self, text: &str) -> RemoteResult<PostId> {
        let mut state = self.state.lock();
        state.calls.push(Call::Publish(text.to_string()));
        Self::check(&state)?;
        encodable(text)?;
        let id = state.next_id;
        state.next_id += 1;
        state.own.insert(0, Post::new(id, text));
        Ok(id)
    }

    fn send_direct_message(&self, handle: &str, text: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::DirectMessage {
            to: handle.to_string(),
            text: text.to_string(),
        });
        Self::check(&state)?;
        encodable(text)
    }

    fn delete_post(&self, id: PostId) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::DeletePost(id));
        Self::check(&state)?;
        let before = state.own.len();
        state.own.retain(|p| p.id != id);
        if state.own.len() == before {
            return Err(RemoteError::Rejected {
                status: 404,
                message: format!("no post {}", id),
            });
        }
        Ok(())
    }
}
