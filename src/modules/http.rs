//! [`SocialClient`] over the REST API.
//!
//! Uses the v1.1 endpoint layout with bearer authentication. Each call is a
//! blocking request bounded by the configured timeout.

use super::config::Config;
use super::constants::FRIENDS_PAGE_SIZE;
use super::remote::{encodable, Account, Post, PostId, RemoteError, RemoteResult, SocialClient};
use anyhow::{Context, Result};
use log::trace;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FriendsPage {
    users: Vec<Account>,
    #[serde(default)]
    next_cursor: i64,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: PostId,
}

/// Maps a non-success answer onto a [`RemoteError`].
fn classify(status: StatusCode, body: String) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited,
        _ => RemoteError::Rejected {
            status: status.as_u16(),
            message: body,
        },
    }
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

/// Blocking HTTP client for the social service.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base: String,
    token: String,
}

impl HttpClient {
    /// Builds a client from the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("tweetfs/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
            token: config.credentials.bearer_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.bearer_auth(&self.token).send().map_err(transport)?;
        let status = response.status();
        trace!("{} {}", status, response.url());
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(classify(status, body))
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> RemoteResult<T> {
        let response = self.send(self.client.get(self.endpoint(path)).query(query))?;
        response
            .json()
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn post(&self, path: &str, form: &[(&str, String)]) -> RemoteResult<Response> {
        self.send(self.client.post(self.endpoint(path)).form(form))
    }

    fn timeline(&self, handle: &str, limit: usize) -> RemoteResult<Vec<Post>> {
        self.get(
            "statuses/user_timeline.json",
            &[
                ("screen_name", handle.to_string()),
                ("count", limit.to_string()),
                ("tweet_mode", "extended".to_string()),
            ],
        )
    }
}

impl SocialClient for HttpClient {
    fn own_timeline(&self, handle: &str, limit: usize) -> RemoteResult<Vec<Post>> {
        self.timeline(handle, limit)
    }

    fn friends(&self) -> RemoteResult<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut cursor = -1i64;
        while cursor != 0 {
            let page: FriendsPage = self.get(
                "friends/list.json",
                &[
                    ("cursor", cursor.to_string()),
                    ("count", FRIENDS_PAGE_SIZE.to_string()),
                    ("skip_status", "true".to_string()),
                ],
            )?;
            accounts.extend(page.users);
            cursor = page.next_cursor;
        }
        Ok(accounts)
    }

    fn account_timeline(&self, handle: &str, limit: usize) -> RemoteResult<Vec<Post>> {
        self.timeline(handle, limit)
    }

    fn follow(&self, handle: &str) -> RemoteResult<()> {
        self.post(
            "friendships/create.json",
            &[("screen_name", handle.to_string())],
        )?;
        Ok(())
    }

    fn unfollow(&self, handle: &str) -> RemoteResult<()> {
        self.post(
            "friendships/destroy.json",
            &[("screen_name", handle.to_string())],
        )?;
        Ok(())
    }

    fn publish(&self, text: &str) -> RemoteResult<PostId> {
        encodable(text)?;
        let created: Created = self
            .post("statuses/update.json", &[("status", text.to_string())])?
            .json()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(created.id)
    }

    fn send_direct_message(&self, handle: &str, text: &str) -> RemoteResult<()> {
        encodable(text)?;
        self.post(
            "direct_messages/new.json",
            &[
                ("screen_name", handle.to_string()),
                ("text", text.to_string()),
            ],
        )?;
        Ok(())
    }

    fn delete_post(&self, id: PostId) -> RemoteResult<()> {
        self.post(&format!("statuses/destroy/{}.json", id), &[])?;
        Ok(())
    }
}
