//! GitHub contents-API implementation of [`CommitClient`].
//!
//! Each commit appends one timestamp line to `file_path` in the target
//! repository: a GET learns the current blob sha (404 means the file is new),
//! then a PUT writes the new content as the configured author.

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::{CommitClient, CommitReceipt, CommitRequest};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

pub struct GithubCommitClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct Identity<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    committer: Identity<'a>,
    author: Identity<'a>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    commit: CommitPayload,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
    committer: Option<CommitterPayload>,
}

#[derive(Debug, Deserialize)]
struct CommitterPayload {
    date: DateTime<Utc>,
}

impl GithubCommitClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("streak/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn contents_url(&self, req: &CommitRequest) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            req.owner,
            req.repo,
            req.file_path.trim_start_matches('/')
        )
    }

    async fn fetch_current(&self, req: &CommitRequest) -> anyhow::Result<Option<ContentsFile>> {
        let resp = authorized(self.http.get(self.contents_url(req)), req)
            .send()
            .await
            .context("failed to reach github")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = ensure_success(resp).await?;
        let file = resp
            .json::<ContentsFile>()
            .await
            .context("unexpected contents payload")?;
        Ok(Some(file))
    }
}

fn authorized(rb: RequestBuilder, req: &CommitRequest) -> RequestBuilder {
    rb.bearer_auth(&req.token)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .header("X-GitHub-Api-Version", "2022-11-28")
}

/// Turns a non-2xx response into an error that carries GitHub's message.
async fn ensure_success(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("github returned {status}: {}", body.trim()))
}

fn decode_content(encoded: &str) -> anyhow::Result<String> {
    // The API wraps base64 at 60 columns.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .context("file content is not valid base64")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn append_line(existing: &str, stamp: &str) -> String {
    let mut out = existing.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("- ");
    out.push_str(stamp);
    out.push('\n');
    out
}

#[async_trait]
impl CommitClient for GithubCommitClient {
    #[instrument(skip_all, target = "executor", fields(owner = %req.owner, repo = %req.repo))]
    async fn create_commit(&self, req: &CommitRequest) -> anyhow::Result<CommitReceipt> {
        let current = self.fetch_current(req).await?;

        let (existing, sha) = match current {
            Some(file) => (decode_content(&file.content)?, Some(file.sha)),
            None => (String::new(), None),
        };

        let now = Utc::now();
        let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        let body = PutContents {
            message: format!("chore: activity {stamp}"),
            content: STANDARD.encode(append_line(&existing, &stamp)),
            sha,
            committer: Identity {
                name: &req.author_name,
                email: &req.author_email,
            },
            author: Identity {
                name: &req.author_name,
                email: &req.author_email,
            },
        };

        let resp = authorized(self.http.put(self.contents_url(req)), req)
            .json(&body)
            .send()
            .await
            .context("failed to reach github")?;

        let payload = ensure_success(resp)
            .await?
            .json::<PutResponse>()
            .await
            .context("unexpected commit payload")?;

        debug!(sha = %payload.commit.sha, "github accepted commit");

        Ok(CommitReceipt {
            sha: payload.commit.sha,
            date: payload.commit.committer.map(|c| c.date).unwrap_or(now),
        })
    }
}
