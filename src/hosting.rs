//! The destination hosting service.
//!
//! [`HostingApi`] is the narrow slice of the GitHub REST API a migration
//! needs. [`GithubClient`] implements it with blocking `ureq` calls; tests
//! substitute an in-memory double.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::rename::RepoInfo;

pub const GITHUB_API: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

/// Operations consumed from the hosting platform.
///
/// Every method maps a non-success HTTP status to [`Error::Http`] carrying
/// that status, so callers can branch on it.
pub trait HostingApi {
    /// List commits of `owner/repo`.
    ///
    /// Used only as an existence check: success means the repository exists
    /// and has history, 404 means it does not exist, 409 means it exists but
    /// is empty.
    fn list_commits(&self, owner: &str, repo: &str) -> Result<()>;

    /// Create a repository in `org`.
    fn create_in_org(&self, org: &str, request: &CreateRepo) -> Result<()>;

    /// Replace all topics of `owner/repo` with `names`.
    fn replace_all_topics(&self, owner: &str, repo: &str, names: &[String]) -> Result<()>;

    /// Git URL the migrated branches and tags are pushed to.
    fn push_url(&self, info: &RepoInfo) -> String {
        info.ssh_url.clone()
    }
}

/// Body of a create-repository request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRepo {
    pub name: String,
    pub visibility: String,
    pub custom_properties: BTreeMap<String, String>,
}

impl CreateRepo {
    /// The request every migrated IOC repository is created with.
    pub fn epics_ioc(name: &str) -> Self {
        let custom_properties = [
            ("type", "EPICS IOC"),
            ("protect_default", "true"),
            ("protect_master", "true"),
            ("protect_gh_pages", "false"),
            ("required_checks", "None"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            name: name.to_string(),
            visibility: "public".to_string(),
            custom_properties,
        }
    }
}

#[derive(Serialize)]
struct Topics<'a> {
    names: &'a [String],
}

// ---------------------------------------------------------------------------
// GithubClient
// ---------------------------------------------------------------------------

/// Blocking GitHub REST client.
///
/// Requires a fine-grained token with Administration (read/write), Contents
/// (read/write), Custom properties (read/write) and Metadata (read).
pub struct GithubClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(GITHUB_API, token)
    }

    /// Point the client at another API root (a GitHub Enterprise host or a
    /// local test server).
    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("afs-ioc-migration/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        debug!("{method} {url}");
        let req = self
            .agent
            .request(method, &url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }
}

impl HostingApi for GithubClient {
    fn list_commits(&self, owner: &str, repo: &str) -> Result<()> {
        let resp = self
            .request("GET", &format!("/repos/{owner}/{repo}/commits"))
            .query("per_page", "1")
            .call();
        check(resp)
    }

    fn create_in_org(&self, org: &str, request: &CreateRepo) -> Result<()> {
        let resp = self
            .request("POST", &format!("/orgs/{org}/repos"))
            .send_json(request);
        check(resp)
    }

    fn replace_all_topics(&self, owner: &str, repo: &str, names: &[String]) -> Result<()> {
        let resp = self
            .request("PUT", &format!("/repos/{owner}/{repo}/topics"))
            .send_json(Topics { names });
        check(resp)
    }
}

fn check(resp: std::result::Result<ureq::Response, ureq::Error>) -> Result<()> {
    match resp {
        Ok(_) => Ok(()),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(Error::http(status, error_message(&body)))
        }
        Err(ureq::Error::Transport(t)) => Err(Error::transport(t.to_string())),
    }
}

/// Pull `message` out of a GitHub error body, or return the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
