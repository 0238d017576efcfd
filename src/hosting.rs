//! # Hosting Provider
//!
//! Narrow interface to the destination forge's repository API: list the
//! repositories of an organization, create one, delete one. The pipeline
//! itself never calls it; only the `preview` housekeeping does.
//!
//! [`GitHubClient`] is a blocking client for the GitHub REST API authenticated
//! with a personal access token.

use crate::config::Config;
use crate::error::{Error, Result};
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// Repository administration on the destination forge.
pub trait HostingProvider: Send + Sync {
    /// Full names (`org/name`) of every repository in `org`.
    fn list_repositories(&self, org: &str) -> Result<Vec<String>>;

    fn create_repository(&self, org: &str, name: &str) -> Result<()>;

    fn delete_repository(&self, full_name: &str) -> Result<()>;
}

const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct RepoSummary {
    full_name: String,
}

/// GitHub REST API client.
pub struct GitHubClient {
    agent: ureq::Agent,
    api_url: String,
    login: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, login: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            login: login.into(),
            token: token.into(),
        }
    }

    /// Builds a client from the `github_*` configuration keys.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.github_password.is_empty() {
            return Err(Error::Config {
                message: "'github_password' is required for hosting operations".to_string(),
                hint: Some("Use a personal access token with repo and delete_repo scopes".to_string()),
            });
        }
        Ok(Self::new(
            &config.github_api_url,
            &config.github_login,
            &config.github_password,
        ))
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.api_url, path);
        debug!("{} {}", method, url);
        let user_agent = if self.login.is_empty() {
            "repo-migrate".to_string()
        } else {
            format!("repo-migrate ({})", self.login)
        };
        self.agent
            .request(method, &url)
            .set("Accept", "application/vnd.github+json")
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("User-Agent", &user_agent)
    }
}

fn hosting_error(operation: impl Into<String>, error: ureq::Error) -> Error {
    let message = match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            format!("HTTP {}: {}", code, body.trim())
        }
        ureq::Error::Transport(transport) => transport.to_string(),
    };
    Error::Hosting {
        operation: operation.into(),
        message,
    }
}

impl HostingProvider for GitHubClient {
    fn list_repositories(&self, org: &str) -> Result<Vec<String>> {
        let operation = format!("list repositories of {}", org);
        let mut names = Vec::new();
        for page in 1.. {
            let path = format!("/orgs/{}/repos?per_page={}&page={}", org, PAGE_SIZE, page);
            let response = self
                .request("GET", &path)
                .call()
                .map_err(|e| hosting_error(operation.as_str(), e))?;
            let repos: Vec<RepoSummary> = response.into_json().map_err(|e| Error::Hosting {
                operation: operation.clone(),
                message: e.to_string(),
            })?;
            let last_page = repos.len() < PAGE_SIZE;
            names.extend(repos.into_iter().map(|repo| repo.full_name));
            if last_page {
                break;
            }
        }
        Ok(names)
    }

    fn create_repository(&self, org: &str, name: &str) -> Result<()> {
        self.request("POST", &format!("/orgs/{}/repos", org))
            .send_json(serde_json::json!({ "name": name }))
            .map_err(|e| hosting_error(format!("create {}/{}", org, name), e))?;
        Ok(())
    }

    fn delete_repository(&self, full_name: &str) -> Result<()> {
        self.request("DELETE", &format!("/repos/{}", full_name))
            .call()
            .map_err(|e| hosting_error(format!("delete {}", full_name), e))?;
        Ok(())
    }
}
