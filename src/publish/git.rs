//! Git publisher
//!
//! Clones the target repository into a temporary directory, writes the batch on
//! a fresh `<prefix>-<unix timestamp>-<run tag>` branch, commits, and pushes
//! that branch.
//! The temporary clone is removed whether or not the push succeeds.

use crate::config::PublishConfig;
use crate::publish::{PublishBatch, PublishError, PublishReceipt, Publisher};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use tokio::process::Command;
use url::Url;
use uuid::Uuid;

const COMMITTER_NAME: &str = "pomforge";
const COMMITTER_EMAIL: &str = "pomforge@users.noreply.github.com";
const RUN_TAG_LEN: usize = 8;

pub struct GitPublisher {
    repo_url: String,
    token: Option<String>,
    branch_prefix: String,
    commit_message: String,
}

impl GitPublisher {
    /// `token`, when given, is injected into https clone URLs
    pub fn new(
        repo_url: impl Into<String>,
        token: Option<String>,
        branch_prefix: impl Into<String>,
        commit_message: impl Into<String>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            token,
            branch_prefix: branch_prefix.into(),
            commit_message: commit_message.into(),
        }
    }

    /// Builds a publisher from config, reading the token from its env var
    pub fn from_config(config: &PublishConfig) -> Result<Self, PublishError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PublishError::MissingToken(config.token_env.clone()))?;

        Ok(Self::new(
            config.repo_url.clone(),
            Some(token),
            config.branch_prefix.clone(),
            config.commit_message.clone(),
        ))
    }

    /// Runs publishing in the same second still get distinct branches
    fn branch_name(&self, run_id: Option<&str>) -> String {
        format!(
            "{}-{}-{}",
            self.branch_prefix,
            Utc::now().timestamp(),
            run_tag(run_id)
        )
    }

    /// Remote URL with credentials for https remotes
    fn authenticated_url(&self) -> Result<String, PublishError> {
        let token = match &self.token {
            Some(token) if self.repo_url.starts_with("https://") => token,
            _ => return Ok(self.repo_url.clone()),
        };

        let mut url = Url::parse(&self.repo_url)
            .map_err(|e| PublishError::InvalidRepoUrl(e.to_string()))?;
        url.set_username("x-access-token")
            .and_then(|_| url.set_password(Some(token)))
            .map_err(|_| PublishError::InvalidRepoUrl(self.repo_url.clone()))?;
        Ok(url.to_string())
    }

    /// Hides the token in anything that ends up in logs or errors
    fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => text.replace(token.as_str(), "***"),
            _ => text.to_string(),
        }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<(), PublishError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        if !output.status.success() {
            let command = args.first().copied().unwrap_or_default().to_string();
            return Err(PublishError::Git {
                command,
                stderr: self.redact(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }
        Ok(())
    }

    async fn publish_in(
        &self,
        workspace: &Path,
        batch: &PublishBatch,
    ) -> Result<PublishReceipt, PublishError> {
        let remote = self.authenticated_url()?;
        let checkout = workspace.join("repo");
        let checkout_arg = checkout.to_string_lossy().to_string();

        self.git(workspace, &["clone", "--quiet", remote.as_str(), checkout_arg.as_str()])
            .await?;

        let branch = self.branch_name(batch.run_id());
        self.git(&checkout, &["checkout", "-b", branch.as_str()]).await?;

        for (path, content) in batch.files() {
            let target = checkout.join(safe_relative_path(path)?);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await?;
        }

        self.git(&checkout, &["add", "--all"]).await?;
        let name = format!("user.name={}", COMMITTER_NAME);
        let email = format!("user.email={}", COMMITTER_EMAIL);
        self.git(
            &checkout,
            &[
                "-c",
                name.as_str(),
                "-c",
                email.as_str(),
                "commit",
                "--quiet",
                "-m",
                self.commit_message.as_str(),
            ],
        )
        .await?;

        let refspec = format!("{0}:{0}", branch);
        self.git(&checkout, &["push", "--quiet", "origin", refspec.as_str()])
            .await?;

        Ok(PublishReceipt { branch })
    }
}

/// Short ref-safe tag taken from the run id, or random without one
fn run_tag(run_id: Option<&str>) -> String {
    let tag: String = run_id
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(RUN_TAG_LEN)
        .collect();

    if tag.is_empty() {
        Uuid::new_v4().simple().to_string()[..RUN_TAG_LEN].to_string()
    } else {
        tag.to_ascii_lowercase()
    }
}

/// Rejects absolute paths and `..` so files stay inside the clone
fn safe_relative_path(path: &str) -> Result<PathBuf, PublishError> {
    let candidate = Path::new(path);
    let safe = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if safe {
        Ok(candidate.to_path_buf())
    } else {
        Err(PublishError::InvalidPath(path.to_string()))
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(&self, batch: &PublishBatch) -> Result<PublishReceipt, PublishError> {
        if batch.is_empty() {
            return Err(PublishError::EmptyBatch);
        }

        let workspace = tempfile::Builder::new().prefix("pomforge-repo-").tempdir()?;
        let result = self.publish_in(workspace.path(), batch).await;

        match &result {
            Ok(receipt) => tracing::info!(
                "Pushed {} files to branch {}",
                batch.len(),
                receipt.branch
            ),
            Err(e) => tracing::error!(
                "Publishing to {} failed: {}",
                self.redact(&self.repo_url),
                e
            ),
        }

        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to clean up publish workspace: {}", e);
        }
        result
    }
}
