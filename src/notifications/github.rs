//! GitHub pull request comments

use anyhow::Result;
use serde_json::json;
use std::env;

use crate::config::GithubConfig;

/// Post the coverage summary as a comment on the pull request
pub async fn post_pr_comment(config: &GithubConfig, body: &str) -> Result<()> {
    // Get token from config or environment
    let token = config
        .token
        .clone()
        .or_else(|| env::var("GITHUB_TOKEN").ok())
        .ok_or_else(|| anyhow::anyhow!("GitHub token not found"))?;

    // Set by GitHub Actions
    let repo = env::var("GITHUB_REPOSITORY")
        .ok()
        .ok_or_else(|| anyhow::anyhow!("GITHUB_REPOSITORY not set"))?;

    let number = config
        .pull_request
        .or_else(|| env::var("GITHUB_REF").ok().and_then(|r| pull_request_from_ref(&r)))
        .ok_or_else(|| anyhow::anyhow!("Pull request number not found"))?;

    let url = format!(
        "https://api.github.com/repos/{}/issues/{}/comments",
        repo, number
    );

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .header("Authorization", format!("token {}", token))
        .header("User-Agent", "jacoco-gate")
        .header("Accept", "application/vnd.github.v3+json")
        .json(&json!({ "body": body }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("GitHub comment failed: {} - {}", status, text);
    }

    tracing::debug!(pull_request = number, "posted coverage comment");

    Ok(())
}

/// `refs/pull/42/merge` -> 42
pub fn pull_request_from_ref(git_ref: &str) -> Option<u64> {
    let rest = git_ref.strip_prefix("refs/pull/")?;
    let (number, _) = rest.split_once('/')?;
    number.parse().ok()
}
