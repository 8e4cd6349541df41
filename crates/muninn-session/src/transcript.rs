//! Transcript analysis (spec.md §4.9 "Learning extraction", §6
//! "Transcript-analysis prompt"): an external collaborator the session-end
//! path calls when `analyze` is requested, modeled on the teacher's
//! `MemoryLlmClient`/`NoopClient` split.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractedLearning {
    pub title: String,
    pub content: String,
    pub category: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TranscriptAnalysis {
    pub goal: Option<String>,
    pub outcome: Option<String>,
    #[serde(default)]
    pub learnings: Vec<ExtractedLearning>,
    pub next_steps: Option<String>,
}

#[async_trait]
pub trait TranscriptAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        goal: Option<&str>,
        files_modified: &[String],
        transcript_tail: &str,
    ) -> Result<TranscriptAnalysis>;
}

/// Used when `analyze` was not requested, or no transcript was captured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalyzer;

#[async_trait]
impl TranscriptAnalyzer for NoopAnalyzer {
    async fn analyze(&self, _: Option<&str>, _: &[String], _: &str) -> Result<TranscriptAnalysis> {
        Ok(TranscriptAnalysis::default())
    }
}

/// Strips a single fenced ```json ... ``` (or bare ```) block wrapping the
/// payload (spec.md §6: "accepts both raw JSON and JSON inside fenced code
/// blocks").
fn unfence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug)]
pub struct ApiAnalyzer {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ApiAnalyzer {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

const TRANSCRIPT_TAIL_LIMIT: usize = 12 * 1024;
const MAX_FILES_IN_PROMPT: usize = 20;

#[async_trait]
impl TranscriptAnalyzer for ApiAnalyzer {
    async fn analyze(
        &self,
        goal: Option<&str>,
        files_modified: &[String],
        transcript_tail: &str,
    ) -> Result<TranscriptAnalysis> {
        let tail = tail_bytes(transcript_tail, TRANSCRIPT_TAIL_LIMIT);
        let files: Vec<&String> = files_modified.iter().take(MAX_FILES_IN_PROMPT).collect();

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": "Extract session learnings as JSON."},
                    {"role": "user", "content": serde_json::json!({
                        "goal": goal,
                        "files_modified": files,
                        "transcript_tail": tail,
                    }).to_string()},
                ],
                "temperature": 0.1,
            }))
            .send()
            .await
            .context("transcript analysis request failed")?;

        if !response.status().is_success() {
            bail!("transcript analysis returned status {}", response.status());
        }

        let body: serde_json::Value = response.json().await.context("parsing transcript analysis response")?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .context("transcript analysis response missing message content")?;

        serde_json::from_str(unfence(content)).context("parsing transcript analysis JSON payload")
    }
}

fn tail_bytes(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let start = s.len() - limit;
    let mut idx = start;
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    &s[idx..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfence_strips_json_block() {
        let wrapped = "```json\n{\"goal\":null,\"learnings\":[]}\n```";
        assert_eq!(unfence(wrapped), "{\"goal\":null,\"learnings\":[]}");
    }

    #[test]
    fn test_unfence_passes_through_raw_json() {
        assert_eq!(unfence("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_tail_bytes_respects_char_boundaries() {
        let s = "日本語".repeat(10);
        let tailed = tail_bytes(&s, 5);
        assert!(s.ends_with(tailed));
    }

    #[tokio::test]
    async fn test_noop_analyzer_returns_empty() {
        let analysis = NoopAnalyzer.analyze(None, &[], "").await.unwrap();
        assert!(analysis.learnings.is_empty());
    }
}
