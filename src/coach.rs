//! Conversational coaching responder.
//!
//! Given the derived task summary and free-text input, produces either a
//! natural-language answer or a request to create a task. When a hosted
//! assistant is configured the remote path is tried first; any network,
//! timeout or parse failure degrades to the deterministic rule engine so
//! the user always gets an answer.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::dates;
use crate::fields::{parse_priority, Priority};
use crate::summary::TaskSummary;
use crate::task::{Category, TaskDraft};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// The remote run is polled once per second up to this many times.
const POLL_CEILING: u32 = 30;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A coach answer: a message, optionally a task to create, and whether the
/// rule engine produced it.
#[derive(Debug, Clone)]
pub struct CoachReply {
    pub message: String,
    pub task: Option<TaskDraft>,
    pub fallback: bool,
}

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("assistant request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("assistant run did not complete within {0} seconds")]
    Timeout(u64),

    #[error("assistant run ended in state '{0}'")]
    RunFailed(String),

    #[error("unexpected assistant response: {0}")]
    Protocol(String),
}

/// Client for the hosted assistant API (threads + runs).
pub struct AssistantClient {
    base_url: String,
    api_key: String,
    assistant_id: String,
    http: Client,
}

#[derive(Deserialize)]
struct RunRef {
    id: String,
    thread_id: String,
    status: String,
}

impl AssistantClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
    ) -> Result<Self, CoachError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("taskcoach/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(AssistantClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Run the assistant over the user input plus a summary snapshot and
    /// return the final assistant text.
    async fn ask(&self, summary: &TaskSummary, input: &str) -> Result<String, CoachError> {
        let prompt = format!(
            "{input}\n\nCurrent task snapshot: {}",
            serde_json::to_string(summary).unwrap_or_default()
        );

        let run: RunRef = self
            .http
            .post(self.endpoint("/v1/threads/runs"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "assistant_id": self.assistant_id,
                "thread": { "messages": [{ "role": "user", "content": prompt }] },
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(run_id = %run.id, "assistant run created");

        let mut status = run.status.clone();
        let mut polls = 0u32;
        while matches!(status.as_str(), "queued" | "in_progress") {
            if polls >= POLL_CEILING {
                return Err(CoachError::Timeout(POLL_CEILING as u64));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            polls += 1;
            let current: RunRef = self
                .http
                .get(self.endpoint(&format!(
                    "/v1/threads/{}/runs/{}",
                    run.thread_id, run.id
                )))
                .bearer_auth(&self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            status = current.status;
        }
        if status != "completed" {
            return Err(CoachError::RunFailed(status));
        }

        let messages: Value = self
            .http
            .get(self.endpoint(&format!(
                "/v1/threads/{}/messages?limit=1",
                run.thread_id
            )))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        messages["data"][0]["content"][0]["text"]["value"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CoachError::Protocol("no assistant message in thread".into()))
    }
}

/// The coaching responder: optional remote assistant plus the rule engine.
pub struct Coach {
    remote: Option<AssistantClient>,
}

impl Coach {
    pub fn new(remote: Option<AssistantClient>) -> Self {
        Coach { remote }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Answer free-text input. Never fails: remote errors degrade to the
    /// rule engine.
    pub async fn respond(
        &self,
        summary: &TaskSummary,
        categories: &[Category],
        input: &str,
    ) -> CoachReply {
        if let Some(client) = &self.remote {
            match client.ask(summary, input).await {
                Ok(text) => return parse_remote_reply(&text),
                Err(e) => {
                    warn!(error = %e, "remote coach unavailable, using rule engine");
                }
            }
        }
        rule_based_reply(summary, categories, input)
    }
}

/// Interpret the assistant's text, which may embed a JSON `create_task`
/// action. Unparseable structure falls back to plain text.
fn parse_remote_reply(text: &str) -> CoachReply {
    let mut message = text.trim().to_string();
    let mut task = None;

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                if value["action"] == "create_task" {
                    if let Ok(draft) =
                        serde_json::from_value::<TaskDraft>(value["task"].clone())
                    {
                        if !draft.title.trim().is_empty() {
                            task = Some(TaskDraft {
                                ai_generated: true,
                                ..draft
                            });
                        }
                    }
                    if let Some(note) = value["message"].as_str() {
                        message = note.to_string();
                    }
                }
            }
        }
    }

    CoachReply {
        message,
        task,
        fallback: false,
    }
}

const CREATE_TRIGGERS: [&str; 4] = ["add task", "create task", "new task", "remind me to"];

/// Case-insensitive search for an ASCII needle, returning a byte offset
/// valid in `haystack`. Offsets from a lowercased copy must not be used to
/// slice the original: `to_lowercase` can change byte lengths. A whole-byte
/// ASCII match starts and ends on char boundaries of the original.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

fn rfind_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .rposition(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Deterministic responder: keyword matching against the lowercased input,
/// formatted with live numbers from the summary.
pub fn rule_based_reply(
    summary: &TaskSummary,
    categories: &[Category],
    input: &str,
) -> CoachReply {
    let lower = input.to_lowercase();

    for trigger in CREATE_TRIGGERS {
        if let Some(pos) = find_ascii_ci(input, trigger) {
            let raw = input[pos + trigger.len()..].trim();
            return build_creation_reply(raw, &lower, categories);
        }
    }

    let message = if lower.contains("overdue") {
        if summary.overdue == 0 {
            "Nothing is overdue right now. Nice work staying on top of things.".to_string()
        } else {
            format!(
                "You have {} overdue task{}. Start with the oldest one and work forward.",
                summary.overdue,
                if summary.overdue == 1 { "" } else { "s" }
            )
        }
    } else if lower.contains("prioriti") || lower.contains("focus") || lower.contains("what should i")
    {
        if summary.urgent > 0 {
            format!(
                "Focus on your {} urgent task{} first, then the {} remaining high-priority ones.",
                summary.urgent,
                if summary.urgent == 1 { "" } else { "s" },
                summary.high_priority.saturating_sub(summary.urgent)
            )
        } else if summary.high_priority > 0 {
            format!(
                "No urgent items. Your {} high-priority task{} would be the best use of time.",
                summary.high_priority,
                if summary.high_priority == 1 { "" } else { "s" }
            )
        } else {
            "No high-priority work pending. Pick whatever moves a bigger goal forward.".to_string()
        }
    } else if lower.contains("today") {
        format!(
            "{} task{} due today and {} overdue. {} active in total.",
            summary.due_today,
            if summary.due_today == 1 { " is" } else { "s are" },
            summary.overdue,
            summary.active
        )
    } else if lower.contains("progress") || lower.contains("streak") || lower.contains("how am i")
    {
        format!(
            "You've completed {} of {} tasks ({}%). Current streak: {} day{}.",
            summary.completed,
            summary.total,
            summary.completion_rate,
            summary.streak_days,
            if summary.streak_days == 1 { "" } else { "s" }
        )
    } else {
        format!(
            "You have {} active task{}. Ask me what to prioritize, what's overdue, or tell me to add a task.",
            summary.active,
            if summary.active == 1 { "" } else { "s" }
        )
    };

    CoachReply {
        message,
        task: None,
        fallback: true,
    }
}

/// Extract a draft from a creation phrase: title text, a priority keyword,
/// a known category name and a natural due phrase.
fn build_creation_reply(raw_title: &str, lower: &str, categories: &[Category]) -> CoachReply {
    let mut title = raw_title
        .trim_start_matches("to ")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == ':' || c == '.')
        .trim()
        .to_string();

    if title.is_empty() {
        return CoachReply {
            message: "What should the task be called? Try: add task \"water the plants\"."
                .to_string(),
            task: None,
            fallback: true,
        };
    }

    let mut priority = Priority::Medium;
    for keyword in ["urgent", "critical", "asap", "high", "low"] {
        if lower.contains(keyword) {
            if let Some(p) = parse_priority(keyword) {
                priority = p;
                break;
            }
        }
    }

    let category = categories
        .iter()
        .find(|c| lower.contains(&c.name.to_lowercase()))
        .map(|c| c.name.clone());

    let mut due_date = None;
    for phrase in ["today", "tomorrow"] {
        if let Some(pos) = rfind_ascii_ci(&title, phrase) {
            due_date = dates::parse_due_input(phrase);
            title.truncate(pos);
            title = title.trim().trim_end_matches(',').to_string();
            break;
        }
    }

    let message = format!("Added \"{title}\" to your list.");
    CoachReply {
        message,
        task: Some(TaskDraft {
            title,
            priority,
            category,
            due_date,
            ai_generated: true,
            ..TaskDraft::default()
        }),
        fallback: true,
    }
}
