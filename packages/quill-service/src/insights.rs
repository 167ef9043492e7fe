//! AI insight operations. Each one renders its prompt around the note content, asks the
//! completion provider for a JSON object, and checks the object's shape before handing it back.

use std::sync::Arc;

use serde_json::{Value, json};

use quill_config::LlmProviderConfig;
use quill_domain::{InsightKind, InsightUpdate};

use crate::{CompletionProvider, Error, Result};

const CONTENT_SLOT: &str = "{noteContent}";
const MAX_ACTION_ITEMS: usize = 10;
const MAX_SUGGESTED_TAGS: usize = 5;
const MAX_KEY_INSIGHTS: usize = 5;
const MAX_SUMMARY_WORDS: usize = 50;

const SUMMARIZE_PROMPT: &str = r#"You are analyzing a user's note. Provide a concise summary and extract key insights.

Note content:
"""
{noteContent}
"""

Return ONLY a JSON object with this structure:
{
  "summary": "1-2 sentence summary",
  "keyInsights": ["insight 1", "insight 2", "insight 3"]
}

Rules:
- Summary must be under 50 words
- Key insights: 3-5 bullet points
- Extract what's actually written, don't invent
- Be concise and clear"#;

const ACTION_ITEMS_PROMPT: &str = r#"You are extracting action items from a note.

Note content:
"""
{noteContent}
"""

Return ONLY a JSON object:
{
  "actionItems": ["task 1", "task 2", "task 3"]
}

Rules:
- Only include clear action items (verbs like: do, call, email, schedule, research)
- Rephrase as actionable tasks starting with verbs
- If no tasks found, return empty array
- Max 10 tasks"#;

const SUGGEST_TAGS_PROMPT: &str = r#"You are suggesting organizational tags for a note.

Note content:
"""
{noteContent}
"""

Return ONLY a JSON object:
{
  "suggestedTags": ["tag1", "tag2", "tag3"]
}

Rules:
- Suggest 3-5 relevant tags
- Tags should be lowercase, single words or hyphenated phrases
- Focus on topics, categories, projects
- Don't include overly generic tags like "note" or "text"
- Examples: "meeting", "project-alpha", "research", "client-work""#;

/// Result of one operation inside [`InsightClient::run_all`].
#[derive(Debug)]
pub struct InsightOutcome {
	pub kind: InsightKind,
	pub result: Result<InsightUpdate>,
}

#[derive(Clone)]
pub struct InsightClient {
	cfg: LlmProviderConfig,
	provider: Arc<dyn CompletionProvider>,
}
impl InsightClient {
	pub fn new(cfg: LlmProviderConfig, provider: Arc<dyn CompletionProvider>) -> Self {
		Self { cfg, provider }
	}

	pub async fn summarize_note(&self, content: &str) -> Result<InsightUpdate> {
		self.request(InsightKind::Summarize, content).await
	}

	pub async fn extract_action_items(&self, content: &str) -> Result<InsightUpdate> {
		self.request(InsightKind::ActionItems, content).await
	}

	pub async fn suggest_tags(&self, content: &str) -> Result<InsightUpdate> {
		self.request(InsightKind::SuggestTags, content).await
	}

	/// Runs one operation. Empty content is rejected before anything is sent.
	pub async fn request(&self, kind: InsightKind, content: &str) -> Result<InsightUpdate> {
		if content.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "Note content is required for AI insights.".to_string(),
			});
		}

		let messages = [json!({ "role": "user", "content": render_prompt(kind, content) })];
		let reply = self.provider.complete(&self.cfg, &messages).await.map_err(|err| {
			tracing::warn!(kind = %kind, error = %err, "Insight request failed.");

			match err {
				Error::AiRequestFailure { .. } => err,
				other => Error::AiRequestFailure { message: other.to_string() },
			}
		})?;
		let update = parse_reply(kind, &reply);

		if let Err(err) = &update {
			tracing::warn!(kind = %kind, error = %err, "Insight reply was rejected.");
		}

		update
	}

	/// Runs all three operations concurrently. Each outcome is reported on its own; one failure
	/// does not affect the others.
	pub async fn run_all(&self, content: &str) -> Vec<InsightOutcome> {
		let (summary, action_items, tags) = tokio::join!(
			self.summarize_note(content),
			self.extract_action_items(content),
			self.suggest_tags(content),
		);

		vec![
			InsightOutcome { kind: InsightKind::Summarize, result: summary },
			InsightOutcome { kind: InsightKind::ActionItems, result: action_items },
			InsightOutcome { kind: InsightKind::SuggestTags, result: tags },
		]
	}
}

pub fn render_prompt(kind: InsightKind, content: &str) -> String {
	let template = match kind {
		InsightKind::Summarize => SUMMARIZE_PROMPT,
		InsightKind::ActionItems => ACTION_ITEMS_PROMPT,
		InsightKind::SuggestTags => SUGGEST_TAGS_PROMPT,
	};

	template.replacen(CONTENT_SLOT, content, 1)
}

/// Checks the reply shape for `kind`. Required keys and element types are strict; list lengths
/// and the summary word count are upper bounds.
pub fn parse_reply(kind: InsightKind, reply: &Value) -> Result<InsightUpdate> {
	match kind {
		InsightKind::Summarize => {
			let summary = reply
				.get("summary")
				.and_then(Value::as_str)
				.ok_or_else(|| invalid_reply("summary must be a string"))?
				.trim()
				.to_string();
			let words = summary.split_whitespace().count();

			if words > MAX_SUMMARY_WORDS {
				return Err(invalid_reply(&format!(
					"summary has {words} words; the limit is {MAX_SUMMARY_WORDS}"
				)));
			}

			let key_insights = string_list(reply, "keyInsights", MAX_KEY_INSIGHTS)?;

			Ok(InsightUpdate::Summary { summary, key_insights })
		},
		InsightKind::ActionItems =>
			Ok(InsightUpdate::ActionItems(string_list(reply, "actionItems", MAX_ACTION_ITEMS)?)),
		InsightKind::SuggestTags => Ok(InsightUpdate::SuggestedTags(string_list(
			reply,
			"suggestedTags",
			MAX_SUGGESTED_TAGS,
		)?)),
	}
}

fn string_list(reply: &Value, key: &str, max: usize) -> Result<Vec<String>> {
	let items = reply
		.get(key)
		.and_then(Value::as_array)
		.ok_or_else(|| invalid_reply(&format!("{key} must be an array")))?;

	if items.len() > max {
		return Err(invalid_reply(&format!("{key} has {} entries; the limit is {max}", items.len())));
	}

	items
		.iter()
		.map(|item| {
			item.as_str()
				.map(|text| text.trim().to_string())
				.ok_or_else(|| invalid_reply(&format!("{key} must contain only strings")))
		})
		.collect()
}

fn invalid_reply(message: &str) -> Error {
	Error::AiRequestFailure { message: format!("Invalid AI reply: {message}.") }
}
