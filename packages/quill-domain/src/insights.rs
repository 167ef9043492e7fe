use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Sparse AI overlay on a note. A missing field was never computed; an empty list was computed
/// and found nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key_insights: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub action_items: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub suggested_tags: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none", with = "crate::time_serde::option")]
	pub last_processed: Option<OffsetDateTime>,
}
impl AiInsights {
	/// Applies one operation's result. Fields owned by other operations are left untouched.
	pub fn merge(&mut self, update: InsightUpdate, now: OffsetDateTime) {
		match update {
			InsightUpdate::Summary { summary, key_insights } => {
				self.summary = Some(summary);
				self.key_insights = Some(key_insights);
			},
			InsightUpdate::ActionItems(items) => self.action_items = Some(items),
			InsightUpdate::SuggestedTags(tags) => self.suggested_tags = Some(tags),
		}

		self.last_processed = Some(now);
	}

	pub fn is_empty(&self) -> bool {
		self.summary.is_none()
			&& self.key_insights.is_none()
			&& self.action_items.is_none()
			&& self.suggested_tags.is_none()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
	Summarize,
	ActionItems,
	SuggestTags,
}
impl InsightKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Summarize => "summarize",
			Self::ActionItems => "action_items",
			Self::SuggestTags => "suggest_tags",
		}
	}
}
impl std::fmt::Display for InsightKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightUpdate {
	Summary { summary: String, key_insights: Vec<String> },
	ActionItems(Vec<String>),
	SuggestedTags(Vec<String>),
}
impl InsightUpdate {
	pub fn kind(&self) -> InsightKind {
		match self {
			Self::Summary { .. } => InsightKind::Summarize,
			Self::ActionItems(_) => InsightKind::ActionItems,
			Self::SuggestedTags(_) => InsightKind::SuggestTags,
		}
	}
}
