use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{AiInsights, Tags};

/// A note as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
	/// Taken from the document key, not from the stored fields.
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub tags: Tags,
	#[serde(default, with = "crate::time_serde::option")]
	pub created_at: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option")]
	pub updated_at: Option<OffsetDateTime>,
	pub workspace_id: String,
	#[serde(default)]
	pub ai_insights: AiInsights,
}

/// The editable part of a note. Equality over this type decides whether an editor has unsaved
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
	pub id: Option<String>,
	pub title: String,
	pub content: String,
	pub tags: Tags,
}
impl NoteDraft {
	pub fn is_new(&self) -> bool {
		self.id.is_none()
	}
}
impl From<&Note> for NoteDraft {
	fn from(note: &Note) -> Self {
		Self {
			id: Some(note.id.clone()),
			title: note.title.clone(),
			content: note.content.clone(),
			tags: note.tags.clone(),
		}
	}
}
