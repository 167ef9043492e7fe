use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Note;

/// Ordered set of normalized tags. Insertion order is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);
impl Tags {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `raw` after normalization. Returns `false` when the tag is empty or already present.
	pub fn insert(&mut self, raw: &str) -> bool {
		let Some(tag) = normalize_tag(raw) else {
			return false;
		};

		if self.0.contains(&tag) {
			return false;
		}

		self.0.push(tag);

		true
	}

	pub fn remove(&mut self, raw: &str) -> bool {
		let Some(tag) = normalize_tag(raw) else {
			return false;
		};
		let before = self.0.len();

		self.0.retain(|existing| existing != &tag);

		self.0.len() != before
	}

	pub fn contains(&self, raw: &str) -> bool {
		normalize_tag(raw).map(|tag| self.0.contains(&tag)).unwrap_or(false)
	}

	pub fn as_slice(&self) -> &[String] {
		&self.0
	}

	pub fn iter(&self) -> std::slice::Iter<'_, String> {
		self.0.iter()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<Vec<String>> for Tags {
	fn from(raw: Vec<String>) -> Self {
		let mut tags = Self::new();

		for tag in &raw {
			tags.insert(tag);
		}

		tags
	}
}
impl From<Tags> for Vec<String> {
	fn from(tags: Tags) -> Self {
		tags.0
	}
}
impl<'a> IntoIterator for &'a Tags {
	type IntoIter = std::slice::Iter<'a, String>;
	type Item = &'a String;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
	pub name: String,
	pub count: usize,
}

/// Strips one leading `#`, trims and lowercases. Empty tags are rejected.
pub fn normalize_tag(raw: &str) -> Option<String> {
	let trimmed = raw.trim();
	let without_hash = trimmed.strip_prefix('#').unwrap_or(trimmed).trim();

	if without_hash.is_empty() {
		return None;
	}

	Some(without_hash.to_lowercase())
}

/// Counts tag usage across `notes`, most used first and ties broken by name.
pub fn tag_counts(notes: &[Note]) -> Vec<TagCount> {
	let mut counts: HashMap<&str, usize> = HashMap::new();

	for note in notes {
		for tag in &note.tags {
			*counts.entry(tag.as_str()).or_default() += 1;
		}
	}

	let mut out: Vec<TagCount> = counts
		.into_iter()
		.map(|(name, count)| TagCount { name: name.to_string(), count })
		.collect();

	out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

	out
}
