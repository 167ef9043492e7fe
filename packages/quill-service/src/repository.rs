//! Notes as documents in the `notes` collection, scoped by `workspaceId`.

use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use quill_domain::{GuestQuota, Identity, Note, NoteDraft, TagCount, tag_counts};
use quill_store::{
	DocPath, Document, FieldValue, Fields, MergePolicy, Query, RemoteStore, SortDirection,
	Subscription,
};

use crate::{Error, Result};

pub const NOTES_COLLECTION: &str = "notes";

const WORKSPACE_FIELD: &str = "workspaceId";
const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Clone)]
pub struct NoteRepository {
	store: Arc<dyn RemoteStore>,
	quota: GuestQuota,
}
impl NoteRepository {
	pub fn new(store: Arc<dyn RemoteStore>, quota: GuestQuota) -> Self {
		Self { store, quota }
	}

	/// Live list of the workspace's notes, most recently updated first. Each change delivers the
	/// full list again.
	pub async fn observe(&self, workspace_id: &str) -> Result<Subscription<Vec<Note>, Error>> {
		let query = workspace_query(workspace_id);
		let feed = self.store.watch_query(&query).await?;

		Ok(feed.map(|docs: Vec<Document>| {
			docs.iter().map(decode_note).collect::<quill_store::Result<Vec<_>>>().map_err(Error::from)
		}))
	}

	/// Current contents of `observe`, read once.
	pub async fn snapshot(&self, workspace_id: &str) -> Result<Vec<Note>> {
		let mut feed = self.observe(workspace_id).await?;

		match feed.next().await {
			Some(notes) => notes,
			None => Err(quill_store::Error::Closed { label: feed.label().to_string() }.into()),
		}
	}

	/// Live tag usage across the workspace, most used first.
	pub async fn observe_tags(&self, workspace_id: &str) -> Result<Subscription<Vec<TagCount>, Error>> {
		let notes = self.observe(workspace_id).await?;

		Ok(notes.map(|notes: Vec<Note>| Ok::<_, Error>(tag_counts(&notes))))
	}

	/// Creates a note and returns its id. Guests at their quota get `QuotaExceeded` and nothing
	/// is written.
	pub async fn create(
		&self,
		identity: &Identity,
		workspace_id: &str,
		title: &str,
		content: &str,
	) -> Result<String> {
		if identity.is_guest {
			let existing = self.snapshot(workspace_id).await?.len();

			if let Err(err) = self.quota.check(identity, existing) {
				tracing::info!(
					user_id = %identity.user_id,
					workspace_id,
					existing,
					"Guest note quota reached."
				);

				return Err(err.into());
			}
		}

		let note_id = Uuid::new_v4().simple().to_string();
		let mut fields = Fields::new();

		fields.insert("title".to_string(), FieldValue::from(json!(title)));
		fields.insert("content".to_string(), FieldValue::from(json!(content)));
		fields.insert("tags".to_string(), FieldValue::from(json!([])));
		fields.insert(WORKSPACE_FIELD.to_string(), FieldValue::from(json!(workspace_id)));
		fields.insert("aiInsights".to_string(), FieldValue::from(json!({})));
		fields.insert("createdAt".to_string(), FieldValue::ServerTimestamp);
		fields.insert(UPDATED_AT_FIELD.to_string(), FieldValue::ServerTimestamp);

		self.store
			.upsert(&DocPath::new(NOTES_COLLECTION, note_id.as_str()), fields, MergePolicy::Replace)
			.await?;

		tracing::info!(workspace_id, note_id = %note_id, "Note created.");

		Ok(note_id)
	}

	/// Live view of one note. Every value is `NotFound` while the document is missing and
	/// `PermissionDenied` when it belongs to another workspace.
	pub async fn fetch_one(
		&self,
		workspace_id: &str,
		note_id: &str,
	) -> Result<Subscription<Note, Error>> {
		let path = DocPath::new(NOTES_COLLECTION, note_id);
		let feed = self.store.watch_document(&path).await?;
		let workspace_id = workspace_id.to_string();

		Ok(feed.map(move |doc: Option<Document>| {
			let Some(doc) = doc else {
				return Err(Error::NotFound { message: format!("Note {path} does not exist.") });
			};

			// Checked on the raw document so nothing else is decoded for a foreign workspace.
			if doc.data.get(WORKSPACE_FIELD).and_then(Value::as_str) != Some(workspace_id.as_str()) {
				return Err(Error::PermissionDenied {
					message: format!("Note {path} is not in workspace {workspace_id}."),
				});
			}

			Ok(decode_note(&doc)?)
		}))
	}

	/// Merges the draft's editable fields into the stored note and refreshes `updatedAt`.
	/// Fields the draft does not carry, such as `aiInsights`, are left as stored.
	pub async fn update(&self, workspace_id: &str, draft: &NoteDraft) -> Result<()> {
		let Some(note_id) = draft.id.as_deref() else {
			return Err(Error::InvalidRequest {
				message: "Cannot update a note that has no id.".to_string(),
			});
		};
		let tags = serde_json::to_value(&draft.tags)
			.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;
		let mut fields = Fields::new();

		fields.insert("title".to_string(), FieldValue::from(json!(draft.title)));
		fields.insert("content".to_string(), FieldValue::from(json!(draft.content)));
		fields.insert("tags".to_string(), FieldValue::from(tags));
		fields.insert(WORKSPACE_FIELD.to_string(), FieldValue::from(json!(workspace_id)));
		fields.insert(UPDATED_AT_FIELD.to_string(), FieldValue::ServerTimestamp);

		self.store
			.upsert(&DocPath::new(NOTES_COLLECTION, note_id), fields, MergePolicy::Merge)
			.await?;

		tracing::debug!(workspace_id, note_id, "Note updated.");

		Ok(())
	}
}

fn workspace_query(workspace_id: &str) -> Query {
	Query::collection(NOTES_COLLECTION)
		.where_eq(WORKSPACE_FIELD, workspace_id)
		.order_by(UPDATED_AT_FIELD, SortDirection::Descending)
}

fn decode_note(doc: &Document) -> quill_store::Result<Note> {
	let mut note: Note = doc.decode()?;

	note.id = doc.id.clone();

	Ok(note)
}
