//! Autosaving editor for one note.
//!
//! A session owns a draft and the last snapshot known to be persisted. Mutations that leave the
//! draft different from the snapshot make the session `Dirty` and restart the debounce timer;
//! when the timer elapses the draft is persisted. New drafts are created on their first persist
//! and keep editing the created note afterwards.

use std::{pin::Pin, time::Duration};

use time::OffsetDateTime;
use tokio::{sync::mpsc, time::Sleep};

use quill_domain::{
	AiInsights, Identity, InsightKind, InsightUpdate, Note, NoteDraft, Tags, normalize_tag,
};

use crate::{InsightClient, NoteRepository, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Clean,
	Dirty,
	Saving,
	Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
	StateChanged(SessionState),
	/// The draft was persisted for the first time and now has an id.
	Created { note_id: String },
	Saved { note_id: String },
	SaveFailed { message: String },
	InsightReady { kind: InsightKind },
	InsightFailed { kind: InsightKind, message: String },
}

/// Input for [`EditorSession::run`].
#[derive(Debug, Clone)]
pub enum Edit {
	SetTitle(String),
	SetContent(String),
	AddTag(String),
	RemoveTag(String),
	AddSuggestedTag(String),
	/// A newer copy of the note from its live subscription.
	Remote(Note),
	SaveNow,
	RequestInsight(InsightKind),
	RequestAllInsights,
}

pub struct EditorSession {
	repo: NoteRepository,
	ai: InsightClient,
	identity: Identity,
	workspace_id: String,
	debounce: Duration,
	draft: NoteDraft,
	snapshot: NoteDraft,
	insights: AiInsights,
	state: SessionState,
	deadline: Option<Pin<Box<Sleep>>>,
	events: Option<mpsc::UnboundedSender<SessionEvent>>,
}
impl EditorSession {
	pub fn new_draft(
		repo: NoteRepository,
		ai: InsightClient,
		identity: Identity,
		workspace_id: impl Into<String>,
		debounce: Duration,
	) -> Self {
		Self {
			repo,
			ai,
			identity,
			workspace_id: workspace_id.into(),
			debounce,
			draft: NoteDraft::default(),
			snapshot: NoteDraft::default(),
			insights: AiInsights::default(),
			state: SessionState::Clean,
			deadline: None,
			events: None,
		}
	}

	pub fn open(
		repo: NoteRepository,
		ai: InsightClient,
		identity: Identity,
		note: Note,
		debounce: Duration,
	) -> Self {
		let draft = NoteDraft::from(&note);

		Self {
			repo,
			ai,
			identity,
			workspace_id: note.workspace_id,
			debounce,
			snapshot: draft.clone(),
			draft,
			insights: note.ai_insights,
			state: SessionState::Clean,
			deadline: None,
			events: None,
		}
	}

	/// Starts a new event stream. A previous receiver stops getting events.
	pub fn events(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
		let (tx, rx) = mpsc::unbounded_channel();

		self.events = Some(tx);

		rx
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn draft(&self) -> &NoteDraft {
		&self.draft
	}

	/// The last version known to be persisted.
	pub fn snapshot(&self) -> &NoteDraft {
		&self.snapshot
	}

	pub fn note_id(&self) -> Option<&str> {
		self.draft.id.as_deref()
	}

	pub fn workspace_id(&self) -> &str {
		&self.workspace_id
	}

	/// In-memory AI overlay. It is never written by autosave.
	pub fn insights(&self) -> &AiInsights {
		&self.insights
	}

	pub fn has_pending_save(&self) -> bool {
		self.deadline.is_some()
	}

	pub fn set_title(&mut self, title: impl Into<String>) {
		let title = title.into();

		if self.draft.title != title {
			self.draft.title = title;
			self.after_edit();
		}
	}

	pub fn set_content(&mut self, content: impl Into<String>) {
		let content = content.into();

		if self.draft.content != content {
			self.draft.content = content;
			self.after_edit();
		}
	}

	/// Adds a normalized tag. Returns `false` when the input is blank or already present.
	pub fn add_tag(&mut self, raw: &str) -> bool {
		let added = self.draft.tags.insert(raw);

		if added {
			self.after_edit();
		}

		added
	}

	pub fn remove_tag(&mut self, raw: &str) -> bool {
		let removed = self.draft.tags.remove(raw);

		if removed {
			self.after_edit();
		}

		removed
	}

	/// Adds a tag picked from the AI suggestions. Suggestions stay in the overlay.
	pub fn add_suggested_tag(&mut self, tag: &str) -> bool {
		match normalize_tag(tag) {
			Some(tag) => self.add_tag(&tag),
			None => false,
		}
	}

	/// Applies a newer copy of the open note. A clean session adopts it; otherwise the local draft
	/// stays ahead and only the snapshot moves. Returns `false` for notes this session does not
	/// edit.
	pub fn apply_remote(&mut self, note: &Note) -> bool {
		if self.draft.id.as_deref() != Some(note.id.as_str()) || note.workspace_id != self.workspace_id
		{
			return false;
		}

		let remote = NoteDraft::from(note);

		if self.state == SessionState::Clean {
			self.draft = remote.clone();
			self.snapshot = remote;

			return true;
		}

		self.snapshot = remote;

		if self.draft == self.snapshot {
			self.deadline = None;
			self.set_state(SessionState::Clean);
		}

		true
	}

	/// Resolves when the debounce timer elapses. Pends forever while no save is scheduled.
	/// Dropping the future leaves the timer armed.
	pub async fn wait_for_deadline(&mut self) {
		match self.deadline.as_mut() {
			Some(sleep) => {
				sleep.as_mut().await;

				self.deadline = None;
			},
			None => std::future::pending().await,
		}
	}

	/// Persists the draft now. Creates the note when the draft has no id yet. Does nothing when
	/// the draft matches the snapshot.
	pub async fn persist(&mut self) -> Result<()> {
		self.deadline = None;

		if self.draft == self.snapshot {
			self.set_state(SessionState::Clean);

			return Ok(());
		}

		self.set_state(SessionState::Saving);

		let written = self.draft.clone();
		let result = if written.is_new() {
			self.repo
				.create(&self.identity, &self.workspace_id, &written.title, &written.content)
				.await
				.map(Some)
		} else {
			self.repo.update(&self.workspace_id, &written).await.map(|()| None)
		};

		match result {
			Ok(Some(note_id)) => {
				// Creation stores title and content only, so tags stay dirty until the next save.
				self.snapshot = NoteDraft {
					id: Some(note_id.clone()),
					title: written.title,
					content: written.content,
					tags: Tags::new(),
				};
				self.draft.id = Some(note_id.clone());

				tracing::info!(workspace_id = %self.workspace_id, note_id = %note_id, "Draft created.");

				self.emit(SessionEvent::Created { note_id });
			},
			Ok(None) => {
				let note_id = written.id.clone().unwrap_or_default();

				self.snapshot = written;

				tracing::info!(workspace_id = %self.workspace_id, note_id = %note_id, "Draft saved.");

				self.emit(SessionEvent::Saved { note_id });
			},
			Err(err) => {
				tracing::warn!(
					workspace_id = %self.workspace_id,
					note_id = ?written.id,
					error = %err,
					"Draft save failed."
				);

				self.set_state(SessionState::Error);
				self.emit(SessionEvent::SaveFailed { message: err.to_string() });

				return Err(err);
			},
		}

		if self.draft == self.snapshot {
			self.set_state(SessionState::Clean);
		} else {
			self.arm();
			self.set_state(SessionState::Dirty);
		}

		Ok(())
	}

	/// Runs one AI operation on the draft content and merges its fields into the overlay. A
	/// failure leaves every other field untouched.
	pub async fn request_insight(&mut self, kind: InsightKind) -> Result<()> {
		let result = self.ai.request(kind, &self.draft.content).await;

		self.merge_outcome(kind, result)
	}

	/// Runs all AI operations concurrently and merges whichever succeed.
	pub async fn request_all_insights(&mut self) -> Vec<(InsightKind, Result<()>)> {
		let outcomes = self.ai.run_all(&self.draft.content).await;

		outcomes
			.into_iter()
			.map(|outcome| (outcome.kind, self.merge_outcome(outcome.kind, outcome.result)))
			.collect()
	}

	/// Drives the session from `edits` until the sender is dropped, persisting whenever the
	/// debounce timer elapses. Edits that arrive during a save are applied after it finishes.
	/// A draft still dirty at shutdown is persisted once before the session is handed back.
	pub async fn run(mut self, mut edits: mpsc::Receiver<Edit>) -> Self {
		loop {
			tokio::select! {
				edit = edits.recv() => match edit {
					Some(edit) => self.apply(edit).await,
					None => break,
				},
				() = self.wait_for_deadline() => {
					if self.state == SessionState::Dirty {
						let _ = self.persist().await;
					}
				},
			}
		}

		if self.state == SessionState::Dirty {
			let _ = self.persist().await;
		}

		self
	}

	async fn apply(&mut self, edit: Edit) {
		match edit {
			Edit::SetTitle(title) => self.set_title(title),
			Edit::SetContent(content) => self.set_content(content),
			Edit::AddTag(tag) => {
				self.add_tag(&tag);
			},
			Edit::RemoveTag(tag) => {
				self.remove_tag(&tag);
			},
			Edit::AddSuggestedTag(tag) => {
				self.add_suggested_tag(&tag);
			},
			Edit::Remote(note) => {
				self.apply_remote(&note);
			},
			Edit::SaveNow => {
				let _ = self.persist().await;
			},
			Edit::RequestInsight(kind) => {
				let _ = self.request_insight(kind).await;
			},
			Edit::RequestAllInsights => {
				self.request_all_insights().await;
			},
		}
	}

	fn merge_outcome(
		&mut self,
		kind: InsightKind,
		result: Result<InsightUpdate>,
	) -> Result<()> {
		match result {
			Ok(update) => {
				let ready = SessionEvent::InsightReady { kind: update.kind() };

				self.insights.merge(update, OffsetDateTime::now_utc());
				self.emit(ready);

				Ok(())
			},
			Err(err) => {
				self.emit(SessionEvent::InsightFailed { kind, message: err.to_string() });

				Err(err)
			},
		}
	}

	fn after_edit(&mut self) {
		if self.draft == self.snapshot {
			self.deadline = None;
			self.set_state(SessionState::Clean);
		} else {
			self.arm();
			self.set_state(SessionState::Dirty);
		}
	}

	fn arm(&mut self) {
		self.deadline = Some(Box::pin(tokio::time::sleep(self.debounce)));
	}

	fn set_state(&mut self, state: SessionState) {
		if self.state == state {
			return;
		}

		tracing::debug!(from = ?self.state, to = ?state, note_id = ?self.draft.id, "Editor state changed.");

		self.state = state;
		self.emit(SessionEvent::StateChanged(state));
	}

	fn emit(&self, event: SessionEvent) {
		if let Some(tx) = &self.events {
			let _ = tx.send(event);
		}
	}
}

impl std::fmt::Debug for EditorSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EditorSession")
			.field("workspace_id", &self.workspace_id)
			.field("state", &self.state)
			.field("draft", &self.draft)
			.finish_non_exhaustive()
	}
}
