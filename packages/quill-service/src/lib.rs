pub mod insights;
pub mod repository;
pub mod session;

mod error;

pub use error::{Error, Result};
pub use insights::{InsightClient, InsightOutcome};
pub use repository::{NOTES_COLLECTION, NoteRepository};
pub use session::{Edit, EditorSession, SessionEvent, SessionState};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;

use quill_config::{Config, LlmProviderConfig};
use quill_domain::{GuestQuota, Identity};
use quill_providers::completion;
use quill_store::RemoteStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Chat-completion backend used by the insight operations.
pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>>;
}

#[derive(Clone)]
pub struct Providers {
	pub completion: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
		Self { completion }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { completion: Arc::new(DefaultProviders) }
	}
}

struct DefaultProviders;
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move { Ok(completion::complete(cfg, messages).await?) })
	}
}

pub struct QuillService {
	pub cfg: Config,
	pub notes: NoteRepository,
	pub insights: InsightClient,
}
impl QuillService {
	pub fn new(cfg: Config, store: Arc<dyn RemoteStore>) -> Self {
		Self::with_providers(cfg, store, Providers::default())
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn RemoteStore>, providers: Providers) -> Self {
		let notes = NoteRepository::new(store, GuestQuota::from(&cfg.quota));
		let insights = InsightClient::new(cfg.providers.llm.clone(), providers.completion);

		Self { cfg, notes, insights }
	}

	/// Starts an editor on a fresh, unsaved draft in `workspace_id`.
	pub fn new_draft(&self, identity: Identity, workspace_id: impl Into<String>) -> EditorSession {
		EditorSession::new_draft(
			self.notes.clone(),
			self.insights.clone(),
			identity,
			workspace_id,
			self.autosave_debounce(),
		)
	}

	/// Starts an editor on the current state of an existing note. Fails like
	/// [`NoteRepository::fetch_one`].
	pub async fn open(
		&self,
		identity: Identity,
		workspace_id: &str,
		note_id: &str,
	) -> Result<EditorSession> {
		let mut feed = self.notes.fetch_one(workspace_id, note_id).await?;
		let note = feed.next().await.ok_or_else(|| Error::NotFound {
			message: format!("Note {note_id} feed ended before the first read."),
		})??;

		Ok(EditorSession::open(
			self.notes.clone(),
			self.insights.clone(),
			identity,
			note,
			self.autosave_debounce(),
		))
	}

	/// Workspace a caller acts on. Guests who did not choose one land in the configured guest
	/// workspace; members must always choose.
	pub fn resolve_workspace(&self, identity: &Identity, requested: Option<&str>) -> Result<String> {
		match requested.map(str::trim).filter(|workspace_id| !workspace_id.is_empty()) {
			Some(workspace_id) => Ok(workspace_id.to_string()),
			None if identity.is_guest => Ok(self.cfg.quota.guest_workspace_id.clone()),
			None => Err(Error::InvalidRequest {
				message: format!("User {} must choose a workspace.", identity.user_id),
			}),
		}
	}

	fn autosave_debounce(&self) -> Duration {
		Duration::from_millis(self.cfg.editor.autosave_debounce_ms)
	}
}
