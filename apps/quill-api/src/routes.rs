use axum::{
	Json, Router,
	extract::{FromRequestParts, Path, State},
	http::{StatusCode, request::Parts},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use quill_domain::{AiInsights, Identity, InsightKind, Note, NoteDraft, TagCount, Tags};
use quill_service::Error as ServiceError;
use quill_store::Subscription;

use crate::state::AppState;

pub const USER_HEADER: &str = "x-quill-user";
pub const GUEST_HEADER: &str = "x-quill-guest";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/notes", get(list_default_notes).post(create_default_note))
		.route("/v1/workspaces/{workspace_id}/notes", get(list_notes).post(create_note))
		.route("/v1/workspaces/{workspace_id}/notes/{note_id}", get(get_note).put(update_note))
		.route("/v1/workspaces/{workspace_id}/tags", get(list_tags))
		.route("/v1/insights/{kind}", post(request_insight))
		.with_state(state)
}

/// Caller identity as forwarded by the authenticating proxy.
pub struct RequestIdentity(pub Identity);
impl<S> FromRequestParts<S> for RequestIdentity
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let user_id = parts
			.headers
			.get(USER_HEADER)
			.and_then(|value| value.to_str().ok())
			.map(str::trim)
			.filter(|value| !value.is_empty())
			.ok_or_else(|| {
				json_error(
					StatusCode::BAD_REQUEST,
					"invalid_request",
					format!("Header {USER_HEADER} is required."),
				)
			})?;
		let is_guest = parts
			.headers
			.get(GUEST_HEADER)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| matches!(value.trim(), "1" | "true"));

		Ok(Self(Identity { user_id: user_id.to_string(), is_guest }))
	}
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CreateNoteResponse {
	pub note_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub tags: Tags,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
	pub note_content: String,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn list_notes(
	State(state): State<AppState>,
	Path(workspace_id): Path<String>,
) -> Result<Json<Vec<Note>>, ApiError> {
	let notes = state.service.notes.snapshot(&workspace_id).await?;

	Ok(Json(notes))
}

async fn create_note(
	State(state): State<AppState>,
	Path(workspace_id): Path<String>,
	RequestIdentity(identity): RequestIdentity,
	Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<CreateNoteResponse>), ApiError> {
	let note_id = state
		.service
		.notes
		.create(&identity, &workspace_id, &payload.title, &payload.content)
		.await?;

	Ok((StatusCode::CREATED, Json(CreateNoteResponse { note_id })))
}

async fn get_note(
	State(state): State<AppState>,
	Path((workspace_id, note_id)): Path<(String, String)>,
) -> Result<Json<Note>, ApiError> {
	let feed = state.service.notes.fetch_one(&workspace_id, &note_id).await?;

	Ok(Json(first_value(feed).await?))
}

async fn list_default_notes(
	State(state): State<AppState>,
	RequestIdentity(identity): RequestIdentity,
) -> Result<Json<Vec<Note>>, ApiError> {
	let workspace_id = state.service.resolve_workspace(&identity, None)?;

	list_notes(State(state), Path(workspace_id)).await
}

async fn create_default_note(
	State(state): State<AppState>,
	RequestIdentity(identity): RequestIdentity,
	Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<CreateNoteResponse>), ApiError> {
	let workspace_id = state.service.resolve_workspace(&identity, None)?;

	create_note(State(state), Path(workspace_id), RequestIdentity(identity), Json(payload)).await
}

async fn update_note(
	State(state): State<AppState>,
	Path((workspace_id, note_id)): Path<(String, String)>,
	RequestIdentity(identity): RequestIdentity,
	Json(payload): Json<UpdateNoteRequest>,
) -> Result<StatusCode, ApiError> {
	// A merge write would otherwise move a foreign note into this workspace.
	let feed = state.service.notes.fetch_one(&workspace_id, &note_id).await?;

	first_value(feed).await?;

	let draft = NoteDraft {
		id: Some(note_id),
		title: payload.title,
		content: payload.content,
		tags: payload.tags,
	};

	state.service.notes.update(&workspace_id, &draft).await?;

	tracing::debug!(user_id = %identity.user_id, %workspace_id, note_id = ?draft.id, "Note updated.");

	Ok(StatusCode::NO_CONTENT)
}

async fn list_tags(
	State(state): State<AppState>,
	Path(workspace_id): Path<String>,
) -> Result<Json<Vec<TagCount>>, ApiError> {
	let feed = state.service.notes.observe_tags(&workspace_id).await?;

	Ok(Json(first_value(feed).await?))
}

async fn request_insight(
	State(state): State<AppState>,
	Path(kind): Path<InsightKind>,
	Json(payload): Json<InsightRequest>,
) -> Result<Json<AiInsights>, ApiError> {
	let update = state.service.insights.request(kind, &payload.note_content).await?;
	let mut insights = AiInsights::default();

	insights.merge(update, OffsetDateTime::now_utc());

	Ok(Json(insights))
}

async fn first_value<T>(mut feed: Subscription<T, ServiceError>) -> Result<T, ApiError>
where
	T: Send + 'static,
{
	match feed.next().await {
		Some(value) => Ok(value?),
		None => Err(json_error(
			StatusCode::INTERNAL_SERVER_ERROR,
			"persist_failed",
			format!("Feed {} closed before producing a value.", feed.label()),
		)),
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, code) = match &err {
			ServiceError::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
			ServiceError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "permission_denied"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::AiRequestFailure { .. } => (StatusCode::BAD_GATEWAY, "ai_request_failed"),
			ServiceError::PersistFailure { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "persist_failed"),
		};

		if status.is_server_error() {
			tracing::warn!(error = %err, "Request failed.");
		}

		json_error(status, code, err.to_string())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
