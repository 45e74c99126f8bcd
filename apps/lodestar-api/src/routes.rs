use std::collections::HashMap;

use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use lodestar_domain::{
	CommunicationFeedback, FeedbackQuery, FeedbackValue, ProviderTagged, Query as SearchQuery,
	ResultSet, SearchCapability, SentenceFeedback, SentenceKey, ServiceInfo, Session, TaskType,
};
use lodestar_service::{Error, RegistrationOutcome, SearchOutcome};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/providers/alive", get(providers_alive))
		.route("/v1/providers/about", get(providers_about))
		.route("/v1/providers/capabilities", get(providers_capabilities))
		.route("/v1/providers/corpora", get(providers_corpora))
		.route("/v1/results", post(register_results).get(list_results))
		.route("/v1/results/latest", get(latest_result))
		.route("/v1/results/{id}", get(get_result))
		.route(
			"/v1/sessions",
			post(start_session).get(list_sessions).delete(stop_owner_sessions),
		)
		.route("/v1/sessions/{id}", get(get_session).delete(stop_session))
		.route("/v1/feedback", post(add_feedback))
		.route("/v1/feedback/communications", get(all_communication_feedback))
		.route("/v1/feedback/communications/query", post(query_communication_feedback))
		.route("/v1/feedback/sentences", get(all_sentence_feedback))
		.route("/v1/feedback/sentences/query", post(query_sentence_feedback))
		.route("/v1/feedback/records/{id}/communications", get(communication_feedback))
		.route("/v1/feedback/records/{id}/sentences", get(sentence_feedback))
		.route("/v1/feedback/records/{id}/annotated", get(annotated_result_set))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
	pub query: SearchQuery,
	pub targets: Option<Vec<String>>,
	/// Registers the merged result set under this task type when present.
	pub task_type: Option<TaskType>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
	pub result_set: ResultSet,
	pub task_type: TaskType,
}

#[derive(Debug, Deserialize)]
pub struct ResultsParams {
	pub task_type: TaskType,
	pub user_id: Option<String>,
	#[serde(default)]
	pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
	pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
	pub owner: String,
	pub result_set_id: Uuid,
	pub task_type: TaskType,
}

#[derive(Debug, Deserialize)]
pub struct OwnerParams {
	pub owner: String,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
	pub removed: usize,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
	pub result_set_id: Uuid,
	pub communication_id: String,
	pub sentence_id: Option<String>,
	pub value: FeedbackValue,
}

#[derive(Debug, Serialize)]
pub struct AliveResponse {
	pub alive: bool,
}

#[derive(Debug, Serialize)]
pub struct CommunicationFeedbackResponse {
	pub feedback: HashMap<String, FeedbackValue>,
}

#[derive(Debug, Serialize)]
pub struct SentenceFeedbackEntry {
	pub communication_id: String,
	pub sentence_id: String,
	pub value: FeedbackValue,
}

#[derive(Debug, Serialize)]
pub struct SentenceFeedbackResponse {
	pub feedback: Vec<SentenceFeedbackEntry>,
}

/// JSON shape of [`SentenceFeedback`]; sentence keys become a sorted list.
#[derive(Debug, Serialize)]
pub struct SentenceFeedbackView {
	pub result_set: ResultSet,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	pub feedback: Vec<SentenceFeedbackEntry>,
}
impl From<SentenceFeedback> for SentenceFeedbackView {
	fn from(value: SentenceFeedback) -> Self {
		Self {
			result_set: value.result_set,
			created_at: value.created_at,
			feedback: sentence_entries(value.feedback),
		}
	}
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchOutcome>, ApiError> {
	let outcome = state
		.broker
		.search(&payload.query, payload.targets.as_deref(), payload.task_type)
		.await?;

	Ok(Json(outcome))
}

async fn providers_alive(State(state): State<AppState>) -> Json<AliveResponse> {
	Json(AliveResponse { alive: state.broker.router.alive().await })
}

async fn providers_about(
	State(state): State<AppState>,
) -> Json<Vec<ProviderTagged<ServiceInfo>>> {
	Json(state.broker.router.about().await)
}

async fn providers_capabilities(
	State(state): State<AppState>,
) -> Json<Vec<ProviderTagged<SearchCapability>>> {
	Json(state.broker.router.capabilities().await)
}

async fn providers_corpora(State(state): State<AppState>) -> Json<Vec<ProviderTagged<String>>> {
	Json(state.broker.router.corpora().await)
}

async fn register_results(
	State(state): State<AppState>,
	Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegistrationOutcome>, ApiError> {
	let outcome =
		state.broker.handler.register_search_result(payload.result_set, payload.task_type).await?;

	Ok(Json(outcome))
}

async fn list_results(
	State(state): State<AppState>,
	Query(params): Query<ResultsParams>,
) -> Json<Vec<ResultSet>> {
	let results = match params.user_id.as_deref() {
		Some(user_id) => state.broker.results.get_by_user(params.task_type, user_id, params.limit),
		None => state.broker.results.get_by_task(params.task_type, params.limit),
	};

	Json(results)
}

async fn latest_result(
	State(state): State<AppState>,
	Query(params): Query<LatestParams>,
) -> Result<Json<ResultSet>, ApiError> {
	let result_set = state.broker.results.get_latest(&params.user_id).ok_or_else(|| {
		json_error(
			StatusCode::NOT_FOUND,
			"not_found",
			format!("No result set registered for user {:?}.", params.user_id),
			None,
		)
	})?;

	Ok(Json(result_set))
}

async fn get_result(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<ResultSet>, ApiError> {
	let result_set = state.broker.results.get_by_id(id).ok_or_else(|| {
		json_error(StatusCode::NOT_FOUND, "not_found", format!("Result set {id} is unknown."), None)
	})?;

	Ok(Json(result_set))
}

async fn start_session(
	State(state): State<AppState>,
	Json(payload): Json<StartSessionRequest>,
) -> Result<Json<Session>, ApiError> {
	let session = state
		.broker
		.start_session(&payload.owner, payload.result_set_id, payload.task_type)
		.await?;

	Ok(Json(session))
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<Session>> {
	Json(state.broker.sessions.list())
}

async fn stop_owner_sessions(
	State(state): State<AppState>,
	Query(params): Query<OwnerParams>,
) -> Json<RemovedResponse> {
	let removed = state.broker.sessions.remove_by_owner(&params.owner);

	tracing::info!(owner = %params.owner, removed, "Stopped sessions for owner.");

	Json(RemovedResponse { removed })
}

async fn get_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
	let session = state.broker.sessions.get(id).ok_or_else(|| {
		json_error(StatusCode::NOT_FOUND, "not_found", format!("Session {id} is not active."), None)
	})?;

	Ok(Json(session))
}

async fn stop_session(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
	Ok(Json(state.broker.stop_session(id)?))
}

async fn add_feedback(
	State(state): State<AppState>,
	Json(payload): Json<FeedbackRequest>,
) -> Result<StatusCode, ApiError> {
	state
		.broker
		.feedback
		.add_feedback(
			payload.result_set_id,
			&payload.communication_id,
			payload.sentence_id.as_deref(),
			payload.value,
		)
		.await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn communication_feedback(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<CommunicationFeedbackResponse>, ApiError> {
	let feedback = state.broker.feedback.communication_feedback(id).await?;

	Ok(Json(CommunicationFeedbackResponse { feedback }))
}

async fn sentence_feedback(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<SentenceFeedbackResponse>, ApiError> {
	let feedback = state.broker.feedback.sentence_feedback(id).await?;

	Ok(Json(SentenceFeedbackResponse { feedback: sentence_entries(feedback) }))
}

async fn annotated_result_set(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Json<ResultSet>, ApiError> {
	Ok(Json(state.broker.feedback.annotated_result_set(id).await?))
}

async fn all_communication_feedback(
	State(state): State<AppState>,
) -> Result<Json<Vec<CommunicationFeedback>>, ApiError> {
	Ok(Json(state.broker.feedback.all_communication_feedback().await?))
}

async fn query_communication_feedback(
	State(state): State<AppState>,
	Json(filter): Json<FeedbackQuery>,
) -> Result<Json<Vec<CommunicationFeedback>>, ApiError> {
	Ok(Json(state.broker.feedback.query_communication_feedback(&filter).await?))
}

async fn all_sentence_feedback(
	State(state): State<AppState>,
) -> Result<Json<Vec<SentenceFeedbackView>>, ApiError> {
	let feedback = state.broker.feedback.all_sentence_feedback().await?;

	Ok(Json(feedback.into_iter().map(SentenceFeedbackView::from).collect()))
}

async fn query_sentence_feedback(
	State(state): State<AppState>,
	Json(filter): Json<FeedbackQuery>,
) -> Result<Json<Vec<SentenceFeedbackView>>, ApiError> {
	let feedback = state.broker.feedback.query_sentence_feedback(&filter).await?;

	Ok(Json(feedback.into_iter().map(SentenceFeedbackView::from).collect()))
}

fn sentence_entries(feedback: HashMap<SentenceKey, FeedbackValue>) -> Vec<SentenceFeedbackEntry> {
	let mut keyed: Vec<(SentenceKey, FeedbackValue)> = feedback.into_iter().collect();

	keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

	keyed
		.into_iter()
		.map(|(key, value)| SentenceFeedbackEntry {
			communication_id: key.communication_id,
			sentence_id: key.sentence_id,
			value,
		})
		.collect()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::Validation { .. } => {
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None)
			},
			Error::Provider { .. } => {
				json_error(StatusCode::BAD_GATEWAY, "provider_error", message, None)
			},
			Error::AggregateDispatch { failures } => json_error(
				StatusCode::BAD_GATEWAY,
				"dispatch_failed",
				"Every targeted search provider failed.",
				Some(failures.iter().map(ToString::to_string).collect()),
			),
			Error::Feedback { .. } => {
				json_error(StatusCode::CONFLICT, "feedback_rejected", message, None)
			},
			Error::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message, None),
			Error::Storage { .. } => {
				tracing::error!(error = %message, "Storage failure.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_error",
					"Feedback storage is unavailable.",
					None,
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into(), fields }
}
