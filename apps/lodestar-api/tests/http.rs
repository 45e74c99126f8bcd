use std::{sync::Arc, time::Duration};

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use lodestar_api::{routes, state::AppState};
use lodestar_domain::{Query, ResultItem, ResultSet, SearchCapability, ServiceInfo};
use lodestar_service::{
	BoxFuture, Broker, Error, FeedbackStore, MemoryFeedbackBackend, Result, ResultStore,
	SearchProvider, SearchRouter,
};

struct StubProvider {
	docs: Vec<&'static str>,
}
impl SearchProvider for StubProvider {
	fn search<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<ResultSet>> {
		Box::pin(async move {
			if self.docs.is_empty() {
				return Err(Error::Provider { message: "index offline".to_string() });
			}

			let items = self.docs.iter().map(|doc| ResultItem::communication(*doc)).collect();

			Ok(ResultSet::new(Uuid::new_v4(), query.clone(), items))
		})
	}

	fn alive(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(!self.docs.is_empty()) })
	}

	fn about(&self) -> BoxFuture<'_, Result<ServiceInfo>> {
		Box::pin(async {
			Ok(ServiceInfo { name: "stub".to_string(), version: "0".to_string(), description: None })
		})
	}

	fn capabilities(&self) -> BoxFuture<'_, Result<Vec<SearchCapability>>> {
		Box::pin(async { Ok(Vec::new()) })
	}

	fn corpora(&self) -> BoxFuture<'_, Result<Vec<String>>> {
		Box::pin(async { Ok(vec!["news".to_string()]) })
	}
}

fn app(providers: Vec<(&str, Vec<&'static str>)>) -> Router {
	let mut router = SearchRouter::new(Duration::from_millis(500));

	for (name, docs) in providers {
		router.register(name, Arc::new(StubProvider { docs }), None).expect("Registration failed.");
	}

	let feedback = FeedbackStore::new(Arc::new(MemoryFeedbackBackend::default()), 64);
	let broker = Broker::new(router, Vec::new(), ResultStore::default(), feedback, None);

	routes::router(AppState::from_broker(broker))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let builder = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => builder
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.expect("Failed to build request."),
		None => builder.body(Body::empty()).expect("Failed to build request."),
	};
	let response = app.clone().oneshot(request).await.expect("Failed to call app.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Response must be JSON.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let (status, _) = send(&app(Vec::new()), "GET", "/health", None).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn search_registers_and_collects_feedback() {
	let app = app(vec![("primary", vec!["doc-1", "doc-2"]), ("down", Vec::new())]);
	let (status, json) = send(
		&app,
		"POST",
		"/v1/search",
		Some(serde_json::json!({
			"query": { "raw_query": "harbor", "user_id": "alice" },
			"task_type": "relevance",
		})),
	)
	.await;

	assert_eq!(status, StatusCode::OK, "Unexpected body: {json}");
	assert_eq!(json["failures"][0]["provider"], "down");
	assert_eq!(json["registration"]["status"], "accepted");

	let id = json["result_set"]["id"].as_str().expect("Missing result set id.").to_string();
	let (status, latest) = send(&app, "GET", "/v1/results/latest?user_id=alice", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(latest["id"], id.as_str());

	let (status, listed) =
		send(&app, "GET", "/v1/results?task_type=relevance&user_id=alice&limit=5", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(listed.as_array().map(Vec::len), Some(1));

	let (status, _) = send(
		&app,
		"POST",
		"/v1/feedback",
		Some(serde_json::json!({
			"result_set_id": id,
			"communication_id": "doc-2",
			"value": "positive",
		})),
	)
	.await;

	assert_eq!(status, StatusCode::NO_CONTENT);

	let uri = format!("/v1/feedback/records/{id}/communications");
	let (status, feedback) = send(&app, "GET", &uri, None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(feedback["feedback"]["doc-1"], "none");
	assert_eq!(feedback["feedback"]["doc-2"], "positive");

	let (status, history) = send(
		&app,
		"POST",
		"/v1/feedback/communications/query",
		Some(serde_json::json!({ "user_names": ["alice"] })),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn failed_dispatch_maps_to_bad_gateway() {
	let app = app(vec![("down", Vec::new()), ("also-down", Vec::new())]);
	let (status, json) = send(
		&app,
		"POST",
		"/v1/search",
		Some(serde_json::json!({ "query": { "raw_query": "harbor" } })),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(json["error_code"], "dispatch_failed");
	assert_eq!(json["fields"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn invalid_submissions_map_to_client_errors() {
	let app = app(vec![("primary", vec!["doc-1"])]);
	let (status, json) = send(
		&app,
		"POST",
		"/v1/results",
		Some(serde_json::json!({
			"result_set": { "id": Uuid::new_v4(), "query": null, "items": [] },
			"task_type": "ner",
		})),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");

	let (status, json) = send(
		&app,
		"POST",
		"/v1/feedback",
		Some(serde_json::json!({
			"result_set_id": Uuid::new_v4(),
			"communication_id": "doc-1",
			"value": "negative",
		})),
	)
	.await;

	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(json["error_code"], "feedback_rejected");

	let uri = format!("/v1/results/{}", Uuid::new_v4());
	let (status, _) = send(&app, "GET", &uri, None).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sessions_open_and_close_over_registered_results() {
	let app = app(vec![("primary", vec!["doc-1"])]);
	let result_set_id = Uuid::new_v4();
	let (status, _) = send(
		&app,
		"POST",
		"/v1/results",
		Some(serde_json::json!({
			"result_set": {
				"id": result_set_id,
				"query": { "raw_query": "harbor", "user_id": "alice" },
				"items": [{ "communication_id": "doc-1", "score": 0.4 }],
			},
			"task_type": "ner",
		})),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let (status, session) = send(
		&app,
		"POST",
		"/v1/sessions",
		Some(serde_json::json!({
			"owner": "alice",
			"result_set_id": result_set_id,
			"task_type": "ner",
		})),
	)
	.await;

	assert_eq!(status, StatusCode::OK, "Unexpected body: {session}");

	let (_, listed) = send(&app, "GET", "/v1/sessions", None).await;

	assert_eq!(listed.as_array().map(Vec::len), Some(1));

	let (status, removed) = send(&app, "DELETE", "/v1/sessions?owner=alice", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(removed["removed"], 1);

	let uri = format!("/v1/sessions/{}", session["id"].as_str().expect("Missing session id."));
	let (status, _) = send(&app, "DELETE", &uri, None).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
}
