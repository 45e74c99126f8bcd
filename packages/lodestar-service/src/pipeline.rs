use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use lodestar_domain::{ResultSet, TaskType};

use crate::{ActiveLearningClient, Error, FeedbackStore, Result, ResultStore, ResultsPlugin};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationOutcome {
	/// Stored. `created` is false when the id was already known and only gained a task type.
	Accepted { result_set_id: Uuid, created: bool },
	/// Discarded by the named filter. Nothing was stored.
	Rejected { plugin: String },
}

/// Validates, filters, and commits registered result sets.
pub struct ResultsHandler {
	plugins: Vec<Arc<dyn ResultsPlugin>>,
	results: Arc<ResultStore>,
	feedback: Arc<FeedbackStore>,
	learning: Option<Arc<dyn ActiveLearningClient>>,
}
impl ResultsHandler {
	pub fn new(
		plugins: Vec<Arc<dyn ResultsPlugin>>,
		results: Arc<ResultStore>,
		feedback: Arc<FeedbackStore>,
		learning: Option<Arc<dyn ActiveLearningClient>>,
	) -> Self {
		Self { plugins, results, feedback, learning }
	}

	pub async fn register_search_result(
		&self,
		mut result_set: ResultSet,
		task_type: TaskType,
	) -> Result<RegistrationOutcome> {
		validate(&result_set)?;

		if let Some(query) = result_set.query.as_mut()
			&& query.name.as_deref().is_none_or(|name| name.trim().is_empty())
		{
			query.name = query.raw_query.clone();
		}

		for plugin in &self.plugins {
			if !plugin.process(&result_set) {
				tracing::info!(
					result_set_id = %result_set.id,
					plugin = plugin.name(),
					"Result set rejected by filter."
				);

				return Ok(RegistrationOutcome::Rejected { plugin: plugin.name().to_string() });
			}
		}

		self.feedback.add_result_set(&result_set).await?;

		let result_set_id = result_set.id;
		let created = self.results.add(result_set.clone(), task_type);

		for plugin in &self.plugins {
			plugin.committed(&result_set);
		}

		tracing::info!(
			%result_set_id,
			?task_type,
			items = result_set.items().len(),
			created,
			"Registered search results."
		);

		if let Some(learning) = self.learning.as_ref()
			&& let Err(err) = learning.register(&result_set, task_type).await
		{
			tracing::warn!(%result_set_id, error = %err, "Active learning notification failed.");
		}

		Ok(RegistrationOutcome::Accepted { result_set_id, created })
	}
}

fn validate(result_set: &ResultSet) -> Result<()> {
	let Some(query) = result_set.query.as_ref() else {
		return Err(Error::validation("Search results needs a search query."));
	};

	if result_set.items.is_none() {
		return Err(Error::validation("Search results list cannot be missing."));
	}
	if query.raw_text().is_none() {
		return Err(Error::validation("Search query cannot be empty."));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, Ordering};

	use lodestar_domain::{
		FeedbackQuery, FeedbackRecord, FeedbackValue, Query, ResultItem, SearchType,
	};

	use super::*;
	use crate::{
		BoxFuture, FeedbackBackend, MemoryFeedbackBackend,
		plugins::{Dedup, MinItems},
	};

	/// Fails the first insert, then behaves like the in-memory backend.
	#[derive(Default)]
	struct FlakyBackend {
		failed: AtomicBool,
		inner: MemoryFeedbackBackend,
	}
	impl FeedbackBackend for FlakyBackend {
		fn insert_record<'a>(&'a self, record: &'a FeedbackRecord) -> BoxFuture<'a, Result<bool>> {
			if !self.failed.swap(true, Ordering::SeqCst) {
				return Box::pin(async {
					Err(Error::Storage { message: "connection refused".to_string() })
				});
			}

			self.inner.insert_record(record)
		}

		fn update_item<'a>(
			&'a self,
			result_set_id: Uuid,
			communication_id: &'a str,
			sentence_id: Option<&'a str>,
			value: FeedbackValue,
		) -> BoxFuture<'a, Result<()>> {
			self.inner.update_item(result_set_id, communication_id, sentence_id, value)
		}

		fn fetch_record(
			&self,
			result_set_id: Uuid,
			search_type: Option<SearchType>,
		) -> BoxFuture<'_, Result<Option<FeedbackRecord>>> {
			self.inner.fetch_record(result_set_id, search_type)
		}

		fn query_records<'a>(
			&'a self,
			search_type: SearchType,
			filter: &'a FeedbackQuery,
		) -> BoxFuture<'a, Result<Vec<FeedbackRecord>>> {
			self.inner.query_records(search_type, filter)
		}
	}

	fn handler(plugins: Vec<Arc<dyn ResultsPlugin>>) -> (ResultsHandler, Arc<ResultStore>) {
		handler_with(plugins, Arc::new(MemoryFeedbackBackend::default()))
	}

	fn handler_with(
		plugins: Vec<Arc<dyn ResultsPlugin>>,
		backend: Arc<dyn FeedbackBackend>,
	) -> (ResultsHandler, Arc<ResultStore>) {
		let results = Arc::new(ResultStore::default());
		let feedback = Arc::new(FeedbackStore::new(backend, 16));

		(ResultsHandler::new(plugins, results.clone(), feedback, None), results)
	}

	fn harbor_hits() -> ResultSet {
		ResultSet::new(
			Uuid::new_v4(),
			Query::new("harbor"),
			vec![ResultItem::communication("doc-1"), ResultItem::communication("doc-2")],
		)
	}

	#[tokio::test]
	async fn malformed_submissions_are_rejected_without_storing() {
		let (handler, results) = handler(Vec::new());
		let mut no_query = ResultSet::new(Uuid::new_v4(), Query::new("harbor"), Vec::new());

		no_query.query = None;

		let mut no_items = ResultSet::new(Uuid::new_v4(), Query::new("harbor"), Vec::new());

		no_items.items = None;

		let blank = ResultSet::new(Uuid::new_v4(), Query::new(" "), Vec::new());

		for (rs, message) in [
			(no_query, "Search results needs a search query."),
			(no_items, "Search results list cannot be missing."),
			(blank, "Search query cannot be empty."),
		] {
			let err = handler
				.register_search_result(rs, TaskType::Ner)
				.await
				.expect_err("Expected validation error.");

			assert!(
				matches!(&err, Error::Validation { message: actual } if actual == message),
				"Unexpected error: {err}"
			);
		}

		assert!(results.is_empty());
	}

	#[tokio::test]
	async fn query_name_defaults_to_raw_query() {
		let (handler, results) = handler(Vec::new());
		let rs = ResultSet::new(
			Uuid::new_v4(),
			Query::new("harbor boats"),
			vec![ResultItem::communication("doc-1")],
		);

		handler.register_search_result(rs.clone(), TaskType::Ner).await.expect("Register failed.");

		let stored = results.get_by_id(rs.id).expect("Result set must be stored.");

		assert_eq!(stored.query_name(), Some("harbor boats"));
	}

	#[tokio::test]
	async fn rejecting_filter_prevents_storage() {
		let (handler, results) = handler(vec![Arc::new(MinItems::new(2))]);
		let rs = ResultSet::new(
			Uuid::new_v4(),
			Query::new("harbor"),
			vec![ResultItem::communication("doc-1")],
		);
		let outcome =
			handler.register_search_result(rs, TaskType::Ner).await.expect("Register failed.");

		assert_eq!(outcome, RegistrationOutcome::Rejected { plugin: "min_items".to_string() });
		assert!(results.is_empty());
	}

	#[tokio::test]
	async fn storage_failure_leaves_result_store_untouched_and_allows_retry() {
		let (handler, results) =
			handler_with(vec![Arc::new(Dedup::default())], Arc::new(FlakyBackend::default()));
		let rs = harbor_hits();
		let err = handler
			.register_search_result(rs.clone(), TaskType::Ner)
			.await
			.expect_err("Expected storage error.");

		assert!(matches!(err, Error::Storage { .. }), "Unexpected error: {err}");
		assert!(results.is_empty());

		let outcome = handler
			.register_search_result(rs.clone(), TaskType::Ner)
			.await
			.expect("Retry failed.");

		assert_eq!(outcome, RegistrationOutcome::Accepted { result_set_id: rs.id, created: true });
		assert!(results.get_by_id(rs.id).is_some());
	}

	#[tokio::test]
	async fn dedup_lets_known_id_gain_task_types() {
		let (handler, results) = handler(vec![Arc::new(Dedup::default())]);
		let rs = harbor_hits();

		handler.register_search_result(rs.clone(), TaskType::Ner).await.expect("Register failed.");

		let outcome = handler
			.register_search_result(rs.clone(), TaskType::Translation)
			.await
			.expect("Register failed.");

		assert_eq!(outcome, RegistrationOutcome::Accepted { result_set_id: rs.id, created: false });
		assert_eq!(results.get_by_task(TaskType::Ner, 0).len(), 1);
		assert_eq!(results.get_by_task(TaskType::Translation, 0).len(), 1);
	}

	#[tokio::test]
	async fn dedup_rejects_same_content_under_new_id() {
		let (handler, results) = handler(vec![Arc::new(Dedup::default())]);
		let rs = harbor_hits();
		let mut copy = rs.clone();

		copy.id = Uuid::new_v4();

		handler.register_search_result(rs, TaskType::Ner).await.expect("Register failed.");

		let outcome =
			handler.register_search_result(copy, TaskType::Ner).await.expect("Register failed.");

		assert_eq!(outcome, RegistrationOutcome::Rejected { plugin: "dedup".to_string() });
		assert_eq!(results.len(), 1);
	}
}
