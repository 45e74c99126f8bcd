use std::{
	collections::HashMap,
	sync::{Arc, Mutex, PoisonError},
};

use moka::sync::Cache;
use time::OffsetDateTime;
use uuid::Uuid;

use lodestar_domain::{
	CommunicationFeedback, FeedbackQuery, FeedbackRecord, FeedbackValue, ResultSet, SearchType,
	SentenceFeedback, SentenceKey,
};
use lodestar_storage::{db::Db, feedback};

use crate::{BoxFuture, Error, Result};

/// Durable layer behind the feedback cache.
pub trait FeedbackBackend
where
	Self: Send + Sync,
{
	/// Returns `false` when a record with the same id already exists; nothing is written then.
	fn insert_record<'a>(&'a self, record: &'a FeedbackRecord) -> BoxFuture<'a, Result<bool>>;

	/// Sets one item's value atomically. Fails with [`Error::NotFound`] when the item is unknown.
	fn update_item<'a>(
		&'a self,
		result_set_id: Uuid,
		communication_id: &'a str,
		sentence_id: Option<&'a str>,
		value: FeedbackValue,
	) -> BoxFuture<'a, Result<()>>;

	fn fetch_record(
		&self,
		result_set_id: Uuid,
		search_type: Option<SearchType>,
	) -> BoxFuture<'_, Result<Option<FeedbackRecord>>>;

	/// Matching records of one classification, newest first.
	fn query_records<'a>(
		&'a self,
		search_type: SearchType,
		filter: &'a FeedbackQuery,
	) -> BoxFuture<'a, Result<Vec<FeedbackRecord>>>;

	fn load_record(&self, result_set_id: Uuid) -> BoxFuture<'_, Result<Option<FeedbackRecord>>> {
		self.fetch_record(result_set_id, None)
	}
}

pub struct PgFeedbackBackend {
	db: Db,
}
impl PgFeedbackBackend {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}
impl FeedbackBackend for PgFeedbackBackend {
	fn insert_record<'a>(&'a self, record: &'a FeedbackRecord) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(feedback::insert_record(&self.db.pool, record).await?) })
	}

	fn update_item<'a>(
		&'a self,
		result_set_id: Uuid,
		communication_id: &'a str,
		sentence_id: Option<&'a str>,
		value: FeedbackValue,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			feedback::update_item(&self.db.pool, result_set_id, communication_id, sentence_id, value)
				.await?;

			Ok(())
		})
	}

	fn fetch_record(
		&self,
		result_set_id: Uuid,
		search_type: Option<SearchType>,
	) -> BoxFuture<'_, Result<Option<FeedbackRecord>>> {
		Box::pin(async move {
			Ok(feedback::fetch_record(&self.db.pool, result_set_id, search_type).await?)
		})
	}

	fn query_records<'a>(
		&'a self,
		search_type: SearchType,
		filter: &'a FeedbackQuery,
	) -> BoxFuture<'a, Result<Vec<FeedbackRecord>>> {
		Box::pin(
			async move { Ok(feedback::query_records(&self.db.pool, search_type, filter).await?) },
		)
	}
}

/// Process-local backend. Used when `feedback.backend = "memory"`.
#[derive(Default)]
pub struct MemoryFeedbackBackend {
	records: Mutex<HashMap<Uuid, FeedbackRecord>>,
}
impl FeedbackBackend for MemoryFeedbackBackend {
	fn insert_record<'a>(&'a self, record: &'a FeedbackRecord) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

			if records.contains_key(&record.result_set_id) {
				return Ok(false);
			}

			records.insert(record.result_set_id, record.clone());

			Ok(true)
		})
	}

	fn update_item<'a>(
		&'a self,
		result_set_id: Uuid,
		communication_id: &'a str,
		sentence_id: Option<&'a str>,
		value: FeedbackValue,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
			let item = records
				.get_mut(&result_set_id)
				.and_then(|record| record.item_mut(communication_id, sentence_id))
				.ok_or_else(|| Error::NotFound {
					message: format!(
						"No feedback item for {communication_id:?} in result set {result_set_id}."
					),
				})?;

			item.value = value;

			Ok(())
		})
	}

	fn fetch_record(
		&self,
		result_set_id: Uuid,
		search_type: Option<SearchType>,
	) -> BoxFuture<'_, Result<Option<FeedbackRecord>>> {
		Box::pin(async move {
			let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

			Ok(records
				.get(&result_set_id)
				.filter(|record| search_type.is_none_or(|expected| record.search_type == expected))
				.cloned())
		})
	}

	fn query_records<'a>(
		&'a self,
		search_type: SearchType,
		filter: &'a FeedbackQuery,
	) -> BoxFuture<'a, Result<Vec<FeedbackRecord>>> {
		Box::pin(async move {
			let mut matched: Vec<FeedbackRecord> = {
				let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

				records
					.values()
					.filter(|record| record.search_type == search_type && filter.matches_record(record))
					.cloned()
					.collect()
			};

			matched.sort_by(|a, b| {
				b.created_at.cmp(&a.created_at).then_with(|| a.result_set_id.cmp(&b.result_set_id))
			});

			if let Some(limit) = filter.limit() {
				matched.truncate(limit);
			}

			Ok(matched)
		})
	}
}

/// Feedback capture over a durable backend with a bounded write-through cache.
///
/// Feedback updates are serialized: the record is resolved, the durable row updated, and only
/// then is the cached copy replaced.
pub struct FeedbackStore {
	backend: Arc<dyn FeedbackBackend>,
	cache: Cache<Uuid, FeedbackRecord>,
	write_lock: tokio::sync::Mutex<()>,
}
impl FeedbackStore {
	pub fn new(backend: Arc<dyn FeedbackBackend>, cache_capacity: u64) -> Self {
		let cache = Cache::builder().max_capacity(cache_capacity).build();

		Self { backend, cache, write_lock: tokio::sync::Mutex::new(()) }
	}

	/// Starts collecting feedback for a result set. Registering a known id is a no-op.
	pub async fn add_result_set(&self, result_set: &ResultSet) -> Result<()> {
		let record = FeedbackRecord::from_result_set(result_set.clone(), OffsetDateTime::now_utc());
		let _guard = self.write_lock.lock().await;

		if self.backend.insert_record(&record).await? {
			tracing::debug!(
				result_set_id = %record.result_set_id,
				items = record.items.len(),
				"Registered result set for feedback."
			);

			self.cache.insert(record.result_set_id, record);
		}

		Ok(())
	}

	pub async fn add_feedback(
		&self,
		result_set_id: Uuid,
		communication_id: &str,
		sentence_id: Option<&str>,
		value: FeedbackValue,
	) -> Result<()> {
		let _guard = self.write_lock.lock().await;
		let mut record = match self.cache.get(&result_set_id) {
			Some(record) => record,
			None => self.backend.load_record(result_set_id).await?.ok_or_else(|| {
				Error::Feedback {
					message: format!("Result set {result_set_id} is not registered for feedback."),
				}
			})?,
		};
		let Some(item) = record.item_mut(communication_id, sentence_id) else {
			return Err(Error::Feedback {
				message: format!(
					"Result set {result_set_id} has no item for {communication_id:?}/{sentence_id:?}."
				),
			});
		};

		item.value = value;

		match self.backend.update_item(result_set_id, communication_id, sentence_id, value).await {
			Ok(()) => {},
			Err(Error::NotFound { message }) => return Err(Error::Feedback { message }),
			Err(err) => return Err(err),
		}

		tracing::info!(%result_set_id, communication_id, ?sentence_id, ?value, "Recorded feedback.");

		self.cache.insert(result_set_id, record);

		Ok(())
	}

	/// Current record for an id, from the cache when present.
	pub async fn record(&self, result_set_id: Uuid) -> Result<Option<FeedbackRecord>> {
		if let Some(record) = self.cache.get(&result_set_id) {
			return Ok(Some(record));
		}

		let record = self.backend.load_record(result_set_id).await?;

		if let Some(record) = record.as_ref() {
			self.cache.insert(result_set_id, record.clone());
		}

		Ok(record)
	}

	/// Document-level feedback of one result set; empty when the id is unknown or the result set
	/// holds sentence hits.
	pub async fn communication_feedback(
		&self,
		result_set_id: Uuid,
	) -> Result<HashMap<String, FeedbackValue>> {
		Ok(self
			.typed_record(result_set_id, SearchType::Communications)
			.await?
			.map(|record| record.communication_feedback())
			.unwrap_or_default())
	}

	pub async fn sentence_feedback(
		&self,
		result_set_id: Uuid,
	) -> Result<HashMap<SentenceKey, FeedbackValue>> {
		Ok(self
			.typed_record(result_set_id, SearchType::Sentences)
			.await?
			.map(|record| record.sentence_feedback())
			.unwrap_or_default())
	}

	/// The result set with each hit's score replaced by its feedback value.
	pub async fn annotated_result_set(&self, result_set_id: Uuid) -> Result<ResultSet> {
		let record = self.record(result_set_id).await?.ok_or_else(|| Error::NotFound {
			message: format!("Result set {result_set_id} is not registered for feedback."),
		})?;

		Ok(record.annotated_result_set())
	}

	pub async fn query_communication_feedback(
		&self,
		filter: &FeedbackQuery,
	) -> Result<Vec<CommunicationFeedback>> {
		let records = self.backend.query_records(SearchType::Communications, filter).await?;

		Ok(records.iter().map(CommunicationFeedback::from).collect())
	}

	pub async fn query_sentence_feedback(
		&self,
		filter: &FeedbackQuery,
	) -> Result<Vec<SentenceFeedback>> {
		let records = self.backend.query_records(SearchType::Sentences, filter).await?;

		Ok(records.iter().map(SentenceFeedback::from).collect())
	}

	pub async fn all_communication_feedback(&self) -> Result<Vec<CommunicationFeedback>> {
		self.query_communication_feedback(&FeedbackQuery::default()).await
	}

	pub async fn all_sentence_feedback(&self) -> Result<Vec<SentenceFeedback>> {
		self.query_sentence_feedback(&FeedbackQuery::default()).await
	}

	async fn typed_record(
		&self,
		result_set_id: Uuid,
		search_type: SearchType,
	) -> Result<Option<FeedbackRecord>> {
		if let Some(record) = self.cache.get(&result_set_id) {
			return Ok((record.search_type == search_type).then_some(record));
		}

		self.backend.fetch_record(result_set_id, Some(search_type)).await
	}
}

#[cfg(test)]
mod tests {
	use lodestar_domain::{Query, ResultItem};

	use super::*;

	fn store() -> FeedbackStore {
		FeedbackStore::new(Arc::new(MemoryFeedbackBackend::default()), 16)
	}

	#[tokio::test]
	async fn feedback_round_trips_through_store() {
		let store = store();
		let rs = ResultSet::new(
			Uuid::new_v4(),
			Query::new("harbor"),
			vec![ResultItem::communication("doc-1"), ResultItem::communication("doc-2")],
		);

		store.add_result_set(&rs).await.expect("Registration failed.");
		store
			.add_feedback(rs.id, "doc-2", None, FeedbackValue::Negative)
			.await
			.expect("Feedback failed.");

		let feedback = store.communication_feedback(rs.id).await.expect("Read failed.");

		assert_eq!(feedback.get("doc-1"), Some(&FeedbackValue::None));
		assert_eq!(feedback.get("doc-2"), Some(&FeedbackValue::Negative));
		assert!(store.sentence_feedback(rs.id).await.expect("Read failed.").is_empty());
	}

	#[tokio::test]
	async fn cache_miss_reads_through_backend() {
		let backend = Arc::new(MemoryFeedbackBackend::default());
		let rs = ResultSet::new(
			Uuid::new_v4(),
			Query::new("harbor"),
			vec![ResultItem::communication("doc-1")],
		);
		let record = FeedbackRecord::from_result_set(rs.clone(), OffsetDateTime::now_utc());

		backend.insert_record(&record).await.expect("Insert failed.");

		let store = FeedbackStore::new(backend, 16);

		store
			.add_feedback(rs.id, "doc-1", None, FeedbackValue::Positive)
			.await
			.expect("Feedback failed.");

		let annotated = store.annotated_result_set(rs.id).await.expect("Read failed.");

		assert_eq!(annotated.items()[0].score, 1.0);
	}

	#[tokio::test]
	async fn unknown_ids_and_items_are_feedback_errors() {
		let store = store();
		let err = store
			.add_feedback(Uuid::new_v4(), "doc-1", None, FeedbackValue::Positive)
			.await
			.expect_err("Expected unregistered error.");

		assert!(matches!(err, Error::Feedback { .. }), "Unexpected error: {err}");

		let rs = ResultSet::new(
			Uuid::new_v4(),
			Query::new("harbor"),
			vec![ResultItem::communication("doc-1")],
		);

		store.add_result_set(&rs).await.expect("Registration failed.");

		let err = store
			.add_feedback(rs.id, "doc-1", Some("s-1"), FeedbackValue::Positive)
			.await
			.expect_err("Expected missing item error.");

		assert!(matches!(err, Error::Feedback { .. }), "Unexpected error: {err}");

		let unknown = store.communication_feedback(Uuid::new_v4()).await.expect("Read failed.");

		assert!(unknown.is_empty());
	}
}
