use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::Query;

/// Downstream consumer that claimed a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
	Translation,
	Ner,
	Topicid,
	Relevance,
	SentenceRelevance,
	Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
	pub communication_id: String,
	pub sentence_id: Option<String>,
	#[serde(default)]
	pub score: f64,
}
impl ResultItem {
	pub fn communication(communication_id: impl Into<String>) -> Self {
		Self { communication_id: communication_id.into(), sentence_id: None, score: 0.0 }
	}

	pub fn sentence(communication_id: impl Into<String>, sentence_id: impl Into<String>) -> Self {
		Self {
			communication_id: communication_id.into(),
			sentence_id: Some(sentence_id.into()),
			score: 0.0,
		}
	}

	pub fn with_score(mut self, score: f64) -> Self {
		self.score = score;

		self
	}
}

/// One outcome of a query. The identifier is chosen by the submitter.
///
/// `query` and `items` are optional so that a malformed submission can be represented and
/// rejected by validation; a missing item list is different from an empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
	pub id: Uuid,
	pub query: Option<Query>,
	pub items: Option<Vec<ResultItem>>,
	pub corpus: Option<String>,
	/// Name of the search provider that produced the hits, when known.
	pub provider: Option<String>,
}
impl ResultSet {
	pub fn new(id: Uuid, query: Query, items: Vec<ResultItem>) -> Self {
		Self { id, query: Some(query), items: Some(items), corpus: None, provider: None }
	}

	pub fn items(&self) -> &[ResultItem] {
		self.items.as_deref().unwrap_or_default()
	}

	pub fn user_id(&self) -> Option<&str> {
		self.query.as_ref().and_then(|query| query.user_id.as_deref())
	}

	pub fn query_name(&self) -> Option<&str> {
		self.query.as_ref().and_then(|query| query.name.as_deref())
	}

	pub fn search_type(&self) -> crate::SearchType {
		self.query.as_ref().map(|query| query.search_type).unwrap_or_default()
	}

	pub fn with_corpus(mut self, corpus: impl Into<String>) -> Self {
		self.corpus = Some(corpus.into());

		self
	}
}
