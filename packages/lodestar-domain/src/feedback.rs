use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{query::SearchType, result_set::ResultSet};

/// Limit value meaning "return every matching record".
pub const NO_LIMIT: usize = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackValue {
	#[default]
	None,
	Positive,
	Negative,
}
impl FeedbackValue {
	pub fn as_i16(self) -> i16 {
		match self {
			Self::None => 0,
			Self::Positive => 1,
			Self::Negative => -1,
		}
	}

	pub fn from_i16(raw: i16) -> Option<Self> {
		match raw {
			0 => Some(Self::None),
			1 => Some(Self::Positive),
			-1 => Some(Self::Negative),
			_ => None,
		}
	}

	pub fn score(self) -> f64 {
		f64::from(self.as_i16())
	}
}

/// Identity of a sentence-level hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SentenceKey {
	pub communication_id: String,
	pub sentence_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
	pub communication_id: String,
	pub sentence_id: Option<String>,
	pub value: FeedbackValue,
}
impl FeedbackItem {
	pub fn matches(&self, communication_id: &str, sentence_id: Option<&str>) -> bool {
		self.communication_id == communication_id && self.sentence_id.as_deref() == sentence_id
	}
}

/// Durable feedback state for one registered result set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
	pub result_set_id: Uuid,
	pub search_type: SearchType,
	pub user_id: Option<String>,
	pub query_name: Option<String>,
	pub created_at: OffsetDateTime,
	pub result_set: ResultSet,
	pub items: Vec<FeedbackItem>,
}
impl FeedbackRecord {
	/// Builds a record with one unrated item per hit. Repeated hits collapse into one item.
	pub fn from_result_set(result_set: ResultSet, created_at: OffsetDateTime) -> Self {
		let mut items: Vec<FeedbackItem> = Vec::with_capacity(result_set.items().len());

		for hit in result_set.items() {
			if items.iter().any(|item| item.matches(&hit.communication_id, hit.sentence_id.as_deref()))
			{
				continue;
			}

			items.push(FeedbackItem {
				communication_id: hit.communication_id.clone(),
				sentence_id: hit.sentence_id.clone(),
				value: FeedbackValue::None,
			});
		}

		Self {
			result_set_id: result_set.id,
			search_type: result_set.search_type(),
			user_id: result_set.user_id().map(str::to_string),
			query_name: result_set.query_name().map(str::to_string),
			created_at,
			result_set,
			items,
		}
	}

	pub fn item_mut(
		&mut self,
		communication_id: &str,
		sentence_id: Option<&str>,
	) -> Option<&mut FeedbackItem> {
		self.items.iter_mut().find(|item| item.matches(communication_id, sentence_id))
	}

	pub fn communication_feedback(&self) -> HashMap<String, FeedbackValue> {
		self.items.iter().map(|item| (item.communication_id.clone(), item.value)).collect()
	}

	pub fn sentence_feedback(&self) -> HashMap<SentenceKey, FeedbackValue> {
		self.items
			.iter()
			.filter_map(|item| {
				let sentence_id = item.sentence_id.clone()?;

				Some((
					SentenceKey { communication_id: item.communication_id.clone(), sentence_id },
					item.value,
				))
			})
			.collect()
	}

	/// Copy of the result set whose item scores carry the recorded feedback; unrated hits
	/// score 0.0.
	pub fn annotated_result_set(&self) -> ResultSet {
		let mut annotated = self.result_set.clone();

		if let Some(hits) = annotated.items.as_mut() {
			for hit in hits {
				hit.score = self
					.items
					.iter()
					.find(|item| item.matches(&hit.communication_id, hit.sentence_id.as_deref()))
					.map(|item| item.value.score())
					.unwrap_or(0.0);
			}
		}

		annotated
	}
}

/// Filter for historical feedback queries. Every criterion is optional; absent criteria do not
/// constrain the result and present ones are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackQuery {
	/// Exclusive lower bound on the registration time.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub start: Option<OffsetDateTime>,
	/// Exclusive upper bound on the registration time.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub end: Option<OffsetDateTime>,
	pub user_names: Option<Vec<String>>,
	pub query_names: Option<Vec<String>>,
	/// Maximum number of records; [`NO_LIMIT`] returns all.
	#[serde(default)]
	pub limit: usize,
}
impl FeedbackQuery {
	pub fn matches(
		&self,
		created_at: OffsetDateTime,
		user_id: Option<&str>,
		query_name: Option<&str>,
	) -> bool {
		if let Some(start) = self.start
			&& created_at <= start
		{
			return false;
		}
		if let Some(end) = self.end
			&& created_at >= end
		{
			return false;
		}

		contains(self.user_names.as_deref(), user_id)
			&& contains(self.query_names.as_deref(), query_name)
	}

	pub fn matches_record(&self, record: &FeedbackRecord) -> bool {
		self.matches(record.created_at, record.user_id.as_deref(), record.query_name.as_deref())
	}

	pub fn limit(&self) -> Option<usize> {
		(self.limit != NO_LIMIT).then_some(self.limit)
	}
}

fn contains(allowed: Option<&[String]>, value: Option<&str>) -> bool {
	match allowed {
		None => true,
		Some(allowed) => value.map(|value| allowed.iter().any(|name| name == value)).unwrap_or(false),
	}
}

/// Document-level feedback aggregated for one result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunicationFeedback {
	pub result_set: ResultSet,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	pub feedback: HashMap<String, FeedbackValue>,
}
impl From<&FeedbackRecord> for CommunicationFeedback {
	fn from(record: &FeedbackRecord) -> Self {
		Self {
			result_set: record.result_set.clone(),
			created_at: record.created_at,
			feedback: record.communication_feedback(),
		}
	}
}

/// Sentence-level feedback aggregated for one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceFeedback {
	pub result_set: ResultSet,
	pub created_at: OffsetDateTime,
	pub feedback: HashMap<SentenceKey, FeedbackValue>,
}
impl From<&FeedbackRecord> for SentenceFeedback {
	fn from(record: &FeedbackRecord) -> Self {
		Self {
			result_set: record.result_set.clone(),
			created_at: record.created_at,
			feedback: record.sentence_feedback(),
		}
	}
}
