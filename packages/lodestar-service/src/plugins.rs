//! Built-in filters for the registration chain.

use std::{
	collections::{HashMap, HashSet},
	sync::{Mutex, PoisonError},
};

use serde_json::{Map, Value};
use uuid::Uuid;

use lodestar_domain::ResultSet;

use crate::{Error, Result, ResultsPlugin};

/// Rejects result sets with fewer than `min` hits.
#[derive(Debug)]
pub struct MinItems {
	min: usize,
}
impl MinItems {
	pub const KIND: &'static str = "min_items";

	pub fn new(min: usize) -> Self {
		Self { min }
	}

	pub fn from_params(params: &Map<String, Value>) -> Result<Self> {
		let min = optional_u64(params, Self::KIND, "min")?.unwrap_or(1);
		let min = usize::try_from(min)
			.map_err(|_| Error::validation(format!("{}.min is out of range.", Self::KIND)))?;

		Ok(Self::new(min))
	}
}
impl ResultsPlugin for MinItems {
	fn name(&self) -> &str {
		Self::KIND
	}

	fn process(&self, result_set: &ResultSet) -> bool {
		result_set.items().len() >= self.min
	}
}

/// Rejects result sets whose best hit scores below `min`. Empty result sets are rejected.
#[derive(Debug)]
pub struct MinScore {
	min: f64,
}
impl MinScore {
	pub const KIND: &'static str = "min_score";

	pub fn new(min: f64) -> Self {
		Self { min }
	}

	pub fn from_params(params: &Map<String, Value>) -> Result<Self> {
		let min = params.get("min").and_then(Value::as_f64).ok_or_else(|| {
			Error::validation(format!("{}.min must be a number.", Self::KIND))
		})?;

		Ok(Self::new(min))
	}
}
impl ResultsPlugin for MinScore {
	fn name(&self) -> &str {
		Self::KIND
	}

	fn process(&self, result_set: &ResultSet) -> bool {
		result_set.items().iter().any(|item| item.score >= self.min)
	}
}

/// Accepts only result sets from the listed corpora. The result set's own corpus wins over the
/// corpus named in its query.
#[derive(Debug)]
pub struct CorpusAllowlist {
	corpora: HashSet<String>,
}
impl CorpusAllowlist {
	pub const KIND: &'static str = "corpus_allowlist";

	pub fn new<I, S>(corpora: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { corpora: corpora.into_iter().map(Into::into).collect() }
	}

	pub fn from_params(params: &Map<String, Value>) -> Result<Self> {
		let invalid =
			|| Error::validation(format!("{}.corpora must be a list of strings.", Self::KIND));
		let raw = params.get("corpora").and_then(Value::as_array).ok_or_else(invalid)?;
		let mut corpora = Vec::with_capacity(raw.len());

		for value in raw {
			corpora.push(value.as_str().ok_or_else(invalid)?.to_string());
		}

		Ok(Self::new(corpora))
	}
}
impl ResultsPlugin for CorpusAllowlist {
	fn name(&self) -> &str {
		Self::KIND
	}

	fn process(&self, result_set: &ResultSet) -> bool {
		let corpus = result_set
			.corpus
			.as_deref()
			.or_else(|| result_set.query.as_ref().and_then(|query| query.corpus.as_deref()));

		corpus.map(|corpus| self.corpora.contains(corpus)).unwrap_or(false)
	}
}

/// Rejects result sets whose content repeats an already committed one under a different id.
///
/// Content is the user, the raw query, and the ordered hit list. Re-registering a known id passes,
/// so the Result Store can union its task types.
#[derive(Debug, Default)]
pub struct Dedup {
	committed: Mutex<HashMap<Fingerprint, Uuid>>,
}
impl Dedup {
	pub const KIND: &'static str = "dedup";
}
impl ResultsPlugin for Dedup {
	fn name(&self) -> &str {
		Self::KIND
	}

	fn process(&self, result_set: &ResultSet) -> bool {
		let committed = self.committed.lock().unwrap_or_else(PoisonError::into_inner);

		committed.get(&Fingerprint::of(result_set)).is_none_or(|id| *id == result_set.id)
	}

	fn committed(&self, result_set: &ResultSet) {
		self.committed
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.entry(Fingerprint::of(result_set))
			.or_insert(result_set.id);
	}
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct Fingerprint {
	user_id: Option<String>,
	raw_query: Option<String>,
	hits: Vec<(String, Option<String>)>,
}
impl Fingerprint {
	fn of(result_set: &ResultSet) -> Self {
		let query = result_set.query.as_ref();

		Self {
			user_id: result_set.user_id().map(str::to_string),
			raw_query: query.and_then(|query| query.raw_text()).map(str::to_string),
			hits: result_set
				.items()
				.iter()
				.map(|item| (item.communication_id.clone(), item.sentence_id.clone()))
				.collect(),
		}
	}
}

fn optional_u64(params: &Map<String, Value>, kind: &str, key: &str) -> Result<Option<u64>> {
	match params.get(key) {
		None => Ok(None),
		Some(value) => value.as_u64().map(Some).ok_or_else(|| {
			Error::validation(format!("{kind}.{key} must be a non-negative integer."))
		}),
	}
}
