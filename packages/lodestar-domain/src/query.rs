use serde::{Deserialize, Serialize};

/// Granularity of the hits a query asks for, and therefore of the feedback collected on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
	#[default]
	Communications,
	Sentences,
}
impl SearchType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Communications => "communications",
			Self::Sentences => "sentences",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"communications" => Some(Self::Communications),
			"sentences" => Some(Self::Sentences),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
	pub raw_query: Option<String>,
	#[serde(default)]
	pub terms: Vec<String>,
	#[serde(default)]
	pub questions: Vec<String>,
	pub name: Option<String>,
	pub user_id: Option<String>,
	#[serde(default, rename = "type")]
	pub search_type: SearchType,
	pub corpus: Option<String>,
	pub k: Option<u32>,
}
impl Query {
	pub fn new(raw_query: impl Into<String>) -> Self {
		Self { raw_query: Some(raw_query.into()), ..Default::default() }
	}

	/// Raw query text, or `None` when it is missing or blank.
	pub fn raw_text(&self) -> Option<&str> {
		self.raw_query.as_deref().filter(|raw| !raw.trim().is_empty())
	}

	pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	pub fn with_search_type(mut self, search_type: SearchType) -> Self {
		self.search_type = search_type;

		self
	}
}
