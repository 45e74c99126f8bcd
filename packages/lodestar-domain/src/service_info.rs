use serde::{Deserialize, Serialize};

use crate::query::SearchType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
	pub name: String,
	pub version: String,
	pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCapability {
	#[serde(rename = "type")]
	pub search_type: SearchType,
	pub lang: String,
}

/// A value reported by one provider, labelled with that provider's registered name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTagged<T> {
	pub provider: String,
	pub value: T,
}
