use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use lodestar_config::SearchProviderConfig;
use lodestar_domain::{Query, ResultSet, SearchCapability, ServiceInfo};

use crate::{Error, Result};

/// JSON-over-HTTP client for one remote search service.
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
	name: String,
	api_base: String,
	client: Client,
	headers: HeaderMap,
}
impl HttpSearchClient {
	pub fn new(cfg: &SearchProviderConfig, default_timeout_ms: u64) -> Result<Self> {
		let timeout_ms = cfg.timeout_ms.unwrap_or(default_timeout_ms);
		let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
		let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;

		Ok(Self { name: cfg.name.clone(), api_base: cfg.api_base.clone(), client, headers })
	}

	pub async fn search(&self, query: &Query) -> Result<ResultSet> {
		let json: Value = self
			.client
			.post(self.url("search"))
			.headers(self.headers.clone())
			.json(query)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;

		parse_search_response(json, &self.name)
	}

	pub async fn alive(&self) -> Result<bool> {
		let json = self.get_json("alive").await?;

		parse_alive_response(&json)
	}

	pub async fn about(&self) -> Result<ServiceInfo> {
		let json = self.get_json("about").await?;

		Ok(serde_json::from_value(json)?)
	}

	pub async fn capabilities(&self) -> Result<Vec<SearchCapability>> {
		let json = self.get_json("capabilities").await?;

		parse_list_field(json, "capabilities")
	}

	pub async fn corpora(&self) -> Result<Vec<String>> {
		let json = self.get_json("corpora").await?;

		parse_list_field(json, "corpora")
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{path}", self.api_base)
	}

	async fn get_json(&self, path: &str) -> Result<Value> {
		let res = self.client.get(self.url(path)).headers(self.headers.clone()).send().await?;

		Ok(res.error_for_status()?.json().await?)
	}
}

fn parse_search_response(json: Value, provider: &str) -> Result<ResultSet> {
	if json.is_null() {
		return Err(Error::InvalidResponse {
			message: format!("Search provider {provider:?} returned no result set."),
		});
	}

	let mut result_set: ResultSet = serde_json::from_value(json)?;

	if result_set.items.is_none() {
		return Err(Error::InvalidResponse {
			message: format!("Search provider {provider:?} returned a result set without items."),
		});
	}

	result_set.provider.get_or_insert_with(|| provider.to_string());

	Ok(result_set)
}

fn parse_alive_response(json: &Value) -> Result<bool> {
	json.get("alive").and_then(Value::as_bool).ok_or_else(|| Error::InvalidResponse {
		message: "Alive response is missing a boolean alive field.".to_string(),
	})
}

fn parse_list_field<T>(mut json: Value, field: &str) -> Result<Vec<T>>
where
	T: serde::de::DeserializeOwned,
{
	let Some(list) = json.get_mut(field).map(Value::take) else {
		return Err(Error::InvalidResponse {
			message: format!("Response is missing the {field} list."),
		});
	};

	Ok(serde_json::from_value(list)?)
}
