use std::{sync::Arc, time::Duration};

use serde::Serialize;
use uuid::Uuid;

use lodestar_domain::{
	ProviderTagged, Query, ResultItem, ResultSet, SearchCapability, ServiceInfo,
};

use crate::{BoxFuture, Error, ProviderFailure, Result, SearchProvider};

struct RegisteredProvider {
	name: String,
	provider: Arc<dyn SearchProvider>,
	timeout: Duration,
}

/// Number of hits one provider contributed to a merged result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
	pub provider: String,
	pub items: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
	pub result_set: ResultSet,
	/// Contributing providers, in registration order.
	pub segments: Vec<Segment>,
	pub failures: Vec<ProviderFailure>,
}

/// Routes queries to named search providers and merges their answers.
pub struct SearchRouter {
	providers: Vec<RegisteredProvider>,
	default_targets: Option<Vec<String>>,
	default_timeout: Duration,
}
impl SearchRouter {
	pub fn new(default_timeout: Duration) -> Self {
		Self { providers: Vec::new(), default_targets: None, default_timeout }
	}

	/// Providers used when a dispatch names no targets. Unknown names fail at dispatch.
	pub fn with_default_targets(mut self, targets: Vec<String>) -> Self {
		self.default_targets = (!targets.is_empty()).then_some(targets);

		self
	}

	pub fn register(
		&mut self,
		name: impl Into<String>,
		provider: Arc<dyn SearchProvider>,
		timeout: Option<Duration>,
	) -> Result<()> {
		let name = name.into();

		if name.trim().is_empty() {
			return Err(Error::validation("Search provider name cannot be empty."));
		}
		if self.providers.iter().any(|entry| entry.name == name) {
			return Err(Error::validation(format!(
				"Search provider {name:?} is already registered."
			)));
		}

		let timeout = timeout.unwrap_or(self.default_timeout);

		tracing::info!(
			provider = %name,
			timeout_ms = timeout.as_millis() as u64,
			"Registered search provider."
		);

		self.providers.push(RegisteredProvider { name, provider, timeout });

		Ok(())
	}

	pub fn provider_names(&self) -> Vec<&str> {
		self.providers.iter().map(|entry| entry.name.as_str()).collect()
	}

	/// Sends the query to the targeted providers and concatenates the hits of every provider
	/// that answered, in registration order. Fails only when all targets failed.
	pub async fn dispatch(
		&self,
		query: &Query,
		targets: Option<&[String]>,
	) -> Result<DispatchOutcome> {
		let Some(raw_query) = query.raw_text() else {
			return Err(Error::validation("Search query cannot be empty."));
		};
		let targets = self.resolve_targets(targets)?;

		tracing::info!(raw_query, targets = targets.len(), "Dispatching search query.");
		tracing::debug!(terms = ?query.terms, questions = ?query.questions, "Search query details.");

		let shared = Arc::new(query.clone());
		let answers = fan_out(&targets, |provider| {
			let query = shared.clone();

			Box::pin(async move { provider.search(&query).await })
		})
		.await;
		let mut items: Vec<ResultItem> = Vec::new();
		let mut segments = Vec::new();
		let mut failures = Vec::new();

		for (provider, answer) in answers {
			let reason = match answer {
				Ok(result_set) if !result_set.items().is_empty() => {
					let hits = result_set.items.unwrap_or_default();

					segments.push(Segment { provider, items: hits.len() });
					items.extend(hits);

					continue;
				},
				Ok(_) => "Provider returned no results.".to_string(),
				Err(reason) => reason,
			};

			tracing::warn!(provider = %provider, reason = %reason, "Search provider failed.");

			failures.push(ProviderFailure { provider, reason });
		}

		if segments.is_empty() {
			return Err(Error::AggregateDispatch { failures });
		}

		tracing::info!(items = items.len(), providers = segments.len(), "Merged search results.");

		let provider = match segments.as_slice() {
			[only] => Some(only.provider.clone()),
			_ => None,
		};
		let result_set = ResultSet {
			id: Uuid::new_v4(),
			query: Some(query.clone()),
			items: Some(items),
			corpus: query.corpus.clone(),
			provider,
		};

		Ok(DispatchOutcome { result_set, segments, failures })
	}

	/// True when at least one provider reports itself alive.
	pub async fn alive(&self) -> bool {
		let targets: Vec<&RegisteredProvider> = self.providers.iter().collect();
		let answers = fan_out(&targets, |provider| Box::pin(async move { provider.alive().await }))
			.await;

		answers.into_iter().any(|(_, answer)| matches!(answer, Ok(true)))
	}

	pub async fn about(&self) -> Vec<ProviderTagged<ServiceInfo>> {
		let targets: Vec<&RegisteredProvider> = self.providers.iter().collect();
		let answers =
			fan_out(&targets, |provider| Box::pin(async move { provider.about().await })).await;

		tag_answers("about", answers).collect()
	}

	pub async fn capabilities(&self) -> Vec<ProviderTagged<SearchCapability>> {
		let targets: Vec<&RegisteredProvider> = self.providers.iter().collect();
		let answers =
			fan_out(&targets, |provider| Box::pin(async move { provider.capabilities().await }))
				.await;

		flatten(tag_answers("capabilities", answers))
	}

	pub async fn corpora(&self) -> Vec<ProviderTagged<String>> {
		let targets: Vec<&RegisteredProvider> = self.providers.iter().collect();
		let answers =
			fan_out(&targets, |provider| Box::pin(async move { provider.corpora().await })).await;

		flatten(tag_answers("corpora", answers))
	}

	fn resolve_targets(&self, targets: Option<&[String]>) -> Result<Vec<&RegisteredProvider>> {
		if self.providers.is_empty() {
			return Err(Error::validation("No search providers are registered."));
		}

		let names = match targets {
			Some([]) => return Err(Error::validation("Target provider list cannot be empty.")),
			Some(names) => names,
			None => match self.default_targets.as_deref() {
				Some(names) => names,
				None => return Ok(self.providers.iter().collect()),
			},
		};

		for name in names {
			if !self.providers.iter().any(|entry| &entry.name == name) {
				return Err(Error::validation(format!("Unknown search provider {name:?}.")));
			}
		}

		Ok(self.providers.iter().filter(|entry| names.contains(&entry.name)).collect())
	}
}

/// Runs one call per provider concurrently, each under its own timeout, and returns the answers
/// in the order of `targets`.
async fn fan_out<T, F>(
	targets: &[&RegisteredProvider],
	call: F,
) -> Vec<(String, std::result::Result<T, String>)>
where
	T: Send + 'static,
	F: Fn(Arc<dyn SearchProvider>) -> BoxFuture<'static, Result<T>>,
{
	let handles: Vec<_> = targets
		.iter()
		.map(|entry| {
			let future = call(entry.provider.clone());
			let timeout = entry.timeout;
			let handle = tokio::spawn(async move { tokio::time::timeout(timeout, future).await });

			(entry.name.clone(), timeout, handle)
		})
		.collect();
	let mut answers = Vec::with_capacity(handles.len());

	for (name, timeout, handle) in handles {
		let answer = match handle.await {
			Ok(Ok(Ok(value))) => Ok(value),
			Ok(Ok(Err(err))) => Err(err.to_string()),
			Ok(Err(_)) => Err(format!("Timed out after {} ms.", timeout.as_millis())),
			Err(err) => Err(format!("Provider task aborted: {err}")),
		};

		answers.push((name, answer));
	}

	answers
}

fn tag_answers<T>(
	operation: &'static str,
	answers: Vec<(String, std::result::Result<T, String>)>,
) -> impl Iterator<Item = ProviderTagged<T>> {
	answers.into_iter().filter_map(move |(provider, answer)| match answer {
		Ok(value) => Some(ProviderTagged { provider, value }),
		Err(reason) => {
			tracing::warn!(provider = %provider, operation, reason = %reason, "Skipping provider.");

			None
		},
	})
}

fn flatten<T>(tagged: impl Iterator<Item = ProviderTagged<Vec<T>>>) -> Vec<ProviderTagged<T>> {
	tagged
		.flat_map(|ProviderTagged { provider, value }| {
			value.into_iter().map(move |value| ProviderTagged { provider: provider.clone(), value })
		})
		.collect()
}
