use std::{collections::HashMap, sync::Arc};

use serde_json::{Map, Value};

use lodestar_config::{PluginConfig, SearchProviderConfig};
use lodestar_providers::search::HttpSearchClient;

use crate::{
	Error, Result, ResultsPlugin, SearchProvider,
	plugins::{CorpusAllowlist, Dedup, MinItems, MinScore},
};

type ProviderConstructor =
	Box<dyn Fn(&SearchProviderConfig, u64) -> Result<Arc<dyn SearchProvider>> + Send + Sync>;
type PluginConstructor =
	Box<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn ResultsPlugin>> + Send + Sync>;

/// Maps a provider `kind` from configuration to its constructor.
pub struct ProviderRegistry {
	constructors: HashMap<String, ProviderConstructor>,
}
impl ProviderRegistry {
	pub const HTTP: &'static str = "http";

	pub fn empty() -> Self {
		Self { constructors: HashMap::new() }
	}

	pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
	where
		F: Fn(&SearchProviderConfig, u64) -> Result<Arc<dyn SearchProvider>> + Send + Sync + 'static,
	{
		self.constructors.insert(kind.into(), Box::new(constructor));
	}

	pub fn build(
		&self,
		cfg: &SearchProviderConfig,
		default_timeout_ms: u64,
	) -> Result<Arc<dyn SearchProvider>> {
		let constructor = self.constructors.get(&cfg.kind).ok_or_else(|| {
			Error::validation(format!(
				"Search provider {:?} has unknown kind {:?}.",
				cfg.name, cfg.kind
			))
		})?;

		constructor(cfg, default_timeout_ms)
	}
}
impl Default for ProviderRegistry {
	fn default() -> Self {
		let mut registry = Self::empty();

		registry.register(Self::HTTP, |cfg, default_timeout_ms| {
			let client = HttpSearchClient::new(cfg, default_timeout_ms)?;

			Ok(Arc::new(client) as Arc<dyn SearchProvider>)
		});

		registry
	}
}

/// Maps a plugin `kind` from configuration to its constructor.
pub struct PluginRegistry {
	constructors: HashMap<String, PluginConstructor>,
}
impl PluginRegistry {
	pub fn empty() -> Self {
		Self { constructors: HashMap::new() }
	}

	pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
	where
		F: Fn(&Map<String, Value>) -> Result<Arc<dyn ResultsPlugin>> + Send + Sync + 'static,
	{
		self.constructors.insert(kind.into(), Box::new(constructor));
	}

	pub fn build(&self, cfg: &PluginConfig) -> Result<Arc<dyn ResultsPlugin>> {
		let constructor = self.constructors.get(&cfg.kind).ok_or_else(|| {
			Error::validation(format!("Unknown results plugin kind {:?}.", cfg.kind))
		})?;

		constructor(&cfg.params)
	}

	/// Builds the filter chain in declaration order.
	pub fn build_chain(&self, configs: &[PluginConfig]) -> Result<Vec<Arc<dyn ResultsPlugin>>> {
		configs.iter().map(|cfg| self.build(cfg)).collect()
	}
}
impl Default for PluginRegistry {
	fn default() -> Self {
		let mut registry = Self::empty();

		registry.register(MinItems::KIND, |params| {
			Ok(Arc::new(MinItems::from_params(params)?) as Arc<dyn ResultsPlugin>)
		});
		registry.register(MinScore::KIND, |params| {
			Ok(Arc::new(MinScore::from_params(params)?) as Arc<dyn ResultsPlugin>)
		});
		registry.register(CorpusAllowlist::KIND, |params| {
			Ok(Arc::new(CorpusAllowlist::from_params(params)?) as Arc<dyn ResultsPlugin>)
		});
		registry.register(Dedup::KIND, |_| Ok(Arc::new(Dedup::default()) as Arc<dyn ResultsPlugin>));

		registry
	}
}
