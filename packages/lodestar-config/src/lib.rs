mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Feedback, Learning, PluginConfig, Postgres, Results, Search, SearchProviderConfig,
	Service, Storage,
};

use std::{collections::HashSet, fs, path::Path};

pub const FEEDBACK_BACKENDS: [&str; 2] = ["postgres", "memory"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.search.default_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.default_timeout_ms must be greater than zero.".to_string(),
		});
	}

	let mut names = HashSet::new();

	for provider in &cfg.search.providers {
		if provider.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "search.providers.name must be non-empty.".to_string(),
			});
		}
		if !names.insert(provider.name.as_str()) {
			return Err(Error::Validation {
				message: format!("search.providers.name {:?} is declared twice.", provider.name),
			});
		}
		if provider.kind.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("search.providers.{}.kind must be non-empty.", provider.name),
			});
		}
		if provider.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("search.providers.{}.api_base must be non-empty.", provider.name),
			});
		}
		if provider.timeout_ms == Some(0) {
			return Err(Error::Validation {
				message: format!(
					"search.providers.{}.timeout_ms must be greater than zero.",
					provider.name
				),
			});
		}
	}

	if let Some(targets) = cfg.search.default_targets.as_ref() {
		for target in targets {
			if !names.contains(target.as_str()) {
				return Err(Error::Validation {
					message: format!(
						"search.default_targets references unknown provider {target:?}."
					),
				});
			}
		}
	}
	if cfg.results.max_entries == Some(0) {
		return Err(Error::Validation {
			message: "results.max_entries must be greater than zero.".to_string(),
		});
	}

	for plugin in &cfg.results.plugins {
		if plugin.kind.trim().is_empty() {
			return Err(Error::Validation {
				message: "results.plugins.kind must be non-empty.".to_string(),
			});
		}
	}

	if !FEEDBACK_BACKENDS.contains(&cfg.feedback.backend.as_str()) {
		return Err(Error::Validation {
			message: "feedback.backend must be one of postgres or memory.".to_string(),
		});
	}
	if cfg.feedback.cache_capacity == 0 {
		return Err(Error::Validation {
			message: "feedback.cache_capacity must be greater than zero.".to_string(),
		});
	}
	if cfg.learning.enabled {
		if cfg.learning.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: "learning.api_base must be non-empty when learning is enabled."
					.to_string(),
			});
		}
		if cfg.learning.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "learning.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for provider in &mut cfg.search.providers {
		if provider.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			provider.api_key = None;
		}
		provider.api_base = provider.api_base.trim_end_matches('/').to_string();
	}

	if cfg.search.default_targets.as_ref().map(|targets| targets.is_empty()).unwrap_or(false) {
		cfg.search.default_targets = None;
	}
	if cfg.learning.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.learning.api_key = None;
	}

	cfg.learning.api_base = cfg.learning.api_base.trim_end_matches('/').to_string();
}
