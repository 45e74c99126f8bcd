use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	#[serde(default)]
	pub results: Results,
	#[serde(default)]
	pub feedback: Feedback,
	#[serde(default)]
	pub learning: Learning,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_timeout_ms")]
	pub default_timeout_ms: u64,
	/// Optional. Providers used when a dispatch names no targets. Empty or absent means every
	/// registered provider.
	pub default_targets: Option<Vec<String>>,
	#[serde(default)]
	pub providers: Vec<SearchProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProviderConfig {
	pub name: String,
	/// Registry key used to pick the provider constructor, e.g. "http".
	pub kind: String,
	pub api_base: String,
	pub timeout_ms: Option<u64>,
	pub api_key: Option<String>,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Results {
	/// Optional. Upper bound on registered result sets kept in memory.
	pub max_entries: Option<usize>,
	/// Filter chain, applied in declaration order.
	pub plugins: Vec<PluginConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
	pub kind: String,
	#[serde(default)]
	pub params: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Feedback {
	pub backend: String,
	pub cache_capacity: u64,
}
impl Default for Feedback {
	fn default() -> Self {
		Self { backend: "postgres".to_string(), cache_capacity: 10_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Learning {
	pub enabled: bool,
	pub api_base: String,
	pub timeout_ms: u64,
	pub api_key: Option<String>,
	pub default_headers: Map<String, Value>,
}
impl Default for Learning {
	fn default() -> Self {
		Self {
			enabled: false,
			api_base: String::new(),
			timeout_ms: 2_000,
			api_key: None,
			default_headers: Map::new(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_timeout_ms() -> u64 {
	5_000
}
