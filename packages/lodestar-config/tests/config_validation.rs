use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use lodestar_config::Config;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn render(value: &Value) -> String {
	toml::to_string(value).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("lodestar_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML.to_string());
	let result = lodestar_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected sample config to load.");

	assert_eq!(cfg.search.providers.len(), 2);
	assert_eq!(cfg.search.providers[0].name, "primary");
	assert_eq!(cfg.search.providers[0].api_base, "http://127.0.0.1:9090");
	assert!(cfg.search.providers[0].api_key.is_none(), "Blank api_key must normalize to None.");
	assert_eq!(cfg.search.providers[1].timeout_ms, None);
	assert_eq!(cfg.results.plugins.len(), 2);
	assert_eq!(cfg.results.plugins[0].params.get("min"), Some(&serde_json::json!(1)));
	assert_eq!(cfg.feedback.cache_capacity, 10_000);
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let mut value = sample_value();
	let root = value.as_table_mut().expect("Sample config must be a table.");

	root.remove("results");
	root.remove("feedback");
	root.remove("learning");

	let path = write_temp_config(render(&value));
	let result = lodestar_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected config without optional sections to load.");

	assert!(cfg.results.plugins.is_empty());
	assert_eq!(cfg.results.max_entries, None);
	assert_eq!(cfg.feedback.backend, "postgres");
	assert!(!cfg.learning.enabled);
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("lodestar_config_test_missing.toml");
	let err = lodestar_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, lodestar_config::Error::ReadConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn provider_names_must_be_unique() {
	let mut cfg = base_config();

	cfg.search.providers[1].name = "primary".to_string();

	let err = lodestar_config::validate(&cfg).expect_err("Expected duplicate name error.");

	assert!(err.to_string().contains("is declared twice"), "Unexpected error: {err}");
}

#[test]
fn provider_timeout_must_be_positive() {
	let mut cfg = base_config();

	cfg.search.providers[0].timeout_ms = Some(0);

	let err = lodestar_config::validate(&cfg).expect_err("Expected timeout error.");

	assert!(
		err.to_string().contains("search.providers.primary.timeout_ms must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_targets_must_name_known_providers() {
	let mut cfg = base_config();

	cfg.search.default_targets = Some(vec!["primary".to_string(), "missing".to_string()]);

	let err = lodestar_config::validate(&cfg).expect_err("Expected unknown target error.");

	assert!(err.to_string().contains("unknown provider \"missing\""), "Unexpected error: {err}");

	cfg.search.default_targets = Some(vec!["archive".to_string()]);

	assert!(lodestar_config::validate(&cfg).is_ok());
}

#[test]
fn feedback_backend_must_be_known() {
	let mut cfg = base_config();

	cfg.feedback.backend = "sqlite".to_string();

	let err = lodestar_config::validate(&cfg).expect_err("Expected backend error.");

	assert!(
		err.to_string().contains("feedback.backend must be one of postgres or memory."),
		"Unexpected error: {err}"
	);
}

#[test]
fn bounded_stores_reject_zero_capacity() {
	let mut cfg = base_config();

	cfg.results.max_entries = Some(0);

	assert!(lodestar_config::validate(&cfg).is_err());

	cfg = base_config();
	cfg.feedback.cache_capacity = 0;

	assert!(lodestar_config::validate(&cfg).is_err());
}

#[test]
fn learning_requires_endpoint_when_enabled() {
	let mut cfg = base_config();

	cfg.learning.enabled = true;
	cfg.learning.api_base = " ".to_string();

	let err = lodestar_config::validate(&cfg).expect_err("Expected learning endpoint error.");

	assert!(
		err.to_string().contains("learning.api_base must be non-empty when learning is enabled."),
		"Unexpected error: {err}"
	);
}
