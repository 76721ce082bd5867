//! Loading configuration from disk.

use std::io::Write;

use marketlens_core::data::DataError;
use marketlens_core::MarketLensConfig;

#[test]
fn loads_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let toml = r#"
[provider]
timeout_secs = 10
user_agent = "marketlens-test"

[circuit_breaker]
cooldown_secs = 60
failure_threshold = 5
"#;
    write!(file, "{toml}").unwrap();

    let config = MarketLensConfig::from_file(file.path()).unwrap();
    assert_eq!(config.provider.timeout_secs, 10);
    assert_eq!(config.provider.user_agent, "marketlens-test");
    assert_eq!(config.provider.max_retries, 3);
    assert_eq!(config.circuit_breaker.failure_threshold, 5);
    assert_eq!(config.resolver.window_days, 5);

    let breaker = config.circuit_breaker.build();
    assert!(breaker.is_allowed());
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MarketLensConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, DataError::ConfigError(_)));
}

#[test]
fn malformed_file_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[provider\ntimeout_secs = ").unwrap();
    let err = MarketLensConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, DataError::ConfigError(_)));
}
