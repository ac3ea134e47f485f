// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the wasend configuration system.

use wasend_config::diagnostic::ConfigError;
use wasend_config::model::WasendConfig;
use wasend_config::{load_and_validate_str, load_config_from_str};

/// A fully populated file deserializes into every section.
#[test]
fn full_toml_deserializes() {
    let toml = r#"
[service]
name = "sheet-sender"
log_level = "debug"

[gateway]
host = "127.0.0.1"
port = 8080
bearer_token = "tok"

[bridge]
base_url = "http://sidecar:3001"
api_key = "k"
request_timeout_secs = 5

[dispatch]
readiness_timeout_ms = 2500
send_timeout_secs = 20
check_liveness = false
queue_capacity = 4

[webhook]
url = "https://script.google.com/macros/s/abc/exec"
secret = "s3cret"
timeout_secs = 15

[reconnect]
base_delay_ms = 500
max_delay_ms = 8000
max_attempts = 5
liveness_interval_secs = 20
probe_timeout_secs = 3

[prometheus]
enabled = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "sheet-sender");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bearer_token.as_deref(), Some("tok"));
    assert_eq!(config.bridge.base_url, "http://sidecar:3001");
    assert_eq!(config.bridge.request_timeout().as_secs(), 5);
    assert_eq!(config.dispatch.readiness_timeout().as_millis(), 2500);
    assert_eq!(config.dispatch.send_timeout().as_secs(), 20);
    assert!(!config.dispatch.check_liveness);
    assert_eq!(config.dispatch.queue_capacity, 4);
    assert_eq!(config.webhook.secret.as_deref(), Some("s3cret"));
    assert_eq!(config.webhook.timeout().as_secs(), 15);
    assert_eq!(config.reconnect.max_attempts, 5);
    assert!(!config.prometheus.enabled);
}

/// An empty file yields the compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "wasend");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 3000);
    assert!(config.gateway.bearer_token.is_none());
    assert_eq!(config.bridge.base_url, "http://127.0.0.1:3001");
    assert_eq!(config.dispatch.readiness_timeout_ms, 10_000);
    assert_eq!(config.dispatch.send_timeout_secs, 30);
    assert!(config.dispatch.check_liveness);
    assert!(config.webhook.url.is_none());
    assert_eq!(config.webhook.timeout_secs, 30);
    assert_eq!(config.reconnect.base_delay_ms, 1_000);
    assert_eq!(config.reconnect.max_delay_ms, 60_000);
    assert_eq!(config.reconnect.max_attempts, 10);
    assert_eq!(config.reconnect.liveness_interval_secs, 30);
    assert!(config.prometheus.enabled);
}

/// Misspelled key in a section is rejected.
#[test]
fn unknown_field_in_section_is_rejected() {
    let toml = r#"
[dispatch]
send_timout_secs = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("send_timout_secs"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Dotted overrides (what the WASEND_ env mapper produces) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: WasendConfig = Figment::new()
        .merge(Serialized::defaults(WasendConfig::default()))
        .merge(Toml::string("[webhook]\nurl = \"https://from-toml\"\n"))
        .merge(("webhook.url", "https://from-env"))
        .merge(("dispatch.send_timeout_secs", 7))
        .extract()
        .expect("should merge override");

    assert_eq!(config.webhook.url.as_deref(), Some("https://from-env"));
    assert_eq!(config.dispatch.send_timeout_secs, 7);
}

/// load_and_validate_str turns an unknown key into a suggestion diagnostic.
#[test]
fn validate_str_reports_unknown_key_with_suggestion() {
    let errors = load_and_validate_str("[reconnect]\nmax_attempt = 3\n").unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey { key, suggestion, .. } => {
            assert_eq!(key, "max_attempt");
            assert_eq!(suggestion.as_deref(), Some("max_attempts"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// load_and_validate_str runs semantic validation after parsing.
#[test]
fn validate_str_runs_semantic_checks() {
    let toml = r#"
[reconnect]
base_delay_ms = 10000
max_delay_ms = 1000
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
    assert!(errors[0].to_string().contains("reconnect.base_delay_ms"));
}

/// Wrong value type produces an InvalidType diagnostic.
#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").unwrap_err();
    assert!(
        matches!(errors[0], ConfigError::InvalidType { .. }),
        "got {:?}",
        errors[0]
    );
}

/// Defaults serialize back to TOML (used by `wasend config`).
#[test]
fn defaults_round_trip_through_toml() {
    let rendered = toml::to_string_pretty(&WasendConfig::default()).expect("serialize");
    assert!(rendered.contains("[dispatch]"));
    let parsed = load_config_from_str(&rendered).expect("re-parse");
    assert_eq!(parsed.gateway.port, 3000);
}
