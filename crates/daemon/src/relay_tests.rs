// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial(env)]
fn from_env_none_without_url() {
    std::env::remove_var(ENV_RELAY_URL);
    std::env::remove_var(ENV_RELAY_KEY);
    std::env::remove_var(ENV_RELAY_INTERVAL);
    assert!(RelayConfig::from_env().is_none());
}

#[test]
#[serial(env)]
fn from_env_reads_url_key_and_interval() {
    std::env::set_var(ENV_RELAY_URL, "https://relay.example/api/push");
    std::env::set_var(ENV_RELAY_KEY, "secret-key");
    std::env::set_var(ENV_RELAY_INTERVAL, "45");

    let config = RelayConfig::from_env().unwrap();
    assert_eq!(config.url, "https://relay.example/api/push");
    assert_eq!(config.api_key, "secret-key");
    assert_eq!(config.interval, Duration::from_secs(45));

    std::env::remove_var(ENV_RELAY_URL);
    std::env::remove_var(ENV_RELAY_KEY);
    std::env::remove_var(ENV_RELAY_INTERVAL);
}

#[test]
#[serial(env)]
fn interval_defaults_when_unset_or_garbage() {
    std::env::set_var(ENV_RELAY_URL, "https://relay.example");
    std::env::set_var(ENV_RELAY_INTERVAL, "not-a-number");
    let config = RelayConfig::from_env().unwrap();
    assert_eq!(config.interval, Duration::from_secs(30));
    std::env::remove_var(ENV_RELAY_URL);
    std::env::remove_var(ENV_RELAY_INTERVAL);
}

#[tokio::test]
async fn push_to_unreachable_endpoint_is_an_error_not_a_panic() {
    let client = RelayClient::new(RelayConfig {
        // Reserved TEST-NET address, nothing listens there
        url: "http://192.0.2.1:9/push".to_string(),
        api_key: "k".to_string(),
        interval: Duration::from_secs(30),
    });
    let snapshot = MonitorSnapshot::new(1, 10.0, chrono::Utc::now());
    let result = client.push(&snapshot).await;
    assert!(matches!(result, Err(RelayError::Push(_))));
}
