//! Loading hook settings from files and the environment.

#![allow(unsafe_code)] // For env var manipulation in tests

use change_notify::error::HookError;
use change_notify::prelude::*;
use change_notify::publish::SubscriberRegistry;
use change_notify::settings::SettingsLoader;
use change_notify::store::MemoryStore;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_hook_from_yaml_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notify.yaml");
    fs::write(
        &path,
        r#"
destination: "https://sqs.eu-west-1.amazonaws.com/123456789012/orders"
message_body: '{"event":"order-status-changed"}'
call_timeout_ms: 5000
publish_timeout_ms: 1000
"#,
    )
    .unwrap();

    let hook = ChangeNotifyHook::builder(MemoryStore::new("id"))
        .with_publisher(SubscriberRegistry::new())
        .with_settings_file(&path)
        .build()
        .unwrap();

    let settings = hook.settings();
    assert_eq!(
        settings.destination,
        "https://sqs.eu-west-1.amazonaws.com/123456789012/orders"
    );
    assert_eq!(
        settings.message_body.as_deref(),
        Some(r#"{"event":"order-status-changed"}"#)
    );
    assert_eq!(settings.call_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(settings.publish_timeout(), Some(Duration::from_secs(1)));
    assert!(settings.serialize_calls);
}

#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notify.toml");
    fs::write(&path, "destination = \"file-queue\"\ncall_timeout_ms = 100\n").unwrap();

    unsafe {
        env::set_var("CN_ENV_TEST_DESTINATION", "env-queue");
        env::set_var("CN_ENV_TEST_SERIALIZE_CALLS", "false");
    }

    let result = SettingsLoader::new()
        .with_file(&path)
        .with_env_overrides("CN_ENV_TEST", "__")
        .load();

    unsafe {
        env::remove_var("CN_ENV_TEST_DESTINATION");
        env::remove_var("CN_ENV_TEST_SERIALIZE_CALLS");
    }

    let settings = result.unwrap();
    assert_eq!(settings.destination, "env-queue");
    assert!(!settings.serialize_calls);
    assert_eq!(settings.call_timeout_ms, Some(100));
}

#[test]
fn test_env_only() {
    unsafe {
        env::set_var("CN_ENV_ONLY_DESTINATION", "env-only-queue");
        env::set_var("CN_ENV_ONLY_PUBLISH_TIMEOUT_MS", "250");
    }

    let result = ChangeNotifyHook::builder(MemoryStore::new("id"))
        .with_publisher(SubscriberRegistry::new())
        .with_env_overrides("CN_ENV_ONLY", "__")
        .build();

    unsafe {
        env::remove_var("CN_ENV_ONLY_DESTINATION");
        env::remove_var("CN_ENV_ONLY_PUBLISH_TIMEOUT_MS");
    }

    let settings = result.unwrap().settings();
    assert_eq!(settings.destination, "env-only-queue");
    assert_eq!(settings.publish_timeout_ms, Some(250));
}

#[test]
fn test_invalid_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notify.json");
    fs::write(&path, r#"{ "destination": "orders", "call_timeout_ms": 0 }"#).unwrap();

    let result = ChangeNotifyHook::builder(MemoryStore::new("id"))
        .with_publisher(SubscriberRegistry::new())
        .with_settings_file(&path)
        .build();

    assert!(matches!(result, Err(HookError::Validation(msg)) if msg.contains("call_timeout_ms")));
}

#[test]
fn test_code_override_fixes_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notify.yaml");
    fs::write(&path, "publish_timeout_ms: 400\n").unwrap();

    let hook = ChangeNotifyHook::builder(MemoryStore::new("id"))
        .with_publisher(SubscriberRegistry::new())
        .with_settings_file(&path)
        .with_destination("orders")
        .build()
        .unwrap();

    assert_eq!(hook.settings().destination, "orders");
    assert_eq!(hook.settings().publish_timeout_ms, Some(400));
}

#[test]
fn test_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notify.yaml");
    fs::write(&path, "destination: [unclosed\n").unwrap();

    let result = SettingsLoader::new().with_file(&path).load();
    assert!(matches!(result, Err(HookError::Settings(_))));
}

#[test]
fn test_rejected_update_keeps_settings() {
    let hook = ChangeNotifyHook::builder(MemoryStore::new("id"))
        .with_publisher(SubscriberRegistry::new())
        .with_destination("orders")
        .build()
        .unwrap();

    let mut bad = HookSettings::new("orders-v2");
    bad.publish_timeout_ms = Some(0);
    assert!(hook.update_settings(bad).is_err());
    assert_eq!(hook.settings().destination, "orders");
    assert_eq!(hook.settings().publish_timeout_ms, None);
}
