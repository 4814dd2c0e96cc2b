//! Unit tests for config_store module
//! Entry validation, change events and subscriber dispatch. No filesystem.

#![allow(clippy::panic, clippy::unwrap_used)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Value, json};

use crate::config::DEFAULT_HANDLER_TIMEOUT;
use crate::config_store::{
    ChangeHandler, ConfigChange, ConfigEntry, ConfigError, EntryInput, HandlerError, Scope,
    Subscription, broadcast::SubscriberRegistry,
};

fn entry(prompt: &str) -> ConfigEntry {
    EntryInput::new(prompt).into_entry(None)
}

fn recorder(log: Arc<Mutex<Vec<String>>>, label: &'static str) -> impl ChangeHandler {
    move |change: ConfigChange| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(format!("{label}:{}", change.key));
            Ok::<(), HandlerError>(())
        }
    }
}

#[test]
fn entry_input_from_json() {
    let input = EntryInput::from_json(&json!({
        "prompt": "hi",
        "tools": ["search", "scrape"],
        "metadata": {"lang": "vi"}
    }))
    .unwrap();

    assert_eq!(input.prompt, "hi");
    assert_eq!(input.tools, vec!["search", "scrape"]);
    assert_eq!(input.metadata.get("lang"), Some(&json!("vi")));
}

#[test]
fn entry_input_requires_all_fields() {
    let cases = [
        (json!({"tools": [], "metadata": {}}), "prompt"),
        (json!({"prompt": "hi", "metadata": {}}), "tools"),
        (json!({"prompt": "hi", "tools": []}), "metadata"),
    ];

    for (payload, missing) in cases {
        match EntryInput::from_json(&payload).unwrap_err() {
            ConfigError::Validation { field, .. } => assert_eq!(field, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn entry_input_rejects_wrong_shapes() {
    assert!(EntryInput::from_json(&json!("hi")).is_err());
    assert!(EntryInput::from_json(&json!({"prompt": 1, "tools": [], "metadata": {}})).is_err());
    assert!(EntryInput::from_json(&json!({"prompt": "hi", "tools": [1], "metadata": {}})).is_err());
    assert!(EntryInput::from_json(&json!({"prompt": "hi", "tools": [], "metadata": []})).is_err());
}

#[test]
fn entry_input_ignores_caller_timestamp() {
    let input = EntryInput::from_json(&json!({
        "prompt": "hi",
        "tools": [],
        "metadata": {},
        "updated_at": "1999-01-01T00:00:00Z"
    }))
    .unwrap();

    let before = Utc::now();
    let stored = input.into_entry(None);
    assert!(stored.updated_at >= before);
}

#[test]
fn validate_rejects_blank_prompt() {
    let err = EntryInput::new("   ").validate().unwrap_err();
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "prompt"));
}

#[test]
fn validate_rejects_empty_tool() {
    let err = EntryInput::new("hi")
        .with_tool("search")
        .with_tool("")
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "tools"));
}

#[test]
fn validate_accepts_empty_tools_and_metadata() {
    assert!(EntryInput::new("hi").validate().is_ok());
}

#[test]
fn stamp_never_goes_backwards() {
    let mut previous = entry("old");
    previous.updated_at = Utc::now() + ChronoDuration::hours(1);

    let next = EntryInput::new("new").into_entry(Some(&previous));
    assert_eq!(next.updated_at, previous.updated_at);

    let fresh = EntryInput::new("newer").into_entry(Some(&entry("older")));
    assert!(fresh.updated_at >= Utc::now() - ChronoDuration::seconds(5));
}

#[test]
fn entry_serializes_iso8601_timestamp() {
    let stored = entry("hi");
    let value = serde_json::to_value(&stored).unwrap();

    let raw = value["updated_at"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(raw).is_ok());
    assert_eq!(value["prompt"], json!("hi"));
    assert_eq!(value["tools"], json!([]));
    assert_eq!(value["metadata"], json!({}));
}

#[test]
fn entry_reads_offsetless_timestamp() {
    let parsed: ConfigEntry = serde_json::from_value(json!({
        "prompt": "hi",
        "tools": ["search"],
        "metadata": {},
        "updated_at": "2024-05-01T10:20:30.123456"
    }))
    .unwrap();

    assert_eq!(parsed.updated_at.to_rfc3339(), "2024-05-01T10:20:30.123456+00:00");
}

#[test]
fn entry_input_roundtrips_from_entry() {
    let stored = EntryInput::new("hi")
        .with_tool("search")
        .with_metadata("owner", json!("ops"))
        .into_entry(None);

    let input = EntryInput::from(stored.clone());
    assert_eq!(input.prompt, stored.prompt);
    assert_eq!(input.tools, stored.tools);
    assert_eq!(input.metadata, stored.metadata);
}

#[test]
fn scope_matching() {
    assert!(Scope::exact("bot-1").matches("bot-1"));
    assert!(!Scope::exact("bot-1").matches("bot-2"));
    assert!(Scope::All.matches("bot-2"));
    assert!(Scope::exact("*").matches("*"));
    assert!(!Scope::exact("*").matches("bot-1"));
}

#[test]
fn scope_display() {
    assert_eq!(Scope::exact("bot-1").to_string(), "bot-1");
    assert_eq!(Scope::All.to_string(), "<all>");
}

#[tokio::test]
async fn dispatch_runs_exact_before_wildcard() {
    let registry = SubscriberRegistry::new(DEFAULT_HANDLER_TIMEOUT);
    let log = Arc::new(Mutex::new(Vec::new()));

    registry.register(Scope::All, Arc::new(recorder(log.clone(), "all-1")));
    registry.register(Scope::exact("bot-1"), Arc::new(recorder(log.clone(), "exact-1")));
    registry.register(Scope::exact("bot-2"), Arc::new(recorder(log.clone(), "other")));
    registry.register(Scope::All, Arc::new(recorder(log.clone(), "all-2")));
    registry.register(Scope::exact("bot-1"), Arc::new(recorder(log.clone(), "exact-2")));

    let change = ConfigChange::new("bot-1".to_string(), None, Some(entry("hi")));
    let report = registry.dispatch(&change).await;

    assert_eq!(report.delivered, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["exact-1:bot-1", "exact-2:bot-1", "all-1:bot-1", "all-2:bot-1"]
    );
}

#[tokio::test]
async fn dispatch_isolates_failures_and_panics() {
    let registry = SubscriberRegistry::new(DEFAULT_HANDLER_TIMEOUT);
    let log = Arc::new(Mutex::new(Vec::new()));

    registry.register(
        Scope::All,
        Arc::new(|_change: ConfigChange| async {
            Err::<(), HandlerError>("handler exploded".into())
        }),
    );
    registry.register(
        Scope::All,
        Arc::new(|change: ConfigChange| async move {
            if change.key == "bot-1" {
                panic!("handler panicked");
            }
            Ok::<(), HandlerError>(())
        }),
    );
    registry.register(Scope::All, Arc::new(recorder(log.clone(), "survivor")));

    let change = ConfigChange::new("bot-1".to_string(), None, Some(entry("hi")));
    let report = registry.dispatch(&change).await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(*log.lock().unwrap(), vec!["survivor:bot-1"]);
}

#[tokio::test]
async fn dispatch_without_subscribers() {
    let registry = SubscriberRegistry::new(DEFAULT_HANDLER_TIMEOUT);
    let change = ConfigChange::new("bot-1".to_string(), None, None);

    let report = registry.dispatch(&change).await;
    assert_eq!(report.delivered + report.failed, 0);
}

#[test]
fn registry_remove() {
    let registry = SubscriberRegistry::new(DEFAULT_HANDLER_TIMEOUT);
    let log = Arc::new(Mutex::new(Vec::new()));

    let id = registry.register(Scope::All, Arc::new(recorder(log, "x")));
    assert_eq!(registry.len(), 1);
    assert!(registry.remove(id));
    assert!(!registry.remove(id));
    assert_eq!(registry.len(), 0);
}

#[tokio::test]
async fn subscription_receives_and_unregisters_on_drop() {
    let registry = SubscriberRegistry::new(DEFAULT_HANDLER_TIMEOUT);

    {
        let mut sub = Subscription::open(&registry, Scope::exact("bot-1"), 4);
        assert_eq!(registry.len(), 1);

        let change = ConfigChange::new("bot-1".to_string(), None, Some(entry("hi")));
        registry.dispatch(&change).await;

        let received = sub.recv().await.unwrap();
        assert_eq!(received.key, "bot-1");
        assert!(sub.receiver_mut().try_recv().is_err());
    }

    assert_eq!(registry.len(), 0);
}

#[tokio::test]
async fn full_subscription_buffer_counts_as_failure() {
    let registry = SubscriberRegistry::new(DEFAULT_HANDLER_TIMEOUT);
    let _sub = Subscription::open(&registry, Scope::All, 1);

    let change = ConfigChange::new("bot-1".to_string(), None, Some(entry("hi")));
    assert_eq!(registry.dispatch(&change).await.delivered, 1);
    assert_eq!(registry.dispatch(&change).await.failed, 1);
}

#[tokio::test]
async fn dispatch_aborts_handler_past_timeout() {
    let registry = SubscriberRegistry::new(Duration::from_millis(50));
    let log = Arc::new(Mutex::new(Vec::new()));

    registry.register(
        Scope::All,
        Arc::new(|_change: ConfigChange| async {
            futures::future::pending::<()>().await;
            Ok::<(), HandlerError>(())
        }),
    );
    registry.register(Scope::All, Arc::new(recorder(log.clone(), "after")));

    let change = ConfigChange::new("bot-1".to_string(), None, Some(entry("hi")));
    let report = tokio::time::timeout(Duration::from_secs(5), registry.dispatch(&change))
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(*log.lock().unwrap(), vec!["after:bot-1"]);
}

#[tokio::test]
async fn closed_registry_refuses_registrations() {
    let registry = SubscriberRegistry::new(DEFAULT_HANDLER_TIMEOUT);
    let mut open = Subscription::open(&registry, Scope::All, 4);

    registry.close();
    assert_eq!(registry.len(), 0);
    assert!(open.recv().await.is_none());

    let mut late = Subscription::open(&registry, Scope::All, 4);
    assert_eq!(registry.len(), 0);
    assert!(late.recv().await.is_none());

    let change = ConfigChange::new("bot-1".to_string(), None, Some(entry("hi")));
    assert_eq!(registry.dispatch(&change).await, Default::default());
}

#[test]
fn metadata_value_extraction() {
    let stored = EntryInput::new("hi")
        .with_metadata("max_tokens", json!(2048))
        .with_metadata("model", Value::String("llama3".to_string()))
        .into_entry(None);
    let change = ConfigChange::new("bot-1".to_string(), None, Some(stored));

    assert_eq!(change.metadata_value::<u32>("max_tokens").unwrap(), 2048);
    assert_eq!(change.metadata_value::<String>("model").unwrap(), "llama3");
    assert!(matches!(
        change.metadata_value::<u32>("model"),
        Err(ConfigError::TypeMismatch { .. })
    ));
    assert!(matches!(
        change.metadata_value::<u32>("missing"),
        Err(ConfigError::InvalidField { .. })
    ));
}
