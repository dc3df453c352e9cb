//! Integration tests for the settings manager over the in-memory repository

mod common;

use chrono::{DateTime, TimeZone, Utc};
use common::{harness, init_tracing, print_test_header, Team, User};
use scoped_settings::{
    DatePeriod, EntryFilter, HasSettings, OwnerRef, Settings, SettingsApi, SettingsError, Value,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_set_and_get_plain_value() {
    let h = harness(false);

    h.settings.scoped().set("theme", "dark").await.unwrap();
    let value = h.settings.scoped().get("theme").await.unwrap();

    assert_eq!(value, Value::from("dark"));
}

#[tokio::test]
async fn test_missing_key_returns_default() {
    let h = harness(false);

    assert_eq!(h.settings.scoped().get("nope").await.unwrap(), Value::Null);
    assert_eq!(
        h.settings.scoped().get_or("nope", 25).await.unwrap(),
        Value::from(25)
    );
}

#[tokio::test]
async fn test_stored_null_wins_over_default() {
    let h = harness(false);

    h.settings.scoped().set("nickname", Value::Null).await.unwrap();

    let value = h.settings.scoped().get_or("nickname", "anonymous").await.unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_datetime_and_period_round_trip() {
    print_test_header(
        "test_datetime_and_period_round_trip",
        "Date-times and periods come back as the same domain values.",
    );
    let h = harness(false);
    let launch = DateTime::parse_from_rfc3339("2024-09-01T09:30:00.250+02:00").unwrap();
    let window = DatePeriod::new(
        DateTime::parse_from_rfc3339("2024-12-20T00:00:00Z").unwrap(),
        DateTime::parse_from_rfc3339("2025-01-06T23:59:59Z").unwrap(),
    );

    h.settings
        .scoped()
        .set_many([("launch", Value::from(launch)), ("freeze", Value::from(window))])
        .await
        .unwrap();

    let values = h.settings.scoped().get_many(["launch", "freeze"]).await.unwrap();
    assert_eq!(values["launch"], Value::DateTime(launch));
    assert_eq!(values["freeze"], Value::Period(window));
}

#[tokio::test]
async fn test_nested_casts_round_trip() {
    let h = harness(false);
    let opened = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let value: Value = [
        ("opened", Value::from(opened)),
        ("labels", Value::from(vec!["a", "b"])),
        ("limits", Value::from(json!({"daily": 10, "nested": {"deep": [1, 2]}}))),
    ]
    .into_iter()
    .collect();

    h.settings.scoped().set("profile", value.clone()).await.unwrap();

    assert_eq!(h.settings.scoped().get("profile").await.unwrap(), value);
}

#[tokio::test]
async fn test_explicit_cast_directive() {
    let h = harness(false);

    h.settings
        .scoped()
        .set("token", Value::cast("dummy", "secret"))
        .await
        .unwrap();

    let stored = &h.settings.entries(EntryFilter::new()).await.unwrap()[0];
    assert_eq!(stored.payload, json!({"$value": "dummy value", "$cast": "dummy"}));
    assert_eq!(
        h.settings.scoped().get("token").await.unwrap(),
        Value::from("dummy value")
    );
}

#[tokio::test]
async fn test_write_with_unregistered_cast_fails_before_storage() {
    let h = harness(false);

    let err = h
        .settings
        .scoped()
        .set_many([("ok", Value::from(1)), ("bad", Value::cast("money", 5))])
        .await
        .unwrap_err();

    assert_eq!(err, SettingsError::missing_handler("money"));
    assert_eq!(h.repo.writes(), 0);
    assert!(h.repo.inner.is_empty());
}

#[tokio::test]
async fn test_read_with_unregistered_cast_fails_for_any_key() {
    print_test_header(
        "test_read_with_unregistered_cast_fails_for_any_key",
        "A payload tagged with an unknown cast raises the missing-handler error on read.",
    );
    let h = harness(false);
    let filter = EntryFilter::new();
    h.repo
        .inner
        .insert_raw(&filter, "price", json!({"$value": "9.99", "$cast": "money"}));
    h.repo
        .inner
        .insert_raw(&filter, "nested", json!({"items": [{"$value": 1, "$cast": "money"}]}));

    for key in ["price", "nested"] {
        let err = h.settings.scoped().get(key).await.unwrap_err();
        assert_eq!(err, SettingsError::missing_handler("money"));
    }
    assert!(matches!(
        h.settings.scoped().all().await,
        Err(SettingsError::MissingCastHandler { .. })
    ));
}

#[tokio::test]
async fn test_upsert_keeps_single_entry() {
    let h = harness(false);
    let user = User::saved(1);

    h.settings.for_owner(&user).unwrap().set("lang", "en").await.unwrap();
    h.settings.for_owner(&user).unwrap().set("lang", "fr").await.unwrap();

    assert_eq!(h.repo.inner.len(), 1);
    assert_eq!(
        h.settings.for_owner(&user).unwrap().get("lang").await.unwrap(),
        Value::from("fr")
    );

    let entries = h.settings.for_owner(&user).unwrap().filter().clone();
    let rows = h.settings.entries(entries).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].updated_at >= rows[0].created_at);
}

#[tokio::test]
async fn test_multi_key_get_fills_defaults() {
    let h = harness(false);
    h.settings.scoped().set("a", 1).await.unwrap();

    let values = h.settings.scoped().get_many(["a", "b"]).await.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values["a"], Value::from(1));
    assert_eq!(values["b"], Value::Null);

    let values = h.settings.scoped().get_many_or(["b", "a"], false).await.unwrap();
    assert_eq!(values.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    assert_eq!(values["b"], Value::from(false));
}

#[tokio::test]
async fn test_all_honors_excepts() {
    let h = harness(false);
    h.settings
        .scoped()
        .set_many([("secret", "hunter2"), ("theme", "dark"), ("lang", "en")])
        .await
        .unwrap();

    let everything = h.settings.except(["secret"]).all().await.unwrap();
    assert!(!everything.contains_key("secret"));
    assert_eq!(everything.len(), 2);

    // Multi-key reads skip excepted keys as well
    let values = h.settings.except(["secret"]).get_many(["secret", "lang"]).await.unwrap();
    assert_eq!(values["secret"], Value::Null);
    assert_eq!(values["lang"], Value::from("en"));
}

#[tokio::test]
async fn test_scope_does_not_leak_into_next_call() {
    print_test_header(
        "test_scope_does_not_leak_into_next_call",
        "A call without scope configuration behaves as if no scope was ever set.",
    );
    let h = harness(false);
    let user = User::saved(9);

    h.settings.scoped().set("theme", "light").await.unwrap();
    h.settings
        .group("ui")
        .for_owner(&user)
        .unwrap()
        .except(["theme"])
        .set("theme", "dark")
        .await
        .unwrap();

    assert_eq!(h.settings.scoped().get("theme").await.unwrap(), Value::from("light"));

    h.settings.group("ui").for_owner(&user).unwrap().except(["theme"]).all().await.unwrap();
    let all = h.settings.scoped().all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all["theme"], Value::from("light"));
}

#[tokio::test]
async fn test_failed_operation_does_not_leak_scope() {
    let h = harness(false);
    h.settings.scoped().set("x", 1).await.unwrap();

    let err = h
        .settings
        .group("billing")
        .set("x", Value::cast("money", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SettingsError::MissingCastHandler { .. }));

    assert_eq!(h.settings.scoped().get("x").await.unwrap(), Value::from(1));
}

#[tokio::test]
async fn test_groups_and_owners_are_isolated() {
    let h = harness(false);
    let alice = User::saved(1);
    let bob = User::saved(2);
    let team = Team {
        slug: "1".to_string(),
    };

    h.settings.scoped().set("limit", 10).await.unwrap();
    h.settings.group("billing").set("limit", 20).await.unwrap();
    h.settings.for_owner(&alice).unwrap().set("limit", 30).await.unwrap();
    h.settings.for_owner(&team).unwrap().set("limit", 40).await.unwrap();

    assert_eq!(h.settings.scoped().get("limit").await.unwrap(), Value::from(10));
    assert_eq!(h.settings.group("billing").get("limit").await.unwrap(), Value::from(20));
    assert_eq!(
        h.settings.for_owner(&alice).unwrap().get("limit").await.unwrap(),
        Value::from(30)
    );
    // Same id, different owner type
    assert_eq!(
        h.settings.for_owner(&team).unwrap().get("limit").await.unwrap(),
        Value::from(40)
    );
    assert_eq!(
        h.settings.for_owner(&bob).unwrap().get("limit").await.unwrap(),
        Value::Null
    );
    assert_eq!(h.repo.inner.len(), 4);
}

#[tokio::test]
async fn test_forget_is_scoped_and_tolerates_missing_keys() {
    let h = harness(false);
    let user = User::saved(5);

    h.settings.scoped().set("lang", "en").await.unwrap();
    h.settings.for_owner(&user).unwrap().set("lang", "de").await.unwrap();
    h.settings.group("other").set("lang", "it").await.unwrap();

    h.settings
        .for_owner(&user)
        .unwrap()
        .forget_many(["lang", "never-stored"])
        .await
        .unwrap();

    assert_eq!(
        h.settings.for_owner(&user).unwrap().get("lang").await.unwrap(),
        Value::Null
    );
    assert_eq!(h.settings.scoped().get("lang").await.unwrap(), Value::from("en"));
    assert_eq!(h.settings.group("other").get("lang").await.unwrap(), Value::from("it"));

    h.settings.scoped().forget("missing").await.unwrap();
}

#[tokio::test]
async fn test_exists_treats_null_as_absent() {
    let h = harness(false);
    h.settings.scoped().set("enabled", false).await.unwrap();
    h.settings.scoped().set("cleared", Value::Null).await.unwrap();

    assert!(h.settings.scoped().exists("enabled").await.unwrap());
    assert!(!h.settings.scoped().exists("cleared").await.unwrap());
    assert!(!h.settings.scoped().exists("unknown").await.unwrap());
}

#[tokio::test]
async fn test_invalid_owner_is_rejected_immediately() {
    let h = harness(false);
    let unsaved = User { id: None };

    let err = h.settings.for_owner(&unsaved).err().unwrap();
    assert!(matches!(err, SettingsError::InvalidOwner { .. }));
    assert!(unsaved.settings(&h.settings).is_err());
    assert_eq!(h.repo.reads() + h.repo.writes(), 0);
}

#[tokio::test]
async fn test_has_settings_scopes_to_entity() {
    let h = harness(false);
    let user = User::saved(77);

    user.settings(&h.settings).unwrap().set("digest", "weekly").await.unwrap();

    assert_eq!(
        h.settings
            .scoped()
            .for_owner_ref(OwnerRef::new("user", "77"))
            .get("digest")
            .await
            .unwrap(),
        Value::from("weekly")
    );
    assert_eq!(h.settings.scoped().get("digest").await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_api_trait_object_with_explicit_filter() {
    let h = harness(false);
    let api: Arc<dyn SettingsApi> = Arc::new(h.settings);

    let mut filter = EntryFilter::new();
    filter.set_group("flags");
    api.set(filter.clone(), "beta", Value::from(true)).await.unwrap();

    assert_eq!(api.get(filter.clone(), "beta", Value::Null).await.unwrap(), Value::from(true));
    assert!(api.exists(filter, "beta").await.unwrap());
    assert!(!api.exists(EntryFilter::new(), "beta").await.unwrap());
}

#[tokio::test]
async fn test_storage_errors_surface_without_retry() {
    init_tracing();
    let settings = Settings::new(
        Arc::new(common::FailingRepo),
        Arc::new(scoped_settings::InMemoryCache::new()),
        Arc::new(common::test_casts()),
        Default::default(),
    );

    let err = settings.scoped().get("x").await.unwrap_err();
    assert!(matches!(err, SettingsError::Storage { ref message } if message.contains("connection refused")));
    assert!(matches!(
        settings.scoped().set("x", 1).await,
        Err(SettingsError::Storage { .. })
    ));
}
