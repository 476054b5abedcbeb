//! Error handling and edge case tests.

mod common;

use common::{vars, TestEngine};
use graphql_subscriptions::{
    Arguments, ChannelSubscriptionId, Delivery, ManagerConfig, PubSub, PubSubEngine,
    RootFieldPolicy, SetupFunctions, SubscriptionError, SubscriptionId, SubscriptionManager,
    SubscriptionRequest, TriggerMap,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

fn test_manager() -> SubscriptionManager<TestEngine, Arc<PubSub>> {
    SubscriptionManager::new(TestEngine::new(), Arc::new(PubSub::new()), SetupFunctions::new())
}

// --- Subscribe Errors ---

#[test]
fn test_missing_query() {
    let manager = test_manager();

    let request = SubscriptionRequest::<Value> {
        query: None,
        ..Default::default()
    };
    let result = manager.subscribe(request);

    assert!(matches!(result, Err(SubscriptionError::MissingField("query"))));
}

#[test]
fn test_syntax_error() {
    let manager = test_manager();

    let result = manager.subscribe(SubscriptionRequest::new("subscription {"));

    assert!(matches!(result, Err(SubscriptionError::Syntax(_))));
    assert_eq!(manager.subscription_count(), 0);
    assert_eq!(manager.pubsub().subscription_count(), 0);
}

#[test]
fn test_validation_error_is_distinct_from_syntax_error() {
    let manager = test_manager();

    let result = manager.subscribe(SubscriptionRequest::new("query a{ testInt }"));

    match result {
        Err(err @ SubscriptionError::Validation { .. }) => {
            assert_eq!(err.to_string(), "There was a problem with your subscription");
            if let SubscriptionError::Validation { violations } = err {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].message.contains("testInt"));
                assert_eq!(violations[0].locations.len(), 1);
            }
        }
        other => panic!("Expected Validation error, got {:?}", other),
    }
    assert_eq!(manager.pubsub().subscription_count(), 0);
}

#[test]
fn test_query_operation_rejected() {
    let manager = test_manager();

    let result = manager.subscribe(SubscriptionRequest::new("query a { testString }"));

    assert!(matches!(result, Err(SubscriptionError::NotASubscription("query"))));
}

#[test]
fn test_multiple_root_fields_strict() {
    let manager = test_manager();

    let result = manager.subscribe(SubscriptionRequest::new(
        "subscription { test_subscription test_context }",
    ));

    assert!(matches!(result, Err(SubscriptionError::MultipleRootFields(_))));
    assert_eq!(manager.pubsub().subscription_count(), 0);
}

#[test]
fn test_multiple_root_fields_first_selection() {
    let pubsub = Arc::new(PubSub::new());
    let manager = SubscriptionManager::with_config(
        TestEngine::new(),
        pubsub.clone(),
        SetupFunctions::new(),
        ManagerConfig {
            root_field_policy: RootFieldPolicy::FirstSelection,
            ..Default::default()
        },
    );

    manager
        .subscribe(SubscriptionRequest::new(
            "subscription { test_subscription test_context }",
        ))
        .unwrap();

    assert_eq!(pubsub.listener_count("test_subscription"), 1);
    assert_eq!(pubsub.listener_count("test_context"), 0);
}

#[test]
fn test_invalid_argument_value() {
    let manager = test_manager();

    let result = manager.subscribe(
        SubscriptionRequest::new("subscription S($id: ID!) { post_updated(id: $id) }")
            .variables(vars(json!({}))),
    );

    assert!(matches!(result, Err(SubscriptionError::InvalidArgument { .. })));
}

#[test]
fn test_setup_function_without_triggers() {
    let setup = SetupFunctions::new().with("test_subscription", |_req, _args: &Arguments, _name: &str| {
        TriggerMap::new()
    });
    let manager = SubscriptionManager::new(TestEngine::new(), PubSub::new(), setup);

    let result = manager.subscribe(SubscriptionRequest::new("subscription { test_subscription }"));

    assert!(matches!(result, Err(SubscriptionError::NoTriggers(_))));
    assert_eq!(manager.pubsub().subscription_count(), 0);
}

#[test]
fn test_failed_subscribe_does_not_consume_id() {
    let manager = test_manager();

    assert!(manager.subscribe(SubscriptionRequest::new("subscription {")).is_err());
    let id = manager
        .subscribe(SubscriptionRequest::new("subscription { test_subscription }"))
        .unwrap();

    assert_eq!(id, SubscriptionId(1));
}

// --- Unsubscribe Errors ---

#[test]
fn test_unsubscribe_unknown_id() {
    let manager = test_manager();

    let result = manager.unsubscribe(SubscriptionId(42));

    assert!(matches!(
        result,
        Err(SubscriptionError::SubscriptionNotFound(SubscriptionId(42)))
    ));
}

#[test]
fn test_unsubscribe_twice_fails_both_times() {
    let manager = test_manager();
    let id = manager
        .subscribe(SubscriptionRequest::new("subscription { test_subscription }"))
        .unwrap();

    manager.unsubscribe(id).unwrap();

    for _ in 0..2 {
        assert!(matches!(
            manager.unsubscribe(id),
            Err(SubscriptionError::SubscriptionNotFound(_))
        ));
    }
}

#[test]
fn test_channel_already_removed_reported() {
    let manager = test_manager();
    let id = manager
        .subscribe(SubscriptionRequest::new("subscription { test_subscription }"))
        .unwrap();

    // Remove the bus registration behind the manager's back.
    let channel_id = manager.channel_ids(id).unwrap()[0];
    manager.pubsub().unsubscribe(channel_id).unwrap();

    let result = manager.unsubscribe(id);
    assert!(matches!(
        result,
        Err(SubscriptionError::ChannelSubscriptionNotFound(ChannelSubscriptionId(1)))
    ));
    // The subscription is gone regardless.
    assert_eq!(manager.subscription_count(), 0);
}

// --- Execution Errors ---

#[test]
fn test_execution_error_delivered_to_callback() {
    let manager = test_manager();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    manager
        .subscribe(
            SubscriptionRequest::new("subscription { post_updated(id: 1) }")
                .callback(move |delivery: Delivery| sink.lock().push(delivery)),
        )
        .unwrap();

    // Resolver fails on a payload without a title; publish still succeeds.
    assert!(manager.publish("post_updated", &json!({"id": 1})));
    assert!(manager.publish("post_updated", &json!({"id": 1, "title": "ok"})));

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    let err = seen[0].as_ref().unwrap_err();
    assert!(err.message.contains("post has no title"));
    assert_eq!(
        seen[1].as_ref().unwrap().data,
        Some(json!({"post_updated": "ok"}))
    );
}

#[test]
fn test_execution_error_does_not_stop_other_subscribers() {
    let manager = test_manager();
    let seen = Arc::new(Mutex::new(Vec::new()));

    manager
        .subscribe(SubscriptionRequest::new("subscription { post_updated(id: 1) }"))
        .unwrap();
    let sink = seen.clone();
    manager
        .subscribe(
            SubscriptionRequest::new("subscription { post_updated(id: 1) }")
                .callback(move |delivery: Delivery| sink.lock().push(delivery.is_ok())),
        )
        .unwrap();

    manager.publish("post_updated", &json!({}));

    assert_eq!(*seen.lock(), vec![false]);
}
