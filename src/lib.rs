//! # GraphQL Subscriptions
//!
//! A subscription dispatch layer on top of a GraphQL engine and a
//! publish/subscribe channel bus.
//!
//! ## Core Concepts
//!
//! - **Channel bus**: named channels; publishing runs every listener in line
//! - **Binder**: parses and validates a subscription, finds its root field
//!   and coerces the field's arguments
//! - **Triggers**: the channels a root field listens on, with filters and
//!   channel options, chosen by an optional setup function
//! - **Subscription manager**: one external id per subscribe call, one bus
//!   registration per trigger, re-execution per event
//!
//! ## Example
//!
//! ```ignore
//! use graphql_subscriptions::{
//!     PubSub, SetupFunctions, SubscriptionManager, SubscriptionRequest, TriggerBinding, TriggerMap,
//! };
//!
//! let setup = SetupFunctions::new().with("post_updated", |_req, args, _name| {
//!     let id = args["id"].clone();
//!     TriggerMap::new().with(
//!         "post_updated",
//!         TriggerBinding::new().payload_filter(move |post, _vars| post["id"] == id),
//!     )
//! });
//! let manager = SubscriptionManager::new(engine, PubSub::new(), setup);
//!
//! let id = manager.subscribe(
//!     SubscriptionRequest::new("subscription { post_updated(id: 1) { title } }")
//!         .callback(|result| println!("{:?}", result)),
//! )?;
//! manager.publish("post_updated", &json!({"id": 1, "title": "Hello"}));
//! ```

pub mod binder;
pub mod config;
pub mod engine;
pub mod error;
pub mod pubsub;
pub mod schema;
pub mod subscriptions;
pub mod triggers;
pub mod types;

// Re-exports
pub use binder::BoundSubscription;
pub use config::{ManagerConfig, RootFieldPolicy};
pub use engine::{ArgumentSignature, ExecutionRequest, FieldSignature, GraphQlEngine, SchemaTypes};
pub use error::{ExecutionError, Result, SubscriptionError};
pub use pubsub::{MessageHandler, PubSub, PubSubEngine};
pub use schema::SchemaIndex;
pub use subscriptions::{
    Callback, ContextSource, Delivery, SubscriptionHandle, SubscriptionManager, SubscriptionRequest,
};
pub use triggers::{FilterFn, PayloadFilterFn, SetupFunction, SetupFunctions, TriggerBinding, TriggerMap};
pub use types::*;

pub use async_graphql_parser as parser;
pub use async_graphql_value as value;
