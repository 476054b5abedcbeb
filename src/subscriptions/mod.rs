//! GraphQL subscriptions multiplexed over the channel bus.
//!
//! A subscription is bound to its root field, fanned out to one or more
//! channels, and re-executed for every event published on them:
//! - events are gated by the binding's filters
//! - each qualifying event executes the document with the payload as root
//! - the result (or execution error) goes to the request's callback
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new(engine, PubSub::new(), SetupFunctions::new());
//!
//! let id = manager.subscribe(
//!     SubscriptionRequest::new("subscription { comment_added { id } }")
//!         .callback(|result| println!("{:?}", result)),
//! )?;
//!
//! manager.publish("comment_added", &json!({"id": 1}));
//! manager.unsubscribe(id)?;
//! ```

mod handler;
mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{Callback, ContextSource, Delivery, SubscriptionHandle, SubscriptionRequest};
