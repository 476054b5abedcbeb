//! Named-channel publish/subscribe.
//!
//! The subscription manager only talks to the bus through [`PubSubEngine`],
//! so a distributed broker can stand in for the in-process [`PubSub`] as long
//! as it keeps the same guarantees:
//! - `publish` runs every listener currently registered on the channel,
//!   in registration order, before returning
//! - publishing to a channel nobody listens on is a no-op
//! - `unsubscribe` of an unknown id is an error
//!
//! # Example
//!
//! ```ignore
//! let pubsub = PubSub::new();
//! let id = pubsub.subscribe(
//!     "comment_added",
//!     Arc::new(|payload: &Payload| println!("got {payload}")),
//!     &ChannelOptions::default(),
//! )?;
//! pubsub.publish("comment_added", &json!({"id": 1}));
//! pubsub.unsubscribe(id)?;
//! ```

mod memory;

pub use memory::PubSub;

use crate::error::Result;
use crate::types::{ChannelOptions, ChannelSubscriptionId, Payload};
use std::sync::Arc;

/// Listener invoked with every payload published on its channel.
pub type MessageHandler = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Transport contract used by the subscription manager.
pub trait PubSubEngine: Send + Sync {
    /// Deliver `payload` to every listener on `trigger_name`.
    fn publish(&self, trigger_name: &str, payload: &Payload) -> bool;

    /// Register `handler` on `trigger_name`.
    fn subscribe(
        &self,
        trigger_name: &str,
        handler: MessageHandler,
        options: &ChannelOptions,
    ) -> Result<ChannelSubscriptionId>;

    /// Remove a registration.
    fn unsubscribe(&self, id: ChannelSubscriptionId) -> Result<()>;
}

impl<T: PubSubEngine + ?Sized> PubSubEngine for Arc<T> {
    fn publish(&self, trigger_name: &str, payload: &Payload) -> bool {
        (**self).publish(trigger_name, payload)
    }

    fn subscribe(
        &self,
        trigger_name: &str,
        handler: MessageHandler,
        options: &ChannelOptions,
    ) -> Result<ChannelSubscriptionId> {
        (**self).subscribe(trigger_name, handler, options)
    }

    fn unsubscribe(&self, id: ChannelSubscriptionId) -> Result<()> {
        (**self).unsubscribe(id)
    }
}
