//! In-process channel bus.

use crate::error::{Result, SubscriptionError};
use crate::types::{ChannelOptions, ChannelSubscriptionId, Payload};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{MessageHandler, PubSubEngine};

/// A single listener registration.
struct Listener {
    id: ChannelSubscriptionId,
    handler: MessageHandler,
}

/// Registration bookkeeping, guarded by one lock.
#[derive(Default)]
struct Registry {
    /// Listeners per channel, in registration order.
    channels: HashMap<String, Vec<Listener>>,
    /// Channel and options of every live registration.
    subscriptions: HashMap<ChannelSubscriptionId, (String, ChannelOptions)>,
}

/// In-process, synchronous channel bus.
///
/// Handlers run on the publishing thread. The registry lock is released
/// before they run, so a handler may itself subscribe or unsubscribe; such
/// changes apply from the next publish.
pub struct PubSub {
    registry: RwLock<Registry>,
    /// Counter for generating registration IDs.
    next_id: AtomicU64,
}

impl PubSub {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of live registrations across all channels.
    pub fn subscription_count(&self) -> usize {
        self.registry.read().subscriptions.len()
    }

    /// Number of listeners on a channel.
    pub fn listener_count(&self, trigger_name: &str) -> usize {
        self.registry
            .read()
            .channels
            .get(trigger_name)
            .map_or(0, Vec::len)
    }

    /// Channel a registration listens on.
    pub fn trigger_name(&self, id: ChannelSubscriptionId) -> Option<String> {
        self.registry
            .read()
            .subscriptions
            .get(&id)
            .map(|(trigger, _)| trigger.clone())
    }

    /// Options a registration was created with.
    pub fn channel_options(&self, id: ChannelSubscriptionId) -> Option<ChannelOptions> {
        self.registry
            .read()
            .subscriptions
            .get(&id)
            .map(|(_, options)| options.clone())
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSubEngine for PubSub {
    fn publish(&self, trigger_name: &str, payload: &Payload) -> bool {
        let handlers: Vec<MessageHandler> = {
            let registry = self.registry.read();
            match registry.channels.get(trigger_name) {
                Some(listeners) => listeners.iter().map(|l| l.handler.clone()).collect(),
                None => Vec::new(),
            }
        };

        tracing::trace!(trigger = trigger_name, listeners = handlers.len(), "publish");

        for handler in handlers {
            handler(payload);
        }

        true
    }

    fn subscribe(
        &self,
        trigger_name: &str,
        handler: MessageHandler,
        options: &ChannelOptions,
    ) -> Result<ChannelSubscriptionId> {
        let id = ChannelSubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));

        let mut registry = self.registry.write();
        registry
            .channels
            .entry(trigger_name.to_string())
            .or_default()
            .push(Listener { id, handler });
        registry
            .subscriptions
            .insert(id, (trigger_name.to_string(), options.clone()));

        Ok(id)
    }

    fn unsubscribe(&self, id: ChannelSubscriptionId) -> Result<()> {
        let mut registry = self.registry.write();
        let (trigger_name, _) = registry
            .subscriptions
            .remove(&id)
            .ok_or(SubscriptionError::ChannelSubscriptionNotFound(id))?;

        if let Some(listeners) = registry.channels.get_mut(&trigger_name) {
            listeners.retain(|l| l.id != id);
            if listeners.is_empty() {
                registry.channels.remove(&trigger_name);
            }
        }

        Ok(())
    }
}
