//! Subscription manager: binds GraphQL subscriptions to bus channels.

use crate::binder;
use crate::config::ManagerConfig;
use crate::engine::GraphQlEngine;
use crate::error::{Result, SubscriptionError};
use crate::pubsub::{PubSub, PubSubEngine};
use crate::triggers::{self, SetupFunctions};
use crate::types::{ChannelSubscriptionId, Payload, SubscriptionId};
use crossbeam_channel::{bounded, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::handler::EventHandler;
use super::types::{Delivery, SubscriptionHandle, SubscriptionRequest};

/// Manages GraphQL subscriptions on top of a channel bus.
pub struct SubscriptionManager<E: GraphQlEngine, P: PubSubEngine = PubSub> {
    engine: Arc<E>,
    pubsub: P,
    setup_functions: SetupFunctions<E::Context>,
    config: ManagerConfig,
    /// Channel registrations per active subscription.
    subscriptions: RwLock<HashMap<SubscriptionId, Vec<ChannelSubscriptionId>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Channel subscriptions whose receiver went away, reaped after publish.
    dropped: Arc<Mutex<Vec<SubscriptionId>>>,
}

impl<E: GraphQlEngine, P: PubSubEngine> SubscriptionManager<E, P> {
    /// Create a manager with the default configuration.
    pub fn new(engine: E, pubsub: P, setup_functions: SetupFunctions<E::Context>) -> Self {
        Self::with_config(engine, pubsub, setup_functions, ManagerConfig::default())
    }

    /// Create a manager with a custom configuration.
    pub fn with_config(
        engine: E,
        pubsub: P,
        setup_functions: SetupFunctions<E::Context>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            pubsub,
            setup_functions,
            config,
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            dropped: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Publish a payload on a trigger. Every matching subscription executes
    /// and reports before this returns.
    ///
    /// Channel subscriptions found with a dropped receiver during delivery
    /// are unsubscribed afterwards.
    pub fn publish(&self, trigger_name: &str, payload: &Payload) -> bool {
        tracing::debug!(trigger = trigger_name, "publishing event");
        let delivered = self.pubsub.publish(trigger_name, payload);
        self.reap_dropped();
        delivered
    }

    /// Set up a subscription.
    ///
    /// Either every trigger is registered on the bus, or none is: if one
    /// registration fails the ones already made are undone and the error is
    /// returned.
    ///
    /// Registrations become live one at a time, so a `publish` racing with a
    /// subscribe that is later rolled back may still reach its callback
    /// through the channels registered before the failure.
    pub fn subscribe(&self, request: SubscriptionRequest<E::Context>) -> Result<SubscriptionId> {
        let query = request
            .query
            .as_deref()
            .ok_or(SubscriptionError::MissingField("query"))?;

        let bound = binder::bind(
            &*self.engine,
            query,
            request.operation_name.as_deref(),
            &request.variables,
            self.config.root_field_policy,
        )?;
        let triggers = triggers::resolve(
            &self.setup_functions,
            &bound.subscription_name,
            &request,
            &bound.arguments,
        )?;

        let document = Arc::new(bound.document);
        let request = Arc::new(request);
        let mut channel_ids = Vec::with_capacity(triggers.len());

        for (trigger_name, binding) in triggers {
            let options = binding.channel_options.clone();
            let handler = EventHandler {
                engine: self.engine.clone(),
                document: document.clone(),
                request: request.clone(),
                trigger_name: trigger_name.clone(),
                binding,
            };

            match self
                .pubsub
                .subscribe(&trigger_name, handler.into_message_handler(), &options)
            {
                Ok(channel_id) => channel_ids.push(channel_id),
                Err(err) => {
                    tracing::warn!(
                        trigger = %trigger_name,
                        error = %err,
                        registered = channel_ids.len(),
                        "channel subscribe failed, rolling back"
                    );
                    self.release(&channel_ids);
                    return Err(err);
                }
            }
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        tracing::debug!(
            subscription_id = %id,
            subscription = %bound.subscription_name,
            channels = channel_ids.len(),
            "subscribed"
        );
        self.subscriptions.write().insert(id, channel_ids);

        Ok(id)
    }

    /// Set up a subscription whose results are delivered on a bounded
    /// channel instead of a callback. Any callback on `request` is replaced.
    ///
    /// Results that do not fit in the buffer are dropped. Once the handle
    /// is dropped, the next event delivered to the subscription removes it.
    pub fn subscribe_channel(
        &self,
        mut request: SubscriptionRequest<E::Context>,
    ) -> Result<SubscriptionHandle> {
        let (sender, receiver) = bounded(self.config.delivery_buffer);
        // Set once subscribed; 0 until then and after the drop is recorded.
        let own_id = Arc::new(AtomicU64::new(0));
        let dropped = self.dropped.clone();

        request.callback = Some(Arc::new({
            let own_id = own_id.clone();
            move |delivery: Delivery| match sender.try_send(delivery) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("subscription buffer full, dropping result");
                }
                Err(TrySendError::Disconnected(_)) => {
                    let id = own_id.swap(0, Ordering::SeqCst);
                    if id != 0 {
                        tracing::debug!(subscription_id = id, "subscription receiver gone");
                        dropped.lock().push(SubscriptionId(id));
                    }
                }
            }
        }));

        let id = self.subscribe(request)?;
        own_id.store(id.0, Ordering::SeqCst);
        Ok(SubscriptionHandle { id, receiver })
    }

    /// Remove a subscription and all of its channel registrations.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let channel_ids = self
            .subscriptions
            .write()
            .remove(&id)
            .ok_or(SubscriptionError::SubscriptionNotFound(id))?;

        tracing::debug!(subscription_id = %id, channels = channel_ids.len(), "unsubscribing");

        let mut first_error = None;
        for channel_id in channel_ids {
            if let Err(err) = self.pubsub.unsubscribe(channel_id) {
                tracing::warn!(channel_id = %channel_id, error = %err, "channel unsubscribe failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Channel registrations behind a subscription.
    pub fn channel_ids(&self, id: SubscriptionId) -> Option<Vec<ChannelSubscriptionId>> {
        self.subscriptions.read().get(&id).cloned()
    }

    pub fn pubsub(&self) -> &P {
        &self.pubsub
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Unsubscribe channel subscriptions whose handle was dropped.
    fn reap_dropped(&self) {
        let ids = std::mem::take(&mut *self.dropped.lock());
        for id in ids {
            match self.unsubscribe(id) {
                Ok(()) | Err(SubscriptionError::SubscriptionNotFound(_)) => {}
                Err(err) => {
                    tracing::warn!(subscription_id = %id, error = %err, "reaping dropped subscription failed");
                }
            }
        }
    }

    /// Best-effort removal of channel registrations.
    fn release(&self, channel_ids: &[ChannelSubscriptionId]) {
        for &channel_id in channel_ids {
            if let Err(err) = self.pubsub.unsubscribe(channel_id) {
                tracing::warn!(channel_id = %channel_id, error = %err, "rollback unsubscribe failed");
            }
        }
    }
}
