//! Per-binding event handler installed on the channel bus.

use crate::engine::{ExecutionRequest, GraphQlEngine};
use crate::pubsub::MessageHandler;
use crate::triggers::TriggerBinding;
use crate::types::Payload;
use async_graphql_parser::types::ExecutableDocument;
use std::sync::Arc;

use super::types::SubscriptionRequest;

/// Everything one channel registration needs to turn an event into a
/// result. Shared pieces are reference-counted; nothing is mutated after
/// construction.
pub(crate) struct EventHandler<E: GraphQlEngine> {
    pub(crate) engine: Arc<E>,
    pub(crate) document: Arc<ExecutableDocument>,
    pub(crate) request: Arc<SubscriptionRequest<E::Context>>,
    pub(crate) trigger_name: String,
    pub(crate) binding: TriggerBinding<E::Context>,
}

impl<E: GraphQlEngine> EventHandler<E> {
    /// Filter, execute and report one published event.
    pub(crate) fn handle(&self, payload: &Payload) {
        let request = &*self.request;

        if !self.binding.accepts_payload(payload, &request.variables) {
            tracing::trace!(trigger = %self.trigger_name, "payload filter rejected event");
            return;
        }

        request.context.with_context(|context| {
            if !self.binding.accepts(payload, context, &request.variables) {
                tracing::trace!(trigger = %self.trigger_name, "filter rejected event");
                return;
            }

            let result = self.engine.execute(ExecutionRequest {
                document: &self.document,
                root_value: payload,
                context,
                variables: &request.variables,
                operation_name: request.operation_name.as_deref(),
            });

            if let Err(err) = &result {
                tracing::warn!(trigger = %self.trigger_name, error = %err, "subscription execution failed");
            }

            match &request.callback {
                Some(callback) => callback(result),
                None => tracing::trace!(trigger = %self.trigger_name, "no callback, result dropped"),
            }
        });
    }

    pub(crate) fn into_message_handler(self) -> MessageHandler {
        Arc::new(move |payload: &Payload| self.handle(payload))
    }
}
