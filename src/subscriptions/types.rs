//! Subscription request and delivery types.

use crate::error::ExecutionError;
use crate::types::{ExecutionResult, SubscriptionId, Variables};
use std::fmt;
use std::sync::Arc;

/// What a subscription's callback receives for each qualifying event.
pub type Delivery = std::result::Result<ExecutionResult, ExecutionError>;

/// Result callback of a subscription.
pub type Callback = Arc<dyn Fn(Delivery) + Send + Sync>;

/// Where a subscription's execution context comes from.
///
/// A producer is called again for every event, so use one when each
/// execution needs a fresh resource (a database session, say).
pub enum ContextSource<C> {
    /// Shared by every execution.
    Value(C),
    /// Called once per event.
    Producer(Arc<dyn Fn() -> C + Send + Sync>),
}

impl<C> ContextSource<C> {
    /// Resolve the context for one event and hand it to `f`.
    pub fn with_context<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        match self {
            ContextSource::Value(context) => f(context),
            ContextSource::Producer(produce) => f(&produce()),
        }
    }
}

impl<C: Default> Default for ContextSource<C> {
    fn default() -> Self {
        ContextSource::Value(C::default())
    }
}

impl<C> fmt::Debug for ContextSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextSource::Value(_) => f.write_str("ContextSource::Value"),
            ContextSource::Producer(_) => f.write_str("ContextSource::Producer"),
        }
    }
}

/// A client-level subscribe call.
///
/// `query` is optional so a request built from loosely-typed input can be
/// rejected with `SubscriptionError::MissingField` instead of failing to
/// parse.
pub struct SubscriptionRequest<C> {
    pub query: Option<String>,
    pub operation_name: Option<String>,
    pub variables: Variables,
    pub context: ContextSource<C>,
    pub callback: Option<Callback>,
}

impl<C: Default> SubscriptionRequest<C> {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }
}

impl<C> SubscriptionRequest<C> {
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Use the same context for every execution.
    pub fn context(mut self, context: C) -> Self {
        self.context = ContextSource::Value(context);
        self
    }

    /// Build a fresh context for every event.
    pub fn context_producer<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.context = ContextSource::Producer(Arc::new(produce));
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Delivery) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }
}

impl<C: Default> Default for SubscriptionRequest<C> {
    fn default() -> Self {
        Self {
            query: None,
            operation_name: None,
            variables: Variables::new(),
            context: ContextSource::default(),
            callback: None,
        }
    }
}

impl<C> fmt::Debug for SubscriptionRequest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRequest")
            .field("query", &self.query)
            .field("operation_name", &self.operation_name)
            .field("variables", &self.variables)
            .field("context", &self.context)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Handle to a subscription whose results arrive on a channel.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive results.
    pub receiver: crossbeam_channel::Receiver<Delivery>,
}

impl SubscriptionHandle {
    /// Receive the next result (blocking).
    pub fn recv(&self) -> Result<Delivery, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a result (non-blocking).
    pub fn try_recv(&self) -> Result<Delivery, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Delivery, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
