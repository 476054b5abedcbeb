//! Maps a subscription root field to the channels it listens on.
//!
//! Without a setup function, a field listens on the channel of the same
//! name with no filter. A setup function can fan a field out to any set of
//! channels, each with its own filter and channel options.

use crate::error::{Result, SubscriptionError};
use crate::subscriptions::SubscriptionRequest;
use crate::types::{Arguments, ChannelOptions, Payload, Variables};
use std::collections::HashMap;
use std::sync::Arc;

/// Filter that only looks at the payload and variables.
pub type PayloadFilterFn = Arc<dyn Fn(&Payload, &Variables) -> bool + Send + Sync>;

/// Filter that also sees the resolved execution context.
pub type FilterFn<C> = Arc<dyn Fn(&Payload, &C, &Variables) -> bool + Send + Sync>;

/// Setup function registered for a subscription field.
pub type SetupFunction<C> =
    Arc<dyn Fn(&SubscriptionRequest<C>, &Arguments, &str) -> TriggerMap<C> + Send + Sync>;

/// How one channel feeds a subscription.
///
/// Both filters default to accepting everything. The payload filter runs
/// before the context is resolved, so rejected events never invoke a
/// context producer.
pub struct TriggerBinding<C> {
    pub payload_filter: Option<PayloadFilterFn>,
    pub filter: Option<FilterFn<C>>,
    pub channel_options: ChannelOptions,
}

impl<C> TriggerBinding<C> {
    /// Binding that accepts every event, with empty channel options.
    pub fn new() -> Self {
        Self {
            payload_filter: None,
            filter: None,
            channel_options: ChannelOptions::default(),
        }
    }

    /// Gate events on (payload, context, variables).
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Payload, &C, &Variables) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Gate events on (payload, variables), before the context is resolved.
    pub fn payload_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Payload, &Variables) -> bool + Send + Sync + 'static,
    {
        self.payload_filter = Some(Arc::new(filter));
        self
    }

    pub fn channel_options(mut self, options: ChannelOptions) -> Self {
        self.channel_options = options;
        self
    }

    pub(crate) fn accepts_payload(&self, payload: &Payload, variables: &Variables) -> bool {
        self.payload_filter
            .as_ref()
            .map_or(true, |filter| filter(payload, variables))
    }

    pub(crate) fn accepts(&self, payload: &Payload, context: &C, variables: &Variables) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter(payload, context, variables))
    }
}

impl<C> Default for TriggerBinding<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for TriggerBinding<C> {
    fn clone(&self) -> Self {
        Self {
            payload_filter: self.payload_filter.clone(),
            filter: self.filter.clone(),
            channel_options: self.channel_options.clone(),
        }
    }
}

/// Trigger name to binding, in insertion order.
pub struct TriggerMap<C> {
    entries: Vec<(String, TriggerBinding<C>)>,
}

impl<C> TriggerMap<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a binding. An existing binding for the same trigger is replaced
    /// in place.
    pub fn insert(&mut self, trigger_name: impl Into<String>, binding: TriggerBinding<C>) {
        let trigger_name = trigger_name.into();
        match self.entries.iter_mut().find(|(name, _)| *name == trigger_name) {
            Some((_, existing)) => *existing = binding,
            None => self.entries.push((trigger_name, binding)),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, trigger_name: impl Into<String>, binding: TriggerBinding<C>) -> Self {
        self.insert(trigger_name, binding);
        self
    }

    pub fn get(&self, trigger_name: &str) -> Option<&TriggerBinding<C>> {
        self.entries
            .iter()
            .find(|(name, _)| name == trigger_name)
            .map(|(_, binding)| binding)
    }

    pub fn trigger_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TriggerBinding<C>)> {
        self.entries.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> Default for TriggerMap<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> IntoIterator for TriggerMap<C> {
    type Item = (String, TriggerBinding<C>);
    type IntoIter = std::vec::IntoIter<(String, TriggerBinding<C>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Setup functions by subscription field name.
pub struct SetupFunctions<C> {
    functions: HashMap<String, SetupFunction<C>>,
}

impl<C> SetupFunctions<C> {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register the setup function for a subscription field.
    pub fn with<F>(mut self, subscription_name: impl Into<String>, setup: F) -> Self
    where
        F: Fn(&SubscriptionRequest<C>, &Arguments, &str) -> TriggerMap<C> + Send + Sync + 'static,
    {
        self.functions.insert(subscription_name.into(), Arc::new(setup));
        self
    }

    pub fn get(&self, subscription_name: &str) -> Option<&SetupFunction<C>> {
        self.functions.get(subscription_name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<C> Default for SetupFunctions<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Work out which channels a bound subscription listens on.
pub fn resolve<C>(
    setup_functions: &SetupFunctions<C>,
    subscription_name: &str,
    request: &SubscriptionRequest<C>,
    arguments: &Arguments,
) -> Result<TriggerMap<C>> {
    let Some(setup) = setup_functions.get(subscription_name) else {
        return Ok(TriggerMap::new().with(subscription_name, TriggerBinding::new()));
    };

    let triggers = setup(request, arguments, subscription_name);
    if triggers.is_empty() {
        return Err(SubscriptionError::NoTriggers(subscription_name.to_string()));
    }

    tracing::trace!(
        subscription = subscription_name,
        triggers = triggers.len(),
        "setup function resolved triggers"
    );
    Ok(triggers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> SubscriptionRequest<()> {
        SubscriptionRequest::new("subscription { test_subscription }")
    }

    #[test]
    fn test_default_maps_field_to_channel() {
        let setup = SetupFunctions::<()>::new();
        let triggers = resolve(&setup, "test_subscription", &request(), &Arguments::new()).unwrap();

        assert_eq!(triggers.trigger_names().collect::<Vec<_>>(), vec!["test_subscription"]);
        let binding = triggers.get("test_subscription").unwrap();
        assert!(binding.channel_options.is_empty());
        assert!(binding.accepts(&json!({}), &(), &Variables::new()));
    }

    #[test]
    fn test_setup_function_used_verbatim() {
        let setup = SetupFunctions::new().with("test_filter_sub", |_req, args: &Arguments, name: &str| {
            assert_eq!(name, "test_filter_sub");
            let channel = format!("post_{}", args["id"].as_str().unwrap_or_default());
            TriggerMap::new()
                .with(channel, TriggerBinding::new())
                .with(
                    "sub_2",
                    TriggerBinding::new().channel_options(ChannelOptions::new().with("qos", json!(1))),
                )
        });

        let mut args = Arguments::new();
        args.insert("id".to_string(), json!("7"));
        let triggers = resolve(&setup, "test_filter_sub", &request(), &args).unwrap();

        assert_eq!(triggers.trigger_names().collect::<Vec<_>>(), vec!["post_7", "sub_2"]);
        assert_eq!(
            triggers.get("sub_2").unwrap().channel_options.get("qos"),
            Some(&json!(1))
        );
    }

    #[test]
    fn test_empty_setup_result_rejected() {
        let setup = SetupFunctions::new().with("nothing", |_req, _args: &Arguments, _name: &str| TriggerMap::new());

        let result = resolve(&setup, "nothing", &request(), &Arguments::new());
        assert!(matches!(result, Err(SubscriptionError::NoTriggers(_))));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let map: TriggerMap<()> = TriggerMap::new()
            .with("a", TriggerBinding::new())
            .with("b", TriggerBinding::new())
            .with("a", TriggerBinding::new().payload_filter(|_, _| false));

        assert_eq!(map.trigger_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!map.get("a").unwrap().accepts_payload(&json!(null), &Variables::new()));
    }

    #[test]
    fn test_filters() {
        let binding: TriggerBinding<i32> = TriggerBinding::new()
            .payload_filter(|payload, _| payload["kind"] == "post")
            .filter(|payload, ctx, vars| payload["owner"] == json!(*ctx) && vars.contains_key("x"));

        let mut vars = Variables::new();
        vars.insert("x".to_string(), json!(1));

        assert!(binding.accepts_payload(&json!({"kind": "post"}), &vars));
        assert!(!binding.accepts_payload(&json!({"kind": "comment"}), &vars));
        assert!(binding.accepts(&json!({"owner": 3}), &3, &vars));
        assert!(!binding.accepts(&json!({"owner": 4}), &3, &vars));
    }
}
