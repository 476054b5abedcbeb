//! Shared test engine: SDL-backed validation and a resolver per root field.

#![allow(dead_code)]

use graphql_subscriptions::parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, Selection,
};
use graphql_subscriptions::{
    ExecutionError, ExecutionRequest, ExecutionResult, FieldSignature, GraphQlEngine, Payload,
    RuleViolation, SchemaIndex, SchemaTypes, Variables,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const SDL: &str = r#"
    type Query {
        testString: String
    }

    type Subscription {
        test_subscription: String
        test_filter_sub(filter_bool: Boolean): String
        test_context: String
        post_updated(id: ID!): String
    }
"#;

type Resolver = Arc<dyn Fn(&Payload, &Value) -> Result<Value, String> + Send + Sync>;

pub struct TestEngine {
    schema: SchemaIndex,
    resolvers: HashMap<String, Resolver>,
}

impl TestEngine {
    /// Engine with the default resolvers:
    /// - `test_subscription` echoes the payload
    /// - `test_filter_sub` returns "SUCCESS"
    /// - `test_context` returns the context
    /// - `post_updated` returns the payload's title, or fails without one
    pub fn new() -> Self {
        Self {
            schema: SchemaIndex::parse(SDL).unwrap(),
            resolvers: HashMap::new(),
        }
        .resolver("test_subscription", |root, _| Ok(root.clone()))
        .resolver("test_filter_sub", |_, _| Ok(json!("SUCCESS")))
        .resolver("test_context", |_, ctx| Ok(ctx.clone()))
        .resolver("post_updated", |root, _| {
            root.get("title")
                .cloned()
                .ok_or_else(|| "post has no title".to_string())
        })
    }

    pub fn resolver<F>(mut self, field: &str, resolve: F) -> Self
    where
        F: Fn(&Payload, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.resolvers.insert(field.to_string(), Arc::new(resolve));
        self
    }

    fn operation<'a>(
        document: &'a ExecutableDocument,
        name: Option<&str>,
    ) -> Option<&'a OperationDefinition> {
        match &document.operations {
            DocumentOperations::Single(op) => Some(&op.node),
            DocumentOperations::Multiple(ops) => match name {
                Some(name) => ops
                    .iter()
                    .find(|(op_name, _)| op_name.as_str() == name)
                    .map(|(_, op)| &op.node),
                None if ops.len() == 1 => ops.values().next().map(|op| &op.node),
                None => None,
            },
        }
    }
}

impl SchemaTypes for TestEngine {
    fn subscription_field(&self, name: &str) -> Option<FieldSignature> {
        self.schema.subscription_field(name)
    }
}

impl GraphQlEngine for TestEngine {
    type Context = Value;

    fn validate(&self, document: &ExecutableDocument) -> Vec<RuleViolation> {
        let operations: Vec<_> = match &document.operations {
            DocumentOperations::Single(op) => vec![op],
            DocumentOperations::Multiple(ops) => ops.values().collect(),
        };

        let mut violations = Vec::new();
        for op in operations {
            for selection in &op.node.selection_set.node.items {
                if let Selection::Field(field) = &selection.node {
                    let name = field.node.name.node.as_str();
                    if !self.schema.has_root_field(op.node.ty, name) {
                        violations.push(
                            RuleViolation::new(format!("Cannot query field \"{}\"", name)).at(field.pos),
                        );
                    }
                }
            }
        }
        violations
    }

    fn execute(&self, request: ExecutionRequest<'_, Value>) -> Result<ExecutionResult, ExecutionError> {
        let operation = Self::operation(request.document, request.operation_name)
            .ok_or_else(|| ExecutionError::new("unknown operation"))?;

        let mut data = serde_json::Map::new();
        for selection in &operation.selection_set.node.items {
            let Selection::Field(field) = &selection.node else {
                continue;
            };
            let name = field.node.name.node.as_str();
            let key = field
                .node
                .alias
                .as_ref()
                .map_or(name, |alias| alias.node.as_str());
            let resolver = self
                .resolvers
                .get(name)
                .ok_or_else(|| ExecutionError::new(format!("no resolver for {}", name)))?;
            let value = resolver(request.root_value, request.context).map_err(ExecutionError::new)?;
            data.insert(key.to_string(), value);
        }

        Ok(ExecutionResult::data(Value::Object(data)))
    }
}

/// Build a variables map from a JSON object literal.
pub fn vars(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        other => panic!("variables must be an object, got {}", other),
    }
}
