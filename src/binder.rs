//! Binds a subscription document to its root field and argument values.

use crate::config::RootFieldPolicy;
use crate::engine::{GraphQlEngine, SchemaTypes};
use crate::error::{Result, SubscriptionError};
use crate::types::{Arguments, Variables};
use async_graphql_parser::types::{
    BaseType, DocumentOperations, ExecutableDocument, Field, OperationDefinition, OperationType,
    Selection, SelectionSet, Type,
};
use async_graphql_value::{ConstValue, Name, Value};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A parsed, validated subscription and the root field it listens on.
#[derive(Debug)]
pub struct BoundSubscription {
    pub document: ExecutableDocument,
    pub subscription_name: String,
    pub arguments: Arguments,
}

/// Parse, validate and bind a subscription document.
pub fn bind<E: GraphQlEngine>(
    engine: &E,
    query: &str,
    operation_name: Option<&str>,
    variables: &Variables,
    policy: RootFieldPolicy,
) -> Result<BoundSubscription> {
    let document = engine.parse(query)?;

    let violations = engine.validate(&document);
    if !violations.is_empty() {
        tracing::debug!(violations = violations.len(), "subscription failed validation");
        return Err(SubscriptionError::Validation { violations });
    }

    let (subscription_name, arguments) =
        resolve_root_field(engine, &document, operation_name, variables, policy)?;

    Ok(BoundSubscription {
        document,
        subscription_name,
        arguments,
    })
}

/// Locate the root field of the selected subscription operation and coerce
/// its arguments against the schema.
pub fn resolve_root_field<T: SchemaTypes + ?Sized>(
    types: &T,
    document: &ExecutableDocument,
    operation_name: Option<&str>,
    variables: &Variables,
    policy: RootFieldPolicy,
) -> Result<(String, Arguments)> {
    let operation = select_operation(document, operation_name)?;
    match operation.ty {
        OperationType::Subscription => {}
        OperationType::Query => return Err(SubscriptionError::NotASubscription("query")),
        OperationType::Mutation => return Err(SubscriptionError::NotASubscription("mutation")),
    }

    let mut roots = Vec::new();
    let mut visited = Vec::new();
    collect_root_fields(document, &operation.selection_set.node, &mut visited, &mut roots);

    let root = match (roots.as_slice(), policy) {
        ([], _) => return Err(SubscriptionError::NoRootField),
        ([only], _) => *only,
        ([first, ..], RootFieldPolicy::FirstSelection) => *first,
        (all, RootFieldPolicy::Strict) => {
            let keys = all
                .iter()
                .map(|f| f.alias.as_ref().unwrap_or(&f.name).node.to_string())
                .collect();
            return Err(SubscriptionError::MultipleRootFields(keys));
        }
    };

    let name = root.name.node.to_string();
    let mut arguments = Arguments::new();
    // Fields unknown to the schema bind with no arguments.
    let Some(signature) = types.subscription_field(&name) else {
        return Ok((name, arguments));
    };

    let coercion = Coercion::new(types, operation, variables);
    for (arg_name, value) in &root.arguments {
        let Some(definition) = signature.argument(arg_name.node.as_str()) else {
            continue;
        };
        if let Some(value) = coercion.coerce(&definition.name, &value.node, &definition.ty)? {
            arguments.insert(definition.name.clone(), value);
        }
    }

    for definition in &signature.arguments {
        if arguments.contains_key(&definition.name) {
            continue;
        }
        if let Some(default) = &definition.default_value {
            arguments.insert(definition.name.clone(), const_to_json(&definition.name, default)?);
        }
    }

    Ok((name, arguments))
}

/// Pick the operation to bind.
///
/// A matching name wins. A document with a single operation binds it
/// whatever the name says; the engine sees the same name at execution time
/// and reports a mismatch to the callback.
fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'a OperationDefinition> {
    let operations = match &document.operations {
        DocumentOperations::Single(operation) => return Ok(&operation.node),
        DocumentOperations::Multiple(operations) => operations,
    };

    if let Some(name) = operation_name {
        if let Some((_, operation)) = operations.iter().find(|(op_name, _)| op_name.as_str() == name) {
            return Ok(&operation.node);
        }
    }

    let mut iter = operations.values();
    match (iter.next(), iter.next(), operation_name) {
        (Some(operation), None, _) => Ok(&operation.node),
        (None, _, _) => Err(SubscriptionError::NoRootField),
        (Some(_), Some(_), Some(name)) => Err(SubscriptionError::UnknownOperation(name.to_string())),
        (Some(_), Some(_), None) => Err(SubscriptionError::OperationNameRequired),
    }
}

/// Flatten fragments into the list of fields selected at the root.
fn collect_root_fields<'a>(
    document: &'a ExecutableDocument,
    selection_set: &'a SelectionSet,
    visited: &mut Vec<&'a Name>,
    out: &mut Vec<&'a Field>,
) {
    for selection in &selection_set.items {
        match &selection.node {
            Selection::Field(field) => out.push(&field.node),
            Selection::InlineFragment(fragment) => {
                collect_root_fields(document, &fragment.node.selection_set.node, visited, out);
            }
            Selection::FragmentSpread(spread) => {
                let fragment_name = &spread.node.fragment_name.node;
                if visited.contains(&fragment_name) {
                    continue;
                }
                visited.push(fragment_name);
                if let Some(fragment) = document.fragments.get(fragment_name) {
                    collect_root_fields(document, &fragment.node.selection_set.node, visited, out);
                }
            }
        }
    }
}

/// Argument coercion state for one operation.
struct Coercion<'a, T: ?Sized> {
    types: &'a T,
    variables: &'a Variables,
    variable_defaults: HashMap<&'a str, &'a ConstValue>,
}

impl<'a, T: SchemaTypes + ?Sized> Coercion<'a, T> {
    fn new(types: &'a T, operation: &'a OperationDefinition, variables: &'a Variables) -> Self {
        let variable_defaults = operation
            .variable_definitions
            .iter()
            .filter_map(|definition| {
                let default = definition.node.default_value.as_ref()?;
                Some((definition.node.name.node.as_str(), &default.node))
            })
            .collect();

        Self {
            types,
            variables,
            variable_defaults,
        }
    }

    /// Coerce an AST value to `ty`. `None` means no value was provided
    /// (an unset nullable variable).
    fn coerce(&self, path: &str, value: &Value, ty: &Type) -> Result<Option<JsonValue>> {
        if let Value::Variable(name) = value {
            return self.variable(path, name, ty);
        }
        if let Value::Null = value {
            if !ty.nullable {
                return Err(SubscriptionError::invalid_argument(
                    path,
                    format!("null given for non-null type {}", ty),
                ));
            }
            return Ok(Some(JsonValue::Null));
        }

        match &ty.base {
            BaseType::List(item_ty) => match value {
                Value::List(items) => {
                    let mut coerced = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        let item_path = format!("{}[{}]", path, i);
                        coerced.push(self.coerce(&item_path, item, item_ty)?.unwrap_or(JsonValue::Null));
                    }
                    Ok(Some(JsonValue::Array(coerced)))
                }
                single => {
                    let item = self.coerce(path, single, item_ty)?.unwrap_or(JsonValue::Null);
                    Ok(Some(JsonValue::Array(vec![item])))
                }
            },
            BaseType::Named(type_name) => self.named(path, value, type_name.as_str()).map(Some),
        }
    }

    /// Resolve a variable and coerce it like a literal of the same type.
    fn variable(&self, path: &str, name: &Name, ty: &Type) -> Result<Option<JsonValue>> {
        let value = match self.variables.get(name.as_str()) {
            Some(json) => ConstValue::from_json(json.clone())
                .map_err(|e| SubscriptionError::invalid_argument(path, e.to_string()))?,
            None => match self.variable_defaults.get(name.as_str()) {
                Some(default) => (*default).clone(),
                None if ty.nullable => return Ok(None),
                None => {
                    return Err(SubscriptionError::invalid_argument(
                        path,
                        format!("variable ${} of non-null type {} was not provided", name, ty),
                    ))
                }
            },
        };

        self.coerce(path, &value.into_value(), ty)
    }

    fn named(&self, path: &str, value: &Value, type_name: &str) -> Result<JsonValue> {
        let mismatch = || {
            SubscriptionError::invalid_argument(path, format!("expected {}, got {}", type_name, value))
        };

        match type_name {
            "Int" => match value {
                Value::Number(n) => n
                    .as_i64()
                    .filter(|v| i32::try_from(*v).is_ok())
                    .map(JsonValue::from)
                    .ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            "Float" => match value {
                Value::Number(n) => Ok(JsonValue::Number(n.clone())),
                _ => Err(mismatch()),
            },
            "String" => match value {
                Value::String(s) => Ok(JsonValue::String(s.clone())),
                _ => Err(mismatch()),
            },
            "Boolean" => match value {
                Value::Boolean(b) => Ok(JsonValue::Bool(*b)),
                _ => Err(mismatch()),
            },
            "ID" => match value {
                Value::String(s) => Ok(JsonValue::String(s.clone())),
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(JsonValue::String(n.to_string())),
                _ => Err(mismatch()),
            },
            _ => match (self.types.input_object(type_name), value) {
                (Some(fields), Value::Object(object)) => {
                    if let Some((unknown, _)) = object
                        .iter()
                        .find(|(key, _)| !fields.iter().any(|f| f.name == key.as_str()))
                    {
                        return Err(SubscriptionError::invalid_argument(
                            path,
                            format!("unknown field {} on input type {}", unknown, type_name),
                        ));
                    }

                    let mut coerced = serde_json::Map::new();
                    for field in &fields {
                        let field_path = format!("{}.{}", path, field.name);
                        let provided = object
                            .iter()
                            .find(|(key, _)| key.as_str() == field.name)
                            .map(|(_, v)| v);
                        let resolved = match provided {
                            Some(v) => self.coerce(&field_path, v, &field.ty)?,
                            None => None,
                        };
                        match (resolved, &field.default_value) {
                            (Some(v), _) => {
                                coerced.insert(field.name.clone(), v);
                            }
                            (None, Some(default)) => {
                                coerced.insert(field.name.clone(), const_to_json(&field_path, default)?);
                            }
                            (None, None) if !field.ty.nullable => {
                                return Err(SubscriptionError::invalid_argument(
                                    field_path,
                                    format!("missing required field of type {}", field.ty),
                                ));
                            }
                            (None, None) => {}
                        }
                    }
                    Ok(JsonValue::Object(coerced))
                }
                (Some(_), _) => Err(mismatch()),
                // Enums and custom scalars are handed to resolvers as written.
                (None, other) => Ok(self.passthrough(other)),
            },
        }
    }

    fn passthrough(&self, value: &Value) -> JsonValue {
        match value {
            Value::Variable(name) => self
                .variables
                .get(name.as_str())
                .cloned()
                .unwrap_or(JsonValue::Null),
            Value::Null => JsonValue::Null,
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Binary(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
            Value::Enum(name) => JsonValue::String(name.to_string()),
            Value::List(items) => JsonValue::Array(items.iter().map(|v| self.passthrough(v)).collect()),
            Value::Object(object) => JsonValue::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.to_string(), self.passthrough(v)))
                    .collect(),
            ),
        }
    }
}

fn const_to_json(path: &str, value: &ConstValue) -> Result<JsonValue> {
    value
        .clone()
        .into_json()
        .map_err(|e| SubscriptionError::invalid_argument(path, e.to_string()))
}
