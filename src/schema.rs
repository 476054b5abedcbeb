//! Root field and input type lookup built from SDL.

use crate::engine::{ArgumentSignature, FieldSignature, SchemaTypes};
use async_graphql_parser::types::{
    InputValueDefinition, OperationType, TypeKind, TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use std::collections::HashMap;

/// Index of a schema's root fields and input objects.
#[derive(Clone, Debug, Default)]
pub struct SchemaIndex {
    query: HashMap<String, FieldSignature>,
    mutation: HashMap<String, FieldSignature>,
    subscription: HashMap<String, FieldSignature>,
    input_objects: HashMap<String, Vec<ArgumentSignature>>,
}

impl SchemaIndex {
    /// Build an index from schema definition language.
    ///
    /// Root types are taken from the `schema { ... }` block when present and
    /// default to `Query`, `Mutation` and `Subscription`. Type extensions are
    /// merged into the extended type.
    pub fn parse(sdl: &str) -> Result<Self, async_graphql_parser::Error> {
        let document = async_graphql_parser::parse_schema(sdl)?;

        let mut query_root = "Query".to_string();
        let mut mutation_root = "Mutation".to_string();
        let mut subscription_root = "Subscription".to_string();
        for definition in &document.definitions {
            if let TypeSystemDefinition::Schema(schema) = definition {
                if let Some(name) = &schema.node.query {
                    query_root = name.node.to_string();
                }
                if let Some(name) = &schema.node.mutation {
                    mutation_root = name.node.to_string();
                }
                if let Some(name) = &schema.node.subscription {
                    subscription_root = name.node.to_string();
                }
            }
        }

        let mut index = SchemaIndex::default();
        for definition in document.definitions {
            let TypeSystemDefinition::Type(ty) = definition else {
                continue;
            };
            let name = ty.node.name.node.to_string();
            match ty.node.kind {
                TypeKind::Object(object) => {
                    let target = if name == query_root {
                        &mut index.query
                    } else if name == mutation_root {
                        &mut index.mutation
                    } else if name == subscription_root {
                        &mut index.subscription
                    } else {
                        continue;
                    };
                    for field in object.fields {
                        let signature = FieldSignature {
                            arguments: field.node.arguments.iter().map(signature).collect(),
                        };
                        target.insert(field.node.name.node.to_string(), signature);
                    }
                }
                TypeKind::InputObject(input) => {
                    index
                        .input_objects
                        .entry(name)
                        .or_default()
                        .extend(input.fields.iter().map(signature));
                }
                _ => {}
            }
        }

        Ok(index)
    }

    /// Whether the root type for `operation` declares `field`.
    pub fn has_root_field(&self, operation: OperationType, field: &str) -> bool {
        self.root(operation).contains_key(field)
    }

    fn root(&self, operation: OperationType) -> &HashMap<String, FieldSignature> {
        match operation {
            OperationType::Query => &self.query,
            OperationType::Mutation => &self.mutation,
            OperationType::Subscription => &self.subscription,
        }
    }
}

fn signature(definition: &Positioned<InputValueDefinition>) -> ArgumentSignature {
    ArgumentSignature {
        name: definition.node.name.node.to_string(),
        ty: definition.node.ty.node.clone(),
        default_value: definition.node.default_value.as_ref().map(|v| v.node.clone()),
    }
}

impl SchemaTypes for SchemaIndex {
    fn subscription_field(&self, name: &str) -> Option<FieldSignature> {
        self.subscription.get(name).cloned()
    }

    fn input_object(&self, name: &str) -> Option<Vec<ArgumentSignature>> {
        self.input_objects.get(name).cloned()
    }
}
