//! Contract with the GraphQL engine that validates and executes documents.
//!
//! Parsing defaults to `async_graphql_parser`; validation and execution are
//! left to the implementation. Argument type information comes from
//! [`SchemaTypes`], which [`crate::schema::SchemaIndex`] implements from SDL.

use crate::error::ExecutionError;
use crate::types::{ExecutionResult, Payload, RuleViolation, Variables};
use async_graphql_parser::types::{ExecutableDocument, Type};
use async_graphql_value::ConstValue;

/// Declared argument (or input object field) of a schema field.
#[derive(Clone, Debug)]
pub struct ArgumentSignature {
    pub name: String,
    pub ty: Type,
    pub default_value: Option<ConstValue>,
}

impl ArgumentSignature {
    /// Build a signature from a type written in GraphQL notation, such as
    /// `"[ID!]!"`. Returns `None` if the notation is malformed.
    pub fn new(name: impl Into<String>, ty: &str) -> Option<Self> {
        Some(Self {
            name: name.into(),
            ty: Type::new(ty)?,
            default_value: None,
        })
    }

    pub fn with_default(mut self, value: ConstValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Declared signature of a subscription root field.
#[derive(Clone, Debug, Default)]
pub struct FieldSignature {
    pub arguments: Vec<ArgumentSignature>,
}

impl FieldSignature {
    pub fn argument(&self, name: &str) -> Option<&ArgumentSignature> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// Schema type information needed to coerce root field arguments.
pub trait SchemaTypes {
    /// Signature of a field on the subscription root type.
    fn subscription_field(&self, name: &str) -> Option<FieldSignature>;

    /// Fields of an input object type. `None` for anything that is not an
    /// input object, in which case values are passed through uncoerced.
    fn input_object(&self, _name: &str) -> Option<Vec<ArgumentSignature>> {
        None
    }
}

/// Everything the engine needs to execute a document for one event.
pub struct ExecutionRequest<'a, C> {
    pub document: &'a ExecutableDocument,
    /// The published payload.
    pub root_value: &'a Payload,
    pub context: &'a C,
    pub variables: &'a Variables,
    pub operation_name: Option<&'a str>,
}

/// A GraphQL engine the subscription manager drives.
pub trait GraphQlEngine: SchemaTypes + Send + Sync + 'static {
    /// Per-execution context handed to resolvers and filters.
    type Context: Send + Sync + 'static;

    /// Parse a document.
    fn parse(
        &self,
        source: &str,
    ) -> std::result::Result<ExecutableDocument, async_graphql_parser::Error> {
        async_graphql_parser::parse_query(source)
    }

    /// Validate a parsed document against the schema. An empty list means
    /// the document is valid.
    fn validate(&self, document: &ExecutableDocument) -> Vec<RuleViolation>;

    /// Execute a validated document.
    fn execute(
        &self,
        request: ExecutionRequest<'_, Self::Context>,
    ) -> std::result::Result<ExecutionResult, ExecutionError>;
}
