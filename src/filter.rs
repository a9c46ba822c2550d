//! Compiled filter parser and typed predicates.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::dsl::{self, Node};
use crate::error::{EvalError, ParseError};
use crate::registry::{ObjectRef, Registry, TypeKey, Value};

/// Parses filter text against an immutable whitelist.
///
/// Holds no mutable state, so one parser can serve any number of threads.
#[derive(Debug, Clone)]
pub struct FilterParser {
    registry: Registry,
}

impl FilterParser {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parse `text` as a predicate over instances of `T`.
    pub fn parse<T: Any>(&self, text: &str) -> Result<Predicate<T>, ParseError> {
        self.parse_node(text, TypeKey::of::<T>())
            .map(|body| Predicate {
                body,
                _instance: PhantomData,
            })
    }

    /// Parse `text` with `root` as the type of the implicit instance.
    pub fn parse_node(&self, text: &str, root: TypeKey) -> Result<Node, ParseError> {
        match dsl::parse_filter(&self.registry, root, text) {
            Ok(node) => {
                tracing::debug!("Filter: parsed {} over {}", node, root);
                Ok(node)
            }
            Err(err) => {
                tracing::debug!("Filter: rejected at offset {}: {}", err.offset(), err);
                Err(err)
            }
        }
    }
}

impl From<Registry> for FilterParser {
    fn from(registry: Registry) -> Self {
        Self::new(registry)
    }
}

/// A parsed boolean filter over instances of `T`.
pub struct Predicate<T> {
    body: Node,
    _instance: PhantomData<fn(&T) -> bool>,
}

impl<T: Any> Predicate<T> {
    pub fn body(&self) -> &Node {
        &self.body
    }

    pub fn into_body(self) -> Node {
        self.body
    }

    /// Run the predicate with the reference evaluator.
    pub fn evaluate(&self, instance: &T) -> Result<bool, EvalError> {
        match dsl::evaluate(&self.body, ObjectRef::new(instance))? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(EvalError::NotBoolean {
                found: other.value_type(),
            }),
        }
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            _instance: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.body).finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_parser_and_predicates_are_shareable() {
        assert_send_sync::<FilterParser>();
        assert_send_sync::<Predicate<String>>();
    }

    #[test]
    fn test_string_length() {
        let registry = Registry::builder()
            .configure::<String>(|t| t.computed("Length", |s: &String| s.len()))
            .build()
            .unwrap();
        let parser = FilterParser::from(registry);

        let longer = parser.parse::<String>("Length > 10").unwrap();
        assert_eq!(longer.to_string(), "(Length > 10)");
        assert!(longer.evaluate(&"hello world".to_string()).unwrap());
        assert!(!longer.evaluate(&"hi".to_string()).unwrap());

        let exact = parser.parse::<String>("Length = 10").unwrap();
        assert!(exact.evaluate(&"0123456789".to_string()).unwrap());
    }

    #[test]
    fn test_parse_errors_pass_through() {
        let parser = FilterParser::new(Registry::default());
        let err = parser.parse::<String>("Length > 10").unwrap_err();
        assert!(matches!(err, ParseError::Resolution { offset: 0, .. }));
    }
}
