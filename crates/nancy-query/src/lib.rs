//! Query evaluation for Nancy macros.
//!
//! The expander talks to queries only through the [`QueryEvaluator`] trait,
//! so tests can substitute a scripted evaluator. [`PathEvaluator`] is the
//! built-in implementation: a small path language with axes, predicates,
//! unions, a handful of standard functions, host functions registered with
//! [`QueryEvaluator::register_function`] and library modules registered with
//! [`QueryEvaluator::register_module`].
//!
//! Node results always come back in document order without duplicates.

mod ast;
mod error;
mod eval;
mod evaluator;
mod functions;
mod item;
mod lexer;
mod module;
mod parser;

use std::collections::HashMap;

use nancy_dom::{DocumentTree, NodeId};

pub use error::QueryError;
pub use evaluator::PathEvaluator;
pub use functions::CustomFunction;
pub use item::{Item, format_number};

/// External variable bindings, by unprefixed name.
pub type Variables = HashMap<String, String>;

/// Evaluates query text against a node of a [`DocumentTree`].
pub trait QueryEvaluator: Send + Sync {
    /// Evaluate `query` with `context` as the context node.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] if the query is malformed or fails.
    fn evaluate(
        &self,
        tree: &DocumentTree,
        context: NodeId,
        query: &str,
        variables: &Variables,
    ) -> Result<Vec<Item>, QueryError>;

    /// First item of [`evaluate`](Self::evaluate), if any.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate).
    fn evaluate_first(
        &self,
        tree: &DocumentTree,
        context: NodeId,
        query: &str,
        variables: &Variables,
    ) -> Result<Option<Item>, QueryError> {
        Ok(self
            .evaluate(tree, context, query, variables)?
            .into_iter()
            .next())
    }

    /// String values of the result joined with a space.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate).
    fn evaluate_to_string(
        &self,
        tree: &DocumentTree,
        context: NodeId,
        query: &str,
        variables: &Variables,
    ) -> Result<String, QueryError>;

    /// Make a host function callable from queries.
    fn register_function(&mut self, function: CustomFunction);

    /// Register a library module's functions and variables.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Module`] for malformed module text.
    fn register_module(&mut self, source: &str) -> Result<(), QueryError>;

    /// Bind `prefix` to `uri` for all later queries.
    fn bind_namespace(&mut self, prefix: &str, uri: &str);
}
