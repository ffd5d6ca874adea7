//! The built-in [`QueryEvaluator`].

use std::collections::HashMap;
use std::sync::Arc;

use nancy_dom::{DocumentTree, NodeId, XML_NAMESPACE};
use tracing::debug;

use crate::error::QueryError;
use crate::eval::{Env, Focus, FunctionDef, Namespaces, Registry, eval, join_strings};
use crate::functions::CustomFunction;
use crate::item::Item;
use crate::module::parse_module;
use crate::parser::parse_query;
use crate::{QueryEvaluator, Variables};

/// Path-language evaluator over a [`DocumentTree`].
///
/// # Example
///
/// ```
/// use nancy_dom::{Content, TreeBuilder, parse_element};
/// use nancy_query::{PathEvaluator, QueryEvaluator, Variables};
///
/// let page = parse_element("<page><title>Home</title></page>", &[]).unwrap();
/// let mut builder = TreeBuilder::new();
/// builder.append_content(&Content::Element(page));
/// let tree = builder.finish();
///
/// let evaluator = PathEvaluator::new();
/// let title = evaluator
///     .evaluate_to_string(&tree, tree.root(), "/page/title", &Variables::new())
///     .unwrap();
/// assert_eq!(title, "Home");
/// ```
#[derive(Debug)]
pub struct PathEvaluator {
    namespaces: Namespaces,
    registry: Registry,
}

impl Default for PathEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathEvaluator {
    /// Create an evaluator with only the `xml` prefix bound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespaces: Namespaces::from([("xml".to_owned(), XML_NAMESPACE.to_owned())]),
            registry: Registry::default(),
        }
    }

    /// Builder form of [`QueryEvaluator::bind_namespace`].
    #[must_use]
    pub fn with_namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.bind_namespace(prefix, uri);
        self
    }

    fn run(
        &self,
        tree: &DocumentTree,
        context: NodeId,
        query: &str,
        variables: &Variables,
    ) -> Result<Vec<Item>, QueryError> {
        let expr = parse_query(query)?;
        let locals = HashMap::new();
        let env = Env {
            tree,
            registry: &self.registry,
            namespaces: &self.namespaces,
            external: variables,
            locals: &locals,
            depth: 0,
        };
        eval(&expr, &Focus::new(Item::Node(context)), &env)
    }
}

impl QueryEvaluator for PathEvaluator {
    fn evaluate(
        &self,
        tree: &DocumentTree,
        context: NodeId,
        query: &str,
        variables: &Variables,
    ) -> Result<Vec<Item>, QueryError> {
        self.run(tree, context, query, variables)
    }

    fn evaluate_to_string(
        &self,
        tree: &DocumentTree,
        context: NodeId,
        query: &str,
        variables: &Variables,
    ) -> Result<String, QueryError> {
        let items = self.run(tree, context, query, variables)?;
        Ok(join_strings(&items, " ", tree))
    }

    fn register_function(&mut self, function: CustomFunction) {
        debug!(
            namespace = function.namespace(),
            name = function.name(),
            arity = function.arity(),
            "Registered query function"
        );
        let key = (
            (function.namespace().to_owned(), function.name().to_owned()),
            function.arity(),
        );
        self.registry
            .functions
            .insert(key, FunctionDef::Native(function));
    }

    fn register_module(&mut self, source: &str) -> Result<(), QueryError> {
        let module = parse_module(source, &self.namespaces)?;
        debug!(
            namespace = %module.namespace,
            functions = module.functions.len(),
            variables = module.variables.len(),
            "Registered query module"
        );
        self.namespaces
            .entry(module.prefix)
            .or_insert(module.namespace);
        for (name, function) in module.functions {
            let arity = function.params.len();
            self.registry
                .functions
                .insert((name, arity), FunctionDef::Declared(Arc::new(function)));
        }
        for (name, variable) in module.variables {
            self.registry.variables.insert(name, Arc::new(variable));
        }
        Ok(())
    }

    fn bind_namespace(&mut self, prefix: &str, uri: &str) {
        self.namespaces.insert(prefix.to_owned(), uri.to_owned());
    }
}
