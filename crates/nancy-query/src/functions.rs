//! Host functions callable from queries.

use std::fmt;
use std::sync::Arc;

use crate::error::QueryError;

type Implementation = dyn Fn(&[String]) -> Result<String, String> + Send + Sync;

/// A string-valued function implemented in Rust.
///
/// Every argument is passed as the string value of its sequence (items
/// joined with a space). The function is called as `prefix:name(...)`
/// where `prefix` is bound to `namespace`.
#[derive(Clone)]
pub struct CustomFunction {
    namespace: String,
    name: String,
    arity: usize,
    implementation: Arc<Implementation>,
}

impl CustomFunction {
    /// Create a function taking exactly `arity` arguments.
    pub fn new<F>(
        namespace: impl Into<String>,
        name: impl Into<String>,
        arity: usize,
        implementation: F,
    ) -> Self
    where
        F: Fn(&[String]) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            arity,
            implementation: Arc::new(implementation),
        }
    }

    /// Namespace URI.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invoke the function.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Function`] with the message the implementation
    /// reported.
    pub fn call(&self, args: &[String]) -> Result<String, QueryError> {
        (self.implementation)(args).map_err(|message| QueryError::Function {
            name: self.name.clone(),
            message,
        })
    }
}

impl fmt::Debug for CustomFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFunction")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
