//! Query error types.

/// Error raised while parsing or evaluating a query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum QueryError {
    /// Malformed query text.
    #[error("syntax error in '{query}': {message}")]
    Syntax {
        /// The query text.
        query: String,
        /// What went wrong.
        message: String,
    },

    /// Call to a function that is neither built in nor registered.
    #[error("unknown function {name}#{arity}")]
    UnknownFunction {
        /// Function name as written.
        name: String,
        /// Number of arguments supplied.
        arity: usize,
    },

    /// Reference to a variable without a binding.
    #[error("unbound variable ${0}")]
    UnboundVariable(String),

    /// Prefix without a namespace binding.
    #[error("unbound namespace prefix '{0}'")]
    UnboundPrefix(String),

    /// Value of the wrong kind for the operation.
    #[error("type error: {0}")]
    Type(String),

    /// Malformed library module.
    #[error("module error: {0}")]
    Module(String),

    /// Nested function calls went too deep.
    #[error("function recursion exceeded {0} levels")]
    RecursionLimit(usize),

    /// A registered function reported a failure.
    #[error("{name}: {message}")]
    Function {
        /// Function name.
        name: String,
        /// Failure message.
        message: String,
    },
}

impl QueryError {
    pub(crate) fn syntax(query: &str, message: impl Into<String>) -> Self {
        Self::Syntax {
            query: query.to_owned(),
            message: message.into(),
        }
    }
}
