//! Expansion error types.

use std::path::PathBuf;

use nancy_dom::ParseError;
use nancy_query::QueryError;
use nancy_storage::StorageError;

/// Error raised while materializing a tree or expanding a file.
#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    /// A structured file is not well-formed.
    #[error("error parsing '{}': {source}", path.display())]
    Parse {
        /// Source path of the file.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: ParseError,
    },

    /// A query module could not be registered.
    #[error("error loading query module '{}': {source}", path.display())]
    Module {
        /// Source path of the module.
        path: PathBuf,
        /// Module error.
        #[source]
        source: QueryError,
    },

    /// The filesystem adapter failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The requested file is not part of the materialized tree.
    #[error("path '{}' does not exist in '{}'", path.display(), root.display())]
    PathNotFound {
        /// Requested path.
        path: PathBuf,
        /// Input root.
        root: PathBuf,
    },

    /// No candidate outside the expansion stack matched a macro query.
    #[error("{query} not found for {location}")]
    MacroNotFound {
        /// The macro query.
        query: String,
        /// Tree path of the node being expanded.
        location: String,
    },

    /// The query evaluator rejected a macro query.
    #[error("error evaluating {query}: {source}")]
    MacroEval {
        /// The macro query.
        query: String,
        /// Evaluator error.
        #[source]
        source: QueryError,
    },
}

impl ExpandError {
    /// True for per-macro failures that keep-going mode annotates instead
    /// of propagating.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MacroNotFound { .. } | Self::MacroEval { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        let not_found = ExpandError::MacroNotFound {
            query: "header".to_owned(),
            location: "site/index.xhtml".to_owned(),
        };
        let eval = ExpandError::MacroEval {
            query: "(".to_owned(),
            source: QueryError::Type("bad".to_owned()),
        };
        let missing = ExpandError::PathNotFound {
            path: PathBuf::from("src/missing.xhtml"),
            root: PathBuf::from("src"),
        };

        assert!(not_found.is_recoverable());
        assert!(eval.is_recoverable());
        assert!(!missing.is_recoverable());
    }

    #[test]
    fn test_messages() {
        let not_found = ExpandError::MacroNotFound {
            query: "header".to_owned(),
            location: "site/index.xhtml".to_owned(),
        };
        let missing = ExpandError::PathNotFound {
            path: PathBuf::from("src/missing.xhtml"),
            root: PathBuf::from("src"),
        };

        assert_eq!(not_found.to_string(), "header not found for site/index.xhtml");
        assert_eq!(
            missing.to_string(),
            "path 'src/missing.xhtml' does not exist in 'src'"
        );
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExpandError>();
    }
}
