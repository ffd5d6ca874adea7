//! Tree materialization and XML macro expansion for Nancy.
//!
//! [`materialize`] turns a source directory into one XML tree (directories,
//! files, and the parsed content of structured files). [`XmlExpander`]
//! builds that tree once and then expands individual files against it:
//! `<nc:x>query</nc:x>` elements are replaced by the nearest unvisited match
//! of `query` among the file's ancestor directories, and `nc:`-namespaced
//! attributes are replaced by the string value of their query.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::{Path, PathBuf};
//! use nancy_expand::{Expander, ExpanderOptions, XmlExpander};
//! use nancy_query::PathEvaluator;
//! use nancy_storage::FsStorage;
//!
//! let options = ExpanderOptions {
//!     input: PathBuf::from("site"),
//!     output: PathBuf::from("public"),
//!     path: None,
//!     abort_on_error: false,
//! };
//! let expander = XmlExpander::new(options, &FsStorage::new(), Box::new(PathEvaluator::new()))?;
//! let html = expander.expand_file(Path::new("site/index.xhtml"))?;
//! # Ok(())
//! # }
//! ```

mod error;
mod expander;
mod materialize;
mod names;

pub use error::ExpandError;
pub use expander::{Expander, ExpanderOptions, OutputEntry, OutputKind, XmlExpander};
pub use materialize::{MaterializeOptions, materialize};
pub use names::{
    DIRECTORY, ERROR, EXECUTABLE, FILE, KIND, MACRO, NAME, NC_NAMESPACE, NC_PREFIX, PATH, UNKNOWN,
};
