//! Directory tree materialization.
//!
//! Walks a [`Storage`] from the input root and builds one [`DocumentTree`]:
//!
//! | Entry                      | Element                          | `nc:kind`    |
//! |----------------------------|----------------------------------|--------------|
//! | directory                  | `nc:directory`                   | `directory`  |
//! | executable file            | `nc:executable`                  | `executable` |
//! | structured file            | `<basename>` wrapping the parse  | `file`       |
//! | other file                 | `nc:file`                        | `file`       |
//! | anything else              | `unknown`                        | (none)       |
//!
//! Every element also carries `nc:path` and `nc:name`. A directory lists its
//! subdirectories before its files, each group in listing order.

use std::path::Path;

use nancy_dom::{
    Attribute, Content, DocumentTree, Element, ParseError, QName, TreeBuilder, parse_element,
};
use nancy_query::QueryEvaluator;
use nancy_storage::{EntryKind, Storage};

use crate::error::ExpandError;
use crate::names::{
    DIRECTORY, EXECUTABLE, FILE, KIND, NAME, NC_NAMESPACE, NC_PREFIX, PATH, UNKNOWN, nc,
};

/// Which files are parsed, which are query modules, and which are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Extensions (without the dot) of files parsed as XML.
    pub structured_extensions: Vec<String>,
    /// Extensions (without the dot) of files registered as query modules.
    pub module_extensions: Vec<String>,
    /// Entries whose name starts with this are skipped.
    pub hidden_prefix: String,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            structured_extensions: vec!["xml".to_owned(), "xhtml".to_owned()],
            module_extensions: ["xq", "xql", "xqm", "xqy"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            hidden_prefix: ".".to_owned(),
        }
    }
}

impl MaterializeOptions {
    /// True if an entry called `name` is skipped.
    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with(&self.hidden_prefix)
    }

    /// True if a file called `name` is parsed as XML.
    #[must_use]
    pub fn is_structured(&self, name: &str) -> bool {
        has_extension(name, &self.structured_extensions)
    }

    /// True if a file called `name` is a query module.
    #[must_use]
    pub fn is_module(&self, name: &str) -> bool {
        has_extension(name, &self.module_extensions)
    }
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}

/// Name of the synthetic element wrapping a structured file: the basename
/// up to its first dot.
pub(crate) fn wrapper_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Basename used for the `nc:name` of `path`.
pub(crate) fn entry_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Build the tree for `root`.
///
/// Query modules met on the way are registered with `evaluator`.
///
/// # Errors
///
/// Fails on the first storage error, malformed structured file or malformed
/// query module; there is no partial tree.
pub fn materialize(
    storage: &dyn Storage,
    root: &Path,
    options: &MaterializeOptions,
    evaluator: &mut dyn QueryEvaluator,
) -> Result<DocumentTree, ExpandError> {
    let mut materializer = Materializer {
        storage,
        options,
        evaluator,
        builder: TreeBuilder::new(),
    };
    let root_kind = storage.stat(root)?.kind;
    materializer.visit(root, &entry_name(root), root_kind)?;
    let tree = materializer.builder.finish();
    tracing::info!(root = %root.display(), nodes = tree.len(), "Materialized source tree");
    Ok(tree)
}

struct Materializer<'a> {
    storage: &'a dyn Storage,
    options: &'a MaterializeOptions,
    evaluator: &'a mut dyn QueryEvaluator,
    builder: TreeBuilder,
}

impl Materializer<'_> {
    /// Append the element for `path`, classified as `kind` by its listing.
    fn visit(&mut self, path: &Path, name: &str, kind: EntryKind) -> Result<(), ExpandError> {
        match kind {
            EntryKind::Directory => {
                tracing::debug!(path = %path.display(), "Materializing directory");
                self.builder
                    .start_element(nc(DIRECTORY), markers(path, name, Some(DIRECTORY)));
                let (dirs, files): (Vec<_>, Vec<_>) = self
                    .storage
                    .list_dir(path)?
                    .into_iter()
                    .filter(|entry| !self.options.is_hidden(&entry.name))
                    .partition(|entry| entry.kind == EntryKind::Directory);
                for entry in dirs.iter().chain(&files) {
                    self.visit(&path.join(&entry.name), &entry.name, entry.kind)?;
                }
                self.builder.end_element();
            }
            EntryKind::Executable => {
                self.leaf(nc(EXECUTABLE), markers(path, name, Some(EXECUTABLE)));
            }
            EntryKind::File if self.options.is_structured(name) => {
                let text = self.storage.read(path)?;
                let element = parse_structured(&text, name).map_err(|source| {
                    ExpandError::Parse {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                let id = self.builder.append_content(&Content::Element(element));
                for attribute in markers(path, name, Some(FILE)) {
                    self.builder.set_attribute(id, attribute);
                }
            }
            EntryKind::File => {
                if self.options.is_module(name) {
                    let source = self.storage.read(path)?;
                    self.evaluator
                        .register_module(&source)
                        .map_err(|source| ExpandError::Module {
                            path: path.to_path_buf(),
                            source,
                        })?;
                    tracing::debug!(path = %path.display(), "Registered query module");
                }
                self.leaf(nc(FILE), markers(path, name, Some(FILE)));
            }
            EntryKind::Other => {
                self.leaf(QName::local(UNKNOWN), markers(path, name, None));
            }
        }
        Ok(())
    }

    fn leaf(&mut self, name: QName, attributes: Vec<Attribute>) {
        self.builder.start_element(name, attributes);
        self.builder.end_element();
    }
}

/// Parse a structured file wrapped in an element named after it.
fn parse_structured(text: &str, file_name: &str) -> Result<Element, ParseError> {
    let wrapper = wrapper_name(file_name);
    let wrapped = format!("<{wrapper}>{text}</{wrapper}>");
    parse_element(&wrapped, &[(NC_PREFIX, NC_NAMESPACE)])
}

fn markers(path: &Path, name: &str, kind: Option<&str>) -> Vec<Attribute> {
    let mut attributes = Vec::with_capacity(3);
    if let Some(kind) = kind {
        attributes.push(Attribute::new(nc(KIND), kind));
    }
    attributes.push(Attribute::new(nc(PATH), path.display().to_string()));
    attributes.push(Attribute::new(nc(NAME), name));
    attributes
}
