//! Macro expansion over the materialized tree.
//!
//! Expanding a file works on a deep copy of its element:
//!
//! 1. Every `nc:`-namespaced attribute below the copy is a query. It is
//!    removed and replaced by a plain attribute holding the query's string
//!    value.
//! 2. Every `nc:x` element below the copy is a query too. The first node it
//!    selects under any ancestor directory of the file, skipping nodes already
//!    being expanded, is expanded the same way and its children replace the
//!    `nc:x` element.
//!
//! In keep-going mode a failing macro stays in place with the error text
//! attached; in strict mode the first failure aborts the file. When both
//! kinds fail, the element macro's error is the one reported.

use std::path::{Component, Path, PathBuf};

use nancy_dom::{Content, DocumentTree, Element, NodeId, QName, serialize_nodes};
use nancy_query::{CustomFunction, Item, QueryError, QueryEvaluator, Variables};
use nancy_storage::Storage;

use crate::error::ExpandError;
use crate::materialize::{MaterializeOptions, materialize};
use crate::names::{
    DIRECTORY, ERROR, EXECUTABLE, FILE, KIND, MACRO, NAME, NC_NAMESPACE, NC_PREFIX, PATH, nc,
};

/// Infix marking template files; dropped from output names and `$path`.
const TEMPLATE_INFIX: &str = ".nancy.";

/// Constructor arguments shared by every expander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpanderOptions {
    /// Root of the source tree.
    pub input: PathBuf,
    /// Root of the output tree.
    pub output: PathBuf,
    /// Sub-tree of `input` to build, relative to `input`.
    pub path: Option<PathBuf>,
    /// Fail on the first macro error instead of annotating it.
    pub abort_on_error: bool,
}

/// Expands one source file to text.
pub trait Expander: Send + Sync {
    /// Expand the file at `path`, a path beneath the input root.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError::PathNotFound`] if `path` is not in the tree,
    /// and macro errors in strict mode.
    fn expand_file(&self, path: &Path) -> Result<String, ExpandError>;
}

/// What the build does with an entry of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Create the directory.
    Directory,
    /// Expand the structured file and write the result.
    Expand,
    /// Copy the file verbatim.
    Copy,
}

/// One entry of the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    /// Source path, as stored in `nc:path`.
    pub source: PathBuf,
    /// Destination beneath the output root.
    pub output: PathBuf,
    /// Action to take.
    pub kind: OutputKind,
}

/// Expander for structured (XML) sources.
///
/// The source tree is materialized once, in [`XmlExpander::new`]; every
/// [`expand_file`](Expander::expand_file) call reads the shared tree and owns
/// its copies, so calls may run in parallel.
pub struct XmlExpander {
    options: ExpanderOptions,
    evaluator: Box<dyn QueryEvaluator>,
    tree: DocumentTree,
}

impl XmlExpander {
    /// Materialize `options.input` with the default [`MaterializeOptions`].
    ///
    /// # Errors
    ///
    /// Returns any materialization error; see [`materialize`].
    pub fn new(
        options: ExpanderOptions,
        storage: &dyn Storage,
        evaluator: Box<dyn QueryEvaluator>,
    ) -> Result<Self, ExpandError> {
        Self::with_materialize_options(options, &MaterializeOptions::default(), storage, evaluator)
    }

    /// Materialize `options.input` with explicit [`MaterializeOptions`].
    ///
    /// Binds the `nc` prefix and registers `nc:paste` before any query
    /// module is loaded.
    ///
    /// # Errors
    ///
    /// Returns any materialization error; see [`materialize`].
    pub fn with_materialize_options(
        options: ExpanderOptions,
        materialize_options: &MaterializeOptions,
        storage: &dyn Storage,
        mut evaluator: Box<dyn QueryEvaluator>,
    ) -> Result<Self, ExpandError> {
        evaluator.bind_namespace(NC_PREFIX, NC_NAMESPACE);
        // Returns its argument without reading or expanding anything.
        evaluator.register_function(CustomFunction::new(NC_NAMESPACE, "paste", 1, |args| {
            Ok(args.first().cloned().unwrap_or_default())
        }));
        let tree = materialize(storage, &options.input, materialize_options, evaluator.as_mut())?;
        Ok(Self {
            options,
            evaluator,
            tree,
        })
    }

    /// The materialized tree.
    #[must_use]
    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Constructor options.
    #[must_use]
    pub fn options(&self) -> &ExpanderOptions {
        &self.options
    }

    /// Expand the file at `path` into its resolved child nodes.
    ///
    /// # Errors
    ///
    /// Same as [`Expander::expand_file`].
    pub fn expand_node(&self, path: &Path) -> Result<Vec<Content>, ExpandError> {
        let anchor = self.find(path)?;
        let expansion = Expansion {
            tree: &self.tree,
            evaluator: self.evaluator.as_ref(),
            abort_on_error: self.options.abort_on_error,
            anchor,
            variables: self.variables(path),
        };
        expansion.expand(anchor, &mut vec![anchor])
    }

    /// Every entry beneath the configured sub-tree, in document order.
    ///
    /// Entries the build cannot handle (`unknown` elements) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError::PathNotFound`] if the configured sub-tree is
    /// missing.
    pub fn output_entries(&self) -> Result<Vec<OutputEntry>, ExpandError> {
        let start_path = match &self.options.path {
            Some(path) => self.options.input.join(path),
            None => self.options.input.clone(),
        };
        let start = self.find(&start_path)?;

        let mut entries = Vec::new();
        let mut pending = vec![start];
        while let Some(id) = pending.pop() {
            let Some(source) = self.tree.attribute(id, Some(NC_NAMESPACE), PATH) else {
                continue;
            };
            let source = PathBuf::from(source);
            let Some(kind) = self.output_kind(id) else {
                tracing::warn!(path = %source.display(), "Skipping entry that is neither file nor directory");
                continue;
            };
            if kind == OutputKind::Directory {
                pending.extend(
                    self.tree
                        .children(id)
                        .iter()
                        .rev()
                        .filter(|&&child| self.tree.is_element(child)),
                );
            }
            let relative = source.strip_prefix(&start_path).unwrap_or(&source);
            entries.push(OutputEntry {
                output: self.output_path(relative),
                source,
                kind,
            });
        }
        Ok(entries)
    }

    /// Source paths of the structured files [`output_entries`](Self::output_entries) expands.
    ///
    /// # Errors
    ///
    /// Same as [`output_entries`](Self::output_entries).
    pub fn output_files(&self) -> Result<Vec<PathBuf>, ExpandError> {
        Ok(self
            .output_entries()?
            .into_iter()
            .filter(|entry| entry.kind == OutputKind::Expand)
            .map(|entry| entry.source)
            .collect())
    }

    fn output_kind(&self, id: NodeId) -> Option<OutputKind> {
        let name = self.tree.element_name(id)?;
        if name.matches(Some(NC_NAMESPACE), DIRECTORY) {
            Some(OutputKind::Directory)
        } else if name.matches(Some(NC_NAMESPACE), FILE)
            || name.matches(Some(NC_NAMESPACE), EXECUTABLE)
        {
            Some(OutputKind::Copy)
        } else if self.tree.attribute(id, Some(NC_NAMESPACE), KIND) == Some(FILE) {
            Some(OutputKind::Expand)
        } else {
            None
        }
    }

    fn output_path(&self, relative: &Path) -> PathBuf {
        let mut output = self.options.output.clone();
        for component in relative.components() {
            if let Component::Normal(name) = component {
                output.push(strip_template_infix(&name.to_string_lossy()));
            }
        }
        output
    }

    /// Locate the node for `path` by matching `nc:name` one component at a
    /// time, descending through directories only.
    fn find(&self, path: &Path) -> Result<NodeId, ExpandError> {
        let not_found = || ExpandError::PathNotFound {
            path: path.to_path_buf(),
            root: self.options.input.clone(),
        };
        let relative = path
            .strip_prefix(&self.options.input)
            .map_err(|_| not_found())?;
        let mut node = self.tree.document_element().ok_or_else(not_found)?;

        for component in relative.components() {
            let name = match component {
                Component::Normal(name) => name.to_string_lossy(),
                Component::CurDir => continue,
                _ => return Err(not_found()),
            };
            let is_directory = self
                .tree
                .element_name(node)
                .is_some_and(|n| n.matches(Some(NC_NAMESPACE), DIRECTORY));
            if !is_directory {
                return Err(not_found());
            }
            node = self
                .tree
                .children(node)
                .iter()
                .copied()
                .find(|&child| {
                    self.tree.attribute(child, Some(NC_NAMESPACE), NAME) == Some(name.as_ref())
                })
                .ok_or_else(not_found)?;
        }
        Ok(node)
    }

    /// `$root` and `$path` for expanding `path`.
    fn variables(&self, path: &Path) -> Variables {
        let directory = path
            .parent()
            .and_then(|dir| dir.strip_prefix(&self.options.input).ok())
            .map(|dir| {
                dir.components()
                    .filter_map(|c| match c {
                        Component::Normal(name) => {
                            Some(strip_template_infix(&name.to_string_lossy()))
                        }
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| ".".to_owned());

        Variables::from([
            ("root".to_owned(), self.options.input.display().to_string()),
            ("path".to_owned(), directory),
        ])
    }
}

impl Expander for XmlExpander {
    fn expand_file(&self, path: &Path) -> Result<String, ExpandError> {
        let nodes = self.expand_node(path)?;
        tracing::debug!(path = %path.display(), nodes = nodes.len(), "Expanded file");
        Ok(serialize_nodes(&nodes))
    }
}

/// `index.nancy.xhtml` → `index.xhtml`.
fn strip_template_infix(name: &str) -> String {
    name.replacen(TEMPLATE_INFIX, ".", 1)
}

/// State of one `expand_file` call.
struct Expansion<'a> {
    tree: &'a DocumentTree,
    evaluator: &'a dyn QueryEvaluator,
    abort_on_error: bool,
    anchor: NodeId,
    variables: Variables,
}

impl Expansion<'_> {
    /// Expand a copy of `node`, returning its resolved children.
    ///
    /// `stack` holds the nodes on the current resolution chain, `node`
    /// included. Text and comment nodes have no children and yield nothing.
    fn expand(&self, node: NodeId, stack: &mut Vec<NodeId>) -> Result<Vec<Content>, ExpandError> {
        let Some(Content::Element(mut copy)) = self.tree.to_content(node) else {
            return Ok(Vec::new());
        };

        let mut attribute_error = None;
        for child in &mut copy.children {
            self.expand_attributes(child, &mut attribute_error);
        }
        self.expand_references(&mut copy.children, node, stack)?;
        match attribute_error {
            Some(err) => Err(err),
            None => Ok(copy.children),
        }
    }

    /// Replace attribute macros in `content` and its descendants, skipping
    /// element macros. In strict mode the first failure is stored in
    /// `failure` and processing stops.
    fn expand_attributes(&self, content: &mut Content, failure: &mut Option<ExpandError>) {
        let Content::Element(element) = content else {
            return;
        };
        if failure.is_some() || is_macro(element) {
            return;
        }

        let names: Vec<String> = element
            .attributes_in(NC_NAMESPACE)
            .map(|attr| attr.name.local.clone())
            .collect();
        for local in names {
            let Some(attr) = element.remove_attribute(Some(NC_NAMESPACE), &local) else {
                continue;
            };
            match self.evaluate_string(&attr.value) {
                Ok(text) => element.set_attribute(QName::local(local), text),
                Err(err) if self.abort_on_error => {
                    *failure = Some(err);
                    return;
                }
                Err(err) => {
                    tracing::warn!(attribute = %local, error = %err, "Attribute macro left unexpanded");
                    element.set_attribute(attr.name, err.to_string());
                }
            }
        }

        for child in &mut element.children {
            self.expand_attributes(child, failure);
        }
    }

    /// Replace element macros in `children` and their descendants.
    fn expand_references(
        &self,
        children: &mut Vec<Content>,
        node: NodeId,
        stack: &mut Vec<NodeId>,
    ) -> Result<(), ExpandError> {
        let mut i = 0;
        while i < children.len() {
            let Content::Element(element) = &mut children[i] else {
                i += 1;
                continue;
            };
            if !is_macro(element) {
                self.expand_references(&mut element.children, node, stack)?;
                i += 1;
                continue;
            }

            let query = element.text_content();
            match self.resolve(&query, node, stack) {
                Ok(replacement) => {
                    let len = replacement.len();
                    children.splice(i..=i, replacement);
                    i += len;
                }
                Err(err) if !self.abort_on_error && err.is_recoverable() => {
                    tracing::warn!(query = %query.trim(), error = %err, "Macro left unexpanded");
                    element.set_attribute(nc(ERROR), err.to_string());
                    i += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Find the first unvisited match for `query` and expand it.
    fn resolve(
        &self,
        query: &str,
        node: NodeId,
        stack: &mut Vec<NodeId>,
    ) -> Result<Vec<Content>, ExpandError> {
        let search = format!("ancestor::{NC_PREFIX}:{DIRECTORY}/({query})");
        let candidates = self
            .evaluator
            .evaluate(self.tree, self.anchor, &search, &self.variables)
            .map_err(|source| ExpandError::MacroEval {
                query: query.to_owned(),
                source,
            })?;

        for candidate in candidates {
            let id = match candidate {
                Item::Node(id) => id,
                // attributes have no children
                Item::Attribute { .. } => return Ok(Vec::new()),
                _ => {
                    return Err(ExpandError::MacroEval {
                        query: query.to_owned(),
                        source: QueryError::Type(
                            "macro query must select nodes, found an atomic value".to_owned(),
                        ),
                    });
                }
            };
            if stack.contains(&id) {
                continue;
            }
            tracing::debug!(query = %query.trim(), candidate = id.index(), "Resolved macro");
            stack.push(id);
            let result = self.expand(id, stack);
            stack.pop();
            return result;
        }

        Err(ExpandError::MacroNotFound {
            query: query.to_owned(),
            location: self.location(node),
        })
    }

    fn evaluate_string(&self, query: &str) -> Result<String, ExpandError> {
        self.evaluator
            .evaluate_to_string(self.tree, self.anchor, query, &self.variables)
            .map_err(|source| ExpandError::MacroEval {
                query: query.to_owned(),
                source,
            })
    }

    /// `nc:name`s from below the root element down to `node`, joined by `/`.
    fn location(&self, node: NodeId) -> String {
        let root = self.tree.document_element();
        let mut names: Vec<&str> = std::iter::once(node)
            .chain(self.tree.ancestors(node))
            .take_while(|&id| Some(id) != root)
            .filter_map(|id| self.tree.attribute(id, Some(NC_NAMESPACE), NAME))
            .collect();
        names.reverse();
        names.join("/")
    }
}

fn is_macro(element: &Element) -> bool {
    element.name.matches(Some(NC_NAMESPACE), MACRO)
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::XmlExpander: Send, Sync);
    use std::collections::HashMap;

    use nancy_storage::MockStorage;
    use pretty_assertions::assert_eq;

    use super::*;

    /// What a scripted query returns.
    enum Target {
        /// The node whose `nc:path` is this.
        Node(&'static str),
        /// An atomic string.
        Text(&'static str),
    }

    /// Evaluator answering from a script instead of parsing queries.
    ///
    /// Unscripted queries fail, so a test sees every query the resolver asks.
    #[derive(Default)]
    struct ScriptedEvaluator {
        searches: HashMap<String, Vec<Target>>,
        strings: HashMap<String, String>,
    }

    impl ScriptedEvaluator {
        fn search(mut self, query: &str, targets: Vec<Target>) -> Self {
            self.searches
                .insert(format!("ancestor::nc:directory/({query})"), targets);
            self
        }

        fn string(mut self, query: &str, value: &str) -> Self {
            self.strings.insert(query.to_owned(), value.to_owned());
            self
        }
    }

    fn unscripted(query: &str) -> QueryError {
        QueryError::Type(format!("unscripted query {query}"))
    }

    fn node_at(tree: &DocumentTree, path: &str) -> NodeId {
        tree.descendants(tree.root())
            .into_iter()
            .find(|&id| tree.attribute(id, Some(NC_NAMESPACE), PATH) == Some(path))
            .unwrap_or_else(|| panic!("no node for {path}"))
    }

    impl QueryEvaluator for ScriptedEvaluator {
        fn evaluate(
            &self,
            tree: &DocumentTree,
            _context: NodeId,
            query: &str,
            _variables: &Variables,
        ) -> Result<Vec<Item>, QueryError> {
            let targets = self.searches.get(query).ok_or_else(|| unscripted(query))?;
            Ok(targets
                .iter()
                .map(|target| match target {
                    Target::Node(path) => Item::Node(node_at(tree, path)),
                    Target::Text(text) => Item::String((*text).to_owned()),
                })
                .collect())
        }

        fn evaluate_to_string(
            &self,
            _tree: &DocumentTree,
            _context: NodeId,
            query: &str,
            _variables: &Variables,
        ) -> Result<String, QueryError> {
            self.strings.get(query).cloned().ok_or_else(|| unscripted(query))
        }

        fn register_function(&mut self, _function: CustomFunction) {}

        fn register_module(&mut self, _source: &str) -> Result<(), QueryError> {
            Ok(())
        }

        fn bind_namespace(&mut self, _prefix: &str, _uri: &str) {}
    }

    fn expander(
        storage: &MockStorage,
        evaluator: ScriptedEvaluator,
        abort_on_error: bool,
    ) -> XmlExpander {
        let options = ExpanderOptions {
            input: PathBuf::from("/site"),
            output: PathBuf::from("/out"),
            path: None,
            abort_on_error,
        };
        XmlExpander::new(options, storage, Box::new(evaluator)).unwrap()
    }

    fn expand(expander: &XmlExpander, path: &str) -> Result<String, ExpandError> {
        expander.expand_file(Path::new(path))
    }

    #[test]
    fn test_first_candidate_in_evaluator_order_wins() {
        let storage = MockStorage::new()
            .with_file("/site/index.xhtml", "<nc:x>header</nc:x>")
            .with_file("/site/a/header.xhtml", "near")
            .with_file("/site/header.xhtml", "far");
        let evaluator = ScriptedEvaluator::default().search(
            "header",
            vec![
                Target::Node("/site/header.xhtml"),
                Target::Node("/site/a/header.xhtml"),
            ],
        );

        let expander = expander(&storage, evaluator, true);

        assert_eq!(expand(&expander, "/site/index.xhtml").unwrap(), "far");
    }

    #[test]
    fn test_candidates_on_stack_are_skipped() {
        let storage = MockStorage::new()
            .with_file("/site/index.xhtml", "<p><nc:x>body</nc:x></p>")
            .with_file("/site/a/body.xhtml", "<nc:x>body</nc:x>")
            .with_file("/site/body.xhtml", "concrete");
        let evaluator = ScriptedEvaluator::default().search(
            "body",
            vec![
                Target::Node("/site/a/body.xhtml"),
                Target::Node("/site/body.xhtml"),
            ],
        );

        let expander = expander(&storage, evaluator, true);

        assert_eq!(
            expand(&expander, "/site/index.xhtml").unwrap(),
            "<p>concrete</p>"
        );
    }

    #[test]
    fn test_only_self_matches_is_not_found() {
        let storage = MockStorage::new().with_file("/site/index.xhtml", "<nc:x>loop</nc:x>");
        let script = || {
            ScriptedEvaluator::default().search("loop", vec![Target::Node("/site/index.xhtml")])
        };

        let strict = expander(&storage, script(), true);
        let err = expand(&strict, "/site/index.xhtml").unwrap_err();
        assert!(matches!(
            &err,
            ExpandError::MacroNotFound { query, location }
                if query == "loop" && location == "index.xhtml"
        ));

        let lenient = expander(&storage, script(), false);
        assert_eq!(
            expand(&lenient, "/site/index.xhtml").unwrap(),
            format!(
                r#"<nc:x nc:error="loop not found for index.xhtml" xmlns:nc="{NC_NAMESPACE}">loop</nc:x>"#
            )
        );
    }

    #[test]
    fn test_evaluator_error_is_annotated() {
        let storage = MockStorage::new().with_file("/site/index.xhtml", "<nc:x>bad</nc:x> ok");

        let expander = expander(&storage, ScriptedEvaluator::default(), false);
        let out = expand(&expander, "/site/index.xhtml").unwrap();

        assert!(out.starts_with(r#"<nc:x nc:error="error evaluating bad: "#), "{out}");
        assert!(out.ends_with("</nc:x> ok"));
    }

    #[test]
    fn test_atomic_candidates_are_rejected() {
        let storage = MockStorage::new().with_file("/site/index.xhtml", "<nc:x>title</nc:x>");
        let evaluator =
            ScriptedEvaluator::default().search("title", vec![Target::Text("Home")]);

        let expander = expander(&storage, evaluator, true);

        assert!(matches!(
            expand(&expander, "/site/index.xhtml"),
            Err(ExpandError::MacroEval { .. })
        ));
    }

    #[test]
    fn test_attribute_macros() {
        let storage = MockStorage::new().with_file(
            "/site/index.xhtml",
            r#"<a nc:href="link" nc:title="missing" class="c">x</a>"#,
        );
        let evaluator = ScriptedEvaluator::default().string("link", "people/");

        let expander = expander(&storage, evaluator, false);
        let out = expand(&expander, "/site/index.xhtml").unwrap();

        assert_eq!(
            out,
            format!(
                r#"<a class="c" href="people/" nc:title="error evaluating missing: type error: unscripted query missing" xmlns:nc="{NC_NAMESPACE}">x</a>"#
            )
        );
    }

    #[test]
    fn test_strict_mode_reports_element_error_first() {
        let storage = MockStorage::new().with_file(
            "/site/index.xhtml",
            r#"<a nc:href="broken"/><nc:x>missing</nc:x>"#,
        );
        let evaluator = ScriptedEvaluator::default().search("missing", vec![]);

        let expander = expander(&storage, evaluator, true);

        assert!(matches!(
            expand(&expander, "/site/index.xhtml"),
            Err(ExpandError::MacroNotFound { .. })
        ));
    }

    #[test]
    fn test_strict_mode_attribute_error() {
        let storage =
            MockStorage::new().with_file("/site/index.xhtml", r#"<a nc:href="broken"/>"#);

        let expander = expander(&storage, ScriptedEvaluator::default(), true);

        assert!(matches!(
            expand(&expander, "/site/index.xhtml"),
            Err(ExpandError::MacroEval { query, .. }) if query == "broken"
        ));
    }

    #[test]
    fn test_path_not_found_is_fatal_in_keep_going_mode() {
        let storage = MockStorage::new().with_file("/site/index.xhtml", "<p/>");

        let expander = expander(&storage, ScriptedEvaluator::default(), false);

        for path in ["/site/missing.xhtml", "/elsewhere/index.xhtml", "/site/index.xhtml/p"] {
            assert!(matches!(
                expand(&expander, path),
                Err(ExpandError::PathNotFound { .. })
            ));
        }
    }

    #[test]
    fn test_variables() {
        let storage = MockStorage::new()
            .with_file("/site/index.xhtml", "<p/>")
            .with_file("/site/people.nancy.d/alice.xhtml", "<p/>");
        let expander = expander(&storage, ScriptedEvaluator::default(), false);

        let top = expander.variables(Path::new("/site/index.xhtml"));
        let nested = expander.variables(Path::new("/site/people.nancy.d/alice.xhtml"));

        assert_eq!(top.get("path").map(String::as_str), Some("."));
        assert_eq!(top.get("root").map(String::as_str), Some("/site"));
        assert_eq!(nested.get("path").map(String::as_str), Some("people.d"));
    }

    #[test]
    fn test_output_entries() {
        let storage = MockStorage::new()
            .with_file("/site/index.nancy.xhtml", "<p/>")
            .with_file("/site/people/alice.xhtml", "<p/>")
            .with_executable("/site/people/build.sh", "#!/bin/sh")
            .with_special("/site/people/fifo")
            .with_file("/site/style.css", "");
        let expander = expander(&storage, ScriptedEvaluator::default(), false);

        let entries: Vec<(String, String, OutputKind)> = expander
            .output_entries()
            .unwrap()
            .into_iter()
            .map(|e| {
                (
                    e.source.display().to_string(),
                    e.output.display().to_string(),
                    e.kind,
                )
            })
            .collect();

        assert_eq!(
            entries,
            vec![
                ("/site".to_owned(), "/out".to_owned(), OutputKind::Directory),
                ("/site/people".to_owned(), "/out/people".to_owned(), OutputKind::Directory),
                (
                    "/site/people/alice.xhtml".to_owned(),
                    "/out/people/alice.xhtml".to_owned(),
                    OutputKind::Expand
                ),
                (
                    "/site/people/build.sh".to_owned(),
                    "/out/people/build.sh".to_owned(),
                    OutputKind::Copy
                ),
                (
                    "/site/index.nancy.xhtml".to_owned(),
                    "/out/index.xhtml".to_owned(),
                    OutputKind::Expand
                ),
                ("/site/style.css".to_owned(), "/out/style.css".to_owned(), OutputKind::Copy),
            ]
        );
        assert_eq!(
            expander.output_files().unwrap(),
            vec![
                PathBuf::from("/site/people/alice.xhtml"),
                PathBuf::from("/site/index.nancy.xhtml"),
            ]
        );
    }

    #[test]
    fn test_output_entries_for_sub_tree() {
        let storage = MockStorage::new()
            .with_file("/site/index.xhtml", "<p/>")
            .with_file("/site/people/alice.xhtml", "<p/>");
        let options = ExpanderOptions {
            input: PathBuf::from("/site"),
            output: PathBuf::from("/out"),
            path: Some(PathBuf::from("people")),
            abort_on_error: false,
        };
        let expander =
            XmlExpander::new(options, &storage, Box::new(ScriptedEvaluator::default())).unwrap();

        let outputs: Vec<PathBuf> = expander
            .output_entries()
            .unwrap()
            .into_iter()
            .map(|e| e.output)
            .collect();

        assert_eq!(
            outputs,
            vec![PathBuf::from("/out"), PathBuf::from("/out/alice.xhtml")]
        );
    }
}
