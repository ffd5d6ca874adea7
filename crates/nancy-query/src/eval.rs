//! Expression evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use nancy_dom::{DocumentTree, NodeKind, QName};

use crate::Variables;
use crate::ast::{Axis, CompareOp, Expr, NameRef, NodeTest, PathStart, Step};
use crate::error::QueryError;
use crate::functions::CustomFunction;
use crate::item::{Item, sort_document_order};

/// Prefix → namespace URI.
pub(crate) type Namespaces = HashMap<String, String>;

/// `(namespace, local)`; the namespace is empty for unprefixed names.
pub(crate) type ExpandedName = (String, String);

type Locals = HashMap<ExpandedName, Vec<Item>>;

/// Nesting limit for declared functions and variables.
pub(crate) const MAX_CALL_DEPTH: usize = 128;

/// Function declared in a library module.
#[derive(Debug)]
pub(crate) struct DeclaredFunction {
    pub params: Vec<ExpandedName>,
    pub body: Expr,
    pub namespaces: Arc<Namespaces>,
}

/// Variable declared in a library module.
#[derive(Debug)]
pub(crate) struct DeclaredVariable {
    /// `None` for `external` declarations.
    pub value: Option<Expr>,
    pub namespaces: Arc<Namespaces>,
}

#[derive(Debug, Clone)]
pub(crate) enum FunctionDef {
    Native(CustomFunction),
    Declared(Arc<DeclaredFunction>),
}

/// Functions and variables visible to every query.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub functions: HashMap<(ExpandedName, usize), FunctionDef>,
    pub variables: HashMap<ExpandedName, Arc<DeclaredVariable>>,
}

/// The context item with its position in the sequence being processed.
#[derive(Debug, Clone)]
pub(crate) struct Focus {
    pub item: Item,
    pub position: usize,
    pub size: usize,
}

impl Focus {
    pub(crate) fn new(item: Item) -> Self {
        Self {
            item,
            position: 1,
            size: 1,
        }
    }
}

/// Static and dynamic environment of an evaluation.
pub(crate) struct Env<'a> {
    pub tree: &'a DocumentTree,
    pub registry: &'a Registry,
    pub namespaces: &'a Namespaces,
    pub external: &'a Variables,
    pub locals: &'a Locals,
    pub depth: usize,
}

impl Env<'_> {
    fn nested<'b>(
        &'b self,
        namespaces: &'b Namespaces,
        locals: &'b Locals,
    ) -> Result<Env<'b>, QueryError> {
        let depth = self.depth + 1;
        if depth > MAX_CALL_DEPTH {
            return Err(QueryError::RecursionLimit(MAX_CALL_DEPTH));
        }
        Ok(Env {
            tree: self.tree,
            registry: self.registry,
            namespaces,
            external: self.external,
            locals,
            depth,
        })
    }

    fn resolve(&self, name: &NameRef) -> Result<ExpandedName, QueryError> {
        resolve_name(name, self.namespaces)
    }
}

pub(crate) fn resolve_name(
    name: &NameRef,
    namespaces: &Namespaces,
) -> Result<ExpandedName, QueryError> {
    match &name.prefix {
        None => Ok((String::new(), name.local.clone())),
        Some(prefix) => namespaces
            .get(prefix)
            .map(|uri| (uri.clone(), name.local.clone()))
            .ok_or_else(|| QueryError::UnboundPrefix(prefix.clone())),
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_number(count: usize) -> f64 {
    count as f64
}

pub(crate) fn eval(expr: &Expr, focus: &Focus, env: &Env<'_>) -> Result<Vec<Item>, QueryError> {
    match expr {
        Expr::Literal(value) => Ok(vec![Item::String(value.clone())]),
        Expr::Number(value) => Ok(vec![Item::Number(*value)]),
        Expr::Variable(name) => lookup_variable(name, focus, env),
        Expr::Sequence(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(eval(item, focus, env)?);
            }
            Ok(out)
        }
        Expr::Call { name, args } => call_function(name, args, focus, env),
        Expr::Path { start, steps } => {
            let mut current = match start {
                PathStart::Root => vec![Item::Node(env.tree.root())],
                PathStart::Relative => vec![focus.item.clone()],
            };
            for step in steps {
                current = eval_step(step, &current, env)?;
            }
            Ok(current)
        }
        Expr::Filter { base, predicates } => {
            let items = eval(base, focus, env)?;
            apply_predicates(items, predicates, env)
        }
        Expr::Union(branches) => {
            let mut out = Vec::new();
            for branch in branches {
                let items = eval(branch, focus, env)?;
                if !items.iter().all(Item::is_node) {
                    return Err(QueryError::Type(
                        "operands of '|' must be node sequences".to_owned(),
                    ));
                }
                out.extend(items);
            }
            Ok(sort_document_order(out))
        }
        Expr::Or(lhs, rhs) => {
            let value = effective_boolean(&eval(lhs, focus, env)?)?
                || effective_boolean(&eval(rhs, focus, env)?)?;
            Ok(vec![Item::Boolean(value)])
        }
        Expr::And(lhs, rhs) => {
            let value = effective_boolean(&eval(lhs, focus, env)?)?
                && effective_boolean(&eval(rhs, focus, env)?)?;
            Ok(vec![Item::Boolean(value)])
        }
        Expr::Compare { op, lhs, rhs } => {
            let lhs = atomize(&eval(lhs, focus, env)?, env.tree);
            let rhs = atomize(&eval(rhs, focus, env)?, env.tree);
            let value = lhs
                .iter()
                .any(|l| rhs.iter().any(|r| compare_atomic(*op, l, r)));
            Ok(vec![Item::Boolean(value)])
        }
    }
}

fn eval_step(step: &Step, inputs: &[Item], env: &Env<'_>) -> Result<Vec<Item>, QueryError> {
    let mut out = Vec::new();
    match step {
        Step::Axis {
            axis,
            test,
            predicates,
        } => {
            let test = ResolvedTest::new(test, env)?;
            for item in inputs {
                let matched = axis_items(env.tree, *axis, item)?
                    .into_iter()
                    .filter(|candidate| test.matches(env.tree, *axis, candidate))
                    .collect();
                out.extend(apply_predicates(matched, predicates, env)?);
            }
        }
        Step::Filter(expr) => {
            let size = inputs.len();
            for (i, item) in inputs.iter().enumerate() {
                let focus = Focus {
                    item: item.clone(),
                    position: i + 1,
                    size,
                };
                out.extend(eval(expr, &focus, env)?);
            }
        }
    }

    if out.iter().all(Item::is_node) {
        Ok(sort_document_order(out))
    } else if out.iter().any(Item::is_node) {
        Err(QueryError::Type(
            "path step returned both nodes and atomic values".to_owned(),
        ))
    } else {
        Ok(out)
    }
}

/// Keep the items for which every predicate holds, one predicate at a time.
///
/// A numeric predicate value selects by position.
#[allow(clippy::float_cmp)]
fn apply_predicates(
    items: Vec<Item>,
    predicates: &[Expr],
    env: &Env<'_>,
) -> Result<Vec<Item>, QueryError> {
    let mut current = items;
    for predicate in predicates {
        let size = current.len();
        let mut kept = Vec::with_capacity(size);
        for (i, item) in current.into_iter().enumerate() {
            let focus = Focus {
                item,
                position: i + 1,
                size,
            };
            let value = eval(predicate, &focus, env)?;
            let keep = match value.as_slice() {
                [Item::Number(n)] => *n == to_number(i + 1),
                _ => effective_boolean(&value)?,
            };
            if keep {
                kept.push(focus.item);
            }
        }
        current = kept;
    }
    Ok(current)
}

/// Items reachable from `item` along `axis`, in proximity order.
fn axis_items(tree: &DocumentTree, axis: Axis, item: &Item) -> Result<Vec<Item>, QueryError> {
    match item {
        Item::Node(id) => {
            let id = *id;
            let nodes: Vec<Item> = match axis {
                Axis::Child => tree.children(id).iter().copied().map(Item::Node).collect(),
                Axis::Descendant => tree.descendants(id).into_iter().map(Item::Node).collect(),
                Axis::DescendantOrSelf => std::iter::once(id)
                    .chain(tree.descendants(id))
                    .map(Item::Node)
                    .collect(),
                Axis::SelfAxis => vec![Item::Node(id)],
                Axis::Parent => tree.parent(id).map(Item::Node).into_iter().collect(),
                Axis::Ancestor => tree.ancestors(id).map(Item::Node).collect(),
                Axis::AncestorOrSelf => std::iter::once(id)
                    .chain(tree.ancestors(id))
                    .map(Item::Node)
                    .collect(),
                Axis::FollowingSibling | Axis::PrecedingSibling => {
                    let Some(parent) = tree.parent(id) else {
                        return Ok(Vec::new());
                    };
                    let siblings = tree.children(parent);
                    let at = siblings.iter().position(|&s| s == id).unwrap_or(0);
                    if axis == Axis::FollowingSibling {
                        siblings[at + 1..].iter().copied().map(Item::Node).collect()
                    } else {
                        siblings[..at].iter().rev().copied().map(Item::Node).collect()
                    }
                }
                Axis::Attribute => tree
                    .attributes(id)
                    .iter()
                    .enumerate()
                    .filter(|(_, attr)| !attr.is_namespace_declaration())
                    .map(|(index, _)| Item::Attribute { owner: id, index })
                    .collect(),
            };
            Ok(nodes)
        }
        Item::Attribute { owner, .. } => {
            let owner = *owner;
            let nodes = match axis {
                Axis::SelfAxis | Axis::DescendantOrSelf => vec![item.clone()],
                Axis::Parent => vec![Item::Node(owner)],
                Axis::Ancestor => std::iter::once(owner)
                    .chain(tree.ancestors(owner))
                    .map(Item::Node)
                    .collect(),
                Axis::AncestorOrSelf => std::iter::once(item.clone())
                    .chain(std::iter::once(owner).chain(tree.ancestors(owner)).map(Item::Node))
                    .collect(),
                _ => Vec::new(),
            };
            Ok(nodes)
        }
        _ => Err(QueryError::Type(
            "path step applied to an atomic value".to_owned(),
        )),
    }
}

enum ResolvedTest {
    AnyName,
    Namespace(String),
    Name {
        namespace: Option<String>,
        local: String,
    },
    AnyNode,
    Text,
    Comment,
}

impl ResolvedTest {
    fn new(test: &NodeTest, env: &Env<'_>) -> Result<Self, QueryError> {
        Ok(match test {
            NodeTest::Wildcard(None) => Self::AnyName,
            NodeTest::Wildcard(Some(prefix)) => Self::Namespace(
                env.namespaces
                    .get(prefix)
                    .cloned()
                    .ok_or_else(|| QueryError::UnboundPrefix(prefix.clone()))?,
            ),
            NodeTest::Name(name) => {
                let (namespace, local) = env.resolve(name)?;
                Self::Name {
                    namespace: (!namespace.is_empty()).then_some(namespace),
                    local,
                }
            }
            NodeTest::AnyNode => Self::AnyNode,
            NodeTest::Text => Self::Text,
            NodeTest::Comment => Self::Comment,
        })
    }

    fn matches(&self, tree: &DocumentTree, axis: Axis, item: &Item) -> bool {
        let name_matches = |name: &QName| match self {
            Self::AnyName => true,
            Self::Namespace(uri) => name.in_namespace(uri),
            Self::Name { namespace, local } => name.matches(namespace.as_deref(), local),
            _ => false,
        };
        match self {
            Self::AnyNode => true,
            Self::Text => matches!(
                item.as_node().map(|id| tree.kind(id)),
                Some(NodeKind::Text(_) | NodeKind::CData(_))
            ),
            Self::Comment => matches!(
                item.as_node().map(|id| tree.kind(id)),
                Some(NodeKind::Comment(_))
            ),
            Self::AnyName | Self::Namespace(_) | Self::Name { .. } => {
                // Name tests select the principal node kind of the axis.
                if axis == Axis::Attribute {
                    item.attribute(tree).is_some_and(|attr| name_matches(&attr.name))
                } else {
                    item.as_node()
                        .and_then(|id| tree.element_name(id))
                        .is_some_and(name_matches)
                }
            }
        }
    }
}

fn lookup_variable(name: &NameRef, focus: &Focus, env: &Env<'_>) -> Result<Vec<Item>, QueryError> {
    let expanded = env.resolve(name)?;
    if let Some(value) = env.locals.get(&expanded) {
        return Ok(value.clone());
    }
    let external = || {
        env.external
            .get(&expanded.1)
            .map(|value| vec![Item::String(value.clone())])
    };
    if expanded.0.is_empty() {
        if let Some(value) = external() {
            return Ok(value);
        }
    }
    if let Some(declared) = env.registry.variables.get(&expanded) {
        return match &declared.value {
            Some(expr) => {
                let locals = Locals::new();
                let inner = env.nested(&declared.namespaces, &locals)?;
                eval(expr, focus, &inner)
            }
            None => external().ok_or_else(|| QueryError::UnboundVariable(name.to_string())),
        };
    }
    Err(QueryError::UnboundVariable(name.to_string()))
}

fn call_function(
    name: &NameRef,
    args: &[Expr],
    focus: &Focus,
    env: &Env<'_>,
) -> Result<Vec<Item>, QueryError> {
    if name.prefix.is_none() {
        return call_builtin(name, args, focus, env);
    }

    let key = (env.resolve(name)?, args.len());
    let Some(function) = env.registry.functions.get(&key) else {
        return Err(QueryError::UnknownFunction {
            name: name.to_string(),
            arity: args.len(),
        });
    };
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(arg, focus, env)?);
    }

    match function {
        FunctionDef::Native(native) => {
            let strings: Vec<String> = values
                .iter()
                .map(|value| join_strings(value, " ", env.tree))
                .collect();
            Ok(vec![Item::String(native.call(&strings)?)])
        }
        FunctionDef::Declared(declared) => {
            let locals: Locals = declared.params.iter().cloned().zip(values).collect();
            let inner = env.nested(&declared.namespaces, &locals)?;
            eval(&declared.body, focus, &inner)
        }
    }
}

fn call_builtin(
    name: &NameRef,
    args: &[Expr],
    focus: &Focus,
    env: &Env<'_>,
) -> Result<Vec<Item>, QueryError> {
    let arity = args.len();
    let arg = |i: usize| eval(&args[i], focus, env);
    let tree = env.tree;

    let item = match (name.local.as_str(), arity) {
        ("true", 0) => Item::Boolean(true),
        ("false", 0) => Item::Boolean(false),
        ("position", 0) => Item::Number(to_number(focus.position)),
        ("last", 0) => Item::Number(to_number(focus.size)),
        ("not", 1) => Item::Boolean(!effective_boolean(&arg(0)?)?),
        ("count", 1) => Item::Number(to_number(arg(0)?.len())),
        ("string", 0) => Item::String(focus.item.string_value(tree)),
        ("string", 1) => Item::String(first_string(&arg(0)?, tree)),
        ("normalize-space", 0) => Item::String(normalize_space(&focus.item.string_value(tree))),
        ("normalize-space", 1) => Item::String(normalize_space(&first_string(&arg(0)?, tree))),
        ("concat", n) if n >= 2 => {
            let mut out = String::new();
            for i in 0..n {
                out.push_str(&first_string(&arg(i)?, tree));
            }
            Item::String(out)
        }
        ("string-join", 1 | 2) => {
            let separator = if arity == 2 {
                first_string(&arg(1)?, tree)
            } else {
                String::new()
            };
            Item::String(join_strings(&arg(0)?, &separator, tree))
        }
        (local @ ("name" | "local-name" | "namespace-uri"), 0 | 1) => {
            let target = if arity == 0 {
                Some(focus.item.clone())
            } else {
                arg(0)?.into_iter().next()
            };
            let name = target.as_ref().and_then(|item| item.name(tree));
            let value = match (local, name) {
                (_, None) => String::new(),
                ("name", Some(name)) => name.qualified(),
                ("local-name", Some(name)) => name.local.clone(),
                (_, Some(name)) => name.namespace.clone().unwrap_or_default(),
            };
            Item::String(value)
        }
        _ => {
            return Err(QueryError::UnknownFunction {
                name: name.to_string(),
                arity,
            });
        }
    };
    Ok(vec![item])
}

fn first_string(items: &[Item], tree: &DocumentTree) -> String {
    items
        .first()
        .map(|item| item.string_value(tree))
        .unwrap_or_default()
}

pub(crate) fn join_strings(items: &[Item], separator: &str, tree: &DocumentTree) -> String {
    items
        .iter()
        .map(|item| item.string_value(tree))
        .collect::<Vec<_>>()
        .join(separator)
}

fn normalize_space(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn effective_boolean(items: &[Item]) -> Result<bool, QueryError> {
    match items {
        [] => Ok(false),
        [first, ..] if first.is_node() => Ok(true),
        [Item::Boolean(value)] => Ok(*value),
        [Item::String(value)] => Ok(!value.is_empty()),
        [Item::Number(value)] => Ok(*value != 0.0 && !value.is_nan()),
        _ => Err(QueryError::Type(
            "no effective boolean value for a sequence of several atomic values".to_owned(),
        )),
    }
}

#[derive(Debug)]
enum Atomic {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Atomic {
    fn number(&self) -> f64 {
        match self {
            Self::Str(value) => value.trim().parse().unwrap_or(f64::NAN),
            Self::Num(value) => *value,
            Self::Bool(value) => f64::from(u8::from(*value)),
        }
    }

    fn boolean(&self) -> bool {
        match self {
            Self::Str(value) => !value.is_empty(),
            Self::Num(value) => *value != 0.0 && !value.is_nan(),
            Self::Bool(value) => *value,
        }
    }
}

fn atomize(items: &[Item], tree: &DocumentTree) -> Vec<Atomic> {
    items
        .iter()
        .map(|item| match item {
            Item::Number(value) => Atomic::Num(*value),
            Item::Boolean(value) => Atomic::Bool(*value),
            other => Atomic::Str(other.string_value(tree)),
        })
        .collect()
}

fn compare_atomic(op: CompareOp, lhs: &Atomic, rhs: &Atomic) -> bool {
    match (lhs, rhs) {
        (Atomic::Bool(_), _) | (_, Atomic::Bool(_)) => compare_numbers(
            op,
            f64::from(u8::from(lhs.boolean())),
            f64::from(u8::from(rhs.boolean())),
        ),
        (Atomic::Str(l), Atomic::Str(r)) if matches!(op, CompareOp::Eq | CompareOp::NotEq) => {
            (l == r) == (op == CompareOp::Eq)
        }
        _ => compare_numbers(op, lhs.number(), rhs.number()),
    }
}

#[allow(clippy::float_cmp)]
fn compare_numbers(op: CompareOp, lhs: f64, rhs: f64) -> bool {
    match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::NotEq => lhs != rhs,
        CompareOp::Lt => lhs < rhs,
        CompareOp::LtEq => lhs <= rhs,
        CompareOp::Gt => lhs > rhs,
        CompareOp::GtEq => lhs >= rhs,
    }
}
