//! Query syntax tree.

/// A possibly prefixed name as written in a query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NameRef {
    pub prefix: Option<String>,
    pub local: String,
}

impl std::fmt::Display for NameRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix}:")?;
        }
        f.write_str(&self.local)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Attribute,
}

impl Axis {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let axis = match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "self" => Self::SelfAxis,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "attribute" => Self::Attribute,
            _ => return None,
        };
        Some(axis)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeTest {
    /// `*`, or `prefix:*` when a prefix is given.
    Wildcard(Option<String>),
    Name(NameRef),
    AnyNode,
    Text,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Axis {
        axis: Axis,
        test: NodeTest,
        predicates: Vec<Expr>,
    },
    /// A primary expression used as a step, e.g. `$dir/(a | b)`.
    Filter(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathStart {
    /// Starts at the context item.
    Relative,
    /// `/...`: starts at the document node.
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(String),
    Number(f64),
    Variable(NameRef),
    /// Comma-separated sequence.
    Sequence(Vec<Expr>),
    Call {
        name: NameRef,
        args: Vec<Expr>,
    },
    Path {
        start: PathStart,
        steps: Vec<Step>,
    },
    Filter {
        base: Box<Expr>,
        predicates: Vec<Expr>,
    },
    Union(Vec<Expr>),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}
