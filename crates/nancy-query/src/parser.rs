//! Recursive-descent parser for the path language.

use crate::ast::{Axis, CompareOp, Expr, NameRef, NodeTest, PathStart, Step};
use crate::error::QueryError;
use crate::lexer::{Token, tokenize};

/// Parse a complete query.
pub(crate) fn parse_query(source: &str) -> Result<Expr, QueryError> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(format!("unexpected {token:?} after expression")));
    }
    Ok(expr)
}

pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str) -> Result<Self, QueryError> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::syntax(self.source, message)
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_word(&mut self, word: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_word(word)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: &Token) -> Result<(), QueryError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {token:?}, found {:?}", self.peek())))
        }
    }

    pub(crate) fn expect_word(&mut self, word: &str) -> Result<(), QueryError> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{word}', found {:?}", self.peek())))
        }
    }

    pub(crate) fn expect_name(&mut self) -> Result<NameRef, QueryError> {
        match self.next() {
            Some(Token::Name { prefix, local }) if local != "*" => Ok(NameRef { prefix, local }),
            other => Err(self.error(format!("expected a name, found {other:?}"))),
        }
    }

    pub(crate) fn expect_string(&mut self) -> Result<String, QueryError> {
        match self.next() {
            Some(Token::Str(value)) => Ok(value),
            other => Err(self.error(format!("expected a string literal, found {other:?}"))),
        }
    }

    /// `Expr := Single (',' Single)*`
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, QueryError> {
        let first = self.parse_single()?;
        if self.peek() != Some(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            items.push(self.parse_single()?);
        }
        Ok(Expr::Sequence(items))
    }

    /// A single expression without top-level commas.
    pub(crate) fn parse_single(&mut self) -> Result<Expr, QueryError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.parse_and()?;
        while self.eat_word("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.parse_compare()?;
        while self.eat_word("and") {
            let rhs = self.parse_compare()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_compare(&mut self) -> Result<Expr, QueryError> {
        let lhs = self.parse_union()?;
        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::NotEq) => CompareOp::NotEq,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::LtEq) => CompareOp::LtEq,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::GtEq) => CompareOp::GtEq,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_union()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_union(&mut self) -> Result<Expr, QueryError> {
        let first = self.parse_path()?;
        if self.peek() != Some(&Token::Pipe) {
            return Ok(first);
        }
        let mut branches = vec![first];
        while self.eat(&Token::Pipe) {
            branches.push(self.parse_path()?);
        }
        Ok(Expr::Union(branches))
    }

    fn can_start_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Name { .. }
                    | Token::Star
                    | Token::At
                    | Token::Dot
                    | Token::DotDot
                    | Token::Dollar
                    | Token::LParen
                    | Token::Str(_)
                    | Token::Number(_)
            )
        )
    }

    fn parse_path(&mut self) -> Result<Expr, QueryError> {
        if self.eat(&Token::Slash) {
            let steps = if self.can_start_step() {
                self.parse_relative(Vec::new(), true)?
            } else {
                Vec::new()
            };
            return Ok(Expr::Path {
                start: PathStart::Root,
                steps,
            });
        }
        if self.eat(&Token::DoubleSlash) {
            let steps = self.parse_relative(vec![descendant_or_self()], true)?;
            return Ok(Expr::Path {
                start: PathStart::Root,
                steps,
            });
        }

        let first = self.parse_step()?;
        if !matches!(self.peek(), Some(Token::Slash | Token::DoubleSlash)) {
            if let Step::Filter(expr) = first {
                return Ok(expr);
            }
            return Ok(Expr::Path {
                start: PathStart::Relative,
                steps: vec![first],
            });
        }
        let steps = self.parse_relative(vec![first], false)?;
        Ok(Expr::Path {
            start: PathStart::Relative,
            steps,
        })
    }

    /// Parse `Step (('/' | '//') Step)*`, appending to `steps`.
    ///
    /// With `leading_step` unset the next token must be a separator.
    fn parse_relative(
        &mut self,
        mut steps: Vec<Step>,
        leading_step: bool,
    ) -> Result<Vec<Step>, QueryError> {
        if leading_step {
            steps.push(self.parse_step()?);
        }
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(descendant_or_self());
                steps.push(self.parse_step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, QueryError> {
        match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                Ok(Step::Axis {
                    axis: Axis::SelfAxis,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                })
            }
            Some(Token::DotDot) => {
                self.pos += 1;
                Ok(Step::Axis {
                    axis: Axis::Parent,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                })
            }
            Some(Token::At) => {
                self.pos += 1;
                self.parse_axis_step(Axis::Attribute)
            }
            Some(Token::Name { prefix: None, local })
                if self.peek_at(1) == Some(&Token::ColonColon) =>
            {
                let axis = Axis::from_name(local)
                    .ok_or_else(|| self.error(format!("unknown axis '{local}'")))?;
                self.pos += 2;
                self.parse_axis_step(axis)
            }
            Some(Token::Name { prefix, local }) if self.peek_at(1) == Some(&Token::LParen) => {
                if prefix.is_none() && is_kind_test(local) {
                    self.parse_axis_step(Axis::Child)
                } else {
                    Ok(Step::Filter(self.parse_filter()?))
                }
            }
            Some(Token::Name { .. } | Token::Star) => self.parse_axis_step(Axis::Child),
            Some(Token::Dollar | Token::LParen | Token::Str(_) | Token::Number(_)) => {
                Ok(Step::Filter(self.parse_filter()?))
            }
            other => Err(self.error(format!("expected a path step, found {other:?}"))),
        }
    }

    fn parse_axis_step(&mut self, axis: Axis) -> Result<Step, QueryError> {
        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step::Axis {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, QueryError> {
        match self.next() {
            Some(Token::Star) => Ok(NodeTest::Wildcard(None)),
            Some(Token::Name { prefix, local }) if local == "*" => Ok(NodeTest::Wildcard(prefix)),
            Some(Token::Name {
                prefix: None,
                local,
            }) if is_kind_test(&local) && self.peek() == Some(&Token::LParen) => {
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                Ok(match local.as_str() {
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::AnyNode,
                })
            }
            Some(Token::Name { prefix, local }) => Ok(NodeTest::Name(NameRef { prefix, local })),
            other => Err(self.error(format!("expected a node test, found {other:?}"))),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, QueryError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    /// `Primary Predicate*`
    fn parse_filter(&mut self) -> Result<Expr, QueryError> {
        let base = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        if predicates.is_empty() {
            Ok(base)
        } else {
            Ok(Expr::Filter {
                base: Box::new(base),
                predicates,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        match self.next() {
            Some(Token::Str(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Dollar) => Ok(Expr::Variable(self.expect_name()?)),
            Some(Token::LParen) => {
                if self.eat(&Token::RParen) {
                    return Ok(Expr::Sequence(Vec::new()));
                }
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Name { prefix, local }) if local != "*" => {
                let name = NameRef { prefix, local };
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_single()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                Ok(Expr::Call { name, args })
            }
            other => Err(self.error(format!("expected an expression, found {other:?}"))),
        }
    }
}

fn is_kind_test(local: &str) -> bool {
    matches!(local, "node" | "text" | "comment")
}

fn descendant_or_self() -> Step {
    Step::Axis {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(prefix: Option<&str>, local: &str) -> NameRef {
        NameRef {
            prefix: prefix.map(str::to_owned),
            local: local.to_owned(),
        }
    }

    fn child(local: &str) -> Step {
        Step::Axis {
            axis: Axis::Child,
            test: NodeTest::Name(name(None, local)),
            predicates: Vec::new(),
        }
    }

    #[test]
    fn test_relative_path() {
        let expr = parse_query("ancestor::nc:directory/header").unwrap();

        assert_eq!(
            expr,
            Expr::Path {
                start: PathStart::Relative,
                steps: vec![
                    Step::Axis {
                        axis: Axis::Ancestor,
                        test: NodeTest::Name(name(Some("nc"), "directory")),
                        predicates: Vec::new(),
                    },
                    child("header"),
                ],
            }
        );
    }

    #[test]
    fn test_absolute_and_descendant_paths() {
        let expr = parse_query("//a").unwrap();
        assert_eq!(
            expr,
            Expr::Path {
                start: PathStart::Root,
                steps: vec![descendant_or_self(), child("a")],
            }
        );

        let root_only = parse_query("/").unwrap();
        assert_eq!(
            root_only,
            Expr::Path {
                start: PathStart::Root,
                steps: Vec::new(),
            }
        );

        let inner = parse_query("a//b").unwrap();
        assert_eq!(
            inner,
            Expr::Path {
                start: PathStart::Relative,
                steps: vec![child("a"), descendant_or_self(), child("b")],
            }
        );
    }

    #[test]
    fn test_predicate_and_attribute_step() {
        let expr = parse_query(r#"*[@nc:name = "x.png"][1]"#).unwrap();

        let Expr::Path { steps, .. } = expr else {
            panic!("expected path");
        };
        let Step::Axis {
            test, predicates, ..
        } = &steps[0]
        else {
            panic!("expected axis step");
        };
        assert_eq!(*test, NodeTest::Wildcard(None));
        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[1], Expr::Number(1.0));
    }

    #[test]
    fn test_function_call_and_literals() {
        let expr = parse_query("concat($path, '/', 'index')").unwrap();

        assert_eq!(
            expr,
            Expr::Call {
                name: name(None, "concat"),
                args: vec![
                    Expr::Variable(name(None, "path")),
                    Expr::Literal("/".to_owned()),
                    Expr::Literal("index".to_owned()),
                ],
            }
        );
    }

    #[test]
    fn test_kind_tests_are_steps() {
        let expr = parse_query("text()").unwrap();

        assert_eq!(
            expr,
            Expr::Path {
                start: PathStart::Relative,
                steps: vec![Step::Axis {
                    axis: Axis::Child,
                    test: NodeTest::Text,
                    predicates: Vec::new(),
                }],
            }
        );
    }

    #[test]
    fn test_boolean_operators_and_union() {
        let expr = parse_query("a | b or c and d").unwrap();

        assert!(matches!(expr, Expr::Or(lhs, rhs)
            if matches!(*lhs, Expr::Union(_)) && matches!(*rhs, Expr::And(_, _))));
    }

    #[test]
    fn test_variable_step() {
        let expr = parse_query("$dir/page").unwrap();

        assert_eq!(
            expr,
            Expr::Path {
                start: PathStart::Relative,
                steps: vec![
                    Step::Filter(Expr::Variable(name(None, "dir"))),
                    child("page"),
                ],
            }
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse_query("a/").is_err());
        assert!(parse_query("a[").is_err());
        assert!(parse_query("bogus::a").is_err());
        assert!(parse_query("a b").is_err());
        assert!(parse_query("f(1,").is_err());
    }
}
