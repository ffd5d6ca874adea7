//! Library modules.
//!
//! Supported prolog:
//!
//! ```text
//! xquery version "3.1";
//! module namespace p = "uri";
//! declare namespace q = "uri";
//! declare variable $p:v := expr;
//! declare variable $p:w external;
//! declare function p:f($a as xs:string, $b) as xs:string { expr };
//! ```
//!
//! Type annotations are accepted and ignored.

use std::sync::Arc;

use crate::ast::NameRef;
use crate::error::QueryError;
use crate::eval::{DeclaredFunction, DeclaredVariable, ExpandedName, Namespaces, resolve_name};
use crate::lexer::Token;
use crate::parser::Parser;

/// Declarations of one parsed module.
#[derive(Debug)]
pub(crate) struct Module {
    pub namespace: String,
    pub prefix: String,
    pub variables: Vec<(ExpandedName, DeclaredVariable)>,
    pub functions: Vec<(ExpandedName, DeclaredFunction)>,
}

struct Pending {
    name: NameRef,
    kind: PendingKind,
}

enum PendingKind {
    Variable(Option<crate::ast::Expr>),
    Function {
        params: Vec<NameRef>,
        body: crate::ast::Expr,
    },
}

/// Parse `source`, resolving prefixes against `base` plus the module's own
/// declarations.
pub(crate) fn parse_module(source: &str, base: &Namespaces) -> Result<Module, QueryError> {
    parse(source, base).map_err(|err| match err {
        QueryError::Syntax { message, .. } => QueryError::Module(message),
        other => other,
    })
}

fn parse(source: &str, base: &Namespaces) -> Result<Module, QueryError> {
    let mut parser = Parser::new(source)?;

    if parser.eat_word("xquery") {
        parser.expect_word("version")?;
        parser.expect_string()?;
        if parser.eat_word("encoding") {
            parser.expect_string()?;
        }
        parser.expect(&Token::Semicolon)?;
    }

    if !parser.eat_word("module") {
        return Err(QueryError::Module(
            "expected 'module namespace' declaration".to_owned(),
        ));
    }
    parser.expect_word("namespace")?;
    let prefix = parser.expect_name()?;
    if prefix.prefix.is_some() {
        return Err(QueryError::Module(format!(
            "module prefix must be an NCName, found '{prefix}'"
        )));
    }
    parser.expect(&Token::Eq)?;
    let namespace = parser.expect_string()?;
    parser.expect(&Token::Semicolon)?;

    let mut namespaces = base.clone();
    namespaces.insert(prefix.local.clone(), namespace.clone());

    let mut pending = Vec::new();
    while parser.peek().is_some() {
        if parser.eat_word("import") {
            // Imported modules are registered separately; only the prefix matters.
            parser.expect_word("module")?;
            parser.expect_word("namespace")?;
            let name = parser.expect_name()?;
            parser.expect(&Token::Eq)?;
            let uri = parser.expect_string()?;
            namespaces.insert(name.local, uri);
            while !parser.eat(&Token::Semicolon) {
                if parser.next().is_none() {
                    return Err(parser.error("unterminated import"));
                }
            }
            continue;
        }

        parser.expect_word("declare")?;
        if parser.eat_word("namespace") {
            let name = parser.expect_name()?;
            parser.expect(&Token::Eq)?;
            let uri = parser.expect_string()?;
            parser.expect(&Token::Semicolon)?;
            namespaces.insert(name.local, uri);
        } else if parser.eat_word("variable") {
            parser.expect(&Token::Dollar)?;
            let name = parser.expect_name()?;
            skip_type_annotation(&mut parser);
            let value = if parser.eat_word("external") {
                None
            } else {
                parser.expect(&Token::Assign)?;
                Some(parser.parse_single()?)
            };
            parser.expect(&Token::Semicolon)?;
            pending.push(Pending {
                name,
                kind: PendingKind::Variable(value),
            });
        } else if parser.eat_word("function") {
            let name = parser.expect_name()?;
            parser.expect(&Token::LParen)?;
            let mut params = Vec::new();
            if !parser.eat(&Token::RParen) {
                loop {
                    parser.expect(&Token::Dollar)?;
                    params.push(parser.expect_name()?);
                    skip_type_annotation(&mut parser);
                    if parser.eat(&Token::RParen) {
                        break;
                    }
                    parser.expect(&Token::Comma)?;
                }
            }
            skip_type_annotation(&mut parser);
            parser.expect(&Token::LBrace)?;
            let body = parser.parse_expr()?;
            parser.expect(&Token::RBrace)?;
            parser.expect(&Token::Semicolon)?;
            pending.push(Pending {
                name,
                kind: PendingKind::Function { params, body },
            });
        } else {
            return Err(parser.error(format!(
                "unsupported declaration {:?}",
                parser.peek()
            )));
        }
    }

    // Declarations may use prefixes declared after them, so resolve last.
    let namespaces = Arc::new(namespaces);
    let mut module = Module {
        namespace,
        prefix: prefix.local,
        variables: Vec::new(),
        functions: Vec::new(),
    };
    for Pending { name, kind } in pending {
        let expanded = resolve_name(&name, &namespaces)?;
        match kind {
            PendingKind::Variable(value) => module.variables.push((
                expanded,
                DeclaredVariable {
                    value,
                    namespaces: Arc::clone(&namespaces),
                },
            )),
            PendingKind::Function { params, body } => {
                let params = params
                    .iter()
                    .map(|param| resolve_name(param, &namespaces))
                    .collect::<Result<Vec<_>, _>>()?;
                module.functions.push((
                    expanded,
                    DeclaredFunction {
                        params,
                        body,
                        namespaces: Arc::clone(&namespaces),
                    },
                ));
            }
        }
    }
    Ok(module)
}

/// Skip `as SequenceType` if present.
fn skip_type_annotation(parser: &mut Parser<'_>) {
    if !parser.eat_word("as") {
        return;
    }
    let mut depth = 0usize;
    while let Some(token) = parser.peek() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => return,
            Token::RParen => depth -= 1,
            Token::Comma | Token::Assign | Token::LBrace | Token::Semicolon if depth == 0 => {
                return;
            }
            Token::Name { prefix: None, local } if depth == 0 && local == "external" => return,
            _ => {}
        }
        parser.next();
    }
}
