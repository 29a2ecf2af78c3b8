//! Parser for the compact expressions used to name nodes, conditions and filters.
//!
//! ```text
//! expr := IDENT ('{' params '}')? ('(' expr (',' expr)* ')')?
//! ```
//!
//! `params` is kept as raw text (braces may nest) and handed to the factory. Examples:
//! `Idle{1000}`, `Not(IsAttribute{Hungry,true})`, `Filter(First(SelectVisible))`.

use ai_core::{ConditionPtr, FilterPtr, SteeringPtr, TreeNodePtr};

use crate::registry::{
    AiRegistry, ConditionFactoryContext, FilterFactoryContext, SteeringFactoryContext,
    TreeNodeFactoryContext,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub name: String,
    pub parameters: String,
    pub children: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("unexpected '{found}' at position {position}, expected {expected}")]
    Unexpected {
        found: char,
        position: usize,
        expected: &'static str,
    },
    #[error("{kind} '{name}' does not take nested expressions")]
    UnexpectedChildren { kind: &'static str, name: String },
    #[error("could not create {kind} '{name}'")]
    Create { kind: &'static str, name: String },
}

/// Parses a single expression. Trailing input is an error.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser { input, pos: 0 };
    let expr = parser.expr()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(expr),
        Some(found) => Err(ParseError::Unexpected {
            found,
            position: parser.pos,
            expected: "end of input",
        }),
    }
}

/// Builds a condition. Nested expressions are conditions, except for `Filter(..)` whose
/// nested expressions are filters.
pub fn parse_condition(registry: &AiRegistry, input: &str) -> Result<ConditionPtr, ParseError> {
    build_condition(registry, &parse(input)?)
}

pub fn parse_filter(registry: &AiRegistry, input: &str) -> Result<FilterPtr, ParseError> {
    build_filter(registry, &parse(input)?)
}

pub fn parse_steering(registry: &AiRegistry, input: &str) -> Result<SteeringPtr, ParseError> {
    let expr = parse(input)?;
    if !expr.children.is_empty() {
        return Err(ParseError::UnexpectedChildren {
            kind: "steering",
            name: expr.name,
        });
    }
    registry
        .create_steering(&expr.name, &SteeringFactoryContext::new(expr.parameters))
        .ok_or(ParseError::Create {
            kind: "steering",
            name: expr.name,
        })
}

/// Builds a tree node from `Type{params}`. Structure is supplied by the caller through
/// `children`, so nested expressions are rejected.
pub fn parse_node(
    registry: &AiRegistry,
    input: &str,
    name: &str,
    condition: Option<ConditionPtr>,
    children: Vec<TreeNodePtr>,
) -> Result<TreeNodePtr, ParseError> {
    let expr = parse(input)?;
    if !expr.children.is_empty() {
        return Err(ParseError::UnexpectedChildren {
            kind: "node",
            name: expr.name,
        });
    }
    let mut ctx = TreeNodeFactoryContext::new(expr.name.clone(), name)
        .with_parameters(expr.parameters)
        .with_children(children);
    ctx.condition = condition;
    registry.create_node(&ctx).ok_or(ParseError::Create {
        kind: "node",
        name: expr.name,
    })
}

fn build_condition(registry: &AiRegistry, expr: &Expr) -> Result<ConditionPtr, ParseError> {
    let mut ctx = ConditionFactoryContext::new(expr.parameters.clone());
    if expr.name == "Filter" {
        ctx.filters = expr
            .children
            .iter()
            .map(|child| build_filter(registry, child))
            .collect::<Result<_, _>>()?;
    } else {
        ctx.conditions = expr
            .children
            .iter()
            .map(|child| build_condition(registry, child))
            .collect::<Result<_, _>>()?;
    }
    registry
        .create_condition(&expr.name, &ctx)
        .ok_or_else(|| ParseError::Create {
            kind: "condition",
            name: expr.name.clone(),
        })
}

fn build_filter(registry: &AiRegistry, expr: &Expr) -> Result<FilterPtr, ParseError> {
    let mut ctx = FilterFactoryContext::new(expr.parameters.clone());
    ctx.filters = expr
        .children
        .iter()
        .map(|child| build_filter(registry, child))
        .collect::<Result<_, _>>()?;
    registry
        .create_filter(&expr.name, &ctx)
        .ok_or_else(|| ParseError::Create {
            kind: "filter",
            name: expr.name.clone(),
        })
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            return true;
        }
        false
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(found) => ParseError::Unexpected {
                found,
                position: self.pos,
                expected,
            },
            None => ParseError::UnexpectedEnd { expected },
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        let parameters = if self.eat('{') {
            self.parameters()?
        } else {
            String::new()
        };
        self.skip_ws();

        let mut children = Vec::new();
        if self.eat('(') {
            loop {
                children.push(self.expr()?);
                self.skip_ws();
                if self.eat(',') {
                    continue;
                }
                if self.eat(')') {
                    break;
                }
                return Err(self.unexpected("',' or ')'"));
            }
        }

        Ok(Expr {
            name,
            parameters,
            children,
        })
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected("a type name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Raw text up to the matching `}`; the opening brace is already consumed.
    fn parameters(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.bump() {
                None => return Err(ParseError::UnexpectedEnd { expected: "'}'" }),
                Some('{') => depth += 1,
                Some('}') if depth == 0 => {
                    return Ok(self.input[start..self.pos - 1].trim().to_string());
                }
                Some('}') => depth -= 1,
                Some(_) => {}
            }
        }
    }
}
