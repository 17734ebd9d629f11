//! `${...}` interpolation
//!
//! A string scalar may embed any number of interpolation spans. Resolution
//! rules:
//!
//! - a string that is exactly one span resolves to the native type of the
//!   expression, so `"${2 + 2}"` can populate a number attribute
//! - any other mix of literal text and spans resolves to a string: every span
//!   is evaluated, rendered, and concatenated with the surrounding literals
//! - `$${` is an escaped literal `${`
//!
//! ## Grammar
//!
//! ```text
//! expr  := term ( "+" term )*
//! term  := number | ident | "(" expr ")"
//! number := "-"? digits ( "." digits )?
//! ident := [A-Za-z_] [A-Za-z0-9_.-]*
//! ```
//!
//! `+` adds two numbers. When either side is not a number but both sides are
//! strings or numbers, `+` concatenates their renderings. Anything else is a
//! type mismatch.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{all_consuming, cut, map, map_opt, opt, recognize},
    error::{context, VerboseError},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use taskconf_types::{Number, Scalar, Variables};
use thiserror::Error;

use crate::coerce::parse_number;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("unresolved variable '{0}'")]
    UnresolvedVariable(String),

    #[error("cannot add {left} and {right}")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },

    #[error("invalid expression '{text}': {reason}")]
    InvalidExpression { text: String, reason: String },
}

// ============================================================================
// Public API
// ============================================================================

/// Cheap pre-check; strings without `${` pass through the decoder untouched
pub fn has_interpolation(s: &str) -> bool {
    s.contains("${")
}

/// Resolve every interpolation span in `input` against `vars`
pub fn evaluate_template(input: &str, vars: &Variables) -> Result<Scalar, ExprError> {
    let parts = split_template(input)?;

    if let [Part::Expr(src)] = parts.as_slice() {
        return evaluate(src, vars);
    }

    let mut out = String::with_capacity(input.len());
    for part in parts {
        match part {
            Part::Literal(text) => out.push_str(&text),
            Part::Expr(src) => out.push_str(&evaluate(src, vars)?.to_string()),
        }
    }
    Ok(Scalar::String(out))
}

/// Parse and evaluate a single expression (the text between `${` and `}`)
pub fn evaluate(src: &str, vars: &Variables) -> Result<Scalar, ExprError> {
    let expr = parse_expression(src)?;
    eval(&expr, vars)
}

// ============================================================================
// Template splitting
// ============================================================================

#[derive(Debug, PartialEq)]
enum Part<'a> {
    Literal(String),
    Expr(&'a str),
}

fn split_template(input: &str) -> Result<Vec<Part<'_>>, ExprError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find("${") {
        if rest[..pos].ends_with('$') {
            literal.push_str(&rest[..pos - 1]);
            literal.push_str("${");
            rest = &rest[pos + 2..];
            continue;
        }
        literal.push_str(&rest[..pos]);
        let body = &rest[pos + 2..];
        let end = body.find('}').ok_or_else(|| ExprError::InvalidExpression {
            text: input.to_string(),
            reason: "unterminated interpolation".to_string(),
        })?;
        if !literal.is_empty() {
            parts.push(Part::Literal(std::mem::take(&mut literal)));
        }
        parts.push(Part::Expr(&body[..end]));
        rest = &body[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }
    Ok(parts)
}

// ============================================================================
// Expression AST and evaluation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(Number),
    Var(String),
    Add(Box<Expr>, Box<Expr>),
}

fn eval(expr: &Expr, vars: &Variables) -> Result<Scalar, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Scalar::Number(*n)),
        Expr::Var(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UnresolvedVariable(name.clone())),
        Expr::Add(lhs, rhs) => add(eval(lhs, vars)?, eval(rhs, vars)?),
    }
}

fn add(lhs: Scalar, rhs: Scalar) -> Result<Scalar, ExprError> {
    match (lhs, rhs) {
        (Scalar::Number(a), Scalar::Number(b)) => Ok(Scalar::Number(add_numbers(a, b))),
        (l @ (Scalar::Number(_) | Scalar::String(_)), r @ (Scalar::Number(_) | Scalar::String(_))) => {
            Ok(Scalar::String(format!("{}{}", l, r)))
        }
        (l, r) => Err(ExprError::TypeMismatch {
            left: l.type_name(),
            right: r.type_name(),
        }),
    }
}

fn add_numbers(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => x
            .checked_add(y)
            .map(Number::Integer)
            .unwrap_or(Number::Float(x as f64 + y as f64)),
        (x, y) => Number::Float(x.as_f64() + y.as_f64()),
    }
}

// ============================================================================
// Parser
// ============================================================================

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

fn parse_expression(src: &str) -> Result<Expr, ExprError> {
    match all_consuming(delimited(multispace0, sum, multispace0))(src) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ExprError::InvalidExpression {
            text: src.to_string(),
            reason: nom::error::convert_error(src, e).trim().to_string(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(ExprError::InvalidExpression {
            text: src.to_string(),
            reason: "incomplete input".to_string(),
        }),
    }
}

fn sum(input: &str) -> ParseResult<'_, Expr> {
    let (input, first) = term(input)?;
    fold_many0(
        preceded(char('+'), cut(context("operand", term))),
        move || first.clone(),
        |acc, rhs| Expr::Add(Box::new(acc), Box::new(rhs)),
    )(input)
}

fn term(input: &str) -> ParseResult<'_, Expr> {
    delimited(
        multispace0,
        alt((number, variable, parenthesized)),
        multispace0,
    )(input)
}

fn parenthesized(input: &str) -> ParseResult<'_, Expr> {
    delimited(char('('), sum, cut(context("closing parenthesis", char(')'))))(input)
}

fn number(input: &str) -> ParseResult<'_, Expr> {
    map_opt(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1))))),
        |text: &str| parse_number(text).map(Expr::Number),
    )(input)
}

fn variable(input: &str) -> ParseResult<'_, Expr> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_"), tag("."), tag("-")))),
        )),
        |name: &str| Expr::Var(name.to_string()),
    )(input)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Variables {
        Variables::new()
            .with("NOMAD_ALLOC_INDEX", 2i64)
            .with("NOMAD_META_hello", "world")
            .with("attr.kernel.name", "linux")
            .with("driver.docker.privileged", true)
    }

    #[test]
    fn test_whole_span_keeps_native_number() {
        assert_eq!(
            evaluate_template("${2 + 2}", &Variables::new()),
            Ok(Scalar::from(4i64))
        );
    }

    #[test]
    fn test_variable_lookup() {
        assert_eq!(
            evaluate_template("${NOMAD_META_hello}", &vars()),
            Ok(Scalar::from("world"))
        );
        assert_eq!(
            evaluate_template("${NOMAD_ALLOC_INDEX + 2}", &vars()),
            Ok(Scalar::from(4i64))
        );
    }

    #[test]
    fn test_mixed_literal_renders_string() {
        assert_eq!(
            evaluate_template("redis-${NOMAD_ALLOC_INDEX}", &vars()),
            Ok(Scalar::from("redis-2"))
        );
        assert_eq!(
            evaluate_template("${NOMAD_META_hello}${NOMAD_ALLOC_INDEX}", &vars()),
            Ok(Scalar::from("world2"))
        );
        assert_eq!(
            evaluate_template("${1 + 1} cores", &vars()),
            Ok(Scalar::from("2 cores"))
        );
    }

    #[test]
    fn test_dotted_names() {
        assert_eq!(
            evaluate_template("${attr.kernel.name}", &vars()),
            Ok(Scalar::from("linux"))
        );
    }

    #[test]
    fn test_plus_concatenates_strings() {
        assert_eq!(
            evaluate_template("${NOMAD_META_hello + NOMAD_ALLOC_INDEX}", &vars()),
            Ok(Scalar::from("world2"))
        );
    }

    #[test]
    fn test_plus_rejects_bool() {
        assert_eq!(
            evaluate_template("${driver.docker.privileged + 1}", &vars()),
            Err(ExprError::TypeMismatch {
                left: "bool",
                right: "number"
            })
        );
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            evaluate_template("${NOMAD_META_missing}", &vars()),
            Err(ExprError::UnresolvedVariable("NOMAD_META_missing".to_string()))
        );
    }

    #[test]
    fn test_float_arithmetic() {
        assert_eq!(
            evaluate_template("${1.5 + 2}", &Variables::new()),
            Ok(Scalar::from(3.5))
        );
    }

    #[test]
    fn test_integer_overflow_promotes() {
        let vars = Variables::new().with("big", i64::MAX);
        assert!(matches!(
            evaluate_template("${big + 1}", &vars),
            Ok(Scalar::Number(Number::Float(_)))
        ));
    }

    #[test]
    fn test_negative_literals() {
        assert_eq!(evaluate_template("${-1}", &Variables::new()), Ok(Scalar::from(-1i64)));
        assert_eq!(
            evaluate_template("${NOMAD_ALLOC_INDEX + -3}", &vars()),
            Ok(Scalar::from(-1i64))
        );
        assert_eq!(evaluate_template("${-0.5 + 1}", &Variables::new()), Ok(Scalar::from(0.5)));
        assert!(matches!(
            evaluate_template("${- 1}", &Variables::new()),
            Err(ExprError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(
            evaluate_template("${(1 + 2) + (3)}", &Variables::new()),
            Ok(Scalar::from(6i64))
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            evaluate_template("$${literal}", &Variables::new()),
            Ok(Scalar::from("${literal}"))
        );
    }

    #[test]
    fn test_invalid_expressions() {
        for src in ["${2 +}", "${}", "${2 2}", "${(1 + 2}", "${unterminated"] {
            assert!(
                matches!(
                    evaluate_template(src, &vars()),
                    Err(ExprError::InvalidExpression { .. })
                ),
                "{} should be invalid",
                src
            );
        }
    }

    #[test]
    fn test_has_interpolation() {
        assert!(!has_interpolation("redis:3.2"));
        assert!(!has_interpolation("$HOME"));
        assert!(has_interpolation("${x}"));
    }
}
