//! Visibility expressions
//!
//! An element's visibility property holds a boolean expression over
//! authorisation labels:
//!
//! ```text
//! public
//! private&(audit|admin)
//! ```
//!
//! `&` binds tighter than `|`. An empty expression is visible to everyone.
//! A user sees an element when their authorisations satisfy the expression.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    multi::separated_list1,
    sequence::delimited,
    IResult,
};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityExpression {
    Label(String),
    And(Vec<VisibilityExpression>),
    Or(Vec<VisibilityExpression>),
    /// Empty expression
    Public,
}

impl VisibilityExpression {
    pub fn parse(input: &str) -> Result<Self, String> {
        if input.trim().is_empty() {
            return Ok(VisibilityExpression::Public);
        }
        match parse_or(input) {
            Ok((remaining, expression)) => {
                if remaining.trim().is_empty() {
                    Ok(expression)
                } else {
                    Err(format!("Unexpected input after expression: '{}'", remaining.trim()))
                }
            }
            Err(e) => Err(format!("Parse error: {:?}", e)),
        }
    }

    pub fn evaluate(&self, auths: &HashSet<String>) -> bool {
        match self {
            VisibilityExpression::Public => true,
            VisibilityExpression::Label(label) => auths.contains(label),
            VisibilityExpression::And(terms) => terms.iter().all(|t| t.evaluate(auths)),
            VisibilityExpression::Or(terms) => terms.iter().any(|t| t.evaluate(auths)),
        }
    }
}

/// Whether a user holding `auths` may see an element marked `expression`.
/// Unparseable expressions hide the element.
pub fn is_visible(expression: &str, auths: &HashSet<String>) -> bool {
    match VisibilityExpression::parse(expression) {
        Ok(parsed) => parsed.evaluate(auths),
        Err(e) => {
            warn!(expression, error = %e, "Invalid visibility expression, hiding element");
            false
        }
    }
}

fn collapse(mut terms: Vec<VisibilityExpression>, wrap: fn(Vec<VisibilityExpression>) -> VisibilityExpression) -> VisibilityExpression {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        wrap(terms)
    }
}

fn parse_or(input: &str) -> IResult<&str, VisibilityExpression> {
    map(
        separated_list1(delimited(multispace0, char('|'), multispace0), parse_and),
        |terms| collapse(terms, VisibilityExpression::Or),
    )(input)
}

fn parse_and(input: &str) -> IResult<&str, VisibilityExpression> {
    map(
        separated_list1(delimited(multispace0, char('&'), multispace0), parse_term),
        |terms| collapse(terms, VisibilityExpression::And),
    )(input)
}

fn parse_term(input: &str) -> IResult<&str, VisibilityExpression> {
    let (input, _) = multispace0(input)?;
    alt((
        delimited(
            char('('),
            delimited(multispace0, parse_or, multispace0),
            char(')'),
        ),
        parse_label,
    ))(input)
}

fn parse_label(input: &str) -> IResult<&str, VisibilityExpression> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')),
        |label: &str| VisibilityExpression::Label(label.to_string()),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auths(labels: &[&str]) -> HashSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_precedence() {
        let parsed = VisibilityExpression::parse("a|b&c").unwrap();
        assert_eq!(
            parsed,
            VisibilityExpression::Or(vec![
                VisibilityExpression::Label("a".into()),
                VisibilityExpression::And(vec![
                    VisibilityExpression::Label("b".into()),
                    VisibilityExpression::Label("c".into()),
                ]),
            ])
        );
    }

    #[test]
    fn test_evaluate() {
        assert!(is_visible("", &auths(&[])));
        assert!(is_visible("public", &auths(&["public"])));
        assert!(!is_visible("private", &auths(&["public"])));
        assert!(is_visible("private & (audit | admin)", &auths(&["private", "admin"])));
        assert!(!is_visible("private&(audit|admin)", &auths(&["admin"])));
    }

    #[test]
    fn test_invalid_expressions_hide_elements() {
        assert!(VisibilityExpression::parse("a&").is_err());
        assert!(VisibilityExpression::parse("(a|b").is_err());
        assert!(!is_visible("a&", &auths(&["a"])));
    }
}
