//! Simple selectors
//!
//! The engine only ever needs single-component selectors to find sections
//! and tagged elements, so this is deliberately not a CSS selector engine.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{all_consuming, cut, map},
    error::{context, VerboseError},
    sequence::{delimited, preceded},
    Finish, IResult,
};

use crate::error::PlatformError;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// A single-component selector
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// `.name` - class list contains `name`
    Class(String),
    /// `[name]` - attribute `name` is present
    Attribute(String),
    /// `#name` - element id equals `name`
    Id(String),
    /// `name` - tag name equals `name` (case-insensitive)
    Tag(String),
}

impl Selector {
    /// Parse a selector string
    ///
    /// # Example
    ///
    /// ```rust
    /// use parallax_platform::Selector;
    ///
    /// assert_eq!(
    ///     Selector::parse(".parallax-section").unwrap(),
    ///     Selector::Class("parallax-section".to_string())
    /// );
    /// assert!(Selector::parse("div > p").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, PlatformError> {
        let input = input.trim();
        all_consuming(selector)(input)
            .finish()
            .map(|(_, selector)| selector)
            .map_err(|_| PlatformError::InvalidSelector(input.to_string()))
    }
}

/// CSS identifier made of alphanumerics, `-` and `_`
fn identifier(input: &str) -> ParseResult<&str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')(input)
}

fn selector(input: &str) -> ParseResult<Selector> {
    alt((
        context(
            "class selector",
            map(preceded(char('.'), cut(identifier)), |name: &str| {
                Selector::Class(name.to_string())
            }),
        ),
        context(
            "ID selector",
            map(preceded(char('#'), cut(identifier)), |name: &str| {
                Selector::Id(name.to_string())
            }),
        ),
        context(
            "attribute selector",
            map(
                delimited(char('['), cut(identifier), cut(char(']'))),
                |name: &str| Selector::Attribute(name.to_string()),
            ),
        ),
        context(
            "type selector",
            map(identifier, |name: &str| Selector::Tag(name.to_ascii_lowercase())),
        ),
    ))(input)
}

impl FromStr for Selector {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Class(name) => write!(f, ".{name}"),
            Selector::Attribute(name) => write!(f, "[{name}]"),
            Selector::Id(name) => write!(f, "#{name}"),
            Selector::Tag(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!(
            Selector::parse("[data-parallax]").unwrap(),
            Selector::Attribute("data-parallax".to_string())
        );
        assert_eq!(
            Selector::parse("#hero").unwrap(),
            Selector::Id("hero".to_string())
        );
        assert_eq!(
            Selector::parse("IMG").unwrap(),
            Selector::Tag("img".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", ".", "#", "[data-parallax", "div p", ".a.b", "[]", "[a b]", "a>b"] {
            assert!(
                matches!(Selector::parse(input), Err(PlatformError::InvalidSelector(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_round_trips_source() {
        let selector: Selector = ".parallax-section".parse().unwrap();
        assert_eq!(selector.to_string(), ".parallax-section");
    }
}
