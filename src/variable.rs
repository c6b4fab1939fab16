//! Addressing of coupled quantities.
//!
//! A [`ConnectedVariable`] names one quantity owned by one component, written as
//! `<component>.<variable>` with an optional zero-based index suffix: `tank.level`,
//! `tank.level[3]` or the inclusive range `tank.level[2:4]`.

use std::{fmt::Display, ops::RangeInclusive, str::FromStr};

/// Errors produced while parsing a variable name.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty variable name")]
    Empty,

    #[error("Expected `<component>.<variable>` in `{0}`")]
    MissingSeparator(String),

    #[error("More than one `.` separator in `{0}`")]
    MultipleSeparators(String),

    #[error("Empty component name in `{0}`")]
    EmptyComponent(String),

    #[error("Empty variable name in `{0}`")]
    EmptyVariable(String),

    #[error("Unmatched bracket in `{0}`")]
    UnmatchedBracket(String),

    #[error("Invalid index `{index}` in `{name}`")]
    InvalidIndex { name: String, index: String },
}

/// Selection of native slots within a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Index {
    Single(usize),
    /// Inclusive on both ends.
    Range(RangeInclusive<usize>),
}

impl Index {
    /// The selected positions, in ascending order.
    pub fn positions(&self) -> RangeInclusive<usize> {
        match self {
            Index::Single(i) => *i..=*i,
            Index::Range(r) => r.clone(),
        }
    }
}

impl Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Index::Single(i) => write!(f, "{i}"),
            Index::Range(r) => write!(f, "{}:{}", r.start(), r.end()),
        }
    }
}

/// One addressable quantity of one component.
///
/// Equality and hashing are structural over all fields, including the literal the variable was
/// parsed from, so values reconstructed from the same string always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectedVariable {
    component: String,
    variable: String,
    index: Option<Index>,
    literal: String,
}

impl ConnectedVariable {
    /// Build a variable from its parts. The literal is the canonical `component.variable[index]`
    /// form, identical to what parsing that form produces.
    pub fn new(component: impl Into<String>, variable: impl Into<String>, index: Option<Index>) -> Self {
        let component = component.into();
        let variable = variable.into();
        let literal = match &index {
            Some(index) => format!("{component}.{variable}[{index}]"),
            None => format!("{component}.{variable}"),
        };
        Self {
            component,
            variable,
            index,
            literal,
        }
    }

    /// Parse a variable name, see the module docs for the grammar.
    pub fn parse(name: &str) -> Result<Self, ParseError> {
        name.parse()
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    /// The string this variable was parsed from.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Whether this variable belongs to the named component.
    pub fn is_owned_by(&self, component: &str) -> bool {
        self.component == component
    }
}

impl Display for ConnectedVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.literal)
    }
}

impl FromStr for ConnectedVariable {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let (path, index) = match s.find('[') {
            Some(open) => {
                let Some(body) = s[open + 1..].strip_suffix(']') else {
                    return Err(ParseError::UnmatchedBracket(s.to_owned()));
                };
                if body.contains(['[', ']']) {
                    return Err(ParseError::UnmatchedBracket(s.to_owned()));
                }
                (&s[..open], Some(parse_index(s, body)?))
            }
            None if s.contains(']') => return Err(ParseError::UnmatchedBracket(s.to_owned())),
            None => (s, None),
        };

        let mut parts = path.split('.');
        let (component, variable) = match (parts.next(), parts.next(), parts.next()) {
            (Some(component), Some(variable), None) => (component, variable),
            (_, _, Some(_)) => return Err(ParseError::MultipleSeparators(s.to_owned())),
            _ => return Err(ParseError::MissingSeparator(s.to_owned())),
        };

        if component.is_empty() {
            return Err(ParseError::EmptyComponent(s.to_owned()));
        }
        if variable.is_empty() {
            return Err(ParseError::EmptyVariable(s.to_owned()));
        }

        Ok(Self {
            component: component.to_owned(),
            variable: variable.to_owned(),
            index,
            literal: s.to_owned(),
        })
    }
}

fn parse_index(name: &str, body: &str) -> Result<Index, ParseError> {
    let invalid = || ParseError::InvalidIndex {
        name: name.to_owned(),
        index: body.to_owned(),
    };
    let number = |digits: &str| {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        digits.parse::<usize>().map_err(|_| invalid())
    };

    match body.split_once(':') {
        Some((start, stop)) => Ok(Index::Range(number(start)?..=number(stop)?)),
        None => Ok(Index::Single(number(body)?)),
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ConnectedVariable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.literal)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ConnectedVariable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
