//! Dynamically-typed values exchanged between components.

use std::fmt::Display;

use itertools::Itertools;

use crate::Error;

/// A value read from, or written to, a component's native state.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Vector(Vec<f64>),
    /// An ordered collection of values, e.g. what a connector without a transform produces from
    /// several sources.
    List(Vec<Value>),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Real(_) => "Real",
            Value::Integer(_) => "Integer",
            Value::Boolean(_) => "Boolean",
            Value::Vector(_) => "Vector",
            Value::List(_) => "List",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    /// Numeric scalar view. Integers and booleans are widened.
    pub fn as_real(&self) -> Result<f64, Error> {
        match self {
            Value::Real(x) => Ok(*x),
            Value::Integer(i) => Ok(*i as f64),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            _ => Err(self.mismatch("Real")),
        }
    }

    pub fn as_integer(&self) -> Result<i64, Error> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Boolean(b) => Ok(*b as i64),
            _ => Err(self.mismatch("Integer")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            Value::Boolean(b) => Ok(*b),
            _ => Err(self.mismatch("Boolean")),
        }
    }

    /// Vector view. Scalars become one-element vectors; a list converts when every element is
    /// a numeric scalar.
    pub fn to_vector(&self) -> Result<Vec<f64>, Error> {
        match self {
            Value::Vector(v) => Ok(v.clone()),
            Value::List(items) => items
                .iter()
                .map(Value::as_real)
                .collect::<Result<_, _>>()
                .map_err(|_| self.mismatch("Vector")),
            scalar => scalar.as_real().map(|x| vec![x]),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], Error> {
        match self {
            Value::List(items) => Ok(items),
            _ => Err(self.mismatch("List")),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Real(x) => write!(f, "{x}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Vector(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::List(items) => write!(f, "({})", items.iter().join(", ")),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Vector(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Value::Integer(3).as_real().unwrap(), 3.0);
        assert_eq!(Value::Boolean(true).as_real().unwrap(), 1.0);
        assert!(Value::Boolean(true).as_bool().unwrap());
        assert!(matches!(
            Value::Vector(vec![1.0]).as_real(),
            Err(Error::TypeMismatch {
                expected: "Real",
                found: "Vector"
            })
        ));
    }

    #[test]
    fn test_to_vector() {
        assert_eq!(Value::Real(2.0).to_vector().unwrap(), vec![2.0]);
        assert_eq!(
            Value::List(vec![Value::Real(1.0), Value::Integer(2)])
                .to_vector()
                .unwrap(),
            vec![1.0, 2.0]
        );
        assert!(Value::List(vec![Value::Vector(vec![1.0])])
            .to_vector()
            .is_err());
    }

    #[test]
    fn test_display() {
        let value = Value::List(vec![Value::Real(1.5), Value::Vector(vec![1.0, 2.0])]);
        assert_eq!(value.to_string(), "(1.5, [1, 2])");
    }
}
