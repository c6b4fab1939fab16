//! Data-flow edges between components.

use std::sync::Arc;

use itertools::Itertools;

use crate::{ConnectedVariable, Error, Value};

type TransformFn = dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync;

/// A pure function combining the values collected from a connector's sources.
///
/// Values arrive positionally, in the order the connector declares its sources.
#[derive(Clone)]
pub struct Transform {
    arity: Option<usize>,
    func: Arc<TransformFn>,
}

impl Transform {
    /// A transform over any number of values.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self {
            arity: None,
            func: Arc::new(func),
        }
    }

    /// A transform that expects exactly `arity` values.
    pub fn with_arity<F>(arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self {
            arity: Some(arity),
            func: Arc::new(func),
        }
    }

    /// A scalar function of one real value.
    pub fn unary<F>(func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::with_arity(1, move |values| Ok(Value::Real(func(values[0].as_real()?))))
    }

    /// A scalar function of two real values.
    pub fn binary<F>(func: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        Self::with_arity(2, move |values| {
            Ok(Value::Real(func(values[0].as_real()?, values[1].as_real()?)))
        })
    }

    /// Sum of all collected values, as a real.
    pub fn sum() -> Self {
        Self::new(|values| {
            values
                .iter()
                .map(Value::as_real)
                .sum::<Result<f64, _>>()
                .map(Value::Real)
        })
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Apply the transform, checking the number of values against the declared arity.
    pub fn apply(&self, values: &[Value]) -> Result<Value, Error> {
        if let Some(arity) = self.arity {
            if values.len() != arity {
                return Err(Error::Arity {
                    expected: arity,
                    found: values.len(),
                });
            }
        }
        (self.func)(values)
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A directed data dependency: `inputs` are read, optionally combined by a [`Transform`], and
/// the single result is written to every variable in `outputs`.
#[derive(Clone, Debug)]
pub struct Connector {
    inputs: Vec<ConnectedVariable>,
    outputs: Vec<ConnectedVariable>,
    transform: Option<Transform>,
}

impl Connector {
    pub fn new(
        inputs: impl IntoIterator<Item = ConnectedVariable>,
        outputs: impl IntoIterator<Item = ConnectedVariable>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
            transform: None,
        }
    }

    /// Build a connector from variable names such as `"tank.level[2]"`.
    pub fn from_names<I, O>(inputs: I, outputs: O) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        O: IntoIterator,
        O::Item: AsRef<str>,
    {
        let inputs = inputs
            .into_iter()
            .map(|name| ConnectedVariable::parse(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = outputs
            .into_iter()
            .map(|name| ConnectedVariable::parse(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(inputs, outputs))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// The source variables, in declaration order.
    pub fn inputs(&self) -> &[ConnectedVariable] {
        &self.inputs
    }

    /// The destination variables, in declaration order.
    pub fn outputs(&self) -> &[ConnectedVariable] {
        &self.outputs
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// Whether any endpoint of this connector belongs to `component`.
    pub fn references(&self, component: &str) -> bool {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .any(|var| var.is_owned_by(component))
    }

    /// Reduce the collected source values to the single value fanned out to every destination.
    ///
    /// With a transform, the transform is applied. Without one, a single value passes through
    /// unchanged and several values are passed on as an ordered [`Value::List`].
    pub fn combine(&self, mut values: Vec<Value>) -> Result<Value, Error> {
        match &self.transform {
            Some(transform) => transform.apply(&values),
            None if values.len() == 1 => Ok(values.remove(0)),
            None => Ok(Value::List(values)),
        }
    }
}

impl std::fmt::Display for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] -> [{}]",
            self.inputs.iter().join(", "),
            self.outputs.iter().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_without_transform() {
        let connector = Connector::from_names(["a.x"], ["b.y", "c.y"]).unwrap();
        assert_eq!(
            connector.combine(vec![Value::Real(3.0)]).unwrap(),
            Value::Real(3.0)
        );

        let connector = Connector::from_names(["a.x", "a.z"], ["b.y"]).unwrap();
        assert_eq!(
            connector
                .combine(vec![Value::Real(1.0), Value::Integer(2)])
                .unwrap(),
            Value::List(vec![Value::Real(1.0), Value::Integer(2)])
        );
    }

    #[test]
    fn test_combine_with_transform() {
        let connector = Connector::from_names(["a.x", "b.x"], ["c.y"])
            .unwrap()
            .with_transform(Transform::binary(|x, y| x + y));
        assert_eq!(
            connector
                .combine(vec![Value::Real(2.0), Value::Real(5.0)])
                .unwrap(),
            Value::Real(7.0)
        );
    }

    #[test]
    fn test_transform_arity() {
        let transform = Transform::binary(|x, y| x * y);
        assert_eq!(transform.arity(), Some(2));
        assert!(matches!(
            transform.apply(&[Value::Real(1.0)]),
            Err(Error::Arity {
                expected: 2,
                found: 1
            })
        ));
        assert_eq!(
            Transform::sum()
                .apply(&[Value::Real(1.0), Value::Real(2.0), Value::Integer(3)])
                .unwrap(),
            Value::Real(6.0)
        );
    }

    #[test]
    fn test_references_and_display() {
        let connector = Connector::from_names(["a.x[0:1]"], ["b.y"]).unwrap();
        assert!(connector.references("a"));
        assert!(connector.references("b"));
        assert!(!connector.references("c"));
        assert_eq!(connector.to_string(), "[a.x[0:1]] -> [b.y]");
    }

    #[test]
    fn test_from_names_reports_parse_errors() {
        assert!(matches!(
            Connector::from_names(["a"], ["b.y"]),
            Err(Error::Parse(_))
        ));
    }
}
