use indexmap::IndexMap;

use crate::{ConnectedVariable, Error, Value};

/// Time history of the recorded variables.
///
/// `t` and every series in `u` are parallel: the `i`-th value of a series was recorded at
/// `t[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MermaidSolution {
    pub t: Vec<f64>,
    pub u: IndexMap<ConnectedVariable, Vec<Value>>,
}

/// Upper bound on the samples reserved up front. Longer runs grow as they go.
const MAX_RESERVED_POINTS: usize = 1024;

impl MermaidSolution {
    pub(crate) fn with_capacity(save_vars: &[ConnectedVariable], num_points: usize) -> Self {
        let num_points = num_points.min(MAX_RESERVED_POINTS);
        Self {
            t: Vec::with_capacity(num_points),
            u: save_vars
                .iter()
                .map(|var| (var.clone(), Vec::with_capacity(num_points)))
                .collect(),
        }
    }

    /// Append one sample. `values` must follow the order of the recorded variables.
    pub(crate) fn push(&mut self, time: f64, values: impl IntoIterator<Item = Value>) {
        self.t.push(time);
        for (series, value) in self.u.values_mut().zip(values) {
            series.push(value);
        }
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn get(&self, var: &ConnectedVariable) -> Option<&[Value]> {
        self.u.get(var).map(Vec::as_slice)
    }

    /// Look up a series by its variable name, e.g. `"tank.level[0]"`.
    pub fn get_by_name(&self, name: &str) -> Result<Option<&[Value]>, Error> {
        let var = ConnectedVariable::parse(name)?;
        Ok(self.get(&var))
    }

    /// The recorded series as plain reals, for variables that hold numeric scalars.
    pub fn reals(&self, var: &ConnectedVariable) -> Result<Vec<f64>, Error> {
        self.get(var)
            .ok_or_else(|| Error::NotRecorded(var.clone()))?
            .iter()
            .map(Value::as_real)
            .collect()
    }

    /// The last recorded value of every variable.
    pub fn final_values(&self) -> IndexMap<&ConnectedVariable, &Value> {
        self.u
            .iter()
            .filter_map(|(var, series)| series.last().map(|value| (var, value)))
            .collect()
    }
}

#[cfg(feature = "arrow")]
mod arrow_export {
    use std::sync::Arc;

    use arrow::{
        array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, ListBuilder},
        datatypes::{Field, Schema},
        record_batch::RecordBatch,
    };

    use super::MermaidSolution;
    use crate::{Error, Value};

    fn column(series: &[Value]) -> Result<ArrayRef, Error> {
        let mismatch = |expected, value: &Value| Error::TypeMismatch {
            expected,
            found: value.type_name(),
        };

        let array: ArrayRef = match series.first() {
            None | Some(Value::Real(_)) => {
                let mut builder = Float64Builder::with_capacity(series.len());
                for value in series {
                    builder.append_value(value.as_real()?);
                }
                Arc::new(builder.finish())
            }
            Some(Value::Integer(_)) => {
                let mut builder = Int64Builder::with_capacity(series.len());
                for value in series {
                    builder.append_value(value.as_integer()?);
                }
                Arc::new(builder.finish())
            }
            Some(Value::Boolean(_)) => {
                let mut builder = BooleanBuilder::with_capacity(series.len());
                for value in series {
                    builder.append_value(value.as_bool()?);
                }
                Arc::new(builder.finish())
            }
            Some(Value::Vector(_)) => {
                let mut builder = ListBuilder::new(Float64Builder::new());
                for value in series {
                    let Value::Vector(v) = value else {
                        return Err(mismatch("Vector", value));
                    };
                    builder.values().append_slice(v);
                    builder.append(true);
                }
                Arc::new(builder.finish())
            }
            Some(value @ Value::List(_)) => return Err(mismatch("Real", value)),
        };
        Ok(array)
    }

    impl MermaidSolution {
        /// Export as a `RecordBatch` with a `time` column followed by one column per recorded
        /// variable, named by its literal.
        pub fn to_record_batch(&self) -> Result<RecordBatch, Error> {
            let time = std::iter::once((
                "time".to_owned(),
                Arc::new(arrow::array::Float64Array::from(self.t.clone())) as ArrayRef,
            ));

            let columns = self
                .u
                .iter()
                .map(|(var, series)| Ok((var.literal().to_owned(), column(series)?)))
                .collect::<Result<Vec<_>, Error>>()?;

            let (fields, columns): (Vec<_>, Vec<_>) = time
                .chain(columns)
                .map(|(name, array)| (Field::new(name, array.data_type().clone(), false), array))
                .unzip();

            let schema = Arc::new(Schema::new(fields));
            Ok(RecordBatch::try_new(schema, columns)?)
        }
    }
}
