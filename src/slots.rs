//! Index semantics shared by adapters whose native state is flat `f64` storage.
//!
//! A location is a list of native slot positions. An optional [`Index`] then narrows the
//! location: `Single(i)` picks its `i`-th slot, `Range(a..=b)` picks slots `a` through `b`.

use crate::{variable::Index, Error, Value};

/// Resolve the native slots selected by `index` within `location`.
pub fn select(location: &[usize], index: Option<&Index>) -> Result<Vec<usize>, Error> {
    let Some(index) = index else {
        return Ok(location.to_vec());
    };
    index
        .positions()
        .map(|i| {
            location.get(i).copied().ok_or(Error::IndexOutOfRange {
                index: i,
                len: location.len(),
            })
        })
        .collect()
}

fn get(data: &[f64], slot: usize) -> Result<f64, Error> {
    data.get(slot).copied().ok_or(Error::IndexOutOfRange {
        index: slot,
        len: data.len(),
    })
}

/// Read the value at `location`.
///
/// Without an index a one-slot location reads as [`Value::Real`] and anything else as
/// [`Value::Vector`]. A single index always reads as `Real`, a range always as `Vector`.
pub fn read(data: &[f64], location: &[usize], index: Option<&Index>) -> Result<Value, Error> {
    let selected = select(location, index)?;
    let scalar = match index {
        None => selected.len() == 1,
        Some(Index::Single(_)) => true,
        Some(Index::Range(_)) => false,
    };
    if scalar {
        Ok(Value::Real(get(data, selected[0])?))
    } else {
        selected
            .iter()
            .map(|&slot| get(data, slot))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Vector)
    }
}

/// Write `value` to the slots selected by `index` within `location`.
///
/// Scalars are broadcast over every selected slot. Vectors (and numeric lists) are written
/// element-wise and must match the number of selected slots.
pub fn write(
    data: &mut [f64],
    location: &[usize],
    index: Option<&Index>,
    value: &Value,
) -> Result<(), Error> {
    let selected = select(location, index)?;
    if selected.is_empty() {
        return Err(Error::EmptySelection);
    }
    if let Some(&slot) = selected.iter().find(|&&slot| slot >= data.len()) {
        return Err(Error::IndexOutOfRange {
            index: slot,
            len: data.len(),
        });
    }

    match value {
        Value::Vector(_) | Value::List(_) => {
            let values = value.to_vector()?;
            if values.len() != selected.len() {
                return Err(Error::LengthMismatch {
                    expected: selected.len(),
                    found: values.len(),
                });
            }
            for (slot, x) in selected.into_iter().zip(values) {
                data[slot] = x;
            }
        }
        scalar => {
            let x = scalar.as_real()?;
            for slot in selected {
                data[slot] = x;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_whole_location() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(read(&data, &[2], None).unwrap(), Value::Real(3.0));
        assert_eq!(
            read(&data, &[0, 1], None).unwrap(),
            Value::Vector(vec![1.0, 2.0])
        );
    }

    #[test]
    fn test_read_indexed() {
        let data = [1.0, 2.0, 3.0, 4.0];
        let location = [1, 2, 3];
        assert_eq!(
            read(&data, &location, Some(&Index::Single(1))).unwrap(),
            Value::Real(3.0)
        );
        assert_eq!(
            read(&data, &location, Some(&Index::Range(0..=1))).unwrap(),
            Value::Vector(vec![2.0, 3.0])
        );
        assert!(matches!(
            read(&data, &location, Some(&Index::Single(3))),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_range_write_broadcasts() {
        let mut data = vec![0.0; 6];
        let location: Vec<usize> = (0..6).collect();
        write(&mut data, &location, Some(&Index::Range(2..=4)), &Value::Real(9.0)).unwrap();
        assert_eq!(data, vec![0.0, 0.0, 9.0, 9.0, 9.0, 0.0]);
    }

    #[test]
    fn test_single_slot_range_write() {
        let mut data = vec![0.0; 6];
        let location: Vec<usize> = (0..6).collect();
        write(&mut data, &location, Some(&Index::Range(3..=3)), &Value::Real(9.0)).unwrap();
        assert_eq!(data, vec![0.0, 0.0, 0.0, 9.0, 0.0, 0.0]);
    }

    #[test]
    fn test_whole_location_write() {
        let mut data = vec![0.0; 4];
        write(&mut data, &[1, 3], None, &Value::Vector(vec![5.0, 6.0])).unwrap();
        assert_eq!(data, vec![0.0, 5.0, 0.0, 6.0]);

        write(&mut data, &[1, 3], None, &Value::Integer(2)).unwrap();
        assert_eq!(data, vec![0.0, 2.0, 0.0, 2.0]);
    }

    #[test]
    fn test_write_errors() {
        let mut data = vec![0.0; 4];
        let location = [0, 1, 2];
        assert!(matches!(
            write(&mut data, &location, None, &Value::Vector(vec![1.0])),
            Err(Error::LengthMismatch {
                expected: 3,
                found: 1
            })
        ));
        assert!(matches!(
            write(&mut data, &location, Some(&Index::Range(2..=1)), &Value::Real(1.0)),
            Err(Error::EmptySelection)
        ));
        assert!(matches!(
            write(&mut data, &[7], None, &Value::Real(1.0)),
            Err(Error::IndexOutOfRange { index: 7, len: 4 })
        ));
        // Nothing was partially written
        assert_eq!(data, vec![0.0; 4]);
    }
}
