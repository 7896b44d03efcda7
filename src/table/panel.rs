use std::collections::HashMap;

use super::{Frame, TableError, Value, MAJOR, MINOR};

/// A 3-D table with axes (items, major, minor).
///
/// Cells are dense; combinations absent from the source are `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    items: Vec<String>,
    major_axis: Vec<Value>,
    minor_axis: Vec<Value>,
    /// items × major × minor, row-major
    values: Vec<Value>,
}

/// Assigns each distinct label a position in first-appearance order.
struct Axis {
    labels: Vec<Value>,
    positions: HashMap<Value, usize>,
}

impl Axis {
    fn new() -> Self {
        Self {
            labels: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn position(&mut self, label: &Value) -> usize {
        if let Some(&p) = self.positions.get(label) {
            return p;
        }
        let p = self.labels.len();
        self.labels.push(label.clone());
        self.positions.insert(label.clone(), p);
        p
    }
}

impl Panel {
    /// Expands a flattened frame into a panel.
    ///
    /// The frame's row index becomes the `major` level and its `minor`
    /// column the `minor` level; every remaining column becomes an item.
    /// A `major` column, if present, is replaced by the index.
    pub fn unstack_minor(mut frame: Frame) -> Result<Self, TableError> {
        let minor = frame
            .remove_column(MINOR)
            .ok_or_else(|| TableError::MissingColumn(MINOR.to_string()))?;
        frame.remove_column(MAJOR);
        let (_, major, items) = frame.into_parts();

        let mut major_axis = Axis::new();
        let mut minor_axis = Axis::new();
        let cells: Vec<(usize, usize)> = major
            .iter()
            .zip(&minor)
            .map(|(mj, mn)| (major_axis.position(mj), minor_axis.position(mn)))
            .collect();

        let (n_major, n_minor) = (major_axis.labels.len(), minor_axis.labels.len());
        let plane = n_major * n_minor;
        let mut filled = vec![false; plane];
        for (row, &(j, k)) in cells.iter().enumerate() {
            let slot = j * n_minor + k;
            if filled[slot] {
                return Err(TableError::DuplicateEntry {
                    major: major[row].to_string(),
                    minor: minor[row].to_string(),
                });
            }
            filled[slot] = true;
        }

        let mut values = vec![Value::Null; items.len() * plane];
        let mut names = Vec::with_capacity(items.len());
        for (i, (name, column)) in items.into_iter().enumerate() {
            for (value, &(j, k)) in column.into_iter().zip(&cells) {
                values[i * plane + j * n_minor + k] = value;
            }
            names.push(name);
        }

        Ok(Self {
            items: names,
            major_axis: major_axis.labels,
            minor_axis: minor_axis.labels,
            values,
        })
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn major_axis(&self) -> &[Value] {
        &self.major_axis
    }

    pub fn minor_axis(&self) -> &[Value] {
        &self.minor_axis
    }

    /// (items, major, minor)
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.items.len(),
            self.major_axis.len(),
            self.minor_axis.len(),
        )
    }

    pub fn get(&self, item: &str, major: &Value, minor: &Value) -> Option<&Value> {
        let i = self.items.iter().position(|n| n == item)?;
        let j = self.major_axis.iter().position(|v| v == major)?;
        let k = self.minor_axis.iter().position(|v| v == minor)?;
        Some(&self.values[self.offset(i, j, k)])
    }

    /// The major × minor slice for one item, minor labels as columns.
    pub fn item(&self, name: &str) -> Option<Frame> {
        let i = self.items.iter().position(|n| n == name)?;
        let columns = self
            .minor_axis
            .iter()
            .enumerate()
            .map(|(k, label)| {
                let values = (0..self.major_axis.len())
                    .map(|j| self.values[self.offset(i, j, k)].clone())
                    .collect();
                (label.to_string(), values)
            })
            .collect();
        Frame::new(Some(MAJOR.to_string()), self.major_axis.clone(), columns).ok()
    }

    /// Flattens back to one row per (major, minor) pair: index = major,
    /// a `minor` column, then one column per item. Rows whose items are all
    /// null are dropped.
    pub fn to_frame(&self) -> Frame {
        let mut index = Vec::new();
        let mut minor = Vec::new();
        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); self.items.len()];
        for (j, mj) in self.major_axis.iter().enumerate() {
            for (k, mn) in self.minor_axis.iter().enumerate() {
                let row: Vec<&Value> = (0..self.items.len())
                    .map(|i| &self.values[self.offset(i, j, k)])
                    .collect();
                if row.iter().all(|v| v.is_null()) {
                    continue;
                }
                index.push(mj.clone());
                minor.push(mn.clone());
                for (column, value) in columns.iter_mut().zip(row) {
                    column.push(value.clone());
                }
            }
        }
        let named = std::iter::once((MINOR.to_string(), minor))
            .chain(self.items.iter().cloned().zip(columns))
            .collect();
        // Every column was filled row by row alongside the index.
        Frame::new(Some(MAJOR.to_string()), index, named).unwrap_or_default()
    }

    fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.major_axis.len() + j) * self.minor_axis.len() + k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flattened() -> Frame {
        // two majors × two minors, items `cap` and `prod`
        Frame::new(
            None,
            vec![
                Value::from("2005-01-01"),
                Value::from("2005-01-01"),
                Value::from("2005-01-02"),
                Value::from("2005-01-02"),
            ],
            vec![
                (
                    "minor".into(),
                    vec!["ccgt".into(), "pv".into(), "ccgt".into(), "pv".into()],
                ),
                ("cap".into(), vec![1.0.into(), 2.0.into(), 3.0.into(), 4.0.into()]),
                ("prod".into(), vec![5.0.into(), 6.0.into(), 7.0.into(), 8.0.into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn unstacks_into_three_axes() {
        let p = Panel::unstack_minor(flattened()).unwrap();
        assert_eq!(p.shape(), (2, 2, 2));
        assert_eq!(p.items(), ["cap".to_string(), "prod".to_string()]);
        assert_eq!(
            p.minor_axis(),
            [Value::from("ccgt"), Value::from("pv")]
        );
        assert_eq!(
            p.get("prod", &Value::from("2005-01-02"), &Value::from("ccgt")),
            Some(&Value::Float(7.0))
        );

        let cap = p.item("cap").unwrap();
        assert_eq!(cap.columns(), ["ccgt".to_string(), "pv".to_string()]);
        assert_eq!(
            cap.get(&Value::from("2005-01-01"), "pv"),
            Some(&Value::Float(2.0))
        );
    }

    #[test]
    fn flatten_then_unstack_reproduces_panel() {
        let p = Panel::unstack_minor(flattened()).unwrap();
        let again = Panel::unstack_minor(p.to_frame()).unwrap();
        assert_eq!(p, again);
    }

    #[test]
    fn missing_combinations_are_null_and_dropped_on_flatten() {
        let frame = Frame::new(
            None,
            vec![Value::Int(0), Value::Int(1)],
            vec![
                ("minor".into(), vec!["a".into(), "b".into()]),
                ("x".into(), vec![1.0.into(), 2.0.into()]),
            ],
        )
        .unwrap();
        let p = Panel::unstack_minor(frame).unwrap();
        assert_eq!(p.shape(), (1, 2, 2));
        assert_eq!(
            p.get("x", &Value::Int(0), &Value::from("b")),
            Some(&Value::Null)
        );
        assert_eq!(p.to_frame().num_rows(), 2);
    }

    #[test]
    fn index_overrides_major_column() {
        let frame = Frame::new(
            None,
            vec![Value::Int(0), Value::Int(1)],
            vec![
                ("major".into(), vec!["x".into(), "y".into()]),
                ("minor".into(), vec!["a".into(), "a".into()]),
                ("v".into(), vec![1.0.into(), 2.0.into()]),
            ],
        )
        .unwrap();
        let p = Panel::unstack_minor(frame).unwrap();
        assert_eq!(p.items(), ["v".to_string()]);
        assert_eq!(p.major_axis(), [Value::Int(0), Value::Int(1)]);
        assert_eq!(
            p.get("v", &Value::Int(1), &Value::from("a")),
            Some(&Value::Float(2.0))
        );
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let frame = Frame::new(
            None,
            vec![Value::Int(0), Value::Int(0)],
            vec![
                ("minor".into(), vec!["a".into(), "a".into()]),
                ("x".into(), vec![1.0.into(), 2.0.into()]),
            ],
        )
        .unwrap();
        assert_eq!(
            Panel::unstack_minor(frame),
            Err(TableError::DuplicateEntry {
                major: "0".into(),
                minor: "a".into()
            })
        );
    }

    #[test]
    fn requires_minor_column() {
        let frame = Frame::new(None, vec![], vec![]).unwrap();
        assert_eq!(
            Panel::unstack_minor(frame),
            Err(TableError::MissingColumn("minor".into()))
        );
    }
}
