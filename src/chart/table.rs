//! Chart table wire format
//!
//! Serialized as an array of arrays: `["x", name_1, ..]` followed by one
//! `[x, f_1, ..]` row per point.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::Result;

/// One data row: an action count and one fraction per series.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRow {
    x: u64,
    values: Vec<f64>,
}

impl GraphRow {
    pub(crate) const fn new(x: u64, values: Vec<f64>) -> Self {
        Self { x, values }
    }

    /// Action count.
    #[must_use]
    pub const fn x(&self) -> u64 {
        self.x
    }

    /// Fraction of each series with at least `x` actions, in header order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Reverse-cumulative chart series, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>")]
pub struct GraphTable {
    names: Vec<String>,
    rows: Vec<GraphRow>,
}

impl GraphTable {
    pub(crate) const fn new(names: Vec<String>, rows: Vec<GraphRow>) -> Self {
        Self { names, rows }
    }

    /// Series names, in column order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Data rows, ascending by `x`.
    #[must_use]
    pub fn rows(&self) -> &[GraphRow] {
        &self.rows
    }

    /// Number of data rows (the header is not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one series as `(x, fraction)` pairs.
    #[must_use]
    pub fn series(&self, name: &str) -> Option<Vec<(u64, f64)>> {
        let column = self.names.iter().position(|n| n == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| (row.x, row.values[column]))
                .collect(),
        )
    }

    /// Serialize to the array-of-arrays JSON form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if a value cannot be encoded
    /// (non-finite floats serialize as `null` and do not fail).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

struct Header<'a>(&'a [String]);

impl Serialize for Header<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len() + 1))?;
        seq.serialize_element("x")?;
        for name in self.0 {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl Serialize for GraphRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len() + 1))?;
        seq.serialize_element(&self.x)?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for GraphTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len() + 1))?;
        seq.serialize_element(&Header(&self.names))?;
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Int(u64),
    Float(f64),
    Text(String),
}

impl TryFrom<Vec<Vec<Cell>>> for GraphTable {
    type Error = String;

    fn try_from(raw: Vec<Vec<Cell>>) -> std::result::Result<Self, Self::Error> {
        let mut raw = raw.into_iter();
        let header = raw.next().ok_or("graph table has no header row")?;
        let mut header = header.into_iter();
        match header.next() {
            Some(Cell::Text(label)) if label == "x" => {}
            _ => return Err("header row must start with \"x\"".to_string()),
        }
        let names = header
            .map(|cell| match cell {
                Cell::Text(name) => Ok(name),
                _ => Err("series names must be strings".to_string()),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let rows = raw
            .enumerate()
            .map(|(i, row)| {
                if row.len() != names.len() + 1 {
                    return Err(format!(
                        "row {} has {} cells, expected {}",
                        i + 1,
                        row.len(),
                        names.len() + 1
                    ));
                }
                let mut cells = row.into_iter();
                let x = match cells.next() {
                    Some(Cell::Int(x)) => x,
                    _ => return Err(format!("row {} must start with an integer x", i + 1)),
                };
                let values = cells
                    .map(|cell| match cell {
                        Cell::Float(v) => Ok(v),
                        #[allow(clippy::cast_precision_loss)]
                        Cell::Int(v) => Ok(v as f64),
                        Cell::Text(_) => Err(format!("row {} holds a non-numeric value", i + 1)),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(GraphRow::new(x, values))
            })
            .collect::<std::result::Result<Vec<_>, String>>()?;

        Ok(Self::new(names, rows))
    }
}
