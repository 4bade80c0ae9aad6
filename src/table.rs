use std::io::Write;

use crate::error::Result;
use crate::points::AttributeValue;

/// Column header for a run: coordinate columns, then the point source's
/// attribute keys in declaration order, then the caller's band names.
pub fn header(attribute_keys: &[String], band_names: &[String]) -> Vec<String> {
    let mut columns = Vec::with_capacity(2 + attribute_keys.len() + band_names.len());
    columns.push("long".to_string());
    columns.push("lat".to_string());
    columns.extend(attribute_keys.iter().cloned());
    columns.extend(band_names.iter().cloned());
    columns
}

/// One output row: [x, y] ++ attribute values ++ band values. Band values
/// become Real cells; attribute values keep their native type.
pub fn assemble(
    x: f64,
    y: f64,
    attributes: Vec<AttributeValue>,
    bands: &[f64],
) -> Vec<AttributeValue> {
    let mut row = Vec::with_capacity(2 + attributes.len() + bands.len());
    row.push(AttributeValue::Real(x));
    row.push(AttributeValue::Real(y));
    row.extend(attributes);
    row.extend(bands.iter().map(|&v| AttributeValue::Real(v)));
    row
}

/// The assembled output: a frozen column schema and rows in point
/// iteration order. Rows are immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    columns: Vec<String>,
    rows: Vec<Vec<AttributeValue>>,
}

impl SampleTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Table for a run that saw no features: no schema, no rows.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<AttributeValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<AttributeValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Stream the table as CSV: header row, then one record per row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
