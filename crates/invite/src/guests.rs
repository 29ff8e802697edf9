//! Guest list loading

use crate::{InviteError, ResourceKind, Result};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Header of the column holding guest names
pub const NAME_COLUMN: &str = "name";

/// One row of the guest list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestRecord {
    /// Data row number (1-based, header excluded)
    pub row: usize,
    pub name: String,
}

/// Guests read from a CSV file with a header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestList {
    records: Vec<GuestRecord>,
}

impl GuestList {
    /// Load a guest list from a UTF-8 CSV file
    ///
    /// Unreadable or malformed files are reported as resource errors; a
    /// missing `name` column or an empty list fails the precondition.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| InviteError::resource(ResourceKind::GuestList, path, e))?;

        let list = Self::from_reader(file).map_err(|e| match e {
            InviteError::Csv(csv_err) => {
                InviteError::resource(ResourceKind::GuestList, path, csv_err)
            }
            other => other,
        })?;

        debug!("Loaded {} guests from {}", list.len(), path.display());
        Ok(list)
    }

    /// Read a guest list from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let name_index = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == NAME_COLUMN)
            .ok_or_else(|| {
                let found: Vec<&str> = headers.iter().collect();
                InviteError::PreconditionFailed(format!(
                    "guest list has no '{NAME_COLUMN}' column (found: {})",
                    found.join(", ")
                ))
            })?;

        let mut records = Vec::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            let name = record.get(name_index).unwrap_or_default().trim().to_string();
            records.push(GuestRecord { row: i + 1, name });
        }

        if records.is_empty() {
            return Err(InviteError::PreconditionFailed(
                "guest list is empty".to_string(),
            ));
        }

        Ok(Self { records })
    }

    /// Build a list from names directly; rows are numbered from 1
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| GuestRecord {
                row: i + 1,
                name: name.into(),
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[GuestRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GuestRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of rows whose name is blank
    pub fn blank_count(&self) -> usize {
        self.records.iter().filter(|r| r.name.is_empty()).count()
    }
}

impl<'a> IntoIterator for &'a GuestList {
    type Item = &'a GuestRecord;
    type IntoIter = std::slice::Iter<'a, GuestRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
