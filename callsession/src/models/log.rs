use lazy_static::lazy_static;
use tokio_sqlite::Value;

use super::{ColumnIndex, value_as_i64, value_as_string, value_as_string_opt};

/// One persisted call-history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallLogEntry {
    pub id: i64,
    pub phone_number: String,
    pub display_name: Option<String>,
    // "Missed", "Incoming", "Outgoing" or "Unknown".
    pub direction: String,
    // Call creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub duration_seconds: i64,
    pub note: Option<String>,
    pub tag: Option<String>,
}

impl CallLogEntry {
    pub fn columns() -> &'static ColumnIndex {
        lazy_static! {
            static ref COLUMNS: ColumnIndex = ColumnIndex::new([
                "id",
                "phone_number",
                "display_name",
                "direction",
                "timestamp",
                "duration_seconds",
                "note",
                "tag",
            ]);
        }
        &COLUMNS
    }

    pub fn values(&self, columns: &ColumnIndex) -> Vec<Value> {
        let mut values = columns.new_values();
        columns.set_value(&mut values, "id", self.id);
        columns.set_value(&mut values, "phone_number", self.phone_number.clone());
        columns.set_value(&mut values, "display_name", self.display_name.clone());
        columns.set_value(&mut values, "direction", self.direction.clone());
        columns.set_value(&mut values, "timestamp", self.timestamp);
        columns.set_value(&mut values, "duration_seconds", self.duration_seconds);
        columns.set_value(&mut values, "note", self.note.clone());
        columns.set_value(&mut values, "tag", self.tag.clone());
        values
    }

    pub fn from_values(values: Vec<Value>, columns: &ColumnIndex) -> Result<Self, anyhow::Error> {
        Ok(Self {
            id: value_as_i64(columns.get_value(&values, "id")?)?,
            phone_number: value_as_string(columns.get_value(&values, "phone_number")?)?,
            display_name: value_as_string_opt(columns.get_value(&values, "display_name")?)?,
            direction: value_as_string(columns.get_value(&values, "direction")?)?,
            timestamp: value_as_i64(columns.get_value(&values, "timestamp")?)?,
            duration_seconds: value_as_i64(columns.get_value(&values, "duration_seconds")?)?,
            note: value_as_string_opt(columns.get_value(&values, "note")?)?,
            tag: value_as_string_opt(columns.get_value(&values, "tag")?)?,
        })
    }
}
