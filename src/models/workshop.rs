use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::row::{self, RemoteRow};
use crate::services::dates;

/// Normalized workshop registration, one per form id after grouping. Rows
/// sharing a form id are collapsed into a single record with the ticket
/// count incremented per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopRecord {
    pub formid: i64,
    pub workshop_name: Option<String>,
    pub status: Option<String>,
    pub eventdate: Option<String>,
    pub resolved_url: Option<String>,
    pub tickets: u32,
}

impl WorkshopRecord {
    /// Builds a single-ticket record from a raw row; `None` when the row has
    /// no usable form id.
    pub fn from_row(row: &RemoteRow) -> Option<Self> {
        Some(Self {
            formid: row::int_field(row, "formid")?,
            workshop_name: row::string_field(row, "workshop_name"),
            status: row::string_field(row, "status"),
            eventdate: row::string_field(row, "eventdate"),
            resolved_url: row::string_field(row, "resolved_url"),
            tickets: 1,
        })
    }

    /// Short status line for a dashboard row: "Pre-reg", the formatted event
    /// date for completed registrations, or "Waitlisted".
    pub fn status_label(&self) -> Option<String> {
        match self.status.as_deref() {
            Some("pre-registered") => Some("Pre-reg".to_string()),
            Some("completed") => self
                .eventdate
                .as_deref()
                .map(dates::format_event_date),
            Some("waitlisted") => Some("Waitlisted".to_string()),
            _ => None,
        }
    }
}

/// Collapses per-ticket rows into one record per form id. The first row seen
/// for a form id supplies the record's fields; later rows only add tickets.
/// Output is ordered by ascending form id.
pub fn group_by_form(records: impl IntoIterator<Item = WorkshopRecord>) -> Vec<WorkshopRecord> {
    let mut grouped: BTreeMap<i64, WorkshopRecord> = BTreeMap::new();
    for record in records {
        match grouped.entry(record.formid) {
            Entry::Occupied(mut existing) => existing.get_mut().tickets += record.tickets,
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }
    grouped.into_values().collect()
}
