use serde_json::{Map, Value};

/// A row as returned by the data endpoint: an untyped JSON object that may be
/// a membership record or a workshop/ticket record, disambiguated only by
/// which fields carry values.
pub type RemoteRow = Map<String, Value>;

/// Workshop-specific fields. A membership row must carry none of these.
const WORKSHOP_FIELDS: [&str; 6] = [
    "workshop_name",
    "formid",
    "eventdate",
    "webpage_url",
    "start_time",
    "end_time",
];

/// A field counts as present only when it exists and is not JSON null.
pub fn field<'a>(row: &'a RemoteRow, name: &str) -> Option<&'a Value> {
    row.get(name).filter(|value| !value.is_null())
}

/// A membership row has a member identifier and no workshop data at all.
/// Rows matching neither kind are silently dropped by both fetchers.
pub fn is_membership_row(row: &RemoteRow) -> bool {
    field(row, "memberid").is_some()
        && WORKSHOP_FIELDS
            .iter()
            .all(|&name| field(row, name).is_none())
}

pub fn is_workshop_row(row: &RemoteRow) -> bool {
    field(row, "formid").is_some()
}

/// String projection of a loosely-typed field; numbers are rendered as text
/// since the backend emits identifiers both ways.
pub fn string_field(row: &RemoteRow, name: &str) -> Option<String> {
    match field(row, name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn int_field(row: &RemoteRow, name: &str) -> Option<i64> {
    match field(row, name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Boolean projection with numeric truthiness: numbers are true when
/// non-zero, strings when they parse to a non-zero number. Non-numeric
/// strings are false, absent/null stays `None`.
pub fn flag_field(row: &RemoteRow, name: &str) -> Option<bool> {
    match field(row, name)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Some(s.trim().parse::<f64>().is_ok_and(|f| f != 0.0)),
        _ => Some(false),
    }
}
