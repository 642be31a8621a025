use serde::{Deserialize, Serialize};

use crate::models::row::{self, RemoteRow};

/// Normalized membership projection shown on the dashboard card. Every field
/// is nullable; missing values stay missing rather than defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub memberstatus: Option<String>,
    pub expirationdate: Option<String>,
    pub autorenew: Option<bool>,
    pub levelname: Option<String>,
    pub memberid: Option<String>,
}

impl MembershipRecord {
    pub fn from_row(row: &RemoteRow) -> Self {
        Self {
            memberstatus: row::string_field(row, "memberstatus"),
            expirationdate: row::string_field(row, "expirationdate"),
            autorenew: row::flag_field(row, "autorenew"),
            levelname: row::string_field(row, "levelname"),
            memberid: row::string_field(row, "memberid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_all_fields_and_defaults_missing_to_none() {
        let row = json!({
            "memberid": "M-100",
            "memberstatus": "Active",
            "expirationdate": "2026-01-03",
            "autorenew": 1,
            "levelname": "Ranch Hand",
        });
        let record = MembershipRecord::from_row(row.as_object().unwrap());
        assert_eq!(record.memberid.as_deref(), Some("M-100"));
        assert_eq!(record.memberstatus.as_deref(), Some("Active"));
        assert_eq!(record.expirationdate.as_deref(), Some("2026-01-03"));
        assert_eq!(record.autorenew, Some(true));
        assert_eq!(record.levelname.as_deref(), Some("Ranch Hand"));

        let empty = MembershipRecord::from_row(json!({}).as_object().unwrap());
        assert_eq!(
            empty,
            MembershipRecord {
                memberstatus: None,
                expirationdate: None,
                autorenew: None,
                levelname: None,
                memberid: None,
            }
        );
    }

    #[test]
    fn numeric_member_ids_become_strings() {
        let row = json!({ "memberid": 4711, "autorenew": "0" });
        let record = MembershipRecord::from_row(row.as_object().unwrap());
        assert_eq!(record.memberid.as_deref(), Some("4711"));
        assert_eq!(record.autorenew, Some(false));
    }
}
