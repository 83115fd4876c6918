//! Data models for the clinical-history loan registry.
//!
//! The serialized field names and enum strings match the snapshots the
//! original hospital deployment wrote to its storage slots, so an existing
//! data file keeps loading: camelCase keys, Spanish status values.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Username of the built-in administrator account. Seeded on first run and
/// protected from deletion.
pub const DEFAULT_ADMIN: &str = "admin";

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Full control: registers loans, curates records, users and requests.
    #[serde(rename = "admin")]
    Admin,
    /// Service-bound account: submits requests, returns and transfers
    /// records of its own service.
    #[serde(rename = "invitado")]
    Guest,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Guest => write!(f, "invitado"),
        }
    }
}

/// A user account. Passwords are stored and compared as plain strings; the
/// login check is advisory record-keeping, not a security boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password: String,
    pub role: Role,
    /// Assigned service. Present iff the role is `Guest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The guest's service, if this account is a guest with one assigned.
    pub fn guest_service(&self) -> Option<&str> {
        match self.role {
            Role::Guest => self.service.as_deref(),
            Role::Admin => None,
        }
    }
}

/// Lifecycle state of a loan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "Prestado")]
    Loaned,
    #[serde(rename = "Devuelto")]
    Returned,
    #[serde(rename = "Pendiente de Devolución")]
    PendingReturn,
    #[serde(rename = "Transferido")]
    Transferred,
}

impl RecordStatus {
    /// Display order used by the record list: pending returns first, then
    /// active loans, then closed records.
    pub fn sort_rank(self) -> u8 {
        match self {
            RecordStatus::PendingReturn => 1,
            RecordStatus::Loaned => 2,
            RecordStatus::Returned => 3,
            RecordStatus::Transferred => 4,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RecordStatus::Loaned => "Prestado",
            RecordStatus::Returned => "Devuelto",
            RecordStatus::PendingReturn => "Pendiente de Devolución",
            RecordStatus::Transferred => "Transferido",
        };
        write!(f, "{label}")
    }
}

/// One loan cycle of a physical clinical-history folder.
///
/// The same hcNumber reappears across records as the folder is loaned,
/// returned and loaned again; only the active states (`Loaned`,
/// `PendingReturn`) are uniqueness-constrained per hcNumber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub hc_number: String,
    pub destination_service: String,
    pub responsible: String,
    pub responsible_phone_number: String,
    /// Loan timestamp, `YYYY-MM-DDTHH:mm` in local time.
    pub request_date: String,
    pub status: RecordStatus,
    pub return_date: Option<String>,
    pub receiving_staff_name: Option<String>,
}

impl Record {
    /// Whether this record currently holds the physical folder out of the
    /// archive (loaned or waiting for its return to be confirmed).
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            RecordStatus::Loaned | RecordStatus::PendingReturn
        )
    }
}

/// Free-text clinical details attached to an hcNumber, independent of any
/// loan cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalDetails {
    #[serde(default)]
    pub antecedents: String,
    #[serde(default)]
    pub notes: String,
}

/// A guest's loan request, pending admin approval or rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequest {
    pub id: i64,
    /// Comma-joined hcNumber list.
    pub hc_numbers: String,
    pub destination_service: String,
    pub requester_name: String,
    /// Unix milliseconds.
    pub request_timestamp: i64,
}

impl LoanRequest {
    /// The individual hcNumbers contained in this request.
    pub fn hc_list(&self) -> Vec<&str> {
        split_hc_numbers(&self.hc_numbers)
    }
}

/// A transfer of custody awaiting acceptance by the destination service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransfer {
    pub id: i64,
    pub record_id: i64,
    pub hc_number: String,
    pub from_service: String,
    pub to_service: String,
    pub requester_name: String,
    pub request_timestamp: i64,
}

/// Visual/semantic category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "rejection")]
    Rejection,
    #[serde(rename = "approval")]
    Approval,
}

/// A message addressed to one user, produced as a side effect of resolving
/// requests, returns and transfers. Never created directly by the actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    /// Target username.
    pub user_id: String,
    pub message: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub is_read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

const STAMP: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

/// Parses a `YYYY-MM-DDTHH:mm` stamp. Returns `None` for anything else,
/// including the empty string.
pub fn parse_stamp(value: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(value, STAMP).ok()
}

/// Current local time as a `YYYY-MM-DDTHH:mm` stamp. Falls back to UTC when
/// the local offset cannot be determined.
pub fn now_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
        .format(STAMP)
        .unwrap_or_default()
}

/// Current time in unix milliseconds.
pub fn unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Splits a comma-separated hcNumber field into trimmed, non-empty entries.
/// Duplicates are preserved; callers dedupe where their operation demands it.
pub fn split_hc_numbers(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|hc| !hc.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_trims_and_drops_empty_entries() {
        assert_eq!(
            split_hc_numbers(" 111, 222 ,,333 "),
            vec!["111", "222", "333"]
        );
        assert!(split_hc_numbers("  ,  ").is_empty());
    }

    #[test]
    fn stamp_round_trip() {
        let parsed = parse_stamp("2024-03-05T09:30").expect("valid stamp");
        assert_eq!(parsed.format(STAMP).unwrap(), "2024-03-05T09:30");
        assert!(parse_stamp("05/03/2024").is_none());
        assert!(parse_stamp("").is_none());
    }

    #[test]
    fn status_serializes_to_original_strings() {
        let json = serde_json::to_string(&RecordStatus::PendingReturn).unwrap();
        assert_eq!(json, "\"Pendiente de Devolución\"");
        let back: RecordStatus = serde_json::from_str("\"Prestado\"").unwrap();
        assert_eq!(back, RecordStatus::Loaned);
    }

    #[test]
    fn record_wire_format_uses_camel_case() {
        let record = Record {
            id: 1,
            hc_number: "12345".into(),
            destination_service: "Pediatría".into(),
            responsible: "Ana".into(),
            responsible_phone_number: "987654321".into(),
            request_date: "2024-03-05T09:30".into(),
            status: RecordStatus::Loaned,
            return_date: None,
            receiving_staff_name: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("hcNumber").is_some());
        assert!(json.get("destinationService").is_some());
        assert!(json.get("receivingStaffName").is_some());
    }

    #[test]
    fn active_records_are_loaned_or_pending_return() {
        let mut record = Record {
            id: 1,
            hc_number: "1".into(),
            destination_service: "Medicina".into(),
            responsible: "x".into(),
            responsible_phone_number: "x".into(),
            request_date: "2024-01-01T00:00".into(),
            status: RecordStatus::Loaned,
            return_date: None,
            receiving_staff_name: None,
        };
        assert!(record.is_active());
        record.status = RecordStatus::PendingReturn;
        assert!(record.is_active());
        record.status = RecordStatus::Returned;
        assert!(!record.is_active());
        record.status = RecordStatus::Transferred;
        assert!(!record.is_active());
    }
}
