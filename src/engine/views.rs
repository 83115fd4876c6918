//! Derived views over the state aggregate.
//!
//! Pure query functions, recomputed from the collections plus the active
//! session on every read. Nothing here mutates or caches; with a single
//! synchronous writer they are always consistent with the last committed
//! mutation.

use crate::models::{
    parse_stamp, LoanRequest, Notification, PendingTransfer, Record, User,
};
use crate::engine::AppData;
use std::collections::HashSet;
use time::PrimitiveDateTime;

/// The record list as the viewer sees it: guests are narrowed to their own
/// service, then the search term and service filter apply, then the list is
/// ordered pending-returns first, loans next, closed records last, newest
/// loan date first within each group.
pub fn filtered_records<'a>(
    data: &'a AppData,
    viewer: &User,
    search: &str,
    service_filter: Option<&str>,
) -> Vec<&'a Record> {
    let own_service = viewer.guest_service().map(str::to_lowercase);
    let search = search.to_lowercase();

    let mut records: Vec<&Record> = data
        .records
        .iter()
        .filter(|record| match &own_service {
            Some(service) => record.destination_service.to_lowercase() == *service,
            None => true,
        })
        .filter(|record| match service_filter {
            Some(service) => record.destination_service == service,
            None => true,
        })
        .filter(|record| {
            search.is_empty()
                || record.hc_number.to_lowercase().contains(&search)
                || record.destination_service.to_lowercase().contains(&search)
                || record.responsible.to_lowercase().contains(&search)
                || record.status.to_string().to_lowercase().contains(&search)
        })
        .collect();

    records.sort_by(|a, b| {
        a.status
            .sort_rank()
            .cmp(&b.status.sort_rank())
            .then_with(|| parsed_date(b).cmp(&parsed_date(a)))
    });
    records
}

/// Requests the viewer may see: administrators see all of them, guests only
/// the ones addressed to their own service. Newest first.
pub fn visible_requests<'a>(data: &'a AppData, viewer: &User) -> Vec<&'a LoanRequest> {
    let mut requests: Vec<&LoanRequest> = if viewer.is_admin() {
        data.requests.iter().collect()
    } else if let Some(service) = viewer.guest_service() {
        let service = service.to_lowercase();
        data.requests
            .iter()
            .filter(|request| request.destination_service.to_lowercase() == service)
            .collect()
    } else {
        Vec::new()
    };
    requests.sort_by_key(|request| std::cmp::Reverse(request.request_timestamp));
    requests
}

/// Transfers waiting for the viewer's service to accept or reject them.
/// Empty for administrators. Newest first.
pub fn incoming_transfers<'a>(data: &'a AppData, viewer: &User) -> Vec<&'a PendingTransfer> {
    let mut transfers: Vec<&PendingTransfer> = match viewer.guest_service() {
        Some(service) => data
            .transfers
            .iter()
            .filter(|transfer| transfer.to_service == service)
            .collect(),
        None => Vec::new(),
    };
    transfers.sort_by_key(|transfer| std::cmp::Reverse(transfer.request_timestamp));
    transfers
}

/// Ids of records with an outstanding transfer, used to flag them in the
/// list instead of offering a second transfer.
pub fn transfer_pending_ids(data: &AppData) -> HashSet<i64> {
    data.transfers.iter().map(|t| t.record_id).collect()
}

/// The user's notifications, newest first.
pub fn notifications_for<'a>(data: &'a AppData, username: &str) -> Vec<&'a Notification> {
    let mut notifications: Vec<&Notification> = data
        .notifications
        .iter()
        .filter(|n| n.user_id == username)
        .collect();
    notifications.sort_by_key(|n| std::cmp::Reverse(n.timestamp));
    notifications
}

/// Number of unread notifications for the badge in the header.
pub fn unread_count(data: &AppData, username: &str) -> usize {
    data.notifications
        .iter()
        .filter(|n| n.user_id == username && !n.is_read)
        .count()
}

/// Distinct destination services present in the records, for the service
/// filter dropdown.
pub fn unique_services(data: &AppData) -> Vec<String> {
    let mut services: Vec<String> = data
        .records
        .iter()
        .map(|r| r.destination_service.clone())
        .filter(|s| !s.is_empty())
        .collect();
    services.sort();
    services.dedup();
    services
}

/// Distinct services of guest accounts, the candidate destinations for a
/// transfer.
pub fn guest_services(data: &AppData) -> Vec<String> {
    let mut services: Vec<String> = data
        .users
        .iter()
        .filter_map(|u| u.guest_service())
        .map(str::to_string)
        .collect();
    services.sort();
    services.dedup();
    services
}

/// Every loan cycle of one folder, for the movement-history view.
pub fn history_for<'a>(data: &'a AppData, hc_number: &str) -> Vec<&'a Record> {
    data.records
        .iter()
        .filter(|r| r.hc_number == hc_number)
        .collect()
}

fn parsed_date(record: &Record) -> PrimitiveDateTime {
    parse_stamp(&record.request_date).unwrap_or(PrimitiveDateTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationKind, RecordStatus, Role};

    fn record(id: i64, hc: &str, service: &str, status: RecordStatus, date: &str) -> Record {
        Record {
            id,
            hc_number: hc.into(),
            destination_service: service.into(),
            responsible: "Dr. Rojas".into(),
            responsible_phone_number: "987654321".into(),
            request_date: date.into(),
            status,
            return_date: None,
            receiving_staff_name: None,
        }
    }

    fn user(name: &str, role: Role, service: Option<&str>) -> User {
        User {
            username: name.into(),
            password: "x".into(),
            role,
            service: service.map(str::to_string),
        }
    }

    fn sample_data() -> AppData {
        AppData {
            users: vec![
                user("admin", Role::Admin, None),
                user("maria", Role::Guest, Some("Pediatría")),
                user("lucia", Role::Guest, Some("Medicina")),
            ],
            records: vec![
                record(1, "111", "Pediatría", RecordStatus::Returned, "2024-03-01T08:00"),
                record(2, "222", "Medicina", RecordStatus::Loaned, "2024-03-02T08:00"),
                record(3, "333", "Pediatría", RecordStatus::Loaned, "2024-03-03T08:00"),
                record(4, "444", "Pediatría", RecordStatus::PendingReturn, "2024-03-01T09:00"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn records_are_grouped_by_status_then_newest_first() {
        let data = sample_data();
        let admin = user("admin", Role::Admin, None);
        let visible = filtered_records(&data, &admin, "", None);
        let ids: Vec<i64> = visible.iter().map(|r| r.id).collect();
        // PendingReturn first, then the loans newest-first, then the closed
        // record.
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn guests_only_see_their_own_service() {
        let data = sample_data();
        let maria = user("maria", Role::Guest, Some("Pediatría"));
        let visible = filtered_records(&data, &maria, "", None);
        assert!(visible
            .iter()
            .all(|r| r.destination_service == "Pediatría"));
        assert_eq!(visible.len(), 3);
    }

    #[test]
    fn search_matches_number_service_responsible_and_status() {
        let data = sample_data();
        let admin = user("admin", Role::Admin, None);
        assert_eq!(filtered_records(&data, &admin, "222", None).len(), 1);
        assert_eq!(filtered_records(&data, &admin, "medicina", None).len(), 1);
        assert_eq!(filtered_records(&data, &admin, "rojas", None).len(), 4);
        assert_eq!(
            filtered_records(&data, &admin, "pendiente de devolución", None).len(),
            1
        );
        assert!(filtered_records(&data, &admin, "nada", None).is_empty());
    }

    #[test]
    fn service_filter_is_exact() {
        let data = sample_data();
        let admin = user("admin", Role::Admin, None);
        let visible = filtered_records(&data, &admin, "", Some("Medicina"));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, 2);
    }

    #[test]
    fn request_visibility_follows_the_role() {
        let mut data = sample_data();
        data.requests = vec![
            LoanRequest {
                id: 1,
                hc_numbers: "555".into(),
                destination_service: "Pediatría".into(),
                requester_name: "maria".into(),
                request_timestamp: 10,
            },
            LoanRequest {
                id: 2,
                hc_numbers: "666".into(),
                destination_service: "Medicina".into(),
                requester_name: "lucia".into(),
                request_timestamp: 20,
            },
        ];

        let admin = user("admin", Role::Admin, None);
        let all: Vec<i64> = visible_requests(&data, &admin).iter().map(|r| r.id).collect();
        assert_eq!(all, vec![2, 1]);

        let maria = user("maria", Role::Guest, Some("Pediatría"));
        let own: Vec<i64> = visible_requests(&data, &maria).iter().map(|r| r.id).collect();
        assert_eq!(own, vec![1]);
    }

    #[test]
    fn incoming_transfers_target_the_viewer_service() {
        let mut data = sample_data();
        data.transfers = vec![PendingTransfer {
            id: 9,
            record_id: 3,
            hc_number: "333".into(),
            from_service: "Pediatría".into(),
            to_service: "Medicina".into(),
            requester_name: "maria".into(),
            request_timestamp: 5,
        }];

        let lucia = user("lucia", Role::Guest, Some("Medicina"));
        assert_eq!(incoming_transfers(&data, &lucia).len(), 1);

        let maria = user("maria", Role::Guest, Some("Pediatría"));
        assert!(incoming_transfers(&data, &maria).is_empty());

        let admin = user("admin", Role::Admin, None);
        assert!(incoming_transfers(&data, &admin).is_empty());

        assert!(transfer_pending_ids(&data).contains(&3));
    }

    #[test]
    fn notification_views_are_per_user() {
        let mut data = sample_data();
        data.notifications = vec![
            Notification {
                id: 1,
                user_id: "maria".into(),
                message: "a".into(),
                timestamp: 10,
                is_read: false,
                kind: NotificationKind::Rejection,
            },
            Notification {
                id: 2,
                user_id: "maria".into(),
                message: "b".into(),
                timestamp: 20,
                is_read: true,
                kind: NotificationKind::Approval,
            },
            Notification {
                id: 3,
                user_id: "lucia".into(),
                message: "c".into(),
                timestamp: 30,
                is_read: false,
                kind: NotificationKind::Approval,
            },
        ];

        let own: Vec<i64> = notifications_for(&data, "maria").iter().map(|n| n.id).collect();
        assert_eq!(own, vec![2, 1]);
        assert_eq!(unread_count(&data, "maria"), 1);
        assert_eq!(unread_count(&data, "lucia"), 1);
        assert_eq!(unread_count(&data, "admin"), 0);
    }

    #[test]
    fn service_lists_are_sorted_and_distinct() {
        let data = sample_data();
        assert_eq!(unique_services(&data), vec!["Medicina", "Pediatría"]);
        assert_eq!(guest_services(&data), vec!["Medicina", "Pediatría"]);
    }

    #[test]
    fn history_collects_every_cycle_of_a_folder() {
        let mut data = sample_data();
        data.records.push(record(
            5,
            "111",
            "Medicina",
            RecordStatus::Loaned,
            "2024-03-04T08:00",
        ));
        let history = history_for(&data, "111");
        assert_eq!(history.len(), 2);
    }
}
