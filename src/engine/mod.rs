//! Workflow engine for the clinical-history loan registry.
//!
//! All state lives in the [`AppData`] aggregate owned by the [`Engine`];
//! there are no ambient singletons. Every operation validates first, then
//! mutates the collections as one synchronous step, then mirrors each
//! touched collection to the persistent store. Validation failure leaves the
//! aggregate untouched. Role checks happen here, at the engine boundary, and
//! come back as [`WorkflowError::PermissionDenied`] instead of silently
//! doing nothing.

use crate::models::{
    now_stamp, parse_stamp, split_hc_numbers, unix_millis, ClinicalDetails, LoanRequest,
    Notification, NotificationKind, PendingTransfer, Record, RecordStatus, Role, User,
    DEFAULT_ADMIN,
};
use crate::store::{
    Store, DETAILS_SLOT, NOTIFICATIONS_SLOT, RECORDS_SLOT, REQUESTS_SLOT, TRANSFERS_SLOT,
    USERS_SLOT,
};
use std::collections::BTreeMap;
use time::PrimitiveDateTime;
use tracing::info;

pub mod error;
pub mod views;

pub use error::WorkflowError;

/// The application-state aggregate: every collection the workflow engine
/// reads and mutates.
#[derive(Debug, Default)]
pub struct AppData {
    pub users: Vec<User>,
    pub records: Vec<Record>,
    pub clinical_details: BTreeMap<String, ClinicalDetails>,
    pub requests: Vec<LoanRequest>,
    pub transfers: Vec<PendingTransfer>,
    pub notifications: Vec<Notification>,
}

/// Allocates ids from the creation timestamp, unix milliseconds, bumped past
/// the last handed-out id so same-millisecond batches never collide.
#[derive(Debug)]
struct IdGen {
    last: i64,
}

impl IdGen {
    fn seeded(data: &AppData) -> Self {
        let highest = data
            .records
            .iter()
            .map(|r| r.id)
            .chain(data.requests.iter().map(|r| r.id))
            .chain(data.transfers.iter().map(|t| t.id))
            .chain(data.notifications.iter().map(|n| n.id))
            .max()
            .unwrap_or(0);
        Self { last: highest }
    }

    fn next(&mut self) -> i64 {
        self.last = unix_millis().max(self.last + 1);
        self.last
    }
}

/// Input of the admin loan-registration form.
#[derive(Debug, Clone, Default)]
pub struct LoanForm {
    /// Comma-separated hcNumber list (a single number on the edit path).
    pub hc_numbers: String,
    pub destination_service: String,
    pub responsible: String,
    pub responsible_phone_number: String,
    /// `YYYY-MM-DDTHH:mm` loan timestamp.
    pub request_date: String,
}

/// Result of a request submission: what got requested and what was excluded.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub request_id: i64,
    /// The available hcNumbers the request was created with.
    pub requested: Vec<String>,
    pub excluded_loaned: Vec<String>,
    pub excluded_pending: Vec<String>,
}

impl SubmitOutcome {
    /// Informational message naming the excluded folders, if any were.
    pub fn info_message(&self) -> Option<String> {
        if self.excluded_loaned.is_empty() && self.excluded_pending.is_empty() {
            return None;
        }
        Some(error::unavailable_message(
            &self.excluded_loaned,
            &self.excluded_pending,
        ))
    }

    pub fn success_message(&self) -> String {
        if self.excluded_loaned.is_empty() && self.excluded_pending.is_empty() {
            "Solicitud enviada para aprobación.".to_string()
        } else {
            format!(
                "Solicitud enviada para las H.C. disponibles: {}.",
                self.requested.join(", ")
            )
        }
    }
}

/// The workflow engine: owns the state aggregate and the persistent store,
/// and applies every user intent as one atomic step.
pub struct Engine {
    data: AppData,
    store: Store,
    ids: IdGen,
}

impl Engine {
    /// Loads every collection from the store (missing or corrupt slots start
    /// empty, users seed the default administrator) and builds the engine.
    pub fn new(store: Store) -> Self {
        let data = AppData {
            users: store.load_users(),
            records: store.load_collection(RECORDS_SLOT),
            clinical_details: store.load_collection(DETAILS_SLOT),
            requests: store.load_collection(REQUESTS_SLOT),
            transfers: store.load_collection(TRANSFERS_SLOT),
            notifications: store.load_collection(NOTIFICATIONS_SLOT),
        };
        let ids = IdGen::seeded(&data);
        Self { data, store, ids }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    /// Registers a direct loan (create path) or updates a single existing
    /// record (edit path). Returns the ids of the touched records.
    ///
    /// The hcNumber list is deliberately not deduplicated on the create
    /// path: duplicate entries produce duplicate records.
    pub fn register_loan(
        &mut self,
        actor: &User,
        form: &LoanForm,
        editing_id: Option<i64>,
    ) -> Result<Vec<i64>, WorkflowError> {
        require_admin(actor)?;

        let destination_service = form.destination_service.trim();
        let responsible = form.responsible.trim();
        let phone = form.responsible_phone_number.trim();
        let request_date = form.request_date.trim();
        if destination_service.is_empty()
            || responsible.is_empty()
            || phone.is_empty()
            || request_date.is_empty()
        {
            return Err(WorkflowError::validation(
                "Por favor, complete todos los campos.",
            ));
        }

        let hc_numbers = split_hc_numbers(&form.hc_numbers);
        if hc_numbers.is_empty() {
            return Err(WorkflowError::validation(
                "Por favor, ingrese al menos un número de historia clínica.",
            ));
        }

        let conflicting = dedup(
            hc_numbers
                .iter()
                .filter(|hc| active_record(&self.data.records, hc, editing_id).is_some())
                .map(|hc| hc.to_string()),
        );
        if !conflicting.is_empty() {
            return Err(WorkflowError::already_loaned(conflicting));
        }

        match editing_id {
            Some(id) => {
                if hc_numbers.len() != 1 {
                    return Err(WorkflowError::validation(
                        "La edición admite un solo número de historia clínica.",
                    ));
                }
                let record = self
                    .data
                    .records
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| WorkflowError::not_found("El registro ya no existe."))?;
                record.hc_number = hc_numbers[0].to_string();
                record.destination_service = destination_service.to_string();
                record.responsible = responsible.to_string();
                record.responsible_phone_number = phone.to_string();
                record.request_date = request_date.to_string();
                self.store.mirror(RECORDS_SLOT, &self.data.records);
                Ok(vec![id])
            }
            None => {
                let mut created = Vec::with_capacity(hc_numbers.len());
                for hc in hc_numbers {
                    let id = self.ids.next();
                    self.data.records.push(Record {
                        id,
                        hc_number: hc.to_string(),
                        destination_service: destination_service.to_string(),
                        responsible: responsible.to_string(),
                        responsible_phone_number: phone.to_string(),
                        request_date: request_date.to_string(),
                        status: RecordStatus::Loaned,
                        return_date: None,
                        receiving_staff_name: None,
                    });
                    created.push(id);
                }
                self.store.mirror(RECORDS_SLOT, &self.data.records);
                Ok(created)
            }
        }
    }

    /// Submits a loan request on behalf of the actor. The input list is
    /// deduplicated, then partitioned into available and unavailable
    /// folders; a request is created for the available subset only. When
    /// nothing is available the submission fails and nothing is created.
    pub fn submit_request(
        &mut self,
        actor: &User,
        hc_numbers: &str,
        destination_service: &str,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let destination_service = destination_service.trim();
        if destination_service.is_empty() {
            return Err(WorkflowError::validation(
                "Por favor, complete todos los campos.",
            ));
        }
        let requested = dedup(split_hc_numbers(hc_numbers).into_iter().map(String::from));
        if requested.is_empty() {
            return Err(WorkflowError::validation(
                "Por favor, ingrese al menos un número de historia clínica.",
            ));
        }

        let loaned: Vec<String> = requested
            .iter()
            .filter(|hc| active_record(&self.data.records, hc, None).is_some())
            .cloned()
            .collect();
        let pending: Vec<String> = requested
            .iter()
            .filter(|hc| {
                self.data
                    .requests
                    .iter()
                    .any(|req| req.hc_list().contains(&hc.as_str()))
            })
            .cloned()
            .collect();
        let available: Vec<String> = requested
            .iter()
            .filter(|hc| !loaned.contains(hc) && !pending.contains(hc))
            .cloned()
            .collect();

        if available.is_empty() {
            return Err(WorkflowError::unavailable(loaned, pending));
        }

        let id = self.ids.next();
        self.data.requests.push(LoanRequest {
            id,
            hc_numbers: available.join(", "),
            destination_service: destination_service.to_string(),
            requester_name: actor.username.clone(),
            request_timestamp: unix_millis(),
        });
        self.store.mirror(REQUESTS_SLOT, &self.data.requests);

        Ok(SubmitOutcome {
            request_id: id,
            requested: available,
            excluded_loaned: loaned,
            excluded_pending: pending,
        })
    }

    /// Approves a pending request: one loaned record per folder, credited to
    /// the requester, and the request is consumed. Self-approval is
    /// forbidden. Folder availability is re-validated because state may have
    /// changed since submission; on conflict the request is kept so the
    /// admin can reject it or wait.
    pub fn approve_request(
        &mut self,
        actor: &User,
        request_id: i64,
    ) -> Result<Vec<i64>, WorkflowError> {
        require_admin(actor)?;
        let request = self
            .data
            .requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found("La solicitud ya no existe."))?;

        if request.requester_name == actor.username {
            return Err(WorkflowError::denied(
                "No puede aprobar sus propias solicitudes.",
            ));
        }

        let hc_numbers: Vec<String> = request.hc_list().iter().map(|hc| hc.to_string()).collect();
        let loaned = dedup(
            hc_numbers
                .iter()
                .filter(|hc| active_record(&self.data.records, hc, None).is_some())
                .cloned(),
        );
        if !loaned.is_empty() {
            return Err(WorkflowError::approval_blocked(loaned));
        }

        let now = now_stamp();
        let mut created = Vec::with_capacity(hc_numbers.len());
        for hc in &hc_numbers {
            let id = self.ids.next();
            self.data.records.push(Record {
                id,
                hc_number: hc.clone(),
                destination_service: request.destination_service.clone(),
                responsible: request.requester_name.clone(),
                responsible_phone_number: "N/A".to_string(),
                request_date: now.clone(),
                status: RecordStatus::Loaned,
                return_date: None,
                receiving_staff_name: None,
            });
            created.push(id);
        }
        sort_by_request_date_desc(&mut self.data.records);
        self.data.requests.retain(|r| r.id != request_id);

        self.store.mirror(RECORDS_SLOT, &self.data.records);
        self.store.mirror(REQUESTS_SLOT, &self.data.requests);
        info!(request_id, count = created.len(), "request approved");
        Ok(created)
    }

    /// Rejects a pending request with a mandatory reason. The requester is
    /// notified and the request is consumed, together.
    pub fn reject_request(
        &mut self,
        actor: &User,
        request_id: i64,
        reason: &str,
    ) -> Result<(), WorkflowError> {
        require_admin(actor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::validation(
                "Por favor, ingrese el motivo del rechazo.",
            ));
        }
        let request = self
            .data
            .requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found("La solicitud ya no existe."))?;

        let id = self.ids.next();
        self.data.notifications.push(Notification {
            id,
            user_id: request.requester_name.clone(),
            message: format!(
                "Su solicitud para H.C. \"{}\" ha sido rechazada. Motivo: {}",
                request.hc_numbers, reason
            ),
            timestamp: unix_millis(),
            is_read: false,
            kind: NotificationKind::Rejection,
        });
        self.data.requests.retain(|r| r.id != request_id);

        self.store.mirror(REQUESTS_SLOT, &self.data.requests);
        self.store
            .mirror(NOTIFICATIONS_SLOT, &self.data.notifications);
        Ok(())
    }

    /// Phase one of the return workflow: the holding service asks for the
    /// folder to be received back. The record goes to `PendingReturn` and
    /// every administrator is notified.
    pub fn request_return(&mut self, actor: &User, record_id: i64) -> Result<(), WorkflowError> {
        let record = self
            .data
            .records
            .iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| WorkflowError::not_found("El registro ya no existe."))?;
        require_service_owner(actor, record)?;
        if record.status != RecordStatus::Loaned {
            return Err(WorkflowError::conflict(
                "La historia clínica no se encuentra en préstamo.",
            ));
        }

        let service = record.destination_service.clone();
        let hc_number = record.hc_number.clone();
        let admins: Vec<String> = self
            .data
            .users
            .iter()
            .filter(|u| u.is_admin())
            .map(|u| u.username.clone())
            .collect();

        if let Some(record) = self.data.records.iter_mut().find(|r| r.id == record_id) {
            record.status = RecordStatus::PendingReturn;
        }
        for admin in admins {
            let id = self.ids.next();
            self.data.notifications.push(Notification {
                id,
                user_id: admin,
                message: format!(
                    "El servicio \"{service}\" ha solicitado la devolución de la H.C. N° \
                     {hc_number}. Por favor, confirme la recepción."
                ),
                timestamp: unix_millis(),
                is_read: false,
                kind: NotificationKind::Approval,
            });
        }

        self.store.mirror(RECORDS_SLOT, &self.data.records);
        self.store
            .mirror(NOTIFICATIONS_SLOT, &self.data.notifications);
        Ok(())
    }

    /// Phase two of the return workflow: the admin confirms reception with a
    /// date and the receiving staff name, both required. Any record can be
    /// received back through this path, not only pending ones.
    pub fn confirm_return(
        &mut self,
        actor: &User,
        record_id: i64,
        return_date: &str,
        receiving_staff: &str,
    ) -> Result<(), WorkflowError> {
        require_admin(actor)?;
        let return_date = return_date.trim();
        let receiving_staff = receiving_staff.trim();
        if return_date.is_empty() || receiving_staff.is_empty() {
            return Err(WorkflowError::validation(
                "Por favor, complete todos los campos.",
            ));
        }
        let record = self
            .data
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| WorkflowError::not_found("El registro ya no existe."))?;

        record.status = RecordStatus::Returned;
        record.return_date = Some(return_date.to_string());
        record.receiving_staff_name = Some(receiving_staff.to_string());

        self.store.mirror(RECORDS_SLOT, &self.data.records);
        Ok(())
    }

    /// Phase one of the transfer workflow: the holding service proposes
    /// moving a loaned folder to another service. The record itself is not
    /// touched; it only becomes "transfer pending" through the derived view.
    pub fn request_transfer(
        &mut self,
        actor: &User,
        record_id: i64,
        to_service: &str,
    ) -> Result<i64, WorkflowError> {
        let record = self
            .data
            .records
            .iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| WorkflowError::not_found("El registro ya no existe."))?;
        require_service_owner(actor, record)?;
        if record.status != RecordStatus::Loaned {
            return Err(WorkflowError::conflict(
                "La historia clínica no se encuentra en préstamo.",
            ));
        }
        let to_service = to_service.trim();
        if to_service.is_empty() {
            return Err(WorkflowError::validation(
                "Seleccione un servicio de destino.",
            ));
        }
        if to_service == record.destination_service {
            return Err(WorkflowError::validation(
                "El servicio de destino debe ser distinto al actual.",
            ));
        }
        if self.data.transfers.iter().any(|t| t.record_id == record_id) {
            return Err(WorkflowError::conflict(
                "Ya existe una transferencia pendiente para este registro.",
            ));
        }

        let id = self.ids.next();
        self.data.transfers.push(PendingTransfer {
            id,
            record_id,
            hc_number: record.hc_number.clone(),
            from_service: record.destination_service.clone(),
            to_service: to_service.to_string(),
            requester_name: actor.username.clone(),
            request_timestamp: unix_millis(),
        });
        self.store.mirror(TRANSFERS_SLOT, &self.data.transfers);
        Ok(id)
    }

    /// Phase two, acceptance: a guest of the destination service takes
    /// custody. The source record closes as `Transferred` and a fresh loaned
    /// record opens for the destination; the requester is notified.
    pub fn accept_transfer(
        &mut self,
        actor: &User,
        transfer_id: i64,
    ) -> Result<i64, WorkflowError> {
        let transfer = self
            .data
            .transfers
            .iter()
            .find(|t| t.id == transfer_id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found("La transferencia ya no existe."))?;
        require_transfer_receiver(actor, &transfer)?;
        if !self.data.records.iter().any(|r| r.id == transfer.record_id) {
            return Err(WorkflowError::not_found(
                "El registro transferido ya no existe.",
            ));
        }
        // Uniqueness of the active loan also holds across transfer
        // acceptance: any other active record for this folder blocks it.
        if self
            .data
            .records
            .iter()
            .any(|r| r.hc_number == transfer.hc_number && r.is_active() && r.id != transfer.record_id)
        {
            return Err(WorkflowError::conflict(format!(
                "No se puede aceptar la transferencia. La H.C. {} ya se encuentra en préstamo.",
                transfer.hc_number
            )));
        }

        let now = now_stamp();
        if let Some(source) = self
            .data
            .records
            .iter_mut()
            .find(|r| r.id == transfer.record_id)
        {
            source.status = RecordStatus::Transferred;
            source.return_date = Some(now.clone());
            source.receiving_staff_name = Some(format!("Transferido a {}", transfer.to_service));
        }

        let new_id = self.ids.next();
        self.data.records.push(Record {
            id: new_id,
            hc_number: transfer.hc_number.clone(),
            destination_service: transfer.to_service.clone(),
            responsible: actor.username.clone(),
            responsible_phone_number: "N/A".to_string(),
            request_date: now,
            status: RecordStatus::Loaned,
            return_date: None,
            receiving_staff_name: None,
        });
        self.data.transfers.retain(|t| t.id != transfer_id);

        let id = self.ids.next();
        self.data.notifications.push(Notification {
            id,
            user_id: transfer.requester_name.clone(),
            message: format!(
                "La transferencia de H.C. \"{}\" a {} fue aceptada.",
                transfer.hc_number, transfer.to_service
            ),
            timestamp: unix_millis(),
            is_read: false,
            kind: NotificationKind::Approval,
        });

        self.store.mirror(RECORDS_SLOT, &self.data.records);
        self.store.mirror(TRANSFERS_SLOT, &self.data.transfers);
        self.store
            .mirror(NOTIFICATIONS_SLOT, &self.data.notifications);
        info!(transfer_id, new_record = new_id, "transfer accepted");
        Ok(new_id)
    }

    /// Phase two, rejection: the destination service declines. The transfer
    /// is consumed, the requester is notified, no record changes.
    pub fn reject_transfer(
        &mut self,
        actor: &User,
        transfer_id: i64,
    ) -> Result<(), WorkflowError> {
        let transfer = self
            .data
            .transfers
            .iter()
            .find(|t| t.id == transfer_id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found("La transferencia ya no existe."))?;
        require_transfer_receiver(actor, &transfer)?;

        let id = self.ids.next();
        self.data.notifications.push(Notification {
            id,
            user_id: transfer.requester_name.clone(),
            message: format!(
                "La transferencia de H.C. \"{}\" a {} fue rechazada.",
                transfer.hc_number, transfer.to_service
            ),
            timestamp: unix_millis(),
            is_read: false,
            kind: NotificationKind::Rejection,
        });
        self.data.transfers.retain(|t| t.id != transfer_id);

        self.store.mirror(TRANSFERS_SLOT, &self.data.transfers);
        self.store
            .mirror(NOTIFICATIONS_SLOT, &self.data.notifications);
        Ok(())
    }

    /// Deletes one loan record.
    pub fn delete_record(&mut self, actor: &User, record_id: i64) -> Result<(), WorkflowError> {
        require_admin(actor)?;
        if !self.data.records.iter().any(|r| r.id == record_id) {
            return Err(WorkflowError::not_found("El registro ya no existe."));
        }
        self.data.records.retain(|r| r.id != record_id);
        self.store.mirror(RECORDS_SLOT, &self.data.records);
        Ok(())
    }

    /// Deletes every loan cycle of a folder together with its clinical
    /// details. Irreversible; the caller is responsible for having asked the
    /// user to confirm.
    pub fn delete_history(&mut self, actor: &User, hc_number: &str) -> Result<(), WorkflowError> {
        require_admin(actor)?;
        self.data.records.retain(|r| r.hc_number != hc_number);
        self.data.clinical_details.remove(hc_number);
        self.store.mirror(RECORDS_SLOT, &self.data.records);
        self.store
            .mirror(DETAILS_SLOT, &self.data.clinical_details);
        info!(hc_number, "full history deleted");
        Ok(())
    }

    /// Saves the free-text clinical details of a folder.
    pub fn save_clinical_details(
        &mut self,
        actor: &User,
        hc_number: &str,
        details: ClinicalDetails,
    ) -> Result<(), WorkflowError> {
        require_admin(actor)?;
        self.data
            .clinical_details
            .insert(hc_number.to_string(), details);
        self.store
            .mirror(DETAILS_SLOT, &self.data.clinical_details);
        Ok(())
    }

    /// Adds a user account. Usernames are unique case-insensitively and
    /// guests must come with their assigned service.
    pub fn add_user(&mut self, actor: &User, new_user: User) -> Result<(), WorkflowError> {
        require_admin(actor)?;
        let username = new_user.username.trim().to_string();
        if username.is_empty() || new_user.password.trim().is_empty() {
            return Err(WorkflowError::validation(
                "El nombre de usuario y la contraseña no pueden estar vacíos.",
            ));
        }
        let service = match new_user.role {
            Role::Guest => {
                let service = new_user
                    .service
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default();
                if service.is_empty() {
                    return Err(WorkflowError::validation(
                        "Indique el servicio asignado al invitado.",
                    ));
                }
                Some(service.to_string())
            }
            Role::Admin => None,
        };
        if self
            .data
            .users
            .iter()
            .any(|u| u.username.to_lowercase() == username.to_lowercase())
        {
            return Err(WorkflowError::conflict("El nombre de usuario ya existe."));
        }

        self.data.users.push(User {
            username,
            password: new_user.password,
            role: new_user.role,
            service,
        });
        self.store.mirror(USERS_SLOT, &self.data.users);
        Ok(())
    }

    /// Deletes a user account, cascading to their open requests and their
    /// notifications. The default administrator and the account of the
    /// acting user are protected.
    pub fn delete_user(&mut self, actor: &User, username: &str) -> Result<(), WorkflowError> {
        require_admin(actor)?;
        if username == DEFAULT_ADMIN {
            return Err(WorkflowError::denied(
                "No se puede eliminar al administrador por defecto.",
            ));
        }
        if username == actor.username {
            return Err(WorkflowError::denied(
                "No puede eliminar su propia cuenta de usuario mientras está en una sesión \
                 activa.",
            ));
        }
        if !self.data.users.iter().any(|u| u.username == username) {
            return Err(WorkflowError::not_found("El usuario ya no existe."));
        }

        self.data.users.retain(|u| u.username != username);
        self.data.requests.retain(|r| r.requester_name != username);
        self.data.notifications.retain(|n| n.user_id != username);

        self.store.mirror(USERS_SLOT, &self.data.users);
        self.store.mirror(REQUESTS_SLOT, &self.data.requests);
        self.store
            .mirror(NOTIFICATIONS_SLOT, &self.data.notifications);
        info!(username, "user deleted with cascade");
        Ok(())
    }

    /// Marks every notification addressed to the user as read. Invoked when
    /// the owner opens their notification panel.
    pub fn mark_notifications_read(&mut self, username: &str) {
        let mut changed = false;
        for notification in &mut self.data.notifications {
            if notification.user_id == username && !notification.is_read {
                notification.is_read = true;
                changed = true;
            }
        }
        if changed {
            self.store
                .mirror(NOTIFICATIONS_SLOT, &self.data.notifications);
        }
    }
}

fn require_admin(actor: &User) -> Result<(), WorkflowError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::denied(
            "Operación reservada al administrador.",
        ))
    }
}

fn require_service_owner(actor: &User, record: &Record) -> Result<(), WorkflowError> {
    match actor.guest_service() {
        Some(service) if service == record.destination_service => Ok(()),
        _ => Err(WorkflowError::denied(
            "Solo el servicio responsable del préstamo puede realizar esta operación.",
        )),
    }
}

fn require_transfer_receiver(actor: &User, transfer: &PendingTransfer) -> Result<(), WorkflowError> {
    match actor.guest_service() {
        Some(service) if service == transfer.to_service => Ok(()),
        _ => Err(WorkflowError::denied(
            "Solo el servicio de destino puede resolver la transferencia.",
        )),
    }
}

/// The record currently holding the folder out of the archive, if any.
/// `exclude` skips the record being edited so it does not conflict with
/// itself.
fn active_record<'a>(records: &'a [Record], hc_number: &str, exclude: Option<i64>) -> Option<&'a Record> {
    records
        .iter()
        .find(|r| r.hc_number == hc_number && r.is_active() && Some(r.id) != exclude)
}

fn sort_by_request_date_desc(records: &mut [Record]) {
    records.sort_by(|a, b| {
        let a = parse_stamp(&a.request_date).unwrap_or(PrimitiveDateTime::MIN);
        let b = parse_stamp(&b.request_date).unwrap_or(PrimitiveDateTime::MIN);
        b.cmp(&a)
    });
}

fn dedup(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> Engine {
        Engine::new(Store::open_in_memory().unwrap())
    }

    fn admin(engine: &Engine) -> User {
        engine.data().users[0].clone()
    }

    fn guest(engine: &mut Engine, username: &str, service: &str) -> User {
        let admin = admin(engine);
        engine
            .add_user(
                &admin,
                User {
                    username: username.into(),
                    password: "secret".into(),
                    role: Role::Guest,
                    service: Some(service.into()),
                },
            )
            .unwrap();
        engine
            .data()
            .users
            .iter()
            .find(|u| u.username == username)
            .unwrap()
            .clone()
    }

    fn loan_form(hc_numbers: &str, service: &str) -> LoanForm {
        LoanForm {
            hc_numbers: hc_numbers.into(),
            destination_service: service.into(),
            responsible: "Dr. Rojas".into(),
            responsible_phone_number: "987654321".into(),
            request_date: "2024-03-05T09:30".into(),
        }
    }

    fn active_count(engine: &Engine, hc: &str) -> usize {
        engine
            .data()
            .records
            .iter()
            .filter(|r| r.hc_number == hc && r.is_active())
            .count()
    }

    #[test]
    fn register_creates_one_record_per_hc_including_duplicates() {
        let mut engine = engine();
        let admin = admin(&engine);
        let ids = engine
            .register_loan(&admin, &loan_form("111, 222, 111", "Pediatría"), None)
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(engine.data().records.len(), 3);
        assert!(engine
            .data()
            .records
            .iter()
            .all(|r| r.status == RecordStatus::Loaned && r.return_date.is_none()));
        // Direct registration does not dedupe its input list.
        assert_eq!(active_count(&engine, "111"), 2);
    }

    #[test]
    fn register_rejects_active_folders_with_no_partial_effect() {
        let mut engine = engine();
        let admin = admin(&engine);
        engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();

        let err = engine
            .register_loan(&admin, &loan_form("111, 333", "Medicina"), None)
            .unwrap_err();
        match err {
            WorkflowError::Conflict { loaned, .. } => assert_eq!(loaned, vec!["111"]),
            other => panic!("expected conflict, got {other:?}"),
        }
        // 333 was not registered either.
        assert_eq!(engine.data().records.len(), 1);
    }

    #[test]
    fn register_also_blocks_on_pending_return() {
        let mut engine = engine();
        let admin = admin(&engine);
        let guest = guest(&mut engine, "maria", "Pediatría");
        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();
        engine.request_return(&guest, ids[0]).unwrap();

        let err = engine
            .register_loan(&admin, &loan_form("111", "Medicina"), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }));
    }

    #[test]
    fn register_requires_admin() {
        let mut engine = engine();
        let guest = guest(&mut engine, "maria", "Pediatría");
        let err = engine
            .register_loan(&guest, &loan_form("111", "Pediatría"), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    #[test]
    fn edit_updates_fields_and_preserves_lifecycle() {
        let mut engine = engine();
        let admin = admin(&engine);
        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();
        engine
            .confirm_return(&admin, ids[0], "2024-03-06T10:00", "Ana")
            .unwrap();

        // Editing the record does not conflict with itself and keeps the
        // return data intact.
        engine
            .register_loan(&admin, &loan_form("111", "Cirugía"), Some(ids[0]))
            .unwrap();
        let record = &engine.data().records[0];
        assert_eq!(record.destination_service, "Cirugía");
        assert_eq!(record.status, RecordStatus::Returned);
        assert_eq!(record.return_date.as_deref(), Some("2024-03-06T10:00"));
        assert_eq!(record.receiving_staff_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn submit_dedupes_and_creates_request_for_available_subset() {
        let mut engine = engine();
        let admin = admin(&engine);
        let guest = guest(&mut engine, "maria", "Pediatría");
        engine
            .register_loan(&admin, &loan_form("111", "Medicina"), None)
            .unwrap();

        let outcome = engine
            .submit_request(&guest, "111, 222, 222, 333", "Pediatría")
            .unwrap();
        assert_eq!(outcome.requested, vec!["222", "333"]);
        assert_eq!(outcome.excluded_loaned, vec!["111"]);
        assert!(outcome.excluded_pending.is_empty());
        assert!(outcome.info_message().unwrap().contains("Ya prestada(s): 111."));

        assert_eq!(engine.data().requests.len(), 1);
        assert_eq!(engine.data().requests[0].hc_numbers, "222, 333");
        assert_eq!(engine.data().requests[0].requester_name, "maria");
    }

    #[test]
    fn submit_with_nothing_available_creates_no_request() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let lucia = guest(&mut engine, "lucia", "Medicina");
        engine
            .register_loan(&admin, &loan_form("111", "Medicina"), None)
            .unwrap();
        engine.submit_request(&lucia, "222", "Medicina").unwrap();

        let err = engine
            .submit_request(&maria, "111, 222", "Pediatría")
            .unwrap_err();
        match err {
            WorkflowError::Conflict {
                loaned, pending, ..
            } => {
                assert_eq!(loaned, vec!["111"]);
                assert_eq!(pending, vec!["222"]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        // Only lucia's original request exists.
        assert_eq!(engine.data().requests.len(), 1);
    }

    #[test]
    fn rejected_request_frees_its_folders_for_new_requests() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let outcome = engine.submit_request(&maria, "555", "Pediatría").unwrap();

        let err = engine
            .submit_request(&maria, "555", "Pediatría")
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }));

        engine
            .reject_request(&admin, outcome.request_id, "No disponible")
            .unwrap();
        // Submission-time check only: after the rejection the folder is
        // silently requestable again.
        engine.submit_request(&maria, "555", "Pediatría").unwrap();
        assert_eq!(engine.data().requests.len(), 1);
    }

    #[test]
    fn self_approval_is_denied_and_leaves_the_request() {
        let mut engine = engine();
        let admin = admin(&engine);
        let outcome = engine.submit_request(&admin, "777", "Dirección").unwrap();

        let err = engine
            .approve_request(&admin, outcome.request_id)
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::PermissionDenied("No puede aprobar sus propias solicitudes.".into())
        );
        assert_eq!(engine.data().requests.len(), 1);
        assert!(engine.data().records.is_empty());
    }

    #[test]
    fn approval_converts_the_request_into_loaned_records() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let outcome = engine
            .submit_request(&maria, "333, 444", "Pediatría")
            .unwrap();

        let created = engine.approve_request(&admin, outcome.request_id).unwrap();
        assert_eq!(created.len(), 2);
        assert!(engine.data().requests.is_empty());
        for record in &engine.data().records {
            assert_eq!(record.status, RecordStatus::Loaned);
            assert_eq!(record.responsible, "maria");
            assert_eq!(record.responsible_phone_number, "N/A");
            assert_eq!(record.destination_service, "Pediatría");
        }
    }

    #[test]
    fn approval_reorders_records_newest_first() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        engine
            .register_loan(&admin, &loan_form("111", "Medicina"), None)
            .unwrap();
        let outcome = engine.submit_request(&maria, "333", "Pediatría").unwrap();
        engine.approve_request(&admin, outcome.request_id).unwrap();

        // The approved record carries the current timestamp, newer than the
        // 2024 stamp of the registered one, so it sorts first.
        assert_eq!(engine.data().records[0].hc_number, "333");
        assert_eq!(engine.data().records[1].hc_number, "111");
    }

    #[test]
    fn approval_is_blocked_while_the_folder_is_out() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let lucia = guest(&mut engine, "lucia", "Medicina");

        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();
        // The folder sits in PendingReturn, which still counts as out.
        engine.request_return(&maria, ids[0]).unwrap();

        let outcome = engine.submit_request(&lucia, "111", "Medicina");
        // Submission already refuses it; drive the approval-time re-check by
        // rebuilding the situation through a request made before the loan.
        assert!(outcome.is_err());

        let mut engine = engine_with_raced_request();
        let admin = engine.data().users[0].clone();
        let err = engine.approve_request(&admin, RACED_REQUEST_ID).unwrap_err();
        match &err {
            WorkflowError::Conflict { loaned, .. } => assert_eq!(loaned, &vec!["111".to_string()]),
            other => panic!("expected conflict, got {other:?}"),
        }
        // The request survives the failed approval.
        assert_eq!(engine.data().requests.len(), 1);
    }

    const RACED_REQUEST_ID: i64 = 1;

    /// State where a request for "111" was submitted before the folder went
    /// out on loan: submission-time validation passed, approval must now
    /// re-validate and fail.
    fn engine_with_raced_request() -> Engine {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        engine.submit_request(&maria, "111", "Pediatría").unwrap();
        engine
            .register_loan(&admin, &loan_form("111", "Medicina"), None)
            .unwrap();
        // Renumber for a stable id in the test.
        engine.data.requests[0].id = RACED_REQUEST_ID;
        engine
    }

    #[test]
    fn rejection_notifies_the_requester_and_consumes_the_request() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let outcome = engine.submit_request(&maria, "333", "Pediatría").unwrap();

        let err = engine
            .reject_request(&admin, outcome.request_id, "   ")
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(engine.data().requests.len(), 1);

        engine
            .reject_request(&admin, outcome.request_id, "Archivo en inventario")
            .unwrap();
        assert!(engine.data().requests.is_empty());
        assert_eq!(engine.data().notifications.len(), 1);
        let notification = &engine.data().notifications[0];
        assert_eq!(notification.user_id, "maria");
        assert_eq!(notification.kind, NotificationKind::Rejection);
        assert!(notification.message.contains("333"));
        assert!(notification.message.contains("Archivo en inventario"));
    }

    #[test]
    fn two_phase_return_scenario() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        // A second administrator must be notified too.
        engine
            .add_user(
                &admin,
                User {
                    username: "jefe".into(),
                    password: "jefe".into(),
                    role: Role::Admin,
                    service: None,
                },
            )
            .unwrap();

        let ids = engine
            .register_loan(&admin, &loan_form("111, 222", "Pediatría"), None)
            .unwrap();

        engine.request_return(&maria, ids[0]).unwrap();
        let record = engine.data().records.iter().find(|r| r.id == ids[0]).unwrap();
        assert_eq!(record.status, RecordStatus::PendingReturn);
        assert_eq!(engine.data().notifications.len(), 2);
        assert!(engine
            .data()
            .notifications
            .iter()
            .all(|n| n.kind == NotificationKind::Approval && n.message.contains("111")));

        // Missing staff name blocks the confirmation without touching state.
        let err = engine
            .confirm_return(&admin, ids[0], "2024-03-06T10:00", "  ")
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        engine
            .confirm_return(&admin, ids[0], "2024-03-06T10:00", " Ana ")
            .unwrap();
        let record = engine.data().records.iter().find(|r| r.id == ids[0]).unwrap();
        assert_eq!(record.status, RecordStatus::Returned);
        assert_eq!(record.return_date.as_deref(), Some("2024-03-06T10:00"));
        assert_eq!(record.receiving_staff_name.as_deref(), Some("Ana"));

        let untouched = engine.data().records.iter().find(|r| r.id == ids[1]).unwrap();
        assert_eq!(untouched.status, RecordStatus::Loaned);
    }

    #[test]
    fn return_is_limited_to_the_holding_service() {
        let mut engine = engine();
        let admin = admin(&engine);
        let lucia = guest(&mut engine, "lucia", "Medicina");
        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();

        let err = engine.request_return(&lucia, ids[0]).unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    #[test]
    fn transfer_accept_moves_custody() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let lucia = guest(&mut engine, "lucia", "Medicina");
        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();

        let transfer_id = engine.request_transfer(&maria, ids[0], "Medicina").unwrap();
        // Phase one does not change the record.
        assert_eq!(
            engine.data().records.iter().find(|r| r.id == ids[0]).unwrap().status,
            RecordStatus::Loaned
        );
        assert!(views::transfer_pending_ids(engine.data()).contains(&ids[0]));

        // A second transfer for the same record is refused.
        let err = engine
            .request_transfer(&maria, ids[0], "Cirugía")
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }));

        let new_id = engine.accept_transfer(&lucia, transfer_id).unwrap();
        assert!(engine.data().transfers.is_empty());

        let source = engine.data().records.iter().find(|r| r.id == ids[0]).unwrap();
        assert_eq!(source.status, RecordStatus::Transferred);
        assert!(source.return_date.is_some());
        assert_eq!(
            source.receiving_staff_name.as_deref(),
            Some("Transferido a Medicina")
        );

        let destination = engine.data().records.iter().find(|r| r.id == new_id).unwrap();
        assert_eq!(destination.status, RecordStatus::Loaned);
        assert_eq!(destination.destination_service, "Medicina");
        assert_eq!(destination.responsible, "lucia");
        assert_eq!(destination.responsible_phone_number, "N/A");

        // Exactly one active record remains for the folder.
        assert_eq!(active_count(&engine, "111"), 1);

        let notification = &engine.data().notifications[0];
        assert_eq!(notification.user_id, "maria");
        assert_eq!(notification.kind, NotificationKind::Approval);
        assert!(notification.message.contains("aceptada"));
    }

    #[test]
    fn transfer_reject_only_notifies() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let lucia = guest(&mut engine, "lucia", "Medicina");
        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();
        let transfer_id = engine.request_transfer(&maria, ids[0], "Medicina").unwrap();

        engine.reject_transfer(&lucia, transfer_id).unwrap();
        assert!(engine.data().transfers.is_empty());
        assert_eq!(
            engine.data().records.iter().find(|r| r.id == ids[0]).unwrap().status,
            RecordStatus::Loaned
        );
        let notification = &engine.data().notifications[0];
        assert_eq!(notification.kind, NotificationKind::Rejection);
        assert!(notification.message.contains("rechazada"));
    }

    #[test]
    fn transfer_resolution_requires_the_destination_service() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let carla = guest(&mut engine, "carla", "Cirugía");
        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();
        let transfer_id = engine.request_transfer(&maria, ids[0], "Medicina").unwrap();

        assert!(matches!(
            engine.accept_transfer(&carla, transfer_id).unwrap_err(),
            WorkflowError::PermissionDenied(_)
        ));
        assert!(matches!(
            engine.accept_transfer(&admin, transfer_id).unwrap_err(),
            WorkflowError::PermissionDenied(_)
        ));
        assert_eq!(engine.data().transfers.len(), 1);
    }

    #[test]
    fn user_management_rules() {
        let mut engine = engine();
        let admin = admin(&engine);

        let err = engine
            .add_user(
                &admin,
                User {
                    username: "  ".into(),
                    password: "x".into(),
                    role: Role::Admin,
                    service: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        guest(&mut engine, "maria", "Pediatría");
        let err = engine
            .add_user(
                &admin,
                User {
                    username: "MARIA".into(),
                    password: "x".into(),
                    role: Role::Guest,
                    service: Some("Medicina".into()),
                },
            )
            .unwrap_err();
        assert_eq!(err, WorkflowError::conflict("El nombre de usuario ya existe."));

        assert!(matches!(
            engine.delete_user(&admin, DEFAULT_ADMIN).unwrap_err(),
            WorkflowError::PermissionDenied(_)
        ));
        let second = User {
            username: "jefe".into(),
            password: "jefe".into(),
            role: Role::Admin,
            service: None,
        };
        engine.add_user(&admin, second.clone()).unwrap();
        assert!(matches!(
            engine.delete_user(&second, "jefe").unwrap_err(),
            WorkflowError::PermissionDenied(_)
        ));
    }

    #[test]
    fn deleting_a_user_cascades_requests_and_notifications() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let outcome = engine.submit_request(&maria, "333", "Pediatría").unwrap();
        engine
            .reject_request(&admin, outcome.request_id, "sin stock")
            .unwrap();
        engine.submit_request(&maria, "444", "Pediatría").unwrap();
        assert_eq!(engine.data().requests.len(), 1);
        assert_eq!(engine.data().notifications.len(), 1);

        engine.delete_user(&admin, "maria").unwrap();
        assert!(!engine.data().users.iter().any(|u| u.username == "maria"));
        assert!(!engine
            .data()
            .requests
            .iter()
            .any(|r| r.requester_name == "maria"));
        assert!(!engine
            .data()
            .notifications
            .iter()
            .any(|n| n.user_id == "maria"));
    }

    #[test]
    fn full_history_deletion_removes_all_cycles_and_details() {
        let mut engine = engine();
        let admin = admin(&engine);
        let ids = engine
            .register_loan(&admin, &loan_form("111", "Pediatría"), None)
            .unwrap();
        engine
            .confirm_return(&admin, ids[0], "2024-03-06T10:00", "Ana")
            .unwrap();
        engine
            .register_loan(&admin, &loan_form("111", "Medicina"), None)
            .unwrap();
        engine
            .register_loan(&admin, &loan_form("222", "Medicina"), None)
            .unwrap();
        engine
            .save_clinical_details(
                &admin,
                "111",
                ClinicalDetails {
                    antecedents: "asma".into(),
                    notes: String::new(),
                },
            )
            .unwrap();

        engine.delete_history(&admin, "111").unwrap();
        assert!(!engine.data().records.iter().any(|r| r.hc_number == "111"));
        assert!(engine.data().records.iter().any(|r| r.hc_number == "222"));
        assert!(!engine.data().clinical_details.contains_key("111"));
    }

    #[test]
    fn mark_notifications_read_flips_only_the_owner() {
        let mut engine = engine();
        let admin = admin(&engine);
        let maria = guest(&mut engine, "maria", "Pediatría");
        let lucia = guest(&mut engine, "lucia", "Medicina");
        let first = engine.submit_request(&maria, "1", "Pediatría").unwrap();
        let second = engine.submit_request(&lucia, "2", "Medicina").unwrap();
        engine.reject_request(&admin, first.request_id, "a").unwrap();
        engine.reject_request(&admin, second.request_id, "b").unwrap();

        engine.mark_notifications_read("maria");
        for notification in &engine.data().notifications {
            assert_eq!(notification.is_read, notification.user_id == "maria");
        }
    }

    #[test]
    fn state_survives_a_restart_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");

        {
            let mut engine = Engine::new(Store::open(&path).unwrap());
            let admin = admin(&engine);
            let maria = guest(&mut engine, "maria", "Pediatría");
            engine
                .register_loan(&admin, &loan_form("111", "Pediatría"), None)
                .unwrap();
            engine.submit_request(&maria, "333", "Pediatría").unwrap();
        }

        let engine = Engine::new(Store::open(&path).unwrap());
        assert_eq!(engine.data().users.len(), 2);
        assert_eq!(engine.data().records.len(), 1);
        assert_eq!(engine.data().requests.len(), 1);
        assert_eq!(engine.data().records[0].hc_number, "111");
    }

    // Exercises arbitrary operation interleavings and checks that no folder
    // ever ends up with two active records.
    proptest! {
        #[test]
        fn at_most_one_active_record_per_folder(ops in proptest::collection::vec((0u8..7, 0usize..4), 0..40)) {
            let mut engine = engine();
            let admin = admin(&engine);
            let maria = guest(&mut engine, "maria", "Pediatría");
            let lucia = guest(&mut engine, "lucia", "Medicina");
            let folders = ["100", "200", "300", "400"];

            for (op, idx) in ops {
                let hc = folders[idx];
                match op {
                    0 => {
                        let _ = engine.register_loan(&admin, &loan_form(hc, "Pediatría"), None);
                    }
                    1 => {
                        let _ = engine.submit_request(&maria, hc, "Pediatría");
                    }
                    2 => {
                        if let Some(request) = engine.data().requests.first() {
                            let id = request.id;
                            let _ = engine.approve_request(&admin, id);
                        }
                    }
                    3 => {
                        if let Some(record) = engine
                            .data()
                            .records
                            .iter()
                            .find(|r| r.status == RecordStatus::Loaned
                                && r.destination_service == "Pediatría")
                        {
                            let id = record.id;
                            let _ = engine.request_return(&maria, id);
                        }
                    }
                    4 => {
                        if let Some(record) = engine
                            .data()
                            .records
                            .iter()
                            .find(|r| r.status == RecordStatus::PendingReturn)
                        {
                            let id = record.id;
                            let _ = engine.confirm_return(&admin, id, "2024-03-06T10:00", "Ana");
                        }
                    }
                    5 => {
                        if let Some(record) = engine
                            .data()
                            .records
                            .iter()
                            .find(|r| r.status == RecordStatus::Loaned
                                && r.destination_service == "Pediatría")
                        {
                            let id = record.id;
                            let _ = engine.request_transfer(&maria, id, "Medicina");
                        }
                    }
                    _ => {
                        if let Some(transfer) = engine.data().transfers.first() {
                            let id = transfer.id;
                            let _ = engine.accept_transfer(&lucia, id);
                        }
                    }
                }

                for hc in &folders {
                    prop_assert!(active_count(&engine, hc) <= 1, "folder {hc} double-booked");
                }
            }
        }
    }
}
