//! Error type of the workflow engine.

use thiserror::Error;

/// Outcome of a workflow operation that could not be applied. State is never
/// partially mutated: every variant means the collections are unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// A required field is missing or empty.
    #[error("{0}")]
    Validation(String),

    /// A requested folder is unavailable, or the operation would collide
    /// with existing state. `loaned` and `pending` carry the offending
    /// hcNumbers when the conflict is about folder availability.
    #[error("{message}")]
    Conflict {
        message: String,
        loaned: Vec<String>,
        pending: Vec<String>,
    },

    /// The acting user may not perform this operation.
    #[error("{0}")]
    PermissionDenied(String),

    /// The target id no longer exists.
    #[error("{0}")]
    NotFound(String),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    pub fn denied(message: impl Into<String>) -> Self {
        WorkflowError::PermissionDenied(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        WorkflowError::NotFound(message.into())
    }

    /// Conflict without offending-folder detail.
    pub fn conflict(message: impl Into<String>) -> Self {
        WorkflowError::Conflict {
            message: message.into(),
            loaned: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Conflict raised by direct loan registration: the listed folders are
    /// already out on loan.
    pub fn already_loaned(loaned: Vec<String>) -> Self {
        WorkflowError::Conflict {
            message: format!(
                "Error: La(s) siguiente(s) historia(s) clínica(s) ya se encuentra(n) en \
                 estado de préstamo y no puede(n) ser registrada(s) de nuevo hasta su \
                 devolución: {}",
                loaned.join(", ")
            ),
            loaned,
            pending: Vec::new(),
        }
    }

    /// Conflict raised by request submission when every requested folder is
    /// unavailable, split by cause.
    pub fn unavailable(loaned: Vec<String>, pending: Vec<String>) -> Self {
        WorkflowError::Conflict {
            message: unavailable_message(&loaned, &pending),
            loaned,
            pending,
        }
    }

    /// Conflict raised at approval time: folders were loaned out after the
    /// request had been submitted.
    pub fn approval_blocked(loaned: Vec<String>) -> Self {
        WorkflowError::Conflict {
            message: format!(
                "No se puede aprobar la solicitud. La(s) siguiente(s) historia(s) \
                 clínica(s) ya ha(n) sido prestada(s): {}. Por favor, rechace esta \
                 solicitud o espere su devolución.",
                loaned.join(", ")
            ),
            loaned,
            pending: Vec::new(),
        }
    }
}

/// Message naming the folders excluded from a request, split into the ones
/// out on loan and the ones already claimed by another open request. Shared
/// by the all-unavailable Conflict and the partial-success info message.
pub fn unavailable_message(loaned: &[String], pending: &[String]) -> String {
    let mut message = String::from("Algunas H.C. no pudieron ser solicitadas.");
    if !loaned.is_empty() {
        message.push_str(&format!(" Ya prestada(s): {}.", loaned.join(", ")));
    }
    if !pending.is_empty() {
        message.push_str(&format!(" Ya en otra solicitud: {}.", pending.join(", ")));
    }
    message
}
