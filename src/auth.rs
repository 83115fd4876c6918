//! Authentication and session state.
//!
//! Credentials are compared as plain strings against the user collection:
//! this mirrors the paper-registry deployment it replaces, where the login
//! is record-keeping convenience, not a security boundary.

use crate::models::User;
use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Looks the user up case-insensitively and checks the password.
pub fn login(users: &[User], credentials: &Credentials) -> Result<User> {
    users
        .iter()
        .find(|u| u.username.to_lowercase() == credentials.username.to_lowercase())
        .filter(|u| u.password == credentials.password)
        .cloned()
        .ok_or_else(|| anyhow!("Usuario o contraseña incorrectos."))
}

/// The authenticated user for the lifetime of the process. Ephemeral by
/// design: it is never written to the persistent store.
#[derive(Debug, Default)]
pub struct Session {
    current_user: Option<User>,
}

impl Session {
    pub fn sign_in(&mut self, user: User) {
        self.current_user = Some(user);
    }

    pub fn sign_out(&mut self) {
        self.current_user = None;
    }

    pub fn user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn users() -> Vec<User> {
        vec![User {
            username: "Maria".into(),
            password: "secret".into(),
            role: Role::Guest,
            service: Some("Pediatría".into()),
        }]
    }

    #[test]
    fn username_match_is_case_insensitive() {
        let credentials = Credentials {
            username: "maria".into(),
            password: "secret".into(),
        };
        let user = login(&users(), &credentials).unwrap();
        assert_eq!(user.username, "Maria");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let credentials = Credentials {
            username: "maria".into(),
            password: "Secret".into(),
        };
        let err = login(&users(), &credentials).unwrap_err();
        assert_eq!(err.to_string(), "Usuario o contraseña incorrectos.");
    }

    #[test]
    fn session_holds_and_clears_the_user() {
        let mut session = Session::default();
        assert!(session.user().is_none());
        session.sign_in(users().remove(0));
        assert_eq!(session.user().unwrap().username, "Maria");
        session.sign_out();
        assert!(session.user().is_none());
    }
}
