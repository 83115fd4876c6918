//! Registry screens: loan registration, the record list, requests,
//! transfers, users and notifications.
//!
//! `ArchiveApp` owns one component per screen and routes input to the active
//! one; the edit flow jumps from the list into the registration form and
//! back.

use crate::app::SelectedApp;
use crate::components::{Component, Ctx};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod list;
pub mod notifications;
pub mod register;
pub mod review;
pub mod submit;
pub mod transfers;
pub mod users;

use list::{ListAction, RecordList};
use notifications::NotificationsPanel;
use register::{RegisterAction, RegisterLoan};
use review::ReviewRequests;
use submit::SubmitRequest;
use transfers::IncomingTransfers;
use users::ManageUsers;

/// Which registry screen is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    RegisterLoan,
    ListRecords,
    SubmitRequest,
    ReviewRequests,
    IncomingTransfers,
    ManageUsers,
    Notifications,
}

pub struct ArchiveApp {
    pub state: ArchiveState,
    pub register: RegisterLoan,
    pub list: RecordList,
    pub submit: SubmitRequest,
    pub review: ReviewRequests,
    pub transfers: IncomingTransfers,
    pub users: ManageUsers,
    pub notifications: NotificationsPanel,
}

impl ArchiveApp {
    pub fn new(state: ArchiveState) -> Self {
        Self {
            state,
            register: RegisterLoan::new(),
            list: RecordList::new(),
            submit: SubmitRequest::new(),
            review: ReviewRequests::new(),
            transfers: IncomingTransfers::new(),
            users: ManageUsers::new(),
            notifications: NotificationsPanel::new(),
        }
    }
}

impl Component for ArchiveApp {
    fn handle_input(&mut self, event: KeyEvent, ctx: &mut Ctx) -> Result<Option<SelectedApp>> {
        match self.state {
            ArchiveState::RegisterLoan => {
                if let Some(RegisterAction::Back) = self.register.handle_input(event, ctx)? {
                    if self.register.came_from_list() {
                        self.register = RegisterLoan::new();
                        self.state = ArchiveState::ListRecords;
                    } else {
                        return Ok(Some(SelectedApp::None));
                    }
                }
            }
            ArchiveState::ListRecords => {
                if let Some(action) = self.list.handle_input(event, ctx)? {
                    match action {
                        ListAction::Back => return Ok(Some(SelectedApp::None)),
                        ListAction::Edit(record_id) => {
                            let record = ctx
                                .engine
                                .data()
                                .records
                                .iter()
                                .find(|r| r.id == record_id)
                                .cloned();
                            if let Some(record) = record {
                                self.register.start_edit(&record);
                                self.state = ArchiveState::RegisterLoan;
                            }
                        }
                    }
                }
            }
            ArchiveState::SubmitRequest => {
                if let Some(selected) = self.submit.handle_input(event, ctx)? {
                    return Ok(Some(selected));
                }
            }
            ArchiveState::ReviewRequests => {
                if let Some(selected) = self.review.handle_input(event, ctx)? {
                    return Ok(Some(selected));
                }
            }
            ArchiveState::IncomingTransfers => {
                if let Some(selected) = self.transfers.handle_input(event, ctx)? {
                    return Ok(Some(selected));
                }
            }
            ArchiveState::ManageUsers => {
                if let Some(selected) = self.users.handle_input(event, ctx)? {
                    return Ok(Some(selected));
                }
            }
            ArchiveState::Notifications => {
                if let Some(selected) = self.notifications.handle_input(event, ctx)? {
                    return Ok(Some(selected));
                }
            }
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, ctx: &Ctx) {
        match self.state {
            ArchiveState::RegisterLoan => self.register.render(frame, ctx),
            ArchiveState::ListRecords => self.list.render(frame, ctx),
            ArchiveState::SubmitRequest => self.submit.render(frame, ctx),
            ArchiveState::ReviewRequests => self.review.render(frame, ctx),
            ArchiveState::IncomingTransfers => self.transfers.render(frame, ctx),
            ArchiveState::ManageUsers => self.users.render(frame, ctx),
            ArchiveState::Notifications => self.notifications.render(frame, ctx),
        }
    }
}
