//! The application state machine.
//!
//! Routes terminal events to the active screen, moves between login, home
//! and the registry screens, and owns the workflow engine plus the session
//! that every component acts through.

use crate::auth::Session;
use crate::components::archive::{ArchiveApp, ArchiveState};
use crate::components::{home::Home, login::Login, Component, Ctx};
use crate::engine::Engine;
use crate::tui::{self, Tui};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// The screens reachable from the home menu, plus the two sentinel values
/// the components use to signal "go back" (`None`) and "quit" (`Quit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedApp {
    RegisterLoan,
    ListRecords,
    SubmitRequest,
    ReviewRequests,
    IncomingTransfers,
    ManageUsers,
    Notifications,
    None,
    Quit,
}

/// Top-level application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Init,
    Login,
    Home,
    Running(SelectedApp),
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,
    pub engine: Engine,
    pub session: Session,
    pub login: Login,
    pub home: Home,
    /// The registry screens, created when one is entered and dropped on the
    /// way back to home.
    pub archive: Option<ArchiveApp>,
}

impl App {
    pub fn new(engine: Engine) -> Self {
        Self {
            state: AppState::Init,
            should_quit: false,
            engine,
            session: Session::default(),
            login: Login::new(),
            home: Home::new(),
            archive: None,
        }
    }

    /// Runs the main loop: draw, then handle the next event, until quit.
    pub fn run(&mut self, tui: &mut Tui) -> Result<()> {
        self.state = AppState::Login;

        while !self.should_quit {
            tui.draw(|frame| self.render_ui(frame))?;
            self.handle_event(tui)?;
        }
        Ok(())
    }

    fn handle_event(&mut self, tui: &mut Tui) -> Result<()> {
        match tui.next_event()? {
            tui::Event::Input(event) => {
                if let crossterm::event::Event::Key(key) = event {
                    // Global keybinding: Ctrl+Q quits from anywhere.
                    if key.code == KeyCode::Char('q')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        self.should_quit = true;
                        return Ok(());
                    }
                    self.handle_key(key)?;
                }
            }
            tui::Event::Tick => {
                if let AppState::Login = self.state {
                    self.login.check_error_timeout();
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.state {
            AppState::Init => {
                self.state = AppState::Login;
            }
            AppState::Login => {
                let mut ctx = Ctx {
                    engine: &mut self.engine,
                    session: &mut self.session,
                };
                match self.login.handle_input(key, &mut ctx)? {
                    Some(SelectedApp::Quit) => self.should_quit = true,
                    Some(SelectedApp::None) => {
                        // The login component signed the session in.
                        self.home = Home::new();
                        self.state = AppState::Home;
                    }
                    _ => {}
                }
            }
            AppState::Home => {
                let mut ctx = Ctx {
                    engine: &mut self.engine,
                    session: &mut self.session,
                };
                if let Some(selected) = self.home.handle_input(key, &mut ctx)? {
                    match selected {
                        SelectedApp::Quit => self.should_quit = true,
                        SelectedApp::None => {
                            // Logout.
                            self.session.sign_out();
                            self.login.reset();
                            self.login.success_message =
                                Some("Sesión cerrada con éxito.".to_string());
                            self.state = AppState::Login;
                        }
                        other => self.enter_screen(other),
                    }
                }
            }
            AppState::Running(_) => {
                let mut ctx = Ctx {
                    engine: &mut self.engine,
                    session: &mut self.session,
                };
                let result = match &mut self.archive {
                    Some(archive) => archive.handle_input(key, &mut ctx)?,
                    None => Some(SelectedApp::None),
                };
                if let Some(SelectedApp::None) = result {
                    self.archive = None;
                    self.state = AppState::Home;
                }
            }
        }
        Ok(())
    }

    /// Enters one of the registry screens from the home menu.
    fn enter_screen(&mut self, selected: SelectedApp) {
        let Some(state) = archive_state(selected) else {
            return;
        };

        // Opening the notification panel is what marks the owner's
        // notifications as read.
        if selected == SelectedApp::Notifications {
            if let Some(user) = self.session.user() {
                let username = user.username.clone();
                self.engine.mark_notifications_read(&username);
            }
        }

        self.archive = Some(ArchiveApp::new(state));
        self.state = AppState::Running(selected);
    }

    fn render_ui(&mut self, frame: &mut crate::tui::Frame<'_>) {
        let ctx = Ctx {
            engine: &mut self.engine,
            session: &mut self.session,
        };
        match self.state {
            AppState::Init => {}
            AppState::Login => self.login.render(frame, &ctx),
            AppState::Home => self.home.render(frame, &ctx),
            AppState::Running(_) => {
                if let Some(archive) = &self.archive {
                    archive.render(frame, &ctx);
                }
            }
        }
    }
}

fn archive_state(selected: SelectedApp) -> Option<ArchiveState> {
    match selected {
        SelectedApp::RegisterLoan => Some(ArchiveState::RegisterLoan),
        SelectedApp::ListRecords => Some(ArchiveState::ListRecords),
        SelectedApp::SubmitRequest => Some(ArchiveState::SubmitRequest),
        SelectedApp::ReviewRequests => Some(ArchiveState::ReviewRequests),
        SelectedApp::IncomingTransfers => Some(ArchiveState::IncomingTransfers),
        SelectedApp::ManageUsers => Some(ArchiveState::ManageUsers),
        SelectedApp::Notifications => Some(ArchiveState::Notifications),
        SelectedApp::None | SelectedApp::Quit => None,
    }
}
