//! Home screen: the task menu after login.

use crate::app::SelectedApp;
use crate::components::{centered_rect, Component, Ctx};
use crate::engine::views;
use crate::models::{Role, User};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph},
};

pub struct Home {
    selected_index: usize,
    focus_logout: bool,
    show_logout_dialog: bool,
    logout_dialog_selected: usize,
}

/// The tasks offered to the user, by role. Administrators curate the
/// registry; guests operate on their own service.
fn menu(user: &User) -> Vec<(&'static str, SelectedApp)> {
    match user.role {
        Role::Admin => vec![
            ("Registrar préstamo", SelectedApp::RegisterLoan),
            ("Listado de historias", SelectedApp::ListRecords),
            ("Solicitudes pendientes", SelectedApp::ReviewRequests),
            ("Gestionar usuarios", SelectedApp::ManageUsers),
            ("Notificaciones", SelectedApp::Notifications),
        ],
        Role::Guest => vec![
            ("Listado de historias", SelectedApp::ListRecords),
            ("Nueva solicitud", SelectedApp::SubmitRequest),
            ("Solicitudes de mi servicio", SelectedApp::ReviewRequests),
            ("Transferencias entrantes", SelectedApp::IncomingTransfers),
            ("Notificaciones", SelectedApp::Notifications),
        ],
    }
}

impl Home {
    pub fn new() -> Self {
        Self {
            selected_index: 0,
            focus_logout: false,
            show_logout_dialog: false,
            logout_dialog_selected: 1,
        }
    }

    fn handle_logout_dialog_input(&mut self, key: KeyEvent) -> Option<SelectedApp> {
        match key.code {
            KeyCode::Left | KeyCode::Right => {
                self.logout_dialog_selected = 1 - self.logout_dialog_selected;
            }
            KeyCode::Enter => {
                self.show_logout_dialog = false;
                if self.logout_dialog_selected == 0 {
                    return Some(SelectedApp::None);
                }
            }
            KeyCode::Esc => {
                self.show_logout_dialog = false;
            }
            _ => {}
        }
        None
    }
}

impl Component for Home {
    fn handle_input(&mut self, event: KeyEvent, ctx: &mut Ctx) -> Result<Option<SelectedApp>> {
        let Some(user) = ctx.session.user() else {
            return Ok(None);
        };
        let entries = menu(user);

        if self.show_logout_dialog {
            return Ok(self.handle_logout_dialog_input(event));
        }

        match event.code {
            KeyCode::Tab => self.focus_logout = !self.focus_logout,
            KeyCode::Up => {
                if self.focus_logout {
                    self.focus_logout = false;
                } else if self.selected_index > 0 {
                    self.selected_index -= 1;
                } else {
                    self.selected_index = entries.len() - 1;
                }
            }
            KeyCode::Down => {
                if !self.focus_logout {
                    self.selected_index = (self.selected_index + 1) % entries.len();
                }
            }
            KeyCode::Enter => {
                if self.focus_logout {
                    self.show_logout_dialog = true;
                    self.logout_dialog_selected = 1;
                } else if let Some((_, selected)) = entries.get(self.selected_index) {
                    return Ok(Some(*selected));
                }
            }
            KeyCode::Esc => {
                self.show_logout_dialog = true;
                self.logout_dialog_selected = 1;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, ctx: &Ctx) {
        let Some(user) = ctx.session.user() else {
            return;
        };
        let entries = menu(user);
        let unread = views::unread_count(ctx.engine.data(), &user.username);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Header
                Constraint::Length(1), // Instruction
                Constraint::Min(8),    // Menu
                Constraint::Length(1), // Help
                Constraint::Length(3), // Logout
            ])
            .margin(1)
            .split(frame.area());

        let mut header_lines = vec![Line::from(vec![
            Span::styled("Usuario: ", Style::default().fg(Color::Gray)),
            Span::styled(
                user.username.clone(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" ({})", user.role), Style::default().fg(Color::Gray)),
        ])];
        if let Some(service) = user.guest_service() {
            header_lines.push(Line::from(vec![
                Span::styled("Servicio: ", Style::default().fg(Color::Gray)),
                Span::styled(service.to_string(), Style::default().fg(Color::Cyan)),
            ]));
        }
        if unread > 0 {
            header_lines.push(Line::from(Span::styled(
                format!("Notificaciones sin leer: {unread}"),
                Style::default().fg(Color::Yellow),
            )));
        }
        let header = Paragraph::new(header_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(" Control de Historias Clínicas "),
            )
            .alignment(Alignment::Left);
        frame.render_widget(header, layout[0]);

        let instruction = Paragraph::new("Seleccione una tarea:")
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center);
        frame.render_widget(instruction, layout[1]);

        let items: Vec<ListItem> = entries
            .iter()
            .enumerate()
            .map(|(idx, (label, _))| {
                let selected = idx == self.selected_index && !self.focus_logout;
                let style = if selected {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                let prefix = if selected { " ► " } else { "   " };
                ListItem::new(format!("{prefix}{label}")).style(style)
            })
            .collect();
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
        frame.render_widget(list, layout[2]);

        let help = Paragraph::new("↑↓: Navegar | Enter: Seleccionar | Tab: Cerrar sesión")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(help, layout[3]);

        let logout_text = if self.focus_logout {
            "► Cerrar Sesión ◄"
        } else {
            "  Cerrar Sesión  "
        };
        let logout_style = if self.focus_logout {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let logout = Paragraph::new(logout_text)
            .style(logout_style)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            );
        frame.render_widget(logout, layout[4]);

        if self.show_logout_dialog {
            let dialog_area = centered_rect(50, 20, frame.area());
            let dialog = Paragraph::new(vec![
                Line::from("¿Está seguro de que desea cerrar la sesión?"),
                Line::from(""),
                Line::from(vec![
                    Span::styled(
                        " Sí ",
                        Style::default().fg(if self.logout_dialog_selected == 0 {
                            Color::Green
                        } else {
                            Color::DarkGray
                        }),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        " No ",
                        Style::default().fg(if self.logout_dialog_selected == 1 {
                            Color::Red
                        } else {
                            Color::DarkGray
                        }),
                    ),
                ]),
            ])
            .block(
                Block::default()
                    .title(" Cerrar Sesión ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .alignment(Alignment::Center);
            frame.render_widget(Clear, dialog_area);
            frame.render_widget(dialog, dialog_area);
        }
    }
}

impl Default for Home {
    fn default() -> Self {
        Self::new()
    }
}
