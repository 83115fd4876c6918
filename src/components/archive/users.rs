//! User administration: add accounts, list them, delete with cascade.

use crate::app::SelectedApp;
use crate::components::{centered_rect, Ctx};
use crate::models::{Role, User};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

const FIELD_USERNAME: usize = 0;
const FIELD_PASSWORD: usize = 1;
const FIELD_ROLE: usize = 2;
const FIELD_SERVICE: usize = 3;
const BUTTON_ADD: usize = 4;
const ZONE_LIST: usize = 5;

pub struct ManageUsers {
    username: String,
    password: String,
    role: Role,
    service: String,
    focus_index: usize,
    list_state: ListState,
    confirm_delete: Option<String>,
    delete_selected: usize,
    error_message: Option<String>,
    info_message: Option<String>,
}

impl ManageUsers {
    pub fn new() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            role: Role::Guest,
            service: String::new(),
            focus_index: FIELD_USERNAME,
            list_state: ListState::default(),
            confirm_delete: None,
            delete_selected: 1,
            error_message: None,
            info_message: None,
        }
    }

    fn add_user(&mut self, ctx: &mut Ctx, actor: &User) {
        let new_user = User {
            username: self.username.clone(),
            password: self.password.clone(),
            role: self.role,
            service: match self.role {
                Role::Guest => Some(self.service.clone()),
                Role::Admin => None,
            },
        };
        match ctx.engine.add_user(actor, new_user) {
            Ok(()) => {
                self.info_message = Some(format!(
                    "Usuario \"{}\" agregado con éxito.",
                    self.username.trim()
                ));
                self.error_message = None;
                self.username.clear();
                self.password.clear();
                self.service.clear();
                self.role = Role::Guest;
                self.focus_index = FIELD_USERNAME;
            }
            Err(err) => {
                self.error_message = Some(err.to_string());
                self.info_message = None;
            }
        }
    }

    fn selected_username(&self, ctx: &Ctx) -> Option<String> {
        let users = &ctx.engine.data().users;
        self.list_state
            .selected()
            .and_then(|i| users.get(i))
            .map(|u| u.username.clone())
    }

    fn move_selection(&mut self, ctx: &Ctx, delta: isize) {
        let count = ctx.engine.data().users.len();
        if count == 0 {
            self.list_state.select(None);
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(count as isize) as usize;
        self.list_state.select(Some(next));
    }

    pub fn handle_input(&mut self, key: KeyEvent, ctx: &mut Ctx) -> Result<Option<SelectedApp>> {
        let Some(actor) = ctx.session.user().cloned() else {
            return Ok(Some(SelectedApp::None));
        };

        if let Some(username) = self.confirm_delete.clone() {
            match key.code {
                KeyCode::Left | KeyCode::Right => self.delete_selected = 1 - self.delete_selected,
                KeyCode::Enter => {
                    if self.delete_selected == 0 {
                        match ctx.engine.delete_user(&actor, &username) {
                            Ok(()) => {
                                self.info_message =
                                    Some(format!("Usuario \"{username}\" eliminado con éxito."));
                                self.error_message = None;
                                self.list_state.select(None);
                            }
                            Err(err) => self.error_message = Some(err.to_string()),
                        }
                    }
                    self.confirm_delete = None;
                }
                KeyCode::Esc => self.confirm_delete = None,
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab => {
                self.focus_index = (self.focus_index + 1) % 6;
            }
            KeyCode::BackTab => {
                self.focus_index = (self.focus_index + 5) % 6;
            }
            KeyCode::Char(c) if self.focus_index == FIELD_USERNAME => {
                self.username.push(c);
                self.error_message = None;
            }
            KeyCode::Char(c) if self.focus_index == FIELD_PASSWORD => {
                self.password.push(c);
                self.error_message = None;
            }
            KeyCode::Char(c)
                if self.focus_index == FIELD_SERVICE && self.role == Role::Guest =>
            {
                self.service.push(c);
                self.error_message = None;
            }
            KeyCode::Backspace => match self.focus_index {
                FIELD_USERNAME => {
                    self.username.pop();
                }
                FIELD_PASSWORD => {
                    self.password.pop();
                }
                FIELD_SERVICE => {
                    self.service.pop();
                }
                _ => {}
            },
            KeyCode::Left | KeyCode::Right if self.focus_index == FIELD_ROLE => {
                self.role = match self.role {
                    Role::Guest => Role::Admin,
                    Role::Admin => Role::Guest,
                };
            }
            KeyCode::Down => {
                if self.focus_index == ZONE_LIST {
                    self.move_selection(ctx, 1);
                } else {
                    self.focus_index = (self.focus_index + 1) % 6;
                }
            }
            KeyCode::Up => {
                if self.focus_index == ZONE_LIST {
                    self.move_selection(ctx, -1);
                } else {
                    self.focus_index = (self.focus_index + 5) % 6;
                }
            }
            KeyCode::Enter => {
                if self.focus_index == BUTTON_ADD {
                    self.add_user(ctx, &actor);
                } else if self.focus_index < BUTTON_ADD {
                    self.focus_index += 1;
                }
            }
            KeyCode::Char('d') | KeyCode::Delete if self.focus_index == ZONE_LIST => {
                if let Some(username) = self.selected_username(ctx) {
                    self.confirm_delete = Some(username);
                    self.delete_selected = 1;
                }
            }
            KeyCode::Char('b') | KeyCode::Esc => return Ok(Some(SelectedApp::None)),
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame, ctx: &Ctx) {
        let users = &ctx.engine.data().users;

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Length(3), // Username
                Constraint::Length(3), // Password
                Constraint::Length(3), // Role + service
                Constraint::Length(1), // Add button
                Constraint::Length(1), // Messages
                Constraint::Min(5),    // Existing users
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(frame.area());

        frame.render_widget(
            Paragraph::new("GESTIONAR USUARIOS")
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center),
            layout[0],
        );

        let username_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Nuevo Usuario ")
            .style(Style::default().fg(if self.focus_index == FIELD_USERNAME {
                Color::Cyan
            } else {
                Color::White
            }));
        frame.render_widget(
            Paragraph::new(self.username.clone()).block(username_block),
            layout[1].inner(Margin {
                vertical: 0,
                horizontal: 2,
            }),
        );

        let password_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Contraseña ")
            .style(Style::default().fg(if self.focus_index == FIELD_PASSWORD {
                Color::Cyan
            } else {
                Color::White
            }));
        frame.render_widget(
            Paragraph::new("•".repeat(self.password.chars().count())).block(password_block),
            layout[2].inner(Margin {
                vertical: 0,
                horizontal: 2,
            }),
        );

        let role_service = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(layout[3].inner(Margin {
                vertical: 0,
                horizontal: 2,
            }));
        let role_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Rol (←→) ")
            .style(Style::default().fg(if self.focus_index == FIELD_ROLE {
                Color::Cyan
            } else {
                Color::White
            }));
        frame.render_widget(
            Paragraph::new(self.role.to_string()).block(role_block),
            role_service[0],
        );
        let service_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Servicio Asignado ")
            .style(Style::default().fg(match (self.focus_index, self.role) {
                (FIELD_SERVICE, Role::Guest) => Color::Cyan,
                (_, Role::Admin) => Color::DarkGray,
                _ => Color::White,
            }));
        let service_text = match self.role {
            Role::Guest if self.service.is_empty() => Span::styled(
                "Ej: Pediatría",
                Style::default().fg(Color::DarkGray),
            ),
            Role::Guest => Span::raw(self.service.clone()),
            Role::Admin => Span::styled("—", Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(
            Paragraph::new(Line::from(service_text)).block(service_block),
            role_service[1],
        );

        let add_text = if self.focus_index == BUTTON_ADD {
            "► Agregar Usuario ◄"
        } else {
            "  Agregar Usuario  "
        };
        frame.render_widget(
            Paragraph::new(add_text)
                .style(if self.focus_index == BUTTON_ADD {
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                })
                .alignment(Alignment::Center),
            layout[4],
        );

        if let Some(error) = &self.error_message {
            frame.render_widget(
                Paragraph::new(error.as_str())
                    .style(Style::default().fg(Color::Red))
                    .alignment(Alignment::Center),
                layout[5],
            );
        } else if let Some(info) = &self.info_message {
            frame.render_widget(
                Paragraph::new(info.as_str())
                    .style(Style::default().fg(Color::Green))
                    .alignment(Alignment::Center),
                layout[5],
            );
        }

        let items: Vec<ListItem> = users
            .iter()
            .map(|user| {
                let mut line = format!("{}  [{}]", user.username, user.role);
                if let Some(service) = user.guest_service() {
                    line.push_str(&format!("  ({service})"));
                }
                ListItem::new(line)
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Usuarios Existentes ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(if self.focus_index == ZONE_LIST {
                        Color::Cyan
                    } else {
                        Color::White
                    })),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("► ");
        frame.render_stateful_widget(list, layout[6], &mut self.list_state.clone());

        frame.render_widget(
            Paragraph::new(
                "Tab: Formulario/Lista | Enter: Agregar | d: Eliminar usuario | Esc: Volver",
            )
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
            layout[7],
        );

        if let Some(username) = &self.confirm_delete {
            let area = centered_rect(60, 35, frame.area());
            frame.render_widget(Clear, area);
            let dialog = Paragraph::new(vec![
                Line::from(format!(
                    "¿Está seguro de que desea eliminar al usuario \"{username}\"?"
                )),
                Line::from(
                    "Se eliminarán también todas sus solicitudes pendientes y notificaciones \
                     asociadas.",
                ),
                Line::from("Esta acción no se puede deshacer."),
                Line::from(""),
                Line::from(vec![
                    Span::styled(
                        " Confirmar Eliminación ",
                        Style::default().fg(if self.delete_selected == 0 {
                            Color::Red
                        } else {
                            Color::DarkGray
                        }),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        " Cancelar ",
                        Style::default().fg(if self.delete_selected == 1 {
                            Color::Green
                        } else {
                            Color::DarkGray
                        }),
                    ),
                ]),
            ])
            .block(
                Block::default()
                    .title(" Confirmar Eliminación de Usuario ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            frame.render_widget(dialog, area);
        }
    }
}

impl Default for ManageUsers {
    fn default() -> Self {
        Self::new()
    }
}
