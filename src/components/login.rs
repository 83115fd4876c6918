//! Login screen.

use crate::app::SelectedApp;
use crate::auth::{self, Credentials};
use crate::components::{centered_rect, Component, Ctx};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use std::time::{Duration, Instant};

const FIELD_USERNAME: usize = 0;
const FIELD_PASSWORD: usize = 1;
const FIELD_EXIT: usize = 2;

/// The login form: username, password and an exit shortcut.
#[derive(Debug, Default)]
pub struct Login {
    pub username: String,
    pub password: String,
    pub selected_index: usize,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub show_exit_dialog: bool,
    pub exit_dialog_selected: usize,
    error_message_time: Option<Instant>,
}

impl Login {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the form for the next session (used after a logout).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn set_error_message(&mut self, message: String) {
        self.error_message = Some(message);
        self.error_message_time = Some(Instant::now());
    }

    fn clear_error_message(&mut self) {
        self.error_message = None;
        self.error_message_time = None;
    }

    /// Hides the error message after a few seconds.
    pub fn check_error_timeout(&mut self) {
        if let Some(time) = self.error_message_time {
            if time.elapsed() >= Duration::from_secs(5) {
                self.clear_error_message();
            }
        }
    }

    fn handle_exit_dialog_input(&mut self, key: KeyEvent) -> Option<SelectedApp> {
        match key.code {
            KeyCode::Left | KeyCode::Right => {
                self.exit_dialog_selected = 1 - self.exit_dialog_selected;
            }
            KeyCode::Enter => {
                if self.exit_dialog_selected == 0 {
                    return Some(SelectedApp::Quit);
                }
                self.show_exit_dialog = false;
            }
            KeyCode::Esc => {
                self.show_exit_dialog = false;
            }
            _ => {}
        }
        None
    }
}

impl Component for Login {
    fn handle_input(&mut self, event: KeyEvent, ctx: &mut Ctx) -> Result<Option<SelectedApp>> {
        self.check_error_timeout();

        if self.show_exit_dialog {
            return Ok(self.handle_exit_dialog_input(event));
        }

        match event.code {
            KeyCode::Char(c) => {
                match self.selected_index {
                    FIELD_USERNAME => self.username.push(c),
                    FIELD_PASSWORD => self.password.push(c),
                    _ => {}
                }
                self.clear_error_message();
            }
            KeyCode::Backspace => {
                match self.selected_index {
                    FIELD_USERNAME => {
                        self.username.pop();
                    }
                    FIELD_PASSWORD => {
                        self.password.pop();
                    }
                    _ => {}
                }
                self.clear_error_message();
            }
            KeyCode::Tab | KeyCode::Down => {
                self.selected_index = (self.selected_index + 1) % 3;
            }
            KeyCode::Up => {
                self.selected_index = (self.selected_index + 2) % 3;
            }
            KeyCode::Enter => {
                if self.selected_index == FIELD_EXIT {
                    self.show_exit_dialog = true;
                    return Ok(None);
                }
                if self.username.is_empty() {
                    self.set_error_message("Ingrese su nombre de usuario.".to_string());
                    return Ok(None);
                }
                if self.password.is_empty() {
                    self.set_error_message("Ingrese su contraseña.".to_string());
                    return Ok(None);
                }
                let credentials = Credentials {
                    username: self.username.clone(),
                    password: self.password.clone(),
                };
                match auth::login(&ctx.engine.data().users, &credentials) {
                    Ok(user) => {
                        ctx.session.sign_in(user);
                        self.password.clear();
                        self.success_message = None;
                        return Ok(Some(SelectedApp::None));
                    }
                    Err(err) => self.set_error_message(err.to_string()),
                }
            }
            KeyCode::Esc => {
                self.show_exit_dialog = true;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, _ctx: &Ctx) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Title
                Constraint::Length(1), // Subtitle
                Constraint::Length(2), // Spacing
                Constraint::Length(3), // Username
                Constraint::Length(3), // Password
                Constraint::Length(2), // Messages
                Constraint::Length(2), // Spacing
                Constraint::Length(1), // Exit
                Constraint::Min(0),
            ])
            .margin(2)
            .split(frame.area());

        let title = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                "CONTROL DE HISTORIAS CLÍNICAS",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Hospital de Quillabamba",
                Style::default().fg(Color::Gray),
            )),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(title, layout[0]);

        let subtitle = Paragraph::new(Span::styled(
            "Ingrese sus credenciales para continuar",
            Style::default().fg(Color::White),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(subtitle, layout[1]);

        let username_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Usuario ")
            .style(Style::default().fg(if self.selected_index == FIELD_USERNAME {
                Color::Cyan
            } else {
                Color::White
            }));
        let username_input = Paragraph::new(self.username.clone()).block(username_block);
        frame.render_widget(
            username_input,
            layout[3].inner(Margin {
                vertical: 0,
                horizontal: 10,
            }),
        );

        let password_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Contraseña ")
            .style(Style::default().fg(if self.selected_index == FIELD_PASSWORD {
                Color::Cyan
            } else {
                Color::White
            }));
        let password_input =
            Paragraph::new("•".repeat(self.password.chars().count())).block(password_block);
        frame.render_widget(
            password_input,
            layout[4].inner(Margin {
                vertical: 0,
                horizontal: 10,
            }),
        );

        if let Some(error) = &self.error_message {
            let error_paragraph = Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center);
            frame.render_widget(error_paragraph, layout[5]);
        } else if let Some(message) = &self.success_message {
            let message_paragraph = Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Green))
                .alignment(Alignment::Center);
            frame.render_widget(message_paragraph, layout[5]);
        }

        let exit_text = Paragraph::new(Span::styled(
            "Salir",
            Style::default()
                .fg(if self.selected_index == FIELD_EXIT {
                    Color::Yellow
                } else {
                    Color::Gray
                })
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(exit_text, layout[7]);

        if self.show_exit_dialog {
            let dialog_area = centered_rect(50, 20, frame.area());
            let dialog_block = Block::default()
                .title(" Confirmar Salida ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded);

            let text = vec![
                Line::from("¿Está seguro de que desea salir?"),
                Line::from(""),
                Line::from(vec![
                    Span::styled(
                        " Sí ",
                        Style::default().fg(if self.exit_dialog_selected == 0 {
                            Color::Green
                        } else {
                            Color::DarkGray
                        }),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        " No ",
                        Style::default().fg(if self.exit_dialog_selected == 1 {
                            Color::Red
                        } else {
                            Color::DarkGray
                        }),
                    ),
                ]),
            ];

            let dialog_paragraph = Paragraph::new(text)
                .block(dialog_block)
                .alignment(Alignment::Center);

            frame.render_widget(Clear, dialog_area);
            frame.render_widget(dialog_paragraph, dialog_area);
        }
    }
}
