//! Loan request form. Guests request folders for their own service; the
//! destination is pre-filled and locked to it.

use crate::app::SelectedApp;
use crate::components::Ctx;
use crate::models::User;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

const FIELD_HC_NUMBERS: usize = 0;
const FIELD_SERVICE: usize = 1;
const BUTTON_SUBMIT: usize = 2;
const BUTTON_BACK: usize = 3;

pub struct SubmitRequest {
    hc_numbers: String,
    service: String,
    focus_index: usize,
    error_message: Option<String>,
    info_message: Option<String>,
    success_message: Option<String>,
}

impl SubmitRequest {
    pub fn new() -> Self {
        Self {
            hc_numbers: String::new(),
            service: String::new(),
            focus_index: FIELD_HC_NUMBERS,
            error_message: None,
            info_message: None,
            success_message: None,
        }
    }

    /// The destination service: the guest's own, or whatever was typed for
    /// accounts without one.
    fn effective_service(&self, user: &User) -> String {
        user.guest_service()
            .map(str::to_string)
            .unwrap_or_else(|| self.service.clone())
    }

    fn submit(&mut self, ctx: &mut Ctx, user: &User) {
        let service = self.effective_service(user);
        match ctx.engine.submit_request(user, &self.hc_numbers, &service) {
            Ok(outcome) => {
                self.success_message = Some(outcome.success_message());
                self.info_message = outcome.info_message();
                self.error_message = None;
                self.hc_numbers.clear();
                self.focus_index = FIELD_HC_NUMBERS;
            }
            Err(err) => {
                self.error_message = Some(err.to_string());
                self.success_message = None;
                self.info_message = None;
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent, ctx: &mut Ctx) -> Result<Option<SelectedApp>> {
        let Some(user) = ctx.session.user().cloned() else {
            return Ok(Some(SelectedApp::None));
        };
        let service_locked = user.guest_service().is_some();

        match key.code {
            KeyCode::Char(c) => match self.focus_index {
                FIELD_HC_NUMBERS => {
                    self.hc_numbers.push(c);
                    self.error_message = None;
                }
                FIELD_SERVICE if !service_locked => {
                    self.service.push(c);
                    self.error_message = None;
                }
                _ => {}
            },
            KeyCode::Backspace => match self.focus_index {
                FIELD_HC_NUMBERS => {
                    self.hc_numbers.pop();
                }
                FIELD_SERVICE if !service_locked => {
                    self.service.pop();
                }
                _ => {}
            },
            KeyCode::Tab | KeyCode::Down => {
                self.focus_index = (self.focus_index + 1) % 4;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_index = (self.focus_index + 3) % 4;
            }
            KeyCode::Enter => match self.focus_index {
                BUTTON_SUBMIT => self.submit(ctx, &user),
                BUTTON_BACK => return Ok(Some(SelectedApp::None)),
                _ => self.focus_index += 1,
            },
            KeyCode::Esc => return Ok(Some(SelectedApp::None)),
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame, ctx: &Ctx) {
        let Some(user) = ctx.session.user() else {
            return;
        };
        let service_locked = user.guest_service().is_some();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Length(3), // HC numbers
                Constraint::Length(3), // Service
                Constraint::Length(3), // Requester
                Constraint::Length(3), // Messages
                Constraint::Length(1), // Submit
                Constraint::Length(1), // Back
                Constraint::Length(1), // Help
                Constraint::Min(0),
            ])
            .margin(1)
            .split(frame.area());

        frame.render_widget(
            Paragraph::new("FORMULARIO DE SOLICITUD")
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center),
            layout[0],
        );

        let hc_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" N° de Historia(s) Clínica(s) ")
            .style(Style::default().fg(if self.focus_index == FIELD_HC_NUMBERS {
                Color::Cyan
            } else {
                Color::White
            }));
        let hc_text = if self.hc_numbers.is_empty() && self.focus_index != FIELD_HC_NUMBERS {
            Span::styled("Ej: 12345, 67890", Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(self.hc_numbers.clone())
        };
        frame.render_widget(
            Paragraph::new(Line::from(hc_text)).block(hc_block),
            layout[1].inner(Margin {
                vertical: 0,
                horizontal: 4,
            }),
        );

        let service_title = if service_locked {
            " Servicio de Destino (asignado) "
        } else {
            " Servicio de Destino "
        };
        let service_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(service_title)
            .style(Style::default().fg(if self.focus_index == FIELD_SERVICE {
                Color::Cyan
            } else {
                Color::White
            }));
        frame.render_widget(
            Paragraph::new(self.effective_service(user)).block(service_block),
            layout[2].inner(Margin {
                vertical: 0,
                horizontal: 4,
            }),
        );

        let requester_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Nombre del Solicitante ")
            .style(Style::default().fg(Color::White));
        frame.render_widget(
            Paragraph::new(user.username.clone()).block(requester_block),
            layout[3].inner(Margin {
                vertical: 0,
                horizontal: 4,
            }),
        );

        let mut message_lines = Vec::new();
        if let Some(error) = &self.error_message {
            message_lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        if let Some(success) = &self.success_message {
            message_lines.push(Line::from(Span::styled(
                success.clone(),
                Style::default().fg(Color::Green),
            )));
        }
        if let Some(info) = &self.info_message {
            message_lines.push(Line::from(Span::styled(
                info.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }
        frame.render_widget(
            Paragraph::new(message_lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            layout[4],
        );

        let submit_text = if self.focus_index == BUTTON_SUBMIT {
            "► Enviar Solicitud ◄"
        } else {
            "  Enviar Solicitud  "
        };
        frame.render_widget(
            Paragraph::new(submit_text)
                .style(if self.focus_index == BUTTON_SUBMIT {
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                })
                .alignment(Alignment::Center),
            layout[5],
        );

        let back_text = if self.focus_index == BUTTON_BACK {
            "► Volver ◄"
        } else {
            "  Volver  "
        };
        frame.render_widget(
            Paragraph::new(back_text)
                .style(if self.focus_index == BUTTON_BACK {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                })
                .alignment(Alignment::Center),
            layout[6],
        );

        frame.render_widget(
            Paragraph::new("Tab/↑↓: Cambiar campo | Enter: Confirmar | Esc: Volver")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            layout[7],
        );
    }
}

impl Default for SubmitRequest {
    fn default() -> Self {
        Self::new()
    }
}
