//! Pending loan requests: administrators approve or reject them, guests see
//! the ones addressed to their own service.

use crate::app::SelectedApp;
use crate::components::{centered_rect, Ctx};
use crate::engine::views;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

/// Reason prompt shown while rejecting a request.
struct RejectionPrompt {
    request_id: i64,
    hc_numbers: String,
    reason: String,
}

pub struct ReviewRequests {
    table_state: TableState,
    rejection: Option<RejectionPrompt>,
    error_message: Option<String>,
    info_message: Option<String>,
}

impl ReviewRequests {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
            rejection: None,
            error_message: None,
            info_message: None,
        }
    }

    fn visible_ids(&self, ctx: &Ctx) -> Vec<i64> {
        let Some(user) = ctx.session.user() else {
            return Vec::new();
        };
        views::visible_requests(ctx.engine.data(), user)
            .iter()
            .map(|r| r.id)
            .collect()
    }

    fn selected_request_id(&self, ctx: &Ctx) -> Option<i64> {
        let ids = self.visible_ids(ctx);
        self.table_state.selected().and_then(|i| ids.get(i).copied())
    }

    fn move_selection(&mut self, ctx: &Ctx, delta: isize) {
        let count = self.visible_ids(ctx).len();
        if count == 0 {
            self.table_state.select(None);
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(count as isize) as usize;
        self.table_state.select(Some(next));
    }

    pub fn handle_input(&mut self, key: KeyEvent, ctx: &mut Ctx) -> Result<Option<SelectedApp>> {
        let Some(user) = ctx.session.user().cloned() else {
            return Ok(Some(SelectedApp::None));
        };

        if let Some(prompt) = &mut self.rejection {
            match key.code {
                KeyCode::Char(c) => prompt.reason.push(c),
                KeyCode::Backspace => {
                    prompt.reason.pop();
                }
                KeyCode::Esc => self.rejection = None,
                KeyCode::Enter => {
                    let request_id = prompt.request_id;
                    let reason = prompt.reason.clone();
                    match ctx.engine.reject_request(&user, request_id, &reason) {
                        Ok(()) => {
                            self.rejection = None;
                            self.info_message =
                                Some("Solicitud rechazada. Se ha notificado al solicitante."
                                    .to_string());
                        }
                        Err(err) => self.error_message = Some(err.to_string()),
                    }
                }
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Down => self.move_selection(ctx, 1),
            KeyCode::Up => self.move_selection(ctx, -1),
            KeyCode::Char('a') if user.is_admin() => {
                if let Some(request_id) = self.selected_request_id(ctx) {
                    self.error_message = None;
                    self.info_message = None;
                    match ctx.engine.approve_request(&user, request_id) {
                        Ok(created) => {
                            self.info_message = Some(format!(
                                "Solicitud aprobada: {} préstamo(s) registrado(s).",
                                created.len()
                            ))
                        }
                        Err(err) => self.error_message = Some(err.to_string()),
                    }
                }
            }
            KeyCode::Char('r') if user.is_admin() => {
                let request = self.selected_request_id(ctx).and_then(|id| {
                    ctx.engine
                        .data()
                        .requests
                        .iter()
                        .find(|r| r.id == id)
                        .cloned()
                });
                if let Some(request) = request {
                    self.error_message = None;
                    self.info_message = None;
                    self.rejection = Some(RejectionPrompt {
                        request_id: request.id,
                        hc_numbers: request.hc_numbers,
                        reason: String::new(),
                    });
                }
            }
            KeyCode::Char('b') | KeyCode::Esc => return Ok(Some(SelectedApp::None)),
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame, ctx: &Ctx) {
        let Some(user) = ctx.session.user() else {
            return;
        };
        let requests = views::visible_requests(ctx.engine.data(), user);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Min(6),    // Table
                Constraint::Length(1), // Messages
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(frame.area());

        frame.render_widget(
            Paragraph::new(format!("SOLICITUDES PENDIENTES ({})", requests.len()))
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center),
            layout[0],
        );

        let header = Row::new(
            ["N° H.C.", "Servicio", "Solicitante"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .height(1)
        .bottom_margin(1);
        let rows = requests.iter().map(|request| {
            let self_request =
                user.is_admin() && request.requester_name == user.username;
            let mut requester = request.requester_name.clone();
            if self_request {
                // Cannot be approved by its own requester.
                requester.push_str(" (propia)");
            }
            Row::new(vec![
                Cell::from(request.hc_numbers.clone()),
                Cell::from(request.destination_service.clone()),
                Cell::from(requester),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(" Solicitudes ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, layout[1], &mut self.table_state.clone());

        if let Some(error) = &self.error_message {
            frame.render_widget(
                Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
                layout[2],
            );
        } else if let Some(info) = &self.info_message {
            frame.render_widget(
                Paragraph::new(info.as_str()).style(Style::default().fg(Color::Green)),
                layout[2],
            );
        }

        let help = if user.is_admin() {
            "↑↓: Navegar | a: Aprobar | r: Rechazar | Esc: Volver"
        } else {
            "↑↓: Navegar | Esc: Volver"
        };
        frame.render_widget(
            Paragraph::new(help)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            layout[3],
        );

        if let Some(prompt) = &self.rejection {
            let area = centered_rect(60, 35, frame.area());
            frame.render_widget(Clear, area);
            let block = Block::default()
                .title(" Rechazar Solicitud ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded);
            let inner = block.inner(area);
            frame.render_widget(block, area);

            let rows = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(2),
                    Constraint::Length(3),
                    Constraint::Length(1),
                ])
                .split(inner);
            frame.render_widget(
                Paragraph::new(format!(
                    "H.C. {}: ingrese el motivo del rechazo. El solicitante será notificado.",
                    prompt.hc_numbers
                ))
                .wrap(Wrap { trim: true }),
                rows[0],
            );
            let reason_block = Block::default()
                .borders(Borders::ALL)
                .title(" Motivo del Rechazo ")
                .style(Style::default().fg(Color::Cyan));
            frame.render_widget(
                Paragraph::new(prompt.reason.clone()).block(reason_block),
                rows[1],
            );
            frame.render_widget(
                Paragraph::new("Enter: Confirmar Rechazo | Esc: Cancelar")
                    .style(Style::default().fg(Color::DarkGray)),
                rows[2],
            );
        }
    }
}

impl Default for ReviewRequests {
    fn default() -> Self {
        Self::new()
    }
}
