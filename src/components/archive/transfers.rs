//! Incoming transfers: the destination service accepts or rejects custody
//! of folders offered by other services.

use crate::app::SelectedApp;
use crate::components::Ctx;
use crate::engine::views;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

pub struct IncomingTransfers {
    table_state: TableState,
    error_message: Option<String>,
    info_message: Option<String>,
}

impl IncomingTransfers {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
            error_message: None,
            info_message: None,
        }
    }

    fn visible_ids(&self, ctx: &Ctx) -> Vec<i64> {
        let Some(user) = ctx.session.user() else {
            return Vec::new();
        };
        views::incoming_transfers(ctx.engine.data(), user)
            .iter()
            .map(|t| t.id)
            .collect()
    }

    fn selected_transfer_id(&self, ctx: &Ctx) -> Option<i64> {
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

        match key.code {
            KeyCode::Down => self.move_selection(ctx, 1),
            KeyCode::Up => self.move_selection(ctx, -1),
            KeyCode::Char('a') => {
                if let Some(transfer_id) = self.selected_transfer_id(ctx) {
                    self.error_message = None;
                    self.info_message = None;
                    match ctx.engine.accept_transfer(&user, transfer_id) {
                        Ok(_) => {
                            self.info_message = Some("Transferencia aceptada.".to_string())
                        }
                        Err(err) => self.error_message = Some(err.to_string()),
                    }
                }
            }
            KeyCode::Char('r') => {
                if let Some(transfer_id) = self.selected_transfer_id(ctx) {
                    self.error_message = None;
                    self.info_message = None;
                    match ctx.engine.reject_transfer(&user, transfer_id) {
                        Ok(()) => {
                            self.info_message = Some(
                                "Transferencia rechazada. Se ha notificado al solicitante."
                                    .to_string(),
                            )
                        }
                        Err(err) => self.error_message = Some(err.to_string()),
                    }
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
        let transfers = views::incoming_transfers(ctx.engine.data(), user);

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
            Paragraph::new(format!("TRANSFERENCIAS PENDIENTES ({})", transfers.len()))
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center),
            layout[0],
        );

        let header = Row::new(
            ["N° H.C.", "Desde", "Hacia", "Solicitante"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .height(1)
        .bottom_margin(1);
        let rows = transfers.iter().map(|transfer| {
            Row::new(vec![
                Cell::from(transfer.hc_number.clone()),
                Cell::from(transfer.from_service.clone()),
                Cell::from(transfer.to_service.clone()),
                Cell::from(transfer.requester_name.clone()),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(" Transferencias Entrantes ")
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

        frame.render_widget(
            Paragraph::new("↑↓: Navegar | a: Aceptar | r: Rechazar | Esc: Volver")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            layout[3],
        );
    }
}

impl Default for IncomingTransfers {
    fn default() -> Self {
        Self::new()
    }
}
