//! Notification panel. Opening it marks the owner's notifications as read
//! (the application does that on entry); this component only lists them.

use crate::app::SelectedApp;
use crate::components::Ctx;
use crate::engine::views;
use crate::models::NotificationKind;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use time::macros::format_description;
use time::OffsetDateTime;

pub struct NotificationsPanel {
    list_state: ListState,
}

impl NotificationsPanel {
    pub fn new() -> Self {
        Self {
            list_state: ListState::default(),
        }
    }

    fn count(&self, ctx: &Ctx) -> usize {
        match ctx.session.user() {
            Some(user) => views::notifications_for(ctx.engine.data(), &user.username).len(),
            None => 0,
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent, ctx: &mut Ctx) -> Result<Option<SelectedApp>> {
        match key.code {
            KeyCode::Down => {
                let count = self.count(ctx);
                if count > 0 {
                    let next = match self.list_state.selected() {
                        Some(i) if i + 1 >= count => 0,
                        Some(i) => i + 1,
                        None => 0,
                    };
                    self.list_state.select(Some(next));
                }
            }
            KeyCode::Up => {
                let count = self.count(ctx);
                if count > 0 {
                    let previous = match self.list_state.selected() {
                        Some(0) | None => count - 1,
                        Some(i) => i - 1,
                    };
                    self.list_state.select(Some(previous));
                }
            }
            KeyCode::Char('b') | KeyCode::Esc | KeyCode::Enter => {
                return Ok(Some(SelectedApp::None))
            }
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame, ctx: &Ctx) {
        let Some(user) = ctx.session.user() else {
            return;
        };
        let notifications = views::notifications_for(ctx.engine.data(), &user.username);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Min(5),    // List
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(frame.area());

        frame.render_widget(
            Paragraph::new(format!("NOTIFICACIONES ({})", notifications.len()))
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center),
            layout[0],
        );

        if notifications.is_empty() {
            frame.render_widget(
                Paragraph::new("No tiene notificaciones.")
                    .alignment(Alignment::Center)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    ),
                layout[1],
            );
        } else {
            let items: Vec<ListItem> = notifications
                .iter()
                .map(|notification| {
                    let color = match notification.kind {
                        NotificationKind::Rejection => Color::Red,
                        NotificationKind::Approval => Color::Green,
                    };
                    let marker = if notification.is_read { "  " } else { "● " };
                    ListItem::new(vec![
                        Line::from(Span::styled(
                            format!("{marker}{}", notification.message),
                            Style::default().fg(color),
                        )),
                        Line::from(Span::styled(
                            format!("  {}", format_millis(notification.timestamp)),
                            Style::default().fg(Color::DarkGray),
                        )),
                    ])
                })
                .collect();
            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded),
                )
                .highlight_style(Style::default().bg(Color::DarkGray));
            frame.render_stateful_widget(list, layout[1], &mut self.list_state.clone());
        }

        frame.render_widget(
            Paragraph::new("↑↓: Navegar | Esc: Volver")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            layout[2],
        );
    }
}

/// Renders a unix-millisecond timestamp for display.
fn format_millis(millis: i64) -> String {
    let Ok(datetime) = OffsetDateTime::from_unix_timestamp(millis / 1000) else {
        return "Fecha inválida".to_string();
    };
    datetime
        .format(format_description!(
            "[day]/[month]/[year] [hour]:[minute]"
        ))
        .unwrap_or_else(|_| "Fecha inválida".to_string())
}

impl Default for NotificationsPanel {
    fn default() -> Self {
        Self::new()
    }
}
