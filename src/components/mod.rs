use crate::auth::Session;
use crate::engine::Engine;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

pub mod archive;
pub mod home;
pub mod login;

/// What a component acts through: the workflow engine plus the active
/// session. Built fresh for every event and every frame.
pub struct Ctx<'a> {
    pub engine: &'a mut Engine,
    pub session: &'a mut Session,
}

pub trait Component {
    fn handle_input(
        &mut self,
        event: KeyEvent,
        ctx: &mut Ctx,
    ) -> Result<Option<crate::app::SelectedApp>>;
    fn render(&self, frame: &mut Frame, ctx: &Ctx);
}

/// Helper to create a centered rectangle for modal dialogs.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
