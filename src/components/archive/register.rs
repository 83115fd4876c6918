//! Loan registration form (admin): direct loans and single-record edits.

use crate::components::Ctx;
use crate::engine::LoanForm;
use crate::models::{now_stamp, Record};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

const FIELD_HC_NUMBERS: usize = 0;
const FIELD_SERVICE: usize = 1;
const FIELD_RESPONSIBLE: usize = 2;
const FIELD_PHONE: usize = 3;
const FIELD_DATE: usize = 4;
const BUTTON_SUBMIT: usize = 5;
const BUTTON_BACK: usize = 6;

const FIELD_TITLES: [&str; 5] = [
    " N° de Historia(s) Clínica(s) ",
    " Servicio de Destino ",
    " Responsable del Préstamo ",
    " Celular del Responsable ",
    " Fecha y Hora de Préstamo ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAction {
    Back,
}

/// The registration form. In edit mode it carries the id of the record
/// being updated and returns to the list when done.
pub struct RegisterLoan {
    fields: [String; 5],
    focus_index: usize,
    editing_id: Option<i64>,
    from_list: bool,
    error_message: Option<String>,
    success_message: Option<String>,
}

impl RegisterLoan {
    pub fn new() -> Self {
        let mut fields: [String; 5] = Default::default();
        fields[FIELD_DATE] = now_stamp();
        Self {
            fields,
            focus_index: FIELD_HC_NUMBERS,
            editing_id: None,
            from_list: false,
            error_message: None,
            success_message: None,
        }
    }

    /// Switches the form into edit mode for an existing record.
    pub fn start_edit(&mut self, record: &Record) {
        self.fields = [
            record.hc_number.clone(),
            record.destination_service.clone(),
            record.responsible.clone(),
            record.responsible_phone_number.clone(),
            record.request_date.clone(),
        ];
        self.focus_index = FIELD_HC_NUMBERS;
        self.editing_id = Some(record.id);
        self.from_list = true;
        self.error_message = None;
        self.success_message = None;
    }

    pub fn came_from_list(&self) -> bool {
        self.from_list
    }

    fn form(&self) -> LoanForm {
        LoanForm {
            hc_numbers: self.fields[FIELD_HC_NUMBERS].clone(),
            destination_service: self.fields[FIELD_SERVICE].clone(),
            responsible: self.fields[FIELD_RESPONSIBLE].clone(),
            responsible_phone_number: self.fields[FIELD_PHONE].clone(),
            request_date: self.fields[FIELD_DATE].clone(),
        }
    }

    fn submit(&mut self, ctx: &mut Ctx) -> Option<RegisterAction> {
        let Some(user) = ctx.session.user().cloned() else {
            return None;
        };
        match ctx.engine.register_loan(&user, &self.form(), self.editing_id) {
            Ok(ids) => {
                if self.editing_id.is_some() {
                    // Editing jumps back to the list it came from.
                    return Some(RegisterAction::Back);
                }
                self.success_message = Some(format!(
                    "Préstamo registrado: {} historia(s) clínica(s).",
                    ids.len()
                ));
                self.error_message = None;
                self.fields = Default::default();
                self.fields[FIELD_DATE] = now_stamp();
                self.focus_index = FIELD_HC_NUMBERS;
                None
            }
            Err(err) => {
                self.error_message = Some(err.to_string());
                self.success_message = None;
                None
            }
        }
    }

    pub fn handle_input(
        &mut self,
        key: KeyEvent,
        ctx: &mut Ctx,
    ) -> Result<Option<RegisterAction>> {
        match key.code {
            KeyCode::Char(c) => {
                if self.focus_index < self.fields.len() {
                    self.fields[self.focus_index].push(c);
                    self.error_message = None;
                }
            }
            KeyCode::Backspace => {
                if self.focus_index < self.fields.len() {
                    self.fields[self.focus_index].pop();
                    self.error_message = None;
                }
            }
            KeyCode::Tab | KeyCode::Down => {
                self.focus_index = (self.focus_index + 1) % 7;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_index = (self.focus_index + 6) % 7;
            }
            KeyCode::Enter => match self.focus_index {
                BUTTON_SUBMIT => return Ok(self.submit(ctx)),
                BUTTON_BACK => return Ok(Some(RegisterAction::Back)),
                _ => self.focus_index += 1,
            },
            KeyCode::Esc => return Ok(Some(RegisterAction::Back)),
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame, _ctx: &Ctx) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Length(3), // HC numbers
                Constraint::Length(3), // Service
                Constraint::Length(3), // Responsible
                Constraint::Length(3), // Phone
                Constraint::Length(3), // Date
                Constraint::Length(2), // Messages
                Constraint::Length(1), // Submit
                Constraint::Length(1), // Back
                Constraint::Length(1), // Help
                Constraint::Min(0),
            ])
            .margin(1)
            .split(frame.area());

        let title = if self.editing_id.is_some() {
            "EDITAR PRÉSTAMO"
        } else {
            "FORMULARIO DE PRÉSTAMO"
        };
        frame.render_widget(
            Paragraph::new(title)
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center),
            layout[0],
        );

        for (idx, value) in self.fields.iter().enumerate() {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(FIELD_TITLES[idx])
                .style(Style::default().fg(if self.focus_index == idx {
                    Color::Cyan
                } else {
                    Color::White
                }));
            let hint = match idx {
                FIELD_HC_NUMBERS => "Ej: 12345, 67890",
                FIELD_PHONE => "Ej: 987654321",
                _ => "",
            };
            let text = if value.is_empty() && self.focus_index != idx {
                Span::styled(hint, Style::default().fg(Color::DarkGray))
            } else {
                Span::raw(value.clone())
            };
            frame.render_widget(
                Paragraph::new(Line::from(text)).block(block),
                layout[idx + 1].inner(Margin {
                    vertical: 0,
                    horizontal: 4,
                }),
            );
        }

        if let Some(error) = &self.error_message {
            frame.render_widget(
                Paragraph::new(error.as_str())
                    .style(Style::default().fg(Color::Red))
                    .alignment(Alignment::Center)
                    .wrap(ratatui::widgets::Wrap { trim: true }),
                layout[6],
            );
        } else if let Some(message) = &self.success_message {
            frame.render_widget(
                Paragraph::new(message.as_str())
                    .style(Style::default().fg(Color::Green))
                    .alignment(Alignment::Center),
                layout[6],
            );
        }

        let submit_label = if self.editing_id.is_some() {
            "Actualizar"
        } else {
            "Registrar Préstamo"
        };
        let submit_text = if self.focus_index == BUTTON_SUBMIT {
            format!("► {submit_label} ◄")
        } else {
            submit_label.to_string()
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
            layout[7],
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
            layout[8],
        );

        frame.render_widget(
            Paragraph::new("Tab/↑↓: Cambiar campo | Enter: Confirmar | Esc: Volver")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            layout[9],
        );
    }
}

impl Default for RegisterLoan {
    fn default() -> Self {
        Self::new()
    }
}
