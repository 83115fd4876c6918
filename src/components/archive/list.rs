//! Record list: the filtered, sorted view of every loan cycle, with the
//! role-dependent actions on the selected record and the export surfaces.

use crate::components::{centered_rect, Ctx};
use crate::engine::views;
use crate::export;
use crate::models::{now_stamp, ClinicalDetails, Record, RecordStatus, User};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Back,
    /// Jump into the registration form to edit this record.
    Edit(i64),
}

/// Modal dialogs layered over the list.
enum Modal {
    None,
    ConfirmReturn {
        record_id: i64,
        date: String,
        staff: String,
        focus: usize,
    },
    ConfirmDelete {
        record_id: i64,
        selected: usize,
    },
    Transfer {
        record_id: i64,
        hc_number: String,
        services: Vec<String>,
        selected: usize,
    },
    History {
        hc_number: String,
        antecedents: String,
        notes: String,
        focus: usize,
        confirm_delete: bool,
        delete_selected: usize,
    },
}

pub struct RecordList {
    table_state: TableState,
    search: String,
    searching: bool,
    /// 0 = all services, n = the (n-1)-th entry of the distinct-service list.
    service_filter_index: usize,
    modal: Modal,
    error_message: Option<String>,
    info_message: Option<String>,
}

impl RecordList {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
            search: String::new(),
            searching: false,
            service_filter_index: 0,
            modal: Modal::None,
            error_message: None,
            info_message: None,
        }
    }

    fn service_filter(&self, ctx: &Ctx) -> Option<String> {
        if self.service_filter_index == 0 {
            return None;
        }
        views::unique_services(ctx.engine.data())
            .get(self.service_filter_index - 1)
            .cloned()
    }

    /// The rows currently on screen, in display order.
    fn visible_ids(&self, ctx: &Ctx, user: &User) -> Vec<i64> {
        let filter = self.service_filter(ctx);
        views::filtered_records(ctx.engine.data(), user, &self.search, filter.as_deref())
            .iter()
            .map(|r| r.id)
            .collect()
    }

    fn selected_record_id(&self, ctx: &Ctx, user: &User) -> Option<i64> {
        let ids = self.visible_ids(ctx, user);
        self.table_state.selected().and_then(|i| ids.get(i).copied())
    }

    fn select_next(&mut self, row_count: usize) {
        if row_count == 0 {
            self.table_state.select(None);
            return;
        }
        let next = match self.table_state.selected() {
            Some(i) if i + 1 >= row_count => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(next));
    }

    fn select_previous(&mut self, row_count: usize) {
        if row_count == 0 {
            self.table_state.select(None);
            return;
        }
        let previous = match self.table_state.selected() {
            Some(0) | None => row_count - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(previous));
    }

    fn clear_messages(&mut self) {
        self.error_message = None;
        self.info_message = None;
    }

    fn export_spreadsheet(&mut self, ctx: &Ctx, user: &User) {
        let filter = self.service_filter(ctx);
        let records =
            views::filtered_records(ctx.engine.data(), user, &self.search, filter.as_deref());
        let path = format!("{}.csv", export::EXPORT_BASENAME);
        match std::fs::write(&path, export::spreadsheet_csv(&records)) {
            Ok(()) => self.info_message = Some(format!("Listado exportado a {path}.")),
            Err(err) => self.error_message = Some(format!("No se pudo exportar: {err}")),
        }
    }

    fn export_report(&mut self, ctx: &Ctx, user: &User) {
        let filter = self.service_filter(ctx);
        let records =
            views::filtered_records(ctx.engine.data(), user, &self.search, filter.as_deref());
        let path = format!("{}.txt", export::EXPORT_BASENAME);
        match std::fs::write(&path, export::printable_report(&records)) {
            Ok(()) => self.info_message = Some(format!("Reporte exportado a {path}.")),
            Err(err) => self.error_message = Some(format!("No se pudo exportar: {err}")),
        }
    }

    fn open_history(&mut self, ctx: &Ctx, hc_number: String) {
        let details = ctx
            .engine
            .data()
            .clinical_details
            .get(&hc_number)
            .cloned()
            .unwrap_or_default();
        self.modal = Modal::History {
            hc_number,
            antecedents: details.antecedents,
            notes: details.notes,
            focus: 0,
            confirm_delete: false,
            delete_selected: 1,
        };
    }

    fn open_transfer(&mut self, ctx: &Ctx, user: &User, record: &Record) {
        let services: Vec<String> = views::guest_services(ctx.engine.data())
            .into_iter()
            .filter(|s| Some(s.as_str()) != user.guest_service())
            .collect();
        self.modal = Modal::Transfer {
            record_id: record.id,
            hc_number: record.hc_number.clone(),
            services,
            selected: 0,
        };
    }

    /// Handles input while a modal is open. Returns true when the event was
    /// consumed by a modal.
    fn handle_modal_input(&mut self, key: KeyEvent, ctx: &mut Ctx, user: &User) -> bool {
        let modal = std::mem::replace(&mut self.modal, Modal::None);
        match modal {
            Modal::None => false,
            Modal::ConfirmReturn {
                record_id,
                mut date,
                mut staff,
                mut focus,
            } => {
                match key.code {
                    KeyCode::Esc => return true,
                    KeyCode::Tab | KeyCode::Up | KeyCode::Down => focus = 1 - focus,
                    KeyCode::Char(c) => {
                        if focus == 0 {
                            date.push(c);
                        } else {
                            staff.push(c);
                        }
                    }
                    KeyCode::Backspace => {
                        if focus == 0 {
                            date.pop();
                        } else {
                            staff.pop();
                        }
                    }
                    KeyCode::Enter => {
                        match ctx.engine.confirm_return(user, record_id, &date, &staff) {
                            Ok(()) => {
                                self.info_message =
                                    Some("Devolución registrada con éxito.".to_string());
                                return true;
                            }
                            Err(err) => self.error_message = Some(err.to_string()),
                        }
                    }
                    _ => {}
                }
                self.modal = Modal::ConfirmReturn {
                    record_id,
                    date,
                    staff,
                    focus,
                };
                true
            }
            Modal::ConfirmDelete {
                record_id,
                mut selected,
            } => {
                match key.code {
                    KeyCode::Esc => return true,
                    KeyCode::Left | KeyCode::Right => selected = 1 - selected,
                    KeyCode::Enter => {
                        if selected == 0 {
                            if let Err(err) = ctx.engine.delete_record(user, record_id) {
                                self.error_message = Some(err.to_string());
                            }
                        }
                        return true;
                    }
                    _ => {}
                }
                self.modal = Modal::ConfirmDelete {
                    record_id,
                    selected,
                };
                true
            }
            Modal::Transfer {
                record_id,
                hc_number,
                services,
                mut selected,
            } => {
                match key.code {
                    KeyCode::Esc => return true,
                    KeyCode::Up => {
                        if !services.is_empty() {
                            selected = (selected + services.len() - 1) % services.len();
                        }
                    }
                    KeyCode::Down => {
                        if !services.is_empty() {
                            selected = (selected + 1) % services.len();
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(service) = services.get(selected) {
                            match ctx.engine.request_transfer(user, record_id, service) {
                                Ok(_) => {
                                    self.info_message = Some(
                                        "Solicitud de transferencia enviada. El servicio de \
                                         destino debe aceptarla."
                                            .to_string(),
                                    );
                                    return true;
                                }
                                Err(err) => self.error_message = Some(err.to_string()),
                            }
                        }
                    }
                    _ => {}
                }
                self.modal = Modal::Transfer {
                    record_id,
                    hc_number,
                    services,
                    selected,
                };
                true
            }
            Modal::History {
                hc_number,
                mut antecedents,
                mut notes,
                mut focus,
                mut confirm_delete,
                mut delete_selected,
            } => {
                if confirm_delete {
                    match key.code {
                        KeyCode::Left | KeyCode::Right => delete_selected = 1 - delete_selected,
                        KeyCode::Enter => {
                            if delete_selected == 0 {
                                match ctx.engine.delete_history(user, &hc_number) {
                                    Ok(()) => {
                                        self.info_message = Some(format!(
                                            "Historia clínica {hc_number} eliminada por completo."
                                        ));
                                        return true;
                                    }
                                    Err(err) => self.error_message = Some(err.to_string()),
                                }
                            }
                            confirm_delete = false;
                        }
                        KeyCode::Esc => confirm_delete = false,
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Esc => return true,
                        KeyCode::Tab => focus = 1 - focus,
                        KeyCode::Char(c) if user.is_admin() => {
                            if focus == 0 {
                                antecedents.push(c);
                            } else {
                                notes.push(c);
                            }
                        }
                        KeyCode::Backspace if user.is_admin() => {
                            if focus == 0 {
                                antecedents.pop();
                            } else {
                                notes.pop();
                            }
                        }
                        KeyCode::Enter if user.is_admin() => {
                            let details = ClinicalDetails {
                                antecedents: antecedents.clone(),
                                notes: notes.clone(),
                            };
                            match ctx.engine.save_clinical_details(user, &hc_number, details) {
                                Ok(()) => {
                                    self.info_message = Some("Detalles guardados.".to_string())
                                }
                                Err(err) => self.error_message = Some(err.to_string()),
                            }
                        }
                        KeyCode::Delete if user.is_admin() => {
                            confirm_delete = true;
                            delete_selected = 1;
                        }
                        _ => {}
                    }
                }
                self.modal = Modal::History {
                    hc_number,
                    antecedents,
                    notes,
                    focus,
                    confirm_delete,
                    delete_selected,
                };
                true
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent, ctx: &mut Ctx) -> Result<Option<ListAction>> {
        let Some(user) = ctx.session.user().cloned() else {
            return Ok(Some(ListAction::Back));
        };

        if self.handle_modal_input(key, ctx, &user) {
            return Ok(None);
        }

        if self.searching {
            match key.code {
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.table_state.select(None);
                }
                KeyCode::Backspace => {
                    self.search.pop();
                }
                KeyCode::Enter | KeyCode::Esc => self.searching = false,
                _ => {}
            }
            return Ok(None);
        }

        let row_count = self.visible_ids(ctx, &user).len();
        match key.code {
            KeyCode::Down => self.select_next(row_count),
            KeyCode::Up => self.select_previous(row_count),
            KeyCode::Char('/') => {
                self.searching = true;
                self.clear_messages();
            }
            KeyCode::Char('f') if user.is_admin() => {
                let services = views::unique_services(ctx.engine.data()).len();
                self.service_filter_index = (self.service_filter_index + 1) % (services + 1);
                self.table_state.select(None);
            }
            KeyCode::Enter => {
                let record = self.selected_record_id(ctx, &user).and_then(|id| {
                    ctx.engine.data().records.iter().find(|r| r.id == id).cloned()
                });
                if let Some(record) = record {
                    self.clear_messages();
                    self.open_history(ctx, record.hc_number);
                }
            }
            KeyCode::Char('e') if user.is_admin() => {
                if let Some(id) = self.selected_record_id(ctx, &user) {
                    return Ok(Some(ListAction::Edit(id)));
                }
            }
            KeyCode::Char('d') if user.is_admin() => {
                if let Some(id) = self.selected_record_id(ctx, &user) {
                    self.clear_messages();
                    self.modal = Modal::ConfirmDelete {
                        record_id: id,
                        selected: 1,
                    };
                }
            }
            KeyCode::Char('r') if user.is_admin() => {
                // Reception of the folder back into the archive, normally on
                // a pending return but open to any record.
                if let Some(id) = self.selected_record_id(ctx, &user) {
                    self.clear_messages();
                    self.modal = Modal::ConfirmReturn {
                        record_id: id,
                        date: now_stamp(),
                        staff: user.username.clone(),
                        focus: 1,
                    };
                }
            }
            KeyCode::Char('v') if !user.is_admin() => {
                if let Some(id) = self.selected_record_id(ctx, &user) {
                    self.clear_messages();
                    match ctx.engine.request_return(&user, id) {
                        Ok(()) => {
                            self.info_message = Some(
                                "Solicitud de devolución enviada con éxito. El administrador \
                                 será notificado para confirmar la recepción."
                                    .to_string(),
                            )
                        }
                        Err(err) => self.error_message = Some(err.to_string()),
                    }
                }
            }
            KeyCode::Char('t') if !user.is_admin() => {
                let record = self.selected_record_id(ctx, &user).and_then(|id| {
                    ctx.engine.data().records.iter().find(|r| r.id == id).cloned()
                });
                if let Some(record) = record {
                    self.clear_messages();
                    if views::transfer_pending_ids(ctx.engine.data()).contains(&record.id) {
                        self.error_message = Some(
                            "Ya existe una transferencia pendiente para este registro."
                                .to_string(),
                        );
                    } else {
                        self.open_transfer(ctx, &user, &record);
                    }
                }
            }
            KeyCode::Char('x') => {
                self.clear_messages();
                self.export_spreadsheet(ctx, &user);
            }
            KeyCode::Char('p') => {
                self.clear_messages();
                self.export_report(ctx, &user);
            }
            KeyCode::Char('b') | KeyCode::Esc => return Ok(Some(ListAction::Back)),
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame, ctx: &Ctx) {
        let Some(user) = ctx.session.user() else {
            return;
        };
        let data = ctx.engine.data();
        let filter = self.service_filter(ctx);
        let records = views::filtered_records(data, user, &self.search, filter.as_deref());
        let pending_transfers = views::transfer_pending_ids(data);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Length(1), // Filters
                Constraint::Min(8),    // Table
                Constraint::Length(1), // Messages
                Constraint::Length(2), // Help
            ])
            .margin(1)
            .split(frame.area());

        frame.render_widget(
            Paragraph::new(format!("LISTADO DE HISTORIAS CLÍNICAS ({})", records.len()))
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center),
            layout[0],
        );

        let filter_label = filter.as_deref().unwrap_or("Todos los Servicios");
        let search_label = if self.searching {
            format!("Buscar: {}▏", self.search)
        } else if self.search.is_empty() {
            "Buscar: (presione /)".to_string()
        } else {
            format!("Buscar: {}", self.search)
        };
        frame.render_widget(
            Paragraph::new(format!("Servicio: {filter_label}  |  {search_label}"))
                .style(Style::default().fg(Color::Gray)),
            layout[1],
        );

        let header = Row::new(
            [
                "N° H.C.",
                "Servicio",
                "Responsable",
                "Celular",
                "F. Préstamo",
                "F. Devolución",
                "Recepcionado por",
                "Estado",
            ]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .height(1)
        .bottom_margin(1);

        let rows = records.iter().map(|record| {
            let status_style = match record.status {
                RecordStatus::Loaned => Style::default().fg(Color::Yellow),
                RecordStatus::Returned => Style::default().fg(Color::Green),
                RecordStatus::PendingReturn => Style::default().fg(Color::Magenta),
                RecordStatus::Transferred => Style::default().fg(Color::Blue),
            };
            let mut status = record.status.to_string();
            if !user.is_admin() && pending_transfers.contains(&record.id) {
                status.push_str(" · Transf. Pendiente");
            }
            Row::new(vec![
                Cell::from(record.hc_number.clone()),
                Cell::from(record.destination_service.clone()),
                Cell::from(record.responsible.clone()),
                Cell::from(record.responsible_phone_number.clone()),
                Cell::from(export::format_date_time(Some(&record.request_date))),
                Cell::from(export::format_date_time(record.return_date.as_deref())),
                Cell::from(record.receiving_staff_name.clone().unwrap_or_else(|| "—".into())),
                Cell::from(status).style(status_style),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(10),
                Constraint::Length(16),
                Constraint::Length(18),
                Constraint::Length(12),
                Constraint::Length(17),
                Constraint::Length(17),
                Constraint::Length(18),
                Constraint::Min(18),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(" Historias Clínicas ")
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
        frame.render_stateful_widget(table, layout[2], &mut self.table_state.clone());

        if let Some(error) = &self.error_message {
            frame.render_widget(
                Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
                layout[3],
            );
        } else if let Some(info) = &self.info_message {
            frame.render_widget(
                Paragraph::new(info.as_str()).style(Style::default().fg(Color::Green)),
                layout[3],
            );
        }

        let help = if user.is_admin() {
            "↑↓: Navegar | Enter: Detalle | r: Recepcionar | e: Editar | d: Eliminar | \
             f: Filtro | /: Buscar | x: Excel | p: Reporte | Esc: Volver"
        } else {
            "↑↓: Navegar | Enter: Detalle | v: Solicitar devolución | t: Transferir | \
             /: Buscar | x: Excel | p: Reporte | Esc: Volver"
        };
        frame.render_widget(
            Paragraph::new(help)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            layout[4],
        );

        self.render_modal(frame, ctx, user);
    }

    fn render_modal(&self, frame: &mut Frame, ctx: &Ctx, user: &User) {
        match &self.modal {
            Modal::None => {}
            Modal::ConfirmReturn {
                date, staff, focus, ..
            } => {
                let area = centered_rect(50, 35, frame.area());
                frame.render_widget(Clear, area);
                let block = Block::default()
                    .title(" Confirmar Devolución ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded);
                let inner = block.inner(area);
                frame.render_widget(block, area);

                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(1),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(1),
                    ])
                    .split(inner);
                frame.render_widget(
                    Paragraph::new("Complete los datos para registrar la devolución."),
                    rows[0],
                );
                let date_block = Block::default()
                    .borders(Borders::ALL)
                    .title(" Fecha y Hora de Devolución ")
                    .style(Style::default().fg(if *focus == 0 {
                        Color::Cyan
                    } else {
                        Color::White
                    }));
                frame.render_widget(Paragraph::new(date.clone()).block(date_block), rows[1]);
                let staff_block = Block::default()
                    .borders(Borders::ALL)
                    .title(" Recepcionado por ")
                    .style(Style::default().fg(if *focus == 1 {
                        Color::Cyan
                    } else {
                        Color::White
                    }));
                frame.render_widget(Paragraph::new(staff.clone()).block(staff_block), rows[2]);
                frame.render_widget(
                    Paragraph::new("Enter: Confirmar | Tab: Cambiar campo | Esc: Cancelar")
                        .style(Style::default().fg(Color::DarkGray)),
                    rows[3],
                );
            }
            Modal::ConfirmDelete { selected, .. } => {
                let area = centered_rect(50, 25, frame.area());
                frame.render_widget(Clear, area);
                let dialog = Paragraph::new(vec![
                    Line::from("¿Está seguro de que desea eliminar este registro?"),
                    Line::from("Esta acción no se puede deshacer."),
                    Line::from(""),
                    Line::from(vec![
                        Span::styled(
                            " Eliminar ",
                            Style::default().fg(if *selected == 0 {
                                Color::Red
                            } else {
                                Color::DarkGray
                            }),
                        ),
                        Span::raw("  "),
                        Span::styled(
                            " Cancelar ",
                            Style::default().fg(if *selected == 1 {
                                Color::Green
                            } else {
                                Color::DarkGray
                            }),
                        ),
                    ]),
                ])
                .block(
                    Block::default()
                        .title(" Confirmar Eliminación ")
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded),
                )
                .alignment(Alignment::Center);
                frame.render_widget(dialog, area);
            }
            Modal::Transfer {
                hc_number,
                services,
                selected,
                ..
            } => {
                let area = centered_rect(55, 45, frame.area());
                frame.render_widget(Clear, area);
                let block = Block::default()
                    .title(" Transferir Historia Clínica ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded);
                let inner = block.inner(area);
                frame.render_widget(block, area);

                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(2),
                        Constraint::Min(3),
                        Constraint::Length(1),
                    ])
                    .split(inner);
                frame.render_widget(
                    Paragraph::new(format!(
                        "Seleccione el servicio de destino para la H.C. N° {hc_number}. La \
                         transferencia deberá ser aprobada por el servicio receptor."
                    ))
                    .wrap(Wrap { trim: true }),
                    rows[0],
                );
                if services.is_empty() {
                    frame.render_widget(
                        Paragraph::new("No hay servicios de destino disponibles.")
                            .style(Style::default().fg(Color::Red)),
                        rows[1],
                    );
                } else {
                    let items: Vec<ListItem> = services
                        .iter()
                        .enumerate()
                        .map(|(idx, service)| {
                            let style = if idx == *selected {
                                Style::default()
                                    .fg(Color::Yellow)
                                    .add_modifier(Modifier::BOLD)
                            } else {
                                Style::default().fg(Color::White)
                            };
                            let prefix = if idx == *selected { " ► " } else { "   " };
                            ListItem::new(format!("{prefix}{service}")).style(style)
                        })
                        .collect();
                    frame.render_widget(List::new(items), rows[1]);
                }
                frame.render_widget(
                    Paragraph::new("↑↓: Elegir | Enter: Solicitar Transferencia | Esc: Cancelar")
                        .style(Style::default().fg(Color::DarkGray)),
                    rows[2],
                );
            }
            Modal::History {
                hc_number,
                antecedents,
                notes,
                focus,
                confirm_delete,
                delete_selected,
            } => {
                let area = centered_rect(80, 80, frame.area());
                frame.render_widget(Clear, area);
                let block = Block::default()
                    .title(format!(" Detalles de Historia Clínica: {hc_number} "))
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded);
                let inner = block.inner(area);
                frame.render_widget(block, area);

                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(4),
                        Constraint::Length(1),
                    ])
                    .split(inner);

                let antecedents_block = Block::default()
                    .borders(Borders::ALL)
                    .title(" Antecedentes ")
                    .style(Style::default().fg(if *focus == 0 {
                        Color::Cyan
                    } else {
                        Color::White
                    }));
                frame.render_widget(
                    Paragraph::new(antecedents.clone()).block(antecedents_block),
                    rows[0],
                );
                let notes_block = Block::default()
                    .borders(Borders::ALL)
                    .title(" Notas Adicionales ")
                    .style(Style::default().fg(if *focus == 1 {
                        Color::Cyan
                    } else {
                        Color::White
                    }));
                frame.render_widget(Paragraph::new(notes.clone()).block(notes_block), rows[1]);

                let history = views::history_for(ctx.engine.data(), hc_number);
                let history_rows = history.iter().map(|record| {
                    Row::new(vec![
                        Cell::from(record.destination_service.clone()),
                        Cell::from(record.responsible.clone()),
                        Cell::from(export::format_date_time(Some(&record.request_date))),
                        Cell::from(export::format_date_time(record.return_date.as_deref())),
                        Cell::from(
                            record
                                .receiving_staff_name
                                .clone()
                                .unwrap_or_else(|| "—".into()),
                        ),
                        Cell::from(record.status.to_string()),
                    ])
                });
                let history_table = Table::new(
                    history_rows,
                    [
                        Constraint::Length(16),
                        Constraint::Length(18),
                        Constraint::Length(17),
                        Constraint::Length(17),
                        Constraint::Length(18),
                        Constraint::Min(12),
                    ],
                )
                .header(
                    Row::new(vec![
                        "Servicio",
                        "Responsable",
                        "F. Préstamo",
                        "F. Devolución",
                        "Recepcionado por",
                        "Estado",
                    ])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
                )
                .block(
                    Block::default()
                        .title(" Historial de Movimientos ")
                        .borders(Borders::ALL),
                );
                frame.render_widget(history_table, rows[2]);

                let help = if user.is_admin() {
                    "Tab: Campo | Enter: Guardar Cambios | Supr: Eliminar Historia Completa | \
                     Esc: Cerrar"
                } else {
                    "Esc: Cerrar"
                };
                frame.render_widget(
                    Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
                    rows[3],
                );

                if *confirm_delete {
                    let confirm_area = centered_rect(60, 30, frame.area());
                    frame.render_widget(Clear, confirm_area);
                    let dialog = Paragraph::new(vec![
                        Line::from(format!(
                            "¿Eliminar TODA la historia clínica y los registros de préstamo \
                             para el N° H.C. {hc_number}?"
                        )),
                        Line::from("Esta acción es permanente."),
                        Line::from(""),
                        Line::from(vec![
                            Span::styled(
                                " Eliminar ",
                                Style::default().fg(if *delete_selected == 0 {
                                    Color::Red
                                } else {
                                    Color::DarkGray
                                }),
                            ),
                            Span::raw("  "),
                            Span::styled(
                                " Cancelar ",
                                Style::default().fg(if *delete_selected == 1 {
                                    Color::Green
                                } else {
                                    Color::DarkGray
                                }),
                            ),
                        ]),
                    ])
                    .block(
                        Block::default()
                            .title(" Confirmar Eliminación ")
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                    frame.render_widget(dialog, confirm_area);
                }
            }
        }
    }
}

impl Default for RecordList {
    fn default() -> Self {
        Self::new()
    }
}
