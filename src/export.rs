//! Read-only export surfaces over the filtered record list: a spreadsheet
//! (CSV) and a paginated printable report. Pure data formatting; writing the
//! result to disk is the caller's business.

use crate::models::{parse_stamp, Record, RecordStatus};
use time::macros::format_description;

/// Base name used for the exported files.
pub const EXPORT_BASENAME: &str = "ControlHistoriasClinicas";

const REPORT_TITLE: &str = "Reporte de Control de Historias Clínicas - Hospital de Quillabamba";
const ROWS_PER_PAGE: usize = 40;

const DISPLAY: &[time::format_description::FormatItem<'static>] =
    format_description!("[day]/[month]/[year] [hour]:[minute]");

/// Renders a stored stamp for display: `DD/MM/YYYY HH:mm`, `Pendiente` when
/// absent, `Fecha inválida` when the stored value does not parse.
pub fn format_date_time(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "Pendiente".to_string();
    };
    match parse_stamp(value) {
        Some(parsed) => parsed
            .format(DISPLAY)
            .unwrap_or_else(|_| "Fecha inválida".to_string()),
        None => "Fecha inválida".to_string(),
    }
}

/// Spreadsheet export of the given records, one CSV row per record in the
/// order received. The receiving staff column only shows once the folder has
/// actually been returned.
pub fn spreadsheet_csv(records: &[&Record]) -> String {
    let mut csv = String::new();
    csv.push_str(
        "N° H.C.,Servicio de Destino,Responsable,Celular,Fecha de Préstamo,\
         Fecha de Devolución,Recepcionado por,Estado\n",
    );
    for record in records {
        let received_by = if record.status == RecordStatus::Returned {
            record.receiving_staff_name.as_deref().unwrap_or("—")
        } else {
            "—"
        };
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            escape_csv(&record.hc_number),
            escape_csv(&record.destination_service),
            escape_csv(&record.responsible),
            escape_csv(&record.responsible_phone_number),
            escape_csv(&format_date_time(Some(&record.request_date))),
            escape_csv(&format_date_time(record.return_date.as_deref())),
            escape_csv(received_by),
            escape_csv(&record.status.to_string()),
        ));
    }
    csv
}

/// Printable plain-text report: a title, fixed-width columns, page breaks
/// every [`ROWS_PER_PAGE`] rows and a `Página N de M` footer per page.
pub fn printable_report(records: &[&Record]) -> String {
    let pages = records.chunks(ROWS_PER_PAGE).collect::<Vec<_>>();
    let total_pages = pages.len().max(1);
    let mut report = String::new();

    for (page_index, page) in pages.iter().enumerate() {
        if page_index > 0 {
            report.push('\u{c}');
        }
        report.push_str(REPORT_TITLE);
        report.push('\n');
        report.push_str(&"=".repeat(REPORT_TITLE.chars().count()));
        report.push('\n');
        report.push_str(&report_row(
            "N° H.C.",
            "Servicio",
            "Responsable",
            "Celular",
            "F. Préstamo",
            "F. Devolución",
            "Recepcionado por",
            "Estado",
        ));
        report.push_str(&"-".repeat(135));
        report.push('\n');
        for record in *page {
            report.push_str(&report_row(
                &record.hc_number,
                &record.destination_service,
                &record.responsible,
                &record.responsible_phone_number,
                &format_date_time(Some(&record.request_date)),
                &format_date_time(record.return_date.as_deref()),
                record.receiving_staff_name.as_deref().unwrap_or("—"),
                &record.status.to_string(),
            ));
        }
        report.push_str(&format!(
            "\nPágina {} de {}\n",
            page_index + 1,
            total_pages
        ));
    }

    if pages.is_empty() {
        report.push_str(REPORT_TITLE);
        report.push('\n');
        report.push_str("\nNo hay registros que coincidan con los filtros.\n");
        report.push_str("\nPágina 1 de 1\n");
    }

    report
}

#[allow(clippy::too_many_arguments)]
fn report_row(
    hc: &str,
    service: &str,
    responsible: &str,
    phone: &str,
    loaned: &str,
    returned: &str,
    received_by: &str,
    status: &str,
) -> String {
    format!(
        "{:<10} {:<18} {:<20} {:<12} {:<17} {:<17} {:<18} {}\n",
        clip(hc, 10),
        clip(service, 18),
        clip(responsible, 20),
        clip(phone, 12),
        clip(loaned, 17),
        clip(returned, 17),
        clip(received_by, 18),
        status,
    )
}

/// Truncates to the column width so one record stays one line.
fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hc: &str, status: RecordStatus) -> Record {
        Record {
            id: 1,
            hc_number: hc.into(),
            destination_service: "Pediatría".into(),
            responsible: "Dr. Rojas".into(),
            responsible_phone_number: "987654321".into(),
            request_date: "2024-03-05T09:30".into(),
            status,
            return_date: None,
            receiving_staff_name: None,
        }
    }

    #[test]
    fn formats_dates_in_local_convention() {
        assert_eq!(format_date_time(Some("2024-03-05T09:30")), "05/03/2024 09:30");
        assert_eq!(format_date_time(None), "Pendiente");
        assert_eq!(format_date_time(Some("garbage")), "Fecha inválida");
        assert_eq!(format_date_time(Some("")), "Fecha inválida");
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let loaned = record("111", RecordStatus::Loaned);
        let mut returned = record("222", RecordStatus::Returned);
        returned.return_date = Some("2024-03-06T10:00".into());
        returned.receiving_staff_name = Some("Ana".into());

        let csv = spreadsheet_csv(&[&loaned, &returned]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("N° H.C."));
        // An active loan has no reception data yet.
        assert!(lines[1].contains("Pendiente"));
        assert!(lines[1].contains(",—,"));
        assert!(lines[2].contains("06/03/2024 10:00"));
        assert!(lines[2].contains("Ana"));
    }

    #[test]
    fn csv_escapes_separators_in_fields() {
        let mut tricky = record("111", RecordStatus::Loaned);
        tricky.responsible = "Rojas, Pedro".into();
        let csv = spreadsheet_csv(&[&tricky]);
        assert!(csv.contains("\"Rojas, Pedro\""));
    }

    #[test]
    fn report_paginates_and_numbers_pages() {
        let base = record("111", RecordStatus::Loaned);
        let records: Vec<Record> = (0..45)
            .map(|i| {
                let mut r = base.clone();
                r.hc_number = format!("{i}");
                r
            })
            .collect();
        let refs: Vec<&Record> = records.iter().collect();

        let report = printable_report(&refs);
        assert_eq!(report.matches(REPORT_TITLE).count(), 2);
        assert!(report.contains("Página 1 de 2"));
        assert!(report.contains("Página 2 de 2"));

        let empty = printable_report(&[]);
        assert!(empty.contains("No hay registros"));
        assert!(empty.contains("Página 1 de 1"));
    }
}
