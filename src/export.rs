//! Excel export of attendance history.

use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, XlsxError};
use std::path::Path;

use crate::models::attendance::{AttendanceHistoryEntry, HistorySummary};

/// Export attendance history to an Excel file.
/// One row per clock-in/clock-out, followed by a summary block.
pub fn export_history_to_excel(data: &[AttendanceHistoryEntry], path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Attendance History")?;

    // Header format
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);

    // Number format for distance
    let distance_format = Format::new().set_num_format("#,##0.0");

    let headers = ["Date", "Time", "Type", "Status", "Distance (m)"];

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    worksheet.set_column_width(0, 12)?; // Date
    worksheet.set_column_width(1, 10)?; // Time
    worksheet.set_column_width(2, 10)?; // Type
    worksheet.set_column_width(3, 14)?; // Status
    worksheet.set_column_width(4, 14)?; // Distance

    for (idx, record) in data.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, record.check_time.date().to_string())?;
        worksheet.write_string(row, 1, record.check_time.format("%H:%M:%S").to_string())?;
        worksheet.write_string(row, 2, record.kind.label())?;
        worksheet.write_string(row, 3, record.status.as_str())?;

        match record.distance_meters {
            Some(meters) => worksheet.write_number_with_format(row, 4, meters, &distance_format)?,
            None => worksheet.write_string(row, 4, "")?,
        };
    }

    if !data.is_empty() {
        let last_row = data.len() as u32;
        worksheet.autofilter(0, 0, last_row, 4)?;

        // Summary below the table, one blank row apart
        let summary = HistorySummary::from_entries(data);
        let start = last_row + 2;
        let rows = [
            ("On time", summary.on_time),
            ("Late", summary.late),
            ("Clock out", summary.clock_out),
            ("Early leave", summary.early_leave),
        ];
        for (offset, (label, count)) in rows.iter().enumerate() {
            let row = start + offset as u32;
            worksheet.write_string_with_format(row, 0, *label, &header_format)?;
            worksheet.write_number(row, 1, *count as f64)?;
        }
    }

    // Freeze top row
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Generate default filename for export.
pub fn generate_export_filename(prefix: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.xlsx", ts = now.format("%Y%m%d_%H%M%S"))
}
