use chrono::{Local, NaiveDateTime};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::stats::{self, PeriodResult, RunResult};

pub const SHEET_TITLE: &str = "TLD Breakdown";
pub const DEFAULT_BASENAME: &str = "tld_report";
pub const MAX_COLUMN_WIDTH: usize = 40;

const BORDER_GREY: u32 = 0xA9A9A9;
const BAND_GREY: u32 = 0xF1F1F1;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to lay out spreadsheet: {0}")]
    Layout(#[from] XlsxError),

    #[error("can't create the folder {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to save {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Title,
    Centered,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(u64),
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    fn text(value: impl Into<String>, style: CellStyle) -> Self {
        Self {
            value: CellValue::Text(value.into()),
            style,
        }
    }

    fn blank(style: CellStyle) -> Self {
        Self {
            value: CellValue::Blank,
            style,
        }
    }

    /// Characters in the longest line of the rendered value.
    pub fn longest_line(&self) -> usize {
        match &self.value {
            CellValue::Text(text) => text.split('\n').map(|line| line.chars().count()).max().unwrap_or(0),
            CellValue::Number(number) => number.to_string().len(),
            CellValue::Blank => 0,
        }
    }
}

/// Row/column model of the report; row 0 holds the titles.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub title: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

pub fn column_titles(periods: &[u32]) -> Vec<String> {
    let mut titles = vec!["IOC".to_string()];
    for days in periods {
        titles.push(format!("{} Day\nResolutions", days));
        titles.push(format!("{} Days\nMost common TLDs", days));
        titles.push(format!("{} Days\nMost Common Domains", days));
    }
    titles
}

pub fn build_sheet(run: &RunResult, periods: &[u32], top: usize) -> Sheet {
    let mut rows = vec![column_titles(periods)
        .into_iter()
        .map(|title| Cell::text(title, CellStyle::Title))
        .collect::<Vec<_>>()];

    for ioc in &run.iocs {
        let mut row = vec![Cell::text(ioc.ioc.clone(), CellStyle::Centered)];

        for days in periods {
            match ioc.periods.get(days) {
                Some(PeriodResult::Resolved(report)) => {
                    let total = report.resolutions();
                    let tlds = stats::ranked_with_share(&report.top_level, total);
                    let domains = stats::ranked_with_share(&report.second_level, total);

                    row.push(Cell {
                        value: CellValue::Number(total as u64),
                        style: CellStyle::Centered,
                    });
                    row.push(Cell::text(stats::format_top_n(&tlds, top), CellStyle::Left));
                    row.push(Cell::text(stats::format_top_n(&domains, top), CellStyle::Left));
                }
                Some(PeriodResult::Failed(message)) => {
                    row.push(Cell::text(message.clone(), CellStyle::Centered));
                    row.push(Cell::blank(CellStyle::Left));
                    row.push(Cell::blank(CellStyle::Left));
                }
                None => {
                    row.push(Cell::blank(CellStyle::Centered));
                    row.push(Cell::blank(CellStyle::Left));
                    row.push(Cell::blank(CellStyle::Left));
                }
            }
        }

        rows.push(row);
    }

    Sheet {
        title: SHEET_TITLE.to_string(),
        rows,
    }
}

/// Width per column: the longest single line in any of its cells, capped.
pub fn column_widths(sheet: &Sheet) -> Vec<usize> {
    (0..sheet.column_count())
        .map(|col| {
            sheet
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(Cell::longest_line)
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Whether the row at `row_idx` (0-based, header first) gets the grey fill.
/// Sheet rows are 1-based; odd ones after the header are shaded, so the
/// first banded row is sheet row 3.
fn banded(row_idx: usize) -> bool {
    row_idx > 0 && (row_idx + 1) % 2 != 0
}

/// `(first_row, first_col, last_row, last_col)` covered by the auto-filter.
fn table_range(sheet: &Sheet) -> Option<(u32, u16, u32, u16)> {
    let columns = sheet.column_count();
    if columns == 0 || sheet.rows.is_empty() {
        return None;
    }
    Some((0, 0, (sheet.rows.len() - 1) as u32, (columns - 1) as u16))
}

fn cell_format(style: CellStyle, banded: bool) -> Format {
    let align = match style {
        CellStyle::Title => {
            return Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::Black)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap();
        }
        CellStyle::Centered => FormatAlign::Center,
        CellStyle::Left => FormatAlign::Left,
    };

    let format = Format::new()
        .set_align(align)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(BORDER_GREY));

    if banded {
        format.set_background_color(Color::RGB(BAND_GREY))
    } else {
        format
    }
}

/// Lays the sheet out in a workbook: styles, banding of odd rows, an
/// auto-filter over the whole table and the computed column widths.
pub fn write_workbook(sheet: &Sheet) -> Result<Workbook, ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet.title)?;

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let row_num = row_idx as u32;
        let shaded = banded(row_idx);

        for (col_idx, cell) in row.iter().enumerate() {
            let col_num = col_idx as u16;
            let format = cell_format(cell.style, shaded);
            match &cell.value {
                CellValue::Text(text) => {
                    worksheet.write_string_with_format(row_num, col_num, text, &format)?;
                }
                CellValue::Number(number) => {
                    worksheet.write_number_with_format(row_num, col_num, *number as f64, &format)?;
                }
                CellValue::Blank => {
                    worksheet.write_blank(row_num, col_num, &format)?;
                }
            }
        }
    }

    if let Some((first_row, first_col, last_row, last_col)) = table_range(sheet) {
        worksheet.autofilter(first_row, first_col, last_row, last_col)?;
    }

    for (col_idx, width) in column_widths(sheet).into_iter().enumerate() {
        worksheet.set_column_width(col_idx as u16, width as f64)?;
    }

    Ok(workbook)
}

pub fn report_filename(basename: &str, at: NaiveDateTime) -> String {
    format!("{} - {}.xlsx", basename, at.format("%Y-%m-%d %H%M%S"))
}

/// Saves under `dir`, creating the directory when it is missing.
/// Returns the absolute path of the written file.
pub fn save_workbook(
    workbook: &mut Workbook,
    dir: &Path,
    basename: &str,
) -> Result<PathBuf, ReportError> {
    let target = dir.join(report_filename(basename, Local::now().naive_local()));
    debug!(action = "save", component = "report", path = ?target, "Saving file");

    if let Err(first_error) = workbook.save(&target) {
        if dir.is_dir() {
            return Err(ReportError::Save {
                path: target,
                source: first_error,
            });
        }

        debug!(action = "create_dir", component = "report", path = ?dir, "Can't find folder, will try to create it");
        fs::create_dir_all(dir).map_err(|source| {
            error!(action = "create_dir", component = "report", path = ?dir, error = %source, "Can't create the folder");
            ReportError::CreateDir {
                path: dir.to_path_buf(),
                source,
            }
        })?;
        debug!(action = "create_dir", component = "report", path = ?dir, "Created folder");

        workbook
            .save(&target)
            .map_err(|source| ReportError::Save {
                path: target.clone(),
                source,
            })?;
    }

    Ok(fs::canonicalize(&target).unwrap_or(target))
}

/// Builds, lays out and saves the spreadsheet for a finished run.
pub fn render(
    run: &RunResult,
    periods: &[u32],
    top: usize,
    dir: &Path,
) -> Result<PathBuf, ReportError> {
    let start_time = Instant::now();
    info!(action = "start", component = "report", ioc_count = run.iocs.len(), "Creating an Excel file");

    let sheet = build_sheet(run, periods, top);
    let mut workbook = write_workbook(&sheet)?;
    let path = save_workbook(&mut workbook, dir, DEFAULT_BASENAME)?;

    info!(
        action = "complete",
        component = "report",
        path = ?path,
        duration_ms = start_time.elapsed().as_millis(),
        "Spreadsheet saved"
    );
    Ok(path)
}
