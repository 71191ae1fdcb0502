use std::io::{self, Write};

use rust_xlsxwriter::{Url, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::persist::Artifact;
use crate::platform::display_path;
use crate::record::{FileLink, MatchStatus, ScanRecord};
use crate::tags::TagFrequency;

pub const MATCHED_TITLE: &str = "Matched";
pub const UNMATCHED_TITLE: &str = "Unmatched";
pub const TAG_FREQUENCY_TITLE: &str = "Tag frequency";

const MATCHED_HEADERS: [&str; 10] = [
    "Folder path",
    "File path",
    "File link",
    "Extension",
    "Caption path",
    "Raw caption",
    "Cleaned caption",
    "Cleaned length",
    "Categories",
    "Status",
];
const UNMATCHED_HEADERS: [&str; 5] = ["Folder path", "File path", "File link", "Extension", "Status"];
const TAG_FREQUENCY_HEADERS: [&str; 2] = ["Tag", "Count"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Count(u64),
    /// Clickable when `target` is set, plain text otherwise.
    Link { text: String, target: Option<String> },
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn from_link(link: Option<&FileLink>, missing_text: impl Into<String>) -> Self {
        match link {
            Some(link) => Cell::Link {
                text: link.text.clone(),
                target: Some(link.target.clone()),
            },
            None => Cell::Link {
                text: missing_text.into(),
                target: None,
            },
        }
    }

    /// What a reader sees in the cell.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Count(count) => count.to_string(),
            Cell::Link { text, .. } => text.clone(),
        }
    }

    /// Field written to the CSV ledger; links become spreadsheet
    /// `HYPERLINK` formulas.
    pub fn to_field(&self) -> String {
        match self {
            Cell::Link {
                text,
                target: Some(target),
            } => format!(
                "=HYPERLINK(\"{}\",\"{}\")",
                target.replace('"', "\"\""),
                text.replace('"', "\"\"")
            ),
            other => other.display(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Fixed-width text table; every column is exactly `width` characters.
    pub fn render_text(&self, width: usize, max_rows: Option<usize>) -> String {
        let mut out = String::new();
        out.push_str(&format!("## {}\n", self.title));
        push_line(&mut out, self.headers.iter().map(String::as_str), width);
        let limit = max_rows.unwrap_or(self.rows.len());
        for row in self.rows.iter().take(limit) {
            let cells: Vec<String> = row.iter().map(Cell::display).collect();
            push_line(&mut out, cells.iter().map(String::as_str), width);
        }
        if self.rows.len() > limit {
            out.push_str(&format!("... {} more rows\n", self.rows.len() - limit));
        }
        out
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, width: usize) {
    let line: Vec<String> = cells.map(|cell| fit(cell, width)).collect();
    out.push_str(line.join(" ").trim_end());
    out.push('\n');
}

fn fit(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    if len > width {
        let mut cut: String = cell.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{}{}", cell, " ".repeat(width - len))
    }
}

/// Workbook artifact: one worksheet per sheet, every column set to the
/// same width.
#[derive(Debug, Clone)]
pub struct Report {
    pub sheets: Vec<Sheet>,
    pub column_width: usize,
}

impl Report {
    pub fn new(column_width: usize) -> Self {
        Self {
            sheets: Vec::new(),
            column_width,
        }
    }

    pub fn sheet(&self, title: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.title == title)
    }

    pub fn render_text(&self, max_rows: Option<usize>) -> String {
        self.sheets
            .iter()
            .map(|sheet| sheet.render_text(self.column_width, max_rows))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize the report as an xlsx workbook.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            write_sheet(worksheet, sheet, self.column_width as f64)?;
        }
        workbook.save_to_buffer()
    }
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, width: f64) -> Result<(), XlsxError> {
    worksheet.set_name(sheet.title.as_str())?;
    for (col, header) in sheet.headers.iter().enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, width)?;
        worksheet.write_string(0, col, header.as_str())?;
    }
    for (idx, row) in sheet.rows.iter().enumerate() {
        let row_num = idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, row_num, col as u16, cell)?;
        }
    }
    Ok(())
}

// Text is always written as a string so tags such as `-_-` never turn into
// formulas.
fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), XlsxError> {
    match cell {
        Cell::Text(text) => {
            worksheet.write_string(row, col, text.as_str())?;
        }
        Cell::Count(count) => {
            worksheet.write_number(row, col, *count as f64)?;
        }
        Cell::Link {
            text,
            target: Some(target),
        } => {
            let url = Url::new(workbook_url(target)).set_text(text.as_str());
            if let Err(e) = worksheet.write_url(row, col, url) {
                debug!("Link {} written as plain text: {}", target, e);
                worksheet.write_string(row, col, text.as_str())?;
            }
        }
        Cell::Link { text, target: None } => {
            worksheet.write_string(row, col, text.as_str())?;
        }
    }
    Ok(())
}

/// Workbook links need a scheme; bare drive-letter targets become `file:///`.
fn workbook_url(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("file:///{}", target)
    }
}

impl Artifact for Report {
    fn write_into(&self, out: &mut dyn Write) -> io::Result<()> {
        let bytes = self
            .to_xlsx()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        out.write_all(&bytes)
    }
}

/// Turns one folder's records and tag counts into a [`Report`]. Does no I/O.
pub struct ReportBuilder {
    column_width: usize,
}

impl ReportBuilder {
    pub fn new(column_width: usize) -> Self {
        Self { column_width }
    }

    pub fn build(&self, records: &[ScanRecord], tags: &TagFrequency) -> Report {
        let mut matched = Sheet::new(MATCHED_TITLE, &MATCHED_HEADERS);
        let mut unmatched = Sheet::new(UNMATCHED_TITLE, &UNMATCHED_HEADERS);

        for record in records {
            let link = Cell::from_link(
                record.link.as_ref(),
                format!("File not found: {}", record.file_name()),
            );
            match record.match_status {
                MatchStatus::Matched => matched.rows.push(vec![
                    Cell::text(display_path(&record.folder_path)),
                    Cell::text(display_path(&record.file_path)),
                    link,
                    Cell::text(record.file_extension.as_str()),
                    Cell::text(record.caption_path_text()),
                    Cell::text(record.raw_caption.as_str()),
                    Cell::text(record.cleaned_caption.as_str()),
                    Cell::Count(record.cleaned_caption_length as u64),
                    Cell::text(record.category_labels.as_str()),
                    Cell::text(record.match_status.as_str()),
                ]),
                MatchStatus::Unmatched | MatchStatus::ReadError => unmatched.rows.push(vec![
                    Cell::text(display_path(&record.folder_path)),
                    Cell::text(display_path(&record.file_path)),
                    link,
                    Cell::text(record.file_extension.as_str()),
                    Cell::text(record.match_status.as_str()),
                ]),
            }
        }

        let mut frequency = Sheet::new(TAG_FREQUENCY_TITLE, &TAG_FREQUENCY_HEADERS);
        for (tag, count) in tags.sorted() {
            frequency.rows.push(vec![Cell::text(tag), Cell::Count(count)]);
        }

        let mut report = Report::new(self.column_width);
        report.sheets = vec![matched, unmatched, frequency];
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::path::PathBuf;

    fn record(name: &str, status: MatchStatus, link: bool) -> ScanRecord {
        let file_path = PathBuf::from("/data/set").join(name);
        ScanRecord {
            folder_path: PathBuf::from("/data/set"),
            link: link.then(|| FileLink {
                text: name.to_string(),
                target: format!("file://{}", file_path.display()),
            }),
            file_path,
            file_extension: ".png".to_string(),
            caption_path: None,
            raw_caption: String::new(),
            cleaned_caption: String::new(),
            cleaned_caption_length: 0,
            category_labels: "N/A".to_string(),
            match_status: status,
            read_error: None,
        }
    }

    #[test]
    fn test_sections_split_by_status() {
        let records = vec![
            record("a.png", MatchStatus::Matched, true),
            record("b.png", MatchStatus::Unmatched, true),
            record("c.png", MatchStatus::ReadError, false),
        ];
        let mut tags = TagFrequency::new();
        tags.extend(["solo", "smile", "solo"]);

        let report = ReportBuilder::new(20).build(&records, &tags);
        assert_eq!(report.sheets.len(), 3);

        let matched = report.sheet(MATCHED_TITLE).unwrap();
        assert_eq!(matched.headers.len(), 10);
        assert_eq!(matched.rows.len(), 1);
        assert_eq!(matched.rows[0][4], Cell::text("N/A"));

        let unmatched = report.sheet(UNMATCHED_TITLE).unwrap();
        assert_eq!(unmatched.rows.len(), 2);
        assert_eq!(unmatched.rows[1][4], Cell::text("ReadError"));
        assert_eq!(
            unmatched.rows[1][2],
            Cell::Link {
                text: "File not found: c.png".to_string(),
                target: None
            }
        );

        let freq = report.sheet(TAG_FREQUENCY_TITLE).unwrap();
        assert_eq!(freq.rows[0], vec![Cell::text("solo"), Cell::Count(2)]);
        assert_eq!(freq.rows[1], vec![Cell::text("smile"), Cell::Count(1)]);
    }

    fn workbook_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut text = String::new();
        part.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_workbook_layout() {
        let records = vec![record("a.png", MatchStatus::Unmatched, true)];
        let report = ReportBuilder::new(20).build(&records, &TagFrequency::new());

        let bytes = report.to_xlsx().unwrap();
        assert!(bytes.starts_with(b"PK"));

        let workbook = workbook_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains("name=\"Matched\""));
        assert!(workbook.contains("name=\"Unmatched\""));
        assert!(workbook.contains("name=\"Tag frequency\""));

        for sheet in ["sheet1", "sheet2", "sheet3"] {
            let xml = workbook_part(&bytes, &format!("xl/worksheets/{}.xml", sheet));
            assert!(xml.contains("<cols>"), "{} has no column widths", sheet);
        }
        let unmatched = workbook_part(&bytes, "xl/worksheets/sheet2.xml");
        assert!(unmatched.contains("<hyperlink"));
    }

    #[test]
    fn test_formula_like_tags_stay_text() {
        let mut records = vec![record("a.png", MatchStatus::Matched, true)];
        records[0].raw_caption = "-_-, +_+, =sum, @me".to_string();
        records[0].cleaned_caption = "-_-, +_+, =sum, @me".to_string();
        let mut tags = TagFrequency::new();
        tags.extend(["-_-", "+_+", "=sum", "@me", "-_-"]);

        let report = ReportBuilder::new(20).build(&records, &tags);
        let bytes = report.to_xlsx().unwrap();

        let strings = workbook_part(&bytes, "xl/sharedStrings.xml");
        assert!(strings.contains(">-_-<"));
        assert!(strings.contains(">+_+<"));
        assert!(strings.contains(">=sum<"));
        for sheet in ["sheet1", "sheet2", "sheet3"] {
            let xml = workbook_part(&bytes, &format!("xl/worksheets/{}.xml", sheet));
            assert!(!xml.contains("<f>"), "{} contains a formula", sheet);
        }
    }

    #[test]
    fn test_workbook_url_adds_scheme() {
        assert_eq!(workbook_url("file:///data/a.png"), "file:///data/a.png");
        assert_eq!(workbook_url("C:/data/a.png"), "file:///C:/data/a.png");
    }

    #[test]
    fn test_render_text_uses_fixed_width() {
        let mut sheet = Sheet::new("T", &["Tag", "Count"]);
        sheet.rows.push(vec![Cell::text("a_very_long_tag_name"), Cell::Count(3)]);
        sheet.rows.push(vec![Cell::text("x"), Cell::Count(1)]);
        let text = sheet.render_text(8, Some(1));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "## T");
        assert_eq!(lines[1], "Tag      Count");
        assert_eq!(lines[2], "a_very_… 3");
        assert_eq!(lines[3], "... 1 more rows");
    }
}
