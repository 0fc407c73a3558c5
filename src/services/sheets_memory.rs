// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory `SheetsBackend` for tests and offline runs.
//!
//! Mimics the parts of the Sheets values API the contact store relies on:
//! trailing empty cells/rows are trimmed on read, appends land after the
//! last row with data, and reading an unknown spreadsheet is a 404.

use super::sheets::{Rows, SheetsBackend};
use crate::error::AppError;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct MemSpreadsheet {
    id: String,
    title: String,
    tab: String,
    header_formatted: bool,
    grid: Rows,
}

#[derive(Debug, Default)]
struct MemState {
    next_id: u64,
    spreadsheets: Vec<MemSpreadsheet>,
}

/// Spreadsheet store held in process memory. Access tokens are ignored.
#[derive(Debug, Default)]
pub struct InMemorySheets {
    state: Mutex<MemState>,
}

/// Parsed A1 range. Rows and columns are 0-based; `None` rows are open.
#[derive(Debug, Clone, PartialEq, Eq)]
struct A1Range {
    tab: String,
    first_col: usize,
    last_col: usize,
    first_row: Option<usize>,
    last_row: Option<usize>,
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spreadsheets created so far.
    pub fn spreadsheet_count(&self) -> usize {
        self.lock().spreadsheets.len()
    }

    /// Title of a spreadsheet, if it exists.
    pub fn title_of(&self, spreadsheet_id: &str) -> Option<String> {
        self.lock()
            .spreadsheets
            .iter()
            .find(|s| s.id == spreadsheet_id)
            .map(|s| s.title.clone())
    }

    /// Whether the header styling request was applied.
    pub fn header_formatted(&self, spreadsheet_id: &str) -> bool {
        self.lock()
            .spreadsheets
            .iter()
            .any(|s| s.id == spreadsheet_id && s.header_formatted)
    }

    /// The untrimmed grid, for assertions on physical row layout.
    pub fn raw_rows(&self, spreadsheet_id: &str) -> Rows {
        self.lock()
            .spreadsheets
            .iter()
            .find(|s| s.id == spreadsheet_id)
            .map(|s| s.grid.clone())
            .unwrap_or_default()
    }

    /// Overwrite one physical row (1-based), bypassing the values API.
    pub fn set_row(&self, spreadsheet_id: &str, row_number: usize, cells: &[&str]) {
        let mut state = self.lock();
        if let Some(sheet) = state
            .spreadsheets
            .iter_mut()
            .find(|s| s.id == spreadsheet_id)
        {
            let values = cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
            write_block(&mut sheet.grid, row_number - 1, 0, vec![values]);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        // A poisoned lock only means a test panicked mid-write.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_sheet<T>(
        &self,
        spreadsheet_id: &str,
        range: &str,
        f: impl FnOnce(&mut MemSpreadsheet, A1Range) -> T,
    ) -> Result<T, AppError> {
        let range = parse_a1(range).ok_or_else(|| bad_range(range))?;
        let mut state = self.lock();
        let sheet = state
            .spreadsheets
            .iter_mut()
            .find(|s| s.id == spreadsheet_id)
            .ok_or_else(|| AppError::Transport {
                status: Some(404),
                message: format!("Requested entity was not found: {}", spreadsheet_id),
            })?;

        if sheet.tab != range.tab {
            return Err(bad_range(&range.tab));
        }
        Ok(f(sheet, range))
    }
}

#[async_trait]
impl SheetsBackend for InMemorySheets {
    async fn find_spreadsheet(
        &self,
        _access_token: &str,
        title: &str,
    ) -> Result<Option<String>, AppError> {
        Ok(self
            .lock()
            .spreadsheets
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.id.clone()))
    }

    async fn create_spreadsheet(
        &self,
        _access_token: &str,
        title: &str,
        tab: &str,
        _column_count: u32,
    ) -> Result<String, AppError> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("mem-sheet-{}", state.next_id);
        state.spreadsheets.push(MemSpreadsheet {
            id: id.clone(),
            title: title.to_string(),
            tab: tab.to_string(),
            header_formatted: false,
            grid: Vec::new(),
        });
        Ok(id)
    }

    async fn format_header_row(
        &self,
        _access_token: &str,
        spreadsheet_id: &str,
    ) -> Result<(), AppError> {
        let mut state = self.lock();
        let sheet = state
            .spreadsheets
            .iter_mut()
            .find(|s| s.id == spreadsheet_id)
            .ok_or_else(|| AppError::Transport {
                status: Some(404),
                message: format!("Requested entity was not found: {}", spreadsheet_id),
            })?;
        sheet.header_formatted = true;
        Ok(())
    }

    async fn get_values(
        &self,
        _access_token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Rows, AppError> {
        self.with_sheet(spreadsheet_id, range, |sheet, range| {
            let first = range.first_row.unwrap_or(0);
            let last = range
                .last_row
                .unwrap_or(usize::MAX)
                .min(sheet.grid.len().saturating_sub(1));

            let mut rows: Rows = if first > last || sheet.grid.is_empty() {
                Vec::new()
            } else {
                sheet.grid[first..=last]
                    .iter()
                    .map(|row| {
                        let mut cells: Vec<String> = row
                            .iter()
                            .skip(range.first_col)
                            .take(range.last_col - range.first_col + 1)
                            .cloned()
                            .collect();
                        while cells.last().is_some_and(String::is_empty) {
                            cells.pop();
                        }
                        cells
                    })
                    .collect()
            };

            while rows.last().is_some_and(Vec::is_empty) {
                rows.pop();
            }
            rows
        })
    }

    async fn update_values(
        &self,
        _access_token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), AppError> {
        self.with_sheet(spreadsheet_id, range, |sheet, range| {
            write_block(
                &mut sheet.grid,
                range.first_row.unwrap_or(0),
                range.first_col,
                rows,
            );
        })
    }

    async fn append_values(
        &self,
        _access_token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), AppError> {
        self.with_sheet(spreadsheet_id, range, |sheet, range| {
            let next = sheet
                .grid
                .iter()
                .rposition(|row| row.iter().any(|c| !c.is_empty()))
                .map_or(0, |last| last + 1);
            write_block(&mut sheet.grid, next, range.first_col, rows);
        })
    }

    async fn clear_values(
        &self,
        _access_token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(), AppError> {
        self.with_sheet(spreadsheet_id, range, |sheet, range| {
            let first = range.first_row.unwrap_or(0);
            let last = range.last_row.unwrap_or(usize::MAX);
            for row in sheet
                .grid
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| *i >= first && *i <= last)
                .map(|(_, row)| row)
            {
                for cell in row
                    .iter_mut()
                    .skip(range.first_col)
                    .take(range.last_col - range.first_col + 1)
                {
                    cell.clear();
                }
            }
        })
    }
}

fn write_block(grid: &mut Rows, first_row: usize, first_col: usize, rows: Rows) {
    for (offset, values) in rows.into_iter().enumerate() {
        let index = first_row + offset;
        if grid.len() <= index {
            grid.resize(index + 1, Vec::new());
        }
        let row = &mut grid[index];
        if row.len() < first_col + values.len() {
            row.resize(first_col + values.len(), String::new());
        }
        for (col, value) in values.into_iter().enumerate() {
            row[first_col + col] = value;
        }
    }
}

fn bad_range(range: &str) -> AppError {
    AppError::Transport {
        status: Some(400),
        message: format!("Unable to parse range: {}", range),
    }
}

/// Parse `Tab!A2:K2` / `Tab!A:K` style ranges.
fn parse_a1(range: &str) -> Option<A1Range> {
    let (tab, cells) = range.split_once('!')?;
    let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
    let (first_col, first_row) = parse_cell(start)?;
    let (last_col, last_row) = parse_cell(end)?;
    if last_col < first_col {
        return None;
    }

    Some(A1Range {
        tab: tab.trim_matches('\'').to_string(),
        first_col,
        last_col,
        first_row,
        last_row,
    })
}

fn parse_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }

    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c as usize - 'A' as usize + 1))
        - 1;
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().ok()?.checked_sub(1)?)
    };
    Some((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_row_and_column_ranges() {
        let r = parse_a1("Contacts!A2:K2").unwrap();
        assert_eq!((r.first_col, r.last_col), (0, 10));
        assert_eq!((r.first_row, r.last_row), (Some(1), Some(1)));

        let r = parse_a1("Contacts!A:K").unwrap();
        assert_eq!((r.first_row, r.last_row), (None, None));
        assert_eq!(r.tab, "Contacts");

        assert!(parse_a1("A1:K1").is_none());
        assert!(parse_a1("Contacts!K1:A1").is_none());
        assert!(parse_a1("Contacts!A0:K0").is_none());
    }

    #[tokio::test]
    async fn reads_trim_and_appends_skip_cleared_tail() {
        let sheets = InMemorySheets::new();
        let id = sheets.create_spreadsheet("t", "Title", "Tab", 3).await.unwrap();

        sheets
            .update_values("t", &id, "Tab!A1:C1", vec![vec!["h1".into(), "h2".into(), "".into()]])
            .await
            .unwrap();
        sheets
            .append_values("t", &id, "Tab!A:C", vec![vec!["a".into(), "b".into(), "c".into()]])
            .await
            .unwrap();
        sheets.clear_values("t", &id, "Tab!A2:C2").await.unwrap();

        let rows = sheets.get_values("t", &id, "Tab!A:C").await.unwrap();
        assert_eq!(rows, vec![vec!["h1".to_string(), "h2".to_string()]]);

        // The cleared row is the tail, so the next append reuses it
        sheets
            .append_values("t", &id, "Tab!A:C", vec![vec!["d".into()]])
            .await
            .unwrap();
        assert_eq!(sheets.raw_rows(&id)[1][0], "d");
    }

    #[tokio::test]
    async fn unknown_spreadsheet_is_404() {
        let sheets = InMemorySheets::new();
        let err = sheets.get_values("t", "nope", "Tab!A:C").await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(404));
    }
}
