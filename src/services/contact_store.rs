// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spreadsheet-backed contact store.
//!
//! Each owner gets one spreadsheet with a `Contacts` tab; the sheet is the
//! only source of truth. The store keeps no state between calls: every
//! operation re-reads what it needs, and lookups by id are a linear scan of
//! the full tab (O(rows) per call).
//!
//! Row numbers are only valid for the read that produced them. Before a
//! row is overwritten or cleared it is re-read, and the write is refused
//! with `Conflict` if its `ID` or `Updated` cell changed in the meantime.

use super::sheets::{Rows, SheetsBackend};
use crate::error::{AppError, Result};
use crate::models::contact::{COLUMNS, DEFAULT_SOURCE};
use crate::models::{ContactInput, ContactRecord, SyncStats};
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Tab holding the contact rows.
pub const CONTACTS_TAB: &str = "Contacts";

const LAST_COLUMN: &str = "K";
const CONTACT_ID_LEN: usize = 8;

/// Handle to an owner's contact spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetHandle {
    pub spreadsheet_id: String,
}

impl SheetHandle {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// Browser URL for the spreadsheet.
    pub fn url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}",
            self.spreadsheet_id
        )
    }
}

/// A live record together with the physical row it was read from.
#[derive(Debug, Clone)]
struct LocatedContact {
    row: usize,
    record: ContactRecord,
}

/// One full read of the tab, indexed by contact id.
struct Snapshot {
    contacts: Vec<LocatedContact>,
    by_id: HashMap<String, usize>,
}

impl Snapshot {
    fn new(contacts: Vec<LocatedContact>) -> Self {
        let mut by_id = HashMap::new();
        for (i, c) in contacts.iter().enumerate() {
            if !c.record.id.is_empty() {
                // First row wins when an id is duplicated
                by_id.entry(c.record.id.clone()).or_insert(i);
            }
        }
        Self { contacts, by_id }
    }

    fn find(&self, id: &str) -> Option<&LocatedContact> {
        self.by_id.get(id).map(|&i| &self.contacts[i])
    }

    fn replace(&mut self, id: &str, record: ContactRecord) {
        if let Some(&i) = self.by_id.get(id) {
            self.contacts[i].record = record;
        }
    }
}

/// Contact store bound to one caller's Google credentials.
#[derive(Clone)]
pub struct ContactStore {
    backend: Arc<dyn SheetsBackend>,
    access_token: String,
    title_prefix: String,
}

impl ContactStore {
    pub fn new(
        backend: Arc<dyn SheetsBackend>,
        access_token: impl Into<String>,
        title_prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            access_token: access_token.into(),
            title_prefix: title_prefix.into(),
        }
    }

    /// Title used for an owner's sheet when none is given.
    pub fn default_title(&self, owner_id: &str) -> String {
        format!("{} {}", self.title_prefix, owner_id)
    }

    // ─── Sheet Resolution ────────────────────────────────────────

    /// Find the owner's contact sheet, creating it on first use.
    ///
    /// Not safe against two callers creating the same owner's sheet at
    /// once; lookups return the oldest match, so both callers settle on
    /// the same sheet afterwards.
    pub async fn resolve_sheet(&self, owner_id: &str, name: Option<&str>) -> Result<SheetHandle> {
        let title = match name.filter(|n| !n.trim().is_empty()) {
            Some(n) => n.to_string(),
            None => self.default_title(owner_id),
        };

        if let Some(id) = self
            .backend
            .find_spreadsheet(&self.access_token, &title)
            .await?
        {
            tracing::info!(spreadsheet_id = %id, "Found existing contact sheet");
            return Ok(SheetHandle::new(id));
        }

        let id = self
            .backend
            .create_spreadsheet(
                &self.access_token,
                &title,
                CONTACTS_TAB,
                COLUMNS.len() as u32,
            )
            .await?;

        let header = vec![COLUMNS.iter().map(|c| c.to_string()).collect()];
        self.backend
            .update_values(&self.access_token, &id, &row_range(1), header)
            .await?;
        self.backend
            .format_header_row(&self.access_token, &id)
            .await?;

        tracing::info!(spreadsheet_id = %id, title = %title, "Created contact sheet");
        Ok(SheetHandle::new(id))
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// All live contacts, in sheet order.
    pub async fn list_contacts(&self, sheet: &SheetHandle) -> Result<Vec<ContactRecord>> {
        Ok(self
            .scan(sheet)
            .await?
            .into_iter()
            .map(|c| c.record)
            .collect())
    }

    /// Read the whole tab. A missing sheet reads as empty.
    async fn scan(&self, sheet: &SheetHandle) -> Result<Vec<LocatedContact>> {
        let values = match self
            .backend
            .get_values(&self.access_token, &sheet.spreadsheet_id, &full_range())
            .await
        {
            Ok(v) => v,
            Err(e) if e.upstream_status() == Some(404) => {
                tracing::warn!(spreadsheet_id = %sheet.spreadsheet_id, "Contact sheet not found, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(locate_contacts(values))
    }

    async fn snapshot(&self, sheet: &SheetHandle) -> Result<Snapshot> {
        Ok(Snapshot::new(self.scan(sheet).await?))
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Append a new contact. Duplicate ids are not checked.
    pub async fn add_contact(
        &self,
        sheet: &SheetHandle,
        input: ContactInput,
    ) -> Result<ContactRecord> {
        let id = input
            .id()
            .map(str::to_string)
            .unwrap_or_else(generate_contact_id);
        let now = now_rfc3339();

        let mut record = ContactRecord {
            id,
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            organization: String::new(),
            role: String::new(),
            notes: String::new(),
            tags: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            source: DEFAULT_SOURCE.to_string(),
        };
        input.apply_to(&mut record);

        self.backend
            .append_values(
                &self.access_token,
                &sheet.spreadsheet_id,
                &full_range(),
                vec![record.to_row()],
            )
            .await?;

        tracing::info!(contact_id = %record.id, "Added contact");
        Ok(record)
    }

    /// Merge `patch` over an existing contact and rewrite its row.
    pub async fn update_contact(
        &self,
        sheet: &SheetHandle,
        contact_id: &str,
        patch: ContactInput,
    ) -> Result<ContactRecord> {
        let snapshot = self.snapshot(sheet).await?;
        let current = snapshot
            .find(contact_id)
            .ok_or_else(|| contact_not_found(contact_id))?;

        let updated = self.write_merged(sheet, current, patch).await?;
        tracing::info!(contact_id, "Updated contact");
        Ok(updated)
    }

    /// Soft-delete a contact by clearing its row. The row itself stays, so
    /// row numbers of other contacts never shift.
    pub async fn delete_contact(&self, sheet: &SheetHandle, contact_id: &str) -> Result<bool> {
        let snapshot = self.snapshot(sheet).await?;
        let current = snapshot
            .find(contact_id)
            .ok_or_else(|| contact_not_found(contact_id))?;

        self.ensure_unchanged(sheet, current).await?;
        self.backend
            .clear_values(
                &self.access_token,
                &sheet.spreadsheet_id,
                &row_range(current.row),
            )
            .await?;

        tracing::info!(contact_id, row = current.row, "Deleted contact");
        Ok(true)
    }

    /// One-way merge of an external contact list into the sheet.
    ///
    /// Records without an id, or with an id the sheet does not know, are
    /// appended. Known ids are rewritten only when a compared field
    /// differs. Nothing is ever removed from the sheet.
    pub async fn sync_from_external(
        &self,
        sheet: &SheetHandle,
        external: Vec<ContactInput>,
    ) -> Result<SyncStats> {
        let mut snapshot = self.snapshot(sheet).await?;
        let mut stats = SyncStats {
            total_dashboard: external.len(),
            ..SyncStats::default()
        };
        let sheet_total = snapshot.contacts.len();

        for contact in external {
            let existing = contact.id().and_then(|id| snapshot.find(id)).cloned();

            match existing {
                Some(current) => {
                    if contact.differs_from(&current.record) {
                        let id = current.record.id.clone();
                        let updated = self.write_merged(sheet, &current, contact).await?;
                        snapshot.replace(&id, updated);
                        stats.updated += 1;
                    }
                }
                None => {
                    self.add_contact(sheet, contact).await?;
                    stats.added += 1;
                }
            }
        }

        stats.total_sheet = sheet_total + stats.added;
        tracing::info!(
            added = stats.added,
            updated = stats.updated,
            total_sheet = stats.total_sheet,
            "Synced external contacts"
        );
        Ok(stats)
    }

    /// Add the sample contacts shown on a freshly initialised sheet.
    pub async fn seed_examples(&self, sheet: &SheetHandle) -> Result<Vec<ContactRecord>> {
        let mut added = Vec::new();
        for input in example_contacts() {
            added.push(self.add_contact(sheet, input).await?);
        }
        Ok(added)
    }

    async fn write_merged(
        &self,
        sheet: &SheetHandle,
        current: &LocatedContact,
        patch: ContactInput,
    ) -> Result<ContactRecord> {
        let mut record = current.record.clone();
        patch.apply_to(&mut record);
        record.updated_at = now_rfc3339();

        self.ensure_unchanged(sheet, current).await?;
        self.backend
            .update_values(
                &self.access_token,
                &sheet.spreadsheet_id,
                &row_range(current.row),
                vec![record.to_row()],
            )
            .await?;
        Ok(record)
    }

    /// Re-read one row and check it still holds the record we merged from.
    async fn ensure_unchanged(&self, sheet: &SheetHandle, expected: &LocatedContact) -> Result<()> {
        let rows = self
            .backend
            .get_values(
                &self.access_token,
                &sheet.spreadsheet_id,
                &row_range(expected.row),
            )
            .await?;

        let on_sheet = ContactRecord::from_row(rows.first().map(Vec::as_slice).unwrap_or(&[]));
        if on_sheet.id != expected.record.id || on_sheet.updated_at != expected.record.updated_at {
            tracing::warn!(
                contact_id = %expected.record.id,
                row = expected.row,
                "Contact row changed since it was read"
            );
            return Err(AppError::Conflict(format!(
                "Contact {} was modified concurrently; reload and retry",
                expected.record.id
            )));
        }
        Ok(())
    }
}

/// Map raw tab values (row 1 = header) to live contacts.
fn locate_contacts(values: Rows) -> Vec<LocatedContact> {
    values
        .into_iter()
        .enumerate()
        .skip(1)
        .map(|(index, row)| LocatedContact {
            row: index + 1,
            record: ContactRecord::from_row(&row),
        })
        .filter(|c| c.record.is_live())
        .collect()
}

fn full_range() -> String {
    format!("{}!A:{}", CONTACTS_TAB, LAST_COLUMN)
}

fn row_range(row: usize) -> String {
    format!("{}!A{}:{}{}", CONTACTS_TAB, row, LAST_COLUMN, row)
}

fn generate_contact_id() -> String {
    Uuid::new_v4().to_string()[..CONTACT_ID_LEN].to_string()
}

fn contact_not_found(contact_id: &str) -> AppError {
    AppError::NotFound(format!("Contact {} not found", contact_id))
}

fn example_contacts() -> Vec<ContactInput> {
    let example = |name: &str, email: &str, phone: &str, role: &str, notes: &str| ContactInput {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        organization: Some("Team Eagles".to_string()),
        role: Some(role.to_string()),
        notes: Some(notes.to_string()),
        ..Default::default()
    };

    vec![
        example(
            "John Smith",
            "john.smith@example.com",
            "(555) 123-4567",
            "Parent",
            "Parent of Tommy Smith",
        ),
        example(
            "Sarah Johnson",
            "sarah.j@example.com",
            "(555) 987-6543",
            "Student",
            "Pitcher, #12",
        ),
    ]
}
