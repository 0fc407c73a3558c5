// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact records and their positional sheet-row encoding.

use serde::{Deserialize, Serialize};

/// Header row of a contact sheet. Column order is the row encoding: cells
/// are read and written by position, never looked up by header text.
pub const COLUMNS: [&str; 11] = [
    "ID",
    "Name",
    "Email",
    "Phone",
    "Organization",
    "Role",
    "Notes",
    "Tags",
    "Created",
    "Updated",
    "Source",
];

/// Provenance assigned when the caller does not supply one.
pub const DEFAULT_SOURCE: &str = "Dashboard";

const TAG_DELIMITER: char = ',';

/// One person in an owner's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub organization: String,
    pub role: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Provenance tag ("Dashboard", "Manual", ...)
    pub source: String,
}

impl ContactRecord {
    /// Decode a sheet row. Short rows are padded with empty cells.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();

        Self {
            id: cell(0),
            name: cell(1),
            email: cell(2),
            phone: cell(3),
            organization: cell(4),
            role: cell(5),
            notes: cell(6),
            tags: split_tags(&cell(7)),
            created_at: cell(8),
            updated_at: cell(9),
            source: cell(10),
        }
    }

    /// Encode as a fixed-width row in `COLUMNS` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.organization.clone(),
            self.role.clone(),
            self.notes.clone(),
            join_tags(&self.tags),
            self.created_at.clone(),
            self.updated_at.clone(),
            self.source.clone(),
        ]
    }

    /// A row only counts as a contact if it has a name or a phone number.
    /// Cleared (soft-deleted) rows fail this test.
    pub fn is_live(&self) -> bool {
        !self.name.is_empty() || !self.phone.is_empty()
    }
}

/// Tags as sent by callers: either a list or an already-joined string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl TagsInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            TagsInput::Text(text) => split_tags(&text),
        }
    }
}

/// Caller-supplied contact fields, used for add, patch and sync.
///
/// `None` means "not supplied". Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ContactInput {
    /// The supplied identifier, if non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether any compared field differs from `record`.
    ///
    /// Only name, email, phone, organization, role and notes are compared;
    /// a field the caller left out compares as the empty string.
    pub fn differs_from(&self, record: &ContactRecord) -> bool {
        let pairs = [
            (&self.name, &record.name),
            (&self.email, &record.email),
            (&self.phone, &record.phone),
            (&self.organization, &record.organization),
            (&self.role, &record.role),
            (&self.notes, &record.notes),
        ];

        pairs
            .iter()
            .any(|(supplied, stored)| supplied.as_deref().unwrap_or("") != stored.as_str())
    }

    /// Overwrite the supplied fields of `record`. Identity (`id`) and the
    /// creation timestamp are never touched.
    pub fn apply_to(self, record: &mut ContactRecord) {
        let ContactInput {
            id: _,
            name,
            email,
            phone,
            organization,
            role,
            notes,
            tags,
            source,
        } = self;

        if let Some(v) = name {
            record.name = v;
        }
        if let Some(v) = email {
            record.email = v;
        }
        if let Some(v) = phone {
            record.phone = v;
        }
        if let Some(v) = organization {
            record.organization = v;
        }
        if let Some(v) = role {
            record.role = v;
        }
        if let Some(v) = notes {
            record.notes = v;
        }
        if let Some(v) = tags {
            record.tags = v.into_vec();
        }
        if let Some(v) = source {
            record.source = v;
        }
    }
}

/// Outcome of a one-way sync into the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    /// Live sheet records before the sync plus those added by it
    pub total_sheet: usize,
    /// Size of the external collection
    pub total_dashboard: usize,
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_tags(tags: &[String]) -> String {
    tags.join(&TAG_DELIMITER.to_string())
}
