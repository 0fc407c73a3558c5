// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod contact;
pub mod token;

pub use contact::{ContactInput, ContactRecord, SyncStats, TagsInput};
pub use token::{CachedTokenRecord, TokenBundle};
