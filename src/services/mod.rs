// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod contact_store;
pub mod google_oauth;
pub mod inter_service;
pub mod sessions;
pub mod sheets;
pub mod sheets_memory;

pub use contact_store::{ContactStore, SheetHandle};
pub use google_oauth::GoogleOAuthClient;
pub use inter_service::InterServiceClient;
pub use sessions::{SessionCredentials, SessionStore};
pub use sheets::{GoogleSheetsClient, SheetsBackend};
pub use sheets_memory::InMemorySheets;
