// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Recado integration tests.
//!
//! Provides mock implementations of the core ports for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockGateway`] - Mock messaging gateway with scripted send outcomes
//! - [`MockRequestDirectory`] / [`MockRecipientDirectory`] - in-memory
//!   marketplace collaborators
//! - [`temp_store`] - temp-file SQLite store for pipeline tests

pub mod mock_directory;
pub mod mock_gateway;

pub use mock_directory::{MockRecipientDirectory, MockRequestDirectory};
pub use mock_gateway::{MockGateway, SendOutcome};

use recado_config::model::StorageConfig;
use recado_storage::SqliteInteractionStore;

/// Open a SQLite interaction store backed by a temp directory.
///
/// The returned `TempDir` must be kept alive for the store's lifetime.
pub async fn temp_store() -> (SqliteInteractionStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("recado-test.db");
    let config = StorageConfig {
        database_path: db_path.to_string_lossy().into_owned(),
    };
    let store = SqliteInteractionStore::open(&config)
        .await
        .expect("failed to open test store");
    (store, dir)
}
