// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `recado-core::types` for use across
//! port boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use recado_core::types::{Direction, Interaction, InteractionStatus, LedgerKind};
