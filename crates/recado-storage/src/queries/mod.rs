// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All functions accept `&Database` and run their
//! statements on the single writer connection.

pub mod interactions;
pub mod ledger;
