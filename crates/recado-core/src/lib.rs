// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Recado follow-up messaging pipeline.
//!
//! This crate provides the domain types, error type, and port traits used
//! throughout the Recado workspace. It performs no I/O; adapters for
//! storage, the messaging provider, and the marketplace collaborators
//! implement the traits defined here.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::RecadoError;
pub use types::{
    Classification, Direction, FollowUpOutcome, InboundOutcome, Intent, Interaction,
    InteractionStatus, LedgerKind, RequestTransition, StaleRequest, StatusOutcome,
};

pub use traits::{InteractionStore, MessagingGateway, RecipientDirectory, RequestDirectory};
