// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Port traits at the seams of the messaging pipeline.
//!
//! The engine only ever talks to the outside world through these traits:
//! the messaging gateway, the interaction store, and the two narrow
//! collaborator directories of the surrounding marketplace backend.

pub mod directory;
pub mod gateway;
pub mod store;

pub use directory::{RecipientDirectory, RequestDirectory};
pub use gateway::MessagingGateway;
pub use store::InteractionStore;
