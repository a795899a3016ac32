// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Recado core engine: interaction lifecycle service, follow-up rule
//! engine, dispatch and reconciliation workers, reply classification, and
//! the response handler.
//!
//! All components talk to the outside world exclusively through the ports
//! in `recado-core`; the composition root wires concrete adapters in.

pub mod classifier;
pub mod dispatch;
pub mod lifecycle;
pub mod reconcile;
pub mod response;
pub mod rules;

pub use dispatch::{DispatchTickSummary, DispatchWorker};
pub use lifecycle::InteractionLifecycle;
pub use reconcile::{ReconcileTickSummary, ReconcileWorker};
pub use response::ResponseHandler;
pub use rules::{FollowUpEngine, FollowUpRule, FollowUpTickSummary};
