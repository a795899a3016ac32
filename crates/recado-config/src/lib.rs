// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Recado messaging pipeline.
//!
//! Layered TOML configuration with environment variable overrides, loaded
//! through Figment. See [`loader::load_config`] for the merge order.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::RecadoConfig;
