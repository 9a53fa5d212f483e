// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the tables behind each storage entity.

pub mod provider_info;
pub mod queue;
pub mod tree;
