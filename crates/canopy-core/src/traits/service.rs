// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup into the tenant service catalog.

use async_trait::async_trait;

use crate::error::CanopyError;

/// Read access to the services owned by tenants.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Whether some service in `project_id` serves `domain_name`.
    async fn domain_exists(&self, project_id: &str, domain_name: &str) -> Result<bool, CanopyError>;
}
