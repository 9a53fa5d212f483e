// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service catalog double with a fixed set of domains.

use std::collections::HashSet;

use async_trait::async_trait;

use canopy_core::{CanopyError, ServiceCatalog};

/// Knows exactly the `(project_id, domain_name)` pairs it was built with.
#[derive(Debug, Default, Clone)]
pub struct StaticServiceCatalog {
    domains: HashSet<(String, String)>,
}

impl StaticServiceCatalog {
    pub fn new<I, P, D>(domains: I) -> Self
    where
        I: IntoIterator<Item = (P, D)>,
        P: Into<String>,
        D: Into<String>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|(p, d)| (p.into(), d.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl ServiceCatalog for StaticServiceCatalog {
    async fn domain_exists(&self, project_id: &str, domain_name: &str) -> Result<bool, CanopyError> {
        Ok(self
            .domains
            .contains(&(project_id.to_string(), domain_name.to_string())))
    }
}
