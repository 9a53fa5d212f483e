// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow trait and registry.
//!
//! Workflow bodies live outside this crate. A worker process registers the
//! implementations it can run, and its conductor only claims jobs for those
//! flow names.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use canopy_core::{CanopyError, TaskArgs};

/// A named unit of work the conductor can run.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Flow name jobs are posted under.
    fn name(&self) -> &str;

    /// Run the flow with the arguments it was submitted with.
    async fn execute(&self, args: TaskArgs) -> Result<(), CanopyError>;
}

/// Registry of runnable workflows, indexed by name.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    flows: HashMap<String, Arc<dyn Workflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a workflow under its `name()`, replacing any previous one.
    pub fn register(&mut self, flow: Arc<dyn Workflow>) {
        self.flows.insert(flow.name().to_string(), flow);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Workflow>> {
        self.flows.get(name).cloned()
    }

    /// Registered flow names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.flows.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
