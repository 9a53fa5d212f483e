// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `canopy serve` command implementation.
//!
//! Opens storage, wires the background job controller and runs the job
//! scheduler until SIGINT or SIGTERM. Submitted workflows are executed by
//! task workers consuming the job board, not by this process.

use canopy_config::CanopyConfig;
use canopy_core::CanopyError;
use canopy_modsan::JobScheduler;
use tracing::info;

use crate::runtime::Runtime;
use crate::shutdown;

/// Runs the `canopy serve` command.
pub(crate) async fn run_serve(config: CanopyConfig) -> Result<(), CanopyError> {
    info!(name = %config.daemon.name, "starting canopy serve");

    let runtime = Runtime::open(&config).await?;
    let cancel = shutdown::install_signal_handler();

    if config.scheduler.enabled {
        let scheduler = JobScheduler::from_config(runtime.controller.clone(), &config.scheduler)?;
        scheduler.run(cancel).await;
    } else {
        info!("job scheduler disabled, waiting for shutdown signal");
        cancel.cancelled().await;
    }

    runtime.shutdown().await?;
    info!("canopy serve stopped");
    Ok(())
}
