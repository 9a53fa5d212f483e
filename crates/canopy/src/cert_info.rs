// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `canopy cert-info` subcommands.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::info;

use canopy_config::CanopyConfig;
use canopy_core::{CanopyError, CertInfoStore, CertificateRecord, SanInfo};

use crate::runtime::Runtime;
use crate::{CertInfoAction, print_json, read_json};

pub(crate) async fn run(config: &CanopyConfig, action: CertInfoAction) -> Result<(), CanopyError> {
    let runtime = Runtime::open(config).await?;
    let result = execute(runtime.cert_info.as_ref(), action).await;
    runtime.shutdown().await?;
    result
}

async fn execute(store: &dyn CertInfoStore, action: CertInfoAction) -> Result<(), CanopyError> {
    match action {
        CertInfoAction::Show { hostname } => {
            let record = store.get_cert_info(&hostname).await?;
            let enabled = store.get_enabled_status(&hostname).await?;
            let mut value = serde_json::to_value(&record)?;
            value["enabled"] = json!(enabled);
            print_json(&value)
        }
        CertInfoAction::List => print_json(&store.list_all_san_cert_names().await?),
        CertInfoAction::Seed { file } => {
            let records: BTreeMap<String, CertificateRecord> = read_json(&file)?;
            let info = seed_table(records);
            let count = info.len();
            store.update_san_info(info).await?;
            info!(certificates = count, "certificate info table replaced");
            print_json(&store.list_all_san_cert_names().await?)
        }
        CertInfoAction::Enable { hostname } => set_enabled(store, &hostname, true).await,
        CertInfoAction::Disable { hostname } => set_enabled(store, &hostname, false).await,
        CertInfoAction::GetLimit => {
            let limit = store.get_san_cert_hostname_limit().await?;
            print_json(&json!({ "san_cert_hostname_limit": limit }))
        }
        CertInfoAction::SetLimit { limit } => {
            if limit == 0 {
                return Err(CanopyError::validation("limit must be at least 1"));
            }
            store.set_san_cert_hostname_limit(limit).await?;
            info!(limit, "SAN cert hostname limit updated");
            print_json(&json!({ "san_cert_hostname_limit": limit }))
        }
    }
}

async fn set_enabled(store: &dyn CertInfoStore, hostname: &str, enabled: bool) -> Result<(), CanopyError> {
    store.set_enabled_status(hostname, enabled).await?;
    info!(hostname = %hostname, enabled, "SAN cert enabled status updated");
    print_json(&json!({ "cnameHostname": hostname, "enabled": enabled }))
}

/// Key each record by its map key, filling in a missing `cnameHostname`.
fn seed_table(records: BTreeMap<String, CertificateRecord>) -> SanInfo {
    records
        .into_iter()
        .map(|(hostname, mut record)| {
            if record.cname_hostname.is_empty() {
                record.cname_hostname = hostname.clone();
            }
            (hostname, record)
        })
        .collect()
}
