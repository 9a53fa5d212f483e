// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Certificate info store backends.
//!
//! [`RecordCertInfoStore`] keeps the whole SAN table as JSON in one
//! `provider_info` row. [`TreeCertInfoStore`] spreads it over coordination
//! tree nodes, one node per record field. Both apply read-modify-write
//! without compare-and-swap, so concurrent writers race last-write-wins.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use canopy_core::{
    CanopyError, CertInfoStore, CertificateRecord, CoordinationTree, SanInfo,
};

use crate::database::Database;
use crate::queries;

/// Root of per-certificate nodes in the tree backend.
pub const CERT_INFO_ROOT: &str = "/cert_info";

/// Root of global setting nodes in the tree backend.
pub const CERT_INFO_SETTINGS_ROOT: &str = "/cert_info_settings";

const HOSTNAME_LIMIT_KEY: &str = "san_cert_hostname_limit";

fn require_complete(record: CertificateRecord) -> Result<CertificateRecord, CanopyError> {
    let missing = record.missing_fields();
    if missing.is_empty() {
        Ok(record)
    } else {
        Err(CanopyError::InvalidRecord {
            hostname: record.cname_hostname,
            missing,
        })
    }
}

fn malformed(hostname: &str, detail: impl ToString) -> CanopyError {
    CanopyError::MalformedRecord {
        hostname: hostname.to_string(),
        detail: detail.to_string(),
    }
}

/// Decode one stored record, taking `cnameHostname` from its key when unset.
fn decode_record(hostname: &str, value: Value) -> Result<CertificateRecord, CanopyError> {
    let mut record: CertificateRecord =
        serde_json::from_value(value).map_err(|e| malformed(hostname, e))?;
    if record.cname_hostname.is_empty() {
        record.cname_hostname = hostname.to_string();
    }
    Ok(record)
}

/// Read `enabled` without decoding the rest of the record.
fn enabled_flag(hostname: &str, value: Option<&Value>) -> Result<bool, CanopyError> {
    match value {
        None | Some(Value::Null) => Ok(true),
        Some(Value::Bool(enabled)) => Ok(*enabled),
        Some(other) => Err(malformed(hostname, format!("`enabled` is not a boolean: {other}"))),
    }
}

fn not_found(hostname: &str) -> CanopyError {
    CanopyError::RecordNotFound {
        hostname: hostname.to_string(),
    }
}

/// Global settings column of a provider row.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProviderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    san_cert_hostname_limit: Option<u32>,

    #[serde(flatten)]
    other: Map<String, Value>,
}

/// The `san_info` column, one undecoded JSON record per hostname.
type RawTable = Map<String, Value>;

/// Certificate info held in the `provider_info` record table.
///
/// Records are decoded one at a time, so a record that does not decode only
/// affects operations on its own hostname. Writes patch the stored JSON in
/// place and leave other records byte-for-byte as they were.
#[derive(Debug, Clone)]
pub struct RecordCertInfoStore {
    db: Database,
    provider_name: String,
    default_limit: u32,
}

impl RecordCertInfoStore {
    pub fn new(db: Database, provider_name: impl Into<String>, default_limit: u32) -> Self {
        Self {
            db,
            provider_name: provider_name.into(),
            default_limit,
        }
    }

    async fn load(&self) -> Result<RawTable, CanopyError> {
        let Some(row) = queries::provider_info::get(&self.db, &self.provider_name).await? else {
            return Ok(RawTable::new());
        };
        Ok(serde_json::from_str(&row.san_info)?)
    }

    async fn store(&self, table: &RawTable) -> Result<(), CanopyError> {
        let raw = serde_json::to_string(table)?;
        queries::provider_info::put_san_info(&self.db, &self.provider_name, raw).await
    }

    async fn load_record(&self, hostname: &str) -> Result<CertificateRecord, CanopyError> {
        let value = self
            .load()
            .await?
            .remove(hostname)
            .ok_or_else(|| not_found(hostname))?;
        decode_record(hostname, value)
    }

    /// Set `fields` on the stored record of `hostname`.
    async fn patch_record(
        &self,
        hostname: &str,
        fields: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Result<(), CanopyError> {
        let mut table = self.load().await?;
        match table.get_mut(hostname) {
            None => return Err(not_found(hostname)),
            Some(Value::Object(record)) => {
                for (field, value) in fields {
                    record.insert(field.to_string(), value);
                }
            }
            Some(_) => return Err(malformed(hostname, "record is not a JSON object")),
        }
        self.store(&table).await
    }

    async fn load_settings(&self) -> Result<ProviderSettings, CanopyError> {
        let row = queries::provider_info::get(&self.db, &self.provider_name).await?;
        match row.and_then(|r| r.settings) {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(ProviderSettings::default()),
        }
    }

    async fn store_settings(&self, settings: &ProviderSettings) -> Result<(), CanopyError> {
        let raw = serde_json::to_string(settings)?;
        queries::provider_info::put_settings(&self.db, &self.provider_name, raw).await
    }
}

#[async_trait]
impl CertInfoStore for RecordCertInfoStore {
    async fn get_cert_info(&self, hostname: &str) -> Result<CertificateRecord, CanopyError> {
        require_complete(self.load_record(hostname).await?)
    }

    async fn get_cert_last_spsid(&self, hostname: &str) -> Result<Option<i64>, CanopyError> {
        Ok(self.load_record(hostname).await?.sps_id)
    }

    async fn save_cert_last_ids(
        &self,
        hostname: &str,
        sps_id: i64,
        job_id: Option<i64>,
    ) -> Result<(), CanopyError> {
        let mut fields = vec![("spsId", Value::from(sps_id))];
        if let Some(job_id) = job_id {
            fields.push(("jobId", Value::from(job_id)));
        }
        self.patch_record(hostname, fields).await?;
        debug!(hostname, sps_id, ?job_id, "saved last provisioning ids");
        Ok(())
    }

    async fn get_enabled_status(&self, hostname: &str) -> Result<bool, CanopyError> {
        let table = self.load().await?;
        enabled_flag(hostname, table.get(hostname).and_then(|r| r.get("enabled")))
    }

    async fn set_enabled_status(&self, hostname: &str, enabled: bool) -> Result<(), CanopyError> {
        self.patch_record(hostname, [("enabled", Value::Bool(enabled))])
            .await?;
        info!(hostname, enabled, "updated SAN cert enabled status");
        Ok(())
    }

    async fn get_san_cert_hostname_limit(&self) -> Result<u32, CanopyError> {
        let mut settings = self.load_settings().await?;
        if let Some(limit) = settings.san_cert_hostname_limit {
            return Ok(limit);
        }
        settings.san_cert_hostname_limit = Some(self.default_limit);
        self.store_settings(&settings).await?;
        info!(limit = self.default_limit, "seeded SAN cert hostname limit");
        Ok(self.default_limit)
    }

    async fn set_san_cert_hostname_limit(&self, limit: u32) -> Result<(), CanopyError> {
        let mut settings = self.load_settings().await?;
        settings.san_cert_hostname_limit = Some(limit);
        self.store_settings(&settings).await
    }

    async fn list_all_san_cert_names(&self) -> Result<Vec<String>, CanopyError> {
        let mut names: Vec<String> = self.load().await?.into_iter().map(|(name, _)| name).collect();
        names.sort();
        Ok(names)
    }

    /// Every record that decodes; the rest are logged and left out.
    async fn get_san_info(&self) -> Result<SanInfo, CanopyError> {
        let mut info = SanInfo::new();
        for (hostname, value) in self.load().await? {
            match decode_record(&hostname, value) {
                Ok(record) => {
                    info.insert(hostname, record);
                }
                Err(e) => warn!(hostname = %hostname, error = %e, "skipping unreadable certificate record"),
            }
        }
        Ok(info)
    }

    async fn update_san_info(&self, info: SanInfo) -> Result<(), CanopyError> {
        let table = info
            .into_iter()
            .map(|(hostname, record)| Ok((hostname, serde_json::to_value(record)?)))
            .collect::<Result<RawTable, serde_json::Error>>()?;
        self.store(&table).await
    }
}

/// Certificate info spread over coordination tree nodes.
///
/// Layout: `/cert_info/<hostname>/<field>` holds one JSON-encoded field and
/// `/cert_info_settings/<setting>` one JSON-encoded setting.
#[derive(Clone)]
pub struct TreeCertInfoStore {
    tree: Arc<dyn CoordinationTree>,
    default_limit: u32,
}

impl TreeCertInfoStore {
    pub fn new(tree: Arc<dyn CoordinationTree>, default_limit: u32) -> Self {
        Self {
            tree,
            default_limit,
        }
    }

    fn record_path(hostname: &str) -> String {
        format!("{CERT_INFO_ROOT}/{hostname}")
    }

    fn field_path(hostname: &str, field: &str) -> String {
        format!("{CERT_INFO_ROOT}/{hostname}/{field}")
    }

    fn setting_path(setting: &str) -> String {
        format!("{CERT_INFO_SETTINGS_ROOT}/{setting}")
    }

    async fn read_json(&self, path: &str) -> Result<Option<Value>, CanopyError> {
        match self.tree.get(path).await? {
            Some(bytes) if bytes.is_empty() => Ok(Some(Value::Null)),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_json(&self, path: &str, value: &Value) -> Result<(), CanopyError> {
        self.tree.set(path, serde_json::to_vec(value)?).await
    }

    async fn exists(&self, hostname: &str) -> Result<bool, CanopyError> {
        Ok(self.tree.get(&Self::record_path(hostname)).await?.is_some())
    }

    async fn read_record(&self, hostname: &str) -> Result<CertificateRecord, CanopyError> {
        if !self.exists(hostname).await? {
            return Err(not_found(hostname));
        }
        let mut fields = Map::new();
        for field in self.tree.get_children(&Self::record_path(hostname)).await? {
            if let Some(value) = self.read_json(&Self::field_path(hostname, &field)).await? {
                fields.insert(field, value);
            }
        }
        fields.insert("cnameHostname".to_string(), Value::String(hostname.to_string()));
        decode_record(hostname, Value::Object(fields))
    }

    async fn write_record(&self, hostname: &str, record: &CertificateRecord) -> Result<(), CanopyError> {
        self.tree.ensure_path(&Self::record_path(hostname)).await?;
        let Value::Object(fields) = serde_json::to_value(record)? else {
            return Err(CanopyError::Internal(
                "certificate record did not serialize to an object".to_string(),
            ));
        };
        for (field, value) in fields {
            if field == "cnameHostname" {
                continue;
            }
            self.write_json(&Self::field_path(hostname, &field), &value).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CertInfoStore for TreeCertInfoStore {
    async fn get_cert_info(&self, hostname: &str) -> Result<CertificateRecord, CanopyError> {
        require_complete(self.read_record(hostname).await?)
    }

    async fn get_cert_last_spsid(&self, hostname: &str) -> Result<Option<i64>, CanopyError> {
        Ok(self.read_record(hostname).await?.sps_id)
    }

    async fn save_cert_last_ids(
        &self,
        hostname: &str,
        sps_id: i64,
        job_id: Option<i64>,
    ) -> Result<(), CanopyError> {
        if !self.exists(hostname).await? {
            return Err(not_found(hostname));
        }
        self.write_json(&Self::field_path(hostname, "spsId"), &Value::from(sps_id))
            .await?;
        if let Some(job_id) = job_id {
            self.write_json(&Self::field_path(hostname, "jobId"), &Value::from(job_id))
                .await?;
        }
        debug!(hostname, sps_id, ?job_id, "saved last provisioning ids");
        Ok(())
    }

    async fn get_enabled_status(&self, hostname: &str) -> Result<bool, CanopyError> {
        let value = self.read_json(&Self::field_path(hostname, "enabled")).await?;
        enabled_flag(hostname, value.as_ref())
    }

    async fn set_enabled_status(&self, hostname: &str, enabled: bool) -> Result<(), CanopyError> {
        if !self.exists(hostname).await? {
            return Err(not_found(hostname));
        }
        self.write_json(&Self::field_path(hostname, "enabled"), &Value::Bool(enabled))
            .await?;
        info!(hostname, enabled, "updated SAN cert enabled status");
        Ok(())
    }

    async fn get_san_cert_hostname_limit(&self) -> Result<u32, CanopyError> {
        let path = Self::setting_path(HOSTNAME_LIMIT_KEY);
        if let Some(value) = self.read_json(&path).await?
            && let Some(limit) = value.as_u64().and_then(|v| u32::try_from(v).ok())
        {
            return Ok(limit);
        }
        self.write_json(&path, &Value::from(self.default_limit)).await?;
        info!(limit = self.default_limit, "seeded SAN cert hostname limit");
        Ok(self.default_limit)
    }

    async fn set_san_cert_hostname_limit(&self, limit: u32) -> Result<(), CanopyError> {
        self.write_json(&Self::setting_path(HOSTNAME_LIMIT_KEY), &Value::from(limit))
            .await
    }

    async fn list_all_san_cert_names(&self) -> Result<Vec<String>, CanopyError> {
        self.tree.get_children(CERT_INFO_ROOT).await
    }

    async fn get_san_info(&self) -> Result<SanInfo, CanopyError> {
        let mut info = SanInfo::new();
        for hostname in self.list_all_san_cert_names().await? {
            match self.read_record(&hostname).await {
                Ok(record) => {
                    info.insert(hostname, record);
                }
                Err(e @ CanopyError::MalformedRecord { .. }) => {
                    warn!(hostname = %hostname, error = %e, "skipping unreadable certificate record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(info)
    }

    async fn update_san_info(&self, info: SanInfo) -> Result<(), CanopyError> {
        self.tree.delete_recursive(CERT_INFO_ROOT).await?;
        self.tree.ensure_path(CERT_INFO_ROOT).await?;
        for (hostname, record) in &info {
            self.write_record(hostname, record).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::SqliteCoordinationTree;

    fn complete_record(hostname: &str) -> CertificateRecord {
        CertificateRecord {
            job_id: Some(7),
            issuer: Some("symantec".to_string()),
            ip_version: Some("ipv4".to_string()),
            slot_deployment_klass: Some("esslType".to_string()),
            sps_id: Some(1001),
            ..CertificateRecord::new(hostname)
        }
    }

    async fn record_store() -> RecordCertInfoStore {
        let db = Database::open_in_memory().await.unwrap();
        RecordCertInfoStore::new(db, "akamai", 80)
    }

    async fn tree_store() -> TreeCertInfoStore {
        let db = Database::open_in_memory().await.unwrap();
        TreeCertInfoStore::new(Arc::new(SqliteCoordinationTree::new(db)), 80)
    }

    async fn seeded(store: &dyn CertInfoStore) {
        let mut info = SanInfo::new();
        info.insert("san1.example.net".into(), complete_record("san1.example.net"));
        let mut partial = CertificateRecord::new("san2.example.net");
        partial.issuer = Some("symantec".into());
        info.insert("san2.example.net".into(), partial);
        store.update_san_info(info).await.unwrap();
    }

    async fn exercise(store: &dyn CertInfoStore) {
        seeded(store).await;

        let record = store.get_cert_info("san1.example.net").await.unwrap();
        assert_eq!(record, complete_record("san1.example.net"));

        let err = store.get_cert_info("san2.example.net").await.unwrap_err();
        assert!(matches!(
            err,
            CanopyError::InvalidRecord { ref missing, .. }
                if missing == &vec!["jobId", "ipVersion", "slot-deployment.klass"]
        ));

        let err = store.get_cert_info("absent.example.net").await.unwrap_err();
        assert!(matches!(err, CanopyError::RecordNotFound { .. }));

        store
            .save_cert_last_ids("san1.example.net", 2002, Some(8))
            .await
            .unwrap();
        let record = store.get_cert_info("san1.example.net").await.unwrap();
        assert_eq!(record.sps_id, Some(2002));
        assert_eq!(record.job_id, Some(8));
        assert_eq!(record.issuer.as_deref(), Some("symantec"));
        assert_eq!(
            store.get_cert_last_spsid("san1.example.net").await.unwrap(),
            Some(2002)
        );

        store
            .save_cert_last_ids("san1.example.net", 3003, None)
            .await
            .unwrap();
        let record = store.get_cert_info("san1.example.net").await.unwrap();
        assert_eq!(record.job_id, Some(8));

        assert!(store.get_enabled_status("san1.example.net").await.unwrap());
        store
            .set_enabled_status("san1.example.net", false)
            .await
            .unwrap();
        assert!(!store.get_enabled_status("san1.example.net").await.unwrap());
        assert!(store.get_enabled_status("absent.example.net").await.unwrap());
        assert!(
            store
                .set_enabled_status("absent.example.net", false)
                .await
                .is_err()
        );

        assert_eq!(
            store.list_all_san_cert_names().await.unwrap(),
            vec!["san1.example.net".to_string(), "san2.example.net".to_string()]
        );
    }

    async fn exercise_limit(store: &dyn CertInfoStore) {
        assert_eq!(store.get_san_cert_hostname_limit().await.unwrap(), 80);
        store.set_san_cert_hostname_limit(100).await.unwrap();
        assert_eq!(store.get_san_cert_hostname_limit().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn record_backend_behaves() {
        let store = record_store().await;
        exercise(&store).await;
        exercise_limit(&store).await;
    }

    #[tokio::test]
    async fn tree_backend_behaves() {
        let store = tree_store().await;
        exercise(&store).await;
        exercise_limit(&store).await;
    }

    #[tokio::test]
    async fn record_backend_fills_hostname_from_key() {
        let store = record_store().await;
        queries::provider_info::put_san_info(
            &store.db,
            "akamai",
            r#"{"san9.example.net":{"jobId":1,"issuer":"x","ipVersion":"ipv4","slot-deployment.klass":"esslType","spsId":5}}"#
                .into(),
        )
        .await
        .unwrap();
        let record = store.get_cert_info("san9.example.net").await.unwrap();
        assert_eq!(record.cname_hostname, "san9.example.net");
        assert_eq!(record.create_type, "modSan");
    }

    #[tokio::test]
    async fn record_backend_accepts_underscore_klass_key() {
        let store = record_store().await;
        queries::provider_info::put_san_info(
            &store.db,
            "akamai",
            r#"{"san1.example.net":{"jobId":1,"issuer":"x","ipVersion":"ipv4","slot_deployment_klass":"esslType","spsId":5}}"#
                .into(),
        )
        .await
        .unwrap();
        let record = store.get_cert_info("san1.example.net").await.unwrap();
        assert_eq!(record.slot_deployment_klass.as_deref(), Some("esslType"));
    }

    #[tokio::test]
    async fn unreadable_record_only_affects_its_hostname() {
        let store = record_store().await;
        queries::provider_info::put_san_info(
            &store.db,
            "akamai",
            r#"{"bad.example.net":{"jobId":"4312","keep":"me"},"good.example.net":{"jobId":1,"issuer":"x","ipVersion":"ipv4","slot-deployment.klass":"esslType","spsId":5}}"#
                .into(),
        )
        .await
        .unwrap();

        assert_eq!(
            store.list_all_san_cert_names().await.unwrap(),
            vec!["bad.example.net".to_string(), "good.example.net".to_string()]
        );
        assert_eq!(
            store.get_cert_info("good.example.net").await.unwrap().job_id,
            Some(1)
        );
        assert!(store.get_enabled_status("good.example.net").await.unwrap());
        assert!(store.get_enabled_status("bad.example.net").await.unwrap());

        let err = store.get_cert_info("bad.example.net").await.unwrap_err();
        assert!(matches!(err, CanopyError::MalformedRecord { ref hostname, .. } if hostname == "bad.example.net"));

        let info = store.get_san_info().await.unwrap();
        assert_eq!(info.keys().collect::<Vec<_>>(), vec!["good.example.net"]);

        // Writes to one record leave the unreadable one as stored.
        store.set_enabled_status("good.example.net", false).await.unwrap();
        store.save_cert_last_ids("bad.example.net", 77, None).await.unwrap();
        assert!(!store.get_enabled_status("good.example.net").await.unwrap());
        let row = queries::provider_info::get(&store.db, "akamai")
            .await
            .unwrap()
            .unwrap();
        let table: Value = serde_json::from_str(&row.san_info).unwrap();
        assert_eq!(table["bad.example.net"]["jobId"], "4312");
        assert_eq!(table["bad.example.net"]["keep"], "me");
        assert_eq!(table["bad.example.net"]["spsId"], 77);
    }

    #[tokio::test]
    async fn tree_backend_skips_unreadable_record_in_listing() {
        let store = tree_store().await;
        seeded(&store).await;
        store
            .tree
            .set(
                &TreeCertInfoStore::field_path("san1.example.net", "jobId"),
                br#""4312""#.to_vec(),
            )
            .await
            .unwrap();

        let err = store.get_cert_info("san1.example.net").await.unwrap_err();
        assert!(matches!(err, CanopyError::MalformedRecord { .. }));
        let info = store.get_san_info().await.unwrap();
        assert_eq!(info.keys().collect::<Vec<_>>(), vec!["san2.example.net"]);
    }

    #[tokio::test]
    async fn limit_is_seeded_once() {
        let store = record_store().await;
        assert_eq!(store.get_san_cert_hostname_limit().await.unwrap(), 80);
        let row = queries::provider_info::get(&store.db, "akamai")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.settings.as_deref(), Some(r#"{"san_cert_hostname_limit":80}"#));
    }

    #[tokio::test]
    async fn update_san_info_replaces_whole_table() {
        let store = tree_store().await;
        seeded(&store).await;

        let mut info = SanInfo::new();
        info.insert("san3.example.net".into(), complete_record("san3.example.net"));
        store.update_san_info(info.clone()).await.unwrap();

        assert_eq!(store.get_san_info().await.unwrap(), info);
    }
}
