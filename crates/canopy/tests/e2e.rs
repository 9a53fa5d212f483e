// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the mod-SAN pipeline over real SQLite storage.
//!
//! Each test creates an isolated TestHarness with a temp database. Tests are
//! independent and order-insensitive.

use std::sync::Arc;

use serde_json::{Value, json};

use canopy_config::model::CertInfoBackend;
use canopy_core::{
    AKAMAI_PROVIDER, CHECK_CERT_STATUS_AND_UPDATE_FLOW, CanopyError, CertificateRecord,
    MappingRequest, SanRetryEntry, TaskSubmitter, UPDATE_PROPERTY_FLOW,
};
use canopy_modsan::{BackgroundJobController, IgnoredEntry, MappingQueue, SanRetryAdmin};
use canopy_taskflow::JobState;
use canopy_test_utils::TestHarness;

const CHECK_JOB: &str = "akamai_check_and_update_cert_status";
const PAPI_JOB: &str = "akamai_update_papi_property_for_mod_san";

fn controller_with(harness: &TestHarness, submitter: Arc<dyn TaskSubmitter>) -> Arc<BackgroundJobController> {
    Arc::new(BackgroundJobController::new(
        MappingQueue::new(harness.queue.clone()),
        harness.cert_info.clone(),
        submitter,
        harness.config.mod_san.clone(),
    ))
}

fn controller(harness: &TestHarness) -> Arc<BackgroundJobController> {
    controller_with(harness, harness.submitter.clone())
}

fn retry_entry(domain: &str) -> Value {
    json!({ "project_id": "p1", "domain_name": domain, "flavor_id": "f1" })
}

// ---- Scenario A: activated item is submitted and leaves the queue ----

#[tokio::test]
async fn activated_item_moves_to_run_list() {
    let harness = TestHarness::builder().build().await.unwrap();
    let item = json!({
        "domain_name": "a.com",
        "project_id": "p1",
        "flavor_id": "f1",
        "property_activated": true
    });
    harness.queue.put(item.to_string()).await.unwrap();

    let outcome = controller(&harness).post_job(CHECK_JOB, json!({})).await.unwrap();

    let expected: MappingRequest = serde_json::from_value(item).unwrap();
    assert_eq!(outcome.run_list, vec![expected]);
    assert!(outcome.ignore_list.is_empty());
    assert!(harness.queue_contents().await.unwrap().is_empty());

    let calls = harness.submitter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, CHECK_CERT_STATUS_AND_UPDATE_FLOW);
    assert_eq!(calls[0].1["project_id"], "p1");
    let cert_obj: Value =
        serde_json::from_str(calls[0].1["cert_obj_json"].as_str().unwrap()).unwrap();
    assert_eq!(cert_obj["domain_name"], "a.com");
    assert!(cert_obj.get("cert_type").is_none());
}

// ---- Scenario B: unactivated item stays queued and is ignored ----

#[tokio::test]
async fn unactivated_item_is_requeued() {
    let harness = TestHarness::builder().build().await.unwrap();
    let item = json!({ "domain_name": "a.com", "project_id": "p1", "flavor_id": "f1" }).to_string();
    harness.queue.put(item.clone()).await.unwrap();

    let outcome = controller(&harness).post_job(CHECK_JOB, json!({})).await.unwrap();

    assert!(outcome.run_list.is_empty());
    assert_eq!(
        outcome.ignore_list,
        vec![IgnoredEntry::Request(MappingRequest::new("a.com", "p1", "f1"))]
    );
    assert_eq!(harness.queue_contents().await.unwrap(), vec![item]);
    assert!(harness.submitter.calls().is_empty());
}

// ---- Scenario C: replacing the retry list reports normalized deletions ----

#[tokio::test]
async fn retry_list_replacement_reports_deleted_entries() {
    let harness = TestHarness::builder().build().await.unwrap();
    let admin = SanRetryAdmin::new(controller(&harness));

    admin
        .admin_put_san_retry_list(vec![retry_entry("d1"), retry_entry("d2")])
        .await
        .unwrap();
    let update = admin
        .admin_put_san_retry_list(vec![retry_entry("d2")])
        .await
        .unwrap();

    let entry = |domain: &str| SanRetryEntry {
        project_id: "p1".into(),
        domain_name: domain.into(),
        flavor_id: "f1".into(),
        validate_service: true,
    };
    assert_eq!(update.deleted, vec![entry("d1")]);
    assert_eq!(update.queue, vec![entry("d2")]);
    assert_eq!(admin.admin_get_san_retry_list().await.unwrap(), vec![entry("d2")]);
}

// ---- Queue properties over SQLite ----

#[tokio::test]
async fn non_destructive_traverse_preserves_fifo_order() {
    let harness = TestHarness::builder().build().await.unwrap();
    let queue = MappingQueue::new(harness.queue.clone());
    for item in ["a", "b", "c"] {
        queue.enqueue(item.to_string()).await.unwrap();
    }

    assert_eq!(queue.traverse_queue(false).await.unwrap(), vec!["a", "b", "c"]);
    assert_eq!(harness.queue_contents().await.unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn replace_is_total() {
    let harness = TestHarness::builder().build().await.unwrap();
    let queue = MappingQueue::new(harness.queue.clone());
    queue.enqueue("stale".to_string()).await.unwrap();

    let replacement = vec!["x".to_string(), "y".to_string(), "x".to_string()];
    queue.put_queue_data(replacement.clone()).await.unwrap();
    assert_eq!(queue.traverse_queue(false).await.unwrap(), replacement);

    queue.put_queue_data(Vec::new()).await.unwrap();
    assert!(queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn mapping_list_replacement_diffs_against_previous_contents() {
    let harness = TestHarness::builder().build().await.unwrap();
    let controller = controller(&harness);
    let a = MappingRequest::new("a.com", "p1", "f1");
    let b = MappingRequest::new("b.com", "p1", "f1");
    let c = MappingRequest::new("c.com", "p2", "f1");
    controller
        .put_san_mapping_list(vec![a.clone(), b.clone()])
        .await
        .unwrap();

    let (queue, deleted) = controller
        .put_san_mapping_list(vec![b.clone(), c.clone(), c.clone()])
        .await
        .unwrap();

    assert_eq!(queue, vec![b.clone(), c.clone(), c.clone()]);
    assert_eq!(deleted, vec![a]);
    assert_eq!(controller.get_san_mapping_list().await.unwrap(), vec![b, c.clone(), c]);
}

// ---- Failure handling ----

#[tokio::test]
async fn failed_submission_keeps_item_on_queue() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut activated = MappingRequest::new("a.com", "p1", "f1");
    activated.property_activated = Some(true);
    harness.queue.put(activated.to_json().unwrap()).await.unwrap();
    harness.submitter.fail_next(1);

    let outcome = controller(&harness).post_job(CHECK_JOB, json!({})).await.unwrap();

    assert!(outcome.run_list.is_empty());
    assert!(outcome.lost.is_empty());
    assert_eq!(outcome.ignore_list.len(), 1);
    assert!(outcome.ignore_list[0].error_message().is_some());

    let remaining = harness.queue_contents().await.unwrap();
    assert_eq!(remaining.len(), 1);
    let requeued = MappingRequest::from_json(&remaining[0]).unwrap();
    assert_eq!(requeued.domain_name, "a.com");
    assert!(requeued.error_message.is_some());

    // The annotated item is submitted on the next cycle.
    let outcome = controller(&harness).post_job(CHECK_JOB, json!({})).await.unwrap();
    assert_eq!(outcome.run_list.len(), 1);
    assert!(harness.queue_contents().await.unwrap().is_empty());
}

#[tokio::test]
async fn only_activated_items_leave_the_queue() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut items = Vec::new();
    for (domain, activated) in [("a.com", Some(true)), ("b.com", Some(false)), ("c.com", None), ("d.com", Some(true))] {
        let mut req = MappingRequest::new(domain, "p1", "f1");
        req.property_activated = activated;
        items.push(req.to_json().unwrap());
    }
    harness.queue.put_all(items.clone()).await.unwrap();

    let outcome = controller(&harness).post_job(CHECK_JOB, json!({})).await.unwrap();

    let run: Vec<&str> = outcome.run_list.iter().map(|r| r.domain_name.as_str()).collect();
    assert_eq!(run, vec!["a.com", "d.com"]);
    assert_eq!(outcome.ignore_list.len(), 2);
    assert_eq!(harness.queue_contents().await.unwrap(), vec![items[1].clone(), items[2].clone()]);
}

#[tokio::test]
async fn incomplete_retry_entry_is_rejected_without_touching_queue() {
    let harness = TestHarness::builder().build().await.unwrap();
    let admin = SanRetryAdmin::new(controller(&harness));
    admin
        .admin_put_san_retry_list(vec![retry_entry("d1")])
        .await
        .unwrap();
    let before = harness.queue_contents().await.unwrap();

    let err = admin
        .admin_put_san_retry_list(vec![
            retry_entry("d2"),
            json!({ "project_id": "p1", "flavor_id": "f1" }),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    match err {
        CanopyError::ValidationFailed { errors } => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("domain_name"), "{errors:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.queue_contents().await.unwrap(), before);
}

#[tokio::test]
async fn unknown_job_type_is_a_client_error() {
    let harness = TestHarness::builder().build().await.unwrap();
    let err = controller(&harness)
        .post_job("akamai_rotate_everything", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::UnknownJobType(_)));
    assert_eq!(err.status_code(), 400);
}

// ---- Property update job through the real job board ----

#[tokio::test]
async fn property_update_is_posted_to_job_board() {
    let harness = TestHarness::builder()
        .with_san_cert_cnames(["secure1.san1.example.net", "secure2.san1.example.net"])
        .with_cert_record(CertificateRecord::new("secure1.san1.example.net"))
        .with_cert_record(CertificateRecord {
            enabled: Some(false),
            ..CertificateRecord::new("secure2.san1.example.net")
        })
        .build()
        .await
        .unwrap();
    let controller = controller_with(&harness, harness.taskflow.clone());

    let ok = MappingRequest::new("www.a.com", "p1", "f1")
        .with_san_cert(AKAMAI_PROVIDER, "secure1.san1.example.net");
    let disabled = MappingRequest::new("www.b.com", "p1", "f1")
        .with_san_cert(AKAMAI_PROVIDER, "secure2.san1.example.net");
    let unknown = MappingRequest::new("www.c.com", "p1", "f1")
        .with_san_cert(AKAMAI_PROVIDER, "rogue.example.net");
    for req in [&ok, &disabled, &unknown] {
        harness.queue.put(req.to_json().unwrap()).await.unwrap();
    }

    let outcome = controller.post_job(PAPI_JOB, json!({})).await.unwrap();

    assert_eq!(outcome.run_list, vec![ok]);
    let messages: Vec<&str> = outcome
        .ignore_list
        .iter()
        .filter_map(IgnoredEntry::error_message)
        .collect();
    assert_eq!(
        messages,
        vec![
            "SAN cert secure2.san1.example.net is disabled",
            "Not a valid san cert cname: rogue.example.net",
        ]
    );
    // The scan leaves the queue untouched.
    assert_eq!(harness.queue.len().await.unwrap(), 3);

    let jobs = harness.taskflow.board().jobs(Some(JobState::Unclaimed)).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].flow_name, UPDATE_PROPERTY_FLOW);
    assert_eq!(jobs[0].details["update_type"], "hostnames");
    let update_info: Value =
        serde_json::from_str(jobs[0].details["update_info_list"].as_str().unwrap()).unwrap();
    assert_eq!(
        update_info,
        json!([["add", [{
            "cnameFrom": "www.a.com",
            "cnameTo": "secure1.san1.example.net.edgekey.net",
            "cnameType": "EDGE_HOSTNAME"
        }]]])
    );
}

#[tokio::test]
async fn tree_backend_gates_property_update_on_enabled_status() {
    let harness = TestHarness::builder()
        .with_cert_backend(CertInfoBackend::Tree)
        .with_cert_record(CertificateRecord::new("secure1.san1.example.net"))
        .build()
        .await
        .unwrap();
    let controller = controller(&harness);
    let req = MappingRequest::new("www.a.com", "p1", "f1")
        .with_san_cert(AKAMAI_PROVIDER, "secure1.san1.example.net");
    harness.queue.put(req.to_json().unwrap()).await.unwrap();

    harness
        .cert_info
        .set_enabled_status("secure1.san1.example.net", false)
        .await
        .unwrap();
    let outcome = controller.post_job(PAPI_JOB, json!({})).await.unwrap();
    assert!(outcome.run_list.is_empty());
    assert!(harness.submitter.calls().is_empty());

    harness
        .cert_info
        .set_enabled_status("secure1.san1.example.net", true)
        .await
        .unwrap();
    let outcome = controller.post_job(PAPI_JOB, json!({})).await.unwrap();
    assert_eq!(outcome.run_list, vec![req]);
    assert_eq!(harness.submitter.calls()[0].0, UPDATE_PROPERTY_FLOW);
}
