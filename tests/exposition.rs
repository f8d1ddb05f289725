//! End-to-end tests of the HTTP surface over a real listener.

use std::sync::Arc;

use kdiscovery::discovery::UpdateBatch;
use kdiscovery::Aggregator;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn probes_answer_before_any_discovery() {
    let (addr, _shutdown) = common::start_server(Arc::new(Aggregator::default())).await;
    let client = common::client();

    for path in ["/health", "/readiness"] {
        let res = client
            .get(format!("http://{}{}", addr, path))
            .send()
            .await
            .expect("server unreachable");
        assert_eq!(res.status(), 200);
        assert!(res.text().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn snapshot_excludes_reserved_namespace_and_drops_deleted_jobs() {
    let aggregator = Arc::new(Aggregator::default());
    let (addr, _shutdown) = common::start_server(aggregator.clone()).await;
    let client = common::client();
    let url = format!("http://{}/", addr);

    aggregator.apply_batch(UpdateBatch::from([(
        "jobA".to_string(),
        vec![common::group("pods", &[("e1", "default"), ("e2", "kdiscovery")])],
    )]));

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "jobA": [{
                "targets": [{
                    "__address__": "e1",
                    "__meta_kubernetes_namespace": "default"
                }],
                "source": "pods"
            }]
        })
    );

    aggregator.apply_batch(UpdateBatch::from([("jobA".to_string(), Vec::new())]));
    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn concurrent_clients_see_whole_batches() {
    let aggregator = Arc::new(Aggregator::default());
    let (addr, _shutdown) = common::start_server(aggregator.clone()).await;
    let url = format!("http://{}/", addr);

    let batch = |n: usize| {
        let a = format!("a{n}");
        let b = format!("b{n}");
        UpdateBatch::from([(
            "job".to_string(),
            vec![common::group("g", &[(a.as_str(), "default"), (b.as_str(), "default")])],
        )])
    };
    aggregator.apply_batch(batch(0));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let url = url.clone();
            tokio::spawn(async move {
                let client = common::client();
                for _ in 0..25 {
                    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
                    let targets = body["job"][0]["targets"].as_array().unwrap();
                    let a = targets[0]["__address__"].as_str().unwrap();
                    let b = targets[1]["__address__"].as_str().unwrap();
                    assert_eq!(a[1..], b[1..], "torn read: {a} / {b}");
                }
            })
        })
        .collect();

    for n in 1..100 {
        aggregator.apply_batch(batch(n));
        tokio::task::yield_now().await;
    }
    for reader in readers {
        reader.await.unwrap();
    }
}
