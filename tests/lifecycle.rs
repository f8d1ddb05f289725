//! Full process runs: discovery from files through to HTTP, then draining.

use std::time::Duration;

use kdiscovery::config::load_discovery_config;
use kdiscovery::{App, Phase, Settings};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

mod common;

const TIMEOUT: Duration = Duration::from_secs(10);

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.discovery.update_interval_ms = 50;
    settings.shutdown.grace_period_secs = 1;
    settings
}

#[tokio::test]
async fn file_discovery_flows_to_http_and_drains_on_signal() {
    let dir = tempfile::tempdir().unwrap();
    let targets = dir.path().join("targets.json");
    std::fs::write(
        &targets,
        r#"[
            {"targets": ["10.0.0.1:9100"], "labels": {"__meta_kubernetes_namespace": "default"}},
            {"targets": ["10.0.0.2:9100"], "labels": {"__meta_kubernetes_namespace": "kdiscovery"}}
        ]"#,
    )
    .unwrap();

    let prometheus = dir.path().join("prometheus.yml");
    std::fs::write(
        &prometheus,
        format!(
            "scrape_configs:\n  - job_name: node\n    file_sd_configs:\n      - files: ['{}']\n        refresh_interval: 100ms\n",
            targets.display()
        ),
    )
    .unwrap();
    let jobs = load_discovery_config(&prometheus).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let app = App::new(settings(), jobs);
    let phase = app.phase();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.run(listener, async {
        let _ = stop_rx.await;
    }));

    let client = common::client();
    let body = common::eventually(TIMEOUT, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let body: Value = client.get(&url).send().await.ok()?.json().await.ok()?;
            body.get("node").is_some().then_some(body)
        }
    })
    .await;

    let groups = body["node"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["targets"], json!([{"__address__": "10.0.0.1:9100"}]));
    assert_eq!(
        groups[0]["labels"]["__meta_filepath"],
        json!(targets.display().to_string())
    );
    assert_eq!(*phase.borrow(), Phase::Running);

    std::fs::write(&targets, "[]").unwrap();
    common::eventually(TIMEOUT, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let body: Value = client.get(&url).send().await.ok()?.json().await.ok()?;
            (body == json!({})).then_some(())
        }
    })
    .await;

    stop_tx.send(()).unwrap();
    tokio::time::timeout(TIMEOUT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(*phase.borrow(), Phase::Stopped);
    assert!(client.get(&url).send().await.is_err());
}

#[tokio::test]
async fn probes_are_up_with_no_jobs_configured() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = App::new(settings(), Default::default());
    let mut phase = app.phase();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.run(listener, async {
        let _ = stop_rx.await;
    }));

    let client = common::client();
    for path in ["/health", "/readiness"] {
        let res = client
            .get(format!("http://{}{}", addr, path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }
    let body: Value = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({}));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(TIMEOUT, phase.wait_for(|p| *p == Phase::Stopped))
        .await
        .unwrap()
        .unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn snapshot_is_frozen_once_draining() {
    let dir = tempfile::tempdir().unwrap();
    let targets = dir.path().join("targets.json");
    std::fs::write(&targets, r#"[{"targets": ["10.0.0.1:9100"]}]"#).unwrap();
    let prometheus = dir.path().join("prometheus.yml");
    std::fs::write(
        &prometheus,
        format!(
            "scrape_configs:\n  - job_name: node\n    file_sd_configs:\n      - files: ['{}']\n        refresh_interval: 100ms\n",
            targets.display()
        ),
    )
    .unwrap();
    let jobs = load_discovery_config(&prometheus).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let app = App::new(settings(), jobs);
    let aggregator = app.aggregator();
    let mut phase = app.phase();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.run(listener, async {
        let _ = stop_rx.await;
    }));

    common::eventually(TIMEOUT, || {
        let aggregator = aggregator.clone();
        async move { aggregator.snapshot().contains("node").then_some(()) }
    })
    .await;
    let before = aggregator.snapshot();

    stop_tx.send(()).unwrap();
    tokio::time::timeout(TIMEOUT, phase.wait_for(|p| *p >= Phase::Draining))
        .await
        .unwrap()
        .unwrap();

    // A change discovery would otherwise pick up within a few refreshes.
    std::fs::write(&targets, r#"[{"targets": ["10.0.0.2:9100"]}]"#).unwrap();
    tokio::time::timeout(TIMEOUT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(*phase.borrow(), Phase::Stopped);
    assert_eq!(*aggregator.snapshot(), *before);
}
