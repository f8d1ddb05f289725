//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kdiscovery::discovery::{LabelSet, TargetGroup, ADDRESS_LABEL};
use kdiscovery::{Aggregator, ExpositionServer, Settings, Shutdown};
use tokio::net::TcpListener;

pub const NAMESPACE_LABEL: &str = "__meta_kubernetes_namespace";

/// Serve `aggregator` on an ephemeral port.
pub async fn start_server(aggregator: Arc<Aggregator>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = ExpositionServer::new(aggregator, &Settings::default());
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// A group of targets, each given as `(address, namespace)`.
pub fn group(source: &str, targets: &[(&str, &str)]) -> TargetGroup {
    TargetGroup {
        targets: targets
            .iter()
            .map(|(addr, ns)| {
                LabelSet::from([
                    (ADDRESS_LABEL.to_string(), addr.to_string()),
                    (NAMESPACE_LABEL.to_string(), ns.to_string()),
                ])
            })
            .collect(),
        ..TargetGroup::new(source)
    }
}

/// Poll `f` until it yields a value or `timeout` elapses.
#[allow(dead_code)]
pub async fn eventually<T, F, Fut>(timeout: Duration, mut f: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    tokio::time::timeout(timeout, async {
        loop {
            if let Some(value) = f().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("condition not met in time")
}
