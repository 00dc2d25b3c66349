//! End-to-end: realtime transports talking through a live hub.

use std::time::Duration;

use huddle_realtime::{ConnectionState, SessionCredential, Transport, TransportConfig};
use huddle_relay::{serve, Hub};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn start_hub() -> (String, Hub) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hub = Hub::new();
    tokio::spawn(serve(listener, hub.clone()));
    (format!("ws://{addr}/ws"), hub)
}

async fn open_transport(url: &str, name: &str) -> Transport {
    let transport = Transport::new(TransportConfig {
        url: url.to_string(),
        connect_timeout: Duration::from_secs(2),
    });
    transport.connect(Some(&SessionCredential::new(name, name).with_token("t")));
    let mut state = transport.watch_state();
    timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Open))
        .await
        .expect("transport did not open")
        .unwrap();
    transport
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(WAIT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn message_reaches_every_subscriber_including_sender() {
    let (url, hub) = start_hub().await;
    let alice = open_transport(&url, "alice").await;
    let bob = open_transport(&url, "bob").await;

    let (tx_a, mut rx_a) = mpsc::unbounded_channel::<Value>();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel::<Value>();
    let _sub_a = alice.subscribe("room-1", move |v| {
        let _ = tx_a.send(v.clone());
    });
    let _sub_b = bob.subscribe("room-1", move |v| {
        let _ = tx_b.send(v.clone());
    });

    let probe = hub.clone();
    wait_until(|| {
        let hub = probe.clone();
        async move { hub.subscriber_count("room-1").await == 2 }
    })
    .await;

    assert!(alice.publish("room-1", json!({"text": "hi"})));

    let got_a = timeout(WAIT, rx_a.recv()).await.unwrap().unwrap();
    let got_b = timeout(WAIT, rx_b.recv()).await.unwrap().unwrap();
    assert_eq!(got_a["text"], "hi");
    assert_eq!(got_b["text"], "hi");

    alice.shutdown();
    bob.shutdown();
}

#[tokio::test]
async fn other_channels_are_not_delivered() {
    let (url, hub) = start_hub().await;
    let alice = open_transport(&url, "alice").await;
    let bob = open_transport(&url, "bob").await;

    let (tx_b, mut rx_b) = mpsc::unbounded_channel::<Value>();
    let _sub_b = bob.subscribe("quiet", move |v| {
        let _ = tx_b.send(v.clone());
    });
    let _sub_a = alice.subscribe("loud", |_| {});

    let probe = hub.clone();
    wait_until(|| {
        let hub = probe.clone();
        async move { hub.channel_count().await == 2 }
    })
    .await;

    assert!(alice.publish("loud", json!("noise")));
    assert!(alice.publish("quiet", json!("signal")));

    let got = timeout(WAIT, rx_b.recv()).await.unwrap().unwrap();
    assert_eq!(got, json!("signal"));
}

#[tokio::test]
async fn dropping_subscription_and_disconnecting_clean_up_the_hub() {
    let (url, hub) = start_hub().await;
    let alice = open_transport(&url, "alice").await;
    let bob = open_transport(&url, "bob").await;

    let sub_a = alice.subscribe("room", |_| {});
    let _sub_b = bob.subscribe("room", |_| {});

    let probe = hub.clone();
    wait_until(|| {
        let hub = probe.clone();
        async move { hub.subscriber_count("room").await == 2 }
    })
    .await;

    drop(sub_a);
    let probe = hub.clone();
    wait_until(|| {
        let hub = probe.clone();
        async move { hub.subscriber_count("room").await == 1 }
    })
    .await;

    bob.shutdown();
    let probe = hub.clone();
    wait_until(|| {
        let hub = probe.clone();
        async move { hub.client_count().await == 1 && hub.channel_count().await == 0 }
    })
    .await;

    alice.shutdown();
}
