use async_trait::async_trait;
use chrono::Utc;
use signwatch_alert::{
    validator_subject, Alert, AlertRouter, DeliveryOutcome, Dispatcher, DiscordNotifier, Notifier,
    NotifierError, RetryPolicy, TelegramNotifier,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use warp::Filter;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Accepts any POST, answering 500 for the first `failures` requests.
/// Returns the bound address and every JSON body received.
async fn spawn_sink(failures: u32) -> (SocketAddr, Arc<Mutex<Vec<serde_json::Value>>>) {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::new(AtomicU32::new(0));

    let store = bodies.clone();
    let route = warp::post()
        .and(warp::body::json())
        .and_then(move |body: serde_json::Value| {
            let store = store.clone();
            let seen = seen.clone();
            async move {
                let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                store.lock().await.push(body);
                let status = if n <= failures {
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    warp::http::StatusCode::NO_CONTENT
                };
                Ok::<_, std::convert::Infallible>(warp::reply::with_status(warp::reply(), status))
            }
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, bodies)
}

#[tokio::test]
async fn discord_delivered_after_four_failures() {
    let (addr, bodies) = spawn_sink(4).await;
    let discord: Arc<dyn Notifier> =
        Arc::new(DiscordNotifier::new(client(), format!("http://{}/api/webhooks/1/abc", addr)));
    let policy = RetryPolicy {
        max_attempts: 5,
        delay: Duration::from_millis(10),
    };
    let dispatcher = Dispatcher::with_policy(vec![discord], policy);
    let alert = Alert::missed(validator_subject("osmosis-1", "AAAA"), "val", 3, 10);

    let outcomes: Vec<DeliveryOutcome> = futures_join(dispatcher.dispatch(alert.clone())).await;

    assert_eq!(
        outcomes,
        vec![DeliveryOutcome::Delivered {
            backend: "discord".to_string(),
            attempts: 5
        }]
    );
    assert_eq!(dispatcher.failures(&alert.key()).await, 0);

    let bodies = bodies.lock().await;
    assert_eq!(bodies.len(), 5);
    assert_eq!(bodies[0]["content"], alert.message.as_str());
    assert_eq!(bodies[0]["username"], "signwatch");
}

#[tokio::test]
async fn telegram_posts_chat_and_text() {
    let (addr, bodies) = spawn_sink(0).await;
    let telegram = TelegramNotifier::new(client(), "123:token", "-100200")
        .with_api_base(format!("http://{}", addr));

    telegram.send("chain halted").await.unwrap();

    let bodies = bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["chat_id"], "-100200");
    assert_eq!(bodies[0]["text"], "chain halted");
}

#[tokio::test]
async fn rejected_message_is_a_status_error() {
    let (addr, _) = spawn_sink(u32::MAX).await;
    let discord = DiscordNotifier::new(client(), format!("http://{}/hook", addr));

    let err = discord.send("hello").await.unwrap_err();
    assert_eq!(
        err,
        NotifierError::Status {
            backend: "discord".to_string(),
            status: 500
        }
    );
}

/// Records messages instead of sending them.
struct Recorder {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn send(&self, message: &str) -> Result<(), NotifierError> {
        self.sent.lock().await.push(message.to_string());
        Ok(())
    }
}

/// Never answers within the test; used to show a stuck backend blocks nothing.
struct Stuck;

#[async_trait]
impl Notifier for Stuck {
    fn name(&self) -> &str {
        "stuck"
    }

    async fn send(&self, _message: &str) -> Result<(), NotifierError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[tokio::test]
async fn router_delivers_once_per_stall_window_and_skips_none() {
    let recorder = Arc::new(Recorder {
        sent: Mutex::new(Vec::new()),
    });
    let notifiers: Vec<Arc<dyn Notifier>> = vec![recorder.clone(), Arc::new(Stuck)];
    let dispatcher = Arc::new(Dispatcher::new(notifiers));

    let (tx, rx) = mpsc::channel(16);
    let router = tokio::spawn(AlertRouter::new().run(rx, dispatcher));

    let now = Utc::now();
    tx.send(Alert::stalled("osmosis-1", now)).await.unwrap();
    tx.send(Alert::stalled("osmosis-1", now)).await.unwrap();
    tx.send(Alert::info("chain:osmosis-1", "all good")).await.unwrap();
    tx.send(Alert::no_rpc("osmosis-1", "Osmosis")).await.unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), router)
        .await
        .expect("router finished while a backend was stuck")
        .unwrap();

    // Delivery tasks are detached; give them a moment to reach the recorder.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let sent = recorder.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|m| m.contains("stalled")));
    assert!(sent.iter().any(|m| m.contains("no healthy rpc")));
}

async fn futures_join(handles: Vec<tokio::task::JoinHandle<DeliveryOutcome>>) -> Vec<DeliveryOutcome> {
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}
