//! Scriptable in-process WebSocket backend for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// What the backend does in response to one request frame.
pub enum Action {
    /// Send this frame now.
    Reply(Value),
    /// Send this frame after a delay, without blocking later requests.
    ReplyAfter(Duration, Value),
    /// Close the connection.
    Close,
}

type Responder = Arc<dyn Fn(&Value) -> Vec<Action> + Send + Sync>;

/// A running mock backend.
pub struct MockServer {
    pub url: String,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Value>>>,
    frames_seen: watch::Receiver<usize>,
}

impl MockServer {
    /// Start a backend that answers with `responder`.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Value) -> Vec<Action> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let responder: Responder = Arc::new(responder);
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let (seen_tx, frames_seen) = watch::channel(0usize);
        let seen_tx = Arc::new(seen_tx);

        let (conns, recv) = (connections.clone(), received.clone());
        drop(tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let _ = conns.fetch_add(1, Ordering::SeqCst);
                drop(tokio::spawn(serve(
                    stream,
                    responder.clone(),
                    recv.clone(),
                    seen_tx.clone(),
                )));
            }
        }));

        Self {
            url: format!("ws://{addr}/quality"),
            connections,
            received,
            frames_seen,
        }
    }

    /// Start a backend that answers every command with [`fixture`].
    pub async fn healthy() -> Self {
        Self::start(|req| vec![Action::Reply(fixture(req))]).await
    }

    /// Number of accepted TCP connections.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Every request frame received so far, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Commands of the received frames, in arrival order.
    pub fn received_commands(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|v| v["command"].as_str().map(str::to_owned))
            .collect()
    }

    /// Wait until at least `n` request frames have arrived.
    pub async fn wait_for_frames(&self, n: usize) {
        let mut rx = self.frames_seen.clone();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|seen| *seen >= n))
            .await
            .expect("frames did not arrive in time")
            .unwrap();
    }
}

async fn serve(
    stream: tokio::net::TcpStream,
    responder: Responder,
    received: Arc<Mutex<Vec<Value>>>,
    seen: Arc<watch::Sender<usize>>,
) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    drop(tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
    }));

    while let Some(Ok(msg)) = ws_rx.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let request: Value = serde_json::from_str(text.as_str()).unwrap();
        received.lock().push(request.clone());
        seen.send_modify(|n| *n += 1);

        for action in responder(&request) {
            match action {
                Action::Reply(frame) => {
                    let _ = out_tx.send(Message::text(frame.to_string()));
                }
                Action::ReplyAfter(delay, frame) => {
                    let out_tx = out_tx.clone();
                    drop(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = out_tx.send(Message::text(frame.to_string()));
                    }));
                }
                Action::Close => {
                    let _ = out_tx.send(Message::Close(None));
                }
            }
        }
    }
}

/// Successful envelope for `request` carrying `fields`.
pub fn ok(request: &Value, fields: Value) -> Value {
    let mut frame = json!({"command": request["command"], "success": true});
    if let (Some(obj), Value::Object(extra)) = (frame.as_object_mut(), fields) {
        obj.extend(extra);
    }
    frame
}

/// Failure envelope for `request`.
pub fn failed(request: &Value, message: &str) -> Value {
    json!({"command": request["command"], "success": false, "message": message})
}

fn gof(chi2: f64) -> Value {
    json!({
        "chi2": chi2,
        "p_value": 0.42,
        "reject_null": false,
        "critical_value": 14.07,
        "degrees_of_freedom": 7
    })
}

/// A plausible successful response for any known command.
pub fn fixture(request: &Value) -> Value {
    let fields = match request["command"].as_str().unwrap_or_default() {
        "about" => json!({"version": "1.0.0", "message": "Quality Control Room analysis server"}),
        "analyze" => {
            let n = request["data"].as_array().map_or(0, Vec::len);
            let scaled: Vec<f64> = (0..n).map(|i| (i as f64 + 1.0) / (n as f64 + 1.0)).collect();
            json!({
                "sample_size": n,
                "population_size": request["population_size"],
                "min_value": request["min_value"],
                "max_value": request["max_value"],
                "scaled_data": scaled,
                "params_min": [1.8, 2.9],
                "params_max": [2.6, 3.7],
                "predicted_params": [2.2, 3.3],
                "sampling_params": [2.1, 3.2],
                "chi2_min": gof(3.1),
                "chi2_max": gof(2.7),
                "chi2_pred": gof(1.9)
            })
        }
        "get_intervals" => {
            let n = request["scaled_data"].as_array().map_or(0, Vec::len);
            json!({"cdf_min": vec![0.1; n], "cdf_max": vec![0.9; n]})
        }
        "get_cdf" => json!({
            "domain": [0.0, 0.5, 1.0],
            "fitted_cdf_min": [0.0, 0.4, 1.0],
            "fitted_cdf_max": [0.0, 0.6, 1.0],
            "predicted_cdf": [0.0, 0.5, 1.0],
            "sampling_cdf": [0.0, 0.5, 1.0]
        }),
        "get_pdf" => json!({
            "domain": [0.0, 0.5, 1.0],
            "fitted_pdf_min": [0.0, 1.4, 0.0],
            "fitted_pdf_max": [0.0, 1.6, 0.0],
            "predicted_pdf": [0.0, 1.5, 0.0],
            "sampling_pdf": [0.0, 1.5, 0.0]
        }),
        "get_histogram" => {
            let bins = request["bins"].as_u64().unwrap_or(10) as usize;
            let edges: Vec<f64> = (0..=bins).map(|i| i as f64 / bins as f64).collect();
            json!({
                "bin_edges": edges,
                "observed_freq": vec![1.0; bins],
                "expected_freq_min": vec![0.9; bins],
                "expected_freq_max": vec![1.1; bins],
                "expected_freq_pred": vec![1.0; bins]
            })
        }
        other => return failed(request, &format!("Unknown command: {other}")),
    };
    ok(request, fields)
}

/// A URL nothing is listening on.
pub async fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/quality")
}
