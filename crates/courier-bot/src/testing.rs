//! Scripted in-memory transport for unit tests.

use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    traits::{FileStream, OffsetStore, Transport, Upload},
};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    io::Cursor,
    sync::Mutex,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

type Reply = Result<Value, CourierError>;

/// Records every call and answers from per-method scripts.
///
/// When a method's script runs dry, `getUpdates` answers an empty batch
/// (after cancelling `stop_when_drained`, if set) and everything else
/// answers `true`.
#[derive(Default)]
pub(crate) struct FakeTransport {
    calls: Mutex<Vec<(String, Value)>>,
    uploads: Mutex<Vec<(String, Value, Upload)>>,
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    urls: Mutex<HashMap<String, Vec<u8>>>,
    downloads: Mutex<Vec<String>>,
    stop_when_drained: Option<CancellationToken>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `stop` the first time `getUpdates` runs out of scripted replies.
    pub fn stopping(stop: CancellationToken) -> Self {
        Self {
            stop_when_drained: Some(stop),
            ..Self::default()
        }
    }

    pub fn push_ok(&self, method: &str, result: Value) {
        self.push(method, Ok(result));
    }

    pub fn push_err(&self, method: &str, err: CourierError) {
        self.push(method, Err(err));
    }

    /// Script one `getUpdates` batch of plain text messages with these ids.
    pub fn push_updates(&self, ids: &[i64]) {
        let batch: Vec<Value> = ids.iter().map(|&id| text_update(id, 1, "hi")).collect();
        self.push_ok("getUpdates", Value::Array(batch));
    }

    fn push(&self, method: &str, reply: Reply) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn add_file(&self, path: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn add_url(&self, url: &str, bytes: &[u8]) {
        self.urls
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls(method).len()
    }

    /// `offset` parameter of every `getUpdates` call, in order.
    pub fn offsets(&self) -> Vec<i64> {
        self.calls("getUpdates")
            .iter()
            .map(|p| p["offset"].as_i64().unwrap_or(-1))
            .collect()
    }

    pub fn uploads(&self) -> Vec<(String, Value, Upload)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    fn next_reply(&self, method: &str) -> Option<Reply> {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn call(&self, method: &str, params: Value, _timeout: Duration) -> Reply {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        if let Some(reply) = self.next_reply(method) {
            return reply;
        }
        if method == "getUpdates" {
            if let Some(stop) = &self.stop_when_drained {
                stop.cancel();
            }
            // Stand in for a long poll that timed out.
            tokio::time::sleep(Duration::from_millis(5)).await;
            return Ok(json!([]));
        }
        Ok(json!(true))
    }

    async fn upload(
        &self,
        method: &str,
        params: Value,
        upload: Upload,
        _timeout: Duration,
    ) -> Reply {
        self.uploads
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone(), upload));
        self.call(method, params, Duration::ZERO).await
    }

    async fn download_file(
        &self,
        server_path: &str,
        _timeout: Duration,
    ) -> Result<FileStream, CourierError> {
        self.downloads
            .lock()
            .unwrap()
            .push(server_path.to_string());
        let bytes = self.files.lock().unwrap().get(server_path).cloned();
        match bytes {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes))),
            None => Err(CourierError::api(404, "Not Found")),
        }
    }

    async fn fetch_url(&self, url: &str, _timeout: Duration) -> Result<FileStream, CourierError> {
        let bytes = self.urls.lock().unwrap().get(url).cloned();
        match bytes {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes))),
            None => Err(CourierError::api(404, "Not Found")),
        }
    }
}

/// Offset store backed by a mutex, recording every save.
#[derive(Default)]
pub(crate) struct RecordingStore {
    pub initial: Option<i64>,
    pub saved: Mutex<Vec<i64>>,
}

#[async_trait]
impl OffsetStore for RecordingStore {
    async fn load(&self) -> Result<Option<i64>, CourierError> {
        Ok(self.initial)
    }

    async fn save(&self, offset: i64) -> Result<(), CourierError> {
        self.saved.lock().unwrap().push(offset);
        Ok(())
    }
}

/// Wire JSON for a private text message update.
pub(crate) fn text_update(id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": id,
        "message": {
            "message_id": id,
            "from": {"id": chat_id, "is_bot": false, "first_name": "Ada"},
            "chat": {"id": chat_id, "type": "private"},
            "date": 1700000000,
            "text": text
        }
    })
}

/// Wire JSON for a callback query update.
pub(crate) fn callback_update(id: i64, chat_id: i64, data: &str) -> Value {
    json!({
        "update_id": id,
        "callback_query": {
            "id": format!("cb{id}"),
            "from": {"id": chat_id, "is_bot": false, "first_name": "Ada"},
            "message": {"message_id": 1, "chat": {"id": chat_id, "type": "private"}},
            "chat_instance": "ci",
            "data": data
        }
    })
}
