//! Scripted in-memory transport for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{RequestIds, RpcTransport};

type Handler = Box<dyn Fn(&JsonRpcRequest) -> Result<Value, TransportError> + Send + Sync>;

/// Answers every request with `handler` and records what was sent.
pub struct ScriptedTransport {
    handler: Handler,
    sent: Mutex<Vec<JsonRpcRequest>>,
    ids: RequestIds,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&JsonRpcRequest) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
            ids: RequestIds::default(),
        }
    }

    /// Methods sent so far, in order.
    pub fn methods(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|r| r.method.clone()).collect()
    }

    /// Every request sent with `method`.
    pub fn requests(&self, method: &str) -> Vec<JsonRpcRequest> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }
}

/// A node-side error object.
pub fn rpc_error(code: i64, message: &str) -> TransportError {
    TransportError::Rpc(JsonRpcError {
        code,
        message: message.into(),
        data: None,
    })
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.sent.lock().unwrap().push(req.clone());
        let result = (self.handler)(&req)?;
        let mut resp = JsonRpcResponse::ok(0, result);
        resp.id = req.id;
        Ok(resp)
    }

    fn url(&self) -> &str {
        "scripted://"
    }

    fn next_id(&self) -> u64 {
        self.ids.next()
    }
}
