//! JSON-RPC client used by the agent
//!
//! Speaks the same newline-delimited framing as the server over a single
//! TCP connection with one in-flight request at a time. Tool-level
//! failures are distinguished from transport failures so the orchestrator
//! can feed the former back to the model and abort on the latter.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::AppError;
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, ListToolsResult, RequestId,
    RpcRequest, RpcResponse, ToolInfo,
};

/// Failure modes of one tool invocation
#[derive(Debug, Error)]
pub enum ToolCallError {
    /// The server answered with an error envelope; the loop can recover
    #[error("tool call failed: {0}")]
    Tool(String),
    /// The connection or protocol itself broke; the loop cannot recover
    #[error(transparent)]
    Transport(#[from] AppError),
}

/// Tool invocation surface the orchestrator depends on
#[async_trait]
pub trait ToolClient: Send {
    async fn call_tool(&mut self, name: &str, args: Value) -> Result<CallToolResult, ToolCallError>;
}

/// NDJSON JSON-RPC client over TCP
///
/// Frames are read through [`Lines`], whose `next_line` is cancel safe:
/// a caller that gives up on a round trip (timeout, cancellation) leaves
/// the connection usable, and the abandoned reply is skipped by id on
/// the next request.
pub struct RpcClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_id: i64,
}

impl RpcClient {
    /// Connect to the tool server
    pub async fn connect(addr: &str) -> Result<Self, AppError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer: write_half,
            next_id: 0,
        })
    }

    /// Send one request and wait for its response
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, AppError> {
        self.next_id += 1;
        let id = RequestId::Number(self.next_id);
        let request = RpcRequest::new(id.clone(), method, Some(params));

        let mut payload = serde_json::to_vec(&request)?;
        payload.push(b'\n');
        self.writer.write_all(&payload).await?;
        self.writer.flush().await?;

        let response: RpcResponse = loop {
            let line = match self.lines.next_line().await? {
                Some(line) => line,
                None => return Err(AppError::protocol("server closed the connection")),
            };
            let response: RpcResponse = serde_json::from_str(&line)?;
            if response.id.as_ref() == Some(&id) {
                break response;
            }
            // A reply to a request whose caller stopped waiting (timed
            // out or cancelled) can still arrive on this connection.
            match response.id.as_ref() {
                Some(RequestId::Number(stale)) if *stale < self.next_id => {
                    debug!(stale_id = stale, "discarding reply to an abandoned request");
                }
                other => {
                    return Err(AppError::protocol(format!(
                        "response id mismatch: expected {}, got {:?}",
                        id, other
                    )));
                }
            }
        };

        if let Some(error) = response.error {
            return Err(AppError::tool(error.message));
        }
        debug!(method, id = %id, "rpc round trip complete");
        response
            .result
            .ok_or_else(|| AppError::protocol("response carried neither result nor error"))
    }

    /// Handshake with the server
    pub async fn initialize(&mut self, client_name: &str) -> Result<InitializeResult, AppError> {
        let params = InitializeParams {
            client_name: client_name.to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let result = self.request("initialize", serde_json::to_value(params)?).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Fetch the server's tool descriptors
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, AppError> {
        let result = self.request("list_tools", json!({})).await?;
        let listed: ListToolsResult = serde_json::from_value(result)?;
        Ok(listed.tools)
    }
}

#[async_trait]
impl ToolClient for RpcClient {
    async fn call_tool(&mut self, name: &str, args: Value) -> Result<CallToolResult, ToolCallError> {
        let params = CallToolParams {
            name: name.to_string(),
            params: Some(args),
        };
        let params =
            serde_json::to_value(params).map_err(|err| ToolCallError::Transport(err.into()))?;
        match self.request("call_tool", params).await {
            Ok(result) => {
                let result: CallToolResult = serde_json::from_value(result)
                    .map_err(|err| ToolCallError::Transport(err.into()))?;
                Ok(result)
            }
            // Error envelopes come back as AppError::Tool from request().
            Err(AppError::Tool { message }) => Err(ToolCallError::Tool(message)),
            Err(other) => Err(ToolCallError::Transport(other)),
        }
    }
}
