//! Per-connection NDJSON transport loop
//!
//! Each connection is served by a single task that reads one JSON value
//! per line, dispatches it, writes the response, and flushes before
//! reading the next line. Responses therefore arrive in request order.
//! An undecodable line gets one parse-error response with a null id and
//! the connection is closed; everything else is answered in place and
//! the loop continues.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::protocol::{
    CallToolParams, Capabilities, ErrorCode, InitializeParams, InitializeResult, ListToolsResult,
    RpcError, RpcRequest, RpcResponse, ServerInfo, JSONRPC_VERSION,
};
use crate::server::router::Router;

/// Shared state handed to every connection task
pub struct ConnectionContext {
    pub router: Arc<Router>,
    pub server_info: ServerInfo,
    pub tool_timeout: Duration,
}

/// Serve one NDJSON stream until EOF, fatal framing error, or shutdown
///
/// Generic over the stream so tests can drive it with in-memory duplex
/// pipes instead of real sockets.
pub async fn serve_connection<S>(
    stream: S,
    ctx: Arc<ConnectionContext>,
    mut shutdown: watch::Receiver<bool>,
) -> AppResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.changed() => {
                debug!("connection loop stopping on shutdown signal");
                return Ok(());
            }
        };

        let line = match line {
            Some(line) => line,
            None => return Ok(()),
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: RpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(err) => {
                // Framing is broken; answer once with the null-id sentinel
                // and stop reading from this peer.
                warn!(error = %err, "undecodable frame, closing connection");
                let response = RpcResponse::error(
                    None,
                    RpcError::new(ErrorCode::ParseError, format!("invalid JSON: {}", err)),
                );
                write_response(&mut write_half, &response).await?;
                return Ok(());
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "ignoring notification");
            continue;
        }

        let response = tokio::select! {
            response = handle_request(&ctx, request) => response,
            _ = shutdown.changed() => {
                debug!("shutdown during dispatch, aborting in-flight call");
                return Ok(());
            }
        };
        write_response(&mut write_half, &response).await?;
    }
}

/// Dispatch a single decoded request to a response
async fn handle_request(ctx: &ConnectionContext, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();

    if request.jsonrpc != JSONRPC_VERSION {
        return RpcResponse::error(
            id,
            RpcError::new(
                ErrorCode::InvalidRequest,
                format!("unsupported jsonrpc version '{}'", request.jsonrpc),
            ),
        );
    }

    debug!(method = %request.method, id = ?request.id, "dispatching request");

    match request.method.as_str() {
        "initialize" => {
            let _params: InitializeParams = match decode_params(request.params) {
                Ok(params) => params,
                Err(err) => return RpcResponse::error(id, err),
            };
            let result = InitializeResult {
                server_info: ctx.server_info.clone(),
                capabilities: Capabilities::default(),
                tools: ctx.router.list(),
            };
            success(id, &result)
        }
        "list_tools" => {
            let result = ListToolsResult {
                tools: ctx.router.list(),
            };
            success(id, &result)
        }
        "call_tool" => {
            let params: CallToolParams = match decode_params(request.params) {
                Ok(params) => params,
                Err(err) => return RpcResponse::error(id, err),
            };
            let args = params.params.unwrap_or(Value::Null);
            match ctx.router.call(&params.name, args, ctx.tool_timeout).await {
                Ok(output) => success(id, &output.into_result()),
                Err(err) => RpcResponse::error(id, tool_error_envelope(&err)),
            }
        }
        "ping" => RpcResponse::success(id, serde_json::json!({"ok": true})),
        other => RpcResponse::error(
            id,
            RpcError::new(
                ErrorCode::MethodNotFound,
                format!("unknown method '{}'", other),
            ),
        ),
    }
}

/// Decode method params, defaulting absent params to an empty object
fn decode_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
    let value = params.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    serde_json::from_value(value)
        .map_err(|err| RpcError::new(ErrorCode::InvalidParams, err.to_string()))
}

/// Map a tool execution error onto a protocol error envelope
fn tool_error_envelope(err: &AppError) -> RpcError {
    match err {
        AppError::InvalidParams { message } => {
            RpcError::new(ErrorCode::InvalidParams, message.clone())
        }
        other => RpcError::new(ErrorCode::InternalError, other.to_string()),
    }
}

fn success<T: serde::Serialize>(
    id: Option<crate::protocol::RequestId>,
    result: &T,
) -> RpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(
            id,
            RpcError::new(ErrorCode::InternalError, err.to_string()),
        ),
    }
}

/// Write one response line and flush it before the next read
async fn write_response<W>(writer: &mut W, response: &RpcResponse) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
