//! Docker Engine API client over a unix socket.
//!
//! Each request opens a fresh connection, performs an HTTP/1.1 handshake
//! and drives the connection on a background task.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use stowage_core::{ContainerSummary, short_id};
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::ContainerRuntime;
use crate::time::parse_timestamp;

/// Metadata requests (ping, list, inspect) must complete within this.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "stowage/0.1";

#[derive(Debug, Clone)]
pub struct DockerRuntime {
    socket: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListEntry {
    id: String,
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Inspect {
    state: InspectState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    started_at: String,
    finished_at: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl DockerRuntime {
    /// Client for a `unix:///path/to/docker.sock` host string.
    pub fn from_host(host: &str) -> RuntimeResult<Self> {
        let socket = host
            .strip_prefix("unix://")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RuntimeError::UnsupportedHost(host.to_string()))?;
        Ok(Self::new(Path::new(socket)))
    }

    pub fn new(socket: &Path) -> Self {
        Self {
            socket: socket.to_path_buf(),
        }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Send a GET and return the response if it is 2xx.
    async fn get(&self, path_and_query: &str) -> RuntimeResult<hyper::Response<Incoming>> {
        let stream = tokio::net::UnixStream::connect(&self.socket)
            .await
            .map_err(|source| RuntimeError::Connect {
                path: self.socket.clone(),
                source,
            })?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "runtime connection closed with error");
            }
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(path_and_query)
            .header("host", "docker")
            .header("user-agent", USER_AGENT)
            .body(Empty::<Bytes>::new())?;

        debug!(uri = path_and_query, "runtime request");
        let resp = sender.send_request(req).await?;
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status().as_u16();
        let body = resp.into_body().collect().await?.to_bytes();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
        Err(RuntimeError::Status { status, message })
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> RuntimeResult<T> {
        let fut = async {
            let resp = self.get(path_and_query).await?;
            let body = resp.into_body().collect().await?.to_bytes();
            let value = serde_json::from_slice(&body)
                .map_err(|e| RuntimeError::Decode(format!("{path_and_query}: {e}")))?;
            Ok::<T, RuntimeError>(value)
        };
        tokio::time::timeout(REQUEST_TIMEOUT, fut)
            .await
            .map_err(|_| RuntimeError::Unavailable)?
    }

    async fn inspect(&self, entry: ListEntry) -> RuntimeResult<ContainerSummary> {
        let inspect: Inspect = self.get_json(&format!("/containers/{}/json", entry.id)).await?;
        let name = entry
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| short_id(&entry.id));
        Ok(ContainerSummary {
            id: short_id(&entry.id),
            name,
            started_at: parse_timestamp(&inspect.state.started_at)?,
            finished_at: parse_timestamp(&inspect.state.finished_at)?,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> RuntimeResult<()> {
        let fut = async {
            let resp = self.get("/_ping").await?;
            resp.into_body().collect().await?;
            Ok::<(), RuntimeError>(())
        };
        tokio::time::timeout(REQUEST_TIMEOUT, fut)
            .await
            .map_err(|_| RuntimeError::Unavailable)?
    }

    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>> {
        let entries: Vec<ListEntry> = self.get_json("/containers/json?all=1").await?;
        let mut containers = Vec::with_capacity(entries.len());
        for entry in entries {
            containers.push(self.inspect(entry).await?);
        }
        debug!(count = containers.len(), "containers listed");
        Ok(containers)
    }

    async fn get_archive(
        &self,
        container_id: &str,
        path: &str,
        sink: &mut (dyn Write + Send),
    ) -> RuntimeResult<u64> {
        let uri = format!(
            "/containers/{container_id}/archive?path={}",
            encode_query_value(path)
        );
        let mut body = self.get(&uri).await?.into_body();

        let mut written = 0u64;
        while let Some(frame) = body.frame().await {
            if let Ok(chunk) = frame?.into_data() {
                sink.write_all(&chunk)?;
                written += chunk.len() as u64;
            }
        }
        sink.flush()?;
        debug!(container_id, path, bytes = written, "archive streamed");
        Ok(written)
    }
}

/// Everything outside the RFC 3986 unreserved set and `/` is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
