//! Streaming between request bodies, git subprocesses and response bodies.
//!
//! The bridge runs the two copies as independent tasks: request body into the
//! child's stdin, and the child's stdout into the response body through a
//! bounded channel. A supervisor joins both before waiting for the child.
//! When the client stops reading, the response body is dropped, the output
//! copy sees its channel closed, and the supervisor terminates the child's
//! process group.

use axum::body::{Body, BodyDataStream};
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use gitway_git::{BodyDecoder, BufferPool, ProcessGroup};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;

/// Response chunks buffered between the output copy and hyper.
const CHANNEL_DEPTH: usize = 8;

/// How the output copy ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Stdout reached EOF and every byte was handed to the response.
    Complete(u64),
    /// The response body was dropped before stdout reached EOF.
    ClientGone(u64),
}

/// Copies the (decoded) request body into the child's stdin, then closes it.
///
/// `first` holds bytes already pulled from the body and decoded. Stdin is
/// closed on every exit path since services such as `upload-pack` keep
/// waiting for EOF otherwise.
pub(crate) async fn copy_request_body(
    mut body: BodyDataStream,
    mut decoder: BodyDecoder,
    first: Bytes,
    mut stdin: ChildStdin,
) -> io::Result<u64> {
    let mut total = first.len() as u64;
    stdin.write_all(&first).await?;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(io::Error::other)?;
        let decoded = decoder.feed(chunk).map_err(io::Error::other)?;
        stdin.write_all(&decoded).await?;
        total += decoded.len() as u64;
    }

    let rest = decoder.finish().map_err(io::Error::other)?;
    stdin.write_all(&rest).await?;
    total += rest.len() as u64;

    stdin.flush().await?;
    drop(stdin);
    Ok(total)
}

/// Copies the child's stdout into `tx` through one pooled buffer.
pub(crate) async fn copy_stdout(
    buffers: BufferPool,
    mut stdout: ChildStdout,
    mut tx: mpsc::Sender<io::Result<Bytes>>,
) -> io::Result<Delivery> {
    let mut buf = buffers.acquire();
    let mut total = 0u64;
    loop {
        let n = match stdout.read(&mut buf).await {
            Ok(0) => return Ok(Delivery::Complete(total)),
            Ok(n) => n,
            Err(e) => {
                let _ = tx.send(Err(io::Error::new(e.kind(), e.to_string()))).await;
                return Err(e);
            }
        };
        if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
            return Ok(Delivery::ClientGone(total));
        }
        total += n as u64;
    }
}

/// Identifies a bridged subprocess in logs.
#[derive(Debug, Clone)]
pub(crate) struct Label {
    pub command: &'static str,
    pub repo: String,
}

/// Streams the child's stdout as a response body and supervises the child.
///
/// `input` is the already spawned stdin copy, if the command has one. The
/// returned body yields an error instead of ending cleanly if either copy
/// fails, so a broken exchange is never mistaken for a complete one.
pub(crate) fn stream_stdout(
    buffers: BufferPool,
    mut child: Child,
    mut group: ProcessGroup,
    stdout: ChildStdout,
    input: Option<JoinHandle<io::Result<u64>>>,
    label: Label,
) -> Body {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let mut err_tx = tx.clone();
    let output = tokio::spawn(copy_stdout(buffers, stdout, tx));

    tokio::spawn(async move {
        let Label { command, repo } = label;

        if let Some(input) = input {
            match flatten(input.await) {
                Ok(bytes) => tracing::debug!(command, repo = %repo, bytes, "request body delivered"),
                Err(e) => {
                    tracing::warn!(command, repo = %repo, error = %e, "failed to write request body to git");
                    if let Err(e) = group.terminate() {
                        tracing::warn!(command, error = %e, "failed to terminate git");
                    }
                    let _ = err_tx.send(Err(io::Error::new(e.kind(), e.to_string()))).await;
                }
            }
        }
        drop(err_tx);

        match flatten(output.await) {
            Ok(Delivery::Complete(bytes)) => {
                tracing::debug!(command, repo = %repo, bytes, "response streamed")
            }
            Ok(Delivery::ClientGone(bytes)) => {
                tracing::info!(command, repo = %repo, bytes, "client went away, terminating git");
                if let Err(e) = group.terminate() {
                    tracing::warn!(command, error = %e, "failed to terminate git");
                }
            }
            Err(e) => {
                tracing::warn!(command, repo = %repo, error = %e, "failed to read git output");
                if let Err(e) = group.terminate() {
                    tracing::warn!(command, error = %e, "failed to terminate git");
                }
            }
        }

        match child.wait().await {
            Ok(status) => {
                group.disarm();
                if !status.success() {
                    // headers are already out; the status can only be logged
                    tracing::warn!(command, repo = %repo, %status, "git exited unsuccessfully");
                }
            }
            Err(e) => tracing::error!(command, repo = %repo, error = %e, "failed to wait for git"),
        }
    });

    Body::from_stream(rx)
}

fn flatten<T>(joined: Result<io::Result<T>, tokio::task::JoinError>) -> io::Result<T> {
    joined.unwrap_or_else(|e| Err(io::Error::other(e)))
}
