//! Engine hosted as a child process
//!
//! Messages are exchanged as JSON lines: one object per line on the child's
//! stdin and stdout. Inline transfers travel as a `data` byte array.

use super::channel::EngineChannel;
use super::driver::BridgeHandle;
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::EncodedMessage;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Running engine process. Killed when dropped.
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
}

impl EngineProcess {
    /// Start `program` with piped stdin/stdout.
    ///
    /// Returns the process, a channel writing to its stdin, and its stdout
    /// for `pump_lines`.
    pub fn spawn(
        program: &str,
        args: &[String],
    ) -> BridgeResult<(Self, ProcessChannel<ChildStdin>, ChildStdout)> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|e| {
            BridgeError::EngineUnavailable(format!("failed to start {}: {}", program, e))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::EngineUnavailable("no stdin available".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::EngineUnavailable("no stdout available".to_string()))?;

        debug!(program, pid = ?child.id(), "engine process started");
        Ok((Self { child }, ProcessChannel::new(stdin), stdout))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the process and wait for it to exit.
    pub async fn kill(&mut self) -> BridgeResult<()> {
        self.child.kill().await?;
        Ok(())
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Channel writing JSON lines to any async writer.
#[derive(Debug)]
pub struct ProcessChannel<W> {
    writer: Mutex<W>,
}

impl<W> ProcessChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> EngineChannel for ProcessChannel<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn post(&self, message: EncodedMessage) -> BridgeResult<()> {
        let mut line = serde_json::to_vec(&message.into_inline())?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(&line).await?;
            writer.flush().await
        }
        .await;
        written.map_err(|e| match e.kind() {
            ErrorKind::BrokenPipe => BridgeError::ChannelClosed,
            _ => BridgeError::Io(e),
        })
    }
}

/// Forward every JSON line read from `reader` into the driver.
///
/// Lines that are not JSON are skipped. The task ends at end of input or
/// once the driver has stopped.
pub fn pump_lines<R>(reader: R, handle: BridgeHandle) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(line) {
                        Ok(body) => {
                            if handle.deliver(body).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!(error = %e, "skipping non-JSON engine output"),
                    }
                }
                Ok(None) => {
                    debug!("engine output closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read engine output");
                    break;
                }
            }
        }
    })
}
