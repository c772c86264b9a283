//! Single-instance service over a Unix socket.
//!
//! Requests and replies are single JSON lines. The first process binds the
//! socket; later invocations forward their files to it and exit.

use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::APP_DIR;

const SOCKET_FILE: &str = "swik.sock";
pub const OPEN_REPLY: &str = "OK";
const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

pub type IpcResult<T> = std::result::Result<T, IpcError>;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("no runtime directory available for the instance socket")]
    MissingRuntimeDirectory,
    #[error("failed to bind instance socket {path}")]
    Bind { path: PathBuf, source: io::Error },
    #[error("failed to reach running instance at {path}")]
    Connect { path: PathBuf, source: io::Error },
    #[error("instance socket I/O failed")]
    Io(#[from] io::Error),
    #[error("malformed instance message")]
    Protocol(#[from] serde_json::Error),
    #[error("running instance refused request: {0}")]
    Refused(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InstanceRequest {
    Open { filename: PathBuf },
}

/// Socket path: `$XDG_RUNTIME_DIR/swik/swik.sock`, falling back to the
/// system temp dir.
pub fn default_socket_path() -> PathBuf {
    socket_path_in(std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from).as_deref())
}

fn socket_path_in(runtime_dir: Option<&Path>) -> PathBuf {
    match runtime_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(APP_DIR).join(SOCKET_FILE),
        _ => std::env::temp_dir()
            .join(format!("{APP_DIR}-{}", user_suffix()))
            .join(SOCKET_FILE),
    }
}

fn user_suffix() -> String {
    std::env::var("USER").unwrap_or_else(|_| "default".to_string())
}

/// The bound end of the single-instance socket. Removes the socket file
/// when dropped.
#[derive(Debug)]
pub struct InstanceServer {
    listener: UnixListener,
    path: PathBuf,
}

impl InstanceServer {
    /// Binds `path`, replacing a socket left behind by a dead process.
    pub fn bind(path: impl Into<PathBuf>) -> IpcResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| IpcError::Bind {
                path: path.clone(),
                source,
            })?;
        }
        if path.exists() {
            tracing::debug!(?path, "removing stale instance socket");
            let _ = std::fs::remove_file(&path);
        }
        let listener = UnixListener::bind(&path).map_err(|source| IpcError::Bind {
            path: path.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        tracing::info!(?path, "listening for instance requests");
        Ok(Self { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts every pending connection without blocking and returns the
    /// requests they carried. Bad clients are logged and skipped.
    pub fn poll(&self) -> Vec<InstanceRequest> {
        let mut requests = Vec::new();
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => match serve_one(stream) {
                    Ok(Some(request)) => requests.push(request),
                    Ok(None) => tracing::trace!("instance connection closed without a request"),
                    Err(err) => tracing::warn!(?err, "dropping malformed instance request"),
                },
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    tracing::warn!(?err, "instance socket accept failed");
                    break;
                }
            }
        }
        requests
    }
}

impl Drop for InstanceServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Reads one request line from `stream` and acknowledges it. A client that
/// hangs up without sending anything yields `None`.
fn serve_one(stream: UnixStream) -> IpcResult<Option<InstanceRequest>> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let request: InstanceRequest = serde_json::from_str(line.trim())?;

    let mut stream = reader.into_inner();
    let reply = serde_json::to_string(OPEN_REPLY)?;
    writeln!(stream, "{reply}")?;
    stream.flush()?;
    tracing::debug!(?request, "served instance request");
    Ok(Some(request))
}

/// Asks the instance listening on `path` to open `filename`.
pub fn request_open(path: &Path, filename: &Path) -> IpcResult<()> {
    let mut stream = UnixStream::connect(path).map_err(|source| IpcError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;

    let request = InstanceRequest::Open {
        filename: filename.to_path_buf(),
    };
    let line = serde_json::to_string(&request)?;
    writeln!(stream, "{line}")?;
    stream.flush()?;

    let mut reply = String::new();
    BufReader::new(stream).read_line(&mut reply)?;
    let reply: String = serde_json::from_str(reply.trim())?;
    if reply == OPEN_REPLY {
        Ok(())
    } else {
        Err(IpcError::Refused(reply))
    }
}

#[derive(Debug)]
pub enum Instance {
    Primary(InstanceServer),
    /// Another process already owns the socket; files were forwarded.
    Secondary,
}

/// Forwards `files` to a running instance if there is one, otherwise binds
/// the socket and becomes the primary instance.
pub fn acquire(path: &Path, files: &[PathBuf]) -> IpcResult<Instance> {
    if UnixStream::connect(path).is_ok() {
        for file in files {
            request_open(path, file)?;
        }
        tracing::info!(count = files.len(), "forwarded files to running instance");
        return Ok(Instance::Secondary);
    }
    Ok(Instance::Primary(InstanceServer::bind(path)?))
}
