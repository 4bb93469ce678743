//! Instance endpoint: claim, signal and serve.

use std::io;
use std::time::Duration;

use async_channel::Sender;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

/// Line a second instance sends to the first.
const FOCUS_MESSAGE: &str = "focus";

/// Longest line accepted from a connecting process.
const MAX_MESSAGE: u64 = 64;

#[derive(Error, Debug)]
pub enum InstanceError {
  #[error("Failed to claim instance endpoint {endpoint}: {source}")]
  Claim {
    endpoint: String,
    #[source]
    source: io::Error,
  },
  #[error("Failed to signal the running instance: {0}")]
  Signal(#[source] io::Error),
}

/// Ask the primary instance to bring its window forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusRequest;

/// Where the primary instance listens.
#[derive(Debug, Clone)]
pub struct Endpoint {
  #[cfg(not(windows))]
  path: std::path::PathBuf,
  #[cfg(windows)]
  name: String,
}

impl Endpoint {
  /// Per-user endpoint for an application identifier.
  pub fn for_app(identifier: &str) -> Self {
    #[cfg(windows)]
    {
      Self {
        name: format!(r"\\.\pipe\{}-instance", identifier),
      }
    }
    #[cfg(not(windows))]
    {
      Self {
        path: socket_path(
          identifier,
          dirs::runtime_dir().or_else(dirs::cache_dir),
          &current_user(),
        ),
      }
    }
  }

  /// Endpoint at an explicit socket path.
  #[cfg(all(test, not(windows)))]
  pub fn at(path: std::path::PathBuf) -> Self {
    Self { path }
  }

  fn describe(&self) -> String {
    #[cfg(windows)]
    {
      self.name.clone()
    }
    #[cfg(not(windows))]
    {
      self.path.display().to_string()
    }
  }
}

/// Socket file for `identifier`.
///
/// `private_dir` belongs to the current user (session runtime dir, else the
/// cache dir). Without one the socket lands in the shared temp dir, so the
/// user name goes into the file name.
#[cfg(not(windows))]
fn socket_path(identifier: &str, private_dir: Option<std::path::PathBuf>, user: &str) -> std::path::PathBuf {
  match private_dir {
    Some(dir) => dir.join(format!("{}.instance.sock", identifier)),
    None => std::env::temp_dir().join(format!("{}-{}.instance.sock", identifier, user)),
  }
}

#[cfg(not(windows))]
fn current_user() -> String {
  std::env::var("USER")
    .or_else(|_| std::env::var("LOGNAME"))
    .unwrap_or_else(|_| "default".to_string())
}

/// Outcome of trying to become the running instance.
pub enum Acquire {
  /// This process owns the endpoint.
  Primary(InstanceGuard),
  /// Another process owns it and has been told to show itself.
  Secondary,
}

/// Ownership of the instance endpoint. Dropping it releases the endpoint.
pub struct InstanceGuard {
  endpoint: Endpoint,
  #[cfg(not(windows))]
  listener: tokio::net::UnixListener,
  #[cfg(windows)]
  server: tokio::net::windows::named_pipe::NamedPipeServer,
}

impl InstanceGuard {
  /// Claim the endpoint, or signal whoever holds it.
  #[cfg(not(windows))]
  pub async fn acquire(endpoint: &Endpoint) -> Result<Acquire, InstanceError> {
    use tokio::net::{UnixListener, UnixStream};

    let claim_error = |source| InstanceError::Claim {
      endpoint: endpoint.describe(),
      source,
    };

    if let Some(parent) = endpoint.path.parent() {
      std::fs::create_dir_all(parent).map_err(claim_error)?;
    }

    match UnixListener::bind(&endpoint.path) {
      Ok(listener) => return Ok(Acquire::Primary(Self::new(endpoint, listener))),
      Err(e) if e.kind() == io::ErrorKind::AddrInUse => {}
      Err(e) => return Err(claim_error(e)),
    }

    match UnixStream::connect(&endpoint.path).await {
      Ok(mut stream) => {
        send_focus(&mut stream).await?;
        Ok(Acquire::Secondary)
      }
      Err(e)
        if matches!(
          e.kind(),
          io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
        ) =>
      {
        // Left behind by a process that did not exit cleanly
        log::debug!("Removing stale instance socket {:?}", endpoint.path);
        let _ = std::fs::remove_file(&endpoint.path);
        let listener = UnixListener::bind(&endpoint.path).map_err(claim_error)?;
        Ok(Acquire::Primary(Self::new(endpoint, listener)))
      }
      Err(e) => Err(claim_error(e)),
    }
  }

  #[cfg(not(windows))]
  fn new(endpoint: &Endpoint, listener: tokio::net::UnixListener) -> Self {
    Self {
      endpoint: endpoint.clone(),
      listener,
    }
  }

  /// Claim the endpoint, or signal whoever holds it.
  #[cfg(windows)]
  pub async fn acquire(endpoint: &Endpoint) -> Result<Acquire, InstanceError> {
    use tokio::net::windows::named_pipe::{ClientOptions, ServerOptions};

    match ServerOptions::new()
      .first_pipe_instance(true)
      .create(&endpoint.name)
    {
      Ok(server) => {
        return Ok(Acquire::Primary(Self {
          endpoint: endpoint.clone(),
          server,
        }))
      }
      Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {}
      Err(e) => {
        return Err(InstanceError::Claim {
          endpoint: endpoint.describe(),
          source: e,
        })
      }
    }

    // The pipe may be busy serving another client; retry briefly
    let mut last_error = None;
    for attempt in 0..5u64 {
      if attempt > 0 {
        tokio::time::sleep(Duration::from_millis(50 * attempt)).await;
      }
      match ClientOptions::new().open(&endpoint.name) {
        Ok(mut client) => {
          send_focus(&mut client).await?;
          return Ok(Acquire::Secondary);
        }
        Err(e) => last_error = Some(e),
      }
    }
    Err(InstanceError::Signal(last_error.unwrap_or_else(|| {
      io::Error::new(io::ErrorKind::Other, "instance pipe unavailable")
    })))
  }

  /// Accept signals from later launches until the task is dropped.
  ///
  /// Each `focus` line becomes one [`FocusRequest`] on `focus_tx`.
  #[cfg(not(windows))]
  pub async fn serve(self, focus_tx: Sender<FocusRequest>) {
    log::info!("Instance endpoint listening on {}", self.endpoint.describe());
    loop {
      match self.listener.accept().await {
        Ok((stream, _)) => {
          if !read_signal(stream, &focus_tx).await {
            break;
          }
        }
        Err(e) => {
          log::warn!("Instance endpoint accept failed: {}", e);
          tokio::time::sleep(Duration::from_millis(200)).await;
        }
      }
    }
  }

  /// Accept signals from later launches until the task is dropped.
  ///
  /// Each `focus` line becomes one [`FocusRequest`] on `focus_tx`.
  #[cfg(windows)]
  pub async fn serve(mut self, focus_tx: Sender<FocusRequest>) {
    use tokio::net::windows::named_pipe::ServerOptions;

    log::info!("Instance endpoint listening on {}", self.endpoint.describe());
    loop {
      if let Err(e) = self.server.connect().await {
        log::warn!("Instance pipe connect failed: {}", e);
        tokio::time::sleep(Duration::from_millis(200)).await;
        continue;
      }
      let next = match ServerOptions::new().create(&self.endpoint.name) {
        Ok(next) => next,
        Err(e) => {
          log::error!("Failed to reopen instance pipe: {}", e);
          return;
        }
      };
      let connected = std::mem::replace(&mut self.server, next);
      if !read_signal(connected, &focus_tx).await {
        break;
      }
    }
  }
}

#[cfg(not(windows))]
impl Drop for InstanceGuard {
  fn drop(&mut self) {
    let _ = std::fs::remove_file(&self.endpoint.path);
  }
}

async fn send_focus<W: tokio::io::AsyncWrite + Unpin>(writer: &mut W) -> Result<(), InstanceError> {
  writer
    .write_all(format!("{}\n", FOCUS_MESSAGE).as_bytes())
    .await
    .map_err(InstanceError::Signal)?;
  writer.flush().await.map_err(InstanceError::Signal)?;
  writer.shutdown().await.map_err(InstanceError::Signal)
}

/// Read one line from a connecting process and forward it.
///
/// Returns false once nobody is listening for focus requests anymore.
async fn read_signal<S: tokio::io::AsyncRead + Unpin>(stream: S, focus_tx: &Sender<FocusRequest>) -> bool {
  let mut reader = BufReader::new(stream.take(MAX_MESSAGE));
  let mut line = String::new();
  match tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line)).await {
    Ok(Ok(_)) if line.trim() == FOCUS_MESSAGE => {
      log::info!("Another launch asked to focus the window");
      focus_tx.send(FocusRequest).await.is_ok()
    }
    Ok(Ok(_)) => {
      log::warn!("Ignoring unknown instance message: {:?}", line.trim());
      true
    }
    Ok(Err(e)) => {
      log::warn!("Instance message read failed: {}", e);
      true
    }
    Err(_) => {
      log::warn!("Instance message timed out");
      true
    }
  }
}
