//! Captured child output.
//!
//! Mirrors every stdout/stderr chunk into the log file in arrival order,
//! echoes it to the wrapper's own streams with a tag, and keeps the most
//! recent stderr chunk for the error page fallback.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::process::{OutputChunk, OutputStream};

const STDOUT_TAG: &[u8] = b"[gateway] ";
const STDERR_TAG: &[u8] = b"[gateway:err] ";

#[derive(Debug)]
pub struct Diagnostics {
    path: PathBuf,
    echo: bool,
    file: Mutex<Option<File>>,
    last_stderr: ArcSwap<String>,
}

impl Diagnostics {
    pub fn new(path: impl Into<PathBuf>, echo: bool) -> Self {
        Self {
            path: path.into(),
            echo,
            file: Mutex::new(None),
            last_stderr: ArcSwap::from_pointee(String::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log file for a fresh child and forget the last stderr chunk.
    pub async fn reset(&self) -> io::Result<()> {
        let mut guard = self.file.lock().await;
        *guard = None;
        self.last_stderr.store(Arc::new(String::new()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        *guard = Some(File::create(&self.path).await?);
        Ok(())
    }

    /// Append a chunk to the log file and echo it.
    pub async fn record(&self, chunk: &OutputChunk) {
        self.append(&chunk.data).await;

        if chunk.stream == OutputStream::Stderr {
            self.last_stderr
                .store(Arc::new(String::from_utf8_lossy(&chunk.data).into_owned()));
        }

        if self.echo {
            echo(chunk.stream, &chunk.data).await;
        }
    }

    /// Record a failure that happened before the child produced any output.
    pub async fn record_failure(&self, message: &str) {
        let line = format!("{message}\n");
        self.append(line.as_bytes()).await;
        self.last_stderr.store(Arc::new(message.to_string()));
    }

    pub fn last_stderr(&self) -> Arc<String> {
        self.last_stderr.load_full()
    }

    /// Log file contents, or the last stderr chunk when the file is unreadable.
    pub async fn read_logs(&self) -> String {
        match fs::read(&self.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Log file unreadable");
                format!("No logs available.\nLast STDERR: {}", self.last_stderr())
            }
        }
    }

    async fn append(&self, data: &[u8]) {
        let mut guard = self.file.lock().await;
        if let Some(file) = guard.as_mut() {
            let written = match file.write_all(data).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to append to log file");
            }
        }
    }
}

async fn echo(stream: OutputStream, data: &[u8]) {
    let tag = match stream {
        OutputStream::Stdout => STDOUT_TAG,
        OutputStream::Stderr => STDERR_TAG,
    };
    let mut tagged = Vec::with_capacity(tag.len() + data.len());
    tagged.extend_from_slice(tag);
    tagged.extend_from_slice(data);

    let result = match stream {
        OutputStream::Stdout => {
            let mut out = tokio::io::stdout();
            out.write_all(&tagged).await.and(out.flush().await)
        }
        OutputStream::Stderr => {
            let mut err = tokio::io::stderr();
            err.write_all(&tagged).await.and(err.flush().await)
        }
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "Failed to echo child output");
    }
}
