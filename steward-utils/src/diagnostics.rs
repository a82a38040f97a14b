//! Last-resort error capture for the process boundary.
//!
//! Anything that escapes a handler task, and any panic, is appended to a local
//! log file and the process keeps running.

use std::{
    backtrace::Backtrace,
    fs::OpenOptions,
    future::Future,
    io::{self, Write as _},
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::task::JoinHandle;
use tracing::error;

/// Append-only diagnostic log file.
#[derive(Clone, Debug)]
pub struct ErrorLog {
    path: Arc<PathBuf>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one block followed by a blank line.
    pub fn append(&self, block: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())?;
        file.write_all(block.trim_end().as_bytes())?;
        file.write_all(b"\n\n")?;

        Ok(())
    }

    /// Log an unexpected error and persist its full chain.
    pub fn record_error(&self, context: &str, error: &anyhow::Error) {
        error!(context, error = %error, "uncaught error, check {}", self.path.display());

        if let Err(source) = self.append(&format!("{context}: {error:?}")) {
            error!(?source, "failed to write diagnostic log");
        }
    }

    /// Route panics into the log, then hand them to the previously installed hook.
    pub fn install_panic_hook(&self) {
        let log = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::force_capture();
            error!(panic = %info, "uncaught panic, check {}", log.path.display());

            if let Err(source) = log.append(&format!("{info}\n{backtrace}")) {
                error!(?source, "failed to write diagnostic log");
            }

            previous(info);
        }));
    }

    /// Run a handler future on its own task, logging instead of propagating its error.
    pub fn spawn<F>(&self, context: &'static str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let log = self.clone();
        tokio::spawn(async move {
            if let Err(error) = future.await {
                log.record_error(context, &error);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs, panic,
        sync::atomic::{AtomicBool, Ordering},
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn scratch_log(name: &str) -> ErrorLog {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos());
        let path = std::env::temp_dir().join(format!(
            "steward-{name}-{}-{nanos}.log",
            std::process::id()
        ));
        ErrorLog::new(path)
    }

    #[test]
    fn append_adds_blocks_separated_by_blank_lines() {
        let log = scratch_log("append");

        log.append("first\n").unwrap();
        log.append("second").unwrap();

        let written = fs::read_to_string(log.path()).unwrap();
        assert_eq!(written, "first\n\nsecond\n\n");
        fs::remove_file(log.path()).unwrap();
    }

    #[tokio::test]
    async fn spawned_errors_are_persisted() {
        let log = scratch_log("spawn");

        log.spawn("interaction", async { Err(anyhow::anyhow!("boom")) })
            .await
            .unwrap();
        log.spawn("interaction", async { Ok(()) }).await.unwrap();

        let written = fs::read_to_string(log.path()).unwrap();
        assert!(written.starts_with("interaction: boom"));
        assert_eq!(written.matches("interaction:").count(), 1);
        fs::remove_file(log.path()).unwrap();
    }

    #[test]
    fn panic_hook_logs_and_chains_to_previous_hook() {
        static PREVIOUS_CALLED: AtomicBool = AtomicBool::new(false);

        let log = scratch_log("panic");
        let original = panic::take_hook();
        panic::set_hook(Box::new(|_| PREVIOUS_CALLED.store(true, Ordering::SeqCst)));
        log.install_panic_hook();

        let outcome: std::thread::Result<()> = panic::catch_unwind(|| panic!("hook check"));

        // Put back the harness hook.
        drop(panic::take_hook());
        panic::set_hook(original);

        assert!(outcome.is_err());
        assert!(PREVIOUS_CALLED.load(Ordering::SeqCst));
        let written = fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("hook check"));
        fs::remove_file(log.path()).unwrap();
    }
}
