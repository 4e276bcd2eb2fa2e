//! Log backend
//!
//! Writes one line per event to an injected writer. Useful for debugging a
//! route configuration before pointing it at a real directory.

use async_trait::async_trait;
use beacon_core::{Backend, BackendError, Event};
use parking_lot::Mutex;
use std::io::Write;

/// A backend that formats events as single lines of text.
pub struct LogBackend {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl LogBackend {
    /// Create a log backend writing to stdout.
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Create a log backend writing to the given writer.
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        LogBackend {
            writer: Mutex::new(writer),
        }
    }

    fn format(event: &Event) -> String {
        let container = &event.container;
        let mut line = format!(
            "event: svc={} id={} action={}",
            container.service, container.id, event.action
        );

        // labels are unordered; sort for a stable line
        let mut labels: Vec<_> = container.labels.iter().collect();
        labels.sort();
        for (n, (key, value)) in labels.iter().enumerate() {
            line.push_str(if n == 0 { " labels=" } else { "," });
            line.push_str(&format!("{key}:{value}"));
        }

        for (n, binding) in container.bindings.iter().enumerate() {
            line.push_str(if n == 0 { " ports=" } else { "," });
            line.push_str(&format!(
                "{}:{}->{}/{}",
                binding.host_ip, binding.host_port, binding.container_port, binding.protocol
            ));
        }
        line
    }
}

impl Default for LogBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for LogBackend {
    fn name(&self) -> &str {
        "log"
    }

    async fn process_event(&self, event: Event) -> Result<(), BackendError> {
        let line = Self::format(&event);
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}").map_err(|e| BackendError::Send(e.to_string()))
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| BackendError::Shutdown(e.to_string()))
    }
}
