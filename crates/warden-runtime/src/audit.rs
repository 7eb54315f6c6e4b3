//! Security audit logging for validation outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Security events that require auditing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum SecurityEvent {
    PathValidated {
        path: String,
        timestamp: DateTime<Utc>,
    },
    PathRejected {
        base: String,
        attempted: String,
        category: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    TypeResolutionRejected {
        assembly: String,
        type_name: String,
        timestamp: DateTime<Utc>,
    },
    InsecureConfigurationRejected {
        details: String,
        timestamp: DateTime<Utc>,
    },
    FileAccessGranted {
        path: String,
        operation: String,
        timestamp: DateTime<Utc>,
    },
    SignatureRejected {
        path: String,
        timestamp: DateTime<Utc>,
    },
    AuditSystemFailure {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl SecurityEvent {
    /// Get the severity level of this security event
    pub fn severity(&self) -> EventSeverity {
        match self {
            SecurityEvent::PathValidated { .. } => EventSeverity::Info,
            SecurityEvent::FileAccessGranted { .. } => EventSeverity::Info,
            SecurityEvent::PathRejected { category, .. } if category == "traversal_rejected" => {
                EventSeverity::Critical
            }
            SecurityEvent::PathRejected { .. } => EventSeverity::Warning,
            SecurityEvent::TypeResolutionRejected { .. } => EventSeverity::Critical,
            SecurityEvent::InsecureConfigurationRejected { .. } => EventSeverity::High,
            SecurityEvent::SignatureRejected { .. } => EventSeverity::High,
            SecurityEvent::AuditSystemFailure { .. } => EventSeverity::Critical,
        }
    }

    /// Get event category for metrics and alerting
    pub fn category(&self) -> &'static str {
        match self {
            SecurityEvent::PathValidated { .. } => "path_security",
            SecurityEvent::PathRejected { .. } => "path_security",
            SecurityEvent::TypeResolutionRejected { .. } => "type_binding",
            SecurityEvent::InsecureConfigurationRejected { .. } => "type_binding",
            SecurityEvent::FileAccessGranted { .. } => "file_access",
            SecurityEvent::SignatureRejected { .. } => "signature",
            SecurityEvent::AuditSystemFailure { .. } => "audit_system",
        }
    }

    /// Check if this event should trigger immediate alerts
    pub fn requires_immediate_alert(&self) -> bool {
        matches!(
            self.severity(),
            EventSeverity::Critical | EventSeverity::High
        )
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    High,
    Critical,
}

/// Audit logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit events as structured `tracing` records
    pub log_to_stdout: bool,
    /// Append events as JSON lines to this file
    pub log_to_file: Option<PathBuf>,
    /// Buffer size for async logging
    pub buffer_size: usize,
    /// Emit an alert record for high and critical events
    pub enable_alerting: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_to_stdout: true,
            log_to_file: None,
            buffer_size: 1000,
            enable_alerting: true,
        }
    }
}

#[derive(Debug)]
enum AuditMessage {
    Event(SecurityEvent),
    Flush(oneshot::Sender<()>),
}

/// The single `tracing` record an event produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceRecord {
    /// Severity-levelled audit record, marked as an alert when alerting applies
    Audit { alert: bool },
    /// Alert record alone, when audit records are not traced
    Alert,
}

impl TraceRecord {
    fn for_event(config: &AuditConfig, event: &SecurityEvent) -> Option<Self> {
        let alert = config.enable_alerting && event.requires_immediate_alert();
        if config.log_to_stdout {
            Some(Self::Audit { alert })
        } else if alert {
            Some(Self::Alert)
        } else {
            None
        }
    }
}

/// Async security audit logger.
///
/// Cloning shares the same background writer. Must be created inside a tokio
/// runtime.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    sender: mpsc::Sender<AuditMessage>,
    config: AuditConfig,
}

impl AuditLogger {
    /// Create a new audit logger with default configuration
    pub fn new() -> Self {
        Self::with_config(AuditConfig::default())
    }

    /// Create a new audit logger with custom configuration
    pub fn with_config(config: AuditConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));

        let handler_config = config.clone();
        tokio::spawn(async move {
            Self::audit_event_handler(receiver, handler_config).await;
        });

        Self { sender, config }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Queue a security event without waiting.
    ///
    /// A full buffer drops the event and reports an audit failure through
    /// `tracing` instead.
    pub fn log_event(&self, event: SecurityEvent) {
        match self.sender.try_send(AuditMessage::Event(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(AuditMessage::Event(event))) => {
                error!(
                    event_type = event.category(),
                    event = ?event,
                    "Audit buffer full, event dropped"
                );
            }
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("Audit system failure: channel closed");
            }
        }
    }

    /// Wait until every event queued before this call has been written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RuntimeError::Io`] if the background task has stopped.
    pub async fn flush(&self) -> crate::RuntimeResult<()> {
        let (done, wait) = oneshot::channel();
        self.sender
            .send(AuditMessage::Flush(done))
            .await
            .map_err(|_| std::io::Error::other("audit channel closed"))?;
        wait.await
            .map_err(|_| std::io::Error::other("audit task stopped before flushing"))?;
        Ok(())
    }

    /// Background task to handle audit events
    async fn audit_event_handler(mut receiver: mpsc::Receiver<AuditMessage>, config: AuditConfig) {
        let mut file_writer = match config.log_to_file {
            Some(ref log_file) => match Self::create_file_writer(log_file).await {
                Ok(file) => Some(file),
                Err(e) => {
                    let failure = SecurityEvent::AuditSystemFailure {
                        error: format!(
                            "cannot open audit log {}: {}, file logging disabled",
                            log_file.display(),
                            e
                        ),
                        timestamp: Utc::now(),
                    };
                    Self::log_to_stdout(&failure, config.enable_alerting);
                    None
                }
            },
            None => None,
        };

        while let Some(message) = receiver.recv().await {
            let event = match message {
                AuditMessage::Event(event) => event,
                AuditMessage::Flush(done) => {
                    if let Some(ref mut writer) = file_writer
                        && let Err(e) = writer.flush().await
                    {
                        error!(error = %e, "Failed to flush audit log");
                    }
                    let _ = done.send(());
                    continue;
                }
            };

            match TraceRecord::for_event(&config, &event) {
                Some(TraceRecord::Audit { alert }) => Self::log_to_stdout(&event, alert),
                Some(TraceRecord::Alert) => Self::send_alert(&event),
                None => {}
            }

            if let Some(ref mut writer) = file_writer {
                Self::log_to_file(&event, writer).await;
            }
        }

        info!("Audit event handler shutdown complete");
    }

    /// Log event with structured fields
    fn log_to_stdout(event: &SecurityEvent, alert: bool) {
        match event.severity() {
            EventSeverity::Info => {
                info!(
                    event_type = event.category(),
                    event = ?event,
                    "Security audit event"
                );
            }
            EventSeverity::Warning => {
                warn!(
                    event_type = event.category(),
                    event = ?event,
                    "Security audit event"
                );
            }
            EventSeverity::High | EventSeverity::Critical => {
                error!(
                    alert,
                    event_type = event.category(),
                    severity = ?event.severity(),
                    event = ?event,
                    "SECURITY ALERT"
                );
            }
        }
    }

    async fn create_file_writer(log_file: &Path) -> std::io::Result<tokio::fs::File> {
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .await
    }

    /// Write event to audit log file
    async fn log_to_file(event: &SecurityEvent, writer: &mut tokio::fs::File) {
        let json_line = match serde_json::to_string(event) {
            Ok(json) => format!("{}\n", json),
            Err(e) => {
                error!(error = %e, "Failed to serialize audit event");
                return;
            }
        };

        if let Err(e) = writer.write_all(json_line.as_bytes()).await {
            error!(error = %e, "Failed to write to audit log");
        }

        // Ensure immediate write to disk for critical events
        if event.requires_immediate_alert() {
            let _ = writer.sync_all().await;
        }
    }

    fn send_alert(event: &SecurityEvent) {
        error!(
            alert = true,
            severity = ?event.severity(),
            event_category = event.category(),
            event = ?event,
            "Critical security alert"
        );
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
