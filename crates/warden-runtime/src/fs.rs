//! Async file operations confined to a trusted base directory

use crate::audit::{AuditLogger, SecurityEvent};
use crate::config::PathsConfig;
use crate::error::RuntimeResult;
use chrono::Utc;
use tracing::debug;
use warden_core::{SecurePathBuilder, ValidatedPath, WardenResult};

/// File access where every path is built by [`SecurePathBuilder`] before the
/// filesystem is touched.
#[derive(Debug, Clone)]
pub struct SecureFileAccess {
    builder: SecurePathBuilder,
    allow_subdirectories: bool,
    audit: Option<AuditLogger>,
}

impl SecureFileAccess {
    /// Native-style access accepting bare file names only, matching
    /// [`PathsConfig::default`]
    pub fn new() -> Self {
        Self {
            builder: SecurePathBuilder::new(),
            allow_subdirectories: false,
            audit: None,
        }
    }

    pub fn with_builder(builder: SecurePathBuilder) -> Self {
        Self {
            builder,
            ..Self::new()
        }
    }

    pub fn from_config(config: &PathsConfig) -> Self {
        Self {
            builder: SecurePathBuilder::with_style(config.style),
            allow_subdirectories: config.allow_subdirectories,
            audit: None,
        }
    }

    /// Let relative names descend into subdirectories of the base
    pub fn with_subdirectories(mut self, allow: bool) -> Self {
        self.allow_subdirectories = allow;
        self
    }

    /// Report grants and rejections to `audit`
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn builder(&self) -> &SecurePathBuilder {
        &self.builder
    }

    pub fn audit(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    pub fn allows_subdirectories(&self) -> bool {
        self.allow_subdirectories
    }

    /// Validate `relative` below `base`. Subdirectories are accepted only when
    /// this access allows them; otherwise `relative` must be a bare file name.
    ///
    /// # Errors
    ///
    /// Any rejection from the path builder.
    pub fn resolve(&self, base: &str, relative: &str) -> RuntimeResult<ValidatedPath> {
        let result = if self.allow_subdirectories {
            self.builder.build_with_subdirectories(base, relative)
        } else {
            self.builder.build_exact(base, relative)
        };
        self.audited(base, relative, result)
    }

    /// Validate a bare file name directly inside `base`.
    ///
    /// # Errors
    ///
    /// Any rejection from [`SecurePathBuilder::build_exact`].
    pub fn resolve_exact(&self, base: &str, file_name: &str) -> RuntimeResult<ValidatedPath> {
        let result = self.builder.build_exact(base, file_name);
        self.audited(base, file_name, result)
    }

    fn audited(
        &self,
        base: &str,
        attempted: &str,
        result: WardenResult<ValidatedPath>,
    ) -> RuntimeResult<ValidatedPath> {
        match result {
            Ok(path) => {
                if let Some(ref audit) = self.audit {
                    audit.log_event(SecurityEvent::PathValidated {
                        path: path.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                Ok(path)
            }
            Err(e) => {
                if let Some(ref audit) = self.audit
                    && e.is_security_rejection()
                {
                    audit.log_event(SecurityEvent::PathRejected {
                        base: base.to_string(),
                        attempted: attempted.to_string(),
                        category: e.category().to_string(),
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                Err(e.into())
            }
        }
    }

    fn granted(&self, path: &ValidatedPath, operation: &'static str) {
        debug!(path = %path, operation, "File access granted");
        if let Some(ref audit) = self.audit {
            audit.log_event(SecurityEvent::FileAccessGranted {
                path: path.to_string(),
                operation: operation.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    pub(crate) async fn read_validated(&self, path: &ValidatedPath) -> RuntimeResult<Vec<u8>> {
        self.granted(path, "read");
        Ok(tokio::fs::read(path).await?)
    }

    /// # Errors
    ///
    /// Path rejections, or the I/O error from reading.
    pub async fn read_to_string(&self, base: &str, relative: &str) -> RuntimeResult<String> {
        let path = self.resolve(base, relative)?;
        self.granted(&path, "read");
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    /// # Errors
    ///
    /// Path rejections, or the I/O error from reading.
    pub async fn read(&self, base: &str, relative: &str) -> RuntimeResult<Vec<u8>> {
        let path = self.resolve(base, relative)?;
        self.read_validated(&path).await
    }

    /// Create or truncate the file and write `contents`.
    ///
    /// # Errors
    ///
    /// Path rejections, or the I/O error from writing.
    pub async fn write(
        &self,
        base: &str,
        relative: &str,
        contents: impl AsRef<[u8]>,
    ) -> RuntimeResult<ValidatedPath> {
        let path = self.resolve(base, relative)?;
        self.granted(&path, "write");
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    /// # Errors
    ///
    /// Path rejections, or the I/O error from creating directories.
    pub async fn create_dir_all(&self, base: &str, relative: &str) -> RuntimeResult<ValidatedPath> {
        let path = self.resolve(base, relative)?;
        self.granted(&path, "create_dir");
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Read a bare file name directly inside `base`.
    ///
    /// # Errors
    ///
    /// Path rejections, or the I/O error from reading.
    pub async fn read_file(&self, base: &str, file_name: &str) -> RuntimeResult<Vec<u8>> {
        let path = self.resolve_exact(base, file_name)?;
        self.read_validated(&path).await
    }

    /// Write a bare file name directly inside `base`.
    ///
    /// # Errors
    ///
    /// Path rejections, or the I/O error from writing.
    pub async fn write_file(
        &self,
        base: &str,
        file_name: &str,
        contents: impl AsRef<[u8]>,
    ) -> RuntimeResult<ValidatedPath> {
        let path = self.resolve_exact(base, file_name)?;
        self.granted(&path, "write");
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }
}

impl Default for SecureFileAccess {
    fn default() -> Self {
        Self::new()
    }
}
