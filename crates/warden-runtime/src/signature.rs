//! Loading files only after an external signature check

use crate::audit::SecurityEvent;
use crate::error::{RuntimeError, RuntimeResult};
use crate::fs::SecureFileAccess;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Decides whether a file carries a trusted signature.
///
/// Implementations may block; they are run on tokio's blocking pool.
pub trait SignatureVerifier: Send + Sync {
    fn verify_signature(&self, path: &Path) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn verify_signature(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Verifier that trusts nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl SignatureVerifier for RejectAll {
    fn verify_signature(&self, _path: &Path) -> bool {
        false
    }
}

/// Read `file_name` from directly inside `base` once `verifier` accepts it.
///
/// # Errors
///
/// - path rejections from [`SecureFileAccess::resolve_exact`]
/// - [`RuntimeError::SignatureRejected`] if the verifier refuses the file
/// - [`RuntimeError::Io`] if the file cannot be read or the verifier panics
pub async fn load_verified(
    access: &SecureFileAccess,
    base: &str,
    file_name: &str,
    verifier: Arc<dyn SignatureVerifier>,
) -> RuntimeResult<Vec<u8>> {
    let path = access.resolve_exact(base, file_name)?;

    let candidate = path.as_path().to_path_buf();
    let trusted = tokio::task::spawn_blocking(move || verifier.verify_signature(&candidate))
        .await
        .map_err(|e| std::io::Error::other(format!("signature verifier failed: {e}")))?;

    if !trusted {
        warn!(category = "signature_rejected", path = %path, "Signature verification failed");
        if let Some(audit) = access.audit() {
            audit.log_event(SecurityEvent::SignatureRejected {
                path: path.to_string(),
                timestamp: Utc::now(),
            });
        }
        return Err(RuntimeError::SignatureRejected(path.into_string()));
    }

    access.read_validated(&path).await
}
