//! Warden Runtime
//!
//! Host-facing wrappers around [`warden_core`]:
//!
//! - [`SafeDeserializer`]: JSON deserialization where every `$type` name must
//!   resolve through an allow-list [`SafeTypeBinder`]
//! - [`SecureFileAccess`]: async file operations on paths built by
//!   [`SecurePathBuilder`]
//! - [`load_verified`]: reads a file only after a [`SignatureVerifier`] accepts it
//! - [`AuditLogger`]: background security event log
//!
//! Configuration is loaded through [`WardenConfig`] and logging is set up with
//! [`init_tracing`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use warden_runtime::{SafeDeserializer, SafeTypeBinder, TypeDescriptor};
//!
//! #[derive(Debug, Serialize, Deserialize, PartialEq)]
//! struct Invoice {
//!     number: u32,
//! }
//!
//! let binder = SafeTypeBinder::from_types(&[TypeDescriptor::of::<Invoice>()])?;
//! let deserializer = SafeDeserializer::with_binder(Arc::new(binder));
//!
//! let json = deserializer.serialize_tagged(&Invoice { number: 7 })?;
//! let invoice: Invoice = deserializer.deserialize(&json)?;
//! assert_eq!(invoice, Invoice { number: 7 });
//!
//! let hostile = r#"{"$type": "Gadget, Unknown.Assembly", "number": 1}"#;
//! assert!(deserializer.deserialize::<Invoice>(hostile).is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audit;
pub mod config;
pub mod deserialize;
pub mod error;
pub mod fs;
pub mod signature;
pub mod telemetry;

pub use audit::{AuditConfig, AuditLogger, EventSeverity, SecurityEvent};
pub use config::{DeserializationConfig, LoggingConfig, PathsConfig, WardenConfig};
pub use deserialize::{
    BoundValue, SafeDeserializer, SerializerSettings, TYPE_PROPERTY, TypeNameHandling,
    VALUES_PROPERTY,
};
pub use error::{RuntimeError, RuntimeResult};
pub use fs::SecureFileAccess;
pub use signature::{RejectAll, SignatureVerifier, load_verified};
pub use telemetry::init_tracing;

pub use warden_core::{
    PathStyle, SafeTypeBinder, SecurePathBuilder, TypeDescriptor, ValidatedPath, WardenError,
};
