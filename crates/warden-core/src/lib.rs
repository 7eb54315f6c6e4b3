//! Warden Core
//!
//! Host-independent validation for two classes of untrusted input:
//!
//! - **Path construction**: [`SecurePathBuilder`] combines a trusted base
//!   directory with untrusted segments and proves the result stays inside it.
//! - **Type binding**: [`SafeTypeBinder`] resolves serialized type names only
//!   through a caller-supplied allow-list and refuses to allow-list known
//!   deserialization gadgets.
//!
//! Both components are stateless and synchronous. They have no dependency on
//! each other and may be called concurrently without coordination.
//!
//! # Example
//!
//! ```rust
//! use warden_core::{PathStyle, SecurePathBuilder, WardenError};
//!
//! let builder = SecurePathBuilder::with_style(PathStyle::Windows);
//! let path = builder.build_exact("C:\\data\\", "report.txt")?;
//! assert_eq!(path.as_str(), "C:\\data\\report.txt");
//!
//! let escape = builder.build_exact("C:\\data", "..\\..\\escape.txt");
//! assert!(matches!(escape, Err(WardenError::TraversalRejected(_))));
//! # Ok::<(), WardenError>(())
//! ```

pub mod binder;
pub mod error;
pub mod path;
pub mod registry;

pub use binder::{DecodeFn, SafeTypeBinder, TypeDescriptor, short_type_name};
pub use error::{ErrorKind, WardenError, WardenResult};
pub use path::{
    POSIX_V1, PathStyle, ReservedCharacters, SecurePathBuilder, ValidatedPath, WINDOWS_V1,
};
pub use registry::{EXPLOITABLE_TYPE_FRAGMENTS, ExploitableTypeRegistry};
