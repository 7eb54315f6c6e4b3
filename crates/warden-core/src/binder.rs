//! Allow-list type binding for type-directed deserialization
//!
//! A serialized payload names its types as strings. [`SafeTypeBinder`] maps
//! those names back to concrete types only through an allow-list built from
//! caller-trusted [`TypeDescriptor`]s; it never resolves a type from the name
//! itself.

use crate::error::{WardenError, WardenResult};
use crate::registry::ExploitableTypeRegistry;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Type-erased decoder captured when a descriptor is created
pub type DecodeFn = fn(Value) -> Result<Box<dyn Any + Send>, serde_json::Error>;

fn decode_erased<T: DeserializeOwned + Send + 'static>(
    value: Value,
) -> Result<Box<dyn Any + Send>, serde_json::Error> {
    Ok(Box::new(serde_json::from_value::<T>(value)?))
}

/// Identity of a concrete type that may appear in a payload.
///
/// The identity string is the assembly-qualified name
/// `"<full name>, <assembly>"`; for Rust types the assembly is the crate.
#[derive(Clone)]
pub struct TypeDescriptor {
    full_name: String,
    assembly: String,
    name: String,
    type_id: TypeId,
    decode: DecodeFn,
}

impl TypeDescriptor {
    /// Descriptor named after the Rust type path, e.g. `billing::dto::Invoice`
    /// in assembly `billing`.
    pub fn of<T: DeserializeOwned + Send + 'static>() -> Self {
        let full_name = std::any::type_name::<T>();
        let head = generic_head(full_name);
        let assembly = head.split("::").next().unwrap_or(head);
        Self::named::<T>(full_name, assembly)
    }

    /// Descriptor for `T` published under an explicit name, for payloads
    /// produced by other platforms.
    pub fn named<T: DeserializeOwned + Send + 'static>(
        full_name: impl Into<String>,
        assembly: impl Into<String>,
    ) -> Self {
        let full_name = full_name.into();
        let name = short_type_name(&full_name).to_string();
        Self {
            full_name,
            assembly: assembly.into(),
            name,
            type_id: TypeId::of::<T>(),
            decode: decode_erased::<T>,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// Short type name without namespace or generic arguments
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn assembly_qualified_name(&self) -> String {
        format!("{}, {}", self.full_name, self.assembly)
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Materialize a value of the described type from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when `value` does not fit the type.
    pub fn decode(&self, value: Value) -> Result<Box<dyn Any + Send>, serde_json::Error> {
        (self.decode)(value)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("full_name", &self.full_name)
            .field("assembly", &self.assembly)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.full_name == other.full_name
            && self.assembly == other.assembly
    }
}

impl Eq for TypeDescriptor {}

fn generic_head(full_name: &str) -> &str {
    full_name.split(['<', '`', '[']).next().unwrap_or(full_name)
}

/// Short name of a Rust (`a::b::Name<T>`) or dotted (`A.B.Name`1`) type name
pub fn short_type_name(full_name: &str) -> &str {
    let head = generic_head(full_name);
    head.rsplit([':', '.', '+']).next().unwrap_or(head)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    assembly_qualified_name: String,
    name: String,
}

/// Resolves serialized type names strictly from an allow-list.
///
/// Immutable once built; share it behind an `Arc` across threads.
#[derive(Debug, Clone)]
pub struct SafeTypeBinder {
    allowed: HashMap<BindingKey, TypeDescriptor>,
    by_type: HashMap<TypeId, BindingKey>,
}

impl SafeTypeBinder {
    /// Build the allow-list. Construction is all-or-nothing.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] if `candidate_types` is `None` or empty
    /// - [`WardenError::KnownExploitableType`] if any candidate's identity
    ///   matches the exploitable-type registry
    pub fn build(candidate_types: Option<&[TypeDescriptor]>) -> WardenResult<Self> {
        let candidates = match candidate_types {
            Some(candidates) if !candidates.is_empty() => candidates,
            Some(_) => {
                return Err(WardenError::InvalidArgument {
                    name: "candidate_types",
                    reason: "at least one candidate type is required".to_string(),
                });
            }
            None => {
                return Err(WardenError::InvalidArgument {
                    name: "candidate_types",
                    reason: "candidate type list is required".to_string(),
                });
            }
        };

        let mut allowed = HashMap::with_capacity(candidates.len());
        let mut by_type = HashMap::with_capacity(candidates.len());
        for candidate in candidates {
            let identity = candidate.assembly_qualified_name();
            if let Some(fragment) = ExploitableTypeRegistry::find_match(&identity) {
                warn!(
                    category = "known_exploitable_type",
                    type_name = %identity,
                    fragment,
                    "Refusing to allow-list exploitable type"
                );
                return Err(WardenError::KnownExploitableType {
                    type_name: identity,
                    fragment,
                });
            }

            let key = BindingKey {
                assembly_qualified_name: identity,
                name: candidate.name.clone(),
            };
            by_type
                .entry(candidate.type_id)
                .or_insert_with(|| key.clone());
            allowed.insert(key, candidate.clone());
        }

        debug!(types = allowed.len(), "Type binder built");
        Ok(Self { allowed, by_type })
    }

    /// Shorthand for [`build`](Self::build) with a present list.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn from_types(candidate_types: &[TypeDescriptor]) -> WardenResult<Self> {
        Self::build(Some(candidate_types))
    }

    /// Look up the allow-listed type for a serialized `(assembly, type)` pair.
    ///
    /// # Errors
    ///
    /// [`WardenError::UnknownType`] if the pair is not allow-listed, even when
    /// it names a real type.
    pub fn resolve_type(&self, assembly_name: &str, type_name: &str) -> WardenResult<&TypeDescriptor> {
        let key = BindingKey {
            assembly_qualified_name: assembly_name.to_string(),
            name: type_name.to_string(),
        };
        match self.allowed.get(&key) {
            Some(descriptor) => Ok(descriptor),
            None => {
                warn!(
                    category = "unknown_type",
                    assembly = assembly_name,
                    type_name,
                    "Payload references a type outside the allow-list"
                );
                Err(WardenError::UnknownType {
                    assembly: assembly_name.to_string(),
                    type_name: type_name.to_string(),
                })
            }
        }
    }

    /// `(assembly, type)` pair to write when serializing a value of the
    /// described type. Prefers the name the type was allow-listed under.
    pub fn describe_type(&self, descriptor: &TypeDescriptor) -> (String, String) {
        match self.by_type.get(&descriptor.type_id) {
            Some(key) => (key.assembly_qualified_name.clone(), key.name.clone()),
            None => (descriptor.assembly_qualified_name(), descriptor.name.clone()),
        }
    }

    pub fn describe<T: DeserializeOwned + Send + 'static>(&self) -> (String, String) {
        self.describe_type(&TypeDescriptor::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Always `false` for a built binder
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.allowed.values()
    }
}
