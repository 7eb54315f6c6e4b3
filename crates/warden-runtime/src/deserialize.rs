//! Type-directed JSON deserialization gated by an allow-list binder
//!
//! Payloads name their types in a `"$type"` member holding an
//! assembly-qualified name, e.g. `"billing::Invoice, billing"`. Tagged arrays
//! are wrapped as `{"$type": ..., "$values": [...]}`. Every type name in a
//! payload is resolved through [`SafeTypeBinder`] before anything is decoded;
//! without a binder, type names are never read.

use crate::audit::{AuditLogger, SecurityEvent};
use crate::config::DeserializationConfig;
use crate::error::{RuntimeError, RuntimeResult};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_core::{SafeTypeBinder, TypeDescriptor, WardenError, short_type_name};

/// Member carrying the assembly-qualified type name
pub const TYPE_PROPERTY: &str = "$type";

/// Member carrying the elements of a tagged array
pub const VALUES_PROPERTY: &str = "$values";

/// When type names are written to and honored in payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNameHandling {
    /// Type names are neither written nor read
    #[default]
    None,
    /// Tag objects
    Objects,
    /// Tag arrays through a `$values` wrapper
    Arrays,
    /// Tag objects and arrays
    All,
    /// Tag the root value only
    Auto,
}

impl TypeNameHandling {
    pub fn is_enabled(self) -> bool {
        self != TypeNameHandling::None
    }

    fn tags_objects(self) -> bool {
        matches!(
            self,
            TypeNameHandling::Objects | TypeNameHandling::All | TypeNameHandling::Auto
        )
    }

    fn tags_arrays(self) -> bool {
        matches!(
            self,
            TypeNameHandling::Arrays | TypeNameHandling::All | TypeNameHandling::Auto
        )
    }
}

/// Caller-requested serializer behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerSettings {
    pub type_name_handling: TypeNameHandling,
    /// Maximum nesting depth of accepted payloads; `None` disables the check
    pub max_depth: Option<usize>,
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            type_name_handling: TypeNameHandling::None,
            max_depth: Some(64),
        }
    }
}

/// A decoded value whose concrete type was chosen by the payload's `$type`
pub struct BoundValue {
    descriptor: TypeDescriptor,
    value: Box<dyn Any + Send>,
}

impl BoundValue {
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the value out as `T`, or get `self` back when it is another type.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged if the bound type is not `T`.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let Self { descriptor, value } = self;
        match value.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(value) => Err(Self { descriptor, value }),
        }
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundValue")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Deserialization entry point.
///
/// Cheap to clone; the binder is shared.
#[derive(Debug, Clone)]
pub struct SafeDeserializer {
    binder: Option<Arc<SafeTypeBinder>>,
    settings: SerializerSettings,
    audit: Option<AuditLogger>,
}

impl SafeDeserializer {
    /// Without a binder, type names are disabled. With one, they are
    /// honored and tagged at the root ([`TypeNameHandling::Auto`]).
    pub fn new(binder: Option<Arc<SafeTypeBinder>>) -> Self {
        let type_name_handling = if binder.is_some() {
            TypeNameHandling::Auto
        } else {
            TypeNameHandling::None
        };
        Self {
            binder,
            settings: SerializerSettings {
                type_name_handling,
                ..SerializerSettings::default()
            },
            audit: None,
        }
    }

    pub fn with_binder(binder: Arc<SafeTypeBinder>) -> Self {
        Self::new(Some(binder))
    }

    /// Apply caller settings.
    ///
    /// # Errors
    ///
    /// [`WardenError::InsecureConfiguration`] if the settings enable type names
    /// but no binder was supplied.
    pub fn with_settings(mut self, settings: SerializerSettings) -> RuntimeResult<Self> {
        if settings.type_name_handling.is_enabled() && self.binder.is_none() {
            return Err(self.insecure(format!(
                "type name handling '{:?}' requires an allow-list binder",
                settings.type_name_handling
            )));
        }
        self.settings = settings;
        Ok(self)
    }

    fn insecure(&self, details: String) -> RuntimeError {
        warn!(category = "insecure_configuration", %details, "Serializer configuration rejected");
        if let Some(ref audit) = self.audit {
            audit.log_event(SecurityEvent::InsecureConfigurationRejected {
                details: details.clone(),
                timestamp: Utc::now(),
            });
        }
        WardenError::InsecureConfiguration(details).into()
    }

    /// Report rejections to `audit`
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build from configuration. `audit` is attached before the settings are
    /// checked, so a rejected configuration is reported.
    ///
    /// # Errors
    ///
    /// Same as [`with_settings`](Self::with_settings).
    pub fn from_config(
        config: &DeserializationConfig,
        binder: Option<Arc<SafeTypeBinder>>,
        audit: Option<AuditLogger>,
    ) -> RuntimeResult<Self> {
        let deserializer = Self {
            audit,
            ..Self::new(binder)
        };
        deserializer.with_settings(config.settings())
    }

    pub fn binder(&self) -> Option<&SafeTypeBinder> {
        self.binder.as_deref()
    }

    pub fn settings(&self) -> SerializerSettings {
        self.settings
    }

    fn active_binder(&self) -> Option<&SafeTypeBinder> {
        if self.settings.type_name_handling.is_enabled() {
            self.binder.as_deref()
        } else {
            None
        }
    }

    /// Decode `payload` as `T`.
    ///
    /// When type names are enabled, every `$type` in the payload must be
    /// allow-listed, and a tagged root must name `T` itself.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] if `payload` is blank
    /// - [`WardenError::UnknownType`] if any `$type` is not allow-listed
    /// - [`RuntimeError::Deserialization`] for malformed JSON, excessive depth,
    ///   or a value that does not fit `T`
    pub fn deserialize<T: DeserializeOwned + 'static>(&self, payload: &str) -> RuntimeResult<T> {
        let mut value = self.parse(payload)?;

        let Some(binder) = self.active_binder() else {
            return Ok(serde_json::from_value(value)?);
        };

        match self.bind_tree(binder, &mut value)? {
            Some(descriptor) => {
                if !descriptor.is::<T>() {
                    return Err(RuntimeError::Deserialization(format!(
                        "payload declares '{}' but '{}' was requested",
                        descriptor.assembly_qualified_name(),
                        std::any::type_name::<T>()
                    )));
                }
                let decoded = descriptor.decode(value)?;
                debug!(type_name = descriptor.name(), "Payload bound to allow-listed type");
                decoded.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
                    RuntimeError::Deserialization(format!(
                        "decoder for '{}' produced an unexpected type",
                        descriptor.assembly_qualified_name()
                    ))
                })
            }
            None => Ok(serde_json::from_value(value)?),
        }
    }

    /// Decode a payload whose root `$type` selects the concrete type.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InsecureConfiguration`] if type names are disabled
    /// - [`RuntimeError::Deserialization`] if the root carries no `$type`
    /// - otherwise as [`deserialize`](Self::deserialize)
    pub fn deserialize_bound(&self, payload: &str) -> RuntimeResult<BoundValue> {
        let Some(binder) = self.active_binder() else {
            return Err(self.insecure(
                "type-directed binding requires an allow-list binder and type name handling"
                    .to_string(),
            ));
        };

        let mut value = self.parse(payload)?;
        let descriptor = self.bind_tree(binder, &mut value)?.ok_or_else(|| {
            RuntimeError::Deserialization(format!("payload root carries no '{TYPE_PROPERTY}'"))
        })?;

        let value = descriptor.decode(value)?;
        debug!(type_name = descriptor.name(), "Payload bound to allow-listed type");
        Ok(BoundValue { descriptor, value })
    }

    /// Serialize `value` with its type name at the root, as
    /// [`SafeTypeBinder::describe_type`] reports it.
    ///
    /// Objects receive a leading `$type` member; arrays are wrapped in
    /// `{"$type", "$values"}`. Scalars carry no type name.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InsecureConfiguration`] without an active binder
    /// - [`RuntimeError::Deserialization`] if `value` fails to serialize
    pub fn serialize_tagged<T>(&self, value: &T) -> RuntimeResult<String>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let Some(binder) = self.active_binder() else {
            return Err(self.insecure(
                "type names cannot be written without an allow-list binder".to_string(),
            ));
        };

        let (assembly_qualified_name, _) = binder.describe_type(&TypeDescriptor::of::<T>());
        let handling = self.settings.type_name_handling;
        let tagged = match serde_json::to_value(value)? {
            Value::Object(fields) if handling.tags_objects() => {
                let mut map = serde_json::Map::with_capacity(fields.len() + 1);
                map.insert(
                    TYPE_PROPERTY.to_string(),
                    Value::String(assembly_qualified_name),
                );
                map.extend(fields);
                Value::Object(map)
            }
            Value::Array(items) if handling.tags_arrays() => {
                let mut map = serde_json::Map::with_capacity(2);
                map.insert(
                    TYPE_PROPERTY.to_string(),
                    Value::String(assembly_qualified_name),
                );
                map.insert(VALUES_PROPERTY.to_string(), Value::Array(items));
                Value::Object(map)
            }
            other => other,
        };
        Ok(serde_json::to_string(&tagged)?)
    }

    fn parse(&self, payload: &str) -> RuntimeResult<Value> {
        if payload.trim().is_empty() {
            return Err(WardenError::InvalidArgument {
                name: "payload",
                reason: "value must not be empty or whitespace".to_string(),
            }
            .into());
        }

        let value: Value = serde_json::from_str(payload)?;
        if let Some(max_depth) = self.settings.max_depth {
            let depth = nesting_depth(&value);
            if depth > max_depth {
                return Err(RuntimeError::Deserialization(format!(
                    "payload nesting depth {depth} exceeds the maximum of {max_depth}"
                )));
            }
        }
        Ok(value)
    }

    /// Resolve and strip every type name in `value`, returning the root's.
    fn bind_tree(
        &self,
        binder: &SafeTypeBinder,
        value: &mut Value,
    ) -> RuntimeResult<Option<TypeDescriptor>> {
        match value {
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.bind_tree(binder, item)?;
                }
                Ok(None)
            }
            Value::Object(map) => {
                let descriptor = match map.shift_remove(TYPE_PROPERTY) {
                    None => None,
                    Some(Value::String(tag)) => Some(self.resolve_tag(binder, &tag)?),
                    Some(other) => {
                        return Err(RuntimeError::Deserialization(format!(
                            "'{TYPE_PROPERTY}' must be a string, found {other}"
                        )));
                    }
                };

                for field in map.values_mut() {
                    self.bind_tree(binder, field)?;
                }

                if descriptor.is_some()
                    && let Some(values) = map.shift_remove(VALUES_PROPERTY)
                {
                    *value = values;
                }
                Ok(descriptor)
            }
            _ => Ok(None),
        }
    }

    fn resolve_tag(&self, binder: &SafeTypeBinder, tag: &str) -> RuntimeResult<TypeDescriptor> {
        let (full_name, assembly) = split_type_tag(tag);
        let identity = match assembly {
            Some(assembly) => format!("{full_name}, {assembly}"),
            None => full_name.to_string(),
        };
        let name = short_type_name(full_name);

        match binder.resolve_type(&identity, name) {
            Ok(descriptor) => Ok(descriptor.clone()),
            Err(e) => {
                if let Some(ref audit) = self.audit {
                    audit.log_event(SecurityEvent::TypeResolutionRejected {
                        assembly: identity,
                        type_name: name.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                Err(e.into())
            }
        }
    }
}

/// Split `"Full.Name, Assembly, Version=..."` into the full name and the
/// simple assembly name, ignoring commas nested in generic arguments.
fn split_type_tag(tag: &str) -> (&str, Option<&str>) {
    let mut nesting = 0usize;
    for (index, c) in tag.char_indices() {
        match c {
            '[' | '<' => nesting += 1,
            ']' | '>' => nesting = nesting.saturating_sub(1),
            ',' if nesting == 0 => {
                let full_name = tag[..index].trim();
                let assembly = tag[index + 1..].split(',').next().unwrap_or("").trim();
                return (full_name, (!assembly.is_empty()).then_some(assembly));
            }
            _ => {}
        }
    }
    (tag.trim(), None)
}

fn nesting_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(nesting_depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(nesting_depth).max().unwrap_or(0),
        _ => 0,
    }
}
