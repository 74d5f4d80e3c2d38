// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Operation registry: kind → wire path and payload layouts
//!
//! The registry is built once, validated as a whole, and read-only
//! afterwards. Each operation is a zero-sized marker in [`ops`] that ties
//! its [`OperationKind`] to its request and response record types.

use std::fmt::Debug;
use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::LayoutError;
use crate::kind::OperationKind;
use crate::layout::{FieldLayout, FieldSpec};
use crate::record::WireRecord;

/// Bound shared by every request and response record.
pub trait Payload:
    WireRecord + Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
}

impl<T> Payload for T where
    T: WireRecord + Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
}

/// A forwarded filesystem operation.
pub trait Operation: Send + Sync + 'static {
    const KIND: OperationKind;
    type Request: Payload;
    type Response: Payload;
}

macro_rules! define_markers {
    ($($variant:ident => $name:literal ($req:ty, $resp:ty)),* $(,)?) => {
        /// Zero-sized operation markers, one per [`OperationKind`].
        pub mod ops {
            use super::{Operation, OperationKind};

            $(
                #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
                pub struct $variant;

                impl Operation for $variant {
                    const KIND: OperationKind = OperationKind::$variant;
                    type Request = $req;
                    type Response = $resp;
                }
            )*
        }

        fn builtin_entries() -> Vec<RegistryEntry> {
            vec![
                $(RegistryEntry::of::<ops::$variant>()),*
            ]
        }
    };
}

crate::for_each_operation!(define_markers);

/// Unvalidated input to [`Registry::from_entries`].
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub kind: OperationKind,
    pub request: (&'static str, Vec<FieldSpec>),
    pub response: (&'static str, Vec<FieldSpec>),
}

impl RegistryEntry {
    pub fn of<Op: Operation>() -> Self {
        Self {
            kind: Op::KIND,
            request: (Op::Request::NAME, Op::Request::describe()),
            response: (Op::Response::NAME, Op::Response::describe()),
        }
    }
}

/// Static metadata of one operation kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub path: &'static str,
    request: FieldLayout,
    response: FieldLayout,
}

impl OperationDescriptor {
    /// Request layout; empty when the operation sends no body.
    pub fn request_layout(&self) -> &FieldLayout {
        &self.request
    }

    /// Response layout; empty when success carries no body.
    pub fn response_layout(&self) -> &FieldLayout {
        &self.response
    }

    pub fn request(&self) -> Option<&FieldLayout> {
        (!self.request.is_empty()).then_some(&self.request)
    }

    pub fn response(&self) -> Option<&FieldLayout> {
        (!self.response.is_empty()).then_some(&self.response)
    }
}

/// All operation descriptors, indexed by kind.
#[derive(Debug)]
pub struct Registry {
    descriptors: Vec<OperationDescriptor>,
}

impl Registry {
    /// Build and validate the built-in operation table.
    pub fn build() -> Result<Self, LayoutError> {
        Self::from_entries(builtin_entries())
    }

    /// Validate `entries`: every kind exactly once, every layout well formed.
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Result<Self, LayoutError> {
        let mut slots: Vec<Option<OperationDescriptor>> = vec![None; OperationKind::ALL.len()];

        for entry in entries {
            let slot = &mut slots[entry.kind.index()];
            if slot.is_some() {
                return Err(LayoutError::DuplicateKind(entry.kind));
            }
            let (request_name, request_fields) = entry.request;
            let (response_name, response_fields) = entry.response;
            *slot = Some(OperationDescriptor {
                kind: entry.kind,
                path: entry.kind.path(),
                request: FieldLayout::new(request_name, request_fields)?,
                response: FieldLayout::new(response_name, response_fields)?,
            });
        }

        let descriptors = slots
            .into_iter()
            .zip(OperationKind::ALL)
            .map(|(slot, kind)| slot.ok_or(LayoutError::MissingKind(*kind)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { descriptors })
    }

    /// Process-wide registry.
    ///
    /// # Panics
    ///
    /// Panics on first use if a built-in layout is invalid; the gateway
    /// cannot start with a malformed operation table.
    pub fn global() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(|| match Registry::build() {
            Ok(registry) => registry,
            Err(err) => panic!("invalid operation table: {}", err),
        })
    }

    pub fn descriptor(&self, kind: OperationKind) -> &OperationDescriptor {
        &self.descriptors[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.descriptors.iter()
    }
}

/// Descriptor of `kind` in the global registry.
pub fn descriptor_for(kind: OperationKind) -> &'static OperationDescriptor {
    Registry::global().descriptor(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FieldType;

    #[fusegate_test_utils::logged_test]
    fn builtin_table_covers_every_kind_once() {
        let registry = Registry::build().unwrap();
        let kinds: Vec<_> = registry.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, OperationKind::ALL.to_vec());
        for descriptor in registry.iter() {
            assert_eq!(descriptor.path, descriptor.kind.path());
        }
    }

    #[fusegate_test_utils::logged_test]
    fn optional_layouts_follow_the_table() {
        let destroy = descriptor_for(OperationKind::Destroy);
        assert!(destroy.request().is_none());
        assert!(destroy.response().is_none());

        let statfs = descriptor_for(OperationKind::Statfs);
        assert!(statfs.request().is_none());
        assert_eq!(statfs.response().unwrap().prefix_len(), 5 * 8 + 3 * 4);

        let getattr = descriptor_for(OperationKind::Getattr);
        assert_eq!(getattr.request().unwrap().prefix_len(), 8);
        assert_eq!(getattr.response().unwrap().prefix_len(), 92);
    }

    #[fusegate_test_utils::logged_test]
    fn non_trailing_variable_field_fails_the_build() {
        let mut entries = builtin_entries();
        let lookup = entries
            .iter_mut()
            .find(|entry| entry.kind == OperationKind::Lookup)
            .unwrap();
        lookup.request = (
            "BadLookup",
            vec![
                FieldSpec::new("name", FieldType::Text),
                FieldSpec::new("inode", FieldType::U64),
            ],
        );

        let err = Registry::from_entries(entries).unwrap_err();
        assert_eq!(
            err,
            LayoutError::NonTrailingVariable {
                record: "BadLookup",
                field: "name",
                after: "inode",
            }
        );
    }

    #[fusegate_test_utils::logged_test]
    fn duplicate_and_missing_kinds_fail_the_build() {
        let mut entries = builtin_entries();
        entries.push(RegistryEntry::of::<ops::Read>());
        assert_eq!(
            Registry::from_entries(entries).unwrap_err(),
            LayoutError::DuplicateKind(OperationKind::Read)
        );

        let entries: Vec<_> = builtin_entries()
            .into_iter()
            .filter(|entry| entry.kind != OperationKind::Forget)
            .collect();
        assert_eq!(
            Registry::from_entries(entries).unwrap_err(),
            LayoutError::MissingKind(OperationKind::Forget)
        );
    }
}
