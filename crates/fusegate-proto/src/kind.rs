// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The closed set of filesystem operation kinds

use serde::{Deserialize, Serialize};

macro_rules! define_kinds {
    ($($variant:ident => $name:literal ($req:ty, $resp:ty)),* $(,)?) => {
        /// A filesystem callback type that the gateway forwards to the backend.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum OperationKind {
            $($variant),*
        }

        impl OperationKind {
            /// Every kind, in registry order.
            pub const ALL: &'static [OperationKind] = &[$(OperationKind::$variant),*];

            /// Lowercase wire name, e.g. `getattr`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(OperationKind::$variant => $name),*
                }
            }

            /// HTTP path on the backend, e.g. `/v1/getattr`.
            pub const fn path(self) -> &'static str {
                match self {
                    $(OperationKind::$variant => concat!("/v1/", $name)),*
                }
            }
        }
    };
}

crate::for_each_operation!(define_kinds);

impl OperationKind {
    /// Position of this kind in [`OperationKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the operation changes filesystem state. Read-only mounts reject these locally.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            OperationKind::Setattr
                | OperationKind::Setxattr
                | OperationKind::Removexattr
                | OperationKind::Create
                | OperationKind::Mkdir
                | OperationKind::Symlink
                | OperationKind::Link
                | OperationKind::Mknod
                | OperationKind::Rename
                | OperationKind::Remove
                | OperationKind::Write
        )
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown operation kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[fusegate_test_utils::logged_test]
    fn paths_follow_kind_names() {
        assert_eq!(OperationKind::ALL.len(), 27);
        assert_eq!(OperationKind::Getattr.path(), "/v1/getattr");
        assert_eq!(OperationKind::Removexattr.path(), "/v1/removexattr");
        for kind in OperationKind::ALL {
            assert_eq!(kind.path(), format!("/v1/{}", kind.name()));
            assert_eq!(kind.name().parse::<OperationKind>().unwrap(), *kind);
        }
    }

    #[fusegate_test_utils::logged_test]
    fn index_matches_registry_order() {
        for (position, kind) in OperationKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[fusegate_test_utils::logged_test]
    fn read_paths_are_not_mutating() {
        assert!(!OperationKind::Read.is_mutating());
        assert!(!OperationKind::Getattr.is_mutating());
        assert!(!OperationKind::Interrupt.is_mutating());
        assert!(OperationKind::Write.is_mutating());
        assert!(OperationKind::Rename.is_mutating());
    }
}
