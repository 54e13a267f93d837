//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity the engine touches has a strongly-typed ID so that a
//! settlement ID can never be passed where a structure ID is expected.
//! All IDs use UUID v7 (time-ordered) for efficient database indexing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a world (one persistent game shard).
    WorldId
}

define_id! {
    /// Unique identifier for a region of tiles within a world.
    RegionId
}

define_id! {
    /// Unique identifier for a map tile.
    TileId
}

define_id! {
    /// Unique identifier for the player owning a settlement.
    PlayerId
}

define_id! {
    /// Unique identifier for a settlement.
    SettlementId
}

define_id! {
    /// Unique identifier for a structure instance inside a settlement.
    StructureId
}

define_id! {
    /// Unique identifier for a construction queue entry.
    QueueEntryId
}

define_id! {
    /// Unique identifier for a disaster event.
    DisasterId
}

define_id! {
    /// Unique identifier for a cross-settlement resource transfer.
    TransferId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_values() {
        let a = SettlementId::new();
        let b = SettlementId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = DisasterId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<DisasterId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = StructureId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
