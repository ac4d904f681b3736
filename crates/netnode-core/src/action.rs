//! # Node Operations
//!
//! Names every operation on the node resource and maps it to the payload it
//! accepts. Handlers consult this mapping instead of choosing a payload type
//! at runtime, so the update path can never be handed a schema that carries
//! debt. Response shapes are fixed by each handler's return type.

use serde::{Deserialize, Serialize};

/// One operation on the node resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeAction {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    DependentNodes,
    ClearDebt,
    /// Clear debt on many nodes at once.
    BulkClearDebt,
}

/// Accepted request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSchema {
    /// All writable fields, debt optional.
    Create,
    /// Writable fields without debt. `partial` relaxes required fields.
    Update { partial: bool },
    /// A list of node ids.
    IdList,
}

impl NodeAction {
    pub const ALL: [NodeAction; 9] = [
        Self::List,
        Self::Retrieve,
        Self::Create,
        Self::Update,
        Self::PartialUpdate,
        Self::Destroy,
        Self::DependentNodes,
        Self::ClearDebt,
        Self::BulkClearDebt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Retrieve => "retrieve",
            Self::Create => "create",
            Self::Update => "update",
            Self::PartialUpdate => "partial_update",
            Self::Destroy => "destroy",
            Self::DependentNodes => "dependent_nodes",
            Self::ClearDebt => "clear_debt",
            Self::BulkClearDebt => "bulk_clear_debt",
        }
    }

    /// Request body this operation accepts, if any.
    pub fn payload_schema(&self) -> Option<PayloadSchema> {
        match self {
            Self::Create => Some(PayloadSchema::Create),
            Self::Update => Some(PayloadSchema::Update { partial: false }),
            Self::PartialUpdate => Some(PayloadSchema::Update { partial: true }),
            Self::BulkClearDebt => Some(PayloadSchema::IdList),
            Self::List
            | Self::Retrieve
            | Self::Destroy
            | Self::DependentNodes
            | Self::ClearDebt => None,
        }
    }

    /// Whether an update runs in partial mode. `None` for non-update actions.
    pub fn is_partial(&self) -> Option<bool> {
        match self.payload_schema() {
            Some(PayloadSchema::Update { partial }) => Some(partial),
            _ => None,
        }
    }

    /// Whether the payload may carry a `debt` key.
    pub fn accepts_debt(&self) -> bool {
        matches!(self.payload_schema(), Some(PayloadSchema::Create))
    }
}

impl std::fmt::Display for NodeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_create_accepts_debt() {
        let with_debt: Vec<_> = NodeAction::ALL
            .iter()
            .filter(|a| a.accepts_debt())
            .collect();
        assert_eq!(with_debt, vec![&NodeAction::Create]);
    }

    #[test]
    fn update_modes() {
        assert_eq!(NodeAction::Update.is_partial(), Some(false));
        assert_eq!(NodeAction::PartialUpdate.is_partial(), Some(true));
        assert_eq!(NodeAction::Create.is_partial(), None);
    }

    #[test]
    fn names_match_serde() {
        for action in NodeAction::ALL {
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                serde_json::json!(action.as_str())
            );
        }
    }
}
