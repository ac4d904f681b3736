//! # netnode-core — Distribution Network Domain Model
//!
//! Defines the records and business rules of the electronics distribution
//! network: factories supply retail chains, retail chains supply individual
//! entrepreneurs, and every participant tracks what it owes its supplier.
//!
//! ## Key Rules
//!
//! 1. **Hierarchy level is derived, never stored.** A node with no supplier is
//!    level 0; every other node is one more than its supplier. The walk is
//!    iterative and refuses to loop on a cyclic graph
//!    (see [`hierarchy::SupplierIndex`]).
//!
//! 2. **Debt is write-protected.** [`Debt`] cannot hold a negative amount, and
//!    the general update type [`NodeChanges`] has no debt field at all. The only
//!    mutation is [`NetworkNode::clear_debt`].
//!
//! 3. **Deleting a supplier orphans, never cascades.** Dependents keep existing
//!    with their supplier cleared; products of the deleted node go with it.
//!
//! ## Crate Policy
//!
//! - No I/O and no dependency on the HTTP layer.
//! - No `.unwrap()` outside tests.
//! - Field validation reports every failing field at once via [`FieldErrors`].

pub mod action;
pub mod debt;
pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod node;
pub mod product;
pub mod validation;

pub use action::{NodeAction, PayloadSchema};
pub use debt::{guard_debt_absent, Debt, DEBT_FIELD};
pub use error::{DebtError, HierarchyError};
pub use hierarchy::SupplierIndex;
pub use identity::{NodeId, ProductId};
pub use node::{NetworkNode, NewNode, NodeChanges, NodeFields, NodeType};
pub use product::{NewProduct, Product, ProductChanges, ProductFields};
pub use validation::FieldErrors;
