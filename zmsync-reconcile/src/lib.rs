//! # zmsync-reconcile
//!
//! Reconciles top-level domains and roles against ZMS.
//!
//! [`DomainReconciler`] and [`RoleReconciler`] implement create / read /
//! update / delete for one entity each. [`pipeline`] drives them from a
//! manifest and the persisted [`State`]: [`pipeline::apply_at`] refreshes,
//! plans and executes in one sequential pass.

pub mod classify;
pub mod domain;
pub mod error;
pub mod mapper;
pub mod pipeline;
pub mod plan;
pub mod role;
pub mod state;

pub use classify::{classify, lookup, ErrorClass, Lookup};
pub use domain::DomainReconciler;
pub use error::ReconcileError;
pub use plan::{Action, Plan, PlanSummary};
pub use role::{RoleChanges, RoleReconciler};
pub use state::State;
