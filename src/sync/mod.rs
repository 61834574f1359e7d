//! Sync Module - keeping registered commands in line with declared ones.
//!
//! [`CommandApi`] is the seam to the platform; [`HttpCommandApi`] implements
//! it over REST. [`Reconciler`] plans and applies passes.

mod api;
mod reconcile;
mod rest;

pub use api::CommandApi;
pub use reconcile::{Reconciler, SyncAction, SyncPlan, SyncReport, diff_scope};
pub use rest::HttpCommandApi;
