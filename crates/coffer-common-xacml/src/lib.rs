// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XACML policy decision point for the Coffer file service.
//!
//! This crate provides:
//! - A loader for XACML 3.0 policy documents ([`load_policies`])
//! - A deny-overrides evaluation engine ([`evaluate`])
//! - A shareable decision point handle ([`PolicyDecisionPoint`])
//!
//! Supported subset: targets built from `string-equal` matches, and rule
//! conditions over the `string-equal`, `not` and `or` functions. Anything
//! else loads but never matches.
//!
//! # Usage
//!
//! ```ignore
//! use coffer_common_xacml::PolicyDecisionPoint;
//!
//! let pdp = PolicyDecisionPoint::from_file("/app/xacml/policies.xml")?;
//! if pdp.check_authorization("alice", "user", "delete", Some("alice"), None) {
//!     // delete the file
//! }
//! ```

pub mod attributes;
pub mod condition;
pub mod engine;
pub mod error;
pub mod loader;
pub mod pdp;
pub mod target;
pub mod types;

pub use condition::MAX_APPLY_DEPTH;
pub use engine::{evaluate, STATUS_DENIED, STATUS_NO_POLICIES};
pub use error::{EvaluationError, PolicyError};
pub use loader::{load_policies, parse_policy_document, XACML_NAMESPACE};
pub use pdp::PolicyDecisionPoint;
pub use types::*;
