// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XACML policy enforcement for Coffer routes.
//!
//! Authorization runs at two levels:
//!
//! 1. **Route-level**: the [`Enforce`] layer checks the caller before the
//!    handler runs, taking the resource owner and target role from path or
//!    query parameters.
//! 2. **Handler-level**: [`check_permission`], [`require_permission`] and the
//!    [`authorize!`] macro, for when those attributes are only known inside
//!    the handler.
//!
//! Both levels only grant access on an explicit Permit. Unauthenticated
//! requests are rejected with 401 and denied ones with 403.
//!
//! # Example
//!
//! ```ignore
//! use coffer_server_authz::Enforce;
//!
//! let pdp = PolicyDecisionPoint::from_file(config.authz.resolve_policy_path()?)?;
//!
//! Router::new()
//!     .route("/files", get(list_files))
//!     .route_layer(Enforce::new(pdp.clone(), "list"));
//! ```

pub mod caller;
pub mod check;
pub mod enforce;

pub use caller::{AuthContext, Caller, ErrorResponse, RequireCaller};
pub use check::{check_permission, require_permission, AuthorizationError};
pub use enforce::{
	Enforce, EnforceFuture, EnforceService, ACCESS_DENIED_MESSAGE, DEFAULT_OWNER_OVERRIDE_QUERY,
};
