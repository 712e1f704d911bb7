// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Handler-level authorization helpers.
//!
//! Use these when the resource owner or target role is only known inside the
//! handler, for example after looking a file up by id.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use coffer_common_xacml::PolicyDecisionPoint;
use serde::Serialize;
use tracing::instrument;

use crate::caller::Caller;
use crate::enforce::ACCESS_DENIED_MESSAGE;

/// Error type for authorization failures that implements IntoResponse as 403 Forbidden.
///
/// The message is intentionally generic to avoid leaking policy details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationError {
	/// Error code, always "forbidden"
	pub error: String,
	/// Human-readable message
	pub message: String,
}

impl AuthorizationError {
	pub fn forbidden(message: impl Into<String>) -> Self {
		Self {
			error: "forbidden".to_string(),
			message: message.into(),
		}
	}
}

impl Default for AuthorizationError {
	fn default() -> Self {
		Self::forbidden(ACCESS_DENIED_MESSAGE)
	}
}

impl std::fmt::Display for AuthorizationError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.error, self.message)
	}
}

impl std::error::Error for AuthorizationError {}

impl IntoResponse for AuthorizationError {
	fn into_response(self) -> Response {
		(StatusCode::FORBIDDEN, Json(self)).into_response()
	}
}

/// Asks the policy decision point whether `caller` may perform `action`.
///
/// A missing or empty `resource_owner` means the caller's own resources.
#[instrument(
	skip(pdp, caller),
	fields(username = %caller.username, role = %caller.role)
)]
pub fn check_permission(
	pdp: &PolicyDecisionPoint,
	caller: &Caller,
	action: &str,
	resource_owner: Option<&str>,
	target_role: Option<&str>,
) -> bool {
	let resource_owner = effective_owner(caller, resource_owner);
	pdp.check_authorization(
		&caller.username,
		&caller.role,
		action,
		Some(resource_owner),
		target_role,
	)
}

/// Like [`check_permission`], but returns an error that renders as 403.
pub fn require_permission(
	pdp: &PolicyDecisionPoint,
	caller: &Caller,
	action: &str,
	resource_owner: Option<&str>,
	target_role: Option<&str>,
) -> Result<(), AuthorizationError> {
	let resource_owner = effective_owner(caller, resource_owner);
	if check_permission(pdp, caller, action, Some(resource_owner), target_role) {
		Ok(())
	} else {
		tracing::warn!(
			username = %caller.username,
			role = %caller.role,
			action,
			resource_owner,
			"XACML denied: handler-level check failed"
		);
		Err(AuthorizationError::default())
	}
}

fn effective_owner<'a>(caller: &'a Caller, resource_owner: Option<&'a str>) -> &'a str {
	resource_owner
		.filter(|owner| !owner.is_empty())
		.unwrap_or(&caller.username)
}

/// Macro for inline authorization checks in handlers.
///
/// Expands to [`require_permission`]. The owner and target role are optional
/// trailing arguments.
///
/// # Example
///
/// ```ignore
/// async fn delete_file(
///     State(state): State<AppState>,
///     RequireCaller(caller): RequireCaller,
///     Path(id): Path<i64>,
/// ) -> Result<impl IntoResponse, AuthorizationError> {
///     let file = state.files.get(id).await?;
///     authorize!(&state.pdp, &caller, "delete", Some(file.owner.as_str()))?;
///     // ... rest of handler
/// }
/// ```
#[macro_export]
macro_rules! authorize {
	($pdp:expr, $caller:expr, $action:expr) => {
		$crate::check::require_permission($pdp, $caller, $action, None, None)
	};
	($pdp:expr, $caller:expr, $action:expr, $owner:expr) => {
		$crate::check::require_permission($pdp, $caller, $action, $owner, None)
	};
	($pdp:expr, $caller:expr, $action:expr, $owner:expr, $target_role:expr) => {
		$crate::check::require_permission($pdp, $caller, $action, $owner, $target_role)
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use coffer_common_xacml::{
		Apply, AttributeDesignator, Match, Policy, PolicyDocument, Rule, Target,
	};
	use proptest::prelude::*;

	fn pdp() -> PolicyDecisionPoint {
		PolicyDecisionPoint::from_document(PolicyDocument::new(vec![Policy::new("users")
			.with_target(Target::all_of(vec![Match::subject("role", "user")]))
			.with_rule(
				Rule::permit("own-files").with_condition(Apply::string_equal(
					AttributeDesignator::subject("username"),
					AttributeDesignator::resource("resource-owner"),
				)),
			)]))
	}

	#[test]
	fn owner_defaults_to_caller() {
		let alice = Caller::new("alice", "user");
		assert!(check_permission(&pdp(), &alice, "download", None, None));
		assert!(check_permission(&pdp(), &alice, "download", Some(""), None));
		assert!(!check_permission(&pdp(), &alice, "download", Some("bob"), None));
	}

	#[test]
	fn empty_owner_resolves_to_caller() {
		let alice = Caller::new("alice", "user");
		assert_eq!(effective_owner(&alice, Some("")), "alice");
		assert_eq!(effective_owner(&alice, None), "alice");
		assert_eq!(effective_owner(&alice, Some("bob")), "bob");
		assert_eq!(require_permission(&pdp(), &alice, "delete", Some(""), None), Ok(()));
	}

	#[test]
	fn require_permission_maps_denial_to_error() {
		let alice = Caller::new("alice", "user");
		assert_eq!(require_permission(&pdp(), &alice, "delete", Some("alice"), None), Ok(()));

		let err = require_permission(&pdp(), &alice, "delete", Some("bob"), None).unwrap_err();
		assert_eq!(err.to_string(), "forbidden: Access denied by authorization policy");
	}

	#[test]
	fn authorize_macro_forms() {
		let pdp = pdp();
		let alice = Caller::new("alice", "user");
		assert!(crate::authorize!(&pdp, &alice, "list").is_ok());
		assert!(crate::authorize!(&pdp, &alice, "list", Some("bob")).is_err());
		assert!(crate::authorize!(&pdp, &alice, "list", Some("alice"), Some("user")).is_ok());
	}

	#[test]
	fn authorization_error_renders_403() {
		let resp = AuthorizationError::default().into_response();
		assert_eq!(resp.status(), StatusCode::FORBIDDEN);
	}

	proptest! {
		/// Only the owner is ever permitted by an owner-only policy.
		#[test]
		fn only_owner_is_permitted(
			username in "[a-z]{1,8}",
			owner in "[a-z]{1,8}",
			action in prop_oneof![Just("upload"), Just("download"), Just("delete")],
		) {
			let caller = Caller::new(username.clone(), "user");
			let permitted = check_permission(&pdp(), &caller, action, Some(owner.as_str()), None);
			prop_assert_eq!(permitted, username == owner);
		}

		/// Roles the policy does not mention are never permitted.
		#[test]
		fn unknown_roles_are_denied(role in "[A-Z][a-z]{0,8}", username in "[a-z]{1,8}") {
			let caller = Caller::new(username, role);
			prop_assert!(require_permission(&pdp(), &caller, "list", None, None).is_err());
		}
	}
}
