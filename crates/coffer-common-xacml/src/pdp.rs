// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared policy decision point.
//!
//! A [`PolicyDecisionPoint`] is built once at startup and handed to every
//! request handler by cloning. The loaded document is immutable, so
//! concurrent evaluation needs no locking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::evaluate;
use crate::error::PolicyError;
use crate::loader::load_policies;
use crate::types::{AuthorizationRequest, AuthorizationResponse, Decision, PolicyDocument};

#[derive(Debug, Clone)]
pub struct PolicyDecisionPoint {
	document: Arc<PolicyDocument>,
	source: Option<PathBuf>,
}

impl PolicyDecisionPoint {
	/// Loads the policy file at `path`. Fails if the file is missing or invalid.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
		let path = path.as_ref();
		let document = load_policies(path)?;
		Ok(Self {
			document: Arc::new(document),
			source: Some(path.to_path_buf()),
		})
	}

	/// Wraps an already-built document. Used by tests and embedders that
	/// construct policies in code.
	pub fn from_document(document: PolicyDocument) -> Self {
		Self {
			document: Arc::new(document),
			source: None,
		}
	}

	pub fn evaluate(&self, request: &AuthorizationRequest) -> AuthorizationResponse {
		evaluate(&self.document, request)
	}

	/// Convenience wrapper used by the enforcement layer. Only an explicit
	/// `Permit` grants access.
	pub fn check_authorization(
		&self,
		username: &str,
		role: &str,
		action: &str,
		resource_owner: Option<&str>,
		target_role: Option<&str>,
	) -> bool {
		let request =
			AuthorizationRequest::for_user(username, role, action, resource_owner, target_role);
		let response = self.evaluate(&request);

		tracing::info!(
			username,
			role,
			action,
			resource_owner = resource_owner.unwrap_or_default(),
			target_role = target_role.unwrap_or_default(),
			decision = %response.decision,
			status = %response.status,
			"XACML authorization decision"
		);

		response.decision == Decision::Permit
	}

	pub fn document(&self) -> &PolicyDocument {
		&self.document
	}

	pub fn policy_count(&self) -> usize {
		self.document.policies.len()
	}

	pub fn rule_count(&self) -> usize {
		self.document.rule_count()
	}

	/// The file the policies were loaded from, if any.
	pub fn source(&self) -> Option<&Path> {
		self.source.as_deref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{Apply, AttributeDesignator, Match, Policy, Rule, Target};

	fn pdp() -> PolicyDecisionPoint {
		PolicyDecisionPoint::from_document(PolicyDocument::new(vec![Policy::new("users")
			.with_target(Target::all_of(vec![Match::subject("role", "user")]))
			.with_rule(
				Rule::permit("own-files")
					.with_target(Target::all_of(vec![Match::action("delete")]))
					.with_condition(Apply::string_equal(
						AttributeDesignator::subject("username"),
						AttributeDesignator::resource("resource-owner"),
					)),
			)]))
	}

	#[test]
	fn check_authorization_permits_only_on_permit() {
		let pdp = pdp();
		assert!(pdp.check_authorization("bob", "user", "delete", Some("bob"), None));
		assert!(!pdp.check_authorization("bob", "user", "delete", Some("alice"), None));
		assert!(!pdp.check_authorization("bob", "user", "delete", None, None));
		assert!(!pdp.check_authorization("bob", "user", "upload", Some("bob"), None));
	}

	#[test]
	fn clones_share_the_document() {
		let pdp = pdp();
		let clone = pdp.clone();
		assert!(Arc::ptr_eq(&pdp.document, &clone.document));
		assert_eq!(clone.policy_count(), 1);
		assert_eq!(clone.rule_count(), 1);
		assert_eq!(clone.source(), None);
	}

	#[test]
	fn empty_document_is_not_applicable() {
		let pdp = PolicyDecisionPoint::from_document(PolicyDocument::default());
		let response = pdp.evaluate(&AuthorizationRequest::new("list"));
		assert_eq!(response.decision, Decision::NotApplicable);
		assert!(!pdp.check_authorization("alice", "admin", "list", None, None));
	}

	#[test]
	fn from_file_fails_for_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let err = PolicyDecisionPoint::from_file(dir.path().join("missing.xml")).unwrap_err();
		assert!(matches!(err, PolicyError::NotFound { .. }));
	}

	#[test]
	fn evaluation_is_safe_across_threads() {
		let pdp = pdp();
		let handles: Vec<_> = (0..8)
			.map(|i| {
				let pdp = pdp.clone();
				std::thread::spawn(move || {
					let owner = if i % 2 == 0 { "bob" } else { "alice" };
					(i, pdp.check_authorization("bob", "user", "delete", Some(owner), None))
				})
			})
			.collect();

		for handle in handles {
			let (i, permitted) = handle.join().unwrap();
			assert_eq!(permitted, i % 2 == 0);
		}
	}
}
