// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XACML policy evaluation engine.
//!
//! This module contains the core [`evaluate`] function. Evaluation combines
//! decisions at two levels, both with **deny-overrides**:
//!
//! 1. **Document level**: every policy is evaluated; the first Deny wins
//!    immediately, otherwise any Permit yields Permit
//! 2. **Policy level**: the same algorithm over the policy's rules
//!
//! Everything here is a pure function of the document and the request, so
//! evaluations can run concurrently without locking.

use tracing::instrument;

use crate::condition::evaluate_condition;
use crate::error::EvaluationError;
use crate::target::matches_target;
use crate::types::{
	AuthorizationRequest, AuthorizationResponse, Decision, Policy, PolicyDocument, Rule,
};

pub const STATUS_NO_POLICIES: &str = "No policies found";
pub const STATUS_DENIED: &str = "Access denied by policy";

/// Evaluates a request against every policy in the document.
///
/// Never fails: evaluation errors are reported as `Indeterminate` with the
/// error in the status.
#[instrument(
	level = "debug",
	skip(document, request),
	fields(action = %request.action, policies = document.policies.len())
)]
pub fn evaluate(
	document: &PolicyDocument,
	request: &AuthorizationRequest,
) -> AuthorizationResponse {
	match combine_policies(document, request) {
		Ok(response) => response,
		Err(e) => {
			tracing::error!(error = %e, "Error evaluating authorization request");
			AuthorizationResponse::new(Decision::Indeterminate, format!("Error: {e}"))
		}
	}
}

fn combine_policies(
	document: &PolicyDocument,
	request: &AuthorizationRequest,
) -> Result<AuthorizationResponse, EvaluationError> {
	if document.policies.is_empty() {
		tracing::warn!("No policies loaded; request is not applicable");
		return Ok(AuthorizationResponse::new(
			Decision::NotApplicable,
			STATUS_NO_POLICIES,
		));
	}

	let mut any_permit = false;
	for policy in &document.policies {
		match evaluate_policy(policy, request)? {
			Decision::Deny => {
				tracing::debug!(policy_id = %policy.id, "policy returned Deny");
				return Ok(AuthorizationResponse::new(Decision::Deny, STATUS_DENIED));
			}
			Decision::Permit => {
				tracing::debug!(policy_id = %policy.id, "policy returned Permit");
				any_permit = true;
			}
			Decision::NotApplicable | Decision::Indeterminate => {}
		}
	}

	Ok(AuthorizationResponse::ok(if any_permit {
		Decision::Permit
	} else {
		Decision::NotApplicable
	}))
}

/// Evaluates one policy: its target gates the rules, which combine with
/// deny-overrides.
pub fn evaluate_policy(
	policy: &Policy,
	request: &AuthorizationRequest,
) -> Result<Decision, EvaluationError> {
	if let Some(target) = &policy.target {
		if !matches_target(target, request) {
			return Ok(Decision::NotApplicable);
		}
	}

	let mut any_permit = false;
	for rule in &policy.rules {
		match evaluate_rule(rule, request)? {
			Decision::Deny => return Ok(Decision::Deny),
			Decision::Permit => any_permit = true,
			Decision::NotApplicable | Decision::Indeterminate => {}
		}
	}

	Ok(if any_permit {
		Decision::Permit
	} else {
		Decision::NotApplicable
	})
}

/// Evaluates one rule: target, then condition, then the rule's effect.
pub fn evaluate_rule(
	rule: &Rule,
	request: &AuthorizationRequest,
) -> Result<Decision, EvaluationError> {
	if let Some(target) = &rule.target {
		if !matches_target(target, request) {
			return Ok(Decision::NotApplicable);
		}
	}

	if let Some(condition) = &rule.condition {
		if !evaluate_condition(condition, request)? {
			return Ok(Decision::NotApplicable);
		}
	}

	Ok(rule.effect.into())
}
