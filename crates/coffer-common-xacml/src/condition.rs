// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Condition evaluation over the `string-equal`, `not` and `or` functions.
//!
//! Unsupported functions evaluate to false, so a rule guarded by one never
//! applies.

use crate::attributes::resolve_attribute;
use crate::error::EvaluationError;
use crate::types::{
	Apply, AttributeDesignator, AuthorizationRequest, Condition, Expression, Function,
};

/// Maximum nesting of function applications, enforced at load and evaluation.
pub const MAX_APPLY_DEPTH: usize = 32;

/// Evaluates a rule condition. A condition without an Apply always holds.
pub fn evaluate_condition(
	condition: &Condition,
	request: &AuthorizationRequest,
) -> Result<bool, EvaluationError> {
	match &condition.apply {
		Some(apply) => evaluate_apply(apply, request),
		None => Ok(true),
	}
}

/// Evaluates a function application tree.
pub fn evaluate_apply(
	apply: &Apply,
	request: &AuthorizationRequest,
) -> Result<bool, EvaluationError> {
	eval(apply, request, 1)
}

fn eval(
	apply: &Apply,
	request: &AuthorizationRequest,
	depth: usize,
) -> Result<bool, EvaluationError> {
	check_depth(depth)?;

	match &apply.function {
		Function::StringEqual => {
			let mut designators = Vec::new();
			collect_designators(apply, &mut designators, depth)?;
			let [first, second, ..] = designators.as_slice() else {
				return Ok(false);
			};
			let left = resolve_attribute(first, request);
			let right = resolve_attribute(second, request);
			Ok(left.is_some() && left == right)
		}
		Function::Not => match apply.nested().next() {
			Some(inner) => Ok(!eval(inner, request, depth + 1)?),
			None => Ok(false),
		},
		Function::Or => {
			for inner in apply.nested() {
				if eval(inner, request, depth + 1)? {
					return Ok(true);
				}
			}
			Ok(false)
		}
		Function::Unsupported(id) => {
			tracing::trace!(function_id = %id, "unsupported function evaluates to false");
			Ok(false)
		}
	}
}

/// Collects every designator under `apply` in document order, descending into
/// nested applications.
fn collect_designators<'a>(
	apply: &'a Apply,
	out: &mut Vec<&'a AttributeDesignator>,
	depth: usize,
) -> Result<(), EvaluationError> {
	check_depth(depth)?;
	for arg in &apply.arguments {
		match arg {
			Expression::Designator(designator) => out.push(designator),
			Expression::Apply(inner) => collect_designators(inner, out, depth + 1)?,
		}
	}
	Ok(())
}

fn check_depth(depth: usize) -> Result<(), EvaluationError> {
	if depth > MAX_APPLY_DEPTH {
		return Err(EvaluationError::ExpressionTooDeep {
			limit: MAX_APPLY_DEPTH,
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn owner_check() -> Apply {
		Apply::string_equal(
			AttributeDesignator::subject("username"),
			AttributeDesignator::resource("resource-owner"),
		)
	}

	fn request(username: &str, owner: Option<&str>) -> AuthorizationRequest {
		let mut req = AuthorizationRequest::new("delete").with_subject("username", username);
		if let Some(owner) = owner {
			req = req.with_resource("resource-owner", owner);
		}
		req
	}

	fn always_false() -> Apply {
		Apply::new(Function::Unsupported("urn:example:false".to_string()), vec![])
	}

	#[test]
	fn string_equal_compares_resolved_values() {
		assert_eq!(evaluate_apply(&owner_check(), &request("bob", Some("bob"))), Ok(true));
		assert_eq!(evaluate_apply(&owner_check(), &request("bob", Some("alice"))), Ok(false));
		assert_eq!(evaluate_apply(&owner_check(), &request("bob", Some("Bob"))), Ok(false));
	}

	#[test]
	fn string_equal_with_unresolved_values_is_false() {
		assert_eq!(evaluate_apply(&owner_check(), &request("bob", None)), Ok(false));

		let both_missing = Apply::string_equal(
			AttributeDesignator::subject("missing"),
			AttributeDesignator::resource("missing"),
		);
		assert_eq!(evaluate_apply(&both_missing, &request("bob", None)), Ok(false));
	}

	#[test]
	fn string_equal_needs_two_designators() {
		let single = Apply::new(
			Function::StringEqual,
			vec![Expression::Designator(AttributeDesignator::subject("username"))],
		);
		assert_eq!(evaluate_apply(&single, &request("bob", Some("bob"))), Ok(false));
	}

	#[test]
	fn string_equal_finds_designators_in_nested_applies() {
		let nested = Apply::new(
			Function::StringEqual,
			vec![
				Expression::Apply(Apply::new(
					Function::Unsupported("one-and-only".to_string()),
					vec![Expression::Designator(AttributeDesignator::subject("username"))],
				)),
				Expression::Designator(AttributeDesignator::resource("resource-owner")),
			],
		);
		assert_eq!(evaluate_apply(&nested, &request("bob", Some("bob"))), Ok(true));
	}

	#[test]
	fn not_negates() {
		let differs = Apply::not(owner_check());
		assert_eq!(evaluate_apply(&differs, &request("bob", Some("alice"))), Ok(true));
		assert_eq!(evaluate_apply(&differs, &request("bob", Some("bob"))), Ok(false));
	}

	#[test]
	fn not_without_argument_is_false() {
		let empty = Apply::new(Function::Not, vec![]);
		assert_eq!(evaluate_apply(&empty, &request("bob", None)), Ok(false));
	}

	#[test]
	fn or_is_true_if_any_branch_is_true() {
		let req = request("bob", Some("bob"));
		assert_eq!(evaluate_apply(&Apply::or(vec![]), &req), Ok(false));
		assert_eq!(evaluate_apply(&Apply::or(vec![always_false()]), &req), Ok(false));
		assert_eq!(
			evaluate_apply(&Apply::or(vec![always_false(), owner_check()]), &req),
			Ok(true)
		);
		assert_eq!(
			evaluate_apply(&Apply::or(vec![Apply::not(owner_check()), always_false()]), &req),
			Ok(false)
		);
	}

	#[test]
	fn unsupported_function_fails_closed() {
		assert_eq!(evaluate_apply(&always_false(), &request("bob", Some("bob"))), Ok(false));
		assert_eq!(
			evaluate_apply(&Apply::not(always_false()), &request("bob", Some("bob"))),
			Ok(true)
		);
	}

	#[test]
	fn condition_without_apply_holds() {
		assert_eq!(
			evaluate_condition(&Condition::default(), &AuthorizationRequest::default()),
			Ok(true)
		);
	}

	#[test]
	fn over_deep_tree_is_an_error() {
		let mut apply = owner_check();
		for _ in 0..MAX_APPLY_DEPTH {
			apply = Apply::not(apply);
		}
		assert_eq!(
			evaluate_apply(&apply, &request("bob", Some("bob"))),
			Err(EvaluationError::ExpressionTooDeep {
				limit: MAX_APPLY_DEPTH
			})
		);
	}

	#[test]
	fn tree_at_depth_limit_evaluates() {
		let mut apply = owner_check();
		for _ in 1..MAX_APPLY_DEPTH {
			apply = Apply::not(apply);
		}
		assert_eq!(apply.depth(), MAX_APPLY_DEPTH);
		// 31 negations of "true" is false.
		assert_eq!(evaluate_apply(&apply, &request("bob", Some("bob"))), Ok(false));
	}
}
