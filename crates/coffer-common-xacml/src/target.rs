// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Target matching.

use crate::attributes::resolve_attribute;
use crate::types::{AllOf, AuthorizationRequest, Match, Target};

/// Returns true if the target applies to the request.
///
/// An empty target always applies. Otherwise the target applies when at least
/// one `AllOf`, taken from any `AnyOf`, has every match satisfied. `AnyOf`
/// groups are not required to match independently.
pub fn matches_target(target: &Target, request: &AuthorizationRequest) -> bool {
	if target.is_empty() {
		return true;
	}

	target
		.any_of
		.iter()
		.flat_map(|any_of| any_of.all_of.iter())
		.any(|all_of| matches_all_of(all_of, request))
}

fn matches_all_of(all_of: &AllOf, request: &AuthorizationRequest) -> bool {
	all_of.matches.iter().all(|m| matches_one(m, request))
}

/// Exact, case-sensitive equality; an unresolved attribute never matches.
pub fn matches_one(m: &Match, request: &AuthorizationRequest) -> bool {
	resolve_attribute(&m.designator, request) == Some(m.value.as_str())
}
