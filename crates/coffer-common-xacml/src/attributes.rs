// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute resolution against a request.

use crate::types::{AttributeDesignator, AuthorizationRequest, Category, ACTION_ATTRIBUTE_ID};

/// Looks up the value a designator refers to.
///
/// Subject and resource designators read the matching map. Action designators
/// only resolve the `action` attribute id. Environment and unknown categories
/// never resolve.
pub fn resolve_attribute<'a>(
	designator: &AttributeDesignator,
	request: &'a AuthorizationRequest,
) -> Option<&'a str> {
	match designator.category {
		Category::Subject => request
			.subject
			.get(&designator.attribute_id)
			.map(String::as_str),
		Category::Resource => request
			.resource
			.get(&designator.attribute_id)
			.map(String::as_str),
		Category::Action if designator.attribute_id == ACTION_ATTRIBUTE_ID => {
			Some(request.action.as_str())
		}
		Category::Action | Category::Environment | Category::Other(_) => None,
	}
}
