// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading XACML 3.0 policy documents into the typed policy tree.
//!
//! Only elements in the XACML 3.0 core namespace are recognised. Every
//! `<Policy>` anywhere in the document is collected in document order, so
//! policies wrapped in a `<PolicySet>` load the same as top-level ones.
//! Policy set targets and combining algorithm ids are not interpreted: the
//! engine always combines with deny-overrides.

use std::path::Path;

use roxmltree::{Document, Node};

use crate::condition::MAX_APPLY_DEPTH;
use crate::error::PolicyError;
use crate::types::{
	AllOf, AnyOf, Apply, AttributeDesignator, Category, Condition, Effect, Expression, Function,
	Match, Policy, PolicyDocument, Rule, Target,
};

/// XACML 3.0 core schema namespace.
pub const XACML_NAMESPACE: &str = "urn:oasis:names:tc:xacml:3.0:core:schema:wd-17";

/// Loads and parses the policy file at `path`.
pub fn load_policies(path: &Path) -> Result<PolicyDocument, PolicyError> {
	if !path.exists() {
		tracing::error!(path = %path.display(), "Policy file not found");
		return Err(PolicyError::NotFound {
			path: path.to_path_buf(),
		});
	}

	let contents = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
		path: path.to_path_buf(),
		source,
	})?;

	let document = parse_policy_document(&contents).inspect_err(|e| {
		tracing::error!(path = %path.display(), error = %e, "Failed to load XACML policies");
	})?;

	tracing::info!(
		path = %path.display(),
		policies = document.policies.len(),
		rules = document.rule_count(),
		"Loaded XACML policies"
	);

	Ok(document)
}

/// Parses a policy document from XML text.
pub fn parse_policy_document(xml: &str) -> Result<PolicyDocument, PolicyError> {
	let doc = Document::parse(xml)?;

	let policies = doc
		.descendants()
		.filter(|n| is_xacml(n, "Policy"))
		.enumerate()
		.map(|(index, node)| parse_policy(node, index))
		.collect::<Result<Vec<_>, _>>()?;

	if policies.is_empty() {
		tracing::warn!("No policies found in policy document");
	}

	Ok(PolicyDocument::new(policies))
}

fn parse_policy(node: Node<'_, '_>, index: usize) -> Result<Policy, PolicyError> {
	let id = node
		.attribute("PolicyId")
		.map(str::to_string)
		.unwrap_or_else(|| format!("policy-{}", index + 1));

	let target = child(node, "Target").map(parse_target).transpose()?;

	let rules = node
		.descendants()
		.filter(|n| is_xacml(n, "Rule"))
		.enumerate()
		.map(|(index, rule)| parse_rule(rule, index))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(Policy { id, target, rules })
}

fn parse_rule(node: Node<'_, '_>, index: usize) -> Result<Rule, PolicyError> {
	let id = node
		.attribute("RuleId")
		.map(str::to_string)
		.unwrap_or_else(|| format!("rule-{}", index + 1));

	let effect = match node.attribute("Effect") {
		Some(raw) => Effect::parse(raw).ok_or_else(|| {
			invalid_at(
				node,
				format!("rule {id} has Effect {raw:?}; expected \"Permit\" or \"Deny\""),
			)
		})?,
		None => return Err(invalid_at(node, format!("rule {id} is missing the Effect attribute"))),
	};

	let target = child(node, "Target").map(parse_target).transpose()?;

	let condition = child(node, "Condition")
		.map(|condition| -> Result<Condition, PolicyError> {
			let apply = child(condition, "Apply")
				.map(|apply| parse_apply(apply, 1))
				.transpose()?;
			Ok(Condition { apply })
		})
		.transpose()?;

	Ok(Rule {
		id,
		effect,
		target,
		condition,
	})
}

fn parse_target(node: Node<'_, '_>) -> Result<Target, PolicyError> {
	let any_of = children(node, "AnyOf")
		.map(|any_of| {
			let all_of = children(any_of, "AllOf")
				.map(|all_of| {
					let matches = children(all_of, "Match")
						.map(parse_match)
						.collect::<Result<Vec<_>, _>>()?;
					Ok(AllOf { matches })
				})
				.collect::<Result<Vec<_>, PolicyError>>()?;
			Ok(AnyOf { all_of })
		})
		.collect::<Result<Vec<_>, PolicyError>>()?;

	Ok(Target { any_of })
}

fn parse_match(node: Node<'_, '_>) -> Result<Match, PolicyError> {
	let value = child(node, "AttributeValue")
		.ok_or_else(|| invalid_at(node, "missing AttributeValue"))?
		.text()
		.unwrap_or_default()
		.to_string();

	let designator = child(node, "AttributeDesignator")
		.ok_or_else(|| invalid_at(node, "missing AttributeDesignator"))
		.and_then(parse_designator)?;

	Ok(Match { designator, value })
}

fn parse_designator(node: Node<'_, '_>) -> Result<AttributeDesignator, PolicyError> {
	let attribute_id = node
		.attribute("AttributeId")
		.ok_or_else(|| invalid_at(node, "missing AttributeId attribute"))?;
	let category = node
		.attribute("Category")
		.ok_or_else(|| invalid_at(node, "missing Category attribute"))?;

	Ok(AttributeDesignator::new(
		Category::from_uri(category),
		attribute_id,
	))
}

fn parse_apply(node: Node<'_, '_>, depth: usize) -> Result<Apply, PolicyError> {
	if depth > MAX_APPLY_DEPTH {
		return Err(invalid_at(
			node,
			format!("function applications nested deeper than {MAX_APPLY_DEPTH} levels"),
		));
	}

	let function_id = node
		.attribute("FunctionId")
		.ok_or_else(|| invalid_at(node, "missing FunctionId attribute"))?;
	let function = Function::from_id(function_id);
	if !function.is_supported() {
		tracing::warn!(
			function_id,
			line = line_of(node),
			"Unsupported XACML function; it will always evaluate to false"
		);
	}

	let mut arguments = Vec::new();
	for arg in node.children().filter(Node::is_element) {
		if is_xacml(&arg, "Apply") {
			arguments.push(Expression::Apply(parse_apply(arg, depth + 1)?));
		} else if is_xacml(&arg, "AttributeDesignator") {
			arguments.push(Expression::Designator(parse_designator(arg)?));
		}
	}

	Ok(Apply {
		function,
		arguments,
	})
}

fn is_xacml(node: &Node<'_, '_>, name: &str) -> bool {
	node.is_element()
		&& node.tag_name().name() == name
		&& node.tag_name().namespace() == Some(XACML_NAMESPACE)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
	node.children().find(|n| is_xacml(n, name))
}

fn children<'a, 'input: 'a>(
	node: Node<'a, 'input>,
	name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
	node.children().filter(move |n| is_xacml(n, name))
}

fn line_of(node: Node<'_, '_>) -> u32 {
	node.document().text_pos_at(node.range().start).row
}

fn invalid_at(node: Node<'_, '_>, message: impl Into<String>) -> PolicyError {
	PolicyError::invalid(
		node.tag_name().name(),
		format!("{} (line {})", message.into(), line_of(node)),
	)
}
