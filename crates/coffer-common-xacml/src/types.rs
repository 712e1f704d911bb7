// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Type definitions for XACML policy evaluation.
//!
//! This module defines the typed policy tree and the request/response pair:
//!
//! - [`PolicyDocument`] → [`Policy`] → [`Rule`]: the loaded policy tree
//! - [`Target`] / [`Match`]: applicability predicates
//! - [`Condition`] / [`Apply`]: boolean guards evaluated after a target matched
//! - [`AuthorizationRequest`] / [`AuthorizationResponse`]: the evaluation contract
//!
//! # Design Principles
//!
//! 1. **Parsed once**: function ids and attribute categories are resolved to
//!    enums at load time; evaluation never inspects raw strings for dispatch
//! 2. **Owned trees**: every node owns its children, nothing is shared
//! 3. **Immutable evaluation**: requests carry all attributes up front

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute id used for the action attribute inside the action category.
pub const ACTION_ATTRIBUTE_ID: &str = "action";

/// Subject attribute holding the authenticated username.
pub const SUBJECT_USERNAME: &str = "username";

/// Subject attribute holding the authenticated role.
pub const SUBJECT_ROLE: &str = "role";

/// Resource attribute naming the user who owns the resource.
pub const RESOURCE_OWNER: &str = "resource-owner";

/// Resource attribute holding the role of the user an operation targets.
pub const TARGET_ROLE: &str = "target-role";

/// Root of a loaded policy file: every policy in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
	pub policies: Vec<Policy>,
}

impl PolicyDocument {
	pub fn new(policies: Vec<Policy>) -> Self {
		Self { policies }
	}

	/// Total number of rules across all policies.
	pub fn rule_count(&self) -> usize {
		self.policies.iter().map(|p| p.rules.len()).sum()
	}
}

/// One independently applicable authorization unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
	pub id: String,
	pub target: Option<Target>,
	pub rules: Vec<Rule>,
}

impl Policy {
	/// Creates a policy with no target (applicable to every request).
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			target: None,
			rules: Vec::new(),
		}
	}

	/// Builder: set the policy target.
	pub fn with_target(mut self, target: Target) -> Self {
		self.target = Some(target);
		self
	}

	/// Builder: append a rule.
	pub fn with_rule(mut self, rule: Rule) -> Self {
		self.rules.push(rule);
		self
	}
}

/// The effect a rule produces when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
	Permit,
	Deny,
}

impl Effect {
	/// Parses the XACML `Effect` attribute. Only the exact spellings are accepted.
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"Permit" => Some(Self::Permit),
			"Deny" => Some(Self::Deny),
			_ => None,
		}
	}
}

impl From<Effect> for Decision {
	fn from(effect: Effect) -> Self {
		match effect {
			Effect::Permit => Decision::Permit,
			Effect::Deny => Decision::Deny,
		}
	}
}

/// The atomic decision-producing unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
	pub id: String,
	pub effect: Effect,
	pub target: Option<Target>,
	pub condition: Option<Condition>,
}

impl Rule {
	pub fn new(id: impl Into<String>, effect: Effect) -> Self {
		Self {
			id: id.into(),
			effect,
			target: None,
			condition: None,
		}
	}

	pub fn permit(id: impl Into<String>) -> Self {
		Self::new(id, Effect::Permit)
	}

	pub fn deny(id: impl Into<String>) -> Self {
		Self::new(id, Effect::Deny)
	}

	/// Builder: set the rule target.
	pub fn with_target(mut self, target: Target) -> Self {
		self.target = Some(target);
		self
	}

	/// Builder: set the rule condition from its root function application.
	pub fn with_condition(mut self, apply: Apply) -> Self {
		self.condition = Some(Condition { apply: Some(apply) });
		self
	}
}

/// Applicability predicate: a disjunction of [`AnyOf`] groups.
///
/// An empty target matches every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
	pub any_of: Vec<AnyOf>,
}

impl Target {
	/// A target with no `AnyOf` children, matching every request.
	pub fn any() -> Self {
		Self::default()
	}

	/// A target with a single `AnyOf` holding a single `AllOf`.
	pub fn all_of(matches: Vec<Match>) -> Self {
		Self {
			any_of: vec![AnyOf {
				all_of: vec![AllOf { matches }],
			}],
		}
	}

	pub fn is_empty(&self) -> bool {
		self.any_of.is_empty()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnyOf {
	pub all_of: Vec<AllOf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllOf {
	pub matches: Vec<Match>,
}

/// Equality test between a request attribute and a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
	pub designator: AttributeDesignator,
	pub value: String,
}

impl Match {
	pub fn new(designator: AttributeDesignator, value: impl Into<String>) -> Self {
		Self {
			designator,
			value: value.into(),
		}
	}

	/// Shorthand for `subject.<attribute_id> == value`.
	pub fn subject(attribute_id: impl Into<String>, value: impl Into<String>) -> Self {
		Self::new(AttributeDesignator::subject(attribute_id), value)
	}

	/// Shorthand for `resource.<attribute_id> == value`.
	pub fn resource(attribute_id: impl Into<String>, value: impl Into<String>) -> Self {
		Self::new(AttributeDesignator::resource(attribute_id), value)
	}

	/// Shorthand for `action == value`.
	pub fn action(value: impl Into<String>) -> Self {
		Self::new(AttributeDesignator::action(), value)
	}
}

/// Attribute category, resolved from the category URI at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
	Subject,
	Resource,
	Action,
	Environment,
	Other(String),
}

impl Category {
	pub const SUBJECT_URI: &'static str =
		"urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
	pub const RESOURCE_URI: &'static str =
		"urn:oasis:names:tc:xacml:3.0:attribute-category:resource";
	pub const ACTION_URI: &'static str = "urn:oasis:names:tc:xacml:3.0:attribute-category:action";
	pub const ENVIRONMENT_URI: &'static str =
		"urn:oasis:names:tc:xacml:3.0:attribute-category:environment";

	/// Classifies a category URI by case-insensitive substring.
	///
	/// `subject` wins over `resource`, which wins over `action`.
	pub fn from_uri(uri: &str) -> Self {
		let lower = uri.to_ascii_lowercase();
		if lower.contains("subject") {
			Self::Subject
		} else if lower.contains("resource") {
			Self::Resource
		} else if lower.contains("action") {
			Self::Action
		} else if lower.contains("environment") {
			Self::Environment
		} else {
			Self::Other(uri.to_string())
		}
	}
}

impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Subject => f.write_str("subject"),
			Self::Resource => f.write_str("resource"),
			Self::Action => f.write_str("action"),
			Self::Environment => f.write_str("environment"),
			Self::Other(uri) => f.write_str(uri),
		}
	}
}

/// Reference to a named attribute within a category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeDesignator {
	pub category: Category,
	pub attribute_id: String,
}

impl AttributeDesignator {
	pub fn new(category: Category, attribute_id: impl Into<String>) -> Self {
		Self {
			category,
			attribute_id: attribute_id.into(),
		}
	}

	pub fn subject(attribute_id: impl Into<String>) -> Self {
		Self::new(Category::Subject, attribute_id)
	}

	pub fn resource(attribute_id: impl Into<String>) -> Self {
		Self::new(Category::Resource, attribute_id)
	}

	pub fn action() -> Self {
		Self::new(Category::Action, ACTION_ATTRIBUTE_ID)
	}
}

impl fmt::Display for AttributeDesignator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.category, self.attribute_id)
	}
}

/// Optional boolean guard on a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
	/// Root function application. `None` means the condition always holds.
	pub apply: Option<Apply>,
}

/// Boolean function supported by the condition evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Function {
	StringEqual,
	Not,
	Or,
	/// Any other function id; always evaluates to false.
	Unsupported(String),
}

impl Function {
	pub const STRING_EQUAL_ID: &'static str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";
	pub const NOT_ID: &'static str = "urn:oasis:names:tc:xacml:1.0:function:not";
	pub const OR_ID: &'static str = "urn:oasis:names:tc:xacml:1.0:function:or";

	/// Resolves a `FunctionId` by substring, in the order string-equal, not, or.
	pub fn from_id(id: &str) -> Self {
		if id.contains("string-equal") {
			Self::StringEqual
		} else if id.contains("function:not") {
			Self::Not
		} else if id.contains("function:or") {
			Self::Or
		} else {
			Self::Unsupported(id.to_string())
		}
	}

	pub fn is_supported(&self) -> bool {
		!matches!(self, Self::Unsupported(_))
	}
}

/// Function application node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apply {
	pub function: Function,
	pub arguments: Vec<Expression>,
}

impl Apply {
	pub fn new(function: Function, arguments: Vec<Expression>) -> Self {
		Self {
			function,
			arguments,
		}
	}

	/// `string-equal(a, b)` over two attribute designators.
	pub fn string_equal(a: AttributeDesignator, b: AttributeDesignator) -> Self {
		Self::new(
			Function::StringEqual,
			vec![Expression::Designator(a), Expression::Designator(b)],
		)
	}

	/// `not(inner)`.
	pub fn not(inner: Apply) -> Self {
		Self::new(Function::Not, vec![Expression::Apply(inner)])
	}

	/// `or(branches...)`.
	pub fn or(branches: Vec<Apply>) -> Self {
		Self::new(
			Function::Or,
			branches.into_iter().map(Expression::Apply).collect(),
		)
	}

	/// Nested function applications among the arguments, in document order.
	pub fn nested(&self) -> impl Iterator<Item = &Apply> {
		self.arguments.iter().filter_map(|arg| match arg {
			Expression::Apply(apply) => Some(apply),
			Expression::Designator(_) => None,
		})
	}

	/// Depth of this application tree; a leaf application has depth 1.
	pub fn depth(&self) -> usize {
		1 + self.nested().map(Apply::depth).max().unwrap_or(0)
	}
}

/// Argument of a function application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
	Apply(Apply),
	Designator(AttributeDesignator),
}

/// An authorization question: who wants to do what to which resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
	pub subject: HashMap<String, String>,
	pub resource: HashMap<String, String>,
	pub action: String,
	/// Carried for completeness; never consulted by attribute resolution.
	pub environment: HashMap<String, String>,
}

impl AuthorizationRequest {
	pub fn new(action: impl Into<String>) -> Self {
		Self {
			action: action.into(),
			..Default::default()
		}
	}

	/// Builder: set a subject attribute.
	pub fn with_subject(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.subject.insert(key.into(), value.into());
		self
	}

	/// Builder: set a resource attribute.
	pub fn with_resource(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.resource.insert(key.into(), value.into());
		self
	}

	/// Builder: set an environment attribute.
	pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.environment.insert(key.into(), value.into());
		self
	}

	/// Builds the standard file-service request.
	///
	/// `resource-owner` and `target-role` are only included when present and
	/// non-empty.
	pub fn for_user(
		username: &str,
		role: &str,
		action: &str,
		resource_owner: Option<&str>,
		target_role: Option<&str>,
	) -> Self {
		let mut request = Self::new(action)
			.with_subject(SUBJECT_USERNAME, username)
			.with_subject(SUBJECT_ROLE, role);
		if let Some(owner) = resource_owner.filter(|s| !s.is_empty()) {
			request = request.with_resource(RESOURCE_OWNER, owner);
		}
		if let Some(role) = target_role.filter(|s| !s.is_empty()) {
			request = request.with_resource(TARGET_ROLE, role);
		}
		request
	}
}

/// Outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
	Permit,
	Deny,
	NotApplicable,
	Indeterminate,
}

impl Decision {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Permit => "Permit",
			Self::Deny => "Deny",
			Self::NotApplicable => "NotApplicable",
			Self::Indeterminate => "Indeterminate",
		}
	}
}

impl fmt::Display for Decision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Attribute assignment carried by an obligation or advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeAssignment {
	pub attribute_id: String,
	pub value: String,
}

/// Instruction the PEP must fulfil alongside a decision. Never produced by
/// the current policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
	pub id: String,
	#[serde(default)]
	pub assignments: Vec<AttributeAssignment>,
}

/// Optional hint the PEP may act on. Never produced by the current policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
	pub id: String,
	#[serde(default)]
	pub assignments: Vec<AttributeAssignment>,
}

/// Result of [`crate::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
	pub decision: Decision,
	pub status: String,
	pub obligations: Vec<Obligation>,
	pub advice: Vec<Advice>,
}

impl AuthorizationResponse {
	pub const STATUS_OK: &'static str = "OK";

	pub fn new(decision: Decision, status: impl Into<String>) -> Self {
		Self {
			decision,
			status: status.into(),
			obligations: Vec::new(),
			advice: Vec::new(),
		}
	}

	/// A response with status `OK`.
	pub fn ok(decision: Decision) -> Self {
		Self::new(decision, Self::STATUS_OK)
	}

	/// Only an explicit `Permit` authorizes.
	pub fn is_permitted(&self) -> bool {
		self.decision == Decision::Permit
	}
}
