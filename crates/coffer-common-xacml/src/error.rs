// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for policy loading and evaluation.

use std::path::PathBuf;

/// Errors raised while loading a policy document. All of them are fatal at
/// startup: the service must not run without policies.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
	/// The policy file does not exist.
	#[error("Policy file not found: {}", path.display())]
	NotFound { path: PathBuf },

	/// The policy file exists but could not be read.
	#[error("Failed to read policy file {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The document is not well-formed XML.
	#[error("Malformed policy XML: {0}")]
	Xml(#[from] roxmltree::Error),

	/// The document is XML but not a valid policy tree.
	#[error("Invalid <{element}>: {message}")]
	Invalid { element: String, message: String },
}

impl PolicyError {
	pub fn invalid(element: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Invalid {
			element: element.into(),
			message: message.into(),
		}
	}
}

/// Errors raised while evaluating a request. Surfaced as `Indeterminate`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
	/// An Apply tree nests deeper than the evaluator allows.
	#[error("function application nested deeper than {limit} levels")]
	ExpressionTooDeep { limit: usize },
}
