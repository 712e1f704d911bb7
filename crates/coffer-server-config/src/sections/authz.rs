// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization (XACML policy) configuration section.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Locations tried, in order, when no policy file is configured explicitly.
pub const DEFAULT_POLICY_SEARCH_PATHS: &[&str] = &[
	"/app/xacml/policies.xml",
	"xacml/policies.xml",
	"policies/policies.xml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthzConfigLayer {
	pub policy_file: Option<PathBuf>,
	pub search_paths: Option<Vec<PathBuf>>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.policy_file.is_some() {
			self.policy_file = other.policy_file;
		}
		if other.search_paths.is_some() {
			self.search_paths = other.search_paths;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		AuthzConfig {
			policy_file: self.policy_file,
			search_paths: self.search_paths.unwrap_or_else(default_search_paths),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthzConfig {
	/// Explicit policy file. Takes priority over the search paths.
	pub policy_file: Option<PathBuf>,
	pub search_paths: Vec<PathBuf>,
}

impl Default for AuthzConfig {
	fn default() -> Self {
		Self {
			policy_file: None,
			search_paths: default_search_paths(),
		}
	}
}

impl AuthzConfig {
	/// Picks the policy file to load.
	///
	/// An explicit `policy_file` is returned as-is; a missing file surfaces
	/// later as a policy load error. Otherwise the first search path that
	/// exists wins.
	pub fn resolve_policy_path(&self) -> Result<PathBuf, ConfigError> {
		if let Some(path) = &self.policy_file {
			return Ok(path.clone());
		}

		self.search_paths
			.iter()
			.find(|p| Path::new(p).is_file())
			.cloned()
			.ok_or_else(|| ConfigError::PolicyFileNotFound {
				searched: self.search_paths.clone(),
			})
	}
}

fn default_search_paths() -> Vec<PathBuf> {
	DEFAULT_POLICY_SEARCH_PATHS
		.iter()
		.map(PathBuf::from)
		.collect()
}
