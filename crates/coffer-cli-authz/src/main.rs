// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Coffer authorization policy tool.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coffer_common_xacml::{AuthorizationRequest, PolicyDecisionPoint};
use coffer_server_config::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Validate and query the XACML policies that guard the Coffer file service.
#[derive(Parser, Debug)]
#[command(
	name = "coffer-authz",
	about = "Validate and query Coffer XACML policies",
	version
)]
struct Args {
	/// Server configuration file (defaults to /etc/coffer/server.toml)
	#[arg(long, global = true, env = "COFFER_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Load a policy file and report what it contains
	Validate {
		/// Policy file (defaults to the configured one)
		#[arg(long)]
		policy: Option<PathBuf>,
	},

	/// Evaluate a single request and print the response as JSON
	Check {
		#[arg(long)]
		username: String,
		#[arg(long)]
		role: String,
		#[arg(long)]
		action: String,
		/// Owner of the resource being acted on
		#[arg(long)]
		resource_owner: Option<String>,
		/// Role of the user being administered
		#[arg(long)]
		target_role: Option<String>,
		/// Policy file (defaults to the configured one)
		#[arg(long)]
		policy: Option<PathBuf>,
	},

	/// Print the resolved configuration
	Config,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => coffer_server_config::load_config_with_file(path),
		None => coffer_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	// Logs go to stderr so `check` output stays machine-readable.
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let output = run(args.command, &config)?;
	println!("{output}");
	Ok(())
}

fn run(command: Command, config: &ServerConfig) -> anyhow::Result<String> {
	match command {
		Command::Validate { policy } => {
			let pdp = load_pdp(policy, config)?;
			Ok(describe(&pdp))
		}
		Command::Check {
			username,
			role,
			action,
			resource_owner,
			target_role,
			policy,
		} => {
			let pdp = load_pdp(policy, config)?;
			let request = AuthorizationRequest::for_user(
				&username,
				&role,
				&action,
				resource_owner.as_deref(),
				target_role.as_deref(),
			);
			let response = pdp.evaluate(&request);
			tracing::info!(
				username = %username,
				role = %role,
				action = %action,
				decision = %response.decision,
				"evaluated request"
			);
			Ok(serde_json::to_string_pretty(&response)?)
		}
		Command::Config => Ok(toml::to_string_pretty(config)?),
	}
}

fn load_pdp(policy: Option<PathBuf>, config: &ServerConfig) -> anyhow::Result<PolicyDecisionPoint> {
	let path = match policy {
		Some(path) => path,
		None => config.authz.resolve_policy_path()?,
	};
	PolicyDecisionPoint::from_file(&path)
		.with_context(|| format!("failed to load policies from {}", path.display()))
}

fn describe(pdp: &PolicyDecisionPoint) -> String {
	let mut out = String::new();
	let source = pdp
		.source()
		.map(|p| p.display().to_string())
		.unwrap_or_default();
	let _ = writeln!(
		out,
		"{source}: {} policies, {} rules",
		pdp.policy_count(),
		pdp.rule_count()
	);
	for policy in &pdp.document().policies {
		let _ = writeln!(out, "  {} ({} rules)", policy.id, policy.rules.len());
	}
	out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;
	use coffer_server_config::AuthzConfig;

	fn bundled_policy() -> PathBuf {
		PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../policies/policies.xml")
	}

	#[test]
	fn cli_definition_is_valid() {
		Args::command().debug_assert();
	}

	#[test]
	fn parses_check_arguments() {
		let args = Args::try_parse_from([
			"coffer-authz",
			"check",
			"--username",
			"alice",
			"--role",
			"user",
			"--action",
			"delete",
			"--resource-owner",
			"bob",
		])
		.unwrap();

		match args.command {
			Command::Check {
				username,
				resource_owner,
				target_role,
				policy,
				..
			} => {
				assert_eq!(username, "alice");
				assert_eq!(resource_owner.as_deref(), Some("bob"));
				assert!(target_role.is_none());
				assert!(policy.is_none());
			}
			other => panic!("expected check, got {other:?}"),
		}
	}

	#[test]
	fn check_requires_username_role_and_action() {
		assert!(Args::try_parse_from(["coffer-authz", "check", "--username", "alice"]).is_err());
	}

	#[test]
	fn validate_reports_counts() {
		let output = run(
			Command::Validate {
				policy: Some(bundled_policy()),
			},
			&ServerConfig::default(),
		)
		.unwrap();
		assert!(output.contains("3 policies, 4 rules"));
		assert!(output.contains("admin-policy (2 rules)"));
	}

	#[test]
	fn validate_fails_for_broken_policy() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("policies.xml");
		std::fs::write(&path, "<PolicySet").unwrap();

		let result = run(
			Command::Validate { policy: Some(path) },
			&ServerConfig::default(),
		);
		assert!(result.is_err());
	}

	#[test]
	fn check_prints_response_json() {
		let output = run(
			Command::Check {
				username: "alice".to_string(),
				role: "user".to_string(),
				action: "delete".to_string(),
				resource_owner: Some("bob".to_string()),
				target_role: None,
				policy: Some(bundled_policy()),
			},
			&ServerConfig::default(),
		)
		.unwrap();

		let response: serde_json::Value = serde_json::from_str(&output).unwrap();
		assert_eq!(response["decision"], "NotApplicable");
		assert_eq!(response["status"], "OK");
	}

	#[test]
	fn policy_path_comes_from_config() {
		let config = ServerConfig {
			authz: AuthzConfig {
				policy_file: None,
				search_paths: vec![PathBuf::from("/nonexistent.xml"), bundled_policy()],
			},
			..Default::default()
		};
		let pdp = load_pdp(None, &config).unwrap();
		assert_eq!(pdp.source(), Some(bundled_policy().as_path()));
	}

	#[test]
	fn config_prints_toml() {
		let output = run(Command::Config, &ServerConfig::default()).unwrap();
		assert!(output.contains("[authz]"));
		assert!(output.contains("[logging]"));
		assert!(output.contains("level = \"info\""));
	}
}
