// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decisions made against the bundled `policies/policies.xml`.
//!
//! Tests cover:
//! - Users acting on their own files versus someone else's
//! - Moderator read access
//! - Admin access, including the deny on administering other admins
//! - Unknown roles and actions

use std::path::PathBuf;

use coffer_common_xacml::{AuthorizationRequest, Decision, PolicyDecisionPoint};

fn bundled_policy_path() -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../policies/policies.xml")
}

fn pdp() -> PolicyDecisionPoint {
	PolicyDecisionPoint::from_file(bundled_policy_path()).unwrap()
}

const OWN_FILE_ACTIONS: &[&str] = &[
	"upload",
	"list",
	"download",
	"delete",
	"mkdir",
	"bin",
	"cleanup-bin",
];

#[test]
fn loads_all_three_policies() {
	let pdp = pdp();
	assert_eq!(pdp.policy_count(), 3);
	assert_eq!(pdp.rule_count(), 4);
	assert!(pdp.source().is_some());
}

#[test]
fn users_manage_their_own_files() {
	let pdp = pdp();
	for action in OWN_FILE_ACTIONS {
		assert!(
			pdp.check_authorization("alice", "user", action, Some("alice"), None),
			"alice should be allowed to {action} her own files"
		);
	}
}

#[test]
fn users_cannot_touch_other_users_files() {
	let pdp = pdp();
	for action in OWN_FILE_ACTIONS {
		assert!(
			!pdp.check_authorization("alice", "user", action, Some("bob"), None),
			"alice should not be allowed to {action} bob's files"
		);
	}
}

#[test]
fn user_request_without_owner_is_not_applicable() {
	let request = AuthorizationRequest::for_user("alice", "user", "delete", None, None);
	let response = pdp().evaluate(&request);
	assert_eq!(response.decision, Decision::NotApplicable);
	assert_eq!(response.status, "OK");
}

#[test]
fn users_cannot_list_users() {
	assert!(!pdp().check_authorization("alice", "user", "list-users", Some("alice"), None));
}

#[test]
fn moderators_read_everything_but_write_nothing() {
	let pdp = pdp();
	for action in ["list", "download", "list-users"] {
		assert!(pdp.check_authorization("mod", "moderator", action, Some("bob"), None));
	}
	for action in ["upload", "delete", "mkdir", "bin", "cleanup-bin", "update-quota"] {
		assert!(!pdp.check_authorization("mod", "moderator", action, Some("bob"), None));
	}
}

#[test]
fn admins_may_do_anything_to_regular_users() {
	let pdp = pdp();
	for action in ["delete", "update-quota", "delete-user", "list-users", "anything"] {
		assert!(pdp.check_authorization("root", "admin", action, Some("bob"), Some("user")));
	}
}

#[test]
fn admins_cannot_administer_other_admins() {
	let pdp = pdp();
	let request = AuthorizationRequest::for_user(
		"root",
		"admin",
		"delete-user",
		Some("other"),
		Some("admin"),
	);
	assert_eq!(pdp.evaluate(&request).decision, Decision::Deny);
	assert!(!pdp.check_authorization(
		"root",
		"admin",
		"update-quota",
		Some("other"),
		Some("admin")
	));
}

#[test]
fn admins_can_administer_themselves() {
	let pdp = pdp();
	assert!(pdp.check_authorization("root", "admin", "update-quota", Some("root"), Some("admin")));
	assert!(pdp.check_authorization("root", "admin", "delete-user", Some("root"), Some("admin")));
}

#[test]
fn unknown_role_is_never_permitted() {
	let pdp = pdp();
	let request = AuthorizationRequest::for_user("eve", "guest", "list", Some("eve"), None);
	assert_eq!(pdp.evaluate(&request).decision, Decision::NotApplicable);
	assert!(!pdp.check_authorization("eve", "", "list", Some("eve"), None));
}

#[test]
fn role_matching_is_case_sensitive() {
	assert!(!pdp().check_authorization("root", "Admin", "list", Some("root"), None));
}
