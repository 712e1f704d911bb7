// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authenticated caller, as handed over by the authentication layer.

use axum::{
	extract::FromRequestParts,
	http::{request::Parts, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// The authenticated user making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
	pub username: String,
	pub role: String,
}

impl Caller {
	pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			role: role.into(),
		}
	}
}

/// Authentication state attached to each request as an extension.
///
/// Populated by whatever authenticates the request (token validation,
/// directory lookup). A request without this extension is treated as
/// unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
	pub caller: Option<Caller>,
}

impl AuthContext {
	pub fn unauthenticated() -> Self {
		Self { caller: None }
	}

	pub fn authenticated(caller: Caller) -> Self {
		Self {
			caller: Some(caller),
		}
	}

	pub fn caller(&self) -> Option<&Caller> {
		self.caller.as_ref()
	}
}

/// JSON error body shared by 401 and 403 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

pub(crate) fn unauthorized_response() -> Response {
	(
		StatusCode::UNAUTHORIZED,
		Json(ErrorResponse {
			error: "unauthorized".to_string(),
			message: "Authentication required".to_string(),
		}),
	)
		.into_response()
}

/// Extractor that requires an authenticated caller.
///
/// Returns 401 Unauthorized if the request carries no caller.
///
/// # Example
///
/// ```ignore
/// async fn list_files(RequireCaller(caller): RequireCaller) -> impl IntoResponse {
///     format!("files of {}", caller.username)
/// }
/// ```
pub struct RequireCaller(pub Caller);

impl<S> FromRequestParts<S> for RequireCaller
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireCaller::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let caller = parts
			.extensions
			.get::<AuthContext>()
			.and_then(|ctx| ctx.caller.clone());

		match caller {
			Some(caller) => {
				tracing::debug!(username = %caller.username, "caller present");
				Ok(RequireCaller(caller))
			}
			None => {
				tracing::debug!("no authenticated caller");
				Err(unauthorized_response())
			}
		}
	}
}
