// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route layer that enforces an XACML decision before a handler runs.

use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::Arc,
	task::{Context, Poll},
};

use axum::{
	body::Body,
	extract::{FromRequestParts, Query, RawPathParams},
	http::{request::Parts, Request, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use coffer_common_xacml::PolicyDecisionPoint;
use futures::future::BoxFuture;
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::caller::{unauthorized_response, AuthContext, Caller, ErrorResponse};

/// Message returned in the 403 body when the policy does not permit a request.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied by authorization policy";

/// Query parameter consulted for the resource owner when no explicit owner
/// parameter is present.
pub const DEFAULT_OWNER_OVERRIDE_QUERY: &str = "user";

/// Route layer that asks the policy decision point whether the caller may
/// perform `action`, and only then calls the handler.
///
/// # Security
///
/// - Rejects unauthenticated requests with 401
/// - Rejects anything other than an explicit Permit with 403
/// - The wrapped handler never runs on a rejected request
///
/// # Example
///
/// ```ignore
/// Router::new()
///     .route("/files/{owner}/{name}", delete(delete_file))
///     .route_layer(Enforce::new(pdp.clone(), "delete").resource_owner_param("owner"))
/// ```
#[derive(Clone)]
pub struct Enforce {
	pdp: PolicyDecisionPoint,
	requirement: Requirement,
}

#[derive(Debug, Clone)]
struct Requirement {
	action: String,
	resource_owner_param: Option<String>,
	target_role_param: Option<String>,
	owner_override_query: String,
}

impl Enforce {
	pub fn new(pdp: PolicyDecisionPoint, action: impl Into<String>) -> Self {
		Self {
			pdp,
			requirement: Requirement {
				action: action.into(),
				resource_owner_param: None,
				target_role_param: None,
				owner_override_query: DEFAULT_OWNER_OVERRIDE_QUERY.to_string(),
			},
		}
	}

	/// Path parameter (or query parameter of the same name) naming the owner
	/// of the resource being acted on.
	pub fn resource_owner_param(mut self, name: impl Into<String>) -> Self {
		self.requirement.resource_owner_param = Some(name.into());
		self
	}

	/// Path parameter (or query parameter of the same name) naming the role
	/// of the user being administered.
	pub fn target_role_param(mut self, name: impl Into<String>) -> Self {
		self.requirement.target_role_param = Some(name.into());
		self
	}

	/// Query parameter used as the resource owner when no owner parameter is
	/// present. Defaults to `user`.
	pub fn owner_override_query(mut self, key: impl Into<String>) -> Self {
		self.requirement.owner_override_query = key.into();
		self
	}
}

impl<S> Layer<S> for Enforce {
	type Service = EnforceService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		EnforceService {
			inner,
			pdp: self.pdp.clone(),
			requirement: Arc::new(self.requirement.clone()),
		}
	}
}

/// Service wrapper for [`Enforce`] layer.
#[derive(Clone)]
pub struct EnforceService<S> {
	inner: S,
	pdp: PolicyDecisionPoint,
	requirement: Arc<Requirement>,
}

impl<S> Service<Request<Body>> for EnforceService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send,
{
	type Response = Response;
	type Error = S::Error;
	type Future = EnforceFuture<S::Error>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let caller = req
			.extensions()
			.get::<AuthContext>()
			.and_then(|ctx| ctx.caller.clone());

		let Some(caller) = caller else {
			tracing::debug!(
				action = %self.requirement.action,
				"XACML denied: not authenticated"
			);
			return EnforceFuture::Rejected {
				resp: Some(unauthorized_response()),
			};
		};

		// The ready service goes into the future; a fresh clone stays behind.
		let clone = self.inner.clone();
		let mut inner = std::mem::replace(&mut self.inner, clone);
		let pdp = self.pdp.clone();
		let requirement = Arc::clone(&self.requirement);

		EnforceFuture::Checking {
			fut: Box::pin(async move {
				let (mut parts, body) = req.into_parts();
				let attrs = RequestAttrs::extract(&mut parts).await;
				let resource_owner = requirement.resource_owner(&attrs, &caller);
				let target_role = requirement.target_role(&attrs);

				let permitted = pdp.check_authorization(
					&caller.username,
					&caller.role,
					&requirement.action,
					Some(resource_owner),
					target_role,
				);

				if !permitted {
					tracing::warn!(
						username = %caller.username,
						role = %caller.role,
						action = %requirement.action,
						resource_owner,
						target_role = target_role.unwrap_or_default(),
						"XACML denied: policy did not permit request"
					);
					return Ok(forbidden_response());
				}

				tracing::debug!(
					username = %caller.username,
					action = %requirement.action,
					resource_owner,
					"XACML allowed"
				);

				inner.call(Request::from_parts(parts, body)).await
			}),
		}
	}
}

pin_project! {
	/// Future for [`EnforceService`].
	#[project = EnforceFutureProj]
	pub enum EnforceFuture<E> {
		Checking { #[pin] fut: BoxFuture<'static, Result<Response, E>> },
		Rejected { resp: Option<Response> },
	}
}

impl<E> Future for EnforceFuture<E> {
	type Output = Result<Response, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match self.project() {
			EnforceFutureProj::Checking { fut } => fut.poll(cx),
			EnforceFutureProj::Rejected { resp } => {
				Poll::Ready(Ok(resp.take().expect("polled after completion")))
			}
		}
	}
}

/// Path and query parameters of a routed request.
#[derive(Debug, Default)]
struct RequestAttrs {
	path: Vec<(String, String)>,
	query: HashMap<String, String>,
}

impl RequestAttrs {
	async fn extract(parts: &mut Parts) -> Self {
		// Routes without path parameters reject the extractor; that just means
		// there is nothing to read.
		let path = match RawPathParams::from_request_parts(parts, &()).await {
			Ok(params) => params
				.iter()
				.map(|(k, v)| (k.to_string(), v.to_string()))
				.collect(),
			Err(_) => Vec::new(),
		};

		let query = match Query::<HashMap<String, String>>::try_from_uri(&parts.uri) {
			Ok(Query(query)) => query,
			Err(e) => {
				tracing::debug!(error = %e, "ignoring unparseable query string");
				HashMap::new()
			}
		};

		Self { path, query }
	}

	fn path_or_query(&self, name: &str) -> Option<&str> {
		self.path
			.iter()
			.find(|(k, _)| k == name)
			.map(|(_, v)| v.as_str())
			.filter(|v| !v.is_empty())
			.or_else(|| self.query(name))
	}

	fn query(&self, name: &str) -> Option<&str> {
		self.query
			.get(name)
			.map(String::as_str)
			.filter(|v| !v.is_empty())
	}
}

impl Requirement {
	fn resource_owner<'a>(&self, attrs: &'a RequestAttrs, caller: &'a Caller) -> &'a str {
		self.resource_owner_param
			.as_deref()
			.and_then(|name| attrs.path_or_query(name))
			.or_else(|| attrs.query(&self.owner_override_query))
			.unwrap_or(&caller.username)
	}

	fn target_role<'a>(&self, attrs: &'a RequestAttrs) -> Option<&'a str> {
		self.target_role_param
			.as_deref()
			.and_then(|name| attrs.path_or_query(name))
	}
}

pub(crate) fn forbidden_response() -> Response {
	(
		StatusCode::FORBIDDEN,
		Json(ErrorResponse {
			error: "forbidden".to_string(),
			message: ACCESS_DENIED_MESSAGE.to_string(),
		}),
	)
		.into_response()
}
