//! Uniform outbound request handling.
//!
//! Every call carries the current access token as a bearer. A 401 triggers
//! one refresh through the shared [`SessionContext`] and one replay; a second
//! 401, or a 401 from a credential exchange, is returned to the caller.

use std::sync::Arc;

use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::SessionError,
    refresh::REFRESH_PATH,
    session::SessionContext,
    types::ApiErrorBody,
};

const REQUEST_ID_HEADER: &str = "x-request-id";
const CREDENTIAL_EXCHANGE_PATHS: [&str; 3] = ["/auth/login", "/auth/register", REFRESH_PATH];

pub(crate) fn build_http_client(config: &SessionConfig) -> Result<Client, SessionError> {
    Ok(Client::builder().timeout(config.request_timeout).build()?)
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, SessionError> {
        let value = serde_json::to_value(body)
            .map_err(|e| SessionError::InvalidResponse(format!("Failed to encode body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Login, register and refresh exchange credentials themselves; a 401 from
    /// them is final.
    pub fn is_credential_exchange(&self) -> bool {
        let path = self.path.split('?').next().unwrap_or_default();
        CREDENTIAL_EXCHANGE_PATHS
            .iter()
            .any(|p| path.trim_end_matches('/') == *p)
    }
}

/// One try at sending an [`ApiRequest`]. The retry flag lives here, per
/// request, so concurrent calls never share it.
#[derive(Debug, Clone, Copy)]
struct RequestAttempt<'a> {
    request: &'a ApiRequest,
    retried: bool,
}

impl<'a> RequestAttempt<'a> {
    fn first(request: &'a ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    fn replay(self) -> Self {
        Self {
            request: self.request,
            retried: true,
        }
    }

    fn may_refresh(&self) -> bool {
        !self.retried && !self.request.is_credential_exchange()
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        let body: &[u8] = if self.body.iter().all(|b| b.is_ascii_whitespace()) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body)
            .map_err(|e| SessionError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiClient {
    pub fn new(config: &SessionConfig, session: Arc<SessionContext>) -> Result<Self, SessionError> {
        Ok(Self::with_client(
            build_http_client(config)?,
            &config.api_base_url,
            session,
        ))
    }

    pub fn with_client(http: Client, base_url: &str, session: Arc<SessionContext>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        let mut attempt = RequestAttempt::first(request);
        loop {
            let sent_token = self.session.store().get_access_token();
            let response = self.dispatch(attempt, sent_token.as_deref()).await?;

            if response.status != StatusCode::UNAUTHORIZED {
                return into_result(response);
            }

            let detail = ApiErrorBody::from_slice(&response.body).into_message("Not authenticated");
            if !attempt.may_refresh() {
                let sign_in_required = attempt.retried;
                if sign_in_required {
                    tracing::warn!(path = %request.path, "authorization failed again after refresh");
                    // a session replaced since this attempt was sent is left alone
                    if self.session.store().get_access_token() == sent_token {
                        self.session.end();
                    }
                }
                return Err(SessionError::Unauthorized {
                    detail,
                    sign_in_required,
                });
            }

            tracing::debug!(path = %request.path, "authorization failed; refreshing session");
            match self.session.renew(sent_token.as_deref()).await {
                Ok(_) => attempt = attempt.replay(),
                Err(err) => {
                    // renew clears the session itself when its refresh token was the current one
                    tracing::warn!(path = %request.path, error = %err, "session could not be renewed");
                    return Err(SessionError::Unauthorized {
                        detail,
                        sign_in_required: true,
                    });
                }
            }
        }
    }

    async fn dispatch(
        &self,
        attempt: RequestAttempt<'_>,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, SessionError> {
        let request = attempt.request;
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            retried = attempt.retried,
            "api request completed"
        );
        Ok(ApiResponse { status, body })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        self.execute(&ApiRequest::get(path)).await?.json()
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, SessionError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(&ApiRequest::post(path).json(body)?)
            .await?
            .json()
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, SessionError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(&ApiRequest::new(Method::PUT, path).json(body)?)
            .await?
            .json()
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, SessionError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(&ApiRequest::new(Method::PATCH, path).json(body)?)
            .await?
            .json()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        self.execute(&ApiRequest::new(Method::DELETE, path))
            .await?
            .json()
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse, SessionError> {
    if response.status.is_success() {
        return Ok(response);
    }
    let message = ApiErrorBody::from_slice(&response.body).into_message("Request failed");
    Err(SessionError::Api {
        status: response.status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_exchanges_are_recognised_by_path() {
        assert!(ApiRequest::post("/auth/login").is_credential_exchange());
        assert!(ApiRequest::post("auth/register").is_credential_exchange());
        assert!(ApiRequest::post("/auth/refresh/").is_credential_exchange());
        assert!(!ApiRequest::post("/auth/logout").is_credential_exchange());
        assert!(!ApiRequest::get("/auth/me").is_credential_exchange());
        assert!(!ApiRequest::get("/jobs").is_credential_exchange());
    }

    #[test]
    fn attempts_refresh_at_most_once() {
        let request = ApiRequest::get("/applications/me");
        let first = RequestAttempt::first(&request);
        assert!(first.may_refresh());
        let replay = first.replay();
        assert!(replay.retried);
        assert!(!replay.may_refresh());

        let login = ApiRequest::post("/auth/login");
        assert!(!RequestAttempt::first(&login).may_refresh());
    }

    #[test]
    fn empty_body_decodes_as_unit_or_null() {
        let response = ApiResponse {
            status: StatusCode::NO_CONTENT,
            body: Vec::new(),
        };
        response.json::<()>().expect("unit");
        assert_eq!(response.json::<Value>().expect("null"), Value::Null);
    }

    #[test]
    fn non_auth_failures_carry_backend_detail() {
        let err = into_result(ApiResponse {
            status: StatusCode::CONFLICT,
            body: br#"{"detail":"Already applied to this job"}"#.to_vec(),
        })
        .expect_err("conflict");
        assert!(matches!(
            err,
            SessionError::Api { status: 409, ref message } if message == "Already applied to this job"
        ));
    }

    #[test]
    fn json_body_is_captured_on_the_request() {
        let request = ApiRequest::post("/applications")
            .query("draft", "false")
            .json(&serde_json::json!({ "jobId": 4 }))
            .expect("encode");
        assert_eq!(request.query, vec![("draft".to_string(), "false".to_string())]);
        assert_eq!(request.body, Some(serde_json::json!({ "jobId": 4 })));
    }
}
