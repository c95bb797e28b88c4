//! HttpResourceGateway - REST implementation of the Resource Gateway.
//!
//! Talks JSON to the IdeaHub server under a versioned API base such as
//! `http://localhost:8000/api/v1`. Every failure is classified here and
//! nowhere else.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use ideahub_core::campaign::{Campaign, CampaignId};
use ideahub_core::config::ClientConfig;
use ideahub_core::error::{FieldErrors, GatewayError, GatewayResult, HubError, NON_FIELD_ERRORS};
use ideahub_core::gateway::ResourceGateway;
use ideahub_core::idea::{Contributor, DocumentRef, Idea, IdeaDraft, IdeaId};
use ideahub_core::pagination::{ListBody, ListFilter, Page};
use ideahub_core::session::{Credentials, TokenPair};
use ideahub_core::user::{PasswordChange, Registration, UserId, UserIdentity};

/// Resource Gateway backed by `reqwest`.
#[derive(Clone)]
pub struct HttpResourceGateway {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddContributorRequest {
    user_id: UserId,
}

impl HttpResourceGateway {
    /// Creates a gateway for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HubError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HubError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Creates a gateway around an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, HubError> {
        config.validate()?;
        Self::new(config.base_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authorized(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(token)
    }

    /// Sends `request` and decodes a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<T> {
        let response = self.send(operation, request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(operation, &e))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(operation, error = %e, "undecodable response body");
            GatewayError::unknown(
                Some(status.as_u16()),
                format!("Failed to decode {} response: {}", operation, e),
            )
        })
    }

    /// Sends `request`, ignoring any success body.
    async fn send_empty(&self, operation: &'static str, request: RequestBuilder) -> GatewayResult<()> {
        self.send(operation, request).await.map(|_| ())
    }

    /// Sends `request` and decodes the body when it holds a `T`.
    ///
    /// An empty body or an acknowledgement such as `{}` yields `None`.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<Option<T>> {
        let response = self.send(operation, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(operation, &e))?;

        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(operation, error = %e, "response carries no entity");
                Ok(None)
            }
        }
    }

    async fn send_list<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        page: u32,
    ) -> GatewayResult<Page<T>> {
        let body: ListBody<T> = self.send_json(operation, request).await?;
        Ok(body.into_page(page))
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(operation, &e))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(operation, status = status.as_u16(), "request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_status(status, &body);
        tracing::debug!(operation, status = status.as_u16(), error = %error, "request failed");
        Err(error)
    }
}

#[async_trait]
impl ResourceGateway for HttpResourceGateway {
    async fn authenticate(&self, credentials: &Credentials) -> GatewayResult<TokenPair> {
        let request = self.request(Method::POST, "/auth/login/").json(credentials);
        let response: LoginResponse = self.send_json("authenticate", request).await?;
        Ok(TokenPair::new(response.access, response.refresh))
    }

    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<TokenPair> {
        let request = self
            .request(Method::POST, "/auth/refresh/")
            .json(&RefreshRequest {
                refresh: refresh_token,
            });
        let response: RefreshResponse = self.send_json("refresh_token", request).await?;
        let refresh = response.refresh.unwrap_or_else(|| refresh_token.to_string());
        Ok(TokenPair::new(response.access, refresh))
    }

    async fn register_user(&self, registration: &Registration) -> GatewayResult<UserIdentity> {
        let request = self
            .request(Method::POST, "/auth/users/register/")
            .json(registration);
        self.send_json("register_user", request).await
    }

    async fn current_user(&self, token: &str) -> GatewayResult<UserIdentity> {
        let request = self.authorized(Method::GET, "/auth/users/me/", token);
        self.send_json("current_user", request).await
    }

    async fn change_password(&self, token: &str, change: &PasswordChange) -> GatewayResult<()> {
        let request = self
            .authorized(Method::POST, "/auth/users/change_password/", token)
            .json(change);
        self.send_empty("change_password", request).await
    }

    async fn list_ideas(&self, token: &str, filter: &ListFilter) -> GatewayResult<Page<Idea>> {
        let request = self
            .authorized(Method::GET, "/ideas/", token)
            .query(&filter.query_pairs());
        self.send_list("list_ideas", request, filter.requested_page())
            .await
    }

    async fn my_ideas(&self, token: &str, filter: &ListFilter) -> GatewayResult<Page<Idea>> {
        let request = self
            .authorized(Method::GET, "/ideas/my/", token)
            .query(&filter.query_pairs());
        self.send_list("my_ideas", request, filter.requested_page())
            .await
    }

    async fn idea_detail(&self, token: &str, id: IdeaId) -> GatewayResult<Idea> {
        let request = self.authorized(Method::GET, &format!("/ideas/{}/", id), token);
        self.send_json("idea_detail", request).await
    }

    async fn create_idea(&self, token: &str, draft: &IdeaDraft) -> GatewayResult<Idea> {
        let request = self.authorized(Method::POST, "/ideas/", token).json(draft);
        self.send_json("create_idea", request).await
    }

    async fn update_idea(
        &self,
        token: &str,
        id: IdeaId,
        draft: &IdeaDraft,
    ) -> GatewayResult<Idea> {
        let request = self
            .authorized(Method::PUT, &format!("/ideas/{}/", id), token)
            .json(draft);
        self.send_json("update_idea", request).await
    }

    async fn delete_idea(&self, token: &str, id: IdeaId) -> GatewayResult<()> {
        let request = self.authorized(Method::DELETE, &format!("/ideas/{}/", id), token);
        self.send_empty("delete_idea", request).await
    }

    async fn submit_idea(&self, token: &str, id: IdeaId) -> GatewayResult<Option<Idea>> {
        let request = self
            .authorized(Method::POST, &format!("/ideas/{}/submit/", id), token)
            .json(&serde_json::json!({}));
        self.send_optional("submit_idea", request).await
    }

    async fn add_contributor(
        &self,
        token: &str,
        idea: IdeaId,
        user: UserId,
    ) -> GatewayResult<()> {
        let request = self
            .authorized(
                Method::POST,
                &format!("/ideas/{}/add_contributor/", idea),
                token,
            )
            .json(&AddContributorRequest { user_id: user });
        self.send_empty("add_contributor", request).await
    }

    async fn list_contributors(
        &self,
        token: &str,
        idea: IdeaId,
    ) -> GatewayResult<Vec<Contributor>> {
        let request = self.authorized(Method::GET, &format!("/ideas/{}/contributors/", idea), token);
        let page: Page<Contributor> = self.send_list("list_contributors", request, 1).await?;
        Ok(page.items)
    }

    async fn list_documents(&self, token: &str, idea: IdeaId) -> GatewayResult<Vec<DocumentRef>> {
        let request = self.authorized(Method::GET, &format!("/ideas/{}/documents/", idea), token);
        let page: Page<DocumentRef> = self.send_list("list_documents", request, 1).await?;
        Ok(page.items)
    }

    async fn list_campaigns(
        &self,
        token: &str,
        filter: &ListFilter,
    ) -> GatewayResult<Page<Campaign>> {
        let request = self
            .authorized(Method::GET, "/campaigns/", token)
            .query(&filter.query_pairs());
        self.send_list("list_campaigns", request, filter.requested_page())
            .await
    }

    async fn campaign_detail(&self, token: &str, id: CampaignId) -> GatewayResult<Campaign> {
        let request = self.authorized(Method::GET, &format!("/campaigns/{}/", id), token);
        self.send_json("campaign_detail", request).await
    }
}

/// Maps a failed send to `Network`, or `Unknown` when the request could
/// not even be built.
fn classify_transport(operation: &str, error: &reqwest::Error) -> GatewayError {
    if error.is_builder() {
        return GatewayError::unknown(None, format!("Invalid {} request: {}", operation, error));
    }

    let reason = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };
    GatewayError::network(format!("{} {}: {}", operation, reason, error))
}

/// Classifies a non-success response from its status and raw body.
pub fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let json: Option<Value> = serde_json::from_str(body).ok();

    match status {
        StatusCode::UNAUTHORIZED => {
            GatewayError::unauthorized(json.as_ref().and_then(server_message).unwrap_or_default())
        }
        StatusCode::NOT_FOUND => {
            GatewayError::not_found(json.as_ref().and_then(server_message).unwrap_or_default())
        }
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(field_errors(json.as_ref(), status))
        }
        _ => {
            let message = json
                .as_ref()
                .and_then(server_message)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            GatewayError::unknown(Some(status.as_u16()), message)
        }
    }
}

/// Picks the human-readable message of an error body: `detail`, then
/// `error`, then the first field message.
pub fn server_message(body: &Value) -> Option<String> {
    let object = match body {
        Value::Object(object) => object,
        Value::String(text) => return non_blank(text),
        Value::Array(items) => return items.iter().find_map(first_text),
        _ => return None,
    };

    for key in ["detail", "error"] {
        if let Some(message) = object.get(key).and_then(first_text) {
            return Some(message);
        }
    }
    object.values().find_map(first_text)
}

/// Extracts per-field messages. `detail` and `error` are filed under
/// `non_field_errors`.
fn field_errors(body: Option<&Value>, status: StatusCode) -> FieldErrors {
    let mut fields = FieldErrors::new();

    match body {
        Some(Value::Object(object)) => {
            for key in ["detail", "error"] {
                if let Some(message) = object.get(key).and_then(first_text) {
                    fields
                        .entry(NON_FIELD_ERRORS.to_string())
                        .or_default()
                        .push(message);
                }
            }
            for (key, value) in object {
                if key == "detail" || key == "error" {
                    continue;
                }
                let messages = texts(value);
                if !messages.is_empty() {
                    fields.entry(key.clone()).or_default().extend(messages);
                }
            }
        }
        Some(other) => {
            let messages = texts(other);
            if !messages.is_empty() {
                fields.insert(NON_FIELD_ERRORS.to_string(), messages);
            }
        }
        None => {}
    }

    if fields.is_empty() {
        let reason = status.canonical_reason().unwrap_or("Bad Request");
        fields.insert(NON_FIELD_ERRORS.to_string(), vec![reason.to_string()]);
    }
    fields
}

fn texts(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => non_blank(text).into_iter().collect(),
        Value::Array(items) => items.iter().flat_map(texts).collect(),
        Value::Object(object) => object.values().flat_map(texts).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn first_text(value: &Value) -> Option<String> {
    texts(value).into_iter().next()
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unauthorized_carries_detail() {
        let error = classify_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "No active account found with the given credentials"}"#,
        );

        assert!(error.is_unauthorized());
        assert_eq!(
            error.server_message(),
            Some("No active account found with the given credentials")
        );
    }

    #[test]
    fn test_unauthorized_without_body_has_no_message() {
        let error = classify_status(StatusCode::UNAUTHORIZED, "");
        assert!(error.is_unauthorized());
        assert_eq!(error.server_message(), None);
    }

    #[test]
    fn test_field_errors_are_kept_verbatim() {
        let error = classify_status(
            StatusCode::BAD_REQUEST,
            r#"{"title": ["Ensure this field has no more than 200 characters."],
                "campaign_id": ["This field is required."]}"#,
        );

        let fields = error.field_errors().unwrap();
        assert_eq!(
            fields["title"],
            vec!["Ensure this field has no more than 200 characters."]
        );
        assert_eq!(fields["campaign_id"], vec!["This field is required."]);
    }

    #[test]
    fn test_error_key_becomes_non_field_message() {
        let error = classify_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Only draft ideas can be submitted"}"#,
        );

        assert!(error.is_validation());
        assert_eq!(
            error.server_message(),
            Some("Only draft ideas can be submitted")
        );
    }

    #[test]
    fn test_conflict_and_unprocessable_are_validation() {
        assert!(classify_status(StatusCode::CONFLICT, "{}").is_validation());
        assert!(classify_status(StatusCode::UNPROCESSABLE_ENTITY, "").is_validation());
    }

    #[test]
    fn test_not_found() {
        let error = classify_status(StatusCode::NOT_FOUND, r#"{"error": "User not found"}"#);
        assert!(error.is_not_found());
        assert_eq!(error.server_message(), Some("User not found"));
    }

    #[test]
    fn test_forbidden_and_server_errors_are_unknown() {
        let forbidden = classify_status(
            StatusCode::FORBIDDEN,
            r#"{"detail": "You do not have permission to perform this action."}"#,
        );
        assert_eq!(
            forbidden,
            GatewayError::unknown(
                Some(403),
                "You do not have permission to perform this action."
            )
        );

        let unavailable = classify_status(StatusCode::SERVICE_UNAVAILABLE, "<html>down</html>");
        assert_eq!(
            unavailable,
            GatewayError::unknown(Some(503), "Service Unavailable")
        );
    }

    #[test]
    fn test_server_message_order() {
        assert_eq!(
            server_message(&json!({"error": "e", "detail": "d"})),
            Some("d".to_string())
        );
        assert_eq!(
            server_message(&json!({"error": "e", "title": ["t"]})),
            Some("e".to_string())
        );
        assert_eq!(
            server_message(&json!({"password": ["too short"]})),
            Some("too short".to_string())
        );
        assert_eq!(server_message(&json!({})), None);
    }

    #[test]
    fn test_refresh_response_without_rotation() {
        let response: RefreshResponse = serde_json::from_str(r#"{"access": "a2"}"#).unwrap();
        assert_eq!(response.access, "a2");
        assert!(response.refresh.is_none());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let gateway = HttpResourceGateway::with_client(
            Client::new(),
            "http://localhost:8000/api/v1/",
        );
        assert_eq!(gateway.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(
            gateway.url("/ideas/"),
            "http://localhost:8000/api/v1/ideas/"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let gateway = HttpResourceGateway::new("http://127.0.0.1:9", Duration::from_millis(500))
            .unwrap();

        let error = gateway
            .authenticate(&Credentials::new("alice", "secret"))
            .await
            .unwrap_err();

        assert!(error.is_network(), "unexpected: {error:?}");
    }
}
