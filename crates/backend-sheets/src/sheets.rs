//! Google Sheets values API backend.

use crate::{BackendError, TabularSource};
use base64::Engine;
use carcupid_model::Grid;
use carcupid_query::SheetRequest;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Access tokens are refreshed this long before Google expires them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google service account credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccount {
    /// Decode credentials from base64-encoded service account JSON.
    pub fn from_base64(b64: &str) -> Result<Self, BackendError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| BackendError::Auth(format!("invalid base64 credentials: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::Auth(format!("invalid service account JSON: {e}")))
    }
}

/// How requests to the Sheets API are authorized.
#[derive(Debug, Clone, Default)]
pub enum SheetsAuth {
    /// Public sheets only
    #[default]
    None,
    /// API key sent as the `key` query parameter
    ApiKey(String),
    /// Pre-issued OAuth access token
    BearerToken(String),
    /// Exchanged for access tokens via the JWT bearer grant
    ServiceAccount(ServiceAccount),
}

/// Sheets backend configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Base URL for the Sheets API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub auth: SheetsAuth,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            timeout_secs: 30,
            auth: SheetsAuth::None,
        }
    }
}

/// Spreadsheet title and tab names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub title: String,
    pub sheets: Vec<String>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Grid,
}

#[derive(Deserialize)]
struct TitledProperties {
    title: Option<String>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: Option<TitledProperties>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    properties: Option<TitledProperties>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Google Sheets backend.
pub struct SheetsBackend {
    config: SheetsConfig,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsBackend {
    /// Create a new Sheets backend.
    pub fn new(config: SheetsConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    /// Build `{base}/v4/spreadsheets/{id}[/<segments>...]` with each segment escaped.
    fn url(&self, spreadsheet_id: &str, tail: &[&str]) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| BackendError::QueryFailed(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::QueryFailed("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id])
            .extend(tail);
        Ok(url)
    }

    fn values_url(&self, request: &SheetRequest) -> Result<Url, BackendError> {
        self.url(&request.spreadsheet_id, &["values", &request.range])
    }

    async fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder, BackendError> {
        Ok(match &self.config.auth {
            SheetsAuth::None => builder,
            SheetsAuth::ApiKey(key) => builder.query(&[("key", key)]),
            SheetsAuth::BearerToken(token) => builder.bearer_auth(token),
            SheetsAuth::ServiceAccount(account) => {
                let token = self.access_token(account).await?;
                builder.bearer_auth(token)
            }
        })
    }

    /// Reuse the cached access token or exchange a fresh signed JWT.
    async fn access_token(&self, account: &ServiceAccount) -> Result<String, BackendError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| BackendError::Auth(format!("clock error: {e}")))?
            .as_secs();
        let claims = Claims {
            iss: &account.client_email,
            scope: SHEETS_SCOPE,
            aud: &account.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| BackendError::Auth(format!("invalid private key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| BackendError::Auth(format!("failed to sign JWT: {e}")))?;

        tracing::debug!(account = %account.client_email, "Exchanging service account JWT");

        let response = self
            .client
            .post(&account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Auth(format!("HTTP {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn send_json<T>(&self, builder: RequestBuilder) -> Result<T, BackendError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .authorize(builder)
            .await?
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::QueryFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))
    }

    /// Fetch the spreadsheet title and its tab names.
    pub async fn sheet_info(&self, spreadsheet_id: &str) -> Result<SheetInfo, BackendError> {
        let url = self.url(spreadsheet_id, &[])?;
        let meta: SpreadsheetMeta = self.send_json(self.client.get(url)).await?;

        Ok(SheetInfo {
            title: meta
                .properties
                .and_then(|p| p.title)
                .unwrap_or_else(|| "Untitled Sheet".to_string()),
            sheets: meta
                .sheets
                .into_iter()
                .filter_map(|s| s.properties.and_then(|p| p.title))
                .collect(),
        })
    }

    /// Append rows after the last row of the range.
    pub async fn append_values(
        &self,
        request: &SheetRequest,
        values: &Grid,
    ) -> Result<serde_json::Value, BackendError> {
        let append = format!("{}:append", request.range);
        let url = self.url(&request.spreadsheet_id, &["values", &append])?;

        tracing::debug!(rows = values.len(), range = %request.range, "Appending rows");

        let builder = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&serde_json::json!({ "values": values }));
        self.send_json(builder).await
    }
}

impl TabularSource for SheetsBackend {
    async fn fetch_grid(&self, request: &SheetRequest) -> Result<Grid, BackendError> {
        let url = self.values_url(request)?;

        tracing::debug!(url = %url, "Fetching sheet values");

        let range: ValueRange = self.send_json(self.client.get(url)).await?;
        Ok(range.values)
    }

    fn name(&self) -> &'static str {
        "sheets"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, Path, Query};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use carcupid_model::Cell;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TEST_KEY: &str = include_str!("../testdata/service_account_key.pem");

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn backend(base_url: String, auth: SheetsAuth) -> SheetsBackend {
        SheetsBackend::new(SheetsConfig {
            base_url,
            timeout_secs: 5,
            auth,
        })
        .unwrap()
    }

    #[test]
    fn test_values_url_escapes_range() {
        let backend = backend("https://sheets.googleapis.com".to_string(), SheetsAuth::None);
        let request = SheetRequest::new("abc123", Some("EXPORT API".to_string())).unwrap();
        let url = backend.values_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/EXPORT%20API"
        );
    }

    #[test]
    fn test_service_account_from_base64() {
        let json = r#"{"client_email":"bot@example.iam.gserviceaccount.com","private_key":"KEY"}"#;
        let b64 = base64::engine::general_purpose::STANDARD.encode(json);
        let account = ServiceAccount::from_base64(&b64).unwrap();
        assert_eq!(account.client_email, "bot@example.iam.gserviceaccount.com");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);

        assert!(matches!(
            ServiceAccount::from_base64("%%%"),
            Err(BackendError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_grid_with_api_key() {
        let app = Router::new().route(
            "/v4/spreadsheets/:id/values/:range",
            get(
                |Path((id, range)): Path<(String, String)>,
                 Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(id, "sheet-1");
                    assert_eq!(range, "DATABASE");
                    assert_eq!(params.get("key").map(String::as_str), Some("secret"));
                    Json(serde_json::json!({
                        "range": "DATABASE!A1:B2",
                        "values": [["Title"], ["Make", "Model"]]
                    }))
                },
            ),
        );
        let base = serve(app).await;

        let backend = backend(base, SheetsAuth::ApiKey("secret".to_string()));
        let request = SheetRequest::new("sheet-1", None).unwrap();
        let grid = backend.fetch_grid(&request).await.unwrap();
        assert_eq!(grid[1], vec![Cell::from("Make"), Cell::from("Model")]);
    }

    #[tokio::test]
    async fn test_missing_values_is_empty_grid() {
        let app = Router::new().route(
            "/v4/spreadsheets/:id/values/:range",
            get(|| async { Json(serde_json::json!({ "range": "EMPTY!A1" })) }),
        );
        let base = serve(app).await;

        let grid = backend(base, SheetsAuth::None)
            .fetch_grid(&SheetRequest::new("s", None).unwrap())
            .await
            .unwrap();
        assert!(grid.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_query_failed() {
        let app = Router::new().route(
            "/v4/spreadsheets/:id/values/:range",
            get(|| async { (axum::http::StatusCode::FORBIDDEN, "denied") }),
        );
        let base = serve(app).await;

        let result = backend(base, SheetsAuth::BearerToken("t".to_string()))
            .fetch_grid(&SheetRequest::new("s", None).unwrap())
            .await;
        assert!(matches!(result, Err(BackendError::QueryFailed(msg)) if msg.contains("403")));
    }

    #[tokio::test]
    async fn test_sheet_info() {
        let app = Router::new().route(
            "/v4/spreadsheets/:id",
            get(|| async {
                Json(serde_json::json!({
                    "properties": { "title": "Vehicles" },
                    "sheets": [
                        { "properties": { "title": "DATABASE" } },
                        { "properties": { "title": "EXPORT API" } }
                    ]
                }))
            }),
        );
        let base = serve(app).await;

        let info = backend(base, SheetsAuth::None).sheet_info("s").await.unwrap();
        assert_eq!(info.title, "Vehicles");
        assert_eq!(info.sheets, vec!["DATABASE", "EXPORT API"]);
    }

    #[tokio::test]
    async fn test_append_values() {
        let app = Router::new().route(
            "/v4/spreadsheets/:id/values/:range",
            post(
                |Path((id, range)): Path<(String, String)>,
                 Query(params): Query<HashMap<String, String>>,
                 Json(body): Json<Value>| async move {
                    Json(json!({ "id": id, "range": range, "params": params, "body": body }))
                },
            ),
        );
        let base = serve(app).await;

        let request = SheetRequest::new("sheet-1", Some("EXPORT API".to_string())).unwrap();
        let rows = vec![vec![Cell::from("Ford"), Cell::Number(2024.0)]];
        let echoed = backend(base, SheetsAuth::None)
            .append_values(&request, &rows)
            .await
            .unwrap();

        assert_eq!(echoed["id"], "sheet-1");
        assert_eq!(echoed["range"], "EXPORT API:append");
        assert_eq!(echoed["params"]["valueInputOption"], "RAW");
        assert_eq!(echoed["params"]["insertDataOption"], "INSERT_ROWS");
        assert_eq!(echoed["body"], json!({ "values": [["Ford", 2024.0]] }));
    }

    #[tokio::test]
    async fn test_service_account_token_is_exchanged_once() {
        let token_calls = Arc::new(AtomicUsize::new(0));
        let value_calls = Arc::new(AtomicUsize::new(0));
        let (tokens, values) = (token_calls.clone(), value_calls.clone());

        let app = Router::new()
            .route(
                "/token",
                post(move |Form(form): Form<HashMap<String, String>>| {
                    let tokens = tokens.clone();
                    async move {
                        tokens.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(form.get("grant_type").map(String::as_str), Some(JWT_BEARER_GRANT));

                        let assertion = form.get("assertion").cloned().unwrap_or_default();
                        let parts: Vec<&str> = assertion.split('.').collect();
                        assert_eq!(parts.len(), 3);
                        let claims: Value = serde_json::from_slice(
                            &base64::engine::general_purpose::URL_SAFE_NO_PAD
                                .decode(parts[1])
                                .unwrap(),
                        )
                        .unwrap();
                        assert_eq!(claims["iss"], "bot@carcupid.iam.gserviceaccount.com");
                        assert_eq!(claims["scope"], SHEETS_SCOPE);

                        Json(json!({ "access_token": "tok-1", "expires_in": 3600 }))
                    }
                }),
            )
            .route(
                "/v4/spreadsheets/:id/values/:range",
                get(move |headers: HeaderMap| {
                    let values = values.clone();
                    async move {
                        values.fetch_add(1, Ordering::SeqCst);
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        assert_eq!(auth, "Bearer tok-1");
                        Json(json!({ "values": [["Make"]] }))
                    }
                }),
            );
        let base = serve(app).await;

        let account = ServiceAccount {
            client_email: "bot@carcupid.iam.gserviceaccount.com".to_string(),
            private_key: TEST_KEY.to_string(),
            token_uri: format!("{base}/token"),
        };
        let backend = backend(base, SheetsAuth::ServiceAccount(account));
        let request = SheetRequest::new("sheet-1", None).unwrap();

        backend.fetch_grid(&request).await.unwrap();
        let grid = backend.fetch_grid(&request).await.unwrap();

        assert_eq!(grid, vec![vec![Cell::from("Make")]]);
        assert_eq!(token_calls.load(Ordering::SeqCst), 1);
        assert_eq!(value_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejected_token_exchange_is_auth_error() {
        let app = Router::new().route(
            "/token",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "invalid_grant") }),
        );
        let base = serve(app).await;

        let account = ServiceAccount {
            client_email: "bot@carcupid.iam.gserviceaccount.com".to_string(),
            private_key: TEST_KEY.to_string(),
            token_uri: format!("{base}/token"),
        };
        let result = backend(base, SheetsAuth::ServiceAccount(account))
            .fetch_grid(&SheetRequest::new("s", None).unwrap())
            .await;
        assert!(matches!(result, Err(BackendError::Auth(msg)) if msg.contains("401")));
    }
}
