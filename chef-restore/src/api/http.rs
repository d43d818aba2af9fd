//! reqwest implementation of [`ChefApi`].

use super::{ApiError, ApiResult, ChefApi, ClientPayload, EntityKind, UserPayload};
use crate::config::ServerConfig;
use crate::cookbook::Cookbook;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

/// Server API version for plain entity requests
const API_VERSION: u8 = 1;

/// Cookbook manifests use the `all_files` layout of API version 2
const COOKBOOK_API_VERSION: u8 = 2;

#[derive(Debug, Deserialize)]
struct SandboxResponse {
    sandbox_id: String,
    #[serde(default)]
    checksums: HashMap<String, SandboxChecksum>,
}

#[derive(Debug, Deserialize)]
struct SandboxChecksum {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    needs_upload: bool,
}

/// Chef server client over HTTP
#[derive(Debug, Clone)]
pub struct HttpChefApi {
    client: reqwest::Client,
    base_url: String,
    root_url: String,
    client_name: String,
    token: Option<String>,
    chef_version: String,
}

impl HttpChefApi {
    pub fn new(config: &ServerConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            root_url: config.root_url(),
            client_name: config.client_name.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            chef_version: config.chef_version.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn root(&self, path: &str) -> String {
        format!("{}/{}", self.root_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str, api_version: u8) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header("X-Chef-Version", &self.chef_version)
            .header("X-Ops-Server-API-Version", api_version.to_string())
            .header("X-Ops-UserId", &self.client_name);

        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
        api_version: u8,
    ) -> ApiResult<Response> {
        self.send_json_to(method, &self.url(path), body, api_version).await
    }

    async fn send_json_to<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &T,
        api_version: u8,
    ) -> ApiResult<Response> {
        debug!(%method, %url, "Sending request");

        let response = self.request(method, url, api_version).json(body).send().await?;
        check(response).await
    }

    async fn upload_checksum(&self, url: &str, file: &crate::cookbook::CookbookFile) -> ApiResult<()> {
        let content = tokio::fs::read(&file.full_path).await?;
        let content_md5 = STANDARD.encode(md5::compute(&content).0);

        debug!(path = %file.path, checksum = %file.checksum, "Uploading cookbook file");
        let response = self
            .request(Method::PUT, url, API_VERSION)
            .header(CONTENT_TYPE, "application/x-binary")
            .header("Content-MD5", content_md5)
            .body(content)
            .send()
            .await?;
        check(response).await?;

        Ok(())
    }
}

/// Turn a non-success response into a classified error
async fn check(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ApiError::from_status(status.as_u16(), body))
}

#[async_trait]
impl ChefApi for HttpChefApi {
    async fn update(&self, kind: EntityKind, name: &str, body: &Value) -> ApiResult<()> {
        let path = format!("{}/{}", kind.collection(), name);
        self.send_json(Method::PUT, &path, body, API_VERSION).await?;
        Ok(())
    }

    async fn create(&self, kind: EntityKind, body: &Value) -> ApiResult<()> {
        self.send_json(Method::POST, kind.collection(), body, API_VERSION).await?;
        Ok(())
    }

    async fn create_data_bag(&self, name: &str) -> ApiResult<()> {
        self.send_json(Method::POST, "data", &json!({ "name": name }), API_VERSION)
            .await?;
        Ok(())
    }

    async fn update_data_bag_item(&self, bag: &str, id: &str, body: &Value) -> ApiResult<()> {
        let path = format!("data/{bag}/{id}");
        self.send_json(Method::PUT, &path, body, API_VERSION).await?;
        Ok(())
    }

    async fn create_data_bag_item(&self, bag: &str, body: &Value) -> ApiResult<()> {
        let path = format!("data/{bag}");
        self.send_json(Method::POST, &path, body, API_VERSION).await?;
        Ok(())
    }

    async fn create_client(&self, payload: &ClientPayload) -> ApiResult<()> {
        self.send_json(Method::POST, "clients", payload, API_VERSION).await?;
        Ok(())
    }

    async fn create_user(&self, payload: &UserPayload) -> ApiResult<()> {
        // Users live at the server root, not under an organization
        self.send_json_to(Method::POST, &self.root("users"), payload, API_VERSION)
            .await?;
        Ok(())
    }

    async fn upload_cookbook(&self, cookbook: &Cookbook) -> ApiResult<()> {
        let checksums: serde_json::Map<String, Value> = cookbook
            .files
            .iter()
            .map(|file| (file.checksum.clone(), Value::Null))
            .collect();

        let sandbox: SandboxResponse = self
            .send_json(Method::POST, "sandboxes", &json!({ "checksums": checksums }), API_VERSION)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("sandbox response: {e}")))?;

        let mut uploaded = HashSet::new();
        for file in &cookbook.files {
            let Some(entry) = sandbox.checksums.get(&file.checksum) else {
                continue;
            };
            if !entry.needs_upload || !uploaded.insert(file.checksum.as_str()) {
                continue;
            }
            let url = entry.url.as_deref().ok_or_else(|| {
                ApiError::Decode(format!("no upload url for checksum {}", file.checksum))
            })?;
            self.upload_checksum(url, file).await?;
        }

        let commit_path = format!("sandboxes/{}", sandbox.sandbox_id);
        self.send_json(Method::PUT, &commit_path, &json!({ "is_completed": true }), API_VERSION)
            .await?;

        let version_path = format!("cookbooks/{}/{}", cookbook.name, cookbook.version);
        self.send_json(Method::PUT, &version_path, &cookbook.manifest(), COOKBOOK_API_VERSION)
            .await?;

        info!(
            cookbook = %cookbook.name,
            version = %cookbook.version,
            uploaded = uploaded.len(),
            "Uploaded cookbook"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path as AxumPath, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{post, put};
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    type Log = Arc<Mutex<Vec<String>>>;

    async fn bind() -> (tokio::net::TcpListener, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    fn serve(listener: tokio::net::TcpListener, router: Router) {
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
    }

    fn api(base: &str) -> HttpChefApi {
        HttpChefApi::new(&ServerConfig {
            url: format!("{base}/"),
            client_name: "admin".to_string(),
            token: Some("s3cret".to_string()),
            ..ServerConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_status_classification() {
        let router = Router::new()
            .route(
                "/nodes/{name}",
                put(|| async { (StatusCode::NOT_FOUND, "missing") }),
            )
            .route("/nodes", post(|| async { StatusCode::CREATED }))
            .route(
                "/clients",
                post(|| async { (StatusCode::CONFLICT, "exists") }),
            )
            .route(
                "/users",
                post(|| async { (StatusCode::FORBIDDEN, "denied") }),
            );
        let (listener, base) = bind().await;
        serve(listener, router);
        let api = api(&base);

        let node = json!({"name": "web1"});
        assert!(matches!(
            api.update(EntityKind::Node, "web1", &node).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(api.create(EntityKind::Node, &node).await.is_ok());

        let client = ClientPayload::from_document(&json!({"name": "n1"}));
        assert!(matches!(
            api.create_client(&client).await,
            Err(ApiError::Conflict(body)) if body == "exists"
        ));

        match api.create_user(&jdoe()).await {
            Err(ApiError::Client { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "denied");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    fn jdoe() -> UserPayload {
        UserPayload::from_record(
            crate::api::UserRecord {
                username: "jdoe".to_string(),
                ..Default::default()
            },
            "12345678",
        )
    }

    #[tokio::test]
    async fn test_users_are_created_at_server_root() {
        let (listener, base) = bind().await;
        let log: Log = Arc::default();
        let router = Router::new()
            .fallback(
                |State(log): State<Log>, method: axum::http::Method, uri: axum::http::Uri| async move {
                    log.lock().unwrap().push(format!("{method} {}", uri.path()));
                    StatusCode::CREATED
                },
            )
            .with_state(log.clone());
        serve(listener, router);

        let api = HttpChefApi::new(&ServerConfig {
            url: format!("{base}/organizations/acme"),
            ..ServerConfig::default()
        })
        .unwrap();
        api.create_user(&jdoe()).await.unwrap();
        api.create_client(&ClientPayload::from_document(&json!({"name": "n1"})))
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["POST /users", "POST /organizations/acme/clients"]
        );
    }

    #[tokio::test]
    async fn test_request_headers() {
        async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
            let ok = headers.get("x-ops-userid").is_some_and(|v| v == "admin")
                && headers.get("authorization").is_some_and(|v| v == "Bearer s3cret")
                && headers.get("x-ops-server-api-version").is_some_and(|v| v == "1")
                && body == json!({"name": "secrets"});
            if ok {
                StatusCode::CREATED
            } else {
                StatusCode::BAD_REQUEST
            }
        }

        let (listener, base) = bind().await;
        serve(listener, Router::new().route("/data", post(echo)));

        api(&base).create_data_bag("secrets").await.unwrap();
    }

    #[tokio::test]
    async fn test_cookbook_sandbox_flow() -> crate::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("mysql");
        std::fs::create_dir_all(root.join("recipes"))?;
        std::fs::write(root.join("metadata.json"), r#"{"name":"mysql","version":"1.2.0"}"#)?;
        std::fs::write(root.join("recipes/default.rb"), "package 'mysql'")?;
        let cookbook = Cookbook::load(&root, "mysql-1.2.0").await?;

        let (listener, base) = bind().await;
        let log: Log = Arc::default();
        let state = (log.clone(), base.clone());

        let router = Router::new()
            .route(
                "/sandboxes",
                post(
                    |State((log, base)): State<(Log, String)>, Json(body): Json<Value>| async move {
                        log.lock().unwrap().push("POST /sandboxes".to_string());
                        let checksums: serde_json::Map<String, Value> = body["checksums"]
                            .as_object()
                            .unwrap()
                            .keys()
                            .map(|sum| {
                                (
                                    sum.clone(),
                                    json!({"url": format!("{base}/bookshelf/{sum}"), "needs_upload": true}),
                                )
                            })
                            .collect();
                        (
                            StatusCode::CREATED,
                            Json(json!({"sandbox_id": "abc", "uri": "", "checksums": checksums})),
                        )
                    },
                ),
            )
            .route(
                "/bookshelf/{sum}",
                put(|State((log, _)): State<(Log, String)>, AxumPath(sum): AxumPath<String>| async move {
                    log.lock().unwrap().push(format!("PUT /bookshelf/{sum}"));
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/sandboxes/{id}",
                put(|State((log, _)): State<(Log, String)>, AxumPath(id): AxumPath<String>| async move {
                    log.lock().unwrap().push(format!("PUT /sandboxes/{id}"));
                    StatusCode::OK
                }),
            )
            .route(
                "/cookbooks/{name}/{version}",
                put(
                    |State((log, _)): State<(Log, String)>,
                     AxumPath((name, version)): AxumPath<(String, String)>,
                     Json(manifest): Json<Value>| async move {
                        let files = manifest["all_files"].as_array().map_or(0, |f| f.len());
                        log.lock().unwrap().push(format!("PUT /cookbooks/{name}/{version} files={files}"));
                        StatusCode::CREATED
                    },
                ),
            )
            .with_state(state);
        serve(listener, router);

        api(&base).upload_cookbook(&cookbook).await?;

        let log = log.lock().unwrap().clone();
        assert_eq!(log.len(), 5);
        assert_eq!(log[0], "POST /sandboxes");
        assert!(log[1].starts_with("PUT /bookshelf/"));
        assert!(log[2].starts_with("PUT /bookshelf/"));
        assert_eq!(log[3], "PUT /sandboxes/abc");
        assert_eq!(log[4], "PUT /cookbooks/mysql/1.2.0 files=2");
        Ok(())
    }
}
