//! HTTP implementation of [`DocumentApi`].
//!
//! Every response is a `{ "code": 0, "msg": "success", "data": {...} }`
//! envelope. Requests are retried by [`RetryPolicy`] on throttling, server
//! errors, and transport failures.

use async_trait::async_trait;
use feishu_auth::TokenProvider;
use feishu_config::FeishuConfig;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::api::DocumentApi;
use crate::error::{DocxError, Result};
use crate::retry::RetryPolicy;

/// Query string shared by every block write.
const REVISION_LATEST: &str = "document_revision_id=-1";

/// Reqwest-backed docx client.
pub struct DocxClient {
    provider: TokenProvider,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl DocxClient {
    pub fn new(provider: TokenProvider) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feishu-docflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        let retry = RetryPolicy::with_max_retries(provider.config().max_retries);

        Self {
            provider,
            client,
            retry,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &FeishuConfig {
        self.provider.config()
    }

    pub fn provider(&self) -> &TokenProvider {
        &self.provider
    }

    fn api_url(&self, path: &str) -> String {
        self.config().api_url(path)
    }

    fn blocks_url(&self, document_id: &str, block_id: &str) -> String {
        self.api_url(&format!("/docx/v1/documents/{document_id}/blocks/{block_id}"))
    }

    /// Send a JSON request built by `build` and return the envelope's `data`.
    async fn send_json<F>(&self, op: &'static str, build: F) -> Result<Value>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let build = &build;
        self.retry
            .run(op, move || async move {
                let response = build().send().await?;
                let status = response.status();
                let body = response.text().await?;
                parse_envelope(op, status.as_u16(), &body)
            })
            .await
    }

    fn authorized(
        &self,
        method: reqwest::Method,
        url: &str,
        token: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json; charset=utf-8")
    }
}

/// Interpret an HTTP response body as an Open API envelope.
///
/// Throttling and server errors surface as [`DocxError::Http`] so they are
/// retried; a well-formed envelope with a non-zero code becomes
/// [`DocxError::Api`] regardless of status.
pub fn parse_envelope(op: &'static str, status: u16, body: &str) -> Result<Value> {
    let http_error = || DocxError::Http {
        op,
        status,
        body: body.chars().take(500).collect(),
    };

    if status == 429 || status >= 500 {
        return Err(http_error());
    }

    let envelope: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&status) => return Err(http_error()),
        Err(e) => return Err(e.into()),
    };

    let code = envelope.get("code").and_then(Value::as_i64).unwrap_or(-1);
    if code != 0 {
        let msg = envelope
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(DocxError::Api { op, code, msg });
    }

    Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
}

fn required_str(op: &'static str, value: &Value, pointer: &str) -> Result<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DocxError::InvalidResponse {
            op,
            reason: format!("missing `{pointer}`"),
        })
}

/// Block ids of `data.children`, in order.
pub fn child_ids(op: &'static str, data: &Value) -> Result<Vec<String>> {
    let children = data
        .get("children")
        .and_then(Value::as_array)
        .ok_or_else(|| DocxError::InvalidResponse {
            op,
            reason: "missing `children`".to_string(),
        })?;
    children
        .iter()
        .map(|child| required_str(op, child, "/block_id"))
        .collect()
}

#[async_trait]
impl DocumentApi for DocxClient {
    async fn create_document(&self, title: &str, folder_token: Option<&str>) -> Result<String> {
        let token = self.provider.tenant_token().await?;
        let url = self.api_url("/docx/v1/documents");

        let mut body = json!({ "title": title });
        if let Some(folder) = folder_token {
            body["folder_token"] = json!(folder);
        }

        debug!(url = %url, title = %title, "creating document");
        let data = self
            .send_json("create_document", || {
                self.authorized(reqwest::Method::POST, &url, &token).json(&body)
            })
            .await?;

        let document_id = required_str("create_document", &data, "/document/document_id")?;
        info!(doc_id = %document_id, "document created");
        Ok(document_id)
    }

    async fn add_permission_member(
        &self,
        document_id: &str,
        member_type: &str,
        member_id: &str,
        perm: &str,
    ) -> Result<()> {
        let token = self.provider.tenant_token().await?;
        let url = self.api_url(&format!(
            "/drive/v1/permissions/{document_id}/members?type=docx"
        ));
        let body = json!({
            "member_type": member_type,
            "member_id": member_id,
            "perm": perm,
        });

        debug!(doc_id = %document_id, member_id = %member_id, perm = %perm, "adding collaborator");
        self.send_json("add_permission_member", || {
            self.authorized(reqwest::Method::POST, &url, &token).json(&body)
        })
        .await?;
        Ok(())
    }

    async fn transfer_owner(
        &self,
        document_id: &str,
        member_type: &str,
        member_id: &str,
    ) -> Result<()> {
        let token = self.provider.user_token().await?;
        let url = self.api_url(&format!(
            "/drive/v1/permissions/{document_id}/members/transfer_owner?type=docx\
             &need_notification=true&remove_old_owner=false&stay_put=false&old_owner_perm=view"
        ));
        let body = json!({
            "member_type": member_type,
            "member_id": member_id,
        });

        debug!(doc_id = %document_id, member_id = %member_id, "transferring ownership");
        self.send_json("transfer_owner", || {
            self.authorized(reqwest::Method::POST, &url, &token).json(&body)
        })
        .await?;
        Ok(())
    }

    async fn add_children(
        &self,
        document_id: &str,
        parent_id: &str,
        children: &[Value],
    ) -> Result<Vec<String>> {
        let token = self.provider.tenant_token().await?;
        let url = format!("{}/children?{REVISION_LATEST}", self.blocks_url(document_id, parent_id));
        let body = json!({ "children": children, "index": -1 });

        let data = self
            .send_json("add_children", || {
                self.authorized(reqwest::Method::POST, &url, &token).json(&body)
            })
            .await?;
        child_ids("add_children", &data)
    }

    async fn add_descendants(
        &self,
        document_id: &str,
        parent_id: &str,
        children_id: &[String],
        descendants: &[Value],
    ) -> Result<()> {
        let token = self.provider.tenant_token().await?;
        let url = format!(
            "{}/descendant?{REVISION_LATEST}",
            self.blocks_url(document_id, parent_id)
        );
        let body = json!({
            "index": -1,
            "children_id": children_id,
            "descendants": descendants,
        });

        self.send_json("add_descendants", || {
            self.authorized(reqwest::Method::POST, &url, &token).json(&body)
        })
        .await?;
        Ok(())
    }

    async fn upload_image(
        &self,
        block_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let token = self.provider.tenant_token().await?;
        let url = self.api_url("/drive/v1/medias/upload_all");
        let size = bytes.len().to_string();

        debug!(block_id = %block_id, file_name = %file_name, size = %size, "uploading image");
        let data = self
            .send_json("upload_image", || {
                let file = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.to_string());
                let form = reqwest::multipart::Form::new()
                    .text("file_name", file_name.to_string())
                    .text("parent_type", "docx_image")
                    .text("parent_node", block_id.to_string())
                    .text("size", size.clone())
                    .part("file", file);
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {token}"))
                    .multipart(form)
            })
            .await?;

        required_str("upload_image", &data, "/file_token")
    }

    async fn replace_image(
        &self,
        document_id: &str,
        block_id: &str,
        file_token: &str,
    ) -> Result<()> {
        let token = self.provider.tenant_token().await?;
        let url = format!("{}?{REVISION_LATEST}", self.blocks_url(document_id, block_id));
        let body = json!({ "replace_image": { "token": file_token } });

        self.send_json("replace_image", || {
            self.authorized(reqwest::Method::PATCH, &url, &token).json(&body)
        })
        .await?;
        Ok(())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "downloading remote image");
        self.retry
            .run("fetch_bytes", move || async move {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(DocxError::Http {
                        op: "fetch_bytes",
                        status: status.as_u16(),
                        body: String::new(),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            })
            .await
    }
}
