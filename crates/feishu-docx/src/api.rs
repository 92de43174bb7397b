//! The document API seam.
//!
//! [`DocumentApi`] is everything the block adder and the create step need
//! from Feishu. [`crate::DocxClient`] implements it over HTTP; tests use
//! in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Operations against the docx and drive APIs.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Create an empty document and return its id.
    async fn create_document(&self, title: &str, folder_token: Option<&str>) -> Result<String>;

    /// Grant `perm` on the document to a member (tenant token).
    async fn add_permission_member(
        &self,
        document_id: &str,
        member_type: &str,
        member_id: &str,
        perm: &str,
    ) -> Result<()>;

    /// Make the member the document owner (user token).
    async fn transfer_owner(
        &self,
        document_id: &str,
        member_type: &str,
        member_id: &str,
    ) -> Result<()>;

    /// Append child blocks under `parent_id`; returns the new block ids in order.
    async fn add_children(
        &self,
        document_id: &str,
        parent_id: &str,
        children: &[Value],
    ) -> Result<Vec<String>>;

    /// Insert a nested block tree under `parent_id` in one call.
    async fn add_descendants(
        &self,
        document_id: &str,
        parent_id: &str,
        children_id: &[String],
        descendants: &[Value],
    ) -> Result<()>;

    /// Upload image bytes bound to an image block; returns the file token.
    async fn upload_image(&self, block_id: &str, file_name: &str, bytes: Vec<u8>)
    -> Result<String>;

    /// Point an image block at an uploaded file.
    async fn replace_image(&self, document_id: &str, block_id: &str, file_token: &str)
    -> Result<()>;

    /// Download a remote resource.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
