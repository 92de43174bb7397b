//! Document creation with permission handover.
//!
//! Three calls, in order: create the document (tenant token), add the
//! configured collaborator (tenant token), and transfer ownership to that
//! collaborator (user token). Only the first one is fatal.

use feishu_config::FeishuConfig;
use feishu_docx::DocumentApi;
use tracing::{info, warn};

use crate::artifacts::{DocInfo, PermissionStatus};

/// Create a document titled `title` and hand it over to the collaborator.
///
/// The returned [`DocInfo`] always describes what happened; when creation
/// itself fails, `document_id` is empty and the error is in `errors`.
pub async fn create_with_permission<A>(api: &A, config: &FeishuConfig, title: &str) -> DocInfo
where
    A: DocumentApi + ?Sized,
{
    let collaborator = config.collaborator.as_ref();
    let mut info = DocInfo {
        title: title.to_string(),
        created_at: chrono::Local::now().to_rfc3339(),
        permission: PermissionStatus {
            collaborator_id: collaborator.map(|c| c.member_id.clone()),
            ..PermissionStatus::default()
        },
        ..DocInfo::default()
    };

    match api
        .create_document(title, config.default_folder.as_deref())
        .await
    {
        Ok(document_id) => {
            info.document_url = config.document_url(&document_id);
            info.document_id = document_id;
        }
        Err(e) => {
            warn!(error = %e, "document creation failed");
            info.errors.push(format!("create document failed: {e}"));
            return info;
        }
    }

    let Some(collaborator) = collaborator else {
        info!("no collaborator configured; skipping permission handover");
        info.errors
            .push("no collaborator configured; permission step skipped".to_string());
        return info;
    };

    match api
        .add_permission_member(
            &info.document_id,
            &collaborator.member_type,
            &collaborator.member_id,
            &collaborator.perm,
        )
        .await
    {
        Ok(()) => {
            info!(doc_id = %info.document_id, member_id = %collaborator.member_id, "collaborator added");
            info.permission.collaborator_added = true;
        }
        Err(e) => {
            warn!(error = %e, "adding collaborator failed");
            info.errors.push(format!("add collaborator failed: {e}"));
            return info;
        }
    }

    match api
        .transfer_owner(
            &info.document_id,
            &collaborator.member_type,
            &collaborator.member_id,
        )
        .await
    {
        Ok(()) => {
            info!(doc_id = %info.document_id, "ownership transferred");
            info.permission.owner_transferred = true;
        }
        Err(e) => {
            warn!(error = %e, "ownership transfer failed; collaborator can edit but not delete");
            info.errors.push(format!("transfer ownership failed: {e}"));
        }
    }
    info.permission.user_has_full_control = info.permission.owner_transferred;

    info
}
