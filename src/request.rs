use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{BatchId, Member};
use crate::selection::SelectionDiff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PendingApproval,
}

/// A proposed enrollment change awaiting admin approval. Never applied directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentChangeRequest {
    pub id: Uuid,
    pub member_id: String,
    pub member_name: String,
    pub added: Vec<BatchId>,
    pub removed: Vec<BatchId>,
    pub note: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl EnrollmentChangeRequest {
    pub fn new(member: &Member, diff: SelectionDiff, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            added: diff.added,
            removed: diff.removed,
            note: note.filter(|text| !text.trim().is_empty()),
            status: RequestStatus::PendingApproval,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub request_id: Uuid,
    pub member_id: String,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Hands the request to the approval queue. There is no backend, so this
/// waits `delay` and then always succeeds.
pub async fn submit(
    request: &EnrollmentChangeRequest,
    delay: Duration,
) -> anyhow::Result<SubmissionReceipt> {
    tokio::time::sleep(delay).await;

    let receipt = SubmissionReceipt {
        request_id: request.id,
        member_id: request.member_id.clone(),
        status: RequestStatus::PendingApproval,
        submitted_at: Utc::now(),
    };
    info!(
        request = %receipt.request_id,
        member = %receipt.member_id,
        added = request.added.len(),
        removed = request.removed.len(),
        "enrollment change request submitted"
    );
    Ok(receipt)
}
