//! HTTP DTOs for the entitlement endpoints.
//!
//! Request and response bodies for purchases, transaction lookups, sweep
//! triggers and the caller's entitlement.

use serde::{Deserialize, Serialize};

use crate::application::handlers::membership::SweepReport;
use crate::domain::foundation::Timestamp;
use crate::domain::membership::{
    AccessDecision, EntitlementError, MembershipType, Profile, StoreStep, Transaction,
    TransactionStatus,
};

fn rfc3339(ts: &Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /transactions`.
///
/// The tier stays a raw string so an unknown value surfaces as a
/// `membership_type` validation error instead of a JSON rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub amount: i64,
    #[serde(rename = "membershipType", alias = "membership_type")]
    pub membership_type: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub user_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub membership_type: MembershipType,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub confirmed_at: Option<String>,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            user_id: tx.user_id.to_string(),
            amount: tx.amount,
            membership_type: tx.membership_type,
            status: tx.status,
            failure_reason: tx.failure_reason.clone(),
            created_at: rfc3339(&tx.created_at),
            confirmed_at: tx.confirmed_at.as_ref().map(rfc3339),
        }
    }
}

/// Body of a successful purchase (201).
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseResponse {
    pub message: String,
    pub transaction: TransactionResponse,
    pub membership_expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
}

/// Profile state after a grant retry.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    pub message: String,
    pub membership_type: MembershipType,
    pub membership_expires_at: Option<String>,
    pub membership_started_at: Option<String>,
}

impl MembershipResponse {
    pub fn from_profile(message: impl Into<String>, profile: &Profile) -> Self {
        Self {
            message: message.into(),
            membership_type: profile.membership_type,
            membership_expires_at: profile.membership_expires_at.as_ref().map(rfc3339),
            membership_started_at: profile.membership_started_at.as_ref().map(rfc3339),
        }
    }
}

/// Body of `POST /subscriptions/check-expiry`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub success: bool,
    pub expired_count: usize,
    pub failed_count: usize,
    pub message: String,
}

impl From<&SweepReport> for SweepResponse {
    fn from(report: &SweepReport) -> Self {
        let message = if report.is_complete() {
            format!("Downgraded {} expired memberships", report.expired_count)
        } else {
            format!(
                "Downgraded {} expired memberships, {} failed",
                report.expired_count, report.failed_count
            )
        };
        Self {
            success: report.is_complete(),
            expired_count: report.expired_count,
            failed_count: report.failed_count,
            message,
        }
    }
}

/// The gate's answer for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementResponse {
    pub has_premium_access: bool,
    pub decision: AccessDecision,
}

impl From<AccessDecision> for EntitlementResponse {
    fn from(decision: AccessDecision) -> Self {
        Self {
            has_premium_access: decision.is_granted(),
            decision,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    pub message: String,
    /// Store operation that failed, for store errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StoreStep>,
    /// Transaction already recorded when the error happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            step: None,
            transaction_id: None,
        }
    }
}

impl From<&EntitlementError> for ErrorResponse {
    fn from(err: &EntitlementError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            step: err.step(),
            transaction_id: err.transaction_id().map(|id| id.to_string()),
        }
    }
}
