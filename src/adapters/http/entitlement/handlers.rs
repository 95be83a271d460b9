//! HTTP handlers for entitlement endpoints.
//!
//! These handlers connect Axum routes to the application layer command/query
//! handlers. Authentication comes from `auth_middleware`; none of them read
//! cookies or headers for identity themselves.
//!
//! Purchases, grant retries and sweep passes run on their own task. Once
//! started they finish even if the client goes away, so the store is never
//! left between steps by a dropped request.

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use crate::application::handlers::membership::{
    EntitlementGate, GetTransactionHandler, GetTransactionQuery, ListTransactionsHandler,
    ListTransactionsQuery, PurchaseMembershipCommand, PurchaseMembershipHandler,
    ReapplyGrantCommand, ReapplyGrantHandler, SweepExpiredMembershipsHandler,
};
use crate::domain::foundation::TransactionId;
use crate::domain::membership::EntitlementError;
use crate::ports::{Clock, PaymentConfirmer, ProfileRepository, TransactionRepository};

use super::super::middleware::{OptionalAuth, RequireAuth};
use super::dto::{
    EntitlementResponse, ErrorResponse, HealthResponse, MembershipResponse, PurchaseRequest,
    PurchaseResponse, SweepResponse, TransactionListResponse, TransactionResponse,
};

/// Header carrying the shared secret for sweep triggers.
pub const SCHEDULER_TOKEN_HEADER: &str = "X-Scheduler-Token";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the entitlement routes.
///
/// Cloned per request; every handler sits behind an `Arc`.
#[derive(Clone)]
pub struct EntitlementAppState {
    pub purchase: Arc<PurchaseMembershipHandler>,
    pub reapply: Arc<ReapplyGrantHandler>,
    pub get_transaction: Arc<GetTransactionHandler>,
    pub list_transactions: Arc<ListTransactionsHandler>,
    pub sweeper: Arc<SweepExpiredMembershipsHandler>,
    pub gate: EntitlementGate,
    /// When set, sweep triggers must present this value.
    pub scheduler_token: Option<Arc<SecretString>>,
}

impl EntitlementAppState {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        transactions: Arc<dyn TransactionRepository>,
        payments: Arc<dyn PaymentConfirmer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            purchase: Arc::new(PurchaseMembershipHandler::new(
                profiles.clone(),
                transactions.clone(),
                payments,
                clock.clone(),
            )),
            reapply: Arc::new(ReapplyGrantHandler::new(
                profiles.clone(),
                transactions.clone(),
            )),
            get_transaction: Arc::new(GetTransactionHandler::new(transactions.clone())),
            list_transactions: Arc::new(ListTransactionsHandler::new(transactions)),
            sweeper: Arc::new(SweepExpiredMembershipsHandler::new(
                profiles.clone(),
                clock.clone(),
            )),
            gate: EntitlementGate::new(profiles, clock),
            scheduler_token: None,
        }
    }

    /// Shares one sweeper between the HTTP trigger and the scheduler.
    pub fn with_sweeper(mut self, sweeper: Arc<SweepExpiredMembershipsHandler>) -> Self {
        self.sweeper = sweeper;
        self
    }

    pub fn with_scheduler_token(mut self, token: Option<SecretString>) -> Self {
        self.scheduler_token = token.map(Arc::new);
        self
    }

    fn scheduler_authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.scheduler_token else {
            return true;
        };
        let presented = headers
            .get(SCHEDULER_TOKEN_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        bool::from(presented.ct_eq(expected.expose_secret().as_bytes()))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Transaction Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// Drives `work` to completion on a spawned task.
async fn run_to_completion<F>(work: F) -> Result<F::Output, EntitlementApiError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        error!(error = %e, "Entitlement task did not complete");
        EntitlementApiError::Aborted
    })
}

/// POST /transactions - Purchase a premium period
///
/// The caller is resolved before the body is read, so an anonymous request
/// is 401 whatever it carries. A body that is not a valid purchase is a
/// `body` validation error.
pub async fn create_transaction(
    State(state): State<EntitlementAppState>,
    OptionalAuth(user): OptionalAuth,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, EntitlementApiError> {
    let Some(user) = user else {
        return Err(EntitlementApiError::Purchase(EntitlementError::Unauthorized));
    };
    let Json(request) = payload.map_err(|rejection| {
        EntitlementApiError::Purchase(EntitlementError::validation(
            "body",
            rejection.body_text(),
        ))
    })?;

    let cmd = PurchaseMembershipCommand {
        user_id: Some(user.id),
        amount: request.amount,
        membership_type: request.membership_type,
    };

    let purchase = state.purchase.clone();
    let result = run_to_completion(async move { purchase.handle(cmd).await })
        .await?
        .map_err(EntitlementApiError::Purchase)?;

    let response = PurchaseResponse {
        message: "Membership purchased successfully".to_string(),
        transaction: TransactionResponse::from(&result.transaction),
        membership_expires_at: result
            .membership_expires_at
            .map(|ts| ts.as_datetime().to_rfc3339()),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /transactions - The caller's purchase history, newest first
pub async fn list_transactions(
    State(state): State<EntitlementAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, EntitlementApiError> {
    let transactions = state
        .list_transactions
        .handle(ListTransactionsQuery { user_id: user.id })
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: transactions.iter().map(TransactionResponse::from).collect(),
    }))
}

/// GET /transactions/{id} - Status of one of the caller's transactions
pub async fn get_transaction(
    State(state): State<EntitlementAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, EntitlementApiError> {
    let query = GetTransactionQuery {
        user_id: user.id,
        transaction_id: parse_transaction_id(&id)?,
    };

    let transaction = state.get_transaction.handle(query).await?;

    Ok(Json(TransactionResponse::from(&transaction)))
}

/// POST /transactions/{id}/reapply - Retry only the profile grant
pub async fn reapply_grant(
    State(state): State<EntitlementAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, EntitlementApiError> {
    let cmd = ReapplyGrantCommand {
        user_id: user.id,
        transaction_id: parse_transaction_id(&id)?,
    };

    let reapply = state.reapply.clone();
    let profile = run_to_completion(async move { reapply.handle(cmd).await }).await??;

    Ok(Json(MembershipResponse::from_profile(
        "Membership grant applied",
        &profile,
    )))
}

fn parse_transaction_id(raw: &str) -> Result<TransactionId, EntitlementApiError> {
    raw.parse::<TransactionId>().map_err(|_| {
        EntitlementApiError::from(EntitlementError::validation(
            "transaction_id",
            "must be a UUID",
        ))
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Sweep Trigger
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscriptions/check-expiry - Run one sweep pass
///
/// The whole batch runs before the status is chosen: 200 when every
/// candidate was handled, 500 when any downgrade failed.
pub async fn check_expiry(
    State(state): State<EntitlementAppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, EntitlementApiError> {
    if !state.scheduler_authorized(&headers) {
        warn!("Sweep trigger rejected: bad scheduler token");
        return Err(EntitlementApiError::SchedulerTokenRejected);
    }

    let sweeper = state.sweeper.clone();
    let report = run_to_completion(async move { sweeper.handle().await })
        .await?
        .map_err(EntitlementApiError::Sweep)?;

    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok((status, Json(SweepResponse::from(&report))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Entitlement & Health
// ════════════════════════════════════════════════════════════════════════════════

/// GET /me/entitlement - The gate's decision for the caller
pub async fn my_entitlement(
    State(state): State<EntitlementAppState>,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    let decision = state.gate.check(user.as_ref().map(|u| &u.id)).await;
    Json(EntitlementResponse::from(decision))
}

/// GET /health - Liveness
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts entitlement errors to HTTP responses.
///
/// Store failures map to 400 on the purchase path and 500 elsewhere.
#[derive(Debug)]
pub enum EntitlementApiError {
    Purchase(EntitlementError),
    Sweep(EntitlementError),
    Entitlement(EntitlementError),
    SchedulerTokenRejected,
    /// The spawned task panicked or was cancelled at shutdown.
    Aborted,
}

impl From<EntitlementError> for EntitlementApiError {
    fn from(err: EntitlementError) -> Self {
        Self::Entitlement(err)
    }
}

fn status_for(err: &EntitlementError, store_status: StatusCode) -> StatusCode {
    match err {
        EntitlementError::Unauthorized => StatusCode::UNAUTHORIZED,
        EntitlementError::Validation { .. } => StatusCode::BAD_REQUEST,
        EntitlementError::ProfileNotFound(_) | EntitlementError::TransactionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EntitlementError::InvalidTransactionState { .. } => StatusCode::CONFLICT,
        EntitlementError::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
        EntitlementError::Store { .. } => store_status,
    }
}

impl IntoResponse for EntitlementApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, err) = match self {
            EntitlementApiError::SchedulerTokenRejected => {
                let body = ErrorResponse::new("UNAUTHORIZED", "Invalid scheduler token");
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            EntitlementApiError::Aborted => {
                let body = ErrorResponse::new("INTERNAL_ERROR", "Request did not complete");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
            EntitlementApiError::Purchase(err) => (status_for(&err, StatusCode::BAD_REQUEST), err),
            EntitlementApiError::Sweep(err) | EntitlementApiError::Entitlement(err) => {
                (status_for(&err, StatusCode::INTERNAL_SERVER_ERROR), err)
            }
        };

        if let Some(step) = err.step() {
            error!(step = %step, error = %err, "Entitlement request failed in store");
        }

        (status, Json(ErrorResponse::from(&err))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::memory::{InMemoryProfileRepository, InMemoryTransactionRepository};
    use crate::adapters::payment::MockPaymentConfirmer;
    use crate::domain::foundation::{AuthenticatedUser, Timestamp, UserId};
    use crate::domain::membership::{MembershipType, Profile, StoreStep};
    use axum::http::HeaderValue;
    use axum::response::Response;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("alice").unwrap())
    }

    struct Fixture {
        profiles: InMemoryProfileRepository,
        transactions: InMemoryTransactionRepository,
        payments: MockPaymentConfirmer,
        state: EntitlementAppState,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(ts("2024-01-15T10:00:00Z")));
        let profiles = InMemoryProfileRepository::with_clock(clock.clone());
        let transactions = InMemoryTransactionRepository::with_clock(clock.clone());
        let payments = MockPaymentConfirmer::new();
        let state = EntitlementAppState::new(
            Arc::new(profiles.clone()),
            Arc::new(transactions.clone()),
            Arc::new(payments.clone()),
            clock,
        );
        Fixture {
            profiles,
            transactions,
            payments,
            state,
        }
    }

    fn premium_request() -> PurchaseRequest {
        PurchaseRequest {
            amount: 100_000,
            membership_type: "premium".to_string(),
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Purchase
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn purchase_returns_created_with_expiry() {
        let f = fixture();

        let response = create_transaction(
            State(f.state.clone()),
            OptionalAuth(Some(alice())),
            Ok(Json(premium_request())),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["transaction"]["status"], "success");
        assert_eq!(body["membership_expires_at"], "2024-02-15T10:00:00+00:00");
        assert_eq!(f.transactions.len().await, 1);
    }

    #[tokio::test]
    async fn anonymous_purchase_is_unauthorized_and_writes_nothing() {
        let f = fixture();

        let response = create_transaction(
            State(f.state.clone()),
            OptionalAuth(None),
            Ok(Json(premium_request())),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(f.transactions.is_empty().await);
        assert!(f.profiles.is_empty().await);
    }

    #[tokio::test]
    async fn invalid_amount_is_bad_request() {
        let f = fixture();
        let request = PurchaseRequest {
            amount: 0,
            membership_type: "premium".to_string(),
        };

        let response = create_transaction(State(f.state), OptionalAuth(Some(alice())), Ok(Json(request)))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn declined_payment_is_payment_required() {
        let f = fixture();
        f.payments.push_outcome(crate::ports::PaymentOutcome::declined("card declined"));

        let response = create_transaction(
            State(f.state.clone()),
            OptionalAuth(Some(alice())),
            Ok(Json(premium_request())),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body = json_body(response).await;
        assert_eq!(body["code"], "PAYMENT_FAILED");
        assert!(body["transaction_id"].is_string());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Lookups
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn malformed_transaction_id_is_bad_request() {
        let f = fixture();

        let response = get_transaction(
            State(f.state),
            RequireAuth(alice()),
            Path("not-a-uuid".to_string()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let f = fixture();

        let response = get_transaction(
            State(f.state),
            RequireAuth(alice()),
            Path(TransactionId::new().to_string()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_callers_transactions() {
        let f = fixture();
        create_transaction(
            State(f.state.clone()),
            OptionalAuth(Some(alice())),
            Ok(Json(premium_request())),
        )
        .await
        .into_response();

        let response = list_transactions(State(f.state), RequireAuth(alice()))
            .await
            .into_response();

        let body = json_body(response).await;
        assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Sweep Trigger
    // ════════════════════════════════════════════════════════════════════════════

    async fn seed_stale(profiles: &InMemoryProfileRepository) {
        let mut profile = Profile::new_free(UserId::new("bob").unwrap(), ts("2023-11-01T00:00:00Z"));
        profile.membership_type = MembershipType::Premium;
        profile.membership_expires_at = Some(ts("2024-01-01T00:00:00Z"));
        profiles.seed(profile).await;
    }

    #[tokio::test]
    async fn check_expiry_reports_downgrades() {
        let f = fixture();
        seed_stale(&f.profiles).await;

        let response = check_expiry(State(f.state), HeaderMap::new())
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["expiredCount"], 1);
    }

    #[tokio::test]
    async fn check_expiry_requires_configured_token() {
        let f = fixture();
        let state = f
            .state
            .with_scheduler_token(Some(SecretString::new("s3cret".to_string())));

        let rejected = check_expiry(State(state.clone()), HeaderMap::new())
            .await
            .into_response();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(SCHEDULER_TOKEN_HEADER, HeaderValue::from_static("s3cret"));
        let accepted = check_expiry(State(state), headers).await.into_response();
        assert_eq!(accepted.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_scheduler_token_is_rejected() {
        let f = fixture();
        let state = f
            .state
            .with_scheduler_token(Some(SecretString::new("s3cret".to_string())));
        let mut headers = HeaderMap::new();
        headers.insert(SCHEDULER_TOKEN_HEADER, HeaderValue::from_static("s3cre"));

        let response = check_expiry(State(state), headers).await.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Entitlement
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn entitlement_reflects_purchase() {
        let f = fixture();

        let before = my_entitlement(State(f.state.clone()), OptionalAuth(Some(alice())))
            .await
            .into_response();
        assert_eq!(json_body(before).await["decision"], "no_profile");

        create_transaction(
            State(f.state.clone()),
            OptionalAuth(Some(alice())),
            Ok(Json(premium_request())),
        )
        .await
        .into_response();

        let after = my_entitlement(State(f.state), OptionalAuth(Some(alice())))
            .await
            .into_response();
        let body = json_body(after).await;
        assert_eq!(body["has_premium_access"], true);
        assert_eq!(body["decision"], "granted");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn store_errors_depend_on_the_endpoint() {
        let err = EntitlementError::store(StoreStep::GrantMembership, None, "down");

        let purchase = EntitlementApiError::Purchase(err.clone()).into_response();
        let sweep = EntitlementApiError::Sweep(err.clone()).into_response();
        let other = EntitlementApiError::from(err).into_response();

        assert_eq!(purchase.status(), StatusCode::BAD_REQUEST);
        assert_eq!(sweep.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn panicked_task_is_internal_error() {
        let outcome = run_to_completion(async {
            if true {
                panic!("store driver crashed");
            }
            1u8
        })
        .await;

        let response = outcome.unwrap_err().into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn invalid_state_is_conflict() {
        let err = EntitlementError::InvalidTransactionState {
            id: TransactionId::new(),
            status: "failed".to_string(),
            expected: "success".to_string(),
        };

        let response = EntitlementApiError::from(err).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
