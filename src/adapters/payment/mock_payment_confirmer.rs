//! Mock payment confirmer for testing.
//!
//! Supports:
//! - Scripted outcomes, consumed in order
//! - Error injection
//! - Call tracking
//! - Artificial latency, to widen race windows in concurrency tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::TransactionId;
use crate::domain::membership::Transaction;
use crate::ports::{PaymentConfirmer, PaymentError, PaymentOutcome};

/// Mock payment confirmer.
///
/// Answers `Approved` unless an outcome or error was queued.
///
/// ```ignore
/// let mock = MockPaymentConfirmer::new();
/// mock.push_outcome(PaymentOutcome::declined("insufficient funds"));
/// mock.push_error(PaymentError::network("timeout"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentConfirmer {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    scripted: VecDeque<Result<PaymentOutcome, PaymentError>>,
    calls: Vec<TransactionId>,
    delay: Option<Duration>,
}

impl MockPaymentConfirmer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that declines every transaction with `reason`.
    pub fn declining(reason: &str, times: usize) -> Self {
        let mock = Self::new();
        for _ in 0..times {
            mock.push_outcome(PaymentOutcome::declined(reason));
        }
        mock
    }

    /// Sleeps for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    /// Queue the outcome of a future call.
    pub fn push_outcome(&self, outcome: PaymentOutcome) {
        self.state().scripted.push_back(Ok(outcome));
    }

    /// Queue a transport error for a future call.
    pub fn push_error(&self, error: PaymentError) {
        self.state().scripted.push_back(Err(error));
    }

    /// Transactions confirmed so far, in call order.
    pub fn calls(&self) -> Vec<TransactionId> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PaymentConfirmer for MockPaymentConfirmer {
    async fn confirm(&self, transaction: &Transaction) -> Result<PaymentOutcome, PaymentError> {
        let (answer, delay) = {
            let mut state = self.state();
            state.calls.push(transaction.id);
            let answer = state
                .scripted
                .pop_front()
                .unwrap_or(Ok(PaymentOutcome::Approved));
            (answer, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}
