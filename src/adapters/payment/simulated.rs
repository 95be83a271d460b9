//! Simulated payment confirmation.

use async_trait::async_trait;

use crate::domain::membership::Transaction;
use crate::ports::{PaymentConfirmer, PaymentError, PaymentOutcome};

/// Approves every transaction.
///
/// Stands in for the payment gateway until a real integration is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPaymentConfirmer;

impl SimulatedPaymentConfirmer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentConfirmer for SimulatedPaymentConfirmer {
    async fn confirm(&self, transaction: &Transaction) -> Result<PaymentOutcome, PaymentError> {
        tracing::debug!(
            transaction_id = %transaction.id,
            amount = transaction.amount,
            "Simulated payment approved"
        );
        Ok(PaymentOutcome::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::membership::MembershipType;

    #[tokio::test]
    async fn approves_everything() {
        let tx = Transaction::new_pending(
            UserId::new("u").unwrap(),
            1,
            MembershipType::Premium,
            Timestamp::now(),
        )
        .unwrap();

        let outcome = SimulatedPaymentConfirmer::new().confirm(&tx).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::Approved);
    }
}
