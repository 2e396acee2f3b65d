use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::WalletLedger;
use crate::domain::wallet::{TransactionView, WalletView};

pub struct WalletService<L> {
    ledger: L,
}

impl<L: WalletLedger> WalletService<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Current balance; creates the wallet lazily with balance 0.
    pub fn balance(&self, user_id: Uuid, business_id: Uuid) -> Result<WalletView, DomainError> {
        self.ledger.get_or_create(user_id, business_id)
    }

    pub fn deposit(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        amount: BigDecimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletView, DomainError> {
        self.ledger
            .credit(user_id, business_id, amount, description, reference_id)
    }

    pub fn withdraw(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        amount: BigDecimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletView, DomainError> {
        self.ledger
            .debit(user_id, business_id, amount, description, reference_id)
    }

    pub fn transactions(&self, wallet_id: Uuid) -> Result<Vec<TransactionView>, DomainError> {
        self.ledger.transactions(wallet_id)
    }
}
