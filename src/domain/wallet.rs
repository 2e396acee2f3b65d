use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Ledger entry kinds. Amounts are always stored as positive magnitudes; the
/// type carries the sign's meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Refund,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Refund => "refund",
            TransactionType::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            "refund" => Some(TransactionType::Refund),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }

    /// +1 for entries that increase the balance, -1 for entries that decrease
    /// it. Summing `signum() * amount` over a wallet's log must reproduce its
    /// current balance.
    pub fn signum(&self) -> i64 {
        match self {
            TransactionType::Deposit | TransactionType::Refund => 1,
            TransactionType::Withdrawal | TransactionType::Adjustment => -1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalletView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub balance: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct TransactionView {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: BigDecimal,
    pub tx_type: TransactionType,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}
