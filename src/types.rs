use serde::Serialize;
use serde_json::Value;

/// One fee payment matched to the target recipient.
///
/// Field names are the schema of `fees_detailed.json`. `bps` is kept as a
/// raw JSON value since the API serves it as either a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeRecord {
    pub request_id: String,
    pub user: String,
    pub amount_usd: f64,
    pub amount: String,
    pub bps: Value,
    pub created_at: String,
}

/// Aggregated outcome of one wallet's pagination run.
#[derive(Debug, Clone)]
pub struct WalletResult {
    pub wallet: String,
    pub fees: Vec<FeeRecord>,
    pub tx_count: usize,
    pub total_amount: f64,
}

impl WalletResult {
    /// Build a result from extracted fees, deriving the count and the total.
    pub fn new(wallet: String, fees: Vec<FeeRecord>) -> Self {
        let tx_count = fees.len();
        // f64's `Sum` seeds with -0.0; an empty fee list would render "$-0.00".
        let total_amount = fees.iter().fold(0.0, |acc, fee| acc + fee.amount_usd);
        Self {
            wallet,
            fees,
            tx_count,
            total_amount,
        }
    }

    /// Zero-valued result for a wallet whose task produced nothing.
    pub fn empty(wallet: String) -> Self {
        Self::new(wallet, Vec::new())
    }
}
