use serde::{Deserialize, Serialize};

use crate::request::ContractId;

pub type TransactionId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_id: TransactionId,
    pub contract_id: ContractId,
}
