use std::time::Duration;

use crate::agent::types::PipelineStage;

pub fn release_succeeded(contract_id: &str, transaction_id: &str) -> String {
    format!(
        "Payment for service {contract_id} released successfully. Transaction hash: {transaction_id}"
    )
}

pub fn verification_paused(contract_id: &str, reason: &str) -> String {
    format!(
        "Alert: payment {contract_id} PAUSED. The service was not verified. Reason: {reason}."
    )
}

pub fn oracle_unreachable(contract_id: &str) -> String {
    format!(
        "Alert: the verification system for payment {contract_id} is down or unreachable. Contact support."
    )
}

pub fn release_failed_permanently(contract_id: &str, attempts: u32, error: &str) -> String {
    format!(
        "Payment {contract_id} failed permanently after {attempts} retry attempts due to network errors: {error}"
    )
}

pub fn release_not_retried(contract_id: &str, error: &str) -> String {
    format!(
        "Payment {contract_id} release failed and will not be retried: {error}. Check the ledger before resubmitting."
    )
}

pub fn confirmation_timed_out(contract_id: &str, transaction_id: &str, waited: Duration) -> String {
    format!(
        "Payment {contract_id} was submitted as {transaction_id} but no confirmation arrived within {} ms. Check the ledger before retrying.",
        waited.as_millis()
    )
}

pub fn pipeline_cancelled(
    contract_id: &str,
    stage: PipelineStage,
    transaction_id: Option<&str>,
) -> String {
    match transaction_id {
        Some(transaction_id) => format!(
            "Payment {contract_id} processing was cancelled during {stage}. Transaction {transaction_id} was already submitted and may still finalize. Check the ledger before retrying."
        ),
        None => format!("Payment {contract_id} processing was cancelled during {stage}."),
    }
}

pub fn escrow_refunded(contract_id: &str, reason: &str, transaction_id: &str) -> String {
    format!(
        "Alert: payment {contract_id} ended by MANUAL CANCELLATION. Reason: {reason}. Funds were refunded to the payer. Transaction hash: {transaction_id}"
    )
}

pub fn refund_failed(contract_id: &str, error: &str) -> String {
    format!(
        "Alert: cancellation of payment {contract_id} failed and the funds were NOT refunded: {error}. Contact support."
    )
}

pub fn refund_unconfirmed(contract_id: &str, transaction_id: &str, waited: Duration) -> String {
    format!(
        "Refund for payment {contract_id} was submitted as {transaction_id} but no confirmation arrived within {} ms. Check the ledger before retrying.",
        waited.as_millis()
    )
}
