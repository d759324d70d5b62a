use crate::domain::commands::transactions::TransactionReport;
use crate::domain::models::transaction::{format_timestamp, Transaction as DomainTransaction};
use shared::{Transaction as SharedTransaction, TransactionReportResponse};

pub struct TransactionMapper;

impl TransactionMapper {
    /// Ledger rows only know their account id; the DTO carries the account number
    pub fn to_dto(domain: &DomainTransaction, account_no: i64) -> SharedTransaction {
        SharedTransaction {
            id: domain.id,
            account_no,
            amount: domain.amount,
            balance_after_transaction: domain.balance_after_transaction,
            transaction_type: domain.transaction_type,
            timestamp: format_timestamp(&domain.timestamp),
            loan_approve: domain.loan_approve,
        }
    }

    pub fn report_to_dto(report: &TransactionReport) -> TransactionReportResponse {
        let account_no = report.account.account_no;
        let (start_date, end_date) = match report.range {
            Some((start, end)) => (
                Some(start.format("%Y-%m-%d").to_string()),
                Some(end.format("%Y-%m-%d").to_string()),
            ),
            None => (None, None),
        };

        TransactionReportResponse {
            account_no,
            balance: report.balance,
            start_date,
            end_date,
            transactions: report
                .transactions
                .iter()
                .map(|t| Self::to_dto(t, account_no))
                .collect(),
        }
    }
}
