//! Transaction service domain logic for the library bank.
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::TransactionLimits;
use crate::domain::commands::transactions::{ReportQuery, TransactionReceipt, TransactionReport};
use crate::domain::email_service::{EmailTemplate, TransactionMailer};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Account, NewTransaction, Transaction, TransactionType, User};
use crate::domain::transaction_forms::{format_amount, parse_amount, TransactionForms};
use crate::storage::{AccountRepository, DbConnection, LoanRequestOutcome, PayLoanOutcome, TransactionRepository};

const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct TransactionService {
    account_repository: AccountRepository,
    transaction_repository: TransactionRepository,
    forms: TransactionForms,
    mailer: Arc<dyn TransactionMailer>,
}

impl TransactionService {
    pub fn new(db: DbConnection, limits: TransactionLimits, mailer: Arc<dyn TransactionMailer>) -> Self {
        Self {
            account_repository: AccountRepository::new(db.clone()),
            transaction_repository: TransactionRepository::new(db),
            forms: TransactionForms::new(limits),
            mailer,
        }
    }

    pub fn limits(&self) -> &TransactionLimits {
        self.forms.limits()
    }

    pub async fn deposit(&self, user: &User, raw_amount: &str) -> DomainResult<TransactionReceipt> {
        let amount = self.forms.validate_deposit(parse_amount(raw_amount)?)?;
        let account = self.account_for(user).await?;

        let transaction = self
            .transaction_repository
            .post_transaction(&NewTransaction::new(account.id, amount, TransactionType::Deposit))
            .await?
            .ok_or_else(|| anyhow::anyhow!("Deposit to account {} was rejected", account.account_no))?;

        info!(
            "Deposited {} to account {} (balance {})",
            amount, account.account_no, transaction.balance_after_transaction
        );
        self.notify(user, amount, EmailTemplate::Deposit).await;

        Ok(TransactionReceipt {
            transaction,
            success_message: format!("{}$ was deposited to your account successfully", format_amount(amount)),
        })
    }

    pub async fn withdraw(&self, user: &User, raw_amount: &str) -> DomainResult<TransactionReceipt> {
        let amount = parse_amount(raw_amount)?;
        let account = self.account_for(user).await?;
        self.forms.validate_withdraw(amount, account.balance)?;

        // The balance may have moved since it was read; the posting re-checks it
        let Some(transaction) = self
            .transaction_repository
            .post_transaction(&NewTransaction::new(account.id, amount, TransactionType::Withdrawal))
            .await?
        else {
            let balance = self.account_for(user).await?.balance;
            return Err(DomainError::InsufficientFunds { balance });
        };

        info!(
            "Withdrew {} from account {} (balance {})",
            amount, account.account_no, transaction.balance_after_transaction
        );
        self.notify(user, amount, EmailTemplate::Withdrawal).await;

        Ok(TransactionReceipt {
            transaction,
            success_message: format!("Successfully withdrawn {}$ from your account", format_amount(amount)),
        })
    }

    /// Record a pending loan unless the account holds too many approved loans
    pub async fn request_loan(&self, user: &User, raw_amount: &str) -> DomainResult<TransactionReceipt> {
        let amount = parse_amount(raw_amount)?;
        let account = self.account_for(user).await?;
        let limit = self.limits().max_approved_loans;

        let new = NewTransaction::new(account.id, amount, TransactionType::Loan);
        match self.transaction_repository.request_loan(&new, limit).await? {
            LoanRequestOutcome::Recorded(transaction) => {
                info!("Loan request of {} recorded for account {}", amount, account.account_no);
                Ok(TransactionReceipt {
                    transaction,
                    success_message: format!("Loan request for {}$ submitted successfully", format_amount(amount)),
                })
            }
            LoanRequestOutcome::LimitReached { approved } => {
                warn!(
                    "Loan request refused for account {}: {} approved loans",
                    account.account_no, approved
                );
                Err(DomainError::LoanLimitReached { limit })
            }
        }
    }

    /// Transactions of the user's account, optionally for a date range.
    ///
    /// The range only applies when both dates are given. Empty strings count as
    /// missing, as submitted by an empty filter form.
    pub async fn report(&self, user: &User, query: ReportQuery) -> DomainResult<TransactionReport> {
        let account = self.account_for(user).await?;
        let range = parse_report_range(&query)?;

        let transactions = self.transaction_repository.list_for_account(account.id, range).await?;
        let balance = match range {
            Some((start, end)) => self.transaction_repository.sum_amount(account.id, start, end).await?,
            None => account.balance,
        };

        Ok(TransactionReport {
            account,
            balance,
            range,
            transactions,
        })
    }

    pub async fn list_loans(&self, user: &User) -> DomainResult<Vec<Transaction>> {
        let account = self.account_for(user).await?;
        Ok(self.transaction_repository.list_loans(account.id).await?)
    }

    /// Loans of all accounts awaiting approval. Staff only.
    pub async fn pending_loans(&self, staff: &User) -> DomainResult<Vec<Transaction>> {
        require_staff(staff, "Only staff members can review loan requests")?;
        Ok(self.transaction_repository.list_pending_loans().await?)
    }

    pub async fn pay_loan(&self, user: &User, loan_id: i64) -> DomainResult<TransactionReceipt> {
        let account = self.account_for(user).await?;

        match self.transaction_repository.pay_loan(account.id, loan_id).await? {
            PayLoanOutcome::Paid(transaction) => {
                info!("Loan {} paid from account {}", loan_id, account.account_no);
                let success_message = format!(
                    "Loan of {}$ was paid back successfully",
                    format_amount(transaction.amount)
                );
                Ok(TransactionReceipt {
                    transaction,
                    success_message,
                })
            }
            PayLoanOutcome::NotFound => Err(DomainError::not_found("Loan")),
            PayLoanOutcome::NotApproved => Err(DomainError::LoanNotApproved),
            PayLoanOutcome::InsufficientBalance { balance } => Err(DomainError::LoanExceedsBalance { balance }),
        }
    }

    /// Approve a pending loan and credit it to the borrower. Staff only.
    pub async fn approve_loan(&self, staff: &User, loan_id: i64) -> DomainResult<TransactionReceipt> {
        require_staff(staff, "Only staff members can approve loans")?;

        let transaction = self
            .transaction_repository
            .approve_loan(loan_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Pending loan"))?;

        info!("Loan {} approved by {}", loan_id, staff.username);
        let success_message = format!(
            "Loan #{} for {}$ approved",
            transaction.id,
            format_amount(transaction.amount)
        );
        Ok(TransactionReceipt {
            transaction,
            success_message,
        })
    }

    async fn account_for(&self, user: &User) -> DomainResult<Account> {
        self.account_repository
            .get_by_user(user.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account"))
    }

    async fn notify(&self, user: &User, amount: f64, template: EmailTemplate) {
        if let Err(e) = self.mailer.send_transaction_email(user, amount, template).await {
            warn!("Failed to send '{}' email to {}: {:#}", template.subject(), user.email, e);
        }
    }
}

fn require_staff(user: &User, message: &str) -> DomainResult<()> {
    if user.is_staff {
        Ok(())
    } else {
        Err(DomainError::Forbidden(message.to_string()))
    }
}

fn parse_report_range(query: &ReportQuery) -> DomainResult<Option<(NaiveDate, NaiveDate)>> {
    let start = query.start_date.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let end = query.end_date.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match (start, end) {
        (Some(start), Some(end)) => Ok(Some((parse_report_date(start)?, parse_report_date(end)?))),
        _ => Ok(None),
    }
}

fn parse_report_date(value: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(value, REPORT_DATE_FORMAT).map_err(|_| DomainError::InvalidDate(value.to_string()))
}
