//! Book catalogue and the buy-now flow.
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::commands::books::{CreateBookCommand, ProfileView, PurchaseOutcome};
use crate::domain::email_service::{EmailTemplate, TransactionMailer};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Account, Book, User};
use crate::domain::transaction_forms::format_amount;
use crate::storage::{AccountRepository, BookRepository, DbConnection, TransactionRepository};

const MAX_TITLE_LEN: usize = 200;

#[derive(Clone)]
pub struct BookService {
    book_repository: BookRepository,
    account_repository: AccountRepository,
    transaction_repository: TransactionRepository,
    mailer: Arc<dyn TransactionMailer>,
}

impl BookService {
    pub fn new(db: DbConnection, mailer: Arc<dyn TransactionMailer>) -> Self {
        Self {
            book_repository: BookRepository::new(db.clone()),
            account_repository: AccountRepository::new(db.clone()),
            transaction_repository: TransactionRepository::new(db),
            mailer,
        }
    }

    pub async fn list_books(&self) -> DomainResult<Vec<Book>> {
        Ok(self.book_repository.list_books().await?)
    }

    pub async fn create_book(&self, user: &User, command: CreateBookCommand) -> DomainResult<Book> {
        if !user.is_staff {
            return Err(DomainError::Forbidden("Only staff members can add books".to_string()));
        }

        let title = command.title.trim();
        if title.is_empty() {
            return Err(DomainError::InvalidForm("Title is required.".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::InvalidForm(format!(
                "Ensure the title has at most {} characters.",
                MAX_TITLE_LEN
            )));
        }
        let price = parse_price(&command.borrowing_price)?;

        let book = self
            .book_repository
            .create_book(title, command.description.trim(), price)
            .await?;
        info!("Book {} ({}) added by {}", book.id, book.title, user.username);
        Ok(book)
    }

    /// Charge the borrowing price and add the book to the user's profile.
    ///
    /// A low balance is not an error: it yields `InsufficientBalance` with the
    /// message to flash.
    pub async fn buy_now(&self, user: &User, book_id: i64) -> DomainResult<PurchaseOutcome> {
        let book = self
            .book_repository
            .get_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Book"))?;
        let account = self.account_for(user).await?;
        let profile = self.book_repository.get_or_create_profile(user.id).await?;

        match self
            .transaction_repository
            .purchase_book(account.id, profile.id, &book)
            .await?
        {
            Some(transaction) => {
                info!(
                    "Account {} bought book {} for {}",
                    account.account_no, book.id, book.borrowing_price
                );
                if let Err(e) = self
                    .mailer
                    .send_transaction_email(user, book.borrowing_price, EmailTemplate::BookPurchase)
                    .await
                {
                    warn!("Failed to send purchase confirmation to {}: {:#}", user.email, e);
                }

                Ok(PurchaseOutcome::Purchased {
                    transaction,
                    message: format!(
                        "Successfully purchased the book: {}. Amount {}$ was withdrawn from your account.",
                        book.title,
                        format_amount(book.borrowing_price)
                    ),
                })
            }
            None => Ok(PurchaseOutcome::InsufficientBalance {
                message: format!("Insufficient balance to purchase the book: {}.", book.title),
            }),
        }
    }

    pub async fn profile(&self, user: &User) -> DomainResult<ProfileView> {
        let account = self.account_for(user).await?;
        let profile = self.book_repository.get_or_create_profile(user.id).await?;
        Ok(ProfileView { account, profile })
    }

    async fn account_for(&self, user: &User) -> DomainResult<Account> {
        self.account_repository
            .get_by_user(user.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account"))
    }
}

/// Borrowing prices may be zero, unlike transaction amounts
fn parse_price(input: &str) -> DomainResult<f64> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Err(DomainError::InvalidForm("Borrowing price is required.".to_string()));
    }

    let price = cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| DomainError::InvalidForm("Enter a valid borrowing price.".to_string()))?;
    if price < 0.0 {
        return Err(DomainError::InvalidForm("Borrowing price cannot be negative.".to_string()));
    }
    Ok((price * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email_service::testing::RecordingMailer;
    use crate::domain::models::TransactionType;
    use crate::storage::test_utils::{seed_account, seed_book};

    async fn setup() -> (DbConnection, BookService, Arc<RecordingMailer>) {
        let db = DbConnection::init_test().await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let service = BookService::new(db.clone(), mailer.clone());
        (db, service, mailer)
    }

    fn book_command(title: &str, price: &str) -> CreateBookCommand {
        CreateBookCommand {
            title: title.to_string(),
            description: "A novel".to_string(),
            borrowing_price: price.to_string(),
        }
    }

    #[tokio::test]
    async fn test_buy_now_with_enough_balance() {
        let (db, service, mailer) = setup().await;
        let (user, _) = seed_account(&db, "kim", 1500.0).await;
        let book = seed_book(&db, "Middlemarch", 1200.0).await;

        let outcome = service.buy_now(&user, book.id).await.unwrap();
        let PurchaseOutcome::Purchased { transaction, message } = outcome else {
            panic!("purchase should succeed");
        };
        assert_eq!(
            message,
            "Successfully purchased the book: Middlemarch. Amount 1,200.00$ was withdrawn from your account."
        );
        assert_eq!(transaction.transaction_type, TransactionType::BorrowBook);
        assert_eq!(transaction.balance_after_transaction, 300.0);

        let view = service.profile(&user).await.unwrap();
        assert_eq!(view.account.balance, 300.0);
        assert!(view.profile.has_book(book.id));

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Book Purchase Confirmation");
        assert_eq!(sent[0].amount, 1200.0);
    }

    #[tokio::test]
    async fn test_buy_now_with_low_balance() {
        let (db, service, mailer) = setup().await;
        let (user, _) = seed_account(&db, "lou", 10.0).await;
        let book = seed_book(&db, "Ulysses", 25.0).await;

        let outcome = service.buy_now(&user, book.id).await.unwrap();
        assert!(matches!(outcome, PurchaseOutcome::InsufficientBalance { .. }));
        assert_eq!(outcome.message(), "Insufficient balance to purchase the book: Ulysses.");

        let view = service.profile(&user).await.unwrap();
        assert_eq!(view.account.balance, 10.0);
        assert!(view.profile.saved_books.is_empty());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_buy_now_exact_balance_and_unknown_book() {
        let (db, service, _) = setup().await;
        let (user, _) = seed_account(&db, "max", 25.0).await;
        let book = seed_book(&db, "Emma", 25.0).await;

        assert!(matches!(
            service.buy_now(&user, book.id).await.unwrap(),
            PurchaseOutcome::Purchased { .. }
        ));
        assert!(matches!(service.buy_now(&user, 4242).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_book_rules() {
        let (db, service, _) = setup().await;
        let (mut user, _) = seed_account(&db, "ned", 0.0).await;

        assert!(matches!(
            service.create_book(&user, book_command("Persuasion", "9")).await,
            Err(DomainError::Forbidden(_))
        ));

        user.is_staff = true;
        assert!(matches!(
            service.create_book(&user, book_command("   ", "9")).await,
            Err(DomainError::InvalidForm(_))
        ));
        assert!(matches!(
            service.create_book(&user, book_command("Persuasion", "-1")).await,
            Err(DomainError::InvalidForm(_))
        ));
        assert!(matches!(
            service.create_book(&user, book_command("Persuasion", "free")).await,
            Err(DomainError::InvalidForm(_))
        ));

        let free = service.create_book(&user, book_command(" Persuasion ", "0")).await.unwrap();
        assert_eq!(free.title, "Persuasion");
        assert_eq!(free.borrowing_price, 0.0);

        let priced = service.create_book(&user, book_command("Beloved", "$1,250.5")).await.unwrap();
        assert_eq!(priced.borrowing_price, 1250.5);

        let titles: Vec<String> = service.list_books().await.unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Beloved".to_string(), "Persuasion".to_string()]);
    }
}
