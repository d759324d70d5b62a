//! # REST API for Books
//!
//! Catalogue, buy-now and the profile page.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use shared::{Book as SharedBook, CreateBookForm};
use tracing::info;

use super::auth::CurrentUser;
use super::error::AppError;
use super::mappers::BookMapper;
use super::pages::{self, PageContext};
use super::{BOOKS_PATH, PROFILE_PATH};
use crate::domain::commands::books::{CreateBookCommand, PurchaseOutcome};
use crate::AppState;

async fn render_books(
    state: &AppState,
    user: &CurrentUser,
    form: &CreateBookForm,
    errors: &[String],
) -> Result<Response, AppError> {
    let books = state.book_service.list_books().await?;
    let messages = state.message_service.take(&user.token).await?;
    let ctx = PageContext::for_user(&user.user, &messages);
    let create_form = user.user.is_staff.then_some((form, errors));
    Ok(pages::books_page(&ctx, &books, create_form).into_response())
}

pub async fn list_books(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    render_books(&state, &user, &CreateBookForm::default(), &[]).await
}

pub async fn create_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CreateBookForm>,
) -> Result<Response, AppError> {
    info!("POST /books - user: {}, title: {:?}", user.user.username, form.title);

    let command = CreateBookCommand {
        title: form.title.clone(),
        description: form.description.clone(),
        borrowing_price: form.borrowing_price.clone(),
    };
    match state.book_service.create_book(&user.user, command).await {
        Ok(book) => {
            state
                .message_service
                .success(&user.token, format!("Book \"{}\" was added to the catalogue", book.title))
                .await?;
            Ok(Redirect::to(BOOKS_PATH).into_response())
        }
        Err(e) if e.is_form_error() => render_books(&state, &user, &form, &[e.to_string()]).await,
        Err(e) => Err(e.into()),
    }
}

/// Public JSON listing of the catalogue
pub async fn books_json(State(state): State<AppState>) -> Result<Json<Vec<SharedBook>>, AppError> {
    let books = state.book_service.list_books().await?;
    Ok(Json(books.iter().map(BookMapper::to_dto).collect()))
}

/// Buy a book. The outcome is flashed and the user always lands on the profile page.
pub async fn buy_now(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(book_id): Path<i64>,
) -> Result<Redirect, AppError> {
    info!("POST /transactions/buy_now/{} - user: {}", book_id, user.user.username);

    match state.book_service.buy_now(&user.user, book_id).await? {
        PurchaseOutcome::Purchased { message, .. } => state.message_service.success(&user.token, message).await?,
        PurchaseOutcome::InsufficientBalance { message } => state.message_service.error(&user.token, message).await?,
    }
    Ok(Redirect::to(PROFILE_PATH))
}

pub async fn profile(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let view = state.book_service.profile(&user.user).await?;
    let messages = state.message_service.take(&user.token).await?;
    let ctx = PageContext::for_user(&user.user, &messages);
    Ok(pages::profile_page(&ctx, &user.user, &view).into_response())
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{body_text, form_post, get, test_app};
    use crate::storage::test_utils::seed_book;
    use axum::http::{header, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_buy_now_success_lands_on_profile() {
        let app = test_app().await;
        let token = app.login_as("abel", 100.0).await;
        let book = seed_book(&app.db, "Dracula", 40.0).await;

        let response = app
            .router()
            .oneshot(form_post(&format!("/transactions/buy_now/{}", book.id), "", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/profile");

        let page = body_text(app.router().oneshot(get("/profile", Some(&token))).await.unwrap()).await;
        assert!(page.contains(
            "Successfully purchased the book: Dracula. Amount 40.00$ was withdrawn from your account."
        ));
        assert!(page.contains("<li>Dracula</li>"));
        assert!(page.contains("Balance: 60.00$"));
        assert_eq!(app.mailer.sent()[0].subject, "Book Purchase Confirmation");
    }

    #[tokio::test]
    async fn test_buy_now_insufficient_balance_flashes_error() {
        let app = test_app().await;
        let token = app.login_as("bea", 5.0).await;
        let book = seed_book(&app.db, "Rebecca", 40.0).await;

        let response = app
            .router()
            .oneshot(form_post(&format!("/transactions/buy_now/{}", book.id), "", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/profile");

        let page = body_text(app.router().oneshot(get("/profile", Some(&token))).await.unwrap()).await;
        assert!(page.contains(r#"<li class="error">Insufficient balance to purchase the book: Rebecca.</li>"#));
        assert!(page.contains("Balance: 5.00$"));
    }

    #[tokio::test]
    async fn test_buy_now_is_post_only_and_needs_login() {
        let app = test_app().await;
        let token = app.login_as("cal", 100.0).await;
        let book = seed_book(&app.db, "Walden", 1.0).await;
        let uri = format!("/transactions/buy_now/{}", book.id);

        let via_get = app.router().oneshot(get(&uri, Some(&token))).await.unwrap();
        assert_eq!(via_get.status(), StatusCode::METHOD_NOT_ALLOWED);

        let anonymous = app.router().oneshot(form_post(&uri, "", None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);
        assert!(anonymous.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .starts_with("/accounts/login?next="));

        let unknown = app
            .router()
            .oneshot(form_post("/transactions/buy_now/999", "", Some(&token)))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_staff_can_add_books() {
        let app = test_app().await;
        let reader = app.login_as("dina", 0.0).await;
        let staff = app.login_staff("eli").await;

        let page = body_text(app.router().oneshot(get("/books", Some(&reader))).await.unwrap()).await;
        assert!(!page.contains("Add a book"));

        let refused = app
            .router()
            .oneshot(form_post("/books", "title=Nope&borrowing_price=1", Some(&reader)))
            .await
            .unwrap();
        assert_eq!(refused.status(), StatusCode::FORBIDDEN);

        let invalid = app
            .router()
            .oneshot(form_post("/books", "title=&borrowing_price=1", Some(&staff)))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::OK);
        assert!(body_text(invalid).await.contains("Title is required."));

        let added = app
            .router()
            .oneshot(form_post("/books", "title=Beowulf&description=Epic&borrowing_price=12.5", Some(&staff)))
            .await
            .unwrap();
        assert_eq!(added.status(), StatusCode::SEE_OTHER);

        let listing = body_text(app.router().oneshot(get("/api/books", None)).await.unwrap()).await;
        let books: Vec<shared::Book> = serde_json::from_str(&listing).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Beowulf");
        assert_eq!(books[0].borrowing_price, 12.5);
    }
}
