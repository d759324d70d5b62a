//! # REST API for Transactions
//!
//! Deposit, withdraw and loan request forms, the report (HTML and JSON) and
//! the loan pages.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use shared::{AmountForm, TransactionReportRequest, TransactionReportResponse};
use tracing::{info, warn};

use super::auth::CurrentUser;
use super::error::AppError;
use super::mappers::TransactionMapper;
use super::pages::{self, PageContext};
use super::{LOANS_PATH, REPORT_PATH};
use crate::domain::commands::transactions::{ReportQuery, TransactionReceipt};
use crate::domain::{DomainError, DomainResult};
use crate::AppState;

#[derive(Debug, Clone, Copy)]
enum AmountFormKind {
    Deposit,
    Withdraw,
    LoanRequest,
}

impl AmountFormKind {
    fn title(self) -> &'static str {
        match self {
            AmountFormKind::Deposit => "Deposit",
            AmountFormKind::Withdraw => "Withdraw Money",
            AmountFormKind::LoanRequest => "Request For Loan",
        }
    }

    fn action(self) -> &'static str {
        match self {
            AmountFormKind::Deposit => "/transactions/deposit",
            AmountFormKind::Withdraw => "/transactions/withdraw",
            AmountFormKind::LoanRequest => "/transactions/loan_request",
        }
    }
}

async fn render_amount_form(
    state: &AppState,
    user: &CurrentUser,
    kind: AmountFormKind,
    amount: &str,
    errors: &[String],
) -> Result<Response, AppError> {
    let messages = state.message_service.take(&user.token).await?;
    let ctx = PageContext::for_user(&user.user, &messages);
    Ok(pages::amount_form_page(&ctx, kind.title(), kind.action(), amount, errors).into_response())
}

/// Redirect to the report on success, re-render the form on a form error
async fn finish_amount_form(
    state: &AppState,
    user: &CurrentUser,
    kind: AmountFormKind,
    form: &AmountForm,
    result: DomainResult<TransactionReceipt>,
) -> Result<Response, AppError> {
    match result {
        Ok(receipt) => {
            state.message_service.success(&user.token, receipt.success_message).await?;
            Ok(Redirect::to(REPORT_PATH).into_response())
        }
        Err(e) if e.is_form_error() => {
            info!("{} form rejected for {}: {}", kind.title(), user.user.username, e);
            render_amount_form(state, user, kind, &form.amount, &[e.to_string()]).await
        }
        Err(e) => {
            warn!("{} failed for {}: {}", kind.title(), user.user.username, e);
            Err(e.into())
        }
    }
}

pub async fn deposit_form(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    render_amount_form(&state, &user, AmountFormKind::Deposit, "", &[]).await
}

pub async fn deposit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<AmountForm>,
) -> Result<Response, AppError> {
    info!("POST /transactions/deposit - user: {}, amount: {:?}", user.user.username, form.amount);
    let result = state.transaction_service.deposit(&user.user, &form.amount).await;
    finish_amount_form(&state, &user, AmountFormKind::Deposit, &form, result).await
}

pub async fn withdraw_form(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    render_amount_form(&state, &user, AmountFormKind::Withdraw, "", &[]).await
}

pub async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<AmountForm>,
) -> Result<Response, AppError> {
    info!("POST /transactions/withdraw - user: {}, amount: {:?}", user.user.username, form.amount);
    let result = state.transaction_service.withdraw(&user.user, &form.amount).await;
    finish_amount_form(&state, &user, AmountFormKind::Withdraw, &form, result).await
}

pub async fn loan_request_form(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    render_amount_form(&state, &user, AmountFormKind::LoanRequest, "", &[]).await
}

/// Over the approved-loan limit this answers 403 with a plain-text body
pub async fn loan_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<AmountForm>,
) -> Result<Response, AppError> {
    info!("POST /transactions/loan_request - user: {}, amount: {:?}", user.user.username, form.amount);
    let result = state.transaction_service.request_loan(&user.user, &form.amount).await;
    finish_amount_form(&state, &user, AmountFormKind::LoanRequest, &form, result).await
}

fn report_query(request: TransactionReportRequest) -> ReportQuery {
    ReportQuery {
        start_date: request.start_date,
        end_date: request.end_date,
    }
}

pub async fn report(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TransactionReportRequest>,
) -> Result<Response, AppError> {
    let report = state.transaction_service.report(&user.user, report_query(query)).await?;
    let messages = state.message_service.take(&user.token).await?;
    let ctx = PageContext::for_user(&user.user, &messages);
    Ok(pages::report_page(&ctx, &report).into_response())
}

/// JSON version of the report
pub async fn report_json(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TransactionReportRequest>,
) -> Result<Json<TransactionReportResponse>, AppError> {
    info!("GET /api/transactions - user: {}, query: {:?}", user.user.username, query);
    let report = state.transaction_service.report(&user.user, report_query(query)).await?;
    Ok(Json(TransactionMapper::report_to_dto(&report)))
}

pub async fn loans(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let loans = state.transaction_service.list_loans(&user.user).await?;
    let pending = if user.user.is_staff {
        Some(state.transaction_service.pending_loans(&user.user).await?)
    } else {
        None
    };

    let messages = state.message_service.take(&user.token).await?;
    let ctx = PageContext::for_user(&user.user, &messages);
    Ok(pages::loans_page(&ctx, &loans, pending.as_deref()).into_response())
}

pub async fn pay_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(loan_id): Path<i64>,
) -> Result<Redirect, AppError> {
    info!("POST /transactions/loans/{}/pay - user: {}", loan_id, user.user.username);

    match state.transaction_service.pay_loan(&user.user, loan_id).await {
        Ok(receipt) => state.message_service.success(&user.token, receipt.success_message).await?,
        Err(e @ (DomainError::LoanExceedsBalance { .. } | DomainError::LoanNotApproved)) => {
            state.message_service.error(&user.token, e.to_string()).await?
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to(LOANS_PATH))
}

pub async fn approve_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(loan_id): Path<i64>,
) -> Result<Redirect, AppError> {
    info!("POST /transactions/loans/{}/approve - user: {}", loan_id, user.user.username);

    let receipt = state.transaction_service.approve_loan(&user.user, loan_id).await?;
    state.message_service.success(&user.token, receipt.success_message).await?;
    Ok(Redirect::to(LOANS_PATH))
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{body_text, form_post, get, test_app};
    use axum::http::{header, StatusCode};
    use shared::TransactionReportResponse;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_anonymous_user_is_sent_to_login() {
        let app = test_app().await;
        let response = app.router().oneshot(get("/transactions/deposit", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/accounts/login?next=%2Ftransactions%2Fdeposit"
        );
    }

    #[tokio::test]
    async fn test_deposit_redirects_and_flashes_on_report() {
        let app = test_app().await;
        let token = app.login_as("sofia", 0.0).await;

        let response = app
            .router()
            .oneshot(form_post("/transactions/deposit", "amount=2500", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/transactions/report");

        let report = body_text(app.router().oneshot(get("/transactions/report", Some(&token))).await.unwrap()).await;
        assert!(report.contains("2,500.00$ was deposited to your account successfully"));
        assert!(report.contains("Balance: 2,500.00$"));

        // The flash message is shown once
        let again = body_text(app.router().oneshot(get("/transactions/report", Some(&token))).await.unwrap()).await;
        assert!(!again.contains("was deposited"));

        assert_eq!(app.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_form_errors_rerender_with_200() {
        let app = test_app().await;
        let token = app.login_as("tariq", 1000.0).await;

        let low = app
            .router()
            .oneshot(form_post("/transactions/deposit", "amount=50", Some(&token)))
            .await
            .unwrap();
        assert_eq!(low.status(), StatusCode::OK);
        assert!(body_text(low).await.contains("You need to deposit at least 100 $"));

        let over = app
            .router()
            .oneshot(form_post("/transactions/withdraw", "amount=1500", Some(&token)))
            .await
            .unwrap();
        assert_eq!(over.status(), StatusCode::OK);
        assert!(body_text(over)
            .await
            .contains("You have 1000.00 $ in your account. You can not withdraw more than your account balance"));

        let garbage = app
            .router()
            .oneshot(form_post("/transactions/withdraw", "amount=lots", Some(&token)))
            .await
            .unwrap();
        assert_eq!(garbage.status(), StatusCode::OK);
        assert!(body_text(garbage).await.contains("Enter a number."));
    }

    #[tokio::test]
    async fn test_loan_limit_is_plain_403() {
        let app = test_app().await;
        let token = app.login_as("uma", 0.0).await;
        let staff = app.login_staff("vera").await;

        for id in 1..=3 {
            let response = app
                .router()
                .oneshot(form_post("/transactions/loan_request", "amount=1000", Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);

            let approve = app
                .router()
                .oneshot(form_post(&format!("/transactions/loans/{}/approve", id), "", Some(&staff)))
                .await
                .unwrap();
            assert_eq!(approve.status(), StatusCode::SEE_OTHER);
        }

        let refused = app
            .router()
            .oneshot(form_post("/transactions/loan_request", "amount=1000", Some(&token)))
            .await
            .unwrap();
        assert_eq!(refused.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(refused).await, "You have crossed the loan limits");
    }

    #[tokio::test]
    async fn test_approve_requires_staff() {
        let app = test_app().await;
        let token = app.login_as("wade", 0.0).await;
        app.router()
            .oneshot(form_post("/transactions/loan_request", "amount=700", Some(&token)))
            .await
            .unwrap();

        let response = app
            .router()
            .oneshot(form_post("/transactions/loans/1/approve", "", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_pay_loan_flashes_refusal() {
        let app = test_app().await;
        let token = app.login_as("xena", 0.0).await;
        let staff = app.login_staff("yuri").await;

        app.router()
            .oneshot(form_post("/transactions/loan_request", "amount=800", Some(&token)))
            .await
            .unwrap();
        app.router()
            .oneshot(form_post("/transactions/loans/1/approve", "", Some(&staff)))
            .await
            .unwrap();

        let pay = app
            .router()
            .oneshot(form_post("/transactions/loans/1/pay", "", Some(&token)))
            .await
            .unwrap();
        assert_eq!(pay.status(), StatusCode::SEE_OTHER);
        assert_eq!(pay.headers()[header::LOCATION], "/transactions/loans");

        let page = body_text(app.router().oneshot(get("/transactions/loans", Some(&token))).await.unwrap()).await;
        assert!(page.contains("Loan amount is greater than available balance"));

        let missing = app
            .router()
            .oneshot(form_post("/transactions/loans/99/pay", "", Some(&token)))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_report_json_and_invalid_dates() {
        let app = test_app().await;
        let token = app.login_as("zane", 300.0).await;

        let response = app
            .router()
            .oneshot(get("/api/transactions", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report: TransactionReportResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(report.balance, 300.0);
        assert_eq!(report.transactions.len(), 1);
        assert!(report.start_date.is_none());

        let bad = app
            .router()
            .oneshot(get("/transactions/report?start_date=yesterday&end_date=2024-01-01", Some(&token)))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }
}
