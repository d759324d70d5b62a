//! Server-rendered HTML pages.
//!
//! Every interpolated value goes through `escape_html`.
use axum::response::Html;
use shared::{CreateBookForm, FlashMessage, RegisterForm};

use super::{BOOKS_PATH, LOANS_PATH, LOGIN_PATH, LOGOUT_PATH, PROFILE_PATH, REGISTER_PATH, REPORT_PATH};
use crate::domain::commands::books::ProfileView;
use crate::domain::commands::transactions::TransactionReport;
use crate::domain::email_service::escape_html;
use crate::domain::format_amount;
use crate::domain::models::{Book, Transaction, TransactionType, User};

/// Who is looking at the page and what they should be told
pub struct PageContext<'a> {
    pub user: Option<&'a User>,
    pub messages: &'a [FlashMessage],
}

impl<'a> PageContext<'a> {
    pub fn anonymous() -> Self {
        Self { user: None, messages: &[] }
    }

    pub fn for_user(user: &'a User, messages: &'a [FlashMessage]) -> Self {
        Self {
            user: Some(user),
            messages,
        }
    }
}

fn layout(title: &str, ctx: &PageContext<'_>, body: &str) -> Html<String> {
    let nav = match ctx.user {
        Some(user) => format!(
            r#"<a href="{report}">Report</a> <a href="/transactions/deposit">Deposit</a> <a href="/transactions/withdraw">Withdraw</a> <a href="/transactions/loan_request">Loan request</a> <a href="{loans}">Loans</a> <a href="{books}">Books</a> <a href="{profile}">Profile</a>
<form method="post" action="{logout}" class="inline"><button type="submit">Log out {name}</button></form>"#,
            report = REPORT_PATH,
            loans = LOANS_PATH,
            books = BOOKS_PATH,
            profile = PROFILE_PATH,
            logout = LOGOUT_PATH,
            name = escape_html(&user.username),
        ),
        None => format!(
            r#"<a href="{}">Log in</a> <a href="{}">Register</a>"#,
            LOGIN_PATH, REGISTER_PATH
        ),
    };

    let messages: String = ctx
        .messages
        .iter()
        .map(|m| format!(r#"<li class="{}">{}</li>"#, m.level.as_str(), escape_html(&m.text)))
        .collect();
    let messages = if messages.is_empty() {
        String::new()
    } else {
        format!(r#"<ul class="messages">{}</ul>"#, messages)
    };

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title} | BookBank</title>\n</head>\n<body>\n<nav>{nav}</nav>\n{messages}\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape_html(title),
        nav = nav,
        messages = messages,
        body = body,
    ))
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors.iter().map(|e| format!("<li>{}</li>", escape_html(e))).collect();
    format!(r#"<ul class="errorlist">{}</ul>"#, items)
}

pub fn login_page(next: &str, username: &str, errors: &[String]) -> Html<String> {
    let body = format!(
        r#"{errors}<form method="post" action="{action}">
<input type="hidden" name="next" value="{next}">
<label>Username <input type="text" name="username" value="{username}" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>"#,
        errors = error_list(errors),
        action = LOGIN_PATH,
        next = escape_html(next),
        username = escape_html(username),
    );
    layout("Log in", &PageContext::anonymous(), &body)
}

pub fn register_page(form: &RegisterForm, errors: &[String]) -> Html<String> {
    let body = format!(
        r#"{errors}<form method="post" action="{action}">
<label>Username <input type="text" name="username" value="{username}" required></label>
<label>Email <input type="email" name="email" value="{email}" required></label>
<label>First name <input type="text" name="first_name" value="{first_name}"></label>
<label>Last name <input type="text" name="last_name" value="{last_name}"></label>
<label>Password <input type="password" name="password" required></label>
<label>Confirm password <input type="password" name="confirm_password" required></label>
<button type="submit">Register</button>
</form>"#,
        errors = error_list(errors),
        action = REGISTER_PATH,
        username = escape_html(&form.username),
        email = escape_html(&form.email),
        first_name = escape_html(&form.first_name),
        last_name = escape_html(&form.last_name),
    );
    layout("Register", &PageContext::anonymous(), &body)
}

/// Shared page for the deposit, withdraw and loan request forms
pub fn amount_form_page(ctx: &PageContext<'_>, title: &str, action: &str, amount: &str, errors: &[String]) -> Html<String> {
    let body = format!(
        r#"{errors}<form method="post" action="{action}">
<label>Amount <input type="text" name="amount" value="{amount}" required></label>
<button type="submit">Submit</button>
</form>"#,
        errors = error_list(errors),
        action = action,
        amount = escape_html(amount),
    );
    layout(title, ctx, &body)
}

fn transaction_rows(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|t| {
            let approval = match t.transaction_type {
                TransactionType::Loan if t.loan_approve => "Approved",
                TransactionType::Loan => "Pending",
                _ => "",
            };
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}$</td><td>{}$</td><td>{}</td></tr>",
                t.timestamp.format("%Y-%m-%d %H:%M"),
                t.transaction_type.label(),
                format_amount(t.amount),
                format_amount(t.balance_after_transaction),
                approval
            )
        })
        .collect()
}

pub fn report_page(ctx: &PageContext<'_>, report: &TransactionReport) -> Html<String> {
    let (start, end) = match report.range {
        Some((start, end)) => (start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string()),
        None => (String::new(), String::new()),
    };

    let table = if report.transactions.is_empty() {
        "<p>No transactions found.</p>".to_string()
    } else {
        format!(
            "<table>\n<thead><tr><th>Date</th><th>Type</th><th>Amount</th><th>Balance after</th><th>Loan</th></tr></thead>\n<tbody>{}</tbody>\n</table>",
            transaction_rows(&report.transactions)
        )
    };

    let body = format!(
        r#"<form method="get" action="{action}">
<label>From <input type="date" name="start_date" value="{start}"></label>
<label>To <input type="date" name="end_date" value="{end}"></label>
<button type="submit">Filter</button>
</form>
<p>Account No: {account_no}</p>
<p>Balance: {balance}$</p>
{table}"#,
        action = REPORT_PATH,
        start = start,
        end = end,
        account_no = report.account.account_no,
        balance = format_amount(report.balance),
        table = table,
    );
    layout("Transaction Report", ctx, &body)
}

/// The user's loans, plus the approval queue for staff
pub fn loans_page(ctx: &PageContext<'_>, loans: &[Transaction], pending: Option<&[Transaction]>) -> Html<String> {
    let rows: String = loans
        .iter()
        .map(|loan| {
            let action = if loan.is_approved_loan() {
                format!(
                    r#"<form method="post" action="{}/{}/pay"><button type="submit">Pay</button></form>"#,
                    LOANS_PATH, loan.id
                )
            } else {
                "Pending approval".to_string()
            };
            format!(
                "<tr><td>{}</td><td>{}$</td><td>{}</td></tr>",
                loan.timestamp.format("%Y-%m-%d %H:%M"),
                format_amount(loan.amount),
                action
            )
        })
        .collect();

    let mut body = if loans.is_empty() {
        "<p>You have no loans.</p>".to_string()
    } else {
        format!(
            "<table>\n<thead><tr><th>Requested</th><th>Amount</th><th></th></tr></thead>\n<tbody>{}</tbody>\n</table>",
            rows
        )
    };

    if let Some(pending) = pending {
        let rows: String = pending
            .iter()
            .map(|loan| {
                format!(
                    r#"<tr><td>#{id}</td><td>{date}</td><td>{amount}$</td><td><form method="post" action="{loans}/{id}/approve"><button type="submit">Approve</button></form></td></tr>"#,
                    id = loan.id,
                    date = loan.timestamp.format("%Y-%m-%d %H:%M"),
                    amount = format_amount(loan.amount),
                    loans = LOANS_PATH,
                )
            })
            .collect();
        body.push_str("\n<h2>Pending loan requests</h2>\n");
        if pending.is_empty() {
            body.push_str("<p>No loan requests are waiting.</p>");
        } else {
            body.push_str(&format!("<table><tbody>{}</tbody></table>", rows));
        }
    }

    layout("Loans", ctx, &body)
}

pub fn books_page(ctx: &PageContext<'_>, books: &[Book], create_form: Option<(&CreateBookForm, &[String])>) -> Html<String> {
    let items: String = books
        .iter()
        .map(|book| {
            format!(
                r#"<li><strong>{title}</strong> {price}$<p>{description}</p><form method="post" action="/transactions/buy_now/{id}"><button type="submit">Buy now</button></form></li>"#,
                title = escape_html(&book.title),
                price = format_amount(book.borrowing_price),
                description = escape_html(&book.description),
                id = book.id,
            )
        })
        .collect();

    let mut body = if books.is_empty() {
        "<p>The catalogue is empty.</p>".to_string()
    } else {
        format!(r#"<ul class="books">{}</ul>"#, items)
    };

    if let Some((form, errors)) = create_form {
        body.push_str(&format!(
            r#"
<h2>Add a book</h2>
{errors}<form method="post" action="{action}">
<label>Title <input type="text" name="title" value="{title}" required></label>
<label>Description <textarea name="description">{description}</textarea></label>
<label>Borrowing price <input type="text" name="borrowing_price" value="{price}" required></label>
<button type="submit">Add</button>
</form>"#,
            errors = error_list(errors),
            action = BOOKS_PATH,
            title = escape_html(&form.title),
            description = escape_html(&form.description),
            price = escape_html(&form.borrowing_price),
        ));
    }

    layout("Books", ctx, &body)
}

pub fn profile_page(ctx: &PageContext<'_>, user: &User, view: &ProfileView) -> Html<String> {
    let books: String = view
        .profile
        .saved_books
        .iter()
        .map(|b| format!("<li>{}</li>", escape_html(&b.title)))
        .collect();
    let books = if books.is_empty() {
        "<p>You have not bought any books yet.</p>".to_string()
    } else {
        format!("<ul>{}</ul>", books)
    };

    let body = format!(
        "<p>{name} ({email})</p>\n<p>Account No: {account_no}</p>\n<p>Balance: {balance}$</p>\n<h2>My books</h2>\n{books}",
        name = escape_html(&user.display_name()),
        email = escape_html(&user.email),
        account_no = view.account.account_no,
        balance = format_amount(view.account.balance),
        books = books,
    );
    layout("Profile", ctx, &body)
}
