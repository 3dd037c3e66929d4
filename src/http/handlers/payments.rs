use std::collections::HashMap;

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};

use crate::gateways::CheckoutForm;
use crate::service::callback_service::{CallbackChannel, ResultOutcome, ResultView};
use crate::service::checkout_service::CheckoutOutcome;
use crate::AppState;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// GET /payments/:donation_id/checkout
pub async fn checkout(State(state): State<AppState>, Path(donation_id): Path<i64>) -> impl IntoResponse {
    match state.checkout_service.begin_checkout(donation_id).await {
        Ok(CheckoutOutcome::Form(form)) => Html(render_checkout_page(&form)).into_response(),
        Ok(CheckoutOutcome::AlreadyPaid) => Redirect::to("/").into_response(),
        Ok(CheckoutOutcome::NotFound) => (StatusCode::NOT_FOUND, "donation not found").into_response(),
        Err(e) => {
            tracing::error!("checkout failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "checkout failed").into_response()
        }
    }
}

/// POST /payments/notify — server-to-server payment notification. The
/// processor treats any body other than the adapter's ACK literal as a
/// failure and redelivers.
pub async fn notify(
    State(state): State<AppState>,
    Form(params): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    deliver(state, CallbackChannel::Notify, params).await
}

/// POST /payments/payment_info — delayed-settlement issuance notification.
pub async fn payment_info(
    State(state): State<AppState>,
    Form(params): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    deliver(state, CallbackChannel::PaymentInfo, params).await
}

async fn deliver(
    state: AppState,
    channel: CallbackChannel,
    params: HashMap<String, String>,
) -> axum::response::Response {
    match state.callback_service.handle_notification(channel, &params).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            // Non-ACK body plus 500: the processor will retry the delivery.
            tracing::error!("callback processing failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "0|Error".to_string()).into_response()
        }
    }
}

/// POST /payments/result — user-redirect outcome page. Shows translated
/// status text only, never raw processor codes.
pub async fn result(
    State(state): State<AppState>,
    Form(params): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    match state.callback_service.handle_result(&params).await {
        Ok(view) => Html(render_result_page(&view)).into_response(),
        Err(e) => {
            tracing::error!("result page failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "error").into_response()
        }
    }
}

fn render_checkout_page(form: &CheckoutForm) -> String {
    let mut inputs = String::new();
    for (name, value) in &form.fields {
        inputs.push_str(&format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            escape_html(name),
            escape_html(value)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-TW">
<head><meta charset="utf-8"><title>前往付款</title></head>
<body>
<p>正在將您導向付款頁面，請稍候…</p>
<form id="gateway-form" method="post" action="{}">{}</form>
<script>document.getElementById("gateway-form").submit();</script>
</body>
</html>"#,
        escape_html(&form.action_url),
        inputs
    )
}

fn render_result_page(view: &ResultView) -> String {
    let (title, message) = match view.outcome {
        ResultOutcome::Paid => ("付款完成", "感謝您的捐獻！付款已完成。".to_string()),
        ResultOutcome::AwaitingPayment => {
            let mut msg = "取號成功！請於期限內完成繳費。".to_string();
            if let Some(summary) = view.donation.as_ref().and_then(|d| d.payment_info_summary()) {
                msg.push_str(&format!("<br>{}", escape_html(&summary)));
            }
            ("待繳費", msg)
        }
        ResultOutcome::Failed => ("付款未完成", "付款未完成，請重新嘗試或與協會聯繫。".to_string()),
        ResultOutcome::NotFound => ("查無資料", "找不到捐獻記錄。".to_string()),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-TW">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<h1>{title}</h1>
<p>{message}</p>
<p><a href="/">回首頁</a></p>
</body>
</html>"#
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
