use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chatbridge_core::session::{CredentialImage, SessionStatus};
use chatbridge_core::Error;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::time::Duration;

use crate::lifecycle::SessionController;
use crate::state::AppState;

/// Error surface of the HTTP handlers
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::UnknownSession(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>\n",
        encode_text(title),
        body
    ))
}

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let mut items = String::new();
    for name in state.registry.names() {
        let base = format!("{}/{}", state.base_url, urlencoding::encode(name));
        items.push_str(&format!(
            "<li>{} - <a href=\"{}\">status</a> | <a href=\"{}\">qr</a></li>\n",
            encode_text(name),
            encode_double_quoted_attribute(&format!("{}/status", base)),
            encode_double_quoted_attribute(&format!("{}/qr", base)),
        ));
    }

    page(
        "chatbridge",
        &format!("<h1>Sessions</h1>\n<ul>\n{}</ul>", items),
    )
}

pub async fn sessions_handler(State(state): State<AppState>) -> Json<Vec<SessionStatus>> {
    Json(state.registry.statuses())
}

pub async fn status_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SessionStatus>, ApiError> {
    tracing::debug!("Status request for {}", name);
    Ok(Json(state.registry.status(&name)?))
}

pub async fn qr_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Html<String>, ApiError> {
    tracing::debug!("QR request for {}", name);
    if state.registry.status(&name)?.state.is_authenticated() {
        return Ok(authenticated_page(&name));
    }

    let controller = state.registry.get(&name).await?;
    wait_for_pairing(&controller, state.qr_wait).await;

    if controller.state().is_authenticated() {
        return Ok(authenticated_page(&name));
    }
    Ok(match controller.current_credential_image() {
        CredentialImage::Available {
            image_url,
            issued_at,
        } => {
            let issued = issued_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            page(
                &format!("{} - scan to pair", name),
                &format!(
                    "<h1>Scan with WhatsApp to pair {}</h1>\n<img src=\"{}\" alt=\"pairing QR code\">\n<p>Issued at {}</p>",
                    encode_text(&name),
                    encode_double_quoted_attribute(&image_url),
                    encode_text(&issued),
                ),
            )
        }
        CredentialImage::Unavailable => {
            tracing::debug!("{}", Error::CredentialUnavailable(name.clone()));
            page(
                &format!("{} - not available", name),
                &format!(
                    "<h1>QR code for {} is not available yet</h1>\n<p>Please try again in a few seconds.</p>",
                    encode_text(&name)
                ),
            )
        }
    })
}

fn authenticated_page(name: &str) -> Html<String> {
    page(
        &format!("{} - authenticated", name),
        &format!(
            "<h1>{} is already authenticated</h1>\n<p>No pairing is needed.</p>",
            encode_text(name)
        ),
    )
}

/// Wait until a credential is issued or the session authenticates, bounded by `wait`
async fn wait_for_pairing(controller: &SessionController, wait: Duration) -> bool {
    let mut rx = controller.subscribe();
    let changed = async move {
        rx.wait_for(|status| status.has_credential || status.state.is_authenticated())
            .await
            .is_ok()
    };
    matches!(tokio::time::timeout(wait, changed).await, Ok(true))
}
