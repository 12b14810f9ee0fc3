use axum::{extract::Path, response::Html};

const LIVE_PAGE: &str = include_str!("../../static/live.html");

/// Serves the live-tracking page. The token is not checked here; the page
/// fetches the snapshot and renders the not-found or expired state itself.
pub async fn live_page(Path(_share_token): Path<String>) -> Html<&'static str> {
    Html(LIVE_PAGE)
}
