//! Embedded single-page control panel.

use axum::response::Html;

static INDEX_HTML: &str = include_str!("../../assets/index.html");

/// `GET /` — serve the panel. The page drives the JSON API with `fetch()` and
/// points an `<img>` at `/screen` for the live view.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
