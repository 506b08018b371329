use askama::Template;
use axum::response::Redirect;

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    title: &'static str,
    api_path: &'static str,
}

/// GET /
pub async fn index() -> Redirect {
    Redirect::to("/page")
}

/// GET /page
pub async fn page() -> PageTemplate {
    PageTemplate {
        title: "tiny-url",
        api_path: "/api",
    }
}
