use axum::response::Redirect;

/// 303 See Other, the post/redirect/get answer to a successful form submission
pub fn see_other(location: &str) -> Redirect {
    Redirect::to(location)
}
