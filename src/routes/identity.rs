use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::AppState;
use crate::models::User;

pub const USER_ID_COOKIE: &str = "userId";

#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub async fn pin_current_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> (CookieJar, Response) {
    let expected = state.current_user.id.to_string();
    let presented = jar.get(USER_ID_COOKIE).map(|cookie| cookie.value());

    let jar = if presented == Some(expected.as_str()) {
        jar
    } else {
        tracing::debug!(?presented, user_id = %expected, "Resetting identity cookie");
        jar.add(Cookie::new(USER_ID_COOKIE, expected))
    };

    request
        .extensions_mut()
        .insert(CurrentUser(state.current_user.clone()));

    (jar, next.run(request).await)
}
