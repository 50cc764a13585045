//! Viewer session cookie

use ecoshelf_core::SessionId;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

pub const SESSION_COOKIE: &str = "ecoshelf_session";

/// The caller's session id, issuing a new cookie when absent or malformed
pub fn viewer_session(cookies: &Cookies) -> SessionId {
    if let Some(id) = cookies
        .get(SESSION_COOKIE)
        .and_then(|c| SessionId::parse(c.value()))
    {
        return id;
    }

    let id = SessionId::generate();
    let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);

    tracing::debug!(session = %id, "New viewer session");
    id
}
