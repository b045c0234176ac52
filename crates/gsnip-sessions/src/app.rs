//! Session views: each visitor gets a random greeting and a view count
//! that follows them through a `session_id` cookie.

use crate::store::{Session, SessionStore};
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use log::{error, warn};
use rand::seq::SliceRandom;
use std::sync::Arc;

pub const COOKIE_NAME: &str = "session_id";

/// Longest session id accepted back from a cookie.
const MAX_SESSION_ID_LEN: usize = 64;

pub const GREETINGS: [&str; 5] = [
    "Hello World",
    "Hallo Welt",
    "Ciao Mondo",
    "Salut le Monde",
    "Hola Mundo",
];

type SharedStore = Arc<dyn SessionStore>;

/// Every path goes through `index`, which only answers `/`.
pub fn router(store: SharedStore) -> Router {
    Router::new().fallback(index).with_state(store)
}

fn random_greeting() -> String {
    GREETINGS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GREETINGS[0])
        .to_string()
}

/// Value of cookie `name` from the request's `Cookie` headers.
fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Ids this app hands out are alphanumeric; anything else in the cookie is
/// ignored rather than used as a document path.
fn is_session_id(id: &str) -> bool {
    (1..=MAX_SESSION_ID_LEN).contains(&id.len())
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}

pub fn render(session: &Session) -> String {
    let unit = if session.views == 1 { "view" } else { "views" };
    format!(
        "<body>{} {} for \"{}\"</body>",
        session.views,
        unit,
        html_escape(&session.greeting)
    )
}

async fn index(State(store): State<SharedStore>, uri: Uri, headers: HeaderMap) -> Response {
    if uri.path_and_query().map(|p| p.as_str()) != Some("/") {
        return ().into_response();
    }

    let existing = match cookie(&headers, COOKIE_NAME) {
        Some(id) if is_session_id(id) => Some(id),
        Some(id) if !id.is_empty() => {
            warn!("ignoring malformed session id {:?}", id);
            None
        }
        _ => None,
    };
    let (id, session, is_new) = match existing {
        Some(id) => {
            let mut session = match store.load(id).await {
                Ok(Some(session)) => session,
                Ok(None) => Session {
                    greeting: random_greeting(),
                    views: 0,
                },
                Err(e) => {
                    error!("could not load session {}: {}", id, e);
                    Session::default()
                }
            };
            session.views += 1;
            (id.to_string(), session, false)
        }
        None => {
            let session = Session {
                greeting: random_greeting(),
                views: 1,
            };
            (store.new_id(), session, true)
        }
    };

    if let Err(e) = store.save(&id, &session).await {
        error!("could not save session {}: {}", id, e);
    }

    let mut response = Html(render(&session)).into_response();
    if is_new {
        match HeaderValue::from_str(&format!("{}={}", COOKIE_NAME, id)) {
            Ok(value) => {
                response.headers_mut().insert(SET_COOKIE, value);
            }
            Err(e) => error!("session id {} is not a valid cookie value: {}", id, e),
        }
    }
    response
}
