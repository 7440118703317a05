use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::models::{Cart, OrderSummary};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_ID_LEN: usize = 32;

/// Server-side state attached to one browser session.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: Option<Uuid>,
    pub cart: Cart,
    pub last_order: Option<OrderSummary>,
    touched_at: Instant,
}

impl SessionData {
    fn new() -> Self {
        Self {
            user_id: None,
            cart: Cart::default(),
            last_order: None,
            touched_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl: Duration,
    pub secure: bool,
}

impl From<&AppConfig> for SessionSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            cookie_name: cfg.session_cookie_name.clone(),
            ttl: cfg.session_ttl(),
            secure: cfg.session_cookie_secure,
        }
    }
}

/// In-process session storage. Entries idle for longer than the TTL are
/// dropped on access and by [`SessionStore::purge_expired`].
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionData>>,
    settings: Arc<SessionSettings>,
}

impl SessionStore {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn generate_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect()
    }

    fn load(&self, id: &str) -> Option<SessionData> {
        let ttl = self.settings.ttl;
        if let Some(mut data) = self.sessions.get_mut(id) {
            if data.touched_at.elapsed() < ttl {
                data.touched_at = Instant::now();
                return Some(data.clone());
            }
        }
        self.sessions
            .remove_if(id, |_, data| data.touched_at.elapsed() >= ttl);
        None
    }

    fn modify<R>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let ttl = self.settings.ttl;
        let mut entry = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(SessionData::new);
        if entry.touched_at.elapsed() >= ttl {
            *entry = SessionData::new();
        }
        entry.touched_at = Instant::now();
        f(entry.value_mut())
    }

    fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Moves the data held under `old` to a fresh id and returns it.
    fn cycle(&self, old: &str) -> String {
        let new_id = Self::generate_id();
        let data = self
            .sessions
            .remove(old)
            .map(|(_, data)| data)
            .unwrap_or_else(SessionData::new);
        self.sessions.insert(new_id.clone(), data);
        new_id
    }

    fn destroy(&self, id: &str) {
        self.sessions.remove(id);
    }

    pub fn purge_expired(&self) -> usize {
        let ttl = self.settings.ttl;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, data| data.touched_at.elapsed() < ttl);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Runs [`SessionStore::purge_expired`] on a fixed interval until the
    /// runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "expired sessions removed");
                }
            }
        })
    }

    fn cookie_for(&self, id: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.settings.cookie_name,
            id,
            self.settings.ttl.as_secs()
        );
        if self.settings.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn expired_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.settings.cookie_name
        )
    }
}

/// Handle to the current request's session, inserted by
/// [`session_middleware`]. Nothing is stored until the first write.
#[derive(Clone)]
pub struct Session {
    store: SessionStore,
    id: Arc<Mutex<String>>,
}

impl Session {
    fn new(store: SessionStore, id: String) -> Self {
        Self {
            store,
            id: Arc::new(Mutex::new(id)),
        }
    }

    pub fn id(&self) -> String {
        match self.id.lock() {
            Ok(id) => id.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace_id(&self, new_id: String) {
        match self.id.lock() {
            Ok(mut id) => *id = new_id,
            Err(poisoned) => *poisoned.into_inner() = new_id,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.store.load(&self.id()).and_then(|data| data.user_id)
    }

    pub fn cart(&self) -> Cart {
        self.store
            .load(&self.id())
            .map(|data| data.cart)
            .unwrap_or_default()
    }

    pub fn update_cart<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> R {
        self.store.modify(&self.id(), |data| f(&mut data.cart))
    }

    pub fn last_order(&self) -> Option<OrderSummary> {
        self.store.load(&self.id()).and_then(|data| data.last_order)
    }

    /// Records a completed checkout and empties the cart in one step.
    pub fn complete_checkout(&self, summary: OrderSummary) {
        self.store.modify(&self.id(), |data| {
            data.cart.clear();
            data.last_order = Some(summary);
        });
    }

    /// Binds the session to a user under a new id. The cart survives.
    pub fn login(&self, user_id: Uuid) {
        let new_id = self.store.cycle(&self.id());
        self.store.modify(&new_id, |data| data.user_id = Some(user_id));
        self.replace_id(new_id);
    }

    /// Drops everything held by the session.
    pub fn logout(&self) {
        self.store.destroy(&self.id());
        self.replace_id(SessionStore::generate_id());
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ServiceError::InternalError("session layer missing".to_string()))
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Resolves the session cookie, exposes a [`Session`] to handlers and
/// writes the cookie back when the session holds data.
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let incoming = cookie_value(request.headers(), &store.settings().cookie_name)
        .filter(|id| id.len() == SESSION_ID_LEN && store.load(id).is_some());

    let session = Session::new(
        store.clone(),
        incoming.clone().unwrap_or_else(SessionStore::generate_id),
    );
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    let id = session.id();
    let cookie = if store.contains(&id) {
        Some(store.cookie_for(&id))
    } else if incoming.is_some() {
        Some(store.expired_cookie())
    } else {
        None
    };

    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    fn store(ttl: Duration) -> SessionStore {
        SessionStore::new(SessionSettings {
            cookie_name: "sid".into(),
            ttl,
            secure: false,
        })
    }

    #[test]
    fn ids_are_32_alphanumerics() {
        let id = SessionStore::generate_id();
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, SessionStore::generate_id());
    }

    #[test]
    fn reads_do_not_create_sessions() {
        let store = store(Duration::from_secs(60));
        let session = Session::new(store.clone(), SessionStore::generate_id());

        assert!(session.cart().is_empty());
        assert!(session.user_id().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn login_cycles_the_id_and_keeps_the_cart() {
        let store = store(Duration::from_secs(60));
        let session = Session::new(store.clone(), SessionStore::generate_id());
        session.update_cart(|cart| cart.clear());
        let before = session.id();

        let user = Uuid::new_v4();
        session.login(user);

        assert_ne!(session.id(), before);
        assert_eq!(session.user_id(), Some(user));
        assert_eq!(store.len(), 1);

        session.logout();
        assert!(session.user_id().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn expired_sessions_are_purged() {
        let store = store(Duration::ZERO);
        let session = Session::new(store.clone(), SessionStore::generate_id());
        session.update_cart(|_| ());

        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn cookie_lookup_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc123; other=1"),
        );
        assert_eq!(cookie_value(&headers, "sid").as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    async fn touch(session: Session) -> &'static str {
        session.update_cart(|_| ());
        "ok"
    }

    async fn peek(_session: Session) -> &'static str {
        "ok"
    }

    #[tokio::test]
    async fn cookie_is_only_set_once_the_session_holds_data() {
        let store = store(Duration::from_secs(60));
        let app = Router::new()
            .route("/touch", get(touch))
            .route("/peek", get(peek))
            .layer(axum::middleware::from_fn_with_state(
                store.clone(),
                session_middleware,
            ));

        let response = app
            .clone()
            .oneshot(HttpRequest::get("/peek").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let response = app
            .oneshot(HttpRequest::get("/touch").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("sid="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert_eq!(store.len(), 1);
    }
}
