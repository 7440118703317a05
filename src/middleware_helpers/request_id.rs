use crate::tracing::{scope_request_id, RequestId};
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header_name() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

/// Outermost layer: resolves the caller's id (or mints one), stores it as a
/// request extension and task-local, and echoes it on the response. Error
/// bodies pick the id up from the task-local.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = match request.headers().get(REQUEST_ID_HEADER) {
        Some(raw) => raw.to_str().map(RequestId::new).unwrap_or_default(),
        None => RequestId::default(),
    };

    // Ids are restricted to header-safe characters, so this only fails if
    // that invariant is broken.
    let echoed = HeaderValue::from_str(id.as_str()).ok();
    if let Some(value) = &echoed {
        request.headers_mut().insert(header_name(), value.clone());
    }
    request.extensions_mut().insert(id.clone());

    let mut response = scope_request_id(id, next.run(request)).await;
    if let Some(value) = echoed {
        response.headers_mut().insert(header_name(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(id): Extension<RequestId>| async move { id.to_string() }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    async fn call(header: Option<&str>) -> (Option<String>, String) {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(REQUEST_ID_HEADER, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let echoed = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn generated_id_matches_extension() {
        let (echoed, seen_by_handler) = call(None).await;
        assert_eq!(echoed.as_deref(), Some(seen_by_handler.as_str()));
        assert!(!seen_by_handler.is_empty());
    }

    #[tokio::test]
    async fn well_formed_inbound_id_is_kept() {
        let (echoed, seen_by_handler) = call(Some("booking-42.a_b")).await;
        assert_eq!(echoed.as_deref(), Some("booking-42.a_b"));
        assert_eq!(seen_by_handler, "booking-42.a_b");
    }

    #[tokio::test]
    async fn unsafe_inbound_id_is_replaced() {
        let (echoed, _) = call(Some("id with spaces")).await;
        let echoed = echoed.unwrap();
        assert_ne!(echoed, "id with spaces");
        assert!(!echoed.contains(' '));
    }
}
