//! Single-port protocol router.
//!
//! One listener serves three mutually exclusive request classes: native gRPC
//! over HTTP/2, browser-compatible gRPC-web, and the embedded web app. The
//! decision is an ordered chain of predicate-guarded handlers evaluated per
//! request; first match wins.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{boxed, Body, BoxBody, Bytes, HttpBody};
use axum::{BoxError, Router};
use http::{header, HeaderName, Method, Request, Response, Version};
use tonic_web::GrpcWebLayer;
use tower::util::BoxCloneService;
use tower::{Service, ServiceBuilder, ServiceExt};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::grpc::{AccountServiceServer, LedgerService};

const CORS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const EXPOSED_HEADERS: [&str; 3] = ["grpc-status", "grpc-message", "grpc-status-details-bin"];

const ALLOWED_HEADERS: [&str; 4] = ["x-grpc-web", "content-type", "x-user-agent", "grpc-timeout"];

/// Which of the three handling paths a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Native gRPC over a multiplexed (HTTP/2) transport.
    BinaryRpc,
    /// Browser-compatible gRPC-web, including its CORS preflight.
    WebRpc,
    /// Everything else is served from the embedded web app.
    StaticAsset,
}

/// Classify a request. Evaluation order is load-bearing: content-type
/// sniffing comes first, because both RPC paths can carry cross-origin
/// headers that ordinary browser traffic also has.
pub fn classify<B>(req: &Request<B>) -> RequestClass {
    if req.version() == Version::HTTP_2 && has_content_type_prefix(req, "application/grpc") {
        return RequestClass::BinaryRpc;
    }
    if has_content_type_prefix(req, "application/grpc-web") || is_grpc_web_preflight(req) {
        return RequestClass::WebRpc;
    }
    RequestClass::StaticAsset
}

fn has_content_type_prefix<B>(req: &Request<B>, prefix: &str) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with(prefix))
        .unwrap_or(false)
}

fn is_grpc_web_preflight<B>(req: &Request<B>) -> bool {
    req.method() == Method::OPTIONS
        && req
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().contains("x-grpc-web"))
            .unwrap_or(false)
}

/// CORS policy for the web-RPC path, configured once at startup. Permissive
/// mirrors any caller origin; restrictive emits no CORS headers at all, so
/// cross-origin browsers refuse the response.
fn cors_layer(allow_any_origin: bool) -> CorsLayer {
    if !allow_any_origin {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_headers(
            ALLOWED_HEADERS
                .iter()
                .copied()
                .map(HeaderName::from_static)
                .collect::<Vec<_>>(),
        )
        .expose_headers(
            EXPOSED_HEADERS
                .iter()
                .copied()
                .map(HeaderName::from_static)
                .collect::<Vec<_>>(),
        )
        .max_age(CORS_MAX_AGE)
}

type Handler = BoxCloneService<Request<Body>, Response<BoxBody>, Infallible>;

fn boxed_handler<S, B>(service: S) -> Handler
where
    S: Service<Request<Body>, Response = Response<B>, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    BoxCloneService::new(service.map_response(|response| response.map(boxed)))
}

/// The router itself: three boxed handlers behind the ordered predicates of
/// [`classify`].
#[derive(Clone)]
pub struct ProtocolRouter {
    grpc: Handler,
    grpc_web: Handler,
    web_static: Handler,
}

impl ProtocolRouter {
    pub fn new(
        service: AccountServiceServer<LedgerService>,
        web_static: Router,
        allow_any_origin: bool,
    ) -> Self {
        let grpc = boxed_handler(service.clone());

        // The web adapter multiplexes onto the same service implementation.
        let grpc_web = boxed_handler(
            ServiceBuilder::new()
                .layer(cors_layer(allow_any_origin))
                .layer(GrpcWebLayer::new())
                .service(service),
        );

        Self {
            grpc,
            grpc_web,
            web_static: BoxCloneService::new(web_static),
        }
    }
}

impl Service<Request<Body>> for ProtocolRouter {
    type Response = Response<BoxBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = match classify(&req) {
            RequestClass::BinaryRpc => self.grpc.clone(),
            RequestClass::WebRpc => self.grpc_web.clone(),
            RequestClass::StaticAsset => self.web_static.clone(),
        };
        Box::pin(handler.oneshot(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(version: Version, method: Method) -> http::request::Builder {
        Request::builder().version(version).method(method).uri("/")
    }

    #[test]
    fn http2_grpc_is_binary_rpc_even_with_cors_headers() {
        let req = request(Version::HTTP_2, Method::POST)
            .header(header::CONTENT_TYPE, "application/grpc")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(())
            .unwrap();
        assert_eq!(classify(&req), RequestClass::BinaryRpc);
    }

    #[test]
    fn grpc_web_content_type_routes_to_web_adapter() {
        let req = request(Version::HTTP_11, Method::POST)
            .header(header::CONTENT_TYPE, "application/grpc-web+proto")
            .body(())
            .unwrap();
        assert_eq!(classify(&req), RequestClass::WebRpc);
    }

    #[test]
    fn grpc_web_preflight_routes_to_web_adapter() {
        let req = request(Version::HTTP_11, Method::OPTIONS)
            .header(header::ORIGIN, "http://localhost:3000")
            .header(
                header::ACCESS_CONTROL_REQUEST_HEADERS,
                "content-type,X-Grpc-Web",
            )
            .body(())
            .unwrap();
        assert_eq!(classify(&req), RequestClass::WebRpc);
    }

    #[test]
    fn ordinary_preflight_is_not_web_rpc() {
        let req = request(Version::HTTP_11, Method::OPTIONS)
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(())
            .unwrap();
        assert_eq!(classify(&req), RequestClass::StaticAsset);
    }

    #[test]
    fn grpc_content_type_without_http2_falls_through_to_static() {
        let req = request(Version::HTTP_11, Method::POST)
            .header(header::CONTENT_TYPE, "application/grpc")
            .body(())
            .unwrap();
        assert_eq!(classify(&req), RequestClass::StaticAsset);
    }

    #[test]
    fn plain_browser_request_is_static() {
        let req = request(Version::HTTP_11, Method::GET).body(()).unwrap();
        assert_eq!(classify(&req), RequestClass::StaticAsset);
    }
}
