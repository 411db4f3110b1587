use std::future::{ready, Ready};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{self, HeaderValue},
        Method,
    },
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;

use crate::env;

pub const CORS_ALLOWED_METHODS_VALUE: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const CORS_ALLOWED_HEADERS_VALUE: &str = "Content-Type, Authorization, RefreshToken";

const ANY_ORIGIN: &str = "*";

/// Answers preflight requests and tags responses with `Access-Control-Allow-*` headers when
/// the request's `Origin` is in the allowed list. A `*` entry allows every origin; the origin
/// is echoed back rather than sent as `*` so that credentials keep working.
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::with_origins(env::CONF.cors_allowed_origins.iter().map(String::as_str))
    }
}

impl CorsMiddleware {
    pub fn with_origins<'a>(origins: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            allowed_origins: origins.into_iter().map(String::from).collect(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CorsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let allow_any = self.allowed_origins.iter().any(|o| o == ANY_ORIGIN);

        let allowed_origins = self
            .allowed_origins
            .iter()
            .filter(|origin| origin.as_str() != ANY_ORIGIN)
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(hv) => Some((origin.clone(), hv)),
                Err(_) => {
                    log::warn!("Ignoring CORS origin that is not a valid header value: {origin}");
                    None
                }
            })
            .collect();

        ready(Ok(CorsMiddlewareService {
            service,
            allow_any,
            allowed_origins,
        }))
    }
}

pub struct CorsMiddlewareService<S> {
    service: S,
    allow_any: bool,
    allowed_origins: Vec<(String, HeaderValue)>,
}

impl<S> CorsMiddlewareService<S> {
    fn allowed_origin_header(&self, req: &ServiceRequest) -> Option<HeaderValue> {
        let origin = req.headers().get(header::ORIGIN)?;

        if self.allow_any {
            return Some(origin.clone());
        }

        let origin = origin.to_str().ok()?;
        self.allowed_origins
            .iter()
            .find(|(allowed, _)| allowed == origin)
            .map(|(_, hv)| hv.clone())
    }
}

impl<S, B> Service<ServiceRequest> for CorsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let allowed_origin_header = self.allowed_origin_header(&req);

        if req.method() == Method::OPTIONS {
            let (req_parts, _) = req.into_parts();
            let mut res = HttpResponse::NoContent();

            if let Some(origin_header) = allowed_origin_header {
                res.insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_header))
                    .insert_header((
                        header::ACCESS_CONTROL_ALLOW_METHODS,
                        HeaderValue::from_static(CORS_ALLOWED_METHODS_VALUE),
                    ))
                    .insert_header((
                        header::ACCESS_CONTROL_ALLOW_HEADERS,
                        HeaderValue::from_static(CORS_ALLOWED_HEADERS_VALUE),
                    ))
                    .insert_header((
                        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                        HeaderValue::from_static("true"),
                    ))
                    .insert_header((header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400")))
                    .insert_header((header::VARY, HeaderValue::from_static("Origin")));
            }

            let res = ServiceResponse::new(req_parts, res.finish()).map_into_boxed_body();
            return Box::pin(async move { Ok(res) });
        }

        let req_fut = self.service.call(req);

        Box::pin(async move {
            let mut res = req_fut.await?.map_into_boxed_body();

            if let Some(origin_header) = allowed_origin_header {
                let headers = res.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_header);
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
            }

            Ok(res)
        })
    }
}
