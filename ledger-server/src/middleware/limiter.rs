use std::collections::HashMap;
use std::future::{ready, Ready};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use futures::future::LocalBoxFuture;
use tokio::sync::{Mutex, RwLock};

use crate::handlers::error::HttpErrorResponse;

const TABLE_COUNT: usize = 16;

#[derive(Debug)]
struct LimiterEntry {
    count: u64,
    window_start: Instant,
}

struct LimiterTable {
    map: HashMap<IpAddr, Mutex<LimiterEntry>>,
    last_clear: Instant,
}

impl LimiterTable {
    fn new() -> Self {
        LimiterTable {
            map: HashMap::new(),
            last_clear: Instant::now(),
        }
    }
}

/// Fixed-window request limiter keyed by client IP. Clones share the same tables, so a
/// single `Limiter` built before `HttpServer::new` covers every worker.
#[derive(Clone)]
pub struct Limiter {
    max_per_period: u64,
    period: Duration,
    clear_frequency: Duration,
    tables: Arc<[RwLock<LimiterTable>; TABLE_COUNT]>,
}

impl Limiter {
    pub fn new(max_per_period: u64, period: Duration, clear_frequency: Duration) -> Self {
        Limiter {
            max_per_period,
            period,
            clear_frequency: clear_frequency.max(period),
            tables: Arc::new(std::array::from_fn(|_| RwLock::new(LimiterTable::new()))),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Limiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = LimiterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct LimiterMiddleware<S> {
    service: S,
    limiter: Limiter,
}

impl<S, B> Service<ServiceRequest> for LimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let ip = client_ip(&req);
        let last_byte = match ip {
            IpAddr::V4(ip) => ip.octets()[3],
            IpAddr::V6(ip) => ip.octets()[15],
        };

        let limiter = self.limiter.clone();
        let req_fut = self.service.call(req);

        Box::pin(async move {
            let table = &limiter.tables[last_byte as usize % TABLE_COUNT];
            let now = Instant::now();

            let found_ip = {
                // Read lock must be released before the write lock below is taken
                let table = table.read().await;

                match table.map.get(&ip) {
                    Some(entry) => {
                        let mut entry = entry.lock().await;

                        if now.duration_since(entry.window_start) > limiter.period {
                            entry.window_start = now;
                            entry.count = 1;
                        } else if entry.count >= limiter.max_per_period {
                            return Err(HttpErrorResponse::TooManyRequests(String::from(
                                "Too many requests, please try again later",
                            ))
                            .into());
                        } else {
                            entry.count += 1;
                        }

                        true
                    }
                    None => false,
                }
            };

            if !found_ip {
                let mut table = table.write().await;

                if now.duration_since(table.last_clear) > limiter.clear_frequency {
                    table.map.clear();
                    table.map.shrink_to_fit();
                    table.last_clear = now;
                }

                table
                    .map
                    .entry(ip)
                    .and_modify(|entry| entry.get_mut().count += 1)
                    .or_insert_with(|| {
                        Mutex::new(LimiterEntry {
                            count: 1,
                            window_start: now,
                        })
                    });
            }

            req_fut.await
        })
    }
}

fn client_ip(req: &ServiceRequest) -> IpAddr {
    if cfg!(test) {
        if let Some(ip) = req
            .headers()
            .get("test-ip")
            .and_then(|ip| ip.to_str().ok())
            .and_then(|ip| ip.parse().ok())
        {
            return ip;
        }
    }

    // peer_addr() is None only for requests built without a connection
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
