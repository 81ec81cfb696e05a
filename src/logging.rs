use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Method, StatusClass},
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

use crate::model::api::auth::AUTH_TOKEN_COOKIE;

/// Per-request bookkeeping: a sequence number and the time the request arrived.
#[derive(Debug, Copy, Clone)]
pub struct RequestTrace {
    pub id: usize,
    started: Instant,
}

impl RequestTrace {
    /// Start tracing a new request. Ids wrap around to zero on overflow.
    fn start() -> Self {
        static NEXT_REQUEST_ID: AtomicUsize = AtomicUsize::new(0);
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn of(req: &Request<'_>) -> Self {
        *req.local_cache(Self::start)
    }
}

impl Display for RequestTrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "req{}", self.id)
    }
}

/// The trace of the current request, for handlers that want to tag their own log lines.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestTrace {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(Self::of(req))
    }
}

/// Logs every request and response with its latency, and shutdown.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let trace = RequestTrace::of(req);
        // Only whether a session cookie was sent; never its contents.
        let session = if req.cookies().get(AUTH_TOKEN_COOKIE).is_some() {
            "session"
        } else {
            "anonymous"
        };
        info!("->{trace} {} {} ({session})", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let trace = RequestTrace::of(req);
        let code = res.status();
        let route = req
            .route()
            .map(|r| match r.name {
                Some(ref name) => format!("{name} ({})", r.uri),
                None => r.uri.to_string(),
            })
            .unwrap_or_else(|| "UNKNOWN ROUTE".to_string());
        let millis = trace.elapsed().as_millis();
        let msg = format!("<-{trace} {code} {route} in {millis}ms");
        match code.class() {
            StatusClass::ServerError => error!("{msg}"),
            // Rejected ballots are worth seeing; other client errors are routine.
            StatusClass::ClientError if req.method() == Method::Post && is_ballot(req) => {
                warn!("{msg}")
            }
            StatusClass::ClientError => debug!("{msg}"),
            _ => info!("{msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, closing the ballot box...");
    }
}

fn is_ballot(req: &Request<'_>) -> bool {
    req.uri().path().as_str() == "/voter/votes"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_increase() {
        let first = RequestTrace::start();
        let second = RequestTrace::start();
        assert!(second.id > first.id);
        assert_eq!(format!("{second}"), format!("req{}", second.id));
    }
}
