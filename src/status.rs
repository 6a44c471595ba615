//! HTTP status codes as a typed enum.
//!
//! Only the codes the todo service actually answers with. Use [`Status`]
//! with `Response::status()`, `Response::builder().status()`, or as a bare
//! handler return value:
//!
//! ```rust
//! use ticklist::{Request, Status};
//!
//! async fn gone(_state: (), _req: Request) -> Status {
//!     Status::NoContent
//! }
//! ```

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    NoContent,           // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405
    ContentTooLarge,     // 413

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    ServiceUnavailable,  // 503
}

impl Status {
    /// Canonical reason phrase, used as the body of bare error responses.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Ok                  => "OK",
            Self::NoContent           => "No Content",
            Self::BadRequest          => "Bad Request",
            Self::NotFound            => "Not Found",
            Self::MethodNotAllowed    => "Method Not Allowed",
            Self::ContentTooLarge     => "Content Too Large",
            Self::InternalServerError => "Internal Server Error",
            Self::ServiceUnavailable  => "Service Unavailable",
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::NoContent           => 204,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::ContentTooLarge     => 413,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable  => 503,
        }
    }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> Self {
        // Every variant maps to a valid code in 100..=999.
        http::StatusCode::from_u16(s.into()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}
