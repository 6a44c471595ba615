//! Liveness and readiness probes.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the database answer a query? Failure → pulled from load-balancer. |

use tracing::error;

use crate::app::Todos;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Always `200 ok`. If the process can answer HTTP at all, it is alive.
pub async fn liveness<S>(_state: S, _req: Request) -> Response {
    Response::text("ok")
}

/// `200 ready` when the store answers a trivial query, `503` otherwise.
pub async fn readiness(todos: Todos, _req: Request) -> Response {
    let store = todos.store().clone();
    match tokio::task::spawn_blocking(move || store.ping()).await {
        Ok(Ok(())) => Response::text("ready"),
        Ok(Err(e)) => {
            error!("readiness check failed: {e}");
            Response::error(Status::ServiceUnavailable, Status::ServiceUnavailable.reason())
        }
        Err(e) => {
            error!("readiness check task failed: {e}");
            Response::error(Status::ServiceUnavailable, Status::ServiceUnavailable.reason())
        }
    }
}
