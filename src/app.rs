//! Todo request handlers.
//!
//! One handler per operation. Each one validates its input, calls the
//! [`Store`] on tokio's blocking pool, and hands the result to the
//! [`Renderer`] in the format negotiated from the request's `Accept` header.
//!
//! | Route | Operation |
//! |---|---|
//! | `GET /` | list every item |
//! | `POST /add` (form field `newTodo`) | create an item |
//! | `GET /do/{id}` | mark done |
//! | `GET /undo/{id}` | mark not done |
//! | `DELETE /delete/{id}` | delete |
//! | `GET /healthz`, `GET /readyz` | probes, see [`health`](crate::health) |

use serde::Deserialize;
use tracing::{error, warn};

use crate::health;
use crate::method::Method;
use crate::model::{TodoId, TodoItem};
use crate::render::{Format, Output, Renderer};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;
use crate::status::Status;
use crate::store::{Store, StoreError};

/// Handler state: the store and the renderer, injected once at startup.
#[derive(Clone)]
pub struct Todos {
    store: Store,
    renderer: Renderer,
}

/// Builds the full routing table for the todo service.
pub fn router(todos: Todos) -> Router<Todos> {
    Router::new(todos)
        .on(Method::Get,    "/",             list)
        .on(Method::Post,   "/add",          add)
        .on(Method::Get,    "/do/{id}",      mark_done)
        .on(Method::Get,    "/undo/{id}",    mark_undone)
        .on(Method::Delete, "/delete/{id}",  delete)
        .on(Method::Get,    "/healthz",      health::liveness)
        .on(Method::Get,    "/readyz",       health::readiness)
}

impl Todos {
    pub fn new(store: Store, renderer: Renderer) -> Self {
        Self { store, renderer }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Runs a storage call off the async workers.
    async fn with_store<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || op(&store)).await {
            Ok(result) => result.map_err(AppError::from),
            Err(e) => Err(AppError::Internal(format!("storage task failed: {e}"))),
        }
    }

    fn respond(&self, req: &Request, output: Output) -> Response {
        self.renderer.render(Format::negotiate(req.accept()), &output)
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

pub async fn list(todos: Todos, req: Request) -> Result<Response, AppError> {
    let items = todos.with_store(Store::list_all).await?;
    Ok(todos.respond(&req, Output::List(items)))
}

#[derive(Deserialize)]
struct AddForm {
    #[serde(rename = "newTodo", default)]
    new_todo: String,
}

pub async fn add(todos: Todos, req: Request) -> Result<Response, AppError> {
    let form: AddForm = req.form().map_err(|e| {
        warn!("error parsing add request: {e}");
        AppError::InvalidInput("unable to parse add request")
    })?;
    if form.new_todo.is_empty() {
        return Err(AppError::InvalidInput("empty todo items are not accepted"));
    }

    let text = form.new_todo;
    let stored = text.clone();
    let id = todos.with_store(move |store| store.create(&stored)).await?;
    Ok(todos.respond(&req, Output::Item(TodoItem::new(id, text))))
}

pub async fn mark_done(todos: Todos, req: Request) -> Result<Response, AppError> {
    set_done(todos, req, true).await
}

pub async fn mark_undone(todos: Todos, req: Request) -> Result<Response, AppError> {
    set_done(todos, req, false).await
}

async fn set_done(todos: Todos, req: Request, done: bool) -> Result<Response, AppError> {
    let id = path_id(&req)?;
    let item = todos
        .with_store(move |store| {
            store.set_done(id, done)?;
            store.get_one(id)
        })
        .await?;
    Ok(todos.respond(&req, Output::Item(item)))
}

pub async fn delete(todos: Todos, req: Request) -> Result<Response, AppError> {
    let id = path_id(&req)?;
    todos.with_store(move |store| store.delete(id)).await?;
    Ok(todos.respond(&req, Output::Deleted))
}

/// Strictly parses the `{id}` path element: ASCII digits only, fitting in an `i64`.
fn path_id(req: &Request) -> Result<TodoId, AppError> {
    const REASON: &str = "expected an integer id path element";
    let raw = req.param("id").unwrap_or_default();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        warn!(id = raw, "rejecting non-numeric id");
        return Err(AppError::InvalidInput(REASON));
    }
    raw.parse().map_err(|e| {
        warn!(id = raw, "rejecting out-of-range id: {e}");
        AppError::InvalidInput(REASON)
    })
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Per-request failure, mapped to exactly one status code.
///
/// Only `InvalidInput` carries client-visible detail. Storage and internal
/// failures are logged here and answered with a bare 500.
#[derive(Debug)]
pub enum AppError {
    /// Malformed id or empty text: 400 with a short reason.
    InvalidInput(&'static str),
    /// Unknown id: 404.
    NotFound(TodoId),
    /// The store failed: 500.
    Storage(StoreError),
    /// Anything else that went wrong on our side: 500.
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(reason) => Response::error(Status::BadRequest, reason),
            Self::NotFound(id) => {
                warn!(id, "entry not found");
                Response::error(Status::NotFound, "entry not found")
            }
            Self::Storage(e @ StoreError::AmbiguousDelete { .. }) => {
                error!("integrity violation: {e}");
                internal()
            }
            Self::Storage(e) => {
                error!("storage failure: {e}");
                internal()
            }
            Self::Internal(detail) => {
                error!("internal failure: {detail}");
                internal()
            }
        }
    }
}

fn internal() -> Response {
    Response::error(Status::InternalServerError, Status::InternalServerError.reason())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderMap;

    fn app() -> Router<Todos> {
        router(Todos::new(Store::open_in_memory().unwrap(), Renderer::default()))
    }

    fn request(method: Method, path: &str, json: bool, form: Option<&str>) -> Request {
        let mut headers = HeaderMap::new();
        if json {
            headers.insert("accept", "application/json".parse().unwrap());
        }
        let body = match form {
            Some(f) => {
                headers.insert("content-type", "application/x-www-form-urlencoded".parse().unwrap());
                Bytes::from(f.to_owned())
            }
            None => Bytes::new(),
        };
        Request::new(method, path, None, headers, body)
    }

    fn json_body<T: serde::de::DeserializeOwned>(res: &Response) -> T {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn add_then_list_as_json() {
        let app = app();
        let res = app.handle(request(Method::Post, "/add", true, Some("newTodo=buy+milk"))).await;
        assert_eq!(res.status_code(), 200);
        let created: TodoItem = json_body(&res);
        assert_eq!(created, TodoItem::new(1, "buy milk"));

        let res = app.handle(request(Method::Get, "/", true, None)).await;
        let all: Vec<TodoItem> = json_body(&res);
        assert_eq!(all, vec![created]);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_storage() {
        let app = app();
        let res = app.handle(request(Method::Post, "/add", false, Some("newTodo="))).await;
        assert_eq!(res.status_code(), 400);
        assert_eq!(res.body(), b"empty todo items are not accepted\n");
        assert!(app.state().store().list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_field_is_rejected_like_empty_text() {
        let app = app();
        let res = app.handle(request(Method::Post, "/add", true, Some("other=x"))).await;
        assert_eq!(res.status_code(), 400);
        assert!(app.state().store().list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn do_and_undo_return_the_updated_item() {
        let app = app();
        let id = app.state().store().create("walk dog").unwrap();

        let res = app.handle(request(Method::Get, &format!("/do/{id}"), true, None)).await;
        let item: TodoItem = json_body(&res);
        assert!(item.done);

        let res = app.handle(request(Method::Get, &format!("/undo/{id}"), true, None)).await;
        let item: TodoItem = json_body(&res);
        assert!(!item.done);
    }

    #[tokio::test]
    async fn do_renders_fragment_for_html_clients() {
        let app = app();
        let id = app.state().store().create("<script>").unwrap();
        let res = app.handle(request(Method::Get, &format!("/do/{id}"), false, None)).await;
        let body = std::str::from_utf8(res.body()).unwrap();
        assert!(body.starts_with(&format!("<li id=\"todo-{id}\" class=\"todo done\"")));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn malformed_ids_are_400() {
        let app = app();
        for path in ["/do/abc", "/undo/-1", "/do/+1", "/do/99999999999999999999", "/do/1.5"] {
            let res = app.handle(request(Method::Get, path, false, None)).await;
            assert_eq!(res.status_code(), 400, "{path}");
            assert_eq!(res.body(), b"expected an integer id path element\n");
        }
        let res = app.handle(request(Method::Delete, "/delete/x", true, None)).await;
        assert_eq!(res.status_code(), 400);
    }

    #[tokio::test]
    async fn unknown_ids_are_404() {
        let app = app();
        for (method, path) in [
            (Method::Get, "/do/7"),
            (Method::Get, "/undo/7"),
            (Method::Delete, "/delete/7"),
        ] {
            let res = app.handle(request(method, path, true, None)).await;
            assert_eq!(res.status_code(), 404, "{path}");
            assert_eq!(res.body(), b"entry not found\n");
        }
    }

    #[tokio::test]
    async fn delete_is_204_for_json_and_empty_200_for_html() {
        let app = app();
        let a = app.state().store().create("a").unwrap();
        let b = app.state().store().create("b").unwrap();

        let res = app.handle(request(Method::Delete, &format!("/delete/{a}"), true, None)).await;
        assert_eq!(res.status_code(), 204);
        assert!(res.body().is_empty());

        let res = app.handle(request(Method::Delete, &format!("/delete/{b}"), false, None)).await;
        assert_eq!(res.status_code(), 200);
        assert!(res.body().is_empty());

        let res = app.handle(request(Method::Delete, &format!("/delete/{a}"), true, None)).await;
        assert_eq!(res.status_code(), 404);
    }

    #[tokio::test]
    async fn list_defaults_to_html_page() {
        let app = app();
        app.state().store().create("buy milk").unwrap();
        let res = app.handle(request(Method::Get, "/", false, None)).await;
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
        let body = std::str::from_utf8(res.body()).unwrap();
        assert!(body.contains("<span class=\"text\">buy milk</span>"));
    }

    #[tokio::test]
    async fn empty_store_lists_as_empty_array() {
        let res = app().handle(request(Method::Get, "/", true, None)).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"[]\n");
    }

    #[tokio::test]
    async fn broken_database_is_a_bare_500() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.db");
        let app = router(Todos::new(Store::open(&path).unwrap(), Renderer::default()));
        app.state().store().create("doomed").unwrap();

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("DROP TABLE items", [])
            .unwrap();

        let res = app.handle(request(Method::Get, "/", true, None)).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body(), b"Internal Server Error\n");

        let res = app.handle(request(Method::Post, "/add", false, Some("newTodo=x"))).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body(), b"Internal Server Error\n");
    }

    #[tokio::test]
    async fn repeated_new_todo_field_creates_first_value() {
        let app = app();
        let res = app
            .handle(request(Method::Post, "/add", true, Some("newTodo=buy+milk&newTodo=again")))
            .await;
        assert_eq!(res.status_code(), 200);
        let created: TodoItem = json_body(&res);
        assert_eq!(created.text, "buy milk");
        assert_eq!(app.state().store().list_all().unwrap().len(), 1);
    }

    #[test]
    fn storage_failures_never_leak_detail() {
        let err = AppError::from(StoreError::AmbiguousDelete { id: 3, rows: 2 });
        let res = err.into_response();
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body(), b"Internal Server Error\n");

        let res = AppError::from(StoreError::Poisoned).into_response();
        assert_eq!(res.body(), b"Internal Server Error\n");
    }
}
