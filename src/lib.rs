//! # ticklist
//!
//! A small persistent todo list served over HTTP to both browsers (HTML) and
//! programs (JSON), from one set of handlers.
//!
//! ## Layers
//!
//! - [`Store`]: SQLite table of [`TodoItem`]s, sole owner of id assignment.
//! - [`app`]: one handler per operation (list, add, do, undo, delete).
//! - [`render`]: picks JSON or HTML once per request from `Accept`.
//! - [`Router`] / [`Server`]: radix-tree routing via [`matchit`] on top of
//!   hyper, with graceful shutdown on SIGTERM / Ctrl-C.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ticklist::{Renderer, Server, Store, Todos, app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ticklist::Error> {
//!     let store = Store::open("./todo.db")?;
//!     let todos = Todos::new(store, Renderer::default());
//!     Server::new("0.0.0.0:8080".parse().unwrap())
//!         .serve(app::router(todos))
//!         .await
//! }
//! ```
//!
//! ```text
//! curl -H 'accept: application/json' -d newTodo=buy+milk localhost:8080/add
//! {"Id":1,"Text":"buy milk","Done":false}
//! ```

mod config;
mod error;
mod handler;
mod method;
mod model;
mod request;
mod response;
mod router;
mod server;
mod status;
mod store;

pub mod app;
pub mod health;
pub mod middleware;
pub mod render;

pub use app::{AppError, Todos};
pub use config::{Config, parse_bind};
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use model::{TodoId, TodoItem, TodoList};
pub use render::{DefaultTemplates, Format, Output, Renderer, Templates};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, serve_listener};
pub use status::Status;
pub use store::{Store, StoreError};
