//! Response rendering and content negotiation.
//!
//! The output format is decided once per request ([`Format::negotiate`]) and
//! handed to [`Renderer::render`] together with the handler's result. JSON
//! goes out through serde with `<`, `>` and `&` left literal; HTML comes from
//! a [`Templates`] implementation supplied at startup.

use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use crate::model::{TodoItem, TodoList};
use crate::response::Response;
use crate::status::Status;

/// The two representations a client can ask for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    Json,
    #[default]
    Html,
}

impl Format {
    /// JSON when the first media range in `Accept` is `application/json`
    /// (parameters and case ignored); HTML for everything else, including a
    /// missing header.
    pub fn negotiate(accept: Option<&str>) -> Self {
        let first = accept
            .and_then(|a| a.split(',').next())
            .and_then(|range| range.split(';').next())
            .map(str::trim);
        match first {
            Some(mime) if mime.eq_ignore_ascii_case("application/json") => Self::Json,
            _ => Self::Html,
        }
    }
}

/// What a handler produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    List(TodoList),
    Item(TodoItem),
    Deleted,
}

/// HTML producer for the two views the service needs.
///
/// Implementations own their markup; the renderer never touches files.
pub trait Templates: Send + Sync {
    /// The full page listing every item.
    fn page(&self, items: &[TodoItem]) -> String;

    /// One item, swapped in place after add / do / undo.
    fn fragment(&self, item: &TodoItem) -> String;
}

/// Built-in markup: a single page wired with htmx attributes, and the
/// matching `<li>` fragment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTemplates;

impl Templates for DefaultTemplates {
    fn page(&self, items: &[TodoItem]) -> String {
        let mut html = String::from(concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en\">\n",
            "<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<title>Todo</title>\n",
            "<script src=\"https://unpkg.com/htmx.org@1.9.12\"></script>\n",
            "</head>\n",
            "<body>\n",
            "<h1>Todo</h1>\n",
            "<form hx-post=\"/add\" hx-target=\"#todos\" hx-swap=\"beforeend\" ",
            "hx-on::after-request=\"this.reset()\">\n",
            "<input type=\"text\" name=\"newTodo\" placeholder=\"What needs doing?\" required>\n",
            "<button type=\"submit\">Add</button>\n",
            "</form>\n",
            "<ul id=\"todos\">\n",
        ));
        for item in items {
            html.push_str(&self.fragment(item));
        }
        html.push_str("</ul>\n</body>\n</html>\n");
        html
    }

    fn fragment(&self, item: &TodoItem) -> String {
        let (class, toggle, label) = if item.done {
            ("todo done", "undo", "Undo")
        } else {
            ("todo", "do", "Done")
        };
        format!(
            concat!(
                "<li id=\"todo-{id}\" class=\"{class}\">",
                "<span class=\"text\">{text}</span> ",
                "<button hx-get=\"/{toggle}/{id}\" hx-target=\"#todo-{id}\" hx-swap=\"outerHTML\">{label}</button> ",
                "<button hx-delete=\"/delete/{id}\" hx-target=\"#todo-{id}\" hx-swap=\"outerHTML\">Delete</button>",
                "</li>\n",
            ),
            id = item.id,
            class = class,
            text = escape_html(&item.text),
            toggle = toggle,
            label = label,
        )
    }
}

/// Escapes text for embedding in HTML element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turns handler output into a response in the negotiated format. Cheap to clone.
#[derive(Clone)]
pub struct Renderer {
    templates: Arc<dyn Templates>,
}

impl Renderer {
    pub fn new(templates: impl Templates + 'static) -> Self {
        Self { templates: Arc::new(templates) }
    }

    pub fn render(&self, format: Format, output: &Output) -> Response {
        match (format, output) {
            (Format::Json, Output::List(items)) => json(items),
            (Format::Json, Output::Item(item)) => json(item),
            (Format::Json, Output::Deleted) => Response::status(Status::NoContent),
            (Format::Html, Output::List(items)) => Response::html(self.templates.page(items)),
            (Format::Html, Output::Item(item)) => Response::html(self.templates.fragment(item)),
            (Format::Html, Output::Deleted) => Response::html(""),
        }
    }
}

impl Default for Renderer {
    fn default() -> Self { Self::new(DefaultTemplates) }
}

/// serde_json never HTML-escapes, so text fields keep their literal characters.
fn json<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            Response::json(bytes)
        }
        Err(e) => {
            error!("error encoding response to json: {e}");
            Response::error(Status::InternalServerError, "unable to render response")
        }
    }
}
