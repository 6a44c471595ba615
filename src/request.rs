//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::HeaderMap;
use serde::de::{DeserializeOwned, Error as _};

use crate::method::Method;

/// An incoming HTTP request with its body already collected.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: impl Into<String>,
        query: Option<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            query,
            headers,
            body,
            params: HashMap::new(),
        }
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The raw `Accept` header, if any.
    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/do/{id}`, `req.param("id")` on `/do/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Decodes form fields into `T`.
    ///
    /// Fields come from an `application/x-www-form-urlencoded` body; a field
    /// missing from the body is taken from the query string instead. A body
    /// with any other content type is ignored. A repeated field keeps its
    /// first value.
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
        let mut fields: Vec<(String, String)> = Vec::new();
        if self.has_form_body() {
            keep_first(&mut fields, serde_urlencoded::from_bytes(&self.body)?);
        }
        if let Some(query) = &self.query {
            keep_first(&mut fields, serde_urlencoded::from_str(query)?);
        }
        // Re-encoding the merged pairs lets serde_urlencoded drive `T`'s Deserialize.
        let merged = serde_urlencoded::to_string(&fields)
            .map_err(serde_urlencoded::de::Error::custom)?;
        serde_urlencoded::from_str(&merged)
    }

    fn has_form_body(&self) -> bool {
        match self.header("content-type") {
            Some(ct) => ct
                .split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded")),
            // Read as a form even though no content type was declared;
            // strict form parsers would drop this body.
            None => !self.body.is_empty(),
        }
    }
}

/// Appends the pairs whose key is not already present.
fn keep_first(fields: &mut Vec<(String, String)>, pairs: Vec<(String, String)>) {
    for (key, value) in pairs {
        if !fields.iter().any(|(k, _)| *k == key) {
            fields.push((key, value));
        }
    }
}
