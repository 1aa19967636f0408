//! Request descriptors and responses as plain data.
//!
//! # Design
//! `HttpRequest` is what the request builder produces and what a `Transport`
//! consumes. It keeps the path template and the path parameters apart so
//! tests can assert on both; `render_path` joins them, escaping each value as
//! a single URL path segment. All fields use owned types so descriptors can
//! be recorded, compared and sent to another task.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Characters escaped inside a path segment: everything except ASCII
/// alphanumerics and `- _ . ! ~ * ' ( )`, the same set as
/// `encodeURIComponent`. `/` and `\` are escaped, so a value always stays
/// one segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled request, ready to hand to a `Transport`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Name of the operation that produced this request, e.g. `getProduct`.
    pub operation: &'static str,
    pub method: HttpMethod,
    /// Path template relative to the service URL, e.g. `/products/{productId}`.
    pub path: &'static str,
    /// Template placeholder name to raw (unescaped) value.
    pub path_params: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Look up a header value, ignoring ASCII case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Raw value of a path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Substitute every `{name}` placeholder with its escaped value.
    pub fn render_path(&self) -> String {
        let mut rendered = self.path.to_string();
        for (name, value) in &self.path_params {
            let encoded = utf8_percent_encode(value, PATH_SEGMENT).to_string();
            rendered = rendered.replace(&format!("{{{name}}}"), &encoded);
        }
        rendered
    }
}

/// The transport's view of a completed 2xx exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` for an empty body, a JSON string when the
    /// server sent something that is not JSON.
    pub result: Value,
    pub headers: Vec<(String, String)>,
}

impl DetailedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Deserialize the result into one of the typed models.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.result)?)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(path: &'static str, params: &[(&str, &str)]) -> HttpRequest {
        HttpRequest {
            operation: "test",
            method: HttpMethod::Get,
            path,
            path_params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            query: Vec::new(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    #[test]
    fn render_path_substitutes_all_placeholders() {
        let req = request(
            "/products/{productId}/plans/{pricingPlanId}",
            &[("productId", "P"), ("pricingPlanId", "X")],
        );
        assert_eq!(req.render_path(), "/products/P/plans/X");
    }

    #[test]
    fn render_path_escapes_segment_characters() {
        let req = request("/products/{productId}", &[("productId", "a b/c?d%")]);
        assert_eq!(req.render_path(), "/products/a%20b%2Fc%3Fd%25");
    }

    #[test]
    fn render_path_escapes_backslash_and_brackets() {
        let req = request("/products/{productId}", &[("productId", r"abc\publish[0]^|")]);
        assert_eq!(req.render_path(), "/products/abc%5Cpublish%5B0%5D%5E%7C");
    }

    #[test]
    fn render_path_keeps_uri_component_marks() {
        let req = request("/products/{productId}", &[("productId", "a-b_c.d!e~f*g'h(i)")]);
        assert_eq!(req.render_path(), "/products/a-b_c.d!e~f*g'h(i)");
    }

    #[test]
    fn render_path_leaves_unreserved_characters() {
        let req = request(
            "/products/{productId}",
            &[("productId", "9fab83da-98cb-4f18-a7ba-b6f0435c9673")],
        );
        assert_eq!(
            req.render_path(),
            "/products/9fab83da-98cb-4f18-a7ba-b6f0435c9673"
        );
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request("/products", &[]);
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("Content-Type"), None);
    }

    #[test]
    fn path_param_lookup() {
        let req = request("/products/badges/{badgeId}", &[("badgeId", "b1")]);
        assert_eq!(req.path_param("badgeId"), Some("b1"));
        assert_eq!(req.path_param("productId"), None);
    }

    #[test]
    fn method_display() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }

    #[test]
    fn into_result_deserializes() {
        #[derive(serde::Deserialize)]
        struct Thing {
            id: String,
        }
        let response = DetailedResponse {
            status: 200,
            result: json!({"id": "abc", "extra": 1}),
            headers: Vec::new(),
        };
        let thing: Thing = response.into_result().unwrap();
        assert_eq!(thing.id, "abc");
    }

    #[test]
    fn into_result_reports_shape_mismatch() {
        let response = DetailedResponse {
            status: 200,
            result: json!("not an object"),
            headers: Vec::new(),
        };
        let err = response.into_result::<Vec<u32>>().unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
