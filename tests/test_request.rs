use std::collections::HashSet;

use senceit_node::http::request::{Method, RequestBuilder, Route};
use serde_json::json;

#[test]
fn test_request_header_retrieval() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Host", "192.168.4.1")
        .header("Content-Type", "application/json")
        .build()
        .unwrap();

    assert_eq!(req.header("Host"), Some("192.168.4.1"));
    assert_eq!(req.header("Content-Type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length_parsing() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .path("/config")
        .header("Content-Length", "42")
        .body(json!({}))
        .build()
        .unwrap();

    assert_eq!(req.content_length(), 42);
    assert_eq!(req.body(), Some(&json!({})));
}

#[test]
fn test_request_content_length_missing_or_invalid() {
    let missing = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    let invalid = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Content-Length", "abc")
        .build()
        .unwrap();

    assert_eq!(missing.content_length(), 0);
    assert_eq!(invalid.content_length(), 0);
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[test]
fn test_request_route_matches_method_and_path() {
    let req = RequestBuilder::new()
        .method(Method::DELETE)
        .path("/config")
        .query("force", "1")
        .build()
        .unwrap();

    assert_eq!(req.route(), &Route::new(Method::DELETE, "/config"));
    assert_eq!(req.method(), Method::DELETE);
    assert_eq!(req.path(), "/config");
    assert_eq!(req.query()["force"], "1");
}

#[test]
fn test_route_value_semantics() {
    let mut routes = HashSet::new();
    routes.insert(Route::new(Method::GET, "/config"));
    routes.insert(Route::new(Method::GET, "/config"));
    routes.insert(Route::new(Method::POST, "/config"));

    assert_eq!(routes.len(), 2);
    assert!(routes.contains(&Route::new(Method::POST, String::from("/config"))));
    assert!(!routes.contains(&Route::new(Method::PUT, "/config")));
}

#[test]
fn test_route_display() {
    assert_eq!(Route::new(Method::POST, "/config").to_string(), "POST: /config");
    assert_eq!(Method::PUT.to_string(), "PUT");
}
