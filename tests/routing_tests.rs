use brrtlogic::introspect::{resolve, ParameterSet};
use brrtlogic::routing::{create_routes, delete, get, post, put, HandlerBase, HttpMethod, Route};
use brrtlogic::runtime_config::Settings;
use http::Method;
use std::sync::Arc;

mod common;
use common::fixtures::*;

fn params(all: &[&str], required: &[&str], optional: &[&str], logic: &[&str]) -> ParameterSet {
    let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
    ParameterSet {
        all: owned(all),
        required: owned(required),
        optional: owned(optional),
        logic: owned(logic),
    }
}

#[test]
fn test_httpmethod() {
    let logic = get_foo();
    let m = HttpMethod::new(Method::GET, Arc::clone(&logic)).allow::<std::io::Error>();
    assert_eq!(&Method::GET, m.method());
    assert!(Arc::ptr_eq(&logic, m.logic()));
    assert_eq!(
        params(
            &["name", "age", "is_alive"],
            &["name", "age"],
            &["is_alive"],
            &["name", "age", "is_alive"],
        ),
        m.params().params
    );
    assert_eq!(
        vec![std::any::type_name::<std::io::Error>()],
        m.allowed().type_names().collect::<Vec<_>>()
    );
}

#[test]
fn test_verb_helpers_match_httpmethod() {
    let logic = get_foo();
    for (actual, expected) in [
        (delete(Arc::clone(&logic)), Method::DELETE),
        (get(Arc::clone(&logic)), Method::GET),
        (post(Arc::clone(&logic)), Method::POST),
        (put(Arc::clone(&logic)), Method::PUT),
    ] {
        let reference = HttpMethod::new(expected, Arc::clone(&logic));
        assert_eq!(reference.method(), actual.method());
        assert!(Arc::ptr_eq(reference.logic(), actual.logic()));
    }
}

#[test]
fn test_get_params_from_func() {
    assert_eq!(
        params(
            &["name", "age", "is_alive"],
            &["name", "age"],
            &["is_alive"],
            &["name", "age", "is_alive"],
        ),
        resolve(get_foo().as_ref())
    );
}

#[test]
fn test_get_params_from_func_no_params() {
    assert_eq!(ParameterSet::default(), resolve(no_params().as_ref()));
}

#[test]
fn test_get_params_from_func_decorated_func() {
    // `extra` is supplied by the wrapping layer and untyped, so never required.
    assert_eq!(
        params(
            &["extra", "name", "is_alive"],
            &["name"],
            &["is_alive"],
            &["extra", "name", "is_alive"],
        ),
        resolve(decorated_func().as_ref())
    );
}

#[test]
fn test_required_never_optional() {
    for logic in [delete_foo(), get_foo(), get_foos(), create_foo(), update_foo(), decorated_func()] {
        let p = resolve(logic.as_ref());
        assert!(p.required.iter().all(|r| p.all.contains(r)));
        assert!(p.required.iter().all(|r| !p.optional.contains(r)));
    }
}

#[derive(Debug)]
struct MyHandler;

impl HandlerBase for MyHandler {
    fn name(&self) -> &str {
        "MyHandler"
    }
}

#[test]
fn test_create_routes() {
    let routes = vec![
        Route::new("^/foo/?$", [get(get_foos()), post(create_foo())])
            .base_handler(MyHandler)
            .handler_name("MyHandler"),
        Route::new(
            "^/foo/<int:foo_id>/?$",
            [delete(delete_foo()), get(get_foo()), put(update_foo())],
        ),
    ];
    let actual = create_routes(&routes, &Settings::default()).unwrap();

    // 2 routes created
    assert_eq!(2, actual.len());

    let (route, handler) = &actual[0];
    assert_eq!("^/foo/?$", route);
    assert_eq!("MyHandler", handler.base().name());
    assert_eq!("MyHandler", handler.name());
    assert!(handler.has_method(&Method::GET));
    assert!(handler.has_method(&Method::POST));
    assert_eq!(&[Method::GET, Method::POST], handler.methods());

    let get_method = handler.method(&Method::GET).unwrap();
    assert_eq!(
        params(&["is_alive"], &[], &["is_alive"], &["is_alive"]),
        get_method.params().params
    );
    assert_eq!("get_foos", get_method.logic().name());
    assert_eq!(1, get_method.params().signature.parameters().len());

    let post_method = handler.method(&Method::POST).unwrap();
    assert_eq!(
        params(&["name"], &["name"], &[], &["name"]),
        post_method.params().params
    );

    let (route, handler) = &actual[1];
    assert_eq!("^/foo/<int:foo_id>/?$", route);
    assert_eq!("delete_foo", handler.name());
    assert_eq!("Resource", handler.base().name());
    assert_eq!(&[Method::DELETE, Method::GET, Method::PUT], handler.methods());
    assert!(handler.has_method(&Method::DELETE));
    assert!(handler.has_method(&Method::GET));
    assert!(handler.has_method(&Method::PUT));
    assert!(!handler.has_method(&Method::POST));
}

#[test]
fn test_create_routes_is_deterministic() {
    let routes = vec![
        Route::new("/a", [put(update_foo()), get(get_foo()), delete(delete_foo())]),
        Route::new("/b", [post(create_foo())]),
    ];
    let order = |settings: &Settings| {
        create_routes(&routes, settings)
            .unwrap()
            .into_iter()
            .map(|(path, h)| (path, h.name().to_string(), h.methods().to_vec()))
            .collect::<Vec<_>>()
    };
    let first = order(&Settings::default());
    for _ in 0..5 {
        assert_eq!(first, order(&Settings::default()));
    }
    assert_eq!(vec![Method::PUT, Method::GET, Method::DELETE], first[0].2);
}

#[test]
fn test_annotations_follow_bindings() {
    let routes = vec![Route::new(
        "/foo",
        [get(get_foos()).title("List foos"), post(create_foo())],
    )
    .heading("Foo")];
    let actual = create_routes(&routes, &Settings::default()).unwrap();
    let handler = &actual[0].1;
    assert_eq!(Some("Foo"), handler.heading());

    let titles: Vec<_> = handler
        .annotations()
        .map(|a| (a.http_method.clone(), a.title.clone()))
        .collect();
    assert_eq!(
        vec![
            ("GET".to_string(), Some("List foos".to_string())),
            ("POST".to_string(), Some("Create".to_string())),
        ],
        titles
    );
    let post_annotation = handler.annotation(&Method::POST).unwrap();
    assert_eq!("create_foo", post_annotation.logic);
    assert_eq!(Some("Foo".to_string()), post_annotation.heading);
}

#[test]
fn test_signature_is_memoized_per_function() {
    let logic = get_foo();
    let a = get(Arc::clone(&logic)).params();
    let b = put(Arc::clone(&logic)).params();
    assert!(Arc::ptr_eq(&a, &b));
}
