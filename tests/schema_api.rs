mod common;

use common::{json_body, TestApp};
use serde_json::Value;
use warp::http::StatusCode;

const SCHEMA_URL: &str = "/api/schema";

fn parameter_names(operation: &Value) -> Vec<String> {
    operation["parameters"]
        .as_array()
        .map(|params| {
            params
                .iter()
                .filter_map(|p| p["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn schema_is_public() {
    let app = TestApp::new();

    let res = app.send(warp::test::request().path(SCHEMA_URL)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let document = json_body(&res);
    assert!(document["openapi"].as_str().unwrap().starts_with("3."));
    assert_eq!(document["info"]["title"], "Recipe API");
}

#[tokio::test]
async fn recipe_filters_are_documented() {
    let app = TestApp::new();

    let res = app.send(warp::test::request().path(SCHEMA_URL)).await;
    let document = json_body(&res);

    let names = parameter_names(&document["paths"]["/api/recipe/recipes"]["get"]);
    assert!(names.contains(&String::from("tags")), "{names:?}");
    assert!(names.contains(&String::from("ingredients")), "{names:?}");
}

#[tokio::test]
async fn assigned_only_is_documented_for_both_kinds() {
    let app = TestApp::new();

    let res = app.send(warp::test::request().path(SCHEMA_URL)).await;
    let document = json_body(&res);

    for path in ["/api/recipe/tags", "/api/recipe/ingredients"] {
        let names = parameter_names(&document["paths"][path]["get"]);
        assert_eq!(names, vec!["assigned_only"], "{path}");
    }
}

#[tokio::test]
async fn upload_is_documented_as_multipart() {
    let app = TestApp::new();

    let res = app.send(warp::test::request().path(SCHEMA_URL)).await;
    let document = json_body(&res);

    let body = &document["paths"]["/api/recipe/recipes/{id}/upload-image"]["post"]["requestBody"];
    assert!(body["content"]["multipart/form-data"].is_object());
}
