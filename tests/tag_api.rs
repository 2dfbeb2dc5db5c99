mod common;

use common::{authed, json_body, TestApp};
use recipe_api::database::{schema::Taxonomy, store::TaxonomyStore};
use serde_json::json;
use warp::http::StatusCode;

const TAGS_URL: &str = "/api/recipe/tags";

fn detail_url(id: i32) -> String {
    format!("{TAGS_URL}/{id}")
}

#[tokio::test]
async fn auth_required() {
    let app = TestApp::new();

    let res = app.send(warp::test::request().path(TAGS_URL)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn retrieve_tags_by_name_descending() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    app.create_recipe_with(&user, "Soup", &["Vegan", "Dessert"], &[]).await;

    let res = app.send(authed("GET", TAGS_URL, &token)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let names: Vec<String> = json_body(&res)
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Vegan", "Dessert"]);
}

#[tokio::test]
async fn tags_limited_to_user() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    let (other, _) = app.login("other@example.com").await;
    app.create_recipe_with(&other, "Theirs", &["Fruity"], &[]).await;
    let mine = app.create_recipe_with(&user, "Mine", &["Comfort Food"], &[]).await;

    let res = app.send(authed("GET", TAGS_URL, &token)).await;
    let body = json_body(&res);

    assert_eq!(body, json!([{ "id": mine.tags[0].id, "name": "Comfort Food" }]));
}

#[tokio::test]
async fn retrieve_single_tag() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    let recipe = app.create_recipe_with(&user, "Soup", &["After Dinner"], &[]).await;

    let res = app.send(authed("GET", &detail_url(recipe.tags[0].id), &token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(&res)["name"], "After Dinner");
}

#[tokio::test]
async fn update_tag() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    let recipe = app.create_recipe_with(&user, "Soup", &["After Dinner"], &[]).await;
    let tag_id = recipe.tags[0].id;

    let res = app
        .send(authed("PATCH", &detail_url(tag_id), &token).json(&json!({ "name": "Dessert" })))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let stored = app
        .state
        .store
        .get_item(Taxonomy::Tag, user.id, tag_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Dessert");
}

#[tokio::test]
async fn put_requires_name() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    let recipe = app.create_recipe_with(&user, "Soup", &["Dinner"], &[]).await;

    let res = app
        .send(authed("PUT", &detail_url(recipe.tags[0].id), &token).json(&json!({})))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&res)["name"], json!(["This field is required."]));
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    let recipe = app.create_recipe_with(&user, "Soup", &["Dinner"], &[]).await;

    let res = app
        .send(authed("PATCH", &detail_url(recipe.tags[0].id), &token).json(&json!({ "name": "  " })))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_tag() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    let recipe = app.create_recipe_with(&user, "Soup", &["Breakfast"], &[]).await;

    let res = app.send(authed("DELETE", &detail_url(recipe.tags[0].id), &token)).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let tags = app.state.store.list_items(Taxonomy::Tag, user.id, false).await.unwrap();
    assert!(tags.is_empty());
}

#[tokio::test]
async fn other_users_tag_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.login("user@example.com").await;
    let (other, _) = app.login("other@example.com").await;
    let recipe = app.create_recipe_with(&other, "Theirs", &["Private"], &[]).await;
    let tag_id = recipe.tags[0].id;

    let res = app.send(authed("GET", &detail_url(tag_id), &token)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .send(authed("PATCH", &detail_url(tag_id), &token).json(&json!({ "name": "Mine" })))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.send(authed("DELETE", &detail_url(tag_id), &token)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_through_collection_is_not_allowed() {
    let app = TestApp::new();
    let (_, token) = app.login("user@example.com").await;

    let res = app
        .send(authed("POST", TAGS_URL, &token).json(&json!({ "name": "Direct" })))
        .await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn filter_tags_assigned_to_recipes() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    let recipe = app.create_recipe_with(&user, "Soup", &["Breakfast", "Lunch"], &[]).await;

    let lunch = recipe.tags.iter().find(|t| t.name == "Lunch").unwrap().id;
    let res = app
        .send(
            authed("PATCH", &format!("/api/recipe/recipes/{}", recipe.id), &token)
                .json(&json!({ "tags": [{ "name": "Breakfast" }] })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.send(authed("GET", &format!("{TAGS_URL}?assigned_only=1"), &token)).await;
    let body = json_body(&res);
    let ids: Vec<i64> = body.as_array().unwrap().iter().map(|t| t["id"].as_i64().unwrap()).collect();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(!ids.contains(&(lunch as i64)));
}

#[tokio::test]
async fn filtered_tags_are_unique() {
    let app = TestApp::new();
    let (user, token) = app.login("user@example.com").await;
    app.create_recipe_with(&user, "Pancakes", &["Breakfast"], &[]).await;
    app.create_recipe_with(&user, "Porridge", &["Breakfast"], &[]).await;
    app.create_recipe_with(&user, "Soup", &["Dinner"], &[]).await;

    let res = app.send(authed("GET", &format!("{TAGS_URL}?assigned_only=1"), &token)).await;
    let names: Vec<String> = json_body(&res)
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Dinner", "Breakfast"]);
}

#[tokio::test]
async fn invalid_assigned_only_is_bad_request() {
    let app = TestApp::new();
    let (_, token) = app.login("user@example.com").await;

    let res = app.send(authed("GET", &format!("{TAGS_URL}?assigned_only=yes"), &token)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
