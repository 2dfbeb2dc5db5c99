use bytes::{BufMut, Bytes};
use futures_util::TryStreamExt;
use warp::{
    http::{Method, StatusCode},
    multipart::FormData,
    reject::Rejection,
    reply::Response,
    Filter,
};

use crate::{
    api::{
        openapi::{ImageUpload, RecipeRequest},
        query::{self, QueryParams},
        routes::{json_body, json_response, no_content, parse_form, respond},
        serializers,
    },
    authentication::middleware::with_session,
    constants::{IMAGE_FIELD, MAX_IMAGE_BYTES},
    database::{
        schema::{Id, Recipe, RecipeDetail, RecipeImage, RecipeSummary, User},
        store::RecipeStore,
    },
    error::{ApiResult, Error, HtmlError},
    state::{with_state, AppState},
};

/// `/recipes`, `/recipes/{id}` and `/recipes/{id}/upload-image`.
pub fn routes(state: AppState) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let collection = warp::path!("recipes")
        .and(warp::method())
        .and(with_session(state.clone()))
        .and(warp::query::<QueryParams>())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(manage_recipes);

    let item = warp::path!("recipes" / Id)
        .and(warp::method())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(manage_recipe);

    let upload = warp::path!("recipes" / Id / "upload-image")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(require_owner)
        .untuple_one()
        .and(warp::multipart::form().max_length(MAX_IMAGE_BYTES))
        .and(with_state(state))
        .and_then(upload_image);

    collection.or(item).unify().or(upload).unify()
}

async fn manage_recipes(
    method: Method,
    user: User,
    params: QueryParams,
    body: Bytes,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = match method {
        Method::GET => list(&user, &params, &state).await,
        Method::POST => create(&user, &body, &state).await,
        other => Err(Error::method_not_allowed(&other)),
    };
    respond(result)
}

#[utoipa::path(
    get,
    path = "/api/recipe/recipes",
    tag = "recipes",
    operation_id = "recipes_list",
    params(
        ("tags" = Option<String>, Query, description = "Comma separated tag ids to filter by"),
        ("ingredients" = Option<String>, Query, description = "Comma separated ingredient ids to filter by"),
    ),
    responses(
        (status = 200, description = "Owned recipes, newest first", body = [RecipeSummary]),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn list(user: &User, params: &QueryParams, state: &AppState) -> ApiResult<Response> {
    let filter = query::recipe_filter(params)?;
    let recipes = state.store.list_recipes(user.id, &filter).await?;
    let summaries: Vec<_> = recipes.iter().map(Recipe::summary).collect();

    Ok(json_response(&summaries, StatusCode::OK))
}

#[utoipa::path(
    post,
    path = "/api/recipe/recipes",
    tag = "recipes",
    operation_id = "recipes_create",
    request_body = RecipeRequest,
    responses(
        (status = 201, description = "Created recipe", body = RecipeSummary),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn create(user: &User, body: &[u8], state: &AppState) -> ApiResult<Response> {
    let draft = serializers::recipe_draft(&parse_form(body)?)?;
    let recipe = state.store.create_recipe(user.id, draft).await?;

    Ok(json_response(&recipe.summary(), StatusCode::CREATED))
}

async fn manage_recipe(
    id: Id,
    method: Method,
    user: User,
    body: Bytes,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = match method {
        Method::GET => retrieve(id, &user, &state).await,
        Method::PUT => replace(id, &user, &body, &state).await,
        Method::PATCH => modify(id, &user, &body, &state).await,
        Method::DELETE => destroy(id, &user, &state).await,
        other => Err(Error::method_not_allowed(&other)),
    };
    respond(result)
}

async fn owned_recipe(id: Id, user: &User, state: &AppState) -> ApiResult<Recipe> {
    state
        .store
        .get_recipe(user.id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())
}

#[utoipa::path(
    get,
    path = "/api/recipe/recipes/{id}",
    tag = "recipes",
    operation_id = "recipes_retrieve",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "The recipe", body = RecipeDetail),
        (status = 404, description = "Not found for this user"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn retrieve(id: Id, user: &User, state: &AppState) -> ApiResult<Response> {
    let recipe = owned_recipe(id, user, state).await?;
    Ok(json_response(&recipe.detail(), StatusCode::OK))
}

#[utoipa::path(
    put,
    path = "/api/recipe/recipes/{id}",
    tag = "recipes",
    operation_id = "recipes_update",
    params(("id" = i32, Path, description = "Recipe id")),
    request_body = RecipeRequest,
    responses(
        (status = 200, description = "Updated recipe", body = RecipeDetail),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not found for this user"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn replace(id: Id, user: &User, body: &[u8], state: &AppState) -> ApiResult<Response> {
    update(id, user, body, false, state).await
}

/// Like `PUT`, but every field is optional.
#[utoipa::path(
    patch,
    path = "/api/recipe/recipes/{id}",
    tag = "recipes",
    operation_id = "recipes_partial_update",
    params(("id" = i32, Path, description = "Recipe id")),
    request_body = RecipeRequest,
    responses(
        (status = 200, description = "Updated recipe", body = RecipeDetail),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not found for this user"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn modify(id: Id, user: &User, body: &[u8], state: &AppState) -> ApiResult<Response> {
    update(id, user, body, true, state).await
}

async fn update(
    id: Id,
    user: &User,
    body: &[u8],
    partial: bool,
    state: &AppState,
) -> ApiResult<Response> {
    owned_recipe(id, user, state).await?;

    let patch = serializers::recipe_patch(&parse_form(body)?, partial)?;
    let recipe = state
        .store
        .update_recipe(user.id, id, patch)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_response(&recipe.detail(), StatusCode::OK))
}

#[utoipa::path(
    delete,
    path = "/api/recipe/recipes/{id}",
    tag = "recipes",
    operation_id = "recipes_destroy",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found for this user"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn destroy(id: Id, user: &User, state: &AppState) -> ApiResult<Response> {
    if !state.store.delete_recipe(user.id, id).await? {
        return Err(HtmlError::NotFound.default());
    }

    log::info!("Deleted recipe {id} of user {}", user.id);
    Ok(no_content())
}

struct Upload {
    filename: Option<String>,
    data: Vec<u8>,
}

/// Reads the `image` part of the form, skipping every other part.
async fn read_image_part(mut form: FormData) -> ApiResult<Option<Upload>> {
    let malformed = |e: warp::Error| {
        log::debug!("Rejected multipart body: {e}");
        HtmlError::InvalidRequest.new("Multipart form parse error.")
    };

    while let Some(mut part) = form.try_next().await.map_err(malformed)? {
        if part.name() != IMAGE_FIELD {
            continue;
        }

        let filename = part.filename().map(str::to_owned);
        let mut data = Vec::new();
        while let Some(chunk) = part.data().await {
            data.put(chunk.map_err(malformed)?);
        }
        return Ok(Some(Upload { filename, data }));
    }

    Ok(None)
}

/// Runs ahead of the multipart filter so foreign or missing recipes are 404
/// whatever the body holds.
async fn require_owner(id: Id, user: User, state: AppState) -> Result<(Id, User), Rejection> {
    owned_recipe(id, &user, &state)
        .await
        .map_err(warp::reject::custom)?;
    Ok((id, user))
}

async fn upload_image(
    id: Id,
    user: User,
    form: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    respond(store_image(id, &user, form, &state).await)
}

#[utoipa::path(
    post,
    path = "/api/recipe/recipes/{id}/upload-image",
    tag = "recipes",
    operation_id = "recipes_upload_image",
    params(("id" = i32, Path, description = "Recipe id")),
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored image", body = RecipeImage),
        (status = 400, description = "Missing or invalid image"),
        (status = 404, description = "Not found for this user"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn store_image(
    id: Id,
    user: &User,
    form: FormData,
    state: &AppState,
) -> ApiResult<Response> {
    let Some(upload) = read_image_part(form).await? else {
        return Err(Error::field(IMAGE_FIELD, "No file was submitted."));
    };

    let path = state
        .media
        .save_recipe_image(upload.filename.as_deref(), &upload.data)
        .await?;
    let recipe = state
        .store
        .set_recipe_image(user.id, id, &path)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_response(&recipe.image_info(), StatusCode::OK))
}
