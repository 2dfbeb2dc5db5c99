use utoipa::{
    openapi::{
        path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn},
        request_body::RequestBodyBuilder,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
        ArrayBuilder, Components, Content, ObjectBuilder, Ref, Required, ResponseBuilder,
        SecurityRequirement, Type,
    },
    Modify, OpenApi, ToSchema,
};
use warp::{http::StatusCode, reject::Rejection, reply::Response, Filter};

use crate::{
    api::{recipes, routes::json_response, users},
    constants::AUTH_SCHEMES,
    database::schema::{Profile, RecipeDetail, RecipeImage, RecipeSummary, Taxonomy, TaxonomyItem},
};

const TOKEN_AUTH: &str = "token_auth";

#[derive(ToSchema)]
pub struct SignupRequest {
    pub email: String,
    /// At least 5 characters.
    pub password: String,
    pub name: String,
}

#[derive(ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(ToSchema)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// A tag or ingredient, found by name or created for the caller.
#[derive(ToSchema)]
pub struct ItemNameRequest {
    pub name: String,
}

#[derive(ToSchema)]
pub struct RecipeRequest {
    pub title: String,
    pub time_minutes: i32,
    /// Up to 5 digits, 2 of them decimals.
    pub price: String,
    pub description: Option<String>,
    pub link: Option<String>,
    /// Replaces every tag of the recipe when present.
    pub tags: Option<Vec<ItemNameRequest>>,
    /// Replaces every ingredient of the recipe when present.
    pub ingredients: Option<Vec<ItemNameRequest>>,
}

#[derive(ToSchema)]
pub struct ImageUpload {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Recipe API"),
    paths(
        users::signup,
        users::login,
        users::profile,
        users::update_me,
        recipes::list,
        recipes::create,
        recipes::retrieve,
        recipes::replace,
        recipes::modify,
        recipes::destroy,
        recipes::store_image,
    ),
    components(schemas(
        Profile,
        TaxonomyItem,
        RecipeSummary,
        RecipeDetail,
        RecipeImage,
        SignupRequest,
        CredentialsRequest,
        TokenResponse,
        ProfileUpdateRequest,
        ItemNameRequest,
        RecipeRequest,
        ImageUpload,
    )),
    modifiers(&TokenAuth, &TaxonomyPaths),
    tags(
        (name = "user", description = "Accounts and tokens"),
        (name = "recipes", description = "Recipes of the calling user"),
        (name = "tags", description = "Tags of the calling user"),
        (name = "ingredients", description = "Ingredients of the calling user"),
    )
)]
pub struct ApiDoc;

struct TokenAuth;

impl Modify for TokenAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let description = format!(
            "`{} <token>` or `{} <token>`, token from /api/user/token",
            AUTH_SCHEMES[0], AUTH_SCHEMES[1]
        );
        openapi
            .components
            .get_or_insert_with(Components::new)
            .add_security_scheme(
                TOKEN_AUTH,
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    String::from("Authorization"),
                    description,
                ))),
            );
    }
}

/// Tag and ingredient endpoints share one implementation, so their
/// operations are generated per kind.
struct TaxonomyPaths;

impl Modify for TaxonomyPaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
            let collection = format!("/api/recipe/{}", kind.path_segment());
            let item = format!("{collection}/{{id}}");
            let paths = &mut openapi.paths;

            paths.add_path_operation(&collection, vec![HttpMethod::Get], list_items(kind));
            paths.add_path_operation(
                &item,
                vec![HttpMethod::Get],
                item_operation(kind, "retrieve", "200", "The item"),
            );
            paths.add_path_operation(
                &item,
                vec![HttpMethod::Put],
                item_operation(kind, "update", "200", "Renamed item").request_body(Some(name_body())),
            );
            paths.add_path_operation(
                &item,
                vec![HttpMethod::Patch],
                item_operation(kind, "partial_update", "200", "Renamed item")
                    .request_body(Some(name_body())),
            );
            paths.add_path_operation(
                &item,
                vec![HttpMethod::Delete],
                item_operation(kind, "destroy", "204", "Deleted, links to recipes removed"),
            );
        }
    }
}

fn integer() -> ObjectBuilder {
    ObjectBuilder::new().schema_type(Type::Integer)
}

fn item_content() -> Content {
    Content::new(Some(Ref::from_schema_name("TaxonomyItem")))
}

fn name_body() -> utoipa::openapi::request_body::RequestBody {
    RequestBodyBuilder::new()
        .content(
            "application/json",
            Content::new(Some(Ref::from_schema_name("ItemNameRequest"))),
        )
        .required(Some(Required::True))
        .build()
}

fn operation(kind: Taxonomy, action: &str) -> OperationBuilder {
    OperationBuilder::new()
        .tag(kind.path_segment())
        .operation_id(Some(format!("{}_{action}", kind.path_segment())))
        .security(SecurityRequirement::new(TOKEN_AUTH, Vec::<String>::new()))
        .response("401", ResponseBuilder::new().description("Missing or invalid token"))
}

fn list_items(kind: Taxonomy) -> OperationBuilder {
    let assigned_only = ParameterBuilder::new()
        .name("assigned_only")
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some("Non-zero to list only items used by a recipe"))
        .schema(Some(integer()));

    operation(kind, "list")
        .summary(Some(format!("List {} ordered by name, descending", kind.table())))
        .parameter(assigned_only)
        .response(
            "200",
            ResponseBuilder::new().description("Owned items").content(
                "application/json",
                Content::new(Some(
                    ArrayBuilder::new().items(Ref::from_schema_name("TaxonomyItem")),
                )),
            ),
        )
        .response("400", ResponseBuilder::new().description("Invalid assigned_only"))
}

fn item_operation(kind: Taxonomy, action: &str, status: &str, description: &str) -> OperationBuilder {
    let id = ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(integer()));

    let success = match status {
        "204" => ResponseBuilder::new().description(description),
        _ => ResponseBuilder::new()
            .description(description)
            .content("application/json", item_content()),
    };

    operation(kind, action)
        .parameter(id)
        .response(status, success)
        .response("404", ResponseBuilder::new().description("Not found for this user"))
}

/// `GET /api/schema`, the OpenAPI document of the whole API.
pub fn routes() -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let document = ApiDoc::openapi();

    warp::path!("api" / "schema")
        .and(warp::get())
        .map(move || json_response(&document, StatusCode::OK))
}
