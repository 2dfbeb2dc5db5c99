use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{
    error::QueryError,
    schema::{Id, Recipe, Taxonomy, TaxonomyItem, User},
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.password_hash.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// Partial recipe update. `None` leaves the column alone; a `Some` list
/// replaces the whole association set, even when empty.
#[derive(Debug, Clone, Default)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipePatch {
    pub fn names(&self, kind: Taxonomy) -> Option<&Vec<String>> {
        match kind {
            Taxonomy::Tag => self.tags.as_ref(),
            Taxonomy::Ingredient => self.ingredients.as_ref(),
        }
    }
}

impl RecipeDraft {
    pub fn names(&self, kind: Taxonomy) -> &[String] {
        match kind {
            Taxonomy::Tag => &self.tags,
            Taxonomy::Ingredient => &self.ingredients,
        }
    }
}

/// Membership filters for the recipe list. Both present means both must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeFilter {
    pub fn ids(&self, kind: Taxonomy) -> Option<&Vec<Id>> {
        match kind {
            Taxonomy::Tag => self.tags.as_ref(),
            Taxonomy::Ingredient => self.ingredients.as_ref(),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<User, QueryError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, QueryError>;
    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, QueryError>;
    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<Option<User>, QueryError>;
}

/// Tags and ingredients. Every operation is scoped to `owner`.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn list_items(
        &self,
        kind: Taxonomy,
        owner: Id,
        assigned_only: bool,
    ) -> Result<Vec<TaxonomyItem>, QueryError>;
    async fn get_item(
        &self,
        kind: Taxonomy,
        owner: Id,
        id: Id,
    ) -> Result<Option<TaxonomyItem>, QueryError>;
    async fn rename_item(
        &self,
        kind: Taxonomy,
        owner: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<TaxonomyItem>, QueryError>;
    async fn delete_item(&self, kind: Taxonomy, owner: Id, id: Id) -> Result<bool, QueryError>;
}

/// Recipes. Every operation is scoped to `owner`.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn list_recipes(&self, owner: Id, filter: &RecipeFilter)
        -> Result<Vec<Recipe>, QueryError>;
    async fn get_recipe(&self, owner: Id, id: Id) -> Result<Option<Recipe>, QueryError>;
    async fn create_recipe(&self, owner: Id, draft: RecipeDraft) -> Result<Recipe, QueryError>;
    async fn update_recipe(
        &self,
        owner: Id,
        id: Id,
        patch: RecipePatch,
    ) -> Result<Option<Recipe>, QueryError>;
    async fn delete_recipe(&self, owner: Id, id: Id) -> Result<bool, QueryError>;
    async fn set_recipe_image(
        &self,
        owner: Id,
        id: Id,
        path: &str,
    ) -> Result<Option<Recipe>, QueryError>;
}

pub trait Store: UserStore + TaxonomyStore + RecipeStore {}

impl<T> Store for T where T: UserStore + TaxonomyStore + RecipeStore {}

/// Drops repeated names while keeping first-seen order.
pub fn unique_names(names: &[String]) -> Vec<&str> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(&name.as_str()) {
            seen.push(name.as_str());
        }
    }
    seen
}
