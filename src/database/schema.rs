use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::constants::MEDIA_URL;

pub type Id = i32;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Profile {
    pub name: String,
    pub email: String,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.to_owned(),
            email: user.email.to_owned(),
        }
    }
}

/// The two labelled entity kinds a recipe can be tagged with. They share one
/// table shape and differ only by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Taxonomy {
    Tag,
    Ingredient,
}

impl Taxonomy {
    pub fn table(&self) -> &'static str {
        match self {
            Taxonomy::Tag => "tags",
            Taxonomy::Ingredient => "ingredients",
        }
    }

    pub fn link_table(&self) -> &'static str {
        match self {
            Taxonomy::Tag => "recipe_tags",
            Taxonomy::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(&self) -> &'static str {
        match self {
            Taxonomy::Tag => "tag_id",
            Taxonomy::Ingredient => "ingredient_id",
        }
    }

    /// Url segment of the collection endpoint.
    pub fn path_segment(&self) -> &'static str {
        self.table()
    }

    /// Request field that carries this kind on a recipe payload.
    pub fn field(&self) -> &'static str {
        match self {
            Taxonomy::Tag => "tags",
            Taxonomy::Ingredient => "ingredients",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TaxonomyItem {
    pub id: Id,
    pub name: String,
    #[serde(skip_serializing)]
    pub user_id: Id,
}

pub type Tag = TaxonomyItem;
pub type Ingredient = TaxonomyItem;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct RecipeRow {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedItem {
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
    pub user_id: Id,
}

impl From<LinkedItem> for TaxonomyItem {
    fn from(value: LinkedItem) -> Self {
        Self {
            id: value.id,
            name: value.name,
            user_id: value.user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn from_row(row: RecipeRow, tags: Vec<Tag>, ingredients: Vec<Ingredient>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            time_minutes: row.time_minutes,
            price: row.price,
            link: row.link,
            image: row.image,
            tags,
            ingredients,
        }
    }

    pub fn image_url(&self) -> Option<String> {
        self.image.as_deref().map(|path| format!("{MEDIA_URL}{path}"))
    }

    pub fn summary(&self) -> RecipeSummary {
        let mut price = self.price;
        price.rescale(crate::constants::PRICE_DECIMAL_PLACES);

        RecipeSummary {
            id: self.id,
            title: self.title.to_owned(),
            time_minutes: self.time_minutes,
            price: price.to_string(),
            link: self.link.to_owned(),
            tags: self.tags.to_owned(),
            ingredients: self.ingredients.to_owned(),
            image: self.image_url(),
        }
    }

    pub fn detail(&self) -> RecipeDetail {
        RecipeDetail {
            summary: self.summary(),
            description: self.description.to_owned(),
        }
    }

    pub fn image_info(&self) -> RecipeImage {
        RecipeImage {
            id: self.id,
            image: self.image_url(),
        }
    }
}

/// List representation, without the description.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: Id,
    pub title: String,
    pub time_minutes: i32,
    /// Decimal with two places, e.g. `"5.25"`.
    pub price: String,
    pub link: String,
    pub tags: Vec<TaxonomyItem>,
    pub ingredients: Vec<TaxonomyItem>,
    /// Url below `/media/`.
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeImage {
    pub id: Id,
    pub image: Option<String>,
}
