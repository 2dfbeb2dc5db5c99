use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    error::QueryError,
    schema::{Id, Recipe, RecipeRow, Taxonomy, TaxonomyItem, User},
    store::{
        unique_names, NewUser, RecipeDraft, RecipeFilter, RecipePatch, RecipeStore, TaxonomyStore,
        UserChanges, UserStore,
    },
};

#[derive(Debug, Default)]
struct ItemTable {
    rows: BTreeMap<Id, TaxonomyItem>,
    /// `(recipe_id, item_id)` pairs.
    links: BTreeSet<(Id, Id)>,
    last_id: Id,
}

impl ItemTable {
    fn get_or_create(&mut self, owner: Id, name: &str) -> Id {
        let existing = self
            .rows
            .values()
            .find(|item| item.user_id == owner && item.name == name);
        if let Some(item) = existing {
            return item.id;
        }

        self.last_id += 1;
        let id = self.last_id;
        self.rows.insert(
            id,
            TaxonomyItem {
                id,
                name: name.to_owned(),
                user_id: owner,
            },
        );
        id
    }

    fn attach(&mut self, owner: Id, recipe_id: Id, names: &[String]) {
        for name in unique_names(names) {
            let item_id = self.get_or_create(owner, name);
            self.links.insert((recipe_id, item_id));
        }
    }

    fn detach_recipe(&mut self, recipe_id: Id) {
        self.links.retain(|(recipe, _)| *recipe != recipe_id);
    }

    fn items_of(&self, recipe_id: Id) -> Vec<TaxonomyItem> {
        self.links
            .range((recipe_id, Id::MIN)..=(recipe_id, Id::MAX))
            .filter_map(|(_, item_id)| self.rows.get(item_id).cloned())
            .collect()
    }

    fn has_any(&self, recipe_id: Id, ids: &[Id]) -> bool {
        ids.iter().any(|id| self.links.contains(&(recipe_id, *id)))
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<Id, User>,
    recipes: BTreeMap<Id, RecipeRow>,
    tags: ItemTable,
    ingredients: ItemTable,
    last_user_id: Id,
    last_recipe_id: Id,
}

impl Tables {
    fn items(&self, kind: Taxonomy) -> &ItemTable {
        match kind {
            Taxonomy::Tag => &self.tags,
            Taxonomy::Ingredient => &self.ingredients,
        }
    }

    fn items_mut(&mut self, kind: Taxonomy) -> &mut ItemTable {
        match kind {
            Taxonomy::Tag => &mut self.tags,
            Taxonomy::Ingredient => &mut self.ingredients,
        }
    }

    fn recipe(&self, owner: Id, id: Id) -> Option<Recipe> {
        let row = self.recipes.get(&id).filter(|row| row.user_id == owner)?;
        Some(Recipe::from_row(
            row.clone(),
            self.tags.items_of(id),
            self.ingredients.items_of(id),
        ))
    }
}

/// In-process storage with the same observable behaviour as the PostgreSQL
/// backend. Used by tests and by `DATABASE_URL=memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, QueryError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(QueryError::AlreadyExists {
                entity: "user with this email",
            });
        }

        tables.last_user_id += 1;
        let row = User {
            id: tables.last_user_id,
            email: user.email,
            name: user.name,
            password: user.password_hash,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, QueryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, QueryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<Option<User>, QueryError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(password) = changes.password_hash {
            user.password = password;
        }
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl TaxonomyStore for MemoryStore {
    async fn list_items(
        &self,
        kind: Taxonomy,
        owner: Id,
        assigned_only: bool,
    ) -> Result<Vec<TaxonomyItem>, QueryError> {
        let tables = self.tables.read().await;
        let table = tables.items(kind);

        let mut rows: Vec<TaxonomyItem> = table
            .rows
            .values()
            .filter(|item| item.user_id == owner)
            .filter(|item| {
                !assigned_only || table.links.iter().any(|(_, item_id)| *item_id == item.id)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));

        Ok(rows)
    }

    async fn get_item(
        &self,
        kind: Taxonomy,
        owner: Id,
        id: Id,
    ) -> Result<Option<TaxonomyItem>, QueryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items(kind)
            .rows
            .get(&id)
            .filter(|item| item.user_id == owner)
            .cloned())
    }

    async fn rename_item(
        &self,
        kind: Taxonomy,
        owner: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<TaxonomyItem>, QueryError> {
        let mut tables = self.tables.write().await;
        let item = tables
            .items_mut(kind)
            .rows
            .get_mut(&id)
            .filter(|item| item.user_id == owner);

        Ok(item.map(|item| {
            item.name = name.to_owned();
            item.clone()
        }))
    }

    async fn delete_item(&self, kind: Taxonomy, owner: Id, id: Id) -> Result<bool, QueryError> {
        let mut tables = self.tables.write().await;
        let table = tables.items_mut(kind);

        let owned = table.rows.get(&id).is_some_and(|item| item.user_id == owner);
        if !owned {
            return Ok(false);
        }

        table.rows.remove(&id);
        table.links.retain(|(_, item_id)| *item_id != id);
        Ok(true)
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn list_recipes(
        &self,
        owner: Id,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, QueryError> {
        let tables = self.tables.read().await;

        Ok(tables
            .recipes
            .values()
            .rev()
            .filter(|row| row.user_id == owner)
            .filter(|row| {
                [Taxonomy::Tag, Taxonomy::Ingredient]
                    .into_iter()
                    .all(|kind| match filter.ids(kind) {
                        Some(ids) => tables.items(kind).has_any(row.id, ids),
                        None => true,
                    })
            })
            .filter_map(|row| tables.recipe(owner, row.id))
            .collect())
    }

    async fn get_recipe(&self, owner: Id, id: Id) -> Result<Option<Recipe>, QueryError> {
        let tables = self.tables.read().await;
        Ok(tables.recipe(owner, id))
    }

    async fn create_recipe(&self, owner: Id, draft: RecipeDraft) -> Result<Recipe, QueryError> {
        let mut tables = self.tables.write().await;

        tables.last_recipe_id += 1;
        let id = tables.last_recipe_id;
        tables.recipes.insert(
            id,
            RecipeRow {
                id,
                user_id: owner,
                title: draft.title.to_owned(),
                description: draft.description.to_owned(),
                time_minutes: draft.time_minutes,
                price: draft.price,
                link: draft.link.to_owned(),
                image: None,
            },
        );

        for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
            tables.items_mut(kind).attach(owner, id, draft.names(kind));
        }

        tables
            .recipe(owner, id)
            .ok_or(QueryError::Vanished { entity: "recipe", id })
    }

    async fn update_recipe(
        &self,
        owner: Id,
        id: Id,
        patch: RecipePatch,
    ) -> Result<Option<Recipe>, QueryError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .recipes
            .get_mut(&id)
            .filter(|row| row.user_id == owner)
        else {
            return Ok(None);
        };

        if let Some(title) = patch.title.as_ref() {
            row.title = title.to_owned();
        }
        if let Some(description) = patch.description.as_ref() {
            row.description = description.to_owned();
        }
        if let Some(time_minutes) = patch.time_minutes {
            row.time_minutes = time_minutes;
        }
        if let Some(price) = patch.price {
            row.price = price;
        }
        if let Some(link) = patch.link.as_ref() {
            row.link = link.to_owned();
        }

        for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
            if let Some(names) = patch.names(kind) {
                let table = tables.items_mut(kind);
                table.detach_recipe(id);
                table.attach(owner, id, names);
            }
        }

        Ok(tables.recipe(owner, id))
    }

    async fn delete_recipe(&self, owner: Id, id: Id) -> Result<bool, QueryError> {
        let mut tables = self.tables.write().await;
        let owned = tables.recipes.get(&id).is_some_and(|row| row.user_id == owner);
        if !owned {
            return Ok(false);
        }

        tables.recipes.remove(&id);
        tables.tags.detach_recipe(id);
        tables.ingredients.detach_recipe(id);
        Ok(true)
    }

    async fn set_recipe_image(
        &self,
        owner: Id,
        id: Id,
        path: &str,
    ) -> Result<Option<Recipe>, QueryError> {
        let mut tables = self.tables.write().await;
        match tables
            .recipes
            .get_mut(&id)
            .filter(|row| row.user_id == owner)
        {
            Some(row) => row.image = Some(path.to_owned()),
            None => return Ok(None),
        }

        Ok(tables.recipe(owner, id))
    }
}
