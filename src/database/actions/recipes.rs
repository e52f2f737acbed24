use std::collections::HashMap;

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    error::{NotFoundError, QueryError},
    jwt::SessionData,
    pagination::{PageContext, Pagination},
    schema::{
        Recipe, RecipeFilter, RecipeForm, RecipePart, RecipePatch, RecipeRow, RecipeShort,
        RecipeView, Tag, UserRow, Uuid,
    },
    validation::{validate_recipe_form, validate_recipe_patch},
    Config,
};

use super::{
    ensure_ingredients_exist, ensure_tags_exist, list_recipe_parts, list_recipe_tags,
    list_user_rows, set_recipe_ingredients, set_recipe_tags,
};

fn push_recipe_row_select(builder: &mut QueryBuilder<'_, Postgres>, viewer: Option<Uuid>) {
    builder.push(
        "SELECT r.id, r.author_id, r.name, r.text, r.cooking_time, r.image,
        EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    builder.push_bind(viewer);
    builder.push(
        ") AS is_favorited,
        EXISTS (SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = ",
    );
    builder.push_bind(viewer);
    builder.push(") AS is_in_shopping_cart FROM recipes r");
}

/// Favorite and cart filters only narrow the list for a signed-in viewer.
fn push_recipe_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
) {
    builder.push(" WHERE TRUE");

    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id
                WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }
}

/// Attaches tags, ingredients and authors to bare recipe rows, keeping row order.
async fn hydrate_recipes(
    rows: Vec<RecipeRow>,
    viewer: Option<Uuid>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, potion::Error> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|row| row.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for tag in list_recipe_tags(&recipe_ids, pool).await? {
        tags.entry(tag.recipe_id).or_default().push(tag.into());
    }

    let mut parts: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    for part in list_recipe_parts(&recipe_ids, pool).await? {
        parts.entry(part.recipe_id).or_default().push(part);
    }

    let authors: HashMap<Uuid, UserRow> = list_user_rows(&author_ids, viewer, pool)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let author = authors.get(&row.author_id)?.clone();
            Some(RecipeView {
                id: row.id,
                tags: tags.remove(&row.id).unwrap_or_default(),
                author,
                ingredients: parts.remove(&row.id).unwrap_or_default(),
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
                name: row.name,
                image: config.media_link(&row.image),
                text: row.text,
                cooking_time: row.cooking_time,
            })
        })
        .collect())
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: &Pagination,
    viewer: Option<Uuid>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, potion::Error> {
    let mut count_query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_recipe_filters(&mut count_query, filter, viewer);
    let count: (i64,) = count_query
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_row_select(&mut query, viewer);
    push_recipe_filters(&mut query, filter, viewer);
    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let recipes = hydrate_recipes(rows, viewer, config, pool).await?;
    Ok(PageContext::from_rows(recipes, count.0, page))
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Recipe, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| NotFoundError::new("Recipe not found").into())
}

pub async fn get_recipe_short(id: Uuid, pool: &Pool<Postgres>) -> Result<RecipeShort, potion::Error> {
    let row: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    row.ok_or_else(|| NotFoundError::new("Recipe not found").into())
}

pub async fn get_recipe_view(
    id: Uuid,
    viewer: Option<Uuid>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_row_select(&mut query, viewer);
    query.push(" WHERE r.id = ").push_bind(id);

    let row: Option<RecipeRow> = query
        .build_query_as()
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;
    let row = row.ok_or_else(|| -> potion::Error { NotFoundError::new("Recipe not found").into() })?;

    hydrate_recipes(vec![row], viewer, config, pool)
        .await?
        .pop()
        .ok_or_else(|| NotFoundError::new("Recipe not found").into())
}

/// Loads a recipe the session is allowed to modify.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate_owner(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    Ok(recipe)
}

/// Creates a recipe with its tag set and ingredient rows in one transaction.
pub async fn create_recipe(
    form: &RecipeForm,
    image: &str,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Uuid, potion::Error> {
    validate_recipe_form(form)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_tags_exist(&form.tags, &mut tr).await?;
    ensure_ingredients_exist(&form.ingredients, &mut tr).await?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(form.name.trim())
    .bind(&form.text)
    .bind(form.cooking_time)
    .bind(image)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    set_recipe_tags(id.0, &form.tags, &mut tr).await?;
    set_recipe_ingredients(id.0, &form.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("> Created recipe {} by user {}", id.0, author_id);
    Ok(id.0)
}

/// Overwrites the tag and ingredient sets; scalar fields keep their value when absent.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn update_recipe(
    id: Uuid,
    patch: &RecipePatch,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    validate_recipe_patch(patch)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_tags_exist(&patch.tags, &mut tr).await?;
    ensure_ingredients_exist(&patch.ingredients, &mut tr).await?;

    let result = sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(patch.name.as_deref().map(str::trim))
    .bind(patch.text.as_deref())
    .bind(patch.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::new("Recipe not found").into());
    }

    set_recipe_tags(id, &patch.tags, &mut tr).await?;
    set_recipe_ingredients(id, &patch.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

/// Deletes a recipe; tags, ingredient rows, favorites and cart entries cascade.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::new("Recipe not found").into());
    }

    Ok(())
}

/// Newest recipes of one author, for subscription listings.
pub async fn list_author_recipes(
    author_id: Uuid,
    limit: Option<i64>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeShort>, potion::Error> {
    let rows: Vec<RecipeShort> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time FROM recipes
        WHERE author_id = $1
        ORDER BY id DESC
        LIMIT $2
    ",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|r| r.with_media(config)).collect())
}

pub async fn count_author_recipes(author_id: Uuid, pool: &Pool<Postgres>) -> Result<i64, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}
