use std::collections::HashSet;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{NotFoundError, QueryError, ValidationError},
    schema::{LinkedRecipeTag, Tag, TagForm, Uuid},
    validation::validate_tag_form,
};

pub async fn create_tag(form: &TagForm, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    validate_tag_form(form)?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(form.name.trim())
    .bind(&form.color)
    .bind(&form.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    tag.ok_or_else(|| {
        ValidationError::new("Tag with this name, color or slug already exists").into()
    })
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    tag.ok_or_else(|| NotFoundError::new("Tag not found").into())
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, potion::Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Fails naming the first submitted id that has no tag behind it.
pub async fn ensure_tags_exist(tags: &[Uuid], conn: &mut PgConnection) -> Result<(), potion::Error> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Uuid> = found.into_iter().map(|row| row.0).collect();

    match tags.iter().find(|id| !found.contains(id)) {
        Some(missing) => {
            Err(ValidationError::new(format!("Tag with id {missing} doesn't exist")).into())
        }
        None => Ok(()),
    }
}

/// Replaces the whole tag set of a recipe.
pub async fn set_recipe_tags(
    recipe_id: Uuid,
    tags: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    sqlx::query(
        "INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::int4[])",
    )
    .bind(recipe_id)
    .bind(tags)
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}
