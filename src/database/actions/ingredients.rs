use std::collections::HashSet;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{NotFoundError, QueryError, ValidationError},
    schema::{Ingredient, IngredientAmount, IngredientForm, RecipePart, Uuid},
    validation::validate_ingredient_form,
};

// Postgres caps a statement at 65535 bind parameters, three per row here.
const MAX_ROWS_PER_INSERT: usize = 65535 / 3;

pub async fn create_ingredient(
    form: &IngredientForm,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    validate_ingredient_form(form)?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(form.name.trim())
    .bind(form.measurement_unit.trim())
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(ingredient)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, potion::Error> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    ingredient.ok_or_else(|| NotFoundError::new("Ingredient not found").into())
}

/// Lists ingredients, optionally those whose name starts with `name` (case-insensitive).
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match name {
        Some(name) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE starts_with(LOWER(name), LOWER($1)) ORDER BY name",
        )
        .bind(name)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, potion::Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Fails naming the first submitted id that has no ingredient behind it.
pub async fn ensure_ingredients_exist(
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    let ids: Vec<Uuid> = ingredients.iter().map(|i| i.id).collect();
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Uuid> = found.into_iter().map(|row| row.0).collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(ValidationError::new(format!(
            "Ingredient with id {missing} doesn't exist"
        ))
        .into()),
        None => Ok(()),
    }
}

/// Clears the ingredient rows of a recipe and bulk-inserts the new set.
pub async fn set_recipe_ingredients(
    recipe_id: Uuid,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    for chunk in ingredients.chunks(MAX_ROWS_PER_INSERT) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );

        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(recipe_id)
                .push_bind(ingredient.id)
                .push_bind(ingredient.amount);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}
