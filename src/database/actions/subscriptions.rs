use sqlx::{Pool, Postgres};

use crate::{
    error::{NotFoundError, QueryError, ValidationError},
    pagination::{PageContext, Pagination},
    schema::{Subscription, UserRow, Uuid},
    Config,
};

use super::{count_author_recipes, get_user_row, list_author_recipes, users::USER_ROW_COLUMNS};

async fn subscription_for(
    user: UserRow,
    recipes_limit: Option<i64>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    let recipes = list_author_recipes(user.id, recipes_limit, config, pool).await?;
    let recipes_count = count_author_recipes(user.id, pool).await?;

    Ok(Subscription {
        user,
        recipes,
        recipes_count,
    })
}

pub async fn subscribe(
    user_id: Uuid,
    following_id: Uuid,
    recipes_limit: Option<i64>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    let mut following = get_user_row(following_id, Some(user_id), pool).await?;

    if user_id == following_id {
        return Err(ValidationError::new("You can't subscribe to yourself").into());
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(following_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ValidationError::new("You are already subscribed to this user").into());
    }

    following.is_subscribed = true;
    subscription_for(following, recipes_limit, config, pool).await
}

pub async fn unsubscribe(
    user_id: Uuid,
    following_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    get_user_row(following_id, Some(user_id), pool).await?;

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND following_id = $2")
        .bind(user_id)
        .bind(following_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(NotFoundError::new("You are not subscribed to this user").into());
    }

    Ok(())
}

pub async fn fetch_subscriptions(
    user_id: Uuid,
    page: &Pagination,
    recipes_limit: Option<i64>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "
        SELECT {USER_ROW_COLUMNS}
        FROM follows fl
        INNER JOIN users u ON u.id = fl.following_id
        WHERE fl.user_id = $1
        ORDER BY fl.id
        LIMIT $2 OFFSET $3
    "
    ))
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut subscriptions = Vec::with_capacity(rows.len());
    for user in rows {
        subscriptions.push(subscription_for(user, recipes_limit, config, pool).await?);
    }

    Ok(PageContext::from_rows(subscriptions, count.0, page))
}
