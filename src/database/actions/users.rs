use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::{NotFoundError, QueryError, ValidationError},
    pagination::{PageContext, Pagination},
    schema::{AuthToken, LoginForm, PasswordForm, RegisterForm, User, UserRow, Uuid},
    validation::{validate_password, validate_register_form},
    Config,
};

/// Columns of a `UserRow`; `$1` is the id of the viewing user (or NULL).
pub(crate) const USER_ROW_COLUMNS: &str = "
    u.email, u.id, u.username, u.first_name, u.last_name,
    EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.following_id = u.id) AS is_subscribed
";

pub async fn get_user_by_email(
    email: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(user_id: Uuid, pool: &Pool<Postgres>) -> Result<User, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| NotFoundError::new("User not found").into())
}

pub async fn get_user_row(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserRow, potion::Error> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| NotFoundError::new("User not found").into())
}

pub async fn list_user_rows(
    user_ids: &[Uuid],
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserRow>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id = ANY($2)"
    ))
    .bind(viewer)
    .bind(user_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_users(
    page: &Pagination,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(PageContext::from_rows(rows, count.0, page))
}

pub async fn register_user(form: &RegisterForm, pool: &Pool<Postgres>) -> Result<UserRow, potion::Error> {
    validate_register_form(form)?;

    let password = hash_password(&form.password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(form.email.trim())
    .bind(form.username.trim())
    .bind(form.first_name.trim())
    .bind(form.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match user {
        Some(user) => {
            log::info!("> Registered user {}", user.username);
            Ok(UserRow {
                email: user.email,
                id: user.id,
                username: user.username,
                first_name: user.first_name,
                last_name: user.last_name,
                is_subscribed: false,
            })
        }
        None => Err(ValidationError::new("A user with that email or username already exists").into()),
    }
}

pub async fn login_user(
    form: &LoginForm,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<AuthToken, potion::Error> {
    let user = match get_user_by_email(&form.email, pool).await? {
        Some(user) => user,
        None => return Err(HtmlError::InvalidRequest.new("Invalid credentials")),
    };

    let authenticated = verify_password(&form.password, &user.password)
        .map_err(|_| HtmlError::InternalServerError.new("Stored password hash is corrupt"))?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    }

    Ok(AuthToken {
        auth_token: generate_jwt_session(&user, config)?,
    })
}

pub async fn set_password(
    user_id: Uuid,
    form: &PasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let user = get_user_by_id(user_id, pool).await?;

    let authenticated = verify_password(&form.current_password, &user.password)
        .map_err(|_| HtmlError::InternalServerError.new("Stored password hash is corrupt"))?;
    if !authenticated {
        return Err(ValidationError::new("Current password is incorrect").into());
    }
    validate_password(&form.new_password)?;

    let password = hash_password(&form.new_password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
