use std::convert::Infallible;

use warp::{http::StatusCode, reply::Response};

use crate::{
    actions,
    constants::USER_COUNT_PER_PAGE,
    form::Form,
    jwt::SessionData,
    pagination::{PageContext, Pagination},
    permissions::ActionType,
    reply::{empty_reply, json_reply},
    routes::AppContext,
    schema::{LoginForm, PasswordForm, RegisterForm, Subscription, UserRow, Uuid},
};

fn recipes_limit(form: &Form) -> Result<Option<i64>, potion::Error> {
    Ok(form.get_number::<i64>("recipes_limit")?.map(|limit| limit.max(0)))
}

pub async fn register(form: RegisterForm, ctx: AppContext) -> Result<Response, Infallible> {
    Ok(json_reply(
        actions::register_user(&form, &ctx.pool).await,
        StatusCode::CREATED,
    ))
}

pub async fn list_users(
    session: Option<SessionData>,
    query: String,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let viewer = session.map(|s| s.user_id);

    let result: Result<PageContext<UserRow>, potion::Error> = async {
        let form = Form::from_query(&query)?;
        let page = Pagination::from_form(&form, USER_COUNT_PER_PAGE)?;
        actions::fetch_users(&page, viewer, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::OK))
}

pub async fn get_user(
    id: Uuid,
    session: Option<SessionData>,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let viewer = session.map(|s| s.user_id);

    Ok(json_reply(
        actions::get_user_row(id, viewer, &ctx.pool).await,
        StatusCode::OK,
    ))
}

pub async fn me(session: SessionData, ctx: AppContext) -> Result<Response, Infallible> {
    Ok(json_reply(
        actions::get_user_row(session.user_id, Some(session.user_id), &ctx.pool).await,
        StatusCode::OK,
    ))
}

pub async fn set_password(
    session: SessionData,
    form: PasswordForm,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    Ok(empty_reply(
        actions::set_password(session.user_id, &form, &ctx.pool).await,
    ))
}

pub async fn login(form: LoginForm, ctx: AppContext) -> Result<Response, Infallible> {
    Ok(json_reply(
        actions::login_user(&form, &ctx.config, &ctx.pool).await,
        StatusCode::OK,
    ))
}

/// Tokens are stateless, so logging out only confirms the session was valid.
pub async fn logout(session: SessionData) -> Result<Response, Infallible> {
    log::trace!("> User {} logged out", session.username);
    Ok(empty_reply(Ok(())))
}

pub async fn subscriptions(
    session: SessionData,
    query: String,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<PageContext<Subscription>, potion::Error> = async {
        session.authenticate(ActionType::ManageOwnSubscriptions)?;

        let form = Form::from_query(&query)?;
        let page = Pagination::from_form(&form, USER_COUNT_PER_PAGE)?;
        let limit = recipes_limit(&form)?;

        actions::fetch_subscriptions(session.user_id, &page, limit, &ctx.config, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::OK))
}

pub async fn subscribe(
    id: Uuid,
    session: SessionData,
    query: String,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<Subscription, potion::Error> = async {
        session.authenticate(ActionType::ManageOwnSubscriptions)?;

        let form = Form::from_query(&query)?;
        let limit = recipes_limit(&form)?;

        actions::subscribe(session.user_id, id, limit, &ctx.config, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::CREATED))
}

pub async fn unsubscribe(
    id: Uuid,
    session: SessionData,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<(), potion::Error> = async {
        session.authenticate(ActionType::ManageOwnSubscriptions)?;
        actions::unsubscribe(session.user_id, id, &ctx.pool).await
    }
    .await;

    Ok(empty_reply(result))
}
