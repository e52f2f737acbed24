use std::convert::Infallible;

use warp::{http::StatusCode, reply::Response};

use crate::{
    actions,
    jwt::SessionData,
    permissions::ActionType,
    reply::json_reply,
    routes::AppContext,
    schema::{Tag, TagForm, Uuid},
};

pub async fn list_tags(ctx: AppContext) -> Result<Response, Infallible> {
    Ok(json_reply(actions::list_tags(&ctx.pool).await, StatusCode::OK))
}

pub async fn get_tag(id: Uuid, ctx: AppContext) -> Result<Response, Infallible> {
    Ok(json_reply(actions::get_tag(id, &ctx.pool).await, StatusCode::OK))
}

pub async fn create_tag(
    session: SessionData,
    form: TagForm,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<Tag, potion::Error> = async {
        session.authenticate(ActionType::ManageTags)?;
        actions::create_tag(&form, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::CREATED))
}
