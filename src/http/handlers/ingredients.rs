use std::convert::Infallible;

use warp::{http::StatusCode, reply::Response};

use crate::{
    actions,
    form::Form,
    jwt::SessionData,
    permissions::ActionType,
    reply::json_reply,
    routes::AppContext,
    schema::{Ingredient, IngredientForm, Uuid},
};

pub async fn list_ingredients(query: String, ctx: AppContext) -> Result<Response, Infallible> {
    let result: Result<Vec<Ingredient>, potion::Error> = async {
        let form = Form::from_query(&query)?;
        actions::list_ingredients(form.get_str("name"), &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::OK))
}

pub async fn get_ingredient(id: Uuid, ctx: AppContext) -> Result<Response, Infallible> {
    Ok(json_reply(
        actions::get_ingredient(id, &ctx.pool).await,
        StatusCode::OK,
    ))
}

pub async fn create_ingredient(
    session: SessionData,
    form: IngredientForm,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<Ingredient, potion::Error> = async {
        session.authenticate(ActionType::ManageIngredients)?;
        actions::create_ingredient(&form, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::CREATED))
}
