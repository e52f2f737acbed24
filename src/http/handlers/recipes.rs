use std::convert::Infallible;

use warp::{http::StatusCode, reply::Response};

use crate::{
    actions,
    constants::RECIPE_COUNT_PER_PAGE,
    form::Form,
    jwt::SessionData,
    media::{remove_image, save_image},
    pagination::{PageContext, Pagination},
    permissions::ActionType,
    reply::{attachment_reply, empty_reply, error_reply, json_reply},
    routes::AppContext,
    schema::{RecipeFilter, RecipeForm, RecipePatch, RecipeShort, RecipeView, Uuid},
    validation::{validate_recipe_form, validate_recipe_patch},
};

pub async fn list_recipes(
    session: Option<SessionData>,
    query: String,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let viewer = session.map(|s| s.user_id);

    let result: Result<PageContext<RecipeView>, potion::Error> = async {
        let form = Form::from_query(&query)?;
        let page = Pagination::from_form(&form, RECIPE_COUNT_PER_PAGE)?;
        let filter = RecipeFilter {
            author: form.get_number("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_flag("is_favorited"),
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart"),
        };

        actions::fetch_recipes(&filter, &page, viewer, &ctx.config, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::OK))
}

pub async fn get_recipe(
    id: Uuid,
    session: Option<SessionData>,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let viewer = session.map(|s| s.user_id);

    Ok(json_reply(
        actions::get_recipe_view(id, viewer, &ctx.config, &ctx.pool).await,
        StatusCode::OK,
    ))
}

pub async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let media_root = &ctx.config.media_root;

    let result: Result<RecipeView, potion::Error> = async {
        session.authenticate(ActionType::ManageOwnRecipes)?;
        validate_recipe_form(&form)?;

        let image = save_image(&form.image, media_root).await?;
        let id = match actions::create_recipe(&form, &image, session.user_id, &ctx.pool).await {
            Ok(id) => id,
            Err(err) => {
                remove_image(&image, media_root).await;
                return Err(err);
            }
        };

        actions::get_recipe_view(id, Some(session.user_id), &ctx.config, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Uuid,
    session: SessionData,
    patch: RecipePatch,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let media_root = &ctx.config.media_root;

    let result: Result<RecipeView, potion::Error> = async {
        let recipe = actions::get_recipe_mut(id, &session, &ctx.pool).await?;
        validate_recipe_patch(&patch)?;

        let image = match &patch.image {
            Some(data) => Some(save_image(data, media_root).await?),
            None => None,
        };

        if let Err(err) = actions::update_recipe(id, &patch, image.as_deref(), &ctx.pool).await {
            if let Some(image) = &image {
                remove_image(image, media_root).await;
            }
            return Err(err);
        }
        if image.is_some() {
            remove_image(&recipe.image, media_root).await;
        }

        actions::get_recipe_view(id, Some(session.user_id), &ctx.config, &ctx.pool).await
    }
    .await;

    Ok(json_reply(result, StatusCode::OK))
}

pub async fn delete_recipe(
    id: Uuid,
    session: SessionData,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<(), potion::Error> = async {
        let recipe = actions::get_recipe_mut(id, &session, &ctx.pool).await?;
        actions::delete_recipe(recipe.id, &ctx.pool).await?;
        remove_image(&recipe.image, &ctx.config.media_root).await;
        Ok(())
    }
    .await;

    Ok(empty_reply(result))
}

pub async fn add_to_favorites(
    id: Uuid,
    session: SessionData,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<RecipeShort, potion::Error> = async {
        session.authenticate(ActionType::ManageOwnFavorites)?;
        let recipe = actions::add_to_favorites(id, session.user_id, &ctx.pool).await?;
        Ok(recipe.with_media(&ctx.config))
    }
    .await;

    Ok(json_reply(result, StatusCode::CREATED))
}

pub async fn remove_from_favorites(
    id: Uuid,
    session: SessionData,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<(), potion::Error> = async {
        session.authenticate(ActionType::ManageOwnFavorites)?;
        actions::remove_from_favorites(id, session.user_id, &ctx.pool).await
    }
    .await;

    Ok(empty_reply(result))
}

pub async fn add_to_shopping_cart(
    id: Uuid,
    session: SessionData,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<RecipeShort, potion::Error> = async {
        session.authenticate(ActionType::ManageOwnShoppingCart)?;
        let recipe = actions::add_to_shopping_cart(id, session.user_id, &ctx.pool).await?;
        Ok(recipe.with_media(&ctx.config))
    }
    .await;

    Ok(json_reply(result, StatusCode::CREATED))
}

pub async fn remove_from_shopping_cart(
    id: Uuid,
    session: SessionData,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<(), potion::Error> = async {
        session.authenticate(ActionType::ManageOwnShoppingCart)?;
        actions::remove_from_shopping_cart(id, session.user_id, &ctx.pool).await
    }
    .await;

    Ok(empty_reply(result))
}

pub async fn download_shopping_cart(
    session: SessionData,
    ctx: AppContext,
) -> Result<Response, Infallible> {
    let result: Result<String, potion::Error> = async {
        session.authenticate(ActionType::ManageOwnShoppingCart)?;
        let items = actions::fetch_shopping_list(session.user_id, &ctx.pool).await?;
        Ok(actions::render_shopping_list(&items))
    }
    .await;

    Ok(match result {
        Ok(document) => attachment_reply(document),
        Err(err) => error_reply(err),
    })
}
