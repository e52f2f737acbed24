use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use sqlx::{Pool, Postgres};
use warp::{
    filters::BoxedFilter,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    constants::MAX_BODY_SIZE,
    handlers::{ingredients, recipes, tags, users},
    middleware::{with_possible_session, with_session},
    reply::handle_rejection,
    schema::{
        IngredientForm, LoginForm, PasswordForm, RecipeForm, RecipePatch, RegisterForm, TagForm,
    },
    Config,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

fn with_context(ctx: AppContext) -> impl Filter<Extract = (AppContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn with_json<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

/// Raw query string, empty when the request has none.
fn with_query() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
}

fn tag_routes(ctx: &AppContext) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(tags::list_tags);

    let create = warp::path!("api" / "tags")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and(with_json::<TagForm>())
        .and(with_context(ctx.clone()))
        .and_then(tags::create_tag);

    let get = warp::path!("api" / "tags" / i32)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(tags::get_tag);

    list.or(create).unify().or(get).unify().boxed()
}

fn ingredient_routes(ctx: &AppContext) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(with_query())
        .and(with_context(ctx.clone()))
        .and_then(ingredients::list_ingredients);

    let create = warp::path!("api" / "ingredients")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and(with_json::<IngredientForm>())
        .and(with_context(ctx.clone()))
        .and_then(ingredients::create_ingredient);

    let get = warp::path!("api" / "ingredients" / i32)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(ingredients::get_ingredient);

    list.or(create).unify().or(get).unify().boxed()
}

fn recipe_routes(ctx: &AppContext) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_possible_session(ctx.config.clone()))
        .and(with_query())
        .and(with_context(ctx.clone()))
        .and_then(recipes::list_recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and(with_json::<RecipeForm>())
        .and(with_context(ctx.clone()))
        .and_then(recipes::create_recipe);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(recipes::download_shopping_cart);

    let get = warp::path!("api" / "recipes" / i32)
        .and(warp::get())
        .and(with_possible_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(recipes::get_recipe);

    let update = warp::path!("api" / "recipes" / i32)
        .and(warp::patch())
        .and(with_session(ctx.config.clone()))
        .and(with_json::<RecipePatch>())
        .and(with_context(ctx.clone()))
        .and_then(recipes::update_recipe);

    let delete = warp::path!("api" / "recipes" / i32)
        .and(warp::delete())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(recipes::delete_recipe);

    let favorite = warp::path!("api" / "recipes" / i32 / "favorite")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(recipes::add_to_favorites);

    let unfavorite = warp::path!("api" / "recipes" / i32 / "favorite")
        .and(warp::delete())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(recipes::remove_from_favorites);

    let add_to_cart = warp::path!("api" / "recipes" / i32 / "shopping_cart")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(recipes::add_to_shopping_cart);

    let remove_from_cart = warp::path!("api" / "recipes" / i32 / "shopping_cart")
        .and(warp::delete())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(recipes::remove_from_shopping_cart);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(unfavorite)
        .unify()
        .or(add_to_cart)
        .unify()
        .or(remove_from_cart)
        .unify()
        .boxed()
}

fn user_routes(ctx: &AppContext) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_possible_session(ctx.config.clone()))
        .and(with_query())
        .and(with_context(ctx.clone()))
        .and_then(users::list_users);

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(with_json::<RegisterForm>())
        .and(with_context(ctx.clone()))
        .and_then(users::register);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(users::me);

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and(with_json::<PasswordForm>())
        .and(with_context(ctx.clone()))
        .and_then(users::set_password);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(ctx.config.clone()))
        .and(with_query())
        .and(with_context(ctx.clone()))
        .and_then(users::subscriptions);

    let get = warp::path!("api" / "users" / i32)
        .and(warp::get())
        .and(with_possible_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(users::get_user);

    let subscribe = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and(with_query())
        .and(with_context(ctx.clone()))
        .and_then(users::subscribe);

    let unsubscribe = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.config.clone()))
        .and(with_context(ctx.clone()))
        .and_then(users::unsubscribe);

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(get)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn auth_routes(ctx: &AppContext) -> BoxedFilter<(Response,)> {
    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(with_json::<LoginForm>())
        .and(with_context(ctx.clone()))
        .and_then(users::login);

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and_then(users::logout);

    login.or(logout).unify().boxed()
}

fn media_routes(ctx: &AppContext) -> BoxedFilter<(Response,)> {
    warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(ctx.config.media_root.clone()))
        .map(|file: warp::fs::File| file.into_response())
        .boxed()
}

pub fn routes(ctx: AppContext) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    tag_routes(&ctx)
        .or(ingredient_routes(&ctx))
        .unify()
        .or(recipe_routes(&ctx))
        .unify()
        .or(user_routes(&ctx))
        .unify()
        .or(auth_routes(&ctx))
        .unify()
        .or(media_routes(&ctx))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram::api"))
}
