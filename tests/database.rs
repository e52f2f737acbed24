//! Runs against a throwaway database created by `sqlx::test`.
//! Needs `DATABASE_URL` pointing at a Postgres server: `cargo test -- --ignored`.

use foodgram::{
    actions,
    jwt::{verify_jwt_session, SessionData},
    pagination::Pagination,
    schema::{
        IngredientAmount, IngredientForm, LoginForm, PasswordForm, RecipeFilter, RecipeForm,
        RecipePatch, RegisterForm, TagForm, UserRole, Uuid,
    },
    Config,
};
use sqlx::PgPool;

fn config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_owned()),
        "JWT_SECRET" => Some("integration-secret".to_owned()),
        _ => None,
    })
    .unwrap_or_else(|_| panic!("test config should load"))
}

fn code<T>(result: Result<T, potion::Error>) -> u16 {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(err) => err.code as u16,
    }
}

async fn user(pool: &PgPool, name: &str) -> Uuid {
    let form = RegisterForm {
        email: format!("{name}@example.com"),
        username: name.to_owned(),
        first_name: "Test".to_owned(),
        last_name: "Cook".to_owned(),
        password: "correct-horse".to_owned(),
    };
    let Ok(user) = actions::register_user(&form, pool).await else {
        panic!("user should register");
    };
    user.id
}

async fn session(pool: &PgPool, user_id: Uuid, role: UserRole) -> SessionData {
    if role == UserRole::Admin {
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();
    }

    SessionData {
        user_id,
        username: format!("user{user_id}"),
        is_admin: role == UserRole::Admin,
        role,
    }
}

async fn tag(pool: &PgPool, slug: &str, color: &str) -> Uuid {
    let form = TagForm {
        name: slug.to_uppercase(),
        color: color.to_owned(),
        slug: slug.to_owned(),
    };
    let Ok(tag) = actions::create_tag(&form, pool).await else {
        panic!("tag should be created");
    };
    tag.id
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Uuid {
    let form = IngredientForm {
        name: name.to_owned(),
        measurement_unit: unit.to_owned(),
    };
    let Ok(ingredient) = actions::create_ingredient(&form, pool).await else {
        panic!("ingredient should be created");
    };
    ingredient.id
}

async fn recipe(
    pool: &PgPool,
    author: Uuid,
    name: &str,
    tags: Vec<Uuid>,
    ingredients: Vec<IngredientAmount>,
) -> Uuid {
    let form = RecipeForm {
        ingredients,
        tags,
        image: "data:image/png;base64,iVBORw0KGgo=".to_owned(),
        name: name.to_owned(),
        text: "Mix everything.".to_owned(),
        cooking_time: 10,
    };
    let Ok(id) = actions::create_recipe(&form, "recipes/images/test.png", author, pool).await
    else {
        panic!("recipe should be created");
    };
    id
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn shopping_list_sums_amounts(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let flour = ingredient(&pool, "Flour", "g").await;
    let eggs = ingredient(&pool, "Eggs", "pcs").await;

    let pancakes = recipe(
        &pool,
        cook,
        "Pancakes",
        vec![breakfast],
        vec![
            IngredientAmount { id: flour, amount: 200 },
            IngredientAmount { id: eggs, amount: 3 },
        ],
    )
    .await;
    let bread = recipe(
        &pool,
        cook,
        "Bread",
        vec![breakfast],
        vec![IngredientAmount { id: flour, amount: 200 }],
    )
    .await;

    for id in [pancakes, bread] {
        assert!(actions::add_to_shopping_cart(id, cook, &pool).await.is_ok());
    }

    let Ok(items) = actions::fetch_shopping_list(cook, &pool).await else {
        panic!("shopping list should load");
    };
    assert_eq!(
        actions::render_shopping_list(&items),
        "Shopping list:\nEggs (pcs) - 3\nFlour (g) - 400\n"
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn cart_and_favorites_reject_duplicates(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let lunch = tag(&pool, "lunch", "#49B64E").await;
    let rice = ingredient(&pool, "Rice", "g").await;
    let id = recipe(
        &pool,
        cook,
        "Rice bowl",
        vec![lunch],
        vec![IngredientAmount { id: rice, amount: 150 }],
    )
    .await;

    assert_eq!(code(actions::remove_from_favorites(id, cook, &pool).await), 404);
    assert_eq!(code(actions::remove_from_shopping_cart(id, cook, &pool).await), 404);

    assert!(actions::add_to_favorites(id, cook, &pool).await.is_ok());
    assert_eq!(code(actions::add_to_favorites(id, cook, &pool).await), 400);
    assert!(matches!(actions::is_favorite(id, cook, &pool).await, Ok(true)));

    assert!(actions::add_to_shopping_cart(id, cook, &pool).await.is_ok());
    assert_eq!(code(actions::add_to_shopping_cart(id, cook, &pool).await), 400);
    assert!(matches!(
        actions::is_in_shopping_cart(id, cook, &pool).await,
        Ok(true)
    ));

    assert!(actions::remove_from_favorites(id, cook, &pool).await.is_ok());
    assert!(matches!(actions::is_favorite(id, cook, &pool).await, Ok(false)));

    assert_eq!(code(actions::add_to_favorites(id + 1000, cook, &pool).await), 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn update_replaces_ingredient_set(pool: PgPool) {
    let config = config();
    let cook = user(&pool, "cook").await;
    let dinner = tag(&pool, "dinner", "#8775D2").await;
    let supper = tag(&pool, "supper", "#1F6FEB").await;
    let potato = ingredient(&pool, "Potato", "g").await;
    let butter = ingredient(&pool, "Butter", "g").await;

    let id = recipe(
        &pool,
        cook,
        "Mash",
        vec![dinner],
        vec![IngredientAmount { id: potato, amount: 500 }],
    )
    .await;

    let patch = RecipePatch {
        ingredients: vec![IngredientAmount { id: butter, amount: 50 }],
        tags: vec![supper],
        image: None,
        name: None,
        text: None,
        cooking_time: Some(25),
    };
    assert!(actions::update_recipe(id, &patch, None, &pool).await.is_ok());

    let Ok(view) = actions::get_recipe_view(id, Some(cook), &config, &pool).await else {
        panic!("recipe should load");
    };
    assert_eq!(view.name, "Mash");
    assert_eq!(view.cooking_time, 25);
    assert_eq!(view.image, "/media/recipes/images/test.png");
    assert_eq!(view.tags.len(), 1);
    assert_eq!(view.tags[0].slug, "supper");
    assert_eq!(view.ingredients.len(), 1);
    assert_eq!(view.ingredients[0].name, "Butter");
    assert_eq!(view.ingredients[0].amount, 50);

    let unknown = RecipePatch {
        ingredients: vec![IngredientAmount { id: potato + 1000, amount: 1 }],
        tags: vec![dinner],
        image: None,
        name: Some("Broken".to_owned()),
        text: None,
        cooking_time: None,
    };
    assert_eq!(code(actions::update_recipe(id, &unknown, None, &pool).await), 400);

    let Ok(view) = actions::get_recipe_view(id, Some(cook), &config, &pool).await else {
        panic!("recipe should load");
    };
    assert_eq!(view.name, "Mash");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn recipe_list_filters(pool: PgPool) {
    let config = config();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let dinner = tag(&pool, "dinner", "#8775D2").await;
    let salt = ingredient(&pool, "Salt", "g").await;
    let part = vec![IngredientAmount { id: salt, amount: 1 }];

    let porridge = recipe(&pool, alice, "Porridge", vec![breakfast], part.clone()).await;
    let stew = recipe(&pool, bob, "Stew", vec![dinner], part.clone()).await;
    recipe(&pool, bob, "Omelette", vec![breakfast, dinner], part).await;

    let page = Pagination { page: 1, limit: 10 };

    let by_tag = RecipeFilter {
        tags: vec!["dinner".to_owned()],
        ..Default::default()
    };
    let Ok(listed) = actions::fetch_recipes(&by_tag, &page, None, &config, &pool).await else {
        panic!("recipes should list");
    };
    assert_eq!(listed.count, 2);
    assert_eq!(listed.results[0].name, "Omelette");
    assert_eq!(listed.results[1].id, stew);

    let by_author = RecipeFilter {
        author: Some(alice),
        ..Default::default()
    };
    let Ok(listed) = actions::fetch_recipes(&by_author, &page, None, &config, &pool).await else {
        panic!("recipes should list");
    };
    assert_eq!(listed.count, 1);
    assert_eq!(listed.results[0].id, porridge);

    assert!(actions::add_to_favorites(stew, alice, &pool).await.is_ok());
    let favorites = RecipeFilter {
        is_favorited: true,
        ..Default::default()
    };
    let Ok(listed) = actions::fetch_recipes(&favorites, &page, Some(alice), &config, &pool).await
    else {
        panic!("recipes should list");
    };
    assert_eq!(listed.count, 1);
    assert!(listed.results[0].is_favorited);

    let Ok(listed) = actions::fetch_recipes(&favorites, &page, None, &config, &pool).await else {
        panic!("recipes should list");
    };
    assert_eq!(listed.count, 3);

    let small = Pagination { page: 2, limit: 2 };
    let Ok(listed) =
        actions::fetch_recipes(&RecipeFilter::default(), &small, None, &config, &pool).await
    else {
        panic!("recipes should list");
    };
    assert_eq!(listed.count, 3);
    assert_eq!(listed.results.len(), 1);
    assert_eq!(listed.previous, Some(1));
    assert_eq!(listed.next, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn subscriptions(pool: PgPool) {
    let config = config();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let brunch = tag(&pool, "brunch", "#F0A500").await;
    let oats = ingredient(&pool, "Oats", "g").await;
    for name in ["Granola", "Muesli", "Flapjack"] {
        recipe(
            &pool,
            bob,
            name,
            vec![brunch],
            vec![IngredientAmount { id: oats, amount: 80 }],
        )
        .await;
    }

    assert_eq!(code(actions::subscribe(alice, alice, None, &config, &pool).await), 400);
    assert_eq!(code(actions::subscribe(alice, bob + 1000, None, &config, &pool).await), 404);

    let Ok(subscription) = actions::subscribe(alice, bob, Some(2), &config, &pool).await else {
        panic!("subscription should be created");
    };
    assert!(subscription.user.is_subscribed);
    assert_eq!(subscription.recipes_count, 3);
    assert_eq!(subscription.recipes.len(), 2);

    assert_eq!(code(actions::subscribe(alice, bob, None, &config, &pool).await), 400);

    let page = Pagination { page: 1, limit: 6 };
    let Ok(listed) = actions::fetch_subscriptions(alice, &page, None, &config, &pool).await else {
        panic!("subscriptions should list");
    };
    assert_eq!(listed.count, 1);
    assert_eq!(listed.results[0].user.id, bob);
    assert_eq!(listed.results[0].recipes.len(), 3);

    assert!(actions::unsubscribe(alice, bob, &pool).await.is_ok());
    assert_eq!(code(actions::unsubscribe(alice, bob, &pool).await), 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn accounts(pool: PgPool) {
    let config = config();
    let cook = user(&pool, "cook").await;

    let duplicate = RegisterForm {
        email: "COOK@example.com".to_owned(),
        username: "another".to_owned(),
        first_name: "Test".to_owned(),
        last_name: "Cook".to_owned(),
        password: "correct-horse".to_owned(),
    };
    assert_eq!(code(actions::register_user(&duplicate, &pool).await), 400);

    let wrong = LoginForm {
        email: "cook@example.com".to_owned(),
        password: "wrong-horse".to_owned(),
    };
    assert_eq!(code(actions::login_user(&wrong, &config, &pool).await), 400);

    let login = LoginForm {
        email: "cook@example.com".to_owned(),
        password: "correct-horse".to_owned(),
    };
    let Ok(token) = actions::login_user(&login, &config, &pool).await else {
        panic!("login should succeed");
    };
    let Ok(session) = verify_jwt_session(&token.auth_token, &config) else {
        panic!("issued token should verify");
    };
    assert_eq!(session.user_id, cook);

    let change = PasswordForm {
        new_password: "battery-staple".to_owned(),
        current_password: "correct-horse".to_owned(),
    };
    assert!(actions::set_password(cook, &change, &pool).await.is_ok());
    assert_eq!(code(actions::login_user(&login, &config, &pool).await), 400);
    assert_eq!(code(actions::set_password(cook, &change, &pool).await), 400);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn short_tag_color_is_stored_verbatim(pool: PgPool) {
    let id = tag(&pool, "snack", "#fff").await;

    let Ok(stored) = actions::get_tag(id, &pool).await else {
        panic!("tag should load");
    };
    assert_eq!(stored.color, "#fff");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn only_author_or_admin_may_modify(pool: PgPool) {
    let author = user(&pool, "author").await;
    let stranger = user(&pool, "stranger").await;
    let moderator = user(&pool, "moderator").await;
    let soup = tag(&pool, "soup", "#336699").await;
    let leek = ingredient(&pool, "Leek", "g").await;
    let id = recipe(
        &pool,
        author,
        "Leek soup",
        vec![soup],
        vec![IngredientAmount { id: leek, amount: 300 }],
    )
    .await;

    let stranger = session(&pool, stranger, UserRole::User).await;
    assert_eq!(code(actions::get_recipe_mut(id, &stranger, &pool).await), 403);
    assert_eq!(code(actions::get_recipe_mut(id + 1000, &stranger, &pool).await), 404);

    let owner = session(&pool, author, UserRole::User).await;
    assert!(actions::get_recipe_mut(id, &owner, &pool).await.is_ok());

    let admin = session(&pool, moderator, UserRole::Admin).await;
    let Ok(recipe) = actions::get_recipe_mut(id, &admin, &pool).await else {
        panic!("admin should reach any recipe");
    };
    let patch = RecipePatch {
        ingredients: vec![IngredientAmount { id: leek, amount: 400 }],
        tags: vec![soup],
        image: None,
        name: Some("Creamy leek soup".to_owned()),
        text: None,
        cooking_time: None,
    };
    assert!(actions::update_recipe(recipe.id, &patch, None, &pool).await.is_ok());
    let Ok(updated) = actions::get_recipe(id, &pool).await else {
        panic!("recipe should load");
    };
    assert_eq!(updated.name, "Creamy leek soup");
    assert_eq!(updated.author_id, author);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn deleting_recipe_clears_cart_entries(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let pie = tag(&pool, "pie", "#AA5500").await;
    let apple = ingredient(&pool, "Apple", "pcs").await;
    let id = recipe(
        &pool,
        cook,
        "Apple pie",
        vec![pie],
        vec![IngredientAmount { id: apple, amount: 4 }],
    )
    .await;

    assert!(actions::add_to_shopping_cart(id, cook, &pool).await.is_ok());
    assert!(actions::add_to_favorites(id, cook, &pool).await.is_ok());
    assert!(actions::delete_recipe(id, &pool).await.is_ok());
    assert_eq!(code(actions::delete_recipe(id, &pool).await), 404);

    let Ok(items) = actions::fetch_shopping_list(cook, &pool).await else {
        panic!("shopping list should load");
    };
    assert!(items.is_empty());
    assert_eq!(actions::render_shopping_list(&items), "Shopping list:\n");
    assert!(matches!(actions::is_favorite(id, cook, &pool).await, Ok(false)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn ingredient_search_matches_prefix(pool: PgPool) {
    ingredient(&pool, "Flour", "g").await;
    ingredient(&pool, "Cauliflower", "g").await;
    ingredient(&pool, "flaxseed", "g").await;

    let Ok(found) = actions::list_ingredients(Some("FL"), &pool).await else {
        panic!("ingredients should list");
    };
    let mut names: Vec<&str> = found.iter().map(|i| i.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Flour", "flaxseed"]);

    let Ok(all) = actions::list_ingredients(None, &pool).await else {
        panic!("ingredients should list");
    };
    assert_eq!(all.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a postgres DATABASE_URL"]
async fn user_listing_marks_subscriptions(pool: PgPool) {
    let config = config();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let carol = user(&pool, "carol").await;
    assert!(actions::subscribe(alice, bob, None, &config, &pool).await.is_ok());

    let page = Pagination { page: 1, limit: 6 };
    let Ok(listed) = actions::fetch_users(&page, Some(alice), &pool).await else {
        panic!("users should list");
    };
    assert_eq!(listed.count, 3);
    let flags: Vec<(Uuid, bool)> = listed
        .results
        .iter()
        .map(|u| (u.id, u.is_subscribed))
        .collect();
    assert_eq!(flags, [(alice, false), (bob, true), (carol, false)]);

    let Ok(anonymous) = actions::fetch_users(&page, None, &pool).await else {
        panic!("users should list");
    };
    assert!(anonymous.results.iter().all(|u| !u.is_subscribed));

    let Ok(bob_row) = actions::get_user_row(bob, Some(alice), &pool).await else {
        panic!("user should load");
    };
    assert!(bob_row.is_subscribed);
}
