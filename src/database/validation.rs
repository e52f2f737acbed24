use std::collections::HashSet;

use once_cell::sync::Lazy;
use potion::Error;
use regex::Regex;

use crate::{
    constants::{EMAIL_MAX_LENGTH, NAME_MAX_LENGTH, PASSWORD_MIN_LENGTH, USERNAME_MAX_LENGTH},
    error::ValidationError,
    schema::{IngredientAmount, IngredientForm, RecipeForm, RecipePatch, RegisterForm, TagForm, Uuid},
};

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap());
static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());
static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), Error> {
    if ingredients.is_empty() {
        return Err(ValidationError::new("A recipe needs at least one ingredient").into());
    }

    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            return Err(ValidationError::new("Ingredients must be unique").into());
        }
        if ingredient.amount < 1 {
            return Err(ValidationError::new(format!(
                "Amount of ingredient {} must be at least 1",
                ingredient.id
            ))
            .into());
        }
    }

    Ok(())
}

pub fn validate_tags(tags: &[Uuid]) -> Result<(), Error> {
    if tags.is_empty() {
        return Err(ValidationError::new("A recipe needs at least one tag").into());
    }

    let unique: HashSet<&Uuid> = tags.iter().collect();
    if unique.len() != tags.len() {
        return Err(ValidationError::new("Tags must be unique").into());
    }

    Ok(())
}

pub fn validate_cooking_time(cooking_time: i32) -> Result<(), Error> {
    if cooking_time < 1 {
        return Err(ValidationError::new("Cooking time must be at least 1").into());
    }
    Ok(())
}

pub fn validate_text(field: &str, value: &str, max_length: Option<usize>) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!("Field '{field}' may not be blank")).into());
    }
    if let Some(max_length) = max_length {
        if value.chars().count() > max_length {
            return Err(ValidationError::new(format!(
                "Field '{field}' may not exceed {max_length} characters"
            ))
            .into());
        }
    }
    Ok(())
}

pub fn validate_color(color: &str) -> Result<(), Error> {
    if !HEX_COLOR.is_match(color) {
        return Err(ValidationError::new("Color must be in HEX format").into());
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), Error> {
    validate_text("slug", slug, Some(NAME_MAX_LENGTH))?;
    if !SLUG.is_match(slug) {
        return Err(ValidationError::new(
            "Slug may only contain letters, numbers, underscores or hyphens",
        )
        .into());
    }
    Ok(())
}

pub fn validate_recipe_form(form: &RecipeForm) -> Result<(), Error> {
    validate_text("name", &form.name, Some(NAME_MAX_LENGTH))?;
    validate_text("text", &form.text, None)?;
    validate_text("image", &form.image, None)?;
    validate_cooking_time(form.cooking_time)?;
    validate_tags(&form.tags)?;
    validate_ingredients(&form.ingredients)
}

pub fn validate_recipe_patch(patch: &RecipePatch) -> Result<(), Error> {
    if let Some(name) = &patch.name {
        validate_text("name", name, Some(NAME_MAX_LENGTH))?;
    }
    if let Some(text) = &patch.text {
        validate_text("text", text, None)?;
    }
    if let Some(image) = &patch.image {
        validate_text("image", image, None)?;
    }
    if let Some(cooking_time) = patch.cooking_time {
        validate_cooking_time(cooking_time)?;
    }
    validate_tags(&patch.tags)?;
    validate_ingredients(&patch.ingredients)
}

pub fn validate_tag_form(form: &TagForm) -> Result<(), Error> {
    validate_text("name", &form.name, Some(NAME_MAX_LENGTH))?;
    validate_color(&form.color)?;
    validate_slug(&form.slug)
}

pub fn validate_ingredient_form(form: &IngredientForm) -> Result<(), Error> {
    validate_text("name", &form.name, Some(NAME_MAX_LENGTH))?;
    validate_text("measurement_unit", &form.measurement_unit, Some(NAME_MAX_LENGTH))
}

pub fn validate_password(password: &str) -> Result<(), Error> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ValidationError::new(format!(
            "Password must be at least {PASSWORD_MIN_LENGTH} characters"
        ))
        .into());
    }
    Ok(())
}

pub fn validate_register_form(form: &RegisterForm) -> Result<(), Error> {
    validate_text("email", &form.email, Some(EMAIL_MAX_LENGTH))?;
    if !form.email.contains('@') {
        return Err(ValidationError::new("Enter a valid email address").into());
    }
    validate_text("username", &form.username, Some(USERNAME_MAX_LENGTH))?;
    if !USERNAME.is_match(&form.username) {
        return Err(ValidationError::new(
            "Username may only contain letters, numbers and @/./+/-/_ characters",
        )
        .into());
    }
    validate_text("first_name", &form.first_name, Some(USERNAME_MAX_LENGTH))?;
    validate_text("last_name", &form.last_name, Some(USERNAME_MAX_LENGTH))?;
    validate_password(&form.password)
}
