use std::convert::Infallible;

use serde::Serialize;
use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    http::{header, StatusCode},
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection},
    reply::{self, Reply, Response},
};

use crate::{constants::SHOPPING_LIST_FILENAME, middleware::Unauthorized};

fn detail(message: &str, status: StatusCode) -> Response {
    reply::with_status(reply::json(&json!({ "detail": message })), status).into_response()
}

pub fn error_reply(err: potion::Error) -> Response {
    let status =
        StatusCode::from_u16(err.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = err
        .info
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Error").to_owned());

    detail(&message, status)
}

pub fn json_reply<T: Serialize>(result: Result<T, potion::Error>, status: StatusCode) -> Response {
    match result {
        Ok(value) => reply::with_status(reply::json(&value), status).into_response(),
        Err(err) => error_reply(err),
    }
}

pub fn empty_reply(result: Result<(), potion::Error>) -> Response {
    match result {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_reply(err),
    }
}

pub fn attachment_reply(document: String) -> Response {
    let response = reply::with_header(
        document,
        header::CONTENT_TYPE,
        "text/plain; charset=utf-8",
    );
    reply::with_header(
        response,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
    .into_response()
}

pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = rejection.find::<Unauthorized>() {
        return Ok(detail(&e.info, StatusCode::UNAUTHORIZED));
    }
    if let Some(e) = rejection.find::<BodyDeserializeError>() {
        return Ok(detail(&e.to_string(), StatusCode::BAD_REQUEST));
    }
    if rejection.find::<LengthRequired>().is_some() {
        return Ok(detail("Content-Length is required", StatusCode::LENGTH_REQUIRED));
    }
    if rejection.find::<PayloadTooLarge>().is_some() {
        return Ok(detail("Payload too large", StatusCode::PAYLOAD_TOO_LARGE));
    }
    if rejection.is_not_found() {
        return Ok(detail("Not found", StatusCode::NOT_FOUND));
    }
    if rejection.find::<MethodNotAllowed>().is_some() {
        return Ok(detail("Method not allowed", StatusCode::METHOD_NOT_ALLOWED));
    }

    log::error!("> Unhandled rejection: {rejection:?}");
    Ok(detail("Internal server error", StatusCode::INTERNAL_SERVER_ERROR))
}
