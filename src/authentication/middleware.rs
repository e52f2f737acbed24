use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::Config;

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
pub struct Unauthorized {
    pub info: String,
}

impl Unauthorized {
    fn new(info: impl Into<String>) -> Self {
        Self { info: info.into() }
    }
}

impl reject::Reject for Unauthorized {}

/// Accepts `Authorization: Token <jwt>` as well as `Bearer <jwt>`.
fn session_from_header(header: &str, config: &Config) -> Result<SessionData, Unauthorized> {
    let token = header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| Unauthorized::new("Invalid authorization header"))?;

    verify_jwt_session(token, config)
        .map(SessionData::from)
        .map_err(|e| Unauthorized::new(e.info.unwrap_or_else(|| "Invalid session".to_owned())))
}

pub fn with_session(
    config: Arc<Config>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let config = config.clone();
        async move {
            match header {
                Some(header) => session_from_header(&header, &config).map_err(reject::custom),
                None => Err(reject::custom(Unauthorized::new(
                    "Authentication credentials were not provided",
                ))),
            }
        }
    })
}

pub fn with_possible_session(
    config: Arc<Config>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let config = config.clone();
        async move {
            match header {
                Some(header) => session_from_header(&header, &config)
                    .map(Some)
                    .map_err(reject::custom),
                None => Ok(None),
            }
        }
    })
}
