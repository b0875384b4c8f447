
use axum::{
    extract::FromRequest,
    http::{
        header::{CACHE_CONTROL, VARY},
        HeaderValue,
    },
    response::Response,
};
use chrono::NaiveDate;
use kitchen_menu_api::DishId;
use mongodb::options::ClientOptions;

use crate::config::DbConfig;

use super::ApiError;

pub async fn connect_db(cfg: &DbConfig) -> Option<mongodb::Database> {
    match async {
        mongodb::Client::with_options(
            ClientOptions::parse(&cfg.url).await?,
        )
    }.await {
        Ok(v) => {
            Some(v.database(&cfg.database))
        },
        Err(err) => {
            tracing::error!("could not connect to db: {err}");
            None
        },
    }
}

/// Every response depends on the session cookie and may carry data that
/// must not end up in a shared cache.
pub async fn no_store(mut res: Response) -> Response {
    let headers = res.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(VARY, HeaderValue::from_static("Cookie"));
    res
}

/// `axum::Json`, but a body that does not parse answers like any other
/// validation error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

pub fn parse_id(raw: &str) -> Result<DishId, ApiError> {
    raw.trim().parse::<DishId>().ok()
        .filter(|v| *v > 0)
    .ok_or_else(|| ApiError::validation("Invalid id"))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation("Invalid date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12").ok(), Some(12));
        for bad in ["0", "-1", "abc", "1.5", ""] {
            assert!(matches!(parse_id(bad), Err(ApiError::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn dates_are_iso() {
        assert_eq!(parse_date("2025-10-08").ok(), NaiveDate::from_ymd_opt(2025, 10, 8));
        assert!(parse_date("8 Octombrie 2025").is_err());
    }
}
