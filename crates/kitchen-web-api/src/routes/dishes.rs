
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use kitchen_menu_api::{search_dishes, Dish, QuantityError, QuantityInput, Unit};
use serde::{de::IgnoredAny, Deserialize};

use super::{
    data::{DishCatalog, DishChanges, NewDish},
    helpers::{parse_id, JsonBody},
    ApiError,
};
use crate::session::AdminSession;

#[derive(Debug, Default, Deserialize)]
pub struct DishQuery {
    q: Option<String>,
}

/// A field that failed to deserialize as `T` is kept as `Invalid`, so the
/// handler still sees which field was wrong.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Field<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> Field<T> {
    fn valid(self, err: impl FnOnce() -> ApiError) -> Result<T, ApiError> {
        match self {
            Field::Valid(v) => Ok(v),
            Field::Invalid(_) => Err(err()),
        }
    }
}

/// Dish fields as sent by the admin page. Everything is optional and
/// loosely typed here so validation can answer with a readable message
/// instead of a json error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishPayload {
    name: Option<Field<String>>,
    #[serde(alias = "gramaj")]
    quantity: Option<Field<QuantityInput>>,
    unit: Option<Field<String>>,
    #[serde(alias = "displayGramaj")]
    display_quantity: Option<Field<String>>,
}

struct CheckedPayload {
    name: Option<String>,
    quantity: Option<QuantityInput>,
    unit: Option<String>,
    display_quantity: Option<String>,
}

fn quantity(input: &QuantityInput) -> Result<u32, ApiError> {
    input.parse().map_err(|err| {
        tracing::debug!("rejected quantity {input:?}: {err}");
        match err {
            QuantityError::TooLarge => ApiError::validation("Quantity too large"),
            _ => ApiError::validation("Invalid quantity"),
        }
    })
}

fn unit(input: &str) -> Result<Unit, ApiError> {
    Unit::normalize(input).map_err(|err| {
        tracing::debug!("{err}");
        ApiError::InvalidUnit
    })
}

/// blank means "no override"
fn display_quantity(input: Option<String>) -> Option<String> {
    input.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl DishPayload {
    fn checked(self) -> Result<CheckedPayload, ApiError> {
        Ok(CheckedPayload {
            name: self.name
                .map(|v| v.valid(|| ApiError::validation("Invalid name")))
                .transpose()?,
            quantity: self.quantity
                .map(|v| v.valid(|| ApiError::validation("Invalid quantity")))
                .transpose()?,
            unit: self.unit
                .map(|v| v.valid(|| ApiError::InvalidUnit))
                .transpose()?,
            display_quantity: self.display_quantity
                .map(|v| v.valid(|| ApiError::validation("Invalid display quantity")))
                .transpose()?,
        })
    }

    fn into_new_dish(self) -> Result<NewDish, ApiError> {
        self.checked()?.into_new_dish()
    }

    fn into_changes(self) -> Result<DishChanges, ApiError> {
        self.checked()?.into_changes()
    }
}

impl CheckedPayload {
    fn into_new_dish(self) -> Result<NewDish, ApiError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(ApiError::validation("Missing name"));
        }

        let quantity = quantity(
            self.quantity.as_ref().ok_or_else(|| ApiError::validation("Invalid quantity"))?,
        )?;

        let unit = match &self.unit {
            Some(v) => unit(v)?,
            None => Unit::default(),
        };

        Ok(NewDish {
            name: name.to_string(),
            quantity,
            unit,
            display_quantity: display_quantity(self.display_quantity),
        })
    }

    fn into_changes(self) -> Result<DishChanges, ApiError> {
        let name = match self.name.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::validation("Missing name")),
            v => v.map(ToOwned::to_owned),
        };

        let changes = DishChanges {
            name,
            quantity: self.quantity.as_ref().map(quantity).transpose()?,
            unit: self.unit.as_deref().map(unit).transpose()?,
            display_quantity: self.display_quantity.map(|v| display_quantity(Some(v))),
        };

        if changes.is_empty() {
            Err(ApiError::validation("No fields to update"))
        } else {
            Ok(changes)
        }
    }
}

pub async fn list(
    _: AdminSession,
    Query(q): Query<DishQuery>,
    State(catalog): State<DishCatalog>,
) -> Result<Json<Vec<Dish>>, ApiError> {
    let dishes = catalog.find_all().await?;

    Ok(Json(match q.q.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => search_dishes(&dishes, query)
            .into_iter()
            .cloned()
        .collect(),
        _ => dishes,
    }))
}

pub async fn create(
    AdminSession(session): AdminSession,
    State(catalog): State<DishCatalog>,
    JsonBody(payload): JsonBody<DishPayload>,
) -> Result<(StatusCode, Json<Dish>), ApiError> {
    let dish = payload.into_new_dish()?;
    let dish = catalog.insert(dish).await?;

    tracing::info!("{} created dish {} ({})", session.email, dish.id, dish.name);
    Ok((StatusCode::CREATED, Json(dish)))
}

pub async fn update(
    AdminSession(session): AdminSession,
    Path(id): Path<String>,
    State(catalog): State<DishCatalog>,
    JsonBody(payload): JsonBody<DishPayload>,
) -> Result<Json<Dish>, ApiError> {
    let id = parse_id(&id)?;
    let changes = payload.into_changes()?;

    let dish = catalog.update_by_id(id, &changes).await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!("{} updated dish {id}", session.email);
    Ok(Json(dish))
}

pub async fn delete(
    AdminSession(session): AdminSession,
    Path(id): Path<String>,
    State(catalog): State<DishCatalog>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;

    if !catalog.delete_by_id(id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!("{} deleted dish {id}", session.email);
    Ok(Json(serde_json::json!({ "ok": true })))
}
