
use axum::{
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use kitchen_menu_api::{pdf::MenuDocument, MenuLayout, MenuSelection};
use serde::{Deserialize, Serialize};

use super::{
    data::DishCatalog,
    helpers::{parse_date, JsonBody},
    ApiError,
};
use crate::session::AdminSession;

#[derive(Debug, Deserialize)]
pub struct PdfRequest {
    date: Option<String>,
    #[serde(default)]
    menu: MenuLayout,
}

#[derive(Debug, Serialize)]
pub struct PublishedMenu {
    date: String,
    menu: MenuSelection,
}

/// Looks the ids up in the catalog; capacity and duplicate rules apply.
async fn resolve(catalog: &DishCatalog, layout: &MenuLayout) -> Result<MenuSelection, ApiError> {
    let dishes = catalog.find_all().await?;
    Ok(MenuSelection::resolve(layout, &dishes)?)
}

pub async fn pdf(
    _: AdminSession,
    State(catalog): State<DishCatalog>,
    JsonBody(req): JsonBody<PdfRequest>,
) -> Result<Response, ApiError> {
    let menu = resolve(&catalog, &req.menu).await?;
    let doc = MenuDocument::new(&menu, req.date.as_deref());

    let bytes = doc.render()?;
    let file_name = doc.file_name(chrono::Local::now().date_naive());
    tracing::info!("rendered {file_name} ({} bytes)", bytes.len());

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        bytes,
    ).into_response())
}

pub async fn publish(
    AdminSession(session): AdminSession,
    Path(date): Path<String>,
    State(catalog): State<DishCatalog>,
    JsonBody(layout): JsonBody<MenuLayout>,
) -> Result<Json<PublishedMenu>, ApiError> {
    let date = parse_date(&date)?;
    let menu = resolve(&catalog, &layout).await?;

    // store what survived the cell rules, not the raw request
    catalog.replace_menu(&date, &menu.layout()).await?;
    tracing::info!("{} published the menu for {date}", session.email);

    Ok(Json(PublishedMenu { date: date.to_string(), menu }))
}

pub async fn published(
    _: AdminSession,
    Path(date): Path<String>,
    State(catalog): State<DishCatalog>,
) -> Result<Json<PublishedMenu>, ApiError> {
    let date = parse_date(&date)?;
    let layout = catalog.menu(&date).await?;
    let menu = resolve(&catalog, &layout).await?;

    Ok(Json(PublishedMenu { date: date.to_string(), menu }))
}
