
use chrono::NaiveDate;
use kitchen_menu_api::{DietCategory, Dish, DishId, MealSlot, Unit};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error("id counter '{0}' missing after upsert")]
    Counter(&'static str),
}

/// A dish as stored in the `dishes` collection, keyed by its numeric id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishRecord {
    #[serde(rename = "_id")]
    pub id: DishId,
    pub name: String,
    pub quantity: u32,
    pub unit: Unit,
    pub display_quantity: Option<String>,
}

impl From<DishRecord> for Dish {
    fn from(v: DishRecord) -> Self {
        Dish {
            id: v.id,
            name: v.name,
            quantity: v.quantity,
            unit: v.unit,
            display_quantity: v.display_quantity,
        }
    }
}

impl From<Dish> for DishRecord {
    fn from(v: Dish) -> Self {
        DishRecord {
            id: v.id,
            name: v.name,
            quantity: v.quantity,
            unit: v.unit,
            display_quantity: v.display_quantity,
        }
    }
}

/// Links a dish into the menu published for `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemRecord {
    pub date: String,
    pub category: DietCategory,
    pub meal: MealSlot,
    pub position: u32,
    pub dish_id: DishId,
}

impl MenuItemRecord {
    pub fn date_key(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Counter {
    pub seq: i64,
}

/// Validated fields of a dish that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDish {
    pub name: String,
    pub quantity: u32,
    pub unit: Unit,
    pub display_quantity: Option<String>,
}

impl NewDish {
    pub fn with_id(self, id: DishId) -> Dish {
        Dish {
            id,
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            display_quantity: self.display_quantity,
        }
    }
}

/// Validated partial update. `display_quantity: Some(None)` clears the
/// override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DishChanges {
    pub name: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<Unit>,
    pub display_quantity: Option<Option<String>>,
}

impl DishChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.display_quantity.is_none()
    }

    pub fn apply(&self, dish: &mut Dish) {
        if let Some(name) = &self.name { dish.name = name.clone(); }
        if let Some(quantity) = self.quantity { dish.quantity = quantity; }
        if let Some(unit) = self.unit { dish.unit = unit; }
        if let Some(display) = &self.display_quantity {
            dish.display_quantity = display.clone();
        }
    }

    pub fn to_document(&self) -> mongodb::bson::Document {
        let mut set = mongodb::bson::Document::new();
        if let Some(name) = &self.name { set.insert("name", name.as_str()); }
        if let Some(quantity) = self.quantity { set.insert("quantity", quantity as i64); }
        if let Some(unit) = self.unit { set.insert("unit", unit.as_str()); }
        if let Some(display) = &self.display_quantity {
            set.insert("display_quantity", display.clone());
        }
        set
    }
}
