
use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use kitchen_menu_api::{Dish, DishId, MenuLayout};
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Collection,
};
use tokio::sync::RwLock;

mod data;
pub use data::*;

/// The dish catalog and the published menus that reference its dishes.
#[derive(Clone)]
pub struct DishCatalog {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Mongo(CatalogCollections),
    Memory(Arc<RwLock<MemoryCatalog>>),
}

impl DishCatalog {
    pub fn mongo(db: &mongodb::Database) -> Self {
        Self { backend: Backend::Mongo(CatalogCollections::new(db)) }
    }

    /// Lives as long as the process, used without a db and in tests.
    pub fn in_memory() -> Self {
        Self { backend: Backend::Memory(Default::default()) }
    }

    /// All dishes ordered by name.
    pub async fn find_all(&self) -> Result<Vec<Dish>, StoreError> {
        match &self.backend {
            Backend::Mongo(c) => c.find_all().await,
            Backend::Memory(m) => Ok(m.read().await.find_all()),
        }
    }

    pub async fn insert(&self, dish: NewDish) -> Result<Dish, StoreError> {
        match &self.backend {
            Backend::Mongo(c) => c.insert(dish).await,
            Backend::Memory(m) => Ok(m.write().await.insert(dish)),
        }
    }

    /// `None` if there is no dish with this id.
    pub async fn update_by_id(
        &self, id: DishId, changes: &DishChanges,
    ) -> Result<Option<Dish>, StoreError> {
        match &self.backend {
            Backend::Mongo(c) => c.update_by_id(id, changes).await,
            Backend::Memory(m) => Ok(m.write().await.update_by_id(id, changes)),
        }
    }

    /// Removes the dish and every published menu entry pointing at it.
    /// `false` if there was no such dish.
    pub async fn delete_by_id(&self, id: DishId) -> Result<bool, StoreError> {
        match &self.backend {
            Backend::Mongo(c) => c.delete_by_id(id).await,
            Backend::Memory(m) => Ok(m.write().await.delete_by_id(id)),
        }
    }

    /// Replaces whatever was published for `date`.
    pub async fn replace_menu(
        &self, date: &NaiveDate, layout: &MenuLayout,
    ) -> Result<(), StoreError> {
        let rows = menu_rows(date, layout);
        match &self.backend {
            Backend::Mongo(c) => c.replace_menu(date, rows).await,
            Backend::Memory(m) => {
                m.write().await.replace_menu(date, rows);
                Ok(())
            },
        }
    }

    pub async fn menu(&self, date: &NaiveDate) -> Result<MenuLayout, StoreError> {
        let mut rows = match &self.backend {
            Backend::Mongo(c) => c.menu_items(date).await?,
            Backend::Memory(m) => m.read().await.menu_items(date),
        };
        rows.sort_by_key(|v| (v.category, v.meal, v.position));

        let mut layout = MenuLayout::new();
        for row in rows {
            layout.entry(row.category).or_default()
                .entry(row.meal).or_default()
            .push(row.dish_id);
        }
        Ok(layout)
    }
}

fn menu_rows(date: &NaiveDate, layout: &MenuLayout) -> Vec<MenuItemRecord> {
    let date = MenuItemRecord::date_key(date);
    layout.iter()
        .flat_map(|(&category, meals)| meals.iter().map(move |(&meal, ids)| (category, meal, ids)))
        .flat_map(|(category, meal, ids)| {
            let date = date.clone();
            ids.iter().enumerate().map(move |(position, &dish_id)| MenuItemRecord {
                date: date.clone(),
                category,
                meal,
                position: position as u32,
                dish_id,
            })
        })
    .collect()
}

#[derive(Default)]
struct MemoryCatalog {
    last_id: DishId,
    dishes: BTreeMap<DishId, Dish>,
    menu_items: Vec<MenuItemRecord>,
}

impl MemoryCatalog {
    fn find_all(&self) -> Vec<Dish> {
        let mut dishes: Vec<_> = self.dishes.values().cloned().collect();
        dishes.sort_by(|a, b| a.name.cmp(&b.name));
        dishes
    }

    fn insert(&mut self, dish: NewDish) -> Dish {
        self.last_id += 1;
        let dish = dish.with_id(self.last_id);
        self.dishes.insert(dish.id, dish.clone());
        dish
    }

    fn update_by_id(&mut self, id: DishId, changes: &DishChanges) -> Option<Dish> {
        let dish = self.dishes.get_mut(&id)?;
        changes.apply(dish);
        Some(dish.clone())
    }

    fn delete_by_id(&mut self, id: DishId) -> bool {
        self.menu_items.retain(|v| v.dish_id != id);
        self.dishes.remove(&id).is_some()
    }

    fn replace_menu(&mut self, date: &NaiveDate, rows: Vec<MenuItemRecord>) {
        let key = MenuItemRecord::date_key(date);
        self.menu_items.retain(|v| v.date != key);
        self.menu_items.extend(rows);
    }

    fn menu_items(&self, date: &NaiveDate) -> Vec<MenuItemRecord> {
        let key = MenuItemRecord::date_key(date);
        self.menu_items.iter().filter(|v| v.date == key).cloned().collect()
    }
}

#[derive(Clone)]
pub struct CatalogCollections {
    dishes: Collection<DishRecord>,
    menu_items: Collection<MenuItemRecord>,
    counters: Collection<Counter>,
}

impl CatalogCollections {
    const DISH_COUNTER: &'static str = "dishes";

    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            dishes: db.collection("dishes"),
            menu_items: db.collection("menu_items"),
            counters: db.collection("counters"),
        }
    }

    async fn find_all(&self) -> Result<Vec<Dish>, StoreError> {
        let mut cursor = self.dishes.find(None, FindOptions::builder()
            .sort(doc! { "name": 1 })
        .build()).await?;

        let mut dishes = Vec::new();
        while cursor.advance().await? {
            dishes.push(cursor.deserialize_current()?.into());
        }
        Ok(dishes)
    }

    async fn next_id(&self) -> Result<DishId, StoreError> {
        let counter = self.counters.find_one_and_update(
            doc! { "_id": Self::DISH_COUNTER },
            doc! { "$inc": { "seq": 1_i64 } },
            FindOneAndUpdateOptions::builder()
                .upsert(true)
                .return_document(ReturnDocument::After)
            .build(),
        ).await?.ok_or(StoreError::Counter(Self::DISH_COUNTER))?;

        Ok(counter.seq)
    }

    async fn insert(&self, dish: NewDish) -> Result<Dish, StoreError> {
        let dish = dish.with_id(self.next_id().await?);
        self.dishes.insert_one(DishRecord::from(dish.clone()), None).await?;
        Ok(dish)
    }

    async fn update_by_id(
        &self, id: DishId, changes: &DishChanges,
    ) -> Result<Option<Dish>, StoreError> {
        Ok(self.dishes.find_one_and_update(
            doc! { "_id": id },
            doc! { "$set": changes.to_document() },
            FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
            .build(),
        ).await?.map(Into::into))
    }

    async fn delete_by_id(&self, id: DishId) -> Result<bool, StoreError> {
        let unlinked = self.menu_items.delete_many(doc! { "dish_id": id }, None).await?;
        if unlinked.deleted_count > 0 {
            tracing::info!("removed dish {id} from {} published menu entries", unlinked.deleted_count);
        }

        let deleted = self.dishes.delete_one(doc! { "_id": id }, None).await?;
        Ok(deleted.deleted_count > 0)
    }

    async fn replace_menu(
        &self, date: &NaiveDate, rows: Vec<MenuItemRecord>,
    ) -> Result<(), StoreError> {
        self.menu_items.delete_many(doc! {
            "date": MenuItemRecord::date_key(date),
        }, None).await?;

        if !rows.is_empty() {
            self.menu_items.insert_many(rows, None).await?;
        }
        Ok(())
    }

    async fn menu_items(&self, date: &NaiveDate) -> Result<Vec<MenuItemRecord>, StoreError> {
        let mut cursor = self.menu_items.find(doc! {
            "date": MenuItemRecord::date_key(date),
        }, None).await?;

        let mut rows = Vec::new();
        while cursor.advance().await? {
            rows.push(cursor.deserialize_current()?);
        }
        Ok(rows)
    }
}
