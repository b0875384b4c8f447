
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::{Dish, DishId};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietCategory {
    Normal,
    Diabetic,
    HepatoGastro,
}

impl DietCategory {
    pub const ALL: [DietCategory; 3] = [
        DietCategory::Normal,
        DietCategory::Diabetic,
        DietCategory::HepatoGastro,
    ];

    fn index(self) -> usize {
        match self {
            DietCategory::Normal => 0,
            DietCategory::Diabetic => 1,
            DietCategory::HepatoGastro => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DietCategory::Normal => "Normal",
            DietCategory::Diabetic => "Diabetic",
            DietCategory::HepatoGastro => "Hepato-gastro-intestinal",
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    #[serde(alias = "mic_dejun")] Breakfast,
    #[serde(alias = "pranz")] Lunch,
    #[serde(alias = "cina")] Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    fn index(self) -> usize {
        match self {
            MealSlot::Breakfast => 0,
            MealSlot::Lunch => 1,
            MealSlot::Dinner => 2,
        }
    }

    /// maximum number of dishes per cell
    pub fn capacity(self) -> usize {
        match self {
            MealSlot::Breakfast => 10,
            MealSlot::Lunch => 5,
            MealSlot::Dinner => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Mic dejun",
            MealSlot::Lunch => "Prânz",
            MealSlot::Dinner => "Cină",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    Full,
}

/// Selected dishes of one (category, meal) pair, in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MenuCell {
    dishes: Vec<Dish>,
}

impl MenuCell {
    pub fn dishes(&self) -> &[Dish] { &self.dishes }

    pub fn len(&self) -> usize { self.dishes.len() }

    pub fn is_empty(&self) -> bool { self.dishes.is_empty() }

    pub fn contains(&self, id: DishId) -> bool {
        self.dishes.iter().any(|v| v.id == id)
    }

    pub fn ids(&self) -> Vec<DishId> {
        self.dishes.iter().map(|v| v.id).collect()
    }
}

impl Serialize for MenuCell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer
    { self.dishes.serialize(serializer) }
}

/// Dish ids per category and meal, as exchanged with clients and the store.
pub type MenuLayout = BTreeMap<DietCategory, BTreeMap<MealSlot, Vec<DishId>>>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MenuError {
    #[error("unknown dish id: {0}")]
    UnknownDish(DishId),
}

/// The menu being composed: 3 diet categories x 3 meals, every cell
/// duplicate free and within the capacity of its meal.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MenuSelection {
    cells: [[MenuCell; 3]; 3],
}

impl MenuSelection {
    pub fn new() -> Self { Self::default() }

    /// Every cell is within its meal's capacity and holds each dish once.
    fn invariants_hold(&self) -> bool {
        self.iter().all(|(_, meal, cell)| {
            cell.len() <= meal.capacity()
                && cell.dishes.iter().enumerate()
                    .all(|(i, d)| !cell.dishes[..i].iter().any(|o| o.id == d.id))
        })
    }

    #[inline]
    fn assert_invariants(&self) {
        debug_assert!(self.invariants_hold());
    }

    pub fn cell(&self, category: DietCategory, meal: MealSlot) -> &MenuCell {
        &self.cells[category.index()][meal.index()]
    }

    fn cell_mut(&mut self, category: DietCategory, meal: MealSlot) -> &mut MenuCell {
        &mut self.cells[category.index()][meal.index()]
    }

    /// Appends `dish` unless it is already in the cell or the cell is full.
    pub fn add(
        &mut self, category: DietCategory, meal: MealSlot, dish: Dish,
    ) -> AddOutcome {
        self.assert_invariants();
        let cell = self.cell_mut(category, meal);

        let outcome = if cell.contains(dish.id) {
            AddOutcome::Duplicate
        } else if cell.len() >= meal.capacity() {
            AddOutcome::Full
        } else {
            cell.dishes.push(dish);
            AddOutcome::Added
        };

        self.assert_invariants();
        outcome
    }

    /// Removing a dish that is not in the cell is a no-op.
    pub fn remove(
        &mut self, category: DietCategory, meal: MealSlot, id: DishId,
    ) -> Option<Dish> {
        self.assert_invariants();
        let cell = self.cell_mut(category, meal);
        let removed = cell.dishes.iter()
            .position(|v| v.id == id)
            .map(|i| cell.dishes.remove(i));

        if removed.is_none() {
            tracing::debug!("dish {id} not in {category:?}/{meal:?}, nothing to remove");
        }

        self.assert_invariants();
        removed
    }

    pub fn reset(&mut self) {
        self.cells = Default::default();
        self.assert_invariants();
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, _, cell)| cell.is_empty())
    }

    /// number of dishes over all meals of a category
    pub fn total(&self, category: DietCategory) -> usize {
        self.cells[category.index()].iter().map(MenuCell::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DietCategory, MealSlot, &MenuCell)> {
        DietCategory::ALL.into_iter().flat_map(move |c| {
            MealSlot::ALL.into_iter().map(move |m| (c, m, self.cell(c, m)))
        })
    }

    pub fn layout(&self) -> MenuLayout {
        let mut layout = MenuLayout::new();
        for (category, meal, cell) in self.iter() {
            if !cell.is_empty() {
                layout.entry(category).or_default().insert(meal, cell.ids());
            }
        }
        layout
    }

    /// Builds a selection from dish ids, looking each one up in `catalog`.
    /// Ids go through [`MenuSelection::add`], so duplicates and anything
    /// past a meal's capacity are dropped.
    pub fn resolve(layout: &MenuLayout, catalog: &[Dish]) -> Result<Self, MenuError> {
        let mut menu = Self::new();
        for (&category, meals) in layout {
            for (&meal, ids) in meals {
                for &id in ids {
                    let dish = catalog.iter()
                        .find(|v| v.id == id)
                        .ok_or(MenuError::UnknownDish(id))?;

                    let outcome = menu.add(category, meal, dish.clone());
                    if outcome != AddOutcome::Added {
                        tracing::debug!("skipped dish {id} in {category:?}/{meal:?}: {outcome:?}");
                    }
                }
            }
        }
        Ok(menu)
    }
}

impl Serialize for MenuSelection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer
    {
        let mut out: BTreeMap<DietCategory, BTreeMap<MealSlot, &MenuCell>> = BTreeMap::new();
        for (category, meal, cell) in self.iter() {
            out.entry(category).or_default().insert(meal, cell);
        }
        out.serialize(serializer)
    }
}
