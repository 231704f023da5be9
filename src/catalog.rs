use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::models::Kind;
use crate::store::{load_document, save_document, DataDir};

const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Entertainment",
    "Bills & Utilities",
    "Shopping",
    "Healthcare",
    "Education",
    "Housing",
    "Business",
    "Gifts & Donations",
];

const DEFAULT_INCOME_CATEGORIES: &[&str] = &["Salary", "Freelance", "Investment", "Gift", "Other Income"];

/// Ordered, append-only category labels per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySet {
    #[serde(default)]
    pub expense: Vec<String>,
    #[serde(default)]
    pub income: Vec<String>,
}

impl CategorySet {
    pub fn seeded() -> Self {
        Self {
            expense: DEFAULT_EXPENSE_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            income: DEFAULT_INCOME_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn labels(&self, kind: Kind) -> &[String] {
        match kind {
            Kind::Income => &self.income,
            Kind::Expense => &self.expense,
        }
    }

    fn labels_mut(&mut self, kind: Kind) -> &mut Vec<String> {
        match kind {
            Kind::Income => &mut self.income,
            Kind::Expense => &mut self.expense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyExists,
}

pub fn load_categories(dir: &DataDir) -> CategorySet {
    load_document(&dir.categories())
}

pub fn add_category(dir: &DataDir, kind: Kind, label: &str) -> Result<AddOutcome> {
    let label = label.trim();
    if label.is_empty() {
        return Err(TallyError::Validation("Please enter a category name".to_string()));
    }
    let mut set = load_categories(dir);
    let labels = set.labels_mut(kind);
    if labels.iter().any(|l| l == label) {
        return Ok(AddOutcome::AlreadyExists);
    }
    labels.push(label.to_string());
    save_document(&dir.categories(), &set)?;
    info!("added {kind} category '{label}'");
    Ok(AddOutcome::Added)
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

/// owner -> category -> limit
type BudgetBook = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub category: String,
    pub limit: f64,
}

/// The owner's limits ordered by category label. Absent categories have no limit.
pub fn budgets_for(dir: &DataDir, owner: &str) -> Vec<Budget> {
    let book: BudgetBook = load_document(&dir.budgets());
    book.get(owner)
        .map(|limits| {
            limits
                .iter()
                .map(|(category, limit)| Budget {
                    category: category.clone(),
                    limit: *limit,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Overwrites any existing limit for the category.
pub fn set_budget(dir: &DataDir, owner: &str, category: &str, limit: f64) -> Result<()> {
    let category = category.trim();
    if category.is_empty() {
        return Err(TallyError::Validation("Please select a category".to_string()));
    }
    if !limit.is_finite() || limit < 0.0 {
        return Err(TallyError::Validation(format!("Invalid budget amount: {limit}")));
    }
    let mut book: BudgetBook = load_document(&dir.budgets());
    book.entry(owner.to_string())
        .or_default()
        .insert(category.to_string(), limit);
    save_document(&dir.budgets(), &book)?;
    info!("set budget for {owner}/{category} to {limit}");
    Ok(())
}

/// Returns whether the owner had any budgets.
pub fn clear_budgets(dir: &DataDir, owner: &str) -> Result<bool> {
    let mut book: BudgetBook = load_document(&dir.budgets());
    if book.remove(owner).is_none() {
        return Ok(false);
    }
    save_document(&dir.budgets(), &book)?;
    info!("cleared budgets for {owner}");
    Ok(true)
}
