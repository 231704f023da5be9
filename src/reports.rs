//! Aggregations over a snapshot of one owner's records.
//!
//! Every function here is pure: the same snapshot always produces the same
//! result, and nothing is cached between calls.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::catalog::Budget;
use crate::error::TallyError;
use crate::models::{Kind, StoredRecord, DATE_FORMAT};

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

pub fn totals(records: &[StoredRecord]) -> Totals {
    let (income, expense) = records.iter().fold((0.0, 0.0), |(inc, exp), r| match r.tx.kind {
        Kind::Income => (inc + r.tx.amount, exp),
        Kind::Expense => (inc, exp + r.tx.amount),
    });
    Totals {
        income,
        expense,
        balance: income - expense,
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindFilter {
    #[default]
    All,
    Income,
    Expense,
}

impl KindFilter {
    fn accepts(&self, kind: Kind) -> bool {
        match self {
            Self::All => true,
            Self::Income => kind == Kind::Income,
            Self::Expense => kind == Kind::Expense,
        }
    }
}

impl FromStr for KindFilter {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Ok(match s.parse::<Kind>()? {
            Kind::Income => Self::Income,
            Kind::Expense => Self::Expense,
        })
    }
}

/// Empty fields do not constrain the view.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Case-insensitive substring of the description.
    pub text: Option<String>,
    pub kind: KindFilter,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Filter {
    /// True when no criterion narrows the view.
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
            && self.kind == KindFilter::All
            && self.from.is_none()
            && self.to.is_none()
    }

    /// Whether `record` belongs in the filtered view. Unparseable dates never do.
    pub fn accepts(&self, record: &StoredRecord) -> bool {
        record.tx.parsed_date().is_some_and(|d| self.matches(record, d))
    }

    fn matches(&self, record: &StoredRecord, date: NaiveDate) -> bool {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            if !record.tx.description.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        if !self.kind.accepts(record.tx.kind) {
            return false;
        }
        if self.from.is_some_and(|from| date < from) {
            return false;
        }
        if self.to.is_some_and(|to| date > to) {
            return false;
        }
        true
    }
}

/// Matching records, newest date first; equal dates keep file order. Records with
/// an unparseable date never appear.
pub fn filter_view<'a>(records: &'a [StoredRecord], filter: &Filter) -> Vec<&'a StoredRecord> {
    let mut view: Vec<(NaiveDate, &StoredRecord)> = records
        .iter()
        .filter_map(|r| r.tx.parsed_date().map(|d| (d, r)))
        .filter(|(d, r)| filter.matches(r, *d))
        .collect();
    view.sort_by(|a, b| b.0.cmp(&a.0));
    view.into_iter().map(|(_, r)| r).collect()
}

/// The `n` newest records by date column, descending, file order on ties.
pub fn recent(records: &[StoredRecord], n: usize) -> Vec<&StoredRecord> {
    let mut sorted: Vec<&StoredRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.tx.date.cmp(&a.tx.date));
    sorted.truncate(n);
    sorted
}

// ---------------------------------------------------------------------------
// Category breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
    pub count: usize,
    /// Percent of all expense.
    pub share: f64,
}

/// Expense totals per category, in the order categories are first encountered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBreakdown {
    pub items: Vec<CategoryTotal>,
    pub total: f64,
}

impl CategoryBreakdown {
    pub fn get(&self, category: &str) -> Option<f64> {
        self.items.iter().find(|i| i.name == category).map(|i| i.total)
    }

    /// Largest total; the first-encountered category wins a tie.
    pub fn top(&self) -> Option<&CategoryTotal> {
        self.items.iter().fold(None, |best: Option<&CategoryTotal>, item| match best {
            Some(b) if b.total >= item.total => Some(b),
            _ => Some(item),
        })
    }
}

pub fn category_breakdown(records: &[StoredRecord]) -> CategoryBreakdown {
    let mut items: Vec<CategoryTotal> = Vec::new();
    for r in records.iter().filter(|r| r.tx.kind == Kind::Expense) {
        match items.iter_mut().find(|i| i.name == r.tx.category) {
            Some(item) => {
                item.total += r.tx.amount;
                item.count += 1;
            }
            None => items.push(CategoryTotal {
                name: r.tx.category.clone(),
                total: r.tx.amount,
                count: 1,
                share: 0.0,
            }),
        }
    }
    let total: f64 = items.iter().map(|i| i.total).sum();
    for item in &mut items {
        item.share = if total > 0.0 { item.total / total * 100.0 } else { 0.0 };
    }
    CategoryBreakdown { items, total }
}

// ---------------------------------------------------------------------------
// Quick stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct QuickStats {
    pub count: usize,
    pub average_expense: f64,
    pub top_category: Option<String>,
    pub month_expense: f64,
}

/// `today` decides which calendar month is "current".
pub fn quick_stats(records: &[StoredRecord], today: NaiveDate) -> QuickStats {
    let expenses: Vec<&StoredRecord> = records.iter().filter(|r| r.tx.kind == Kind::Expense).collect();
    let total_expense: f64 = expenses.iter().map(|r| r.tx.amount).sum();
    let average_expense = if expenses.is_empty() {
        0.0
    } else {
        total_expense / expenses.len() as f64
    };
    let month_expense = expenses
        .iter()
        .filter(|r| {
            r.tx.parsed_date()
                .is_some_and(|d| d.year() == today.year() && d.month() == today.month())
        })
        .map(|r| r.tx.amount)
        .sum();

    QuickStats {
        count: records.len(),
        average_expense,
        top_category: category_breakdown(records).top().map(|t| t.name.clone()),
        month_expense,
    }
}

// ---------------------------------------------------------------------------
// Budget performance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Ok,
    Warning,
    Over,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetLine {
    pub category: String,
    pub limit: f64,
    pub actual: f64,
}

impl BudgetLine {
    /// Unclamped; may exceed 100. Zero when no positive limit is set.
    pub fn percentage(&self) -> f64 {
        if self.limit > 0.0 {
            self.actual / self.limit * 100.0
        } else {
            0.0
        }
    }

    /// [`percentage`](Self::percentage) capped at 100 for progress bars.
    pub fn display_percentage(&self) -> f64 {
        self.percentage().min(100.0)
    }

    pub fn overage(&self) -> f64 {
        (self.actual - self.limit).max(0.0)
    }

    pub fn remaining(&self) -> f64 {
        (self.limit - self.actual).max(0.0)
    }

    pub fn status(&self) -> BudgetStatus {
        let pct = self.percentage();
        if pct > 100.0 {
            BudgetStatus::Over
        } else if pct > 80.0 {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Ok
        }
    }
}

pub fn budget_performance(breakdown: &CategoryBreakdown, budgets: &[Budget]) -> Vec<BudgetLine> {
    budgets
        .iter()
        .map(|b| BudgetLine {
            category: b.category.clone(),
            limit: b.limit,
            actual: breakdown.get(&b.category).unwrap_or(0.0),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTotals {
    pub period: String,
    pub income: f64,
    pub expense: f64,
}

impl PeriodTotals {
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

fn series_by<K, F>(records: &[StoredRecord], key: F, label: impl Fn(&K) -> String) -> Vec<PeriodTotals>
where
    K: Ord,
    F: Fn(NaiveDate) -> K,
{
    let mut buckets: BTreeMap<K, (f64, f64)> = BTreeMap::new();
    for r in records {
        let Some(date) = r.tx.parsed_date() else {
            continue;
        };
        let entry = buckets.entry(key(date)).or_insert((0.0, 0.0));
        match r.tx.kind {
            Kind::Income => entry.0 += r.tx.amount,
            Kind::Expense => entry.1 += r.tx.amount,
        }
    }
    buckets
        .into_iter()
        .map(|(k, (income, expense))| PeriodTotals {
            period: label(&k),
            income,
            expense,
        })
        .collect()
}

/// One entry per `YYYY-MM` with activity, oldest first.
pub fn monthly_series(records: &[StoredRecord]) -> Vec<PeriodTotals> {
    series_by(records, |d| (d.year(), d.month()), |(y, m)| format!("{y:04}-{m:02}"))
}

/// One entry per calendar day with activity, oldest first.
pub fn daily_series(records: &[StoredRecord]) -> Vec<PeriodTotals> {
    series_by(records, |d| d, |d| d.format(DATE_FORMAT).to_string())
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Progress towards the savings goal, 0..=100.
pub fn savings_progress(balance: f64, goal: f64) -> f64 {
    if goal > 0.0 {
        (balance / goal * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub const RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub totals: Totals,
    pub stats: QuickStats,
    pub recent: Vec<StoredRecord>,
    pub budgets: Vec<BudgetLine>,
    pub savings_progress: f64,
}

pub fn dashboard(records: &[StoredRecord], budgets: &[Budget], today: NaiveDate, savings_goal: f64) -> Dashboard {
    let totals = totals(records);
    Dashboard {
        totals,
        stats: quick_stats(records, today),
        recent: recent(records, RECENT_LIMIT).into_iter().cloned().collect(),
        budgets: budget_performance(&category_breakdown(records), budgets),
        savings_progress: savings_progress(totals.balance, savings_goal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordId, Transaction};

    fn rec(date: &str, kind: Kind, category: &str, description: &str, amount: f64) -> StoredRecord {
        let tx = Transaction {
            date: date.to_string(),
            kind,
            category: category.to_string(),
            description: description.to_string(),
            amount,
            owner: "demo".to_string(),
            notes: String::new(),
        };
        StoredRecord {
            id: RecordId::new(&tx, 0),
            line: 0,
            tx,
        }
    }

    fn scenario() -> Vec<StoredRecord> {
        vec![
            rec("2024-01-15", Kind::Income, "Salary", "pay", 3500.0),
            rec("2024-01-16", Kind::Expense, "Food", "grocery", 85.50),
        ]
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_scenario_totals_and_stats() {
        let records = scenario();
        let t = totals(&records);
        assert_close(t.income, 3500.0);
        assert_close(t.expense, 85.5);
        assert_close(t.balance, 3414.5);

        let stats = quick_stats(&records, date("2024-01-31"));
        assert_eq!(stats.count, 2);
        assert_close(stats.average_expense, 85.5);
        assert_eq!(stats.top_category.as_deref(), Some("Food"));
        assert_close(stats.month_expense, 85.5);
    }

    #[test]
    fn test_appended_amount_recovered_in_totals() {
        for amount in [0.0, 0.01, 85.5, 3500.0, 1e9] {
            let mut records = scenario();
            let before = totals(&records);
            records.push(rec("2024-02-01", Kind::Income, "Gift", "x", amount));
            assert_close(totals(&records).income - before.income, amount);
            records.push(rec("2024-02-01", Kind::Expense, "Food", "y", amount));
            assert_close(totals(&records).expense - before.expense, amount);
        }
    }

    #[test]
    fn test_average_expense_without_expenses_is_zero() {
        let records = vec![rec("2024-01-15", Kind::Income, "Salary", "pay", 3500.0)];
        let stats = quick_stats(&records, date("2024-01-31"));
        assert_eq!(stats.average_expense, 0.0);
        assert_eq!(stats.top_category, None);
        assert_eq!(quick_stats(&[], date("2024-01-31")).average_expense, 0.0);
    }

    #[test]
    fn test_top_category_tie_goes_to_first_encountered() {
        let records = vec![
            rec("2024-01-01", Kind::Expense, "A", "a", 50.0),
            rec("2024-01-02", Kind::Expense, "B", "b", 50.0),
        ];
        assert_eq!(quick_stats(&records, date("2024-01-31")).top_category.as_deref(), Some("A"));
    }

    #[test]
    fn test_month_expense_only_counts_current_month() {
        let records = vec![
            rec("2024-01-20", Kind::Expense, "Food", "jan", 10.0),
            rec("2024-02-03", Kind::Expense, "Food", "feb", 20.0),
            rec("2023-02-03", Kind::Expense, "Food", "last year", 40.0),
            rec("02/05/2024", Kind::Expense, "Food", "bad date", 80.0),
            rec("2024-02-04", Kind::Income, "Salary", "pay", 1000.0),
        ];
        let stats = quick_stats(&records, date("2024-02-15"));
        assert_close(stats.month_expense, 20.0);
        assert_eq!(stats.count, 5);
    }

    #[test]
    fn test_filter_date_range_is_inclusive() {
        let records = vec![
            rec("2024-01-01", Kind::Expense, "Food", "a", 1.0),
            rec("2024-01-05", Kind::Expense, "Food", "b", 1.0),
            rec("2024-01-10", Kind::Expense, "Food", "c", 1.0),
            rec("2024-01-11", Kind::Expense, "Food", "d", 1.0),
        ];
        let filter = Filter {
            from: Some(date("2024-01-05")),
            to: Some(date("2024-01-10")),
            ..Filter::default()
        };
        let view: Vec<&str> = filter_view(&records, &filter)
            .iter()
            .map(|r| r.tx.description.as_str())
            .collect();
        assert_eq!(view, vec!["c", "b"]);
    }

    #[test]
    fn test_filter_without_bounds_returns_everything_sorted() {
        let records = vec![
            rec("2024-01-01", Kind::Expense, "Food", "a", 1.0),
            rec("2024-01-03", Kind::Income, "Salary", "b", 1.0),
            rec("2024-01-02", Kind::Expense, "Food", "c", 1.0),
        ];
        let view: Vec<&str> = filter_view(&records, &Filter::default())
            .iter()
            .map(|r| r.tx.description.as_str())
            .collect();
        assert_eq!(view, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_filter_ties_keep_file_order() {
        let records = vec![
            rec("2024-01-02", Kind::Expense, "Food", "first", 1.0),
            rec("2024-01-01", Kind::Expense, "Food", "older", 1.0),
            rec("2024-01-02", Kind::Expense, "Food", "second", 1.0),
        ];
        let view: Vec<&str> = filter_view(&records, &Filter::default())
            .iter()
            .map(|r| r.tx.description.as_str())
            .collect();
        assert_eq!(view, vec!["first", "second", "older"]);
    }

    #[test]
    fn test_filter_text_and_kind() {
        let records = vec![
            rec("2024-01-01", Kind::Expense, "Food", "Grocery Store", 1.0),
            rec("2024-01-02", Kind::Income, "Gift", "grocery refund", 1.0),
            rec("2024-01-03", Kind::Expense, "Fuel", "gas", 1.0),
        ];
        let filter = Filter {
            text: Some("GROCERY".to_string()),
            ..Filter::default()
        };
        assert_eq!(filter_view(&records, &filter).len(), 2);

        let filter = Filter {
            text: Some("grocery".to_string()),
            kind: KindFilter::Expense,
            ..Filter::default()
        };
        let view = filter_view(&records, &filter);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].tx.description, "Grocery Store");
    }

    #[test]
    fn test_filter_excludes_unparseable_dates() {
        let records = vec![
            rec("2024-01-01", Kind::Expense, "Food", "ok", 1.0),
            rec("January 2", Kind::Expense, "Food", "bad", 1.0),
        ];
        let view = filter_view(&records, &Filter::default());
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].tx.description, "ok");
        assert_close(totals(&records).expense, 2.0);
    }

    #[test]
    fn test_kind_filter_parse() {
        assert_eq!("All".parse::<KindFilter>().unwrap(), KindFilter::All);
        assert_eq!("income".parse::<KindFilter>().unwrap(), KindFilter::Income);
        assert!("both".parse::<KindFilter>().is_err());
    }

    #[test]
    fn test_category_breakdown_expenses_only() {
        let records = vec![
            rec("2024-01-01", Kind::Expense, "Food", "a", 30.0),
            rec("2024-01-02", Kind::Income, "Salary", "b", 1000.0),
            rec("2024-01-03", Kind::Expense, "Fuel", "c", 10.0),
            rec("2024-01-04", Kind::Expense, "Food", "d", 60.0),
        ];
        let breakdown = category_breakdown(&records);
        assert_eq!(breakdown.items.len(), 2);
        assert_eq!(breakdown.items[0].name, "Food");
        assert_close(breakdown.items[0].total, 90.0);
        assert_eq!(breakdown.items[0].count, 2);
        assert_close(breakdown.items[0].share, 90.0);
        assert_eq!(breakdown.get("Salary"), None);
        assert_close(breakdown.total, 100.0);
    }

    #[test]
    fn test_budget_scenario_clamps_only_for_display() {
        let breakdown = category_breakdown(&scenario());
        let lines = budget_performance(
            &breakdown,
            &[Budget {
                category: "Food".to_string(),
                limit: 400.0,
            }],
        );
        assert_eq!(lines.len(), 1);
        assert_close(lines[0].percentage(), 21.375);
        assert_eq!(crate::fmt::percent(lines[0].display_percentage()), "21.4%");
        assert_close(lines[0].actual, 85.5);
        assert_eq!(lines[0].status(), BudgetStatus::Ok);
    }

    #[test]
    fn test_budget_over_limit_keeps_raw_actual() {
        let records = vec![rec("2024-01-01", Kind::Expense, "Fun", "a", 150.0)];
        let lines = budget_performance(
            &category_breakdown(&records),
            &[
                Budget { category: "Fun".to_string(), limit: 100.0 },
                Budget { category: "Rent".to_string(), limit: 900.0 },
                Budget { category: "Misc".to_string(), limit: 0.0 },
            ],
        );
        assert_close(lines[0].percentage(), 150.0);
        assert_close(lines[0].display_percentage(), 100.0);
        assert_close(lines[0].actual, 150.0);
        assert_close(lines[0].overage(), 50.0);
        assert_eq!(lines[0].status(), BudgetStatus::Over);
        assert_close(lines[1].actual, 0.0);
        assert_close(lines[1].remaining(), 900.0);
        assert_eq!(lines[2].percentage(), 0.0);
    }

    #[test]
    fn test_budget_warning_above_eighty_percent() {
        let line = BudgetLine {
            category: "Food".to_string(),
            limit: 100.0,
            actual: 85.0,
        };
        assert_eq!(line.status(), BudgetStatus::Warning);
    }

    #[test]
    fn test_monthly_series_omits_empty_months() {
        let records = vec![
            rec("2024-03-02", Kind::Expense, "Food", "a", 10.0),
            rec("2024-01-15", Kind::Income, "Salary", "b", 100.0),
            rec("2024-01-20", Kind::Expense, "Food", "c", 5.0),
            rec("not a date", Kind::Expense, "Food", "d", 99.0),
        ];
        let series = monthly_series(&records);
        assert_eq!(
            series,
            vec![
                PeriodTotals { period: "2024-01".to_string(), income: 100.0, expense: 5.0 },
                PeriodTotals { period: "2024-03".to_string(), income: 0.0, expense: 10.0 },
            ]
        );
        assert_close(series[0].net(), 95.0);
    }

    #[test]
    fn test_daily_series_groups_by_exact_date() {
        let records = vec![
            rec("2024-01-16", Kind::Expense, "Food", "a", 10.0),
            rec("2024-01-15", Kind::Income, "Salary", "b", 100.0),
            rec("2024-01-16", Kind::Expense, "Fuel", "c", 5.0),
        ];
        let series = daily_series(&records);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].period, "2024-01-15");
        assert_close(series[1].expense, 15.0);
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let records: Vec<StoredRecord> = (1..=12)
            .map(|d| rec(&format!("2024-01-{d:02}"), Kind::Expense, "Food", &d.to_string(), 1.0))
            .collect();
        let latest = recent(&records, RECENT_LIMIT);
        assert_eq!(latest.len(), 10);
        assert_eq!(latest[0].tx.description, "12");
        assert_eq!(latest[9].tx.description, "3");
    }

    #[test]
    fn test_savings_progress_bounds() {
        assert_close(savings_progress(500.0, 1000.0), 50.0);
        assert_close(savings_progress(5000.0, 1000.0), 100.0);
        assert_close(savings_progress(-20.0, 1000.0), 0.0);
        assert_close(savings_progress(500.0, 0.0), 0.0);
    }

    #[test]
    fn test_dashboard_is_recomputable() {
        let records = scenario();
        let budgets = vec![Budget { category: "Food".to_string(), limit: 400.0 }];
        let a = dashboard(&records, &budgets, date("2024-01-31"), 1000.0);
        let b = dashboard(&records, &budgets, date("2024-01-31"), 1000.0);
        assert_eq!(a.totals, b.totals);
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.budgets, b.budgets);
        assert_eq!(a.recent.len(), 2);
        assert_close(a.savings_progress, 100.0);
    }
}
