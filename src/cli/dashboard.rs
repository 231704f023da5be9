use std::time::Duration;

use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use crate::cli::login_session;
use crate::cli::transactions::transactions_table;
use crate::error::Result;
use crate::fmt::{bar, money_in, percent};
use crate::reports::{BudgetLine, BudgetStatus, Dashboard};
use crate::session::today;

const BAR_WIDTH: usize = 20;

pub(crate) fn status_color(status: BudgetStatus) -> Color {
    match status {
        BudgetStatus::Ok => Color::Green,
        BudgetStatus::Warning => Color::Yellow,
        BudgetStatus::Over => Color::Red,
    }
}

pub(crate) fn budget_table(lines: &[BudgetLine], currency: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Limit", "Spent", "Remaining", "Used", "", "Over"]);
    for line in lines {
        let color = status_color(line.status());
        let over = if line.overage() > 0.0 {
            money_in(line.overage(), currency)
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(&line.category),
            Cell::new(money_in(line.limit, currency)),
            Cell::new(money_in(line.actual, currency)),
            Cell::new(money_in(line.remaining(), currency)),
            Cell::new(percent(line.display_percentage())).fg(color),
            Cell::new(bar(line.display_percentage(), 100.0, BAR_WIDTH)).fg(color),
            Cell::new(over).fg(Color::Red),
        ]);
    }
    table
}

pub(crate) fn render(user: &str, dash: &Dashboard, currency: &str) -> String {
    let balance = money_in(dash.totals.balance, currency);
    let balance = if dash.totals.balance < 0.0 {
        balance.red().bold()
    } else {
        balance.green().bold()
    };

    let mut out = String::new();
    out.push_str(&format!("{} for {}\n\n", "Dashboard".bold(), user.bold()));
    out.push_str(&format!("Income:         {}\n", money_in(dash.totals.income, currency).green()));
    out.push_str(&format!("Expenses:       {}\n", money_in(dash.totals.expense, currency).red()));
    out.push_str(&format!("Balance:        {balance}\n"));
    out.push_str(&format!("Savings goal:   {}\n\n", percent(dash.savings_progress)));

    out.push_str(&format!("Transactions:   {}\n", dash.stats.count));
    out.push_str(&format!(
        "Avg expense:    {}\n",
        money_in(dash.stats.average_expense, currency)
    ));
    out.push_str(&format!(
        "Top category:   {}\n",
        dash.stats.top_category.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "This month:     {}\n",
        money_in(dash.stats.month_expense, currency)
    ));

    if !dash.budgets.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Budgets".bold(), budget_table(&dash.budgets, currency)));
    }
    if dash.recent.is_empty() {
        out.push_str("\nNo transactions yet. Add one with `tally add`.\n");
    } else {
        out.push_str(&format!(
            "\n{}\n{}\n",
            "Recent transactions".bold(),
            transactions_table(&dash.recent, currency)
        ));
    }
    out
}

pub fn run(user: Option<String>, watch: bool, interval: Option<u64>) -> Result<()> {
    let mut session = login_session(user)?;
    let prefs = session.preferences();
    let currency = prefs.currency.clone();
    let name = session.user().to_string();

    print!("{}", render(&name, &session.dashboard(today())?, &currency));
    if !watch {
        return Ok(());
    }

    let secs = interval.unwrap_or(prefs.refresh_secs).max(1);
    session.start_auto_refresh(
        Duration::from_secs(secs),
        Box::new(move |result| match result {
            Ok(dash) => {
                // Clear the screen and redraw from the top.
                print!("\x1b[2J\x1b[H{}", render(&name, &dash, &currency));
                println!("\nRefreshing every {secs}s. Press Enter to stop.");
            }
            Err(e) => eprintln!("Error: {e}"),
        }),
    )?;
    println!("\nRefreshing every {secs}s. Press Enter to stop.");

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    session.stop_auto_refresh();
    Ok(())
}
