use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use shared::{AccountFormat, Category, MonthKey};
use std::path::PathBuf;
use std::sync::Arc;

use budget_dashboard::views::BudgetStatus;
use budget_dashboard::{
    logging, AggregationStore, ApiClient, DashboardConfig, DashboardSnapshot, FileTokenStore,
    NoticeLevel, SessionGate, SessionState, StatementFile,
};

const USAGE: &str = "usage: budget-dashboard <command>

commands:
  login <token>                    store a session token
  logout                           forget the session token
  show [YYYY-MM]                   totals, budget status and transactions
  months                           months with data, newest first
  budgets                          budget limits per category
  set-category <id> <category>     recategorize a transaction
  set-budget <category> <amount>   change one budget limit
  upload <file> <format>           import a bank statement";

#[derive(Debug, PartialEq)]
enum Command {
    Login(String),
    Logout,
    Show(Option<MonthKey>),
    Months,
    Budgets,
    SetCategory { id: i64, category: Category },
    SetBudget { category: Category, amount: Decimal },
    Upload { path: PathBuf, format: AccountFormat },
}

fn parse_command(args: &[String]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match args.as_slice() {
        ["login", token] => Command::Login(token.to_string()),
        ["logout"] => Command::Logout,
        ["show"] => Command::Show(None),
        ["show", month] => Command::Show(Some(MonthKey::parse(month)?)),
        ["months"] => Command::Months,
        ["budgets"] => Command::Budgets,
        ["set-category", id, category] => Command::SetCategory {
            id: id.parse().with_context(|| format!("Invalid transaction id: {}", id))?,
            category: category.parse()?,
        },
        ["set-budget", category, amount] => Command::SetBudget {
            category: category.parse()?,
            amount: amount
                .parse()
                .with_context(|| format!("Invalid amount: {}", amount))?,
        },
        ["upload", path, format] => Command::Upload {
            path: PathBuf::from(path),
            format: format.parse().map_err(|e: String| anyhow!(e))?,
        },
        _ => bail!("{}", USAGE),
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = DashboardConfig::load()?;
    logging::init(&config.log_filter);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;

    let session = Arc::new(SessionGate::new(Arc::new(FileTokenStore::new(config.token_path()))));
    let client = ApiClient::from_config(&config, session.clone())?;
    let store = AggregationStore::new(Arc::new(client), session);

    match command {
        Command::Login(token) => {
            store.login(&token)?;
            println!("Logged in.");
            return Ok(());
        }
        Command::Logout => {
            store.restore_session();
            store.logout()?;
            println!("Logged out.");
            return Ok(());
        }
        _ => {}
    }

    if store.restore_session() == SessionState::Unauthenticated {
        bail!("Not logged in. Run `budget-dashboard login <token>` first.");
    }

    match command {
        Command::Show(month) => {
            match month {
                Some(month) => store.select_month(month).await,
                None => store.refresh_all().await,
            }
            print_dashboard(&store.snapshot());
        }
        Command::Months => {
            store.refresh_all().await;
            let snapshot = store.snapshot();
            for month in &snapshot.available_months {
                let marker = if Some(month) == snapshot.current_month.as_ref() { "*" } else { " " };
                println!("{} {}", marker, month);
            }
        }
        Command::Budgets => {
            store.refresh_all().await;
            let snapshot = store.snapshot();
            for (category, limit) in snapshot.budgets.limits() {
                println!("{:<22} {:>10}", category, limit);
            }
        }
        Command::SetCategory { id, category } => {
            store.refresh_all().await;
            if store.transaction(id).is_none() {
                bail!("Transaction {} is not in the current month", id);
            }
            store.edit_transaction_category(id, category).await?;
            println!("Transaction {} moved to {}.", id, category);
        }
        Command::SetBudget { category, amount } => {
            store.refresh_all().await;
            store.begin_budget_edit();
            store.set_draft_budget(category, amount)?;
            let draft = store
                .budget_draft()
                .ok_or_else(|| anyhow!("Budget draft was discarded"))?;
            store.commit_budget_edit(draft).await?;
            println!("Budget for {} set to {}.", category, amount);
        }
        Command::Upload { path, format } => {
            let file = StatementFile::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let outcome = store.upload_statement(file, format).await?;
            println!(
                "Imported {} new of {} transactions.",
                outcome.new_transactions, outcome.total_transactions
            );
        }
        Command::Login(_) | Command::Logout => {}
    }

    if let Some(notice) = store.notice() {
        if notice.level != NoticeLevel::Info {
            eprintln!("{}", notice.message);
        }
    }
    if !store.snapshot().authenticated {
        bail!("Session expired.");
    }
    Ok(())
}

fn print_dashboard(snapshot: &DashboardSnapshot) {
    let Some(month) = &snapshot.current_month else {
        println!("No data yet. Upload a statement to get started.");
        return;
    };
    let totals = snapshot.totals();
    println!("Month: {}", month);
    println!(
        "Spent {} of {} ({} remaining)",
        totals.total_spent, totals.total_budget, totals.remaining
    );
    println!();

    for entry in &snapshot.views.bar {
        let status = snapshot
            .views
            .statuses
            .get(&entry.category)
            .copied()
            .unwrap_or(BudgetStatus::OnTrack);
        println!(
            "{} {:<16} {:>10} / {:<10} {}",
            status.icon(),
            entry.label,
            entry.spent,
            entry.budget,
            status.label()
        );
    }
    println!();

    for view in &snapshot.transactions {
        let tx = &view.transaction;
        println!(
            "{:>6}  {}  {:<32} {:>10}  {}",
            tx.id, tx.date, tx.description, tx.amount, tx.category
        );
    }
}
