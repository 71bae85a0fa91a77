use billsplit_domain::{Balances, Expense, HistoryEpoch, Transaction};

fn signed(amount: f64, tolerance: f64) -> String {
    let amount = if amount.abs() < tolerance { 0.0 } else { amount };
    format!("{amount:+.2}")
}

pub fn format_balances(balances: &Balances, tolerance: f64) -> String {
    if balances.is_empty() {
        return "Balances: (no people)".to_owned();
    }
    let mut lines = vec!["Balances:".to_owned()];
    lines.extend(
        balances
            .iter()
            .map(|(person, balance)| format!("  {person}: {}", signed(balance, tolerance))),
    );
    lines.join("\n")
}

pub fn format_settlement(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "Settlement: nothing to settle".to_owned();
    }
    let mut lines = vec![format!("Settlement ({} transfers):", transactions.len())];
    lines.extend(transactions.iter().map(|t| format!("  {t}")));
    lines.join("\n")
}

fn format_expense(expense: &Expense) -> String {
    let mut line = format!(
        "  {} {} paid {:.2}",
        expense.sequence(),
        expense.payer(),
        expense.amount()
    );
    if !expense.participants().is_empty() {
        let names: Vec<&str> = expense.participants().iter().map(|p| p.as_str()).collect();
        line.push_str(&format!(" for {}", names.join(", ")));
    }
    if !expense.memo().is_empty() {
        line.push_str(&format!(" ({})", expense.memo()));
    }
    line
}

pub fn format_epoch(epoch: &HistoryEpoch, balances: &Balances, tolerance: f64) -> String {
    let mut lines = vec![format!(
        "Epoch {} ({} expenses):",
        epoch.index(),
        epoch.expenses().len()
    )];
    lines.extend(epoch.expenses().iter().map(format_expense));
    lines.extend(
        balances
            .nonzero(tolerance)
            .map(|(person, balance)| format!("  = {person}: {}", signed(balance, tolerance))),
    );
    lines.join("\n")
}
