use crate::report::{format_balances, format_epoch, format_settlement};
use billsplit_application::{BillSplit, HistoryError, SettlementError};
use billsplit_domain::{BalanceInconsistency, LedgerError};
use billsplit_parser::{ParseError, Statement, StatementWithLine, parse_script};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("line {line}: {source}")]
    Ledger { line: usize, source: LedgerError },
    #[error("line {line}: {source}")]
    Balances {
        line: usize,
        source: BalanceInconsistency,
    },
    #[error("line {line}: {source}")]
    Settlement {
        line: usize,
        source: SettlementError,
    },
    #[error("line {line}: {source}")]
    History { line: usize, source: HistoryError },
}

/// Executes a script against `bill_split` and returns the printed blocks.
///
/// A script without `BALANCES` or `SETTLE` ends with a settlement of the
/// current epoch.
pub fn run_script(source: &str, bill_split: &mut BillSplit<'_>) -> Result<Vec<String>, ScriptError> {
    let statements = parse_script(source)?;
    let tolerance = bill_split.config().eps_sum;
    let mut output = Vec::new();
    let mut reported = false;

    for StatementWithLine { line, statement } in statements {
        match statement {
            Statement::People(names) => {
                for name in names {
                    bill_split
                        .add_person(name)
                        .map_err(|source| ScriptError::Ledger { line, source })?;
                }
            }
            Statement::Expense(expense) => {
                let sequence = bill_split
                    .add_expense(
                        expense.payer,
                        expense.participants,
                        expense.amount,
                        expense.memo,
                    )
                    .map_err(|source| ScriptError::Ledger { line, source })?;
                tracing::debug!(line, %sequence, payer = expense.payer, "Expense recorded");
            }
            Statement::Balances => {
                let balances = bill_split
                    .compute_balances()
                    .map_err(|source| ScriptError::Balances { line, source })?;
                output.push(format_balances(&balances, tolerance));
                reported = true;
            }
            Statement::Settle => {
                let transactions = bill_split
                    .settle()
                    .map_err(|source| ScriptError::Settlement { line, source })?;
                output.push(format_settlement(&transactions));
                reported = true;
            }
            Statement::Reset => {
                bill_split.reset();
            }
            Statement::History => {
                if bill_split.history().is_empty() {
                    output.push("History: no archived epochs".to_owned());
                }
                for epoch in bill_split.history() {
                    let balances = bill_split
                        .epoch_balances(epoch.index())
                        .map_err(|source| ScriptError::History { line, source })?;
                    output.push(format_epoch(epoch, &balances, tolerance));
                }
            }
        }
    }

    if !reported {
        let line = source.lines().count();
        let transactions = bill_split
            .settle()
            .map_err(|source| ScriptError::Settlement { line, source })?;
        output.push(format_settlement(&transactions));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use billsplit_domain::InvalidExpense;
    use billsplit_settlement::{MilpSolver, SettlementConfig};
    use rstest::{fixture, rstest};

    static MILP: MilpSolver = MilpSolver;

    #[fixture]
    fn bill_split() -> BillSplit<'static> {
        BillSplit::new(&MILP, SettlementConfig::default()).expect("valid config")
    }

    #[rstest]
    fn prints_requested_reports(mut bill_split: BillSplit<'static>) {
        let script = "\
PEOPLE A, B, C
A PAID 90 FOR B, C : dinner
BALANCES
SETTLE
";
        let output = run_script(script, &mut bill_split).expect("runs");
        assert_eq!(
            output,
            vec![
                "Balances:\n  A: +60.00\n  B: -30.00\n  C: -30.00".to_owned(),
                "Settlement (2 transfers):\n  B -> A: 30.00\n  C -> A: 30.00".to_owned(),
            ]
        );
    }

    #[rstest]
    fn settles_at_end_without_explicit_report(mut bill_split: BillSplit<'static>) {
        let output = run_script("PEOPLE A, B\nA paid 50 for B\n", &mut bill_split).expect("runs");
        assert_eq!(output, vec!["Settlement (1 transfers):\n  B -> A: 25.00".to_owned()]);
    }

    #[rstest]
    fn history_lists_archived_epochs(mut bill_split: BillSplit<'static>) {
        let script = "\
PEOPLE A, B
A PAID 50 FOR B : taxi
RESET
HISTORY
SETTLE
";
        let output = run_script(script, &mut bill_split).expect("runs");
        assert_eq!(
            output,
            vec![
                "Epoch 0 (1 expenses):\n  #0 A paid 50.00 for B (taxi)\n  = A: +25.00\n  = B: -25.00"
                    .to_owned(),
                "Settlement: nothing to settle".to_owned(),
            ]
        );
    }

    #[rstest]
    fn ledger_errors_carry_the_line(mut bill_split: BillSplit<'static>) {
        let script = "PEOPLE A, B\n\nA PAID 10 FOR Z\n";
        assert_eq!(
            run_script(script, &mut bill_split),
            Err(ScriptError::Ledger {
                line: 3,
                source: LedgerError::InvalidExpense(InvalidExpense::UnknownParticipant(
                    "Z".to_owned()
                )),
            })
        );
    }

    #[rstest]
    fn syntax_errors_stop_before_execution(mut bill_split: BillSplit<'static>) {
        let result = run_script("PEOPLE A, B\nA PAID lots\n", &mut bill_split);
        assert!(matches!(result, Err(ScriptError::Parse(_))));
        assert!(bill_split.ledger().roster().is_empty());
    }
}
