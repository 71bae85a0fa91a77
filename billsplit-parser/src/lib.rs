#![warn(clippy::uninlined_format_args)]

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till, take_while1},
    character::complete::{char, space1},
    combinator::{eof, opt, recognize},
    multi::{many0, separated_list1},
    number::complete::double,
    sequence::preceded,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseLine<'a> {
    pub payer: &'a str,
    pub amount: f64,
    pub participants: Vec<&'a str>,
    pub memo: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    People(Vec<&'a str>),
    Expense(ExpenseLine<'a>),
    Balances,
    Settle,
    Reset,
    History,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementWithLine<'a> {
    pub line: usize,
    pub statement: Statement<'a>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}: {detail}")]
    Syntax { line: usize, detail: String },
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.').parse(input)
}

// Horizontal whitespace and `#` comments.
fn sp(input: &str) -> IResult<&str, &str> {
    fn line_comment(input: &str) -> IResult<&str, &str> {
        recognize((tag("#"), take_till(|c| c == '\n'))).parse(input)
    }

    recognize(many0(alt((space1, line_comment)))).parse(input)
}

fn name_list(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1((sp, char(','), sp), identifier).parse(input)
}

// PEOPLE Alice, Bob   |   MEMBERS := Alice, Bob
fn people(input: &str) -> IResult<&str, Vec<&str>> {
    (
        alt((tag_no_case("people"), tag_no_case("members"))),
        sp,
        opt(alt((tag(":="), tag(":")))),
        sp,
        name_list,
    )
        .map(|(_, _, _, _, names)| names)
        .parse(input)
}

fn memo(input: &str) -> IResult<&str, &str> {
    preceded((sp, char(':')), take_till(|c| c == '#'))
        .map(str::trim)
        .parse(input)
}

// {payer} PAID {amount} [FOR {participants}] [: memo]
fn expense(input: &str) -> IResult<&str, ExpenseLine<'_>> {
    (
        identifier,
        sp,
        tag_no_case("paid"),
        sp,
        double,
        opt(preceded((sp, tag_no_case("for"), sp), name_list)),
        opt(memo),
    )
        .map(|(payer, _, _, _, amount, participants, memo)| ExpenseLine {
            payer,
            amount,
            participants: participants.unwrap_or_default(),
            memo: memo.unwrap_or_default(),
        })
        .parse(input)
}

fn command(input: &str) -> IResult<&str, Statement<'_>> {
    let keyword = alt((
        tag_no_case("balances").map(|_| Statement::Balances),
        tag_no_case("settle").map(|_| Statement::Settle),
        tag_no_case("reset").map(|_| Statement::Reset),
        tag_no_case("history").map(|_| Statement::History),
    ));
    (keyword, sp, eof)
        .map(|(statement, _, _)| statement)
        .parse(input)
}

fn statement(input: &str) -> IResult<&str, Statement<'_>> {
    alt((
        expense.map(Statement::Expense),
        people.map(Statement::People),
        command,
    ))
    .parse(input)
}

fn describe(err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => unexpected_near(e.input),
        nom::Err::Incomplete(_) => "incomplete input".to_owned(),
    }
}

fn unexpected_near(input: &str) -> String {
    let snippet: String = input.trim().chars().take(24).collect();
    if snippet.is_empty() {
        "unexpected end of line".to_owned()
    } else {
        format!("unexpected input near '{snippet}'")
    }
}

/// Parses a ledger script, one statement per line.
pub fn parse_script(input: &str) -> Result<Vec<StatementWithLine<'_>>, ParseError> {
    let mut statements = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let syntax = |detail| ParseError::Syntax {
            line: line_no,
            detail,
        };

        let (rest, _) = sp(line).map_err(|e| syntax(describe(e)))?;
        if rest.trim().is_empty() {
            continue;
        }
        let (rest, statement) = statement(rest).map_err(|e| syntax(describe(e)))?;
        let (rest, _) = sp(rest).map_err(|e| syntax(describe(e)))?;
        if !rest.trim().is_empty() {
            return Err(syntax(unexpected_near(rest)));
        }
        statements.push(StatementWithLine {
            line: line_no,
            statement,
        });
    }

    Ok(statements)
}
