//! Line-oriented front end for the fact board.
//!
//! Every line starting with `#` is a command; the board is printed after each
//! change. Output lines are tagged (`[FACTS]`, `[CREATED]`, `[VOTED]`,
//! `[NOTICE]`, `[ERROR]`) so scripts can follow along.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use til_core::{
    BoardState, Category, CategoryFilter, Fact, FactId, FactStore, FetchOutcome, SyncController,
    SyncError, VoteField, MAX_TEXT_CHARS,
};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show(CategoryFilter),
    Refresh,
    List,
    ToggleForm,
    Text(String),
    Source(String),
    Category(String),
    Post,
    Share {
        category: String,
        source: String,
        text: String,
    },
    Vote(FactId, VoteField),
    Dismiss,
    Help,
    Quit,
}

impl Command {
    /// Parse one line. Returns a usage message when the line is malformed.
    pub fn parse(line: &str) -> Result<Self, String> {
        let Some(rest) = line.strip_prefix('#') else {
            return Err("Commands start with '#'. Type #help for help.".to_string());
        };
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "all" => Ok(Command::Show(CategoryFilter::All)),
            "cat" => args
                .parse::<CategoryFilter>()
                .map(Command::Show)
                .map_err(|e| format!("{e}. Usage: #cat <category>")),
            "refresh" => Ok(Command::Refresh),
            "list" => Ok(Command::List),
            "form" => Ok(Command::ToggleForm),
            "text" => Ok(Command::Text(args.to_string())),
            "source" => Ok(Command::Source(args.to_string())),
            "category" => Ok(Command::Category(args.to_string())),
            "post" => Ok(Command::Post),
            "share" => {
                let mut parts = args.splitn(3, char::is_whitespace);
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(category), Some(source), Some(text)) if !category.is_empty() => {
                        Ok(Command::Share {
                            category: category.to_string(),
                            source: source.to_string(),
                            text: text.trim().to_string(),
                        })
                    }
                    _ => Err("Usage: #share <category> <source> <text...>".to_string()),
                }
            }
            "vote" => {
                let usage = "Usage: #vote <id> <interesting|mindblowing|false>";
                let mut parts = args.split_whitespace();
                let id = parts
                    .next()
                    .and_then(|s| s.parse::<FactId>().ok())
                    .ok_or_else(|| usage.to_string())?;
                let field = parts
                    .next()
                    .and_then(|s| s.parse::<VoteField>().ok())
                    .ok_or_else(|| usage.to_string())?;
                Ok(Command::Vote(id, field))
            }
            "dismiss" => Ok(Command::Dismiss),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err("Unknown command. Type #help for help.".to_string()),
        }
    }
}

/// Run the board against `store` until stdin closes or `#quit`.
pub async fn run_headless(store: Arc<dyn FactStore>) -> Result<(), SyncError> {
    let board = SyncController::new(store);

    println!("=== Today I Learned ===");
    print_help();
    println!();

    report_fetch(&board, board.refresh().await);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match Command::parse(line) {
            Ok(c) => c,
            Err(usage) => {
                println!("[ERROR] {usage}");
                stdout.flush().ok();
                continue;
            }
        };

        match command {
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Show(filter) => report_fetch(&board, board.change_category(filter).await),
            Command::Refresh => report_fetch(&board, board.refresh().await),
            Command::List => print_board(&board.snapshot()),
            Command::ToggleForm => {
                if board.toggle_form() {
                    print_form(&board.snapshot());
                } else {
                    println!("[FORM] closed");
                }
            }
            Command::Text(text) => edit(&board, |d| d.text = text),
            Command::Source(source) => edit(&board, |d| d.source = source),
            Command::Category(category) => edit(&board, |d| d.category = category),
            Command::Post => report_created(&board, board.submit().await),
            Command::Share {
                category,
                source,
                text,
            } => report_created(&board, board.submit_fact(text, source, category).await),
            Command::Vote(id, field) => match board.cast_vote(id, field).await {
                Ok(fact) => {
                    println!("[VOTED] {} {field}", fact.id);
                    println!("{}", render_fact(&fact));
                }
                Err(e) => report_error(&board, &e),
            },
            Command::Dismiss => {
                board.dismiss_notice();
                println!("[OK] notice dismissed");
            }
            Command::Help => print_help(),
        }
        stdout.flush().ok();
    }

    Ok(())
}

fn edit(board: &SyncController, change: impl FnOnce(&mut til_core::FactDraft)) {
    board.open_form();
    if board.edit_draft(change) {
        print_form(&board.snapshot());
    } else {
        println!("[ERROR] {}", SyncError::SubmissionInFlight);
    }
}

fn report_fetch(board: &SyncController, result: Result<FetchOutcome, SyncError>) {
    match result {
        Ok(FetchOutcome::Applied { .. }) => print_board(&board.snapshot()),
        Ok(FetchOutcome::Superseded) => {}
        Err(e) => report_error(board, &e),
    }
}

fn report_created(board: &SyncController, result: Result<Fact, SyncError>) {
    match result {
        Ok(fact) => {
            println!("[CREATED] {}", fact.id);
            println!("{}", render_fact(&fact));
            let snapshot = board.snapshot();
            if !snapshot.facts().contains(fact.id) {
                println!(
                    "  (not shown under {}; switch category to see it)",
                    snapshot.facts().listed_category()
                );
            }
        }
        Err(SyncError::Invalid(e)) => {
            println!("[ERROR] {} field: {e}", e.field());
            print_form(&board.snapshot());
        }
        Err(e) => report_error(board, &e),
    }
}

fn report_error(board: &SyncController, err: &SyncError) {
    match board.snapshot().notice() {
        Some(notice) if matches!(err, SyncError::Store(_)) => println!("[NOTICE] {notice}"),
        _ => println!("[ERROR] {err}"),
    }
}

/// One fact as a single line.
pub fn render_fact(fact: &Fact) -> String {
    let disputed = if fact.is_disputed() {
        "[⛔️ DISPUTED] "
    } else {
        ""
    };
    format!(
        "  #{:<5} {disputed}{} ({})\n         [{}] {} {}  {} {}  {} {}",
        fact.id.get(),
        fact.text,
        fact.source,
        fact.category,
        VoteField::Interesting.emoji(),
        fact.votes_interesting,
        VoteField::Mindblowing.emoji(),
        fact.votes_mindblowing,
        VoteField::False.emoji(),
        fact.votes_false,
    )
}

/// The whole board: heading, facts and the summary line.
pub fn render_board(board: &BoardState) -> String {
    let facts = board.facts();
    let mut out = format!("[FACTS] {}", facts.listed_category());
    if facts.is_loading() {
        out.push_str(&format!(" (loading {})", facts.active_category()));
    }
    for fact in facts.items() {
        out.push('\n');
        out.push_str(&render_fact(fact));
    }
    out.push('\n');
    out.push_str(&facts.summary());
    if let Some(notice) = board.notice() {
        out.push_str(&format!("\n[NOTICE] {notice}"));
    }
    out
}

fn print_board(board: &BoardState) {
    println!("{}", render_board(board));
}

fn print_form(board: &BoardState) {
    let form = board.form();
    let draft = form.draft();
    println!("[FORM]");
    println!("  text:     {}", draft.text);
    println!("  source:   {}", draft.source);
    println!("  category: {}", draft.category);
    println!("  {} of {MAX_TEXT_CHARS} characters left", draft.remaining_chars());
}

fn print_help() {
    let categories: Vec<&str> = Category::ALL.iter().map(Category::name).collect();
    println!("Commands:");
    println!("  #all                      - Show facts from every category");
    println!("  #cat <category>           - Show one category");
    println!("  #refresh                  - Fetch the current category again");
    println!("  #list                     - Print the board");
    println!("  #form                     - Open or close the share form");
    println!("  #text <text>              - Set the fact text");
    println!("  #source <url>             - Set the source link");
    println!("  #category <category>      - Set the fact category");
    println!("  #post                     - Submit the form");
    println!("  #share <cat> <url> <text> - Fill and submit in one go");
    println!("  #vote <id> <field>        - Vote interesting, mindblowing or false");
    println!("  #dismiss                  - Clear the last notice");
    println!("  #help                     - Show this help");
    println!("  #quit                     - Exit");
    println!("Categories: {}", categories.join(", "));
}
