use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

const MAX_PASSWORD_ATTEMPTS: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "quits_admin")]
#[command(about = "Admin utilities for Quits (bootstrap users, groups and friendships)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./quits.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Group(Group),
    Friend(Friend),
    Balance(Balance),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user; the password is prompted for.
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Group {
    #[command(subcommand)]
    command: GroupCommand,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create(GroupCreateArgs),
    AddMember(GroupAddMemberArgs),
}

#[derive(Args, Debug)]
struct GroupCreateArgs {
    #[arg(long)]
    name: String,
    /// Username to add as a member; may be repeated.
    #[arg(long = "member")]
    members: Vec<String>,
}

#[derive(Args, Debug)]
struct GroupAddMemberArgs {
    #[arg(long)]
    group: i64,
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Friend {
    #[command(subcommand)]
    command: FriendCommand,
}

#[derive(Subcommand, Debug)]
enum FriendCommand {
    Add(FriendAddArgs),
}

#[derive(Args, Debug)]
struct FriendAddArgs {
    /// The two usernames to befriend (`--username A --username B`).
    #[arg(long = "username", required = true, num_args = 1)]
    usernames: Vec<String>,
}

#[derive(Args, Debug)]
struct Balance {
    #[command(subcommand)]
    command: BalanceCommand,
}

#[derive(Subcommand, Debug)]
enum BalanceCommand {
    /// Overall balance and the net against each counterparty.
    Show(BalanceShowArgs),
}

#[derive(Args, Debug)]
struct BalanceShowArgs {
    #[arg(long)]
    username: String,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

/// Asks for a new password until two entries match.
fn prompt_new_password(username: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..MAX_PASSWORD_ATTEMPTS {
        let p1 = prompt_password(&format!("Password for {username}: "))?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Prints the error and exits for failures the operator can fix.
fn exit_on_user_error(err: EngineError) -> Box<dyn Error + Send + Sync> {
    match err {
        EngineError::ExistingKey(key) => {
            eprintln!("already exists: {key}");
            std::process::exit(1);
        }
        EngineError::KeyNotFound(key) => {
            eprintln!("not found: {key}");
            std::process::exit(1);
        }
        EngineError::InvalidInput(msg) | EngineError::InvalidAmount(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        other => other.into(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            if engine.user_by_username(&args.username).await.is_ok() {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }
            let password = prompt_new_password(&args.username)?;

            let user = engine
                .create_user(&args.username, &password)
                .await
                .map_err(exit_on_user_error)?;
            println!("created user: {} ({})", user.username, user.id);
        }
        Command::Group(Group {
            command: GroupCommand::Create(args),
        }) => {
            let mut member_ids = Vec::with_capacity(args.members.len());
            for username in &args.members {
                let user = engine
                    .user_by_username(username)
                    .await
                    .map_err(exit_on_user_error)?;
                member_ids.push(user.id);
            }

            let group_id = engine
                .create_group_with_members(&args.name, member_ids)
                .await
                .map_err(exit_on_user_error)?;
            println!(
                "created group: {} ({group_id}) with {} member(s)",
                args.name,
                args.members.len()
            );
        }
        Command::Group(Group {
            command: GroupCommand::AddMember(args),
        }) => {
            let user = engine
                .user_by_username(&args.username)
                .await
                .map_err(exit_on_user_error)?;
            engine
                .add_group_member(args.group, user.id)
                .await
                .map_err(exit_on_user_error)?;
            println!("added {} to group {}", user.username, args.group);
        }
        Command::Friend(Friend {
            command: FriendCommand::Add(args),
        }) => {
            let [first, second] = args.usernames.as_slice() else {
                eprintln!("exactly two --username values are required");
                std::process::exit(2);
            };
            let a = engine
                .user_by_username(first)
                .await
                .map_err(exit_on_user_error)?;
            let b = engine
                .user_by_username(second)
                .await
                .map_err(exit_on_user_error)?;
            engine
                .add_friendship(a.id, b.id)
                .await
                .map_err(exit_on_user_error)?;
            println!("{} and {} are now friends", a.username, b.username);
        }
        Command::Balance(Balance {
            command: BalanceCommand::Show(args),
        }) => {
            let user = engine
                .user_by_username(&args.username)
                .await
                .map_err(exit_on_user_error)?;
            let balance = engine.overall_balance(user.id).await?;
            println!("balance for {}", user.username);
            println!("  you are owed: {}", balance.you_are_owed);
            println!("  you owe:      {}", balance.you_owe);
            println!("  total:        {}", balance.total);

            for counterparty in engine.balances_by_counterparty(user.id).await? {
                println!("  {:>12}  {}", counterparty.net.to_string(), counterparty.username);
            }
        }
    }

    Ok(())
}
