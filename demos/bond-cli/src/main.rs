use keygate::prelude::*;
use serde_json::Value;

const USAGE: &str = "\
usage: bond-cli <command>

commands:
  status                      show who is signed in
  login <email> <password>    sign in and remember the session
  register <email> <password> create an account
  logout                      forget the session
  bonds                       list your bonds
  add <column=value>...       create a bond with the given columns
  flows <bond-id>             show a bond's cash flows by period
  metrics <bond-id>           show a bond's metrics
  open <path>                 resolve a page path through the guard

environment:
  KEYGATE_PROVIDER_URL, KEYGATE_API_KEY (required)
  KEYGATE_STORE_PATH, KEYGATE_TIMEOUT_SECS, RUST_LOG (optional)";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Command {
    Status,
    Login { email: String, password: String },
    Register { email: String, password: String },
    Logout,
    Bonds,
    Add { columns: Vec<(String, Value)> },
    Flows(BondId),
    Metrics(BondId),
    Open(String),
}

fn parse(args: &[String]) -> Result<Command, String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["status"] => Ok(Command::Status),
        ["login", email, password] => Ok(Command::Login {
            email: (*email).to_owned(),
            password: (*password).to_owned(),
        }),
        ["register", email, password] => Ok(Command::Register {
            email: (*email).to_owned(),
            password: (*password).to_owned(),
        }),
        ["logout"] => Ok(Command::Logout),
        ["bonds"] => Ok(Command::Bonds),
        ["add", columns @ ..] if !columns.is_empty() => columns
            .iter()
            .map(|pair| parse_column(pair))
            .collect::<Result<_, _>>()
            .map(|columns| Command::Add { columns }),
        ["flows", id] => Ok(Command::Flows(parse_bond_id(id))),
        ["metrics", id] => Ok(Command::Metrics(parse_bond_id(id))),
        ["open", path] => Ok(Command::Open((*path).to_owned())),
        _ => Err(USAGE.to_owned()),
    }
}

/// `name=value`; the value is taken as JSON when it parses, else as text.
fn parse_column(pair: &str) -> Result<(String, Value), String> {
    let (name, raw) = pair
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected column=value, got {pair:?}"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
    Ok((name.to_owned(), value))
}

fn parse_bond_id(raw: &str) -> BondId {
    raw.parse::<i64>().map_or_else(|_| BondId::from(raw), BondId::from)
}

fn print<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(app: &Keygate, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Status => {
            let who = app.current_user_id();
            println!(
                "{} ({})",
                app.status(),
                who.as_ref().map_or("nobody", UserId::as_str)
            );
        }
        Command::Login { email, password } => print(&app.login(&email, &password).await?)?,
        Command::Register { email, password } => print(&app.register(&email, &password).await)?,
        Command::Logout => {
            app.logout()?;
            println!("signed out");
        }
        Command::Bonds => print(&app.my_bonds().await?)?,
        Command::Add { columns } => {
            let bond = columns
                .into_iter()
                .fold(app.new_bond()?, |bond, (name, value)| bond.with(&name, value));
            print(&app.bonds().create(&bond).await)?;
        }
        Command::Flows(id) => print(&app.flows().flows_by_bond(&id).await)?,
        Command::Metrics(id) => print(&app.flows().metrics_by_bond(&id).await)?,
        Command::Open(path) => {
            let resolved = app.navigate(&path)?;
            if resolved.was_redirected() {
                println!("{path} -> {} ({})", resolved.path, resolved.route.name);
            } else {
                println!("{} ({})", resolved.path, resolved.route.name);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    keygate::telemetry::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse(&args) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{usage}");
            std::process::exit(2);
        }
    };

    let app = Keygate::builder(KeygateConfig::from_env()?).build()?;
    if let Err(e) = run(&app, command).await {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
    Ok(())
}
