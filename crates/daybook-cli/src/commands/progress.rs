use clap::Subcommand;

use daybook_core::{CoreError, Database, ProgressStore, SessionKey};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Print the stored progress record for a session
    Show {
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete the stored progress record for a session
    Clear {
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
}

fn parse_key(date: Option<String>) -> Result<SessionKey, CoreError> {
    match date {
        Some(s) => s
            .parse()
            .map_err(|e| CoreError::Custom(format!("invalid date '{s}': {e}"))),
        None => Ok(SessionKey::today()),
    }
}

pub fn run(action: ProgressAction) -> Result<(), CoreError> {
    let db = Database::open()?;
    match action {
        ProgressAction::Show { date } => {
            let key = parse_key(date)?;
            match db.get(&key)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("no stored progress for {key}"),
            }
        }
        ProgressAction::Clear { date } => {
            let key = parse_key(date)?;
            db.clear(&key)?;
            println!("ok");
        }
    }
    Ok(())
}
