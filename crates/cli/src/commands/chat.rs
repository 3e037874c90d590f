//! `duneguide chat`: Interactive terminal chat.

use duneguide_agent::TurnOutcome;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CmdResult, load_config, new_session, require_api_key};

pub async fn run(config_path: Option<&Path>) -> CmdResult {
    let config = load_config(config_path)?;
    require_api_key(&config)?;

    let mut session = new_session(&config).await?;
    let assistant = session.settings().assistant_name.clone();

    println!();
    println!("  🏙️ Dubai's First Ever AI Tourist Guide 🇦🇪");
    println!();
    println!("  Provider:    {}", config.provider);
    println!("  Model:       {}", config.model);
    println!("  Collection:  {}", config.store.collection);
    println!();
    println!("  Ask about attractions, deals, and more.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("You: ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        if !query.is_empty() {
            eprint!("  ...");
            let result = session.handle_turn(query).await;
            eprint!("\r     \r");

            match result {
                Ok(TurnOutcome::Ignored) => {}
                Ok(outcome) => {
                    if let Some(warning) = outcome.warning() {
                        eprintln!("[Warning] {warning}");
                    }
                    if let Some(reply) = outcome.reply() {
                        println!("{assistant}: {reply}");
                    }
                    println!();
                }
                Err(e) => {
                    eprintln!("[Error] {e}");
                    println!();
                }
            }
        }

        print!("You: ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}
