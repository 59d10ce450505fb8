//! Interactive terminal session over [`SearchService`].

use tokio::io::{AsyncBufReadExt, BufReader};

use dwell_chat::{SearchService, TurnReply};

pub const HELP: &str = "\
Commands:
  /results   show the rows of the last search
  /info      show the current session
  /reset     start over with empty criteria
  /sessions  number of active sessions
  /help      this message
  /quit      exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Message(String),
    Results,
    Info,
    Reset,
    Sessions,
    Help,
    Quit,
    Unknown(String),
    Blank,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Blank;
        }
        if !line.starts_with('/') {
            return Command::Message(line.to_string());
        }
        match line.to_lowercase().as_str() {
            "/results" => Command::Results,
            "/info" => Command::Info,
            "/reset" => Command::Reset,
            "/sessions" => Command::Sessions,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" | "/q" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Read lines from stdin until `/quit` or end of input.
pub async fn run(service: &SearchService, session_id: &str) -> std::io::Result<()> {
    println!("Hi! Tell me what kind of apartment you're looking for. (/help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Blank => continue,
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Unknown(cmd) => println!("Unknown command {}. Try /help.", cmd),
            Command::Message(text) => {
                match service.submit_message(Some(session_id), &text).await {
                    Ok(reply) => print_reply(&reply),
                    Err(e) => println!("! {}", e),
                }
            }
            Command::Results => match service.get_results(session_id) {
                Ok(results) => {
                    println!("{} result(s)", results.count);
                    for row in &results.rows {
                        match serde_json::to_string_pretty(row) {
                            Ok(text) => println!("{}", text),
                            Err(e) => tracing::warn!(error = %e, "Failed to render row"),
                        }
                    }
                }
                Err(e) => println!("! {}", e),
            },
            Command::Info => match service.session_info(session_id) {
                Ok(info) => {
                    println!("session:   {}", info.session_id);
                    println!("messages:  {}", info.message_count);
                    println!(
                        "criteria:  {}/5 essential, {} optional",
                        info.essential_count, info.optional_count
                    );
                    println!("node:      {}", info.current_node);
                    println!("searched:  {}", info.query_executed);
                    if let Some(error) = &info.last_error {
                        println!("last error: {}", error);
                    }
                }
                Err(e) => println!("! {}", e),
            },
            Command::Reset => {
                let ack = service.reset_session(session_id).await;
                println!("{}", ack.message);
            }
            Command::Sessions => {
                println!("{} active session(s)", service.active_session_count())
            }
        }
    }
    Ok(())
}

fn print_reply(reply: &TurnReply) {
    println!("{}", reply.message);
    if let Some(count) = reply.result_count {
        if count > 0 && reply.ready_to_search {
            println!("({} result(s); /results to list them)", count);
        }
    }
}
