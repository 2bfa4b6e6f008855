//! Interactive shell.
//!
//! Reads commands from stdin while the session's socket loop keeps
//! running: `tokio::select!` races a cancel-safe buffer fill against
//! the next input line, and frame handling happens outside the race so
//! no bytes or writes are lost when the user types mid-read.

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use nimbus_protocol::Frame;

use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Runs the shell until `exit`, stdin EOF, or a fatal session error.
pub async fn run(mut session: Session) -> ClientResult<()> {
    println!("Type 'help' for commands, 'exit' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(line) => {
                        if !evaluate(&mut session, line.trim()).await? {
                            break;
                        }
                    }
                }
                prompt();
            }
            filled = session.fill() => {
                match filled {
                    Ok(_) => session.drain_frames().await?,
                    Err(ClientError::Closed) => {
                        println!("connection closed by server");
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Ok(())
}

/// Evaluates one command line. Returns `false` to stop the shell.
async fn evaluate(session: &mut Session, input: &str) -> ClientResult<bool> {
    let mut words = input.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(true);
    };

    match command {
        "exit" | "quit" => return Ok(false),
        "help" => print_help(),
        "ping" => session.ping().await?,
        "pub" => match words.next() {
            Some(subject) => {
                let payload = rest(words);
                session.publish(subject, payload.as_bytes()).await?;
            }
            None => println!("usage: pub <subject> [payload...]"),
        },
        "sub" => match words.next() {
            Some(subject) => {
                let queue_group = words.next().map(str::to_owned);
                let sid = session
                    .subscribe(
                        subject,
                        queue_group.as_deref(),
                        Box::new(|frame, _ctx| {
                            println!(
                                "\n[{}] {}",
                                frame.subject,
                                frame.payload_text()
                            );
                            prompt();
                            frame.clone()
                        }),
                    )
                    .await?;
                println!("subscribed with sid {sid}");
            }
            None => println!("usage: sub <subject> [queue-group]"),
        },
        "unsub" => match words.next() {
            Some(sid) => session.unsubscribe(sid).await?,
            None => println!("usage: unsub <sid>"),
        },
        "req" => match words.next() {
            Some(subject) => {
                let payload = rest(words);
                session
                    .request(Frame::new(subject, payload.into_bytes()), |frame: &Frame| {
                        println!("\nreply: {}", frame.payload_text());
                        prompt();
                        frame.clone()
                    })
                    .await?;
            }
            None => println!("usage: req <subject> [payload...]"),
        },
        "reply" => match words.next() {
            Some(subject) => {
                let response = rest(words);
                let sid = session
                    .reply(subject, move |frame: &Frame| {
                        info!(subject = %frame.subject, "responding");
                        Frame::new("", response.clone().into_bytes())
                    })
                    .await?;
                println!("responding on '{subject}' with sid {sid}");
            }
            None => println!("usage: reply <subject> [response...]"),
        },
        other => println!("unknown command: {other} (try 'help')"),
    }
    Ok(true)
}

fn rest(words: std::str::SplitWhitespace<'_>) -> String {
    words.collect::<Vec<_>>().join(" ")
}

fn print_help() {
    println!("commands:");
    println!("  pub <subject> [payload...]    publish a message");
    println!("  sub <subject> [queue-group]   subscribe and print messages");
    println!("  unsub <sid>                   cancel a subscription");
    println!("  req <subject> [payload...]    publish and await one reply");
    println!("  reply <subject> [response...] respond to requests on a subject");
    println!("  ping                          check server liveness");
    println!("  exit                          quit");
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
