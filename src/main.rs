//! E-pilot - terminal client for the email assistant
//!
//! A line-oriented REPL over the assistant backend: authenticate, pick a
//! conversation, send messages, and decide on drafted emails when the
//! assistant interrupts for approval.

mod client;
mod conversation;
mod decision;
mod protocol;
mod session;
mod stream;

use client::ChatClient;
use conversation::{Conversation, ConversationError, Role, TranscriptEntry, TransitionError, TurnOutcome};
use decision::InterruptDecision;
use protocol::DraftEmail;
use session::{Session, SessionStore};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const THINKING_STEPS: [&str; 3] = [
    "E-pilot is thinking...",
    "E-pilot is drafting a plan...",
    "E-pilot is working on it...",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the prompt.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epilot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let base_url =
        std::env::var("EPILOT_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let client = ChatClient::new(&base_url);
    let store = SessionStore::new(SessionStore::default_path());

    let mut session = store.load();
    match &session {
        Some(session) => println!("Logged in as {}.", session.email),
        None => println!("Not logged in. Use /login <email> to begin."),
    }
    println!("Type /help for commands.");

    let mut conversation: Option<Conversation> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("/help") => print_help(),
            Some("/quit" | "/exit") => return Ok(()),

            Some("/login") => {
                let Some(email) = parts.next() else {
                    println!("Usage: /login <email>");
                    continue;
                };
                match client.login(email).await {
                    Ok(ack) => {
                        let message = ack
                            .message
                            .or(ack.detail)
                            .unwrap_or_else(|| "Check your inbox for a passcode.".to_string());
                        println!("{message}");
                    }
                    Err(err) => println!("Login failed: {err}"),
                }
            }

            Some("/verify") => {
                let (Some(email), Some(otp)) = (parts.next(), parts.next()) else {
                    println!("Usage: /verify <email> <otp>");
                    continue;
                };
                match client.verify_otp(email, otp).await {
                    Ok(verified) => {
                        let Some(user_id) = verified.employee_id else {
                            let reason = verified
                                .detail
                                .or(verified.message)
                                .unwrap_or_else(|| "no user id in response".to_string());
                            println!("Verification failed: {reason}");
                            continue;
                        };
                        let fresh = Session {
                            email: email.to_string(),
                            user_id,
                        };
                        if let Err(err) = store.store(&fresh) {
                            println!("Warning: could not persist session: {err}");
                        }
                        println!("Logged in as {email}.");
                        session = Some(fresh);
                        conversation = None;
                    }
                    Err(err) => println!("Verification failed: {err}"),
                }
            }

            Some("/logout") => {
                if let Err(err) = store.clear() {
                    println!("Warning: could not clear session: {err}");
                }
                session = None;
                conversation = None;
                println!("Logged out.");
            }

            Some("/connect") => {
                let Some(session) = &session else {
                    println!("Log in first.");
                    continue;
                };
                match client.google_auth_url(&session.user_id).await {
                    Ok(url) => println!("Open this URL to connect your mailbox:\n{url}"),
                    Err(err) => println!("Could not fetch authorization URL: {err}"),
                }
            }

            Some("/chats") => {
                let Some(session) = &session else {
                    println!("Log in first.");
                    continue;
                };
                match client.list_chats(&session.user_id).await {
                    Ok(chats) if chats.is_empty() => println!("No conversations yet."),
                    Ok(chats) => {
                        for chat in chats {
                            println!("{}  {}  ({})", chat.chat_id, chat.title, chat.created_at);
                        }
                    }
                    Err(err) => println!("Could not list conversations: {err}"),
                }
            }

            Some("/new") => {
                let Some(session) = &session else {
                    println!("Log in first.");
                    continue;
                };
                conversation = Some(Conversation::new(client.clone(), &session.user_id));
                println!("Started a new conversation.");
            }

            Some("/open") => {
                let Some(session) = &session else {
                    println!("Log in first.");
                    continue;
                };
                let Some(chat_id) = parts.next() else {
                    println!("Usage: /open <chat_id>");
                    continue;
                };
                let mut opened = Conversation::with_chat(client.clone(), &session.user_id, chat_id);
                match opened.load_history().await {
                    Ok(()) => {
                        for entry in opened.transcript() {
                            print_entry(entry);
                        }
                        conversation = Some(opened);
                    }
                    Err(err) => println!("Could not load history: {err}"),
                }
            }

            Some("/delete") => {
                let Some(session) = &session else {
                    println!("Log in first.");
                    continue;
                };
                let Some(chat_id) = parts.next() else {
                    println!("Usage: /delete <chat_id>");
                    continue;
                };
                match client.delete_chat(&session.user_id, chat_id).await {
                    Ok(()) => {
                        if conversation.as_ref().and_then(Conversation::chat_id) == Some(chat_id) {
                            conversation = None;
                        }
                        println!("Deleted {chat_id}.");
                    }
                    Err(err) => println!("Could not delete conversation: {err}"),
                }
            }

            Some(command) if command.starts_with('/') => {
                println!("Unknown command: {command}. Type /help for commands.");
            }

            Some(_) => {
                let Some(session) = &session else {
                    println!("Log in first.");
                    continue;
                };
                let active = conversation
                    .get_or_insert_with(|| Conversation::new(client.clone(), &session.user_id));
                run_turn(active, TurnInput::Message(line), &mut lines).await?;
            }

            None => {}
        }
    }
}

enum TurnInput {
    Message(String),
    Decision(InterruptDecision),
}

/// Drive one turn to completion, showing thinking progress and honoring
/// Ctrl-C as cancellation. Follows up on interrupts until the conversation
/// settles back to idle.
async fn run_turn(
    conversation: &mut Conversation,
    input: TurnInput,
    lines: &mut Lines<BufReader<Stdin>>,
) -> std::io::Result<()> {
    let mut input = Some(input);
    while let Some(next) = input.take() {
        let before = conversation.transcript().len();
        let outcome = drive_exchange(conversation, next).await;
        print_new_entries(conversation, before);

        match outcome {
            Ok(TurnOutcome::Settled) => {}
            Ok(TurnOutcome::Cancelled) => println!("(cancelled)"),
            Ok(TurnOutcome::AwaitingDecision) => {
                let Some(draft) = conversation.pending_draft() else {
                    continue;
                };
                print_draft(draft);
                let is_html = draft.is_html;
                match prompt_decision(lines, is_html).await? {
                    Some(decision) => input = Some(TurnInput::Decision(decision)),
                    None => {
                        conversation.cancel();
                        println!("(cancelled)");
                    }
                }
            }
            Err(ConversationError::Transition(TransitionError::Decision(err))) => {
                // Invalid decision: the interrupt is still pending, re-prompt.
                println!("{err}");
                let is_html = conversation
                    .pending_draft()
                    .is_some_and(|draft| draft.is_html);
                match prompt_decision(lines, is_html).await? {
                    Some(decision) => input = Some(TurnInput::Decision(decision)),
                    None => {
                        conversation.cancel();
                        println!("(cancelled)");
                    }
                }
            }
            Err(err) => println!("Turn failed: {err}"),
        }
    }
    Ok(())
}

async fn drive_exchange(
    conversation: &mut Conversation,
    input: TurnInput,
) -> Result<TurnOutcome, ConversationError> {
    let handle = conversation.cancel_handle();
    let thinking = conversation.thinking_watch();
    let turn = async {
        match input {
            TurnInput::Message(text) => conversation.submit(text).await,
            TurnInput::Decision(decision) => conversation.respond(decision).await,
        }
    };
    tokio::pin!(turn);

    let mut ticker = tokio::time::interval(Duration::from_millis(1500));
    let mut step = 0usize;
    loop {
        tokio::select! {
            outcome = &mut turn => return outcome,
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
            }
            _ = ticker.tick() => {
                if *thinking.borrow() {
                    println!("{}", THINKING_STEPS[step % THINKING_STEPS.len()]);
                    step += 1;
                }
            }
        }
    }
}

/// Collect one decision from the prompt. `None` means the user backed out.
async fn prompt_decision(
    lines: &mut Lines<BufReader<Stdin>>,
    is_html: bool,
) -> std::io::Result<Option<InterruptDecision>> {
    loop {
        println!("Decision [approve / reject / ai_rewrite / manual_edit / cancel]:");
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match line.trim() {
            "approve" => return Ok(Some(InterruptDecision::Approve { is_html })),
            "reject" => return Ok(Some(InterruptDecision::Reject { is_html })),
            "cancel" => return Ok(None),
            "ai_rewrite" => {
                println!("Instructions for the rewrite:");
                let Some(instructions) = lines.next_line().await? else {
                    return Ok(None);
                };
                return Ok(Some(InterruptDecision::AiRewrite {
                    instructions,
                    is_html,
                }));
            }
            "manual_edit" => {
                let Some(to) = prompt_field(lines, "To (comma-separated):").await? else {
                    return Ok(None);
                };
                let Some(cc) = prompt_field(lines, "CC (comma-separated, may be empty):").await?
                else {
                    return Ok(None);
                };
                let Some(subject) = prompt_field(lines, "Subject:").await? else {
                    return Ok(None);
                };
                let Some(body) = prompt_field(lines, "Body:").await? else {
                    return Ok(None);
                };
                return Ok(Some(InterruptDecision::ManualEdit {
                    to: split_addresses(&to),
                    cc: split_addresses(&cc),
                    subject,
                    body,
                    is_html,
                }));
            }
            other => println!("Unrecognized action: {other}"),
        }
    }
}

async fn prompt_field(
    lines: &mut Lines<BufReader<Stdin>>,
    label: &str,
) -> std::io::Result<Option<String>> {
    println!("{label}");
    lines.next_line().await
}

fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_new_entries(conversation: &Conversation, from: usize) {
    for entry in conversation.transcript().iter().skip(from) {
        print_entry(entry);
    }
}

fn print_entry(entry: &TranscriptEntry) {
    let who = match entry.role {
        Role::User => "you",
        Role::Assistant => "e-pilot",
    };
    println!("[{who}] {}", entry.content);
}

fn print_draft(draft: &DraftEmail) {
    println!("--- draft email ---");
    println!("To: {}", draft.to.join(", "));
    if let Some(cc) = &draft.cc {
        if !cc.is_empty() {
            println!("CC: {}", cc.join(", "));
        }
    }
    println!("Subject: {}", draft.subject);
    println!("HTML: {}", if draft.is_html { "yes" } else { "no" });
    println!("{}", draft.body);
    println!("-------------------");
}

fn print_help() {
    println!(
        "Commands:\n\
         /login <email>          request a one-time passcode\n\
         /verify <email> <otp>   redeem the passcode and log in\n\
         /logout                 forget the stored session\n\
         /connect                get the mailbox authorization URL\n\
         /chats                  list conversations\n\
         /new                    start a new conversation\n\
         /open <chat_id>         open a conversation and show its history\n\
         /delete <chat_id>       delete a conversation\n\
         /quit                   exit\n\
         Anything else is sent to the assistant. Ctrl-C cancels a turn."
    );
}
