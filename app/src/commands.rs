use std::sync::Arc;

use neuramail_ai::AiError;
use neuramail_automation::{evaluate_gate, AutomationLoop, TracingNotifier};
use neuramail_client::{ProfileDraft, ReplyRequest};
use neuramail_core::{ProfileLookup, ReplyTone, Ticket};

use crate::state::App;

pub async fn sign_up(app: &App, email: &str, password: &str) -> anyhow::Result<()> {
    let message = app.client.sign_up(email, password).await?;
    println!("{message}");
    println!("Check {email} for a confirmation code, then run `neuramail confirm`.");
    Ok(())
}

pub async fn confirm(
    app: &App,
    email: &str,
    code: &str,
    password: Option<&str>,
) -> anyhow::Result<()> {
    let message = app.client.confirm_sign_up(email, code).await?;
    println!("{message}");

    if let Some(password) = password {
        let session = app.client.sign_in(email, password, false).await?;
        println!("Signed in as {}.", session.user_email);
    }
    Ok(())
}

pub async fn login(app: &App, email: &str, password: &str, remember: bool) -> anyhow::Result<()> {
    let session = app.client.sign_in(email, password, remember).await?;
    println!("Signed in as {}.", session.user_email);
    Ok(())
}

pub fn logout(app: &App) -> anyhow::Result<()> {
    app.client.sign_out()?;
    println!("Signed out.");
    Ok(())
}

pub async fn status(app: &App) -> anyhow::Result<()> {
    let Some(session) = app.sessions.load()? else {
        println!("Not signed in.");
        return Ok(());
    };
    println!("Signed in as {}", session.user_email);

    let lookup = app.client.check_profile().await?;
    let gate = evaluate_gate(&lookup);
    match &lookup {
        ProfileLookup::Found(profile) => {
            println!("Profile: {} <{}>", profile.profile_name, profile.profile_email);
            println!(
                "Auto-reply: {}",
                if profile.auto_reply { "on" } else { "off" }
            );
            println!(
                "Assistant token: {}",
                if profile.has_assistant_token() {
                    "set"
                } else {
                    "not set"
                }
            );
            println!(
                "Automation: {}",
                if gate.permits_reply() {
                    "armed"
                } else {
                    "disabled"
                }
            );
        }
        ProfileLookup::NotFound => println!("No profile yet. Run `neuramail profile create`."),
        ProfileLookup::Error(message) => println!("Profile unavailable: {message}"),
    }
    Ok(())
}

pub async fn profile_show(app: &App) -> anyhow::Result<()> {
    match app.client.check_profile().await? {
        ProfileLookup::Found(profile) => {
            println!("Name:       {}", profile.profile_name);
            println!("Email:      {}", profile.profile_email);
            if let Some(phone) = &profile.phone {
                println!("Phone:      {phone}");
            }
            println!(
                "Auto-reply: {}",
                if profile.auto_reply { "on" } else { "off" }
            );
            println!(
                "Assistant:  {}",
                if profile.has_assistant_token() {
                    "token set"
                } else {
                    "no token"
                }
            );
        }
        ProfileLookup::NotFound => println!("No profile yet. Run `neuramail profile create`."),
        ProfileLookup::Error(message) => anyhow::bail!("profile lookup failed: {message}"),
    }
    Ok(())
}

pub async fn profile_create(app: &App, draft: ProfileDraft) -> anyhow::Result<()> {
    let message = app.client.create_profile(&draft).await?;
    println!("{message}");
    Ok(())
}

pub async fn profile_update(app: &App, draft: ProfileDraft) -> anyhow::Result<()> {
    let message = app.client.update_profile(&draft).await?;
    println!("{message}");
    Ok(())
}

pub async fn request_types(app: &App, types: &[String]) -> anyhow::Result<()> {
    let message = app.client.update_request_types(types).await?;
    println!("{message}");
    Ok(())
}

pub async fn assistant_token(app: &App, token: &str) -> anyhow::Result<()> {
    let message = app.client.update_assistant_token(token).await?;
    println!("{message}");
    Ok(())
}

pub async fn fetch(app: &App, keyword: Option<&str>) -> anyhow::Result<()> {
    let outcome = app.client.fetch_emails(keyword).await?;
    if outcome.count() == 0 {
        println!("No new emails");
        return Ok(());
    }

    println!("Fetched {} emails", outcome.count());
    for email in &outcome.emails {
        let sender = email.sender_email.as_deref().unwrap_or("unknown sender");
        let subject = email.subject.as_deref().unwrap_or("(no subject)");
        println!("  {sender}  {subject}");
    }
    Ok(())
}

pub async fn tickets(app: &App) -> anyhow::Result<()> {
    let tickets = app.client.get_all_queries().await?;
    if tickets.is_empty() {
        println!("No tickets.");
        return Ok(());
    }

    for ticket in &tickets {
        println!(
            "{}  {}  {}  {}",
            ticket.ticket_no, ticket.status, ticket.request_type, ticket.subject
        );
    }
    Ok(())
}

pub async fn thread(app: &App, ticket_id: &str) -> anyhow::Result<()> {
    let ticket = app.client.get_full_thread(ticket_id).await?;
    print_ticket_header(&ticket);

    for message in &ticket.thread {
        println!();
        println!(
            "[{}] {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.message_id
        );
        println!("{}", message.email_body);
        if let Some(reply) = &message.reply {
            println!("  replied: {reply}");
        }
    }
    Ok(())
}

pub async fn latest(app: &App, ticket_id: &str) -> anyhow::Result<()> {
    let messages = app.client.get_latest_threads(ticket_id).await?;
    if messages.is_empty() {
        println!("No messages.");
        return Ok(());
    }

    for message in &messages {
        println!(
            "[{}] {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.request_description
        );
    }
    Ok(())
}

pub async fn reply(app: &App, request: ReplyRequest) -> anyhow::Result<()> {
    let message = app.client.reply_to_email(&request).await?;
    println!("{message}");
    Ok(())
}

pub async fn draft(app: &App, ticket_id: &str, tone: Option<ReplyTone>) -> anyhow::Result<()> {
    let ticket = app.client.get_full_thread(ticket_id).await?;
    let assistant = app.assistant()?;

    // Thread arrives newest-first; the prompt reads chronologically.
    let mut history: Vec<String> = ticket
        .thread
        .iter()
        .map(|message| message.email_body.clone())
        .collect();
    history.reverse();

    let draft = assistant
        .generate_email_reply(&ticket.subject, &history, tone)
        .await?;
    println!("{draft}");
    Ok(())
}

pub async fn ask(app: &App, query: &str) -> anyhow::Result<()> {
    let tickets = app.client.get_all_queries().await?;
    let assistant = app.assistant()?;

    match assistant.process_assistant_query(query, &tickets).await {
        Ok(answer) => {
            println!("{}", answer.reply);
            if !answer.matched_emails.is_empty() {
                println!();
                println!("Relevant tickets:");
                for ticket in &answer.matched_emails {
                    println!("  {}  {}", ticket.ticket_no, ticket.subject);
                }
            }
            Ok(())
        }
        Err(err @ AiError::MalformedReply(_)) => {
            println!("{err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn watch(app: &App) -> anyhow::Result<()> {
    let backend = Arc::new(app.client.clone());
    let mut handle = AutomationLoop::spawn(backend, Arc::new(TracingNotifier), app.loop_settings());

    let mut status = handle.status();
    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let snapshot = *status.borrow();
            tracing::info!(
                phase = %snapshot.phase,
                operation = %snapshot.operation,
                "automation status"
            );
        }
    });

    println!("Automation running. Press Ctrl-C to stop.");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("Stopping.");
            handle.shutdown().await;
        }
        _ = handle.wait() => {
            println!("Automation stopped: sign in and run `neuramail watch` again.");
        }
    }
    printer.abort();
    Ok(())
}

fn print_ticket_header(ticket: &Ticket) {
    println!("{}  {}  ({})", ticket.ticket_no, ticket.subject, ticket.status);
    println!("from {}  type {}", ticket.sender_email, ticket.request_type);
}
