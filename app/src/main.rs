mod commands;
mod state;

use clap::{Parser, Subcommand};
use neuramail_client::{ProfileDraft, ReplyRequest};
use neuramail_core::ReplyTone;
use state::App;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[derive(Parser)]
#[command(name = "neuramail", version, about = "AI-assisted support mailbox companion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Confirm a new account with the emailed code.
    Confirm {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
        /// Sign in right away once the account is confirmed.
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and store the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Keep the session across shell restarts.
        #[arg(long)]
        remember: bool,
    },
    /// Drop the stored session.
    Logout,
    /// Show session, profile, and automation state.
    Status,
    /// Manage the support profile.
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Replace the request categories tickets are sorted into.
    RequestTypes {
        #[arg(required = true)]
        types: Vec<String>,
    },
    /// Store the assistant token that arms automated replies.
    AssistantToken { token: String },
    /// Pull new mail from the connected mailbox.
    Fetch {
        #[arg(long)]
        keyword: Option<String>,
    },
    /// List all tickets.
    Tickets,
    /// Show the full thread for one ticket.
    Thread { ticket_id: String },
    /// Show the latest messages for one ticket.
    Latest { ticket_id: String },
    /// Send a manual reply to a ticket message.
    Reply {
        #[arg(long)]
        ticket: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        message_id: String,
        #[arg(long)]
        body: String,
    },
    /// Draft a reply with the assistant without sending anything.
    Draft {
        ticket_id: String,
        #[arg(long)]
        tone: Option<ReplyTone>,
    },
    /// Ask the assistant a question about the mailbox.
    Ask { query: String },
    /// Run the automation loop until interrupted.
    Watch,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the stored profile.
    Show,
    /// Create the profile.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        auto_reply: bool,
    },
    /// Replace the profile wholesale.
    Update {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        auto_reply: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let app = App::initialize()?;

    match cli.command {
        Commands::SignUp { email, password } => commands::sign_up(&app, &email, &password).await,
        Commands::Confirm {
            email,
            code,
            password,
        } => commands::confirm(&app, &email, &code, password.as_deref()).await,
        Commands::Login {
            email,
            password,
            remember,
        } => commands::login(&app, &email, &password, remember).await,
        Commands::Logout => commands::logout(&app),
        Commands::Status => commands::status(&app).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile_show(&app).await,
            ProfileCommands::Create {
                name,
                email,
                phone,
                auto_reply,
            } => {
                commands::profile_create(
                    &app,
                    ProfileDraft {
                        name,
                        email,
                        phone,
                        auto_reply,
                    },
                )
                .await
            }
            ProfileCommands::Update {
                name,
                email,
                phone,
                auto_reply,
            } => {
                commands::profile_update(
                    &app,
                    ProfileDraft {
                        name,
                        email,
                        phone,
                        auto_reply,
                    },
                )
                .await
            }
        },
        Commands::RequestTypes { types } => commands::request_types(&app, &types).await,
        Commands::AssistantToken { token } => commands::assistant_token(&app, &token).await,
        Commands::Fetch { keyword } => commands::fetch(&app, keyword.as_deref()).await,
        Commands::Tickets => commands::tickets(&app).await,
        Commands::Thread { ticket_id } => commands::thread(&app, &ticket_id).await,
        Commands::Latest { ticket_id } => commands::latest(&app, &ticket_id).await,
        Commands::Reply {
            ticket,
            to,
            message_id,
            body,
        } => {
            commands::reply(
                &app,
                ReplyRequest {
                    ticket_id: ticket,
                    to_email: to,
                    body,
                    message_id,
                },
            )
            .await
        }
        Commands::Draft { ticket_id, tone } => commands::draft(&app, &ticket_id, tone).await,
        Commands::Ask { query } => commands::ask(&app, &query).await,
        Commands::Watch => commands::watch(&app).await,
    }
}
