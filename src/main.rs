use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use iserve_protocol::common::{DemandStatus, ResponseStatus, ServiceType};

mod attachment;
mod cli;
mod client;
mod config;
mod error;
mod session;
mod statistics;
mod store;
mod ui;
mod upload;
mod utils;

#[cfg(test)]
mod tests;

use attachment::AttachmentScope;
use cli::CliHandler;

#[derive(Parser)]
#[command(
    name = "iserve",
    about = "iServe community service platform client",
    long_about = "iServe - community service demand and response client

OVERVIEW:
  This tool lets residents post service demands, respond to the demands of
  others, and manage file attachments on the iServe platform. Demands and
  responses are kept in a local dataset until a backend takes over.

WORKFLOW:
  1. Register or log in
  2. Post demands, browse and respond to others
  3. Attach files to demands and responses

QUICK START:
  iserve login                          # Sign in with username and password
  iserve demand list                    # Browse posted demands
  iserve demand create -t \"...\"         # Post a new demand
  iserve response create <DEMAND_ID>    # Respond to a demand
  iserve file upload demand 1 a.pdf     # Attach a file to demand 1
  iserve stats overview                 # Monthly activity overview",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with username and password
    Login(LoginArgs),

    /// Log out and clear the stored session
    Logout,

    /// Register a new account
    Register(RegisterArgs),

    /// Show the current session
    Whoami,

    /// Update profile fields of the logged-in user
    Profile(ProfileArgs),

    /// Manage service demands
    #[command(aliases = &["d"])]
    Demand(DemandArgs),

    /// Manage service responses
    #[command(aliases = &["r"])]
    Response(ResponseArgs),

    /// Manage attachments
    #[command(aliases = &["f"])]
    File(FileArgs),

    /// Demand statistics
    Stats(StatsArgs),

    /// Configure settings
    #[command(aliases = &["cfg"])]
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    pub username: Option<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    pub username: Option<String>,

    /// Register an administrator account
    #[arg(long)]
    pub admin: bool,
}

#[derive(Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub real_name: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub biography: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub avatar: Option<String>,
}

#[derive(Args)]
pub struct DemandArgs {
    #[command(subcommand)]
    pub command: DemandCommand,
}

#[derive(Subcommand)]
pub enum DemandCommand {
    /// List demands, filtered and paginated
    #[command(aliases = &["ls"])]
    List {
        /// Only demands of this service type
        #[arg(long, value_parser = ServiceType::from_str)]
        service_type: Option<ServiceType>,

        /// Only demands posted by the logged-in user
        #[arg(long)]
        mine: bool,

        /// Keyword to match against title, description and address
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },

    /// Show one demand in detail
    Show { id: String },

    /// Post a new demand
    Create {
        #[arg(short = 's', long, value_parser = ServiceType::from_str)]
        service_type: ServiceType,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        address: String,
    },

    /// Update fields of a demand
    Update {
        id: String,

        #[arg(long, value_parser = ServiceType::from_str)]
        service_type: Option<ServiceType>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long, value_parser = DemandStatus::from_str)]
        status: Option<DemandStatus>,
    },

    /// Delete a demand
    #[command(aliases = &["rm"])]
    Delete {
        id: String,

        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct ResponseArgs {
    #[command(subcommand)]
    pub command: ResponseCommand,
}

#[derive(Subcommand)]
pub enum ResponseCommand {
    /// List responses submitted by a user (defaults to the logged-in user)
    #[command(aliases = &["ls"])]
    List {
        #[arg(long)]
        user: Option<String>,
    },

    /// Respond to a demand
    Create {
        demand_id: String,

        #[arg(short, long)]
        content: String,
    },

    /// Update fields of a response
    Update {
        id: String,

        #[arg(long)]
        content: Option<String>,

        #[arg(long, value_parser = ResponseStatus::from_str)]
        status: Option<ResponseStatus>,
    },

    /// Delete a response
    #[command(aliases = &["rm"])]
    Delete {
        id: String,

        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct FileArgs {
    #[command(subcommand)]
    pub command: FileCommand,
}

#[derive(Subcommand)]
pub enum FileCommand {
    /// Upload a new attachment
    Upload {
        #[arg(value_parser = AttachmentScope::from_str)]
        scope: AttachmentScope,

        id: String,

        path: PathBuf,
    },

    /// Replace the existing attachment
    Replace {
        #[arg(value_parser = AttachmentScope::from_str)]
        scope: AttachmentScope,

        id: String,

        path: PathBuf,
    },

    /// Inspect or download the latest attachment
    Get {
        #[arg(value_parser = AttachmentScope::from_str)]
        scope: AttachmentScope,

        id: String,

        /// Download the file instead of showing its metadata
        #[arg(long)]
        download: bool,

        /// Where to write the downloaded file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub command: StatsCommand,
}

#[derive(Subcommand)]
pub enum StatsCommand {
    /// Monthly statistics from the server
    Monthly {
        /// Count demands that received responses instead of created demands
        #[arg(long)]
        responded: bool,

        /// Location ids to match (repeatable)
        #[arg(long = "location")]
        locations: Vec<u64>,

        /// Service type ids to match (repeatable)
        #[arg(long = "service-type-id")]
        service_type_ids: Vec<u64>,

        /// Earliest creation time (ISO 8601)
        #[arg(long)]
        from: Option<String>,

        /// Latest creation time (ISO 8601)
        #[arg(long)]
        to: Option<String>,
    },

    /// Monthly activity overview from the local dataset
    Overview,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    SetEndpoint { url: String },
    SetTimeout { seconds: u64 },
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(format!("iserve={}", log_level));
    subscriber.init();

    let mut handler = match CliHandler::new(None).await {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = handler.execute(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
