use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ideahub_core::campaign::{CampaignId, CampaignStatus};
use ideahub_core::idea::{ExpectedImpact, IdeaDraft, IdeaId, IdeaStatus};
use ideahub_core::user::{PasswordChange, Registration, UserId};

mod app;
mod commands;

use app::bootstrap::ConfigOverrides;
use app::{AppBootstrap, logging};
use commands::Output;
use commands::ideas::{Changes, ListArgs};

#[derive(Parser)]
#[command(name = "ideahub")]
#[command(about = "IdeaHub CLI - submit and track ideas on the IdeaHub platform", long_about = None)]
struct Cli {
    /// Path to the config file (defaults to the user config directory)
    #[arg(long, global = true, env = "IDEAHUB_CONFIG")]
    config: Option<PathBuf>,

    /// API base URL, overriding config file and environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        username: String,
        #[arg(long, env = "IDEAHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Reload the profile from the server
        #[arg(long)]
        refresh: bool,
    },
    /// Create a new account
    Register(RegisterArgs),
    /// Change the password of the signed-in user
    ChangePassword {
        #[arg(long)]
        old_password: String,
        #[arg(long)]
        new_password: String,
        /// Defaults to --new-password
        #[arg(long)]
        new_password_confirm: Option<String>,
    },
    /// Exchange the refresh token for a new access token
    RefreshToken,
    /// Browse and manage ideas
    Ideas {
        #[command(subcommand)]
        action: IdeaAction,
    },
    /// Browse campaigns
    Campaigns {
        #[command(subcommand)]
        action: CampaignAction,
    },
}

#[derive(Args)]
struct RegisterArgs {
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long, env = "IDEAHUB_PASSWORD", hide_env_values = true)]
    password: String,
    /// Defaults to --password
    #[arg(long)]
    password_confirm: Option<String>,
}

impl RegisterArgs {
    fn into_registration(self) -> Registration {
        Registration {
            password_confirm: self.password_confirm.unwrap_or_else(|| self.password.clone()),
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password: self.password,
        }
    }
}

#[derive(Subcommand)]
enum IdeaAction {
    /// List ideas visible to the current user
    List {
        #[arg(long)]
        status: Option<IdeaStatus>,
        #[arg(long)]
        impact: Option<ExpectedImpact>,
        #[arg(long)]
        campaign: Option<CampaignId>,
        #[arg(long)]
        search: Option<String>,
        /// Server ordering, e.g. `-created_at`
        #[arg(long, allow_hyphen_values = true)]
        ordering: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        /// Only ideas the current user submitted or contributes to
        #[arg(long)]
        mine: bool,
    },
    /// Show one idea
    Show { id: IdeaId },
    /// Create a draft idea
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        impact: ExpectedImpact,
        #[arg(long)]
        campaign: CampaignId,
    },
    /// Edit a draft idea
    Update {
        id: IdeaId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        impact: Option<ExpectedImpact>,
        #[arg(long)]
        campaign: Option<CampaignId>,
    },
    /// Delete a draft idea
    Delete { id: IdeaId },
    /// Submit a draft idea for evaluation
    Submit { id: IdeaId },
    /// Add a user as contributor
    AddContributor { id: IdeaId, user: UserId },
    /// List contributors of an idea
    Contributors { id: IdeaId },
    /// List documents attached to an idea
    Documents { id: IdeaId },
}

#[derive(Subcommand)]
enum CampaignAction {
    /// List campaigns
    List {
        #[arg(long)]
        status: Option<CampaignStatus>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one campaign
    Show { id: CampaignId },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppBootstrap::load_config(&ConfigOverrides {
        config_file: cli.config.clone(),
        api_url: cli.api_url.clone(),
    })?;
    logging::init(&config.log_level);

    let app = AppBootstrap::initialize(config)?;
    let out = Output::new(cli.json);

    run(&app, out, cli.command).await
}

async fn run(app: &AppBootstrap, out: Output, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            commands::auth::login(app, out, &username, &password).await
        }
        Commands::Logout => commands::auth::logout(app, out),
        Commands::Whoami { refresh } => commands::auth::whoami(app, out, refresh).await,
        Commands::Register(args) => {
            commands::auth::register(app, out, args.into_registration()).await
        }
        Commands::ChangePassword {
            old_password,
            new_password,
            new_password_confirm,
        } => {
            let change = PasswordChange {
                new_password_confirm: new_password_confirm
                    .unwrap_or_else(|| new_password.clone()),
                old_password,
                new_password,
            };
            commands::auth::change_password(app, out, change).await
        }
        Commands::RefreshToken => commands::auth::refresh_token(app, out).await,
        Commands::Ideas { action } => run_ideas(app, out, action).await,
        Commands::Campaigns { action } => match action {
            CampaignAction::List { status, page } => {
                commands::campaigns::list(app, out, status, page).await
            }
            CampaignAction::Show { id } => commands::campaigns::show(app, out, id).await,
        },
    }
}

async fn run_ideas(app: &AppBootstrap, out: Output, action: IdeaAction) -> Result<()> {
    use commands::ideas;

    match action {
        IdeaAction::List {
            status,
            impact,
            campaign,
            search,
            ordering,
            page,
            mine,
        } => {
            let args = ListArgs {
                status,
                impact,
                campaign,
                search,
                ordering,
                page,
                mine,
            };
            ideas::list(app, out, &args).await
        }
        IdeaAction::Show { id } => ideas::show(app, out, id).await,
        IdeaAction::Create {
            title,
            description,
            impact,
            campaign,
        } => {
            let draft = IdeaDraft {
                title,
                description,
                expected_impact: impact,
                campaign_id: campaign,
            };
            ideas::create(app, out, draft).await
        }
        IdeaAction::Update {
            id,
            title,
            description,
            impact,
            campaign,
        } => {
            let changes = Changes {
                title,
                description,
                impact,
                campaign,
            };
            ideas::update(app, out, id, &changes).await
        }
        IdeaAction::Delete { id } => ideas::delete(app, out, id).await,
        IdeaAction::Submit { id } => ideas::submit(app, out, id).await,
        IdeaAction::AddContributor { id, user } => {
            ideas::add_contributor(app, out, id, user).await
        }
        IdeaAction::Contributors { id } => ideas::contributors(app, out, id).await,
        IdeaAction::Documents { id } => ideas::documents(app, out, id).await,
    }
}
