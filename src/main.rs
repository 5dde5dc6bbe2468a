use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::Settings;
use core_types::{NewMessage, User, UserProfile};
use database::{DbRepository, connect, reset_schema, run_migrations};

/// The main entry point for the Warbler application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = configuration::load_config().context("failed to load configuration")?;
    let _log_guard = configuration::init_tracing(&settings.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Serve => web_server::run_server(settings).await,
        Commands::Migrate => {
            let db_pool = connect(&settings.database).await?;
            run_migrations(&db_pool).await?;
            println!("Migrations applied.");
            Ok(())
        }
        Commands::ResetDb { yes } => {
            if !yes {
                bail!("refusing to drop all tables without --yes");
            }
            let db_pool = connect(&settings.database).await?;
            reset_schema(&db_pool).await?;
            println!("Database schema recreated.");
            Ok(())
        }
        Commands::Account(command) => run_account_command(command, settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Warbler: a small microblogging service.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve,
    /// Apply pending database migrations.
    Migrate,
    /// Drop every table and recreate the schema. Destroys all data.
    ResetDb {
        /// Required confirmation flag.
        #[arg(long)]
        yes: bool,
    },
    #[command(flatten)]
    Account(AccountCommands),
}

/// Commands that read or change users and their relationships.
#[derive(Subcommand)]
enum AccountCommands {
    /// Create a new user.
    Signup(SignupArgs),
    /// Check a username/password pair.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Make one user follow another.
    Follow(FollowArgs),
    /// Remove a follow edge.
    Unfollow(FollowArgs),
    /// Show a user's profile.
    Show {
        #[arg(long)]
        username: String,
    },
    /// Post a message as a user.
    Post {
        #[arg(long)]
        username: String,
        #[arg(long)]
        text: String,
    },
}

#[derive(Parser)]
struct SignupArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Profile image. Defaults to the stock avatar.
    #[arg(long)]
    image_url: Option<String>,
}

#[derive(Parser)]
struct FollowArgs {
    /// Username of the user doing the following.
    #[arg(long)]
    follower: String,
    /// Username of the user being followed.
    #[arg(long)]
    followed: String,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn run_account_command(command: AccountCommands, settings: Settings) -> anyhow::Result<()> {
    let db_pool = connect(&settings.database)
        .await
        .context("failed to connect to the database")?;
    run_migrations(&db_pool).await?;
    let repo = DbRepository::new(db_pool);

    match command {
        AccountCommands::Signup(args) => {
            let new_user = User::signup_with_cost(
                Some(&args.username),
                Some(&args.email),
                Some(&args.password),
                args.image_url.as_deref(),
                settings.auth.bcrypt_cost,
            )?;
            let mut session = repo.session();
            session.add_user(new_user);
            let committed = session.commit().await?;
            for user in &committed.users {
                println!("Created user {} (id {}).", user.username, user.id);
            }
        }
        AccountCommands::Login { username, password } => {
            match repo.authenticate(&username, &password).await? {
                Some(user) => println!("Authenticated {} (id {}).", user.username, user.id),
                None => bail!("invalid username or password"),
            }
        }
        AccountCommands::Follow(args) => {
            let (follower, followed) = follow_pair(&repo, &args).await?;
            let mut session = repo.session();
            session.follow(&follower, &followed);
            session.commit().await?;
            println!("{} now follows {}.", follower.username, followed.username);
        }
        AccountCommands::Unfollow(args) => {
            let (follower, followed) = follow_pair(&repo, &args).await?;
            let mut session = repo.session();
            session.unfollow(&follower, &followed);
            session.commit().await?;
            println!("{} no longer follows {}.", follower.username, followed.username);
        }
        AccountCommands::Show { username } => {
            let user = user_by_name(&repo, &username).await?;
            let profile = repo.load_profile(user.id).await?;
            println!("{}", render_profile(&profile));
        }
        AccountCommands::Post { username, text } => {
            let user = user_by_name(&repo, &username).await?;
            let mut session = repo.session();
            session.add_message(NewMessage::new(user.id, &text)?);
            let committed = session.commit().await?;
            for message in &committed.messages {
                println!("Posted message {} at {}.", message.id, message.timestamp);
            }
        }
    }

    Ok(())
}

async fn user_by_name(repo: &DbRepository, username: &str) -> anyhow::Result<User> {
    repo.find_user_by_username(username)
        .await?
        .with_context(|| format!("no user named '{username}'"))
}

async fn follow_pair(repo: &DbRepository, args: &FollowArgs) -> anyhow::Result<(User, User)> {
    let follower = user_by_name(repo, &args.follower).await?;
    let followed = user_by_name(repo, &args.followed).await?;
    Ok((follower, followed))
}

fn render_profile(profile: &UserProfile) -> Table {
    let names = |users: &[User]| {
        users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>().join(", ")
    };

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["id".to_string(), profile.user.id.to_string()]);
    table.add_row(vec!["username".to_string(), profile.user.username.clone()]);
    table.add_row(vec!["email".to_string(), profile.user.email.clone()]);
    table.add_row(vec!["bio".to_string(), profile.user.bio.clone().unwrap_or_default()]);
    table.add_row(vec!["location".to_string(), profile.user.location.clone().unwrap_or_default()]);
    table.add_row(vec!["following".to_string(), names(&profile.following)]);
    table.add_row(vec!["followers".to_string(), names(&profile.followers)]);
    table.add_row(vec!["messages".to_string(), profile.messages.len().to_string()]);
    table.add_row(vec!["likes".to_string(), profile.liked_message_ids.len().to_string()]);
    table
}
