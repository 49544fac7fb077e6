//! CLI entry and dispatch.

use anyhow::{Context, Result};
use biblio_core::catalog::{Authors, Books, Genres, Users};
use biblio_core::config::Config;
use biblio_types::auth::USER_TYPE_ADMIN;
use biblio_types::catalog::POSITIONS;
use biblio_types::page::DEFAULT_PAGE_SIZE;
use biblio_types::{
    AuthorFilters, AuthorRequest, BookFilters, BookRequest, GenreFilters, GenreRequest,
    UserFilters, UserRequest,
};
use clap::Parser;

use crate::logging;

mod app;
mod commands;

use app::App;
use commands::catalog::Action;

#[derive(Parser)]
#[command(name = "biblio")]
#[command(version)]
#[command(about = "Administration client for the biblio library catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        /// Password (prompted for when omitted)
        #[arg(long, env = "BIBLIO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and delete the stored session
    Logout,
    /// Show the logged-in user
    Whoami,

    /// Manage authors
    Authors {
        #[command(subcommand)]
        command: AuthorCommands,
    },
    /// Manage genres
    Genres {
        #[command(subcommand)]
        command: GenreCommands,
    },
    /// Manage books
    Books {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Manage user accounts (administrators only)
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Write a commented default config file
    Init,
}

/// Paging options shared by every search.
#[derive(clap::Args, Debug, Clone)]
struct PageArgs {
    /// Zero-based page number
    #[arg(long, default_value_t = 0)]
    page: u32,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    size: u32,

    /// Sort field (service field name)
    #[arg(long)]
    order: Option<String>,
}

macro_rules! resource_commands {
    ($name:ident, $filter_args:ty => $filters:ty, $field_args:ty => $request:ty) => {
        #[derive(clap::Subcommand)]
        enum $name {
            /// Search with optional filters
            Search {
                #[command(flatten)]
                filters: $filter_args,
                #[command(flatten)]
                paging: PageArgs,
            },
            /// Show one record
            Get { id: i64 },
            /// Create a record
            Create {
                #[command(flatten)]
                fields: $field_args,
            },
            /// Replace a record's fields
            Update {
                id: i64,
                #[command(flatten)]
                fields: $field_args,
            },
            /// Delete a record
            Delete { id: i64 },
        }

        impl From<$name> for Action<$filters, $request> {
            fn from(command: $name) -> Self {
                match command {
                    $name::Search { filters, paging } => Action::Search {
                        filters: filters.into(),
                        page: paging.page,
                        size: paging.size,
                        order: paging.order,
                    },
                    $name::Get { id } => Action::Get(id),
                    $name::Create { fields } => Action::Create(fields.into()),
                    $name::Update { id, fields } => Action::Update(id, fields.into()),
                    $name::Delete { id } => Action::Delete(id),
                }
            }
        }
    };
}

resource_commands!(AuthorCommands, AuthorFilterArgs => AuthorFilters, AuthorFieldArgs => AuthorRequest);
resource_commands!(GenreCommands, GenreFilterArgs => GenreFilters, GenreFieldArgs => GenreRequest);
resource_commands!(BookCommands, BookFilterArgs => BookFilters, BookFieldArgs => BookRequest);
resource_commands!(UserCommands, UserFilterArgs => UserFilters, UserFieldArgs => UserRequest);

// ============================================================================
// Per-resource arguments
// ============================================================================

#[derive(clap::Args, Debug, Clone)]
struct AuthorFilterArgs {
    #[arg(long)]
    name: Option<String>,
}

impl From<AuthorFilterArgs> for AuthorFilters {
    fn from(args: AuthorFilterArgs) -> Self {
        Self { name: args.name }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct AuthorFieldArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    nationality: Option<String>,
    /// Birth date (YYYY-MM-DD)
    #[arg(long)]
    birth_date: Option<String>,
    #[arg(long)]
    biography: Option<String>,
    #[arg(long)]
    active: Option<bool>,
}

impl From<AuthorFieldArgs> for AuthorRequest {
    fn from(args: AuthorFieldArgs) -> Self {
        Self {
            name: args.name,
            nationality: args.nationality,
            birth_date: args.birth_date,
            biography: args.biography,
            active: args.active,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct GenreFilterArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl From<GenreFilterArgs> for GenreFilters {
    fn from(args: GenreFilterArgs) -> Self {
        Self {
            name: args.name,
            description: args.description,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct GenreFieldArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
}

impl From<GenreFieldArgs> for GenreRequest {
    fn from(args: GenreFieldArgs) -> Self {
        Self {
            name: args.name,
            description: args.description,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct BookFilterArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    genre_id: Option<i64>,
    #[arg(long)]
    author_id: Option<i64>,
}

impl From<BookFilterArgs> for BookFilters {
    fn from(args: BookFilterArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            language: args.language,
            genre_id: args.genre_id,
            author_id: args.author_id,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct BookFieldArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    genre_id: i64,
    #[arg(long)]
    author_id: i64,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    language: String,
    /// Number of copies
    #[arg(long, default_value_t = 1)]
    units: i64,
}

impl From<BookFieldArgs> for BookRequest {
    fn from(args: BookFieldArgs) -> Self {
        Self {
            genre_id: args.genre_id,
            author_id: args.author_id,
            title: args.title,
            description: args.description,
            language: args.language,
            units: args.units,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct UserFilterArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long, value_parser = parse_position)]
    position: Option<String>,
}

impl From<UserFilterArgs> for UserFilters {
    fn from(args: UserFilterArgs) -> Self {
        Self {
            name: args.name,
            username: args.username,
            email: args.email,
            position: args.position,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct UserFieldArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    /// Position code: C (Cliente) or F (Funcionário)
    #[arg(long, value_parser = parse_position)]
    position: String,
    /// Account password; leave unset on update to keep the current one
    #[arg(long, env = "BIBLIO_USER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl From<UserFieldArgs> for UserRequest {
    fn from(args: UserFieldArgs) -> Self {
        Self {
            name: args.name,
            username: args.username,
            email: args.email,
            position: args.position,
            password: args.password,
        }
    }
}

fn parse_position(value: &str) -> Result<String, String> {
    let code = value.trim().to_uppercase();
    if POSITIONS.iter().any(|p| p.code == code) {
        Ok(code)
    } else if code == USER_TYPE_ADMIN {
        Err("administrator accounts cannot be created here".to_string())
    } else {
        let known: Vec<String> = POSITIONS
            .iter()
            .map(|p| format!("{} ({})", p.code, p.description))
            .collect();
        Err(format!("unknown position '{value}'; expected {}", known.join(" or ")))
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // config commands must work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.log)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let app = App::new(config)?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&app, &username, password).await
        }
        Commands::Logout => {
            commands::auth::logout(&app);
            Ok(())
        }
        Commands::Whoami => commands::auth::whoami(&app),

        Commands::Authors { command } => {
            commands::catalog::run::<Authors>(&app, "/autores", command.into()).await
        }
        Commands::Genres { command } => {
            commands::catalog::run::<Genres>(&app, "/generos", command.into()).await
        }
        Commands::Books { command } => {
            commands::catalog::run::<Books>(&app, "/livros", command.into()).await
        }
        Commands::Users { command } => {
            commands::catalog::run::<Users>(&app, "/usuarios", command.into()).await
        }

        Commands::Config { .. } => Ok(()),
    }
}
