mod config;
mod graphql;
mod http;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_authz::Role;
use platform_db::{DatabaseSettings, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{
    seed,
    service::users::{self, NewUser},
};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "hr-server", version, about = "HR administration server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Load demo users, structure, staff and training records.
    Seed {
        #[arg(long, env = "SEED_PASSWORD", default_value = "change-me-now")]
        password: String,
    },
    /// Create a login account.
    #[command(name = "create-user")]
    CreateUser(CreateUserCommand),
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
    /// Drop everything and reapply all migrations.
    Reset,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, help = "Override the BIND address")]
    bind: Option<std::net::SocketAddr>,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

#[derive(Args, Debug)]
struct CreateUserCommand {
    #[arg(long)]
    username: String,
    #[arg(long)]
    display_name: Option<String>,
    /// Repeatable: ADMIN, MODERATOR, EDITOR or VIEWER.
    #[arg(long = "role", required = true)]
    roles: Vec<String>,
    #[arg(long, env = "HR_USER_PASSWORD")]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env("hr-server"))?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Migrate(action) => {
            let db = setup_db().await?;
            match action {
                MigrateCommand::Up => {
                    Migrator::up(&db, None).await?;
                    info!("database migrations applied");
                }
                MigrateCommand::Down => {
                    Migrator::down(&db, Some(1)).await?;
                    info!("most recent migration rolled back");
                }
                MigrateCommand::Reset => {
                    Migrator::fresh(&db).await?;
                    info!("database rebuilt from scratch");
                }
            }
            Ok(())
        }
        Command::Seed { password } => run_seed(&password).await,
        Command::CreateUser(cmd) => create_user(cmd).await,
        Command::SchemaPrint { output } => schema_print(output),
    }
}

async fn setup_db() -> Result<DatabaseConnection> {
    let settings = DatabaseSettings::from_env()?;
    Ok(connect(&settings).await?)
}

async fn run_seed(password: &str) -> Result<()> {
    let db = setup_db().await?;
    ensure_migrations(&db, false).await?;
    let seeded = seed::seed_demo(&db, password).await?;
    info!(
        users = seeded.users.len(),
        departments = seeded.departments.len(),
        positions = seeded.positions.len(),
        programs = seeded.programs.len(),
        employees = seeded.employees.len(),
        records = seeded.records.len(),
        "demo data seeded"
    );
    Ok(())
}

async fn create_user(cmd: CreateUserCommand) -> Result<()> {
    let roles = cmd
        .roles
        .iter()
        .map(|raw| Role::parse(raw).ok_or_else(|| anyhow!("unknown role {raw}")))
        .collect::<Result<Vec<_>>>()?;
    let db = setup_db().await?;
    ensure_migrations(&db, false).await?;
    let (user, roles) = users::provision(
        &db,
        NewUser {
            display_name: cmd.display_name.unwrap_or_else(|| cmd.username.clone()),
            username: cmd.username,
            password: cmd.password,
            roles,
        },
    )
    .await?;
    info!(user = %user.username, roles = ?roles, "user created");
    Ok(())
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = graphql::schema_sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema written");
        }
        None => print!("{sdl}"),
    }
    Ok(())
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(bind) = cmd.bind {
        config.bind = bind;
    }
    let db = Arc::new(connect(&config.database).await?);
    ensure_migrations(&db, cmd.allow_dirty).await?;
    let schema = graphql::build_schema(db.clone(), Arc::new(config.auth.clone()));
    let serve_config = ServeConfig::new(config.bind);
    let state = AppState {
        db,
        schema,
        config: Arc::new(config),
    };
    http::serve(serve_config, state).await
}

async fn ensure_migrations(db: &DatabaseConnection, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if !pending.is_empty() && !allow_dirty {
        bail!(
            "{} pending migrations; run `hr-server migrate up` or pass --allow-dirty",
            pending.len()
        );
    }
    Ok(())
}
