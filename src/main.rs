use std::process::ExitCode;

use clap::{Parser, Subcommand};
use recipe_api::{
    app,
    config::Config,
    database::connection::wait_for_db,
    logging::init_logging,
    services::users::create_superuser,
    state::AppState,
};

#[derive(Parser)]
#[command(name = "recipe_api")]
#[command(about = "Recipe management API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Block until the database accepts connections
    WaitForDb,

    /// Create a user with staff and superuser rights
    CreateSuperuser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command.unwrap_or(Command::Serve), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Serve => serve(config).await,
        Command::WaitForDb => {
            if config.uses_memory_store() {
                log::info!("In-memory store configured, nothing to wait for");
                return Ok(());
            }
            wait_for_db(&config.database_url, 1, config.db_wait).await?;
            Ok(())
        }
        Command::CreateSuperuser { email, password } => {
            let state = AppState::from_config(&config).await?;
            let user = create_superuser(&*state.store, &email, &password).await?;
            log::info!("Superuser {} created", user.email);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(&config).await?;

    let (addr, server) = warp::serve(app(state)).try_bind_with_graceful_shutdown(
        config.bind_addr,
        async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutdown signal received");
        },
    )?;

    log::info!("Listening on http://{addr}");
    server.await;
    Ok(())
}
