use clap::{Parser, Subcommand};
use stockroom_core::config::LogFormat;
use stockroom_core::taxonomy::CANONICAL;
use stockroom_core::{db, logging, seed, App, Config};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(about = "Role-based access control for the Stockroom inventory/POS backend")]
#[command(version)]
struct Cli {
    /// Override LOG_FORMAT (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Skip the bootstrap seeder even if SEED_ON_START is set
        #[arg(long)]
        no_seed: bool,
    },
    /// Run pending migrations
    Migrate,
    /// Seed the permission catalog, the admin role and the admin user
    Seed,
    /// Print the canonical permission catalog
    Catalog,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::Catalog = cli.command {
        for name in CANONICAL {
            println!("{name}");
        }
        return;
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    logging::init_logging(config.log_format);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { no_seed } => {
            let config = Config {
                seed_on_start: config.seed_on_start && !no_seed,
                ..config
            };
            App::new(config).await?.run().await?;
        }
        Commands::Migrate => {
            let conn = db::connect(&config).await?;
            db::migrate(&conn).await?;
            tracing::info!("Migrations applied");
        }
        Commands::Seed => {
            let conn = db::connect(&config).await?;
            db::migrate(&conn).await?;
            let report = seed::run(&conn, CANONICAL, &config.admin).await?;
            println!(
                "permissions: {} created, {} skipped; admin role {}; admin user {}",
                report.permissions_created,
                report.permissions_skipped,
                if report.admin_role_created { "created" } else { "present" },
                if report.admin_user_created { "created" } else { "present" },
            );
        }
        Commands::Catalog => {}
    }
    Ok(())
}
