use clap::Parser;
use color_eyre::Result;
use gogodo::{
    Config, Profile, Services,
    cli::{self, Cli, Commands},
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = Config::load_with_profile(profile, cli.config.as_deref())?;
    let _log_guard = logging::init(&config.get_data_dir());
    tracing::info!("Starting gogodo ({:?})", profile);

    let mut services = Services::connect(config).await?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = gogodo::tui::App::new(services);
            gogodo::tui::run_event_loop(app).await?;
        }
        Commands::SignUp { email, password } => {
            cli::handle_sign_up(&mut services, email, password).await?;
        }
        Commands::SignIn { email, password } => {
            cli::handle_sign_in(&mut services, email, password).await?;
        }
        Commands::SignOut => cli::handle_sign_out(&mut services).await?,
        Commands::Whoami => cli::handle_whoami(&services)?,
        Commands::Add { text } => cli::handle_add(&mut services, text).await?,
        Commands::List { search, pending } => cli::handle_list(&services, search, pending)?,
        Commands::Done { id, undo } => cli::handle_done(&mut services, id, undo).await?,
        Commands::Edit {
            id,
            text,
            date,
            time,
            clear_due,
        } => cli::handle_edit(&mut services, id, text, date, time, clear_due).await?,
        Commands::Delete { id } => cli::handle_delete(&mut services, id).await?,
        Commands::Ask { question } => cli::handle_ask(&mut services, question).await?,
        Commands::Suggest { id } => cli::handle_suggest(&mut services, id).await?,
    }

    Ok(())
}
