use clap::Parser;
use color_eyre::Result;
use reminders::cli::{self, Cli, Commands};
use reminders::{Config, Database, Profile, TaskRepository, TaskService};
use std::path::Path;
use std::time::Duration;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps a separate config and database
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(Path::new(path), profile)?,
        None => Config::load_with_profile(profile)?,
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    reminders::logging::init_logging(level, &config.get_log_dir())?;
    log::info!("event=startup profile={:?} version={}", profile, env!("CARGO_PKG_VERSION"));

    let db = Database::new(config.get_database_path())?;
    let repo = TaskRepository::new(db, config.scheduled_months);
    let mut service = TaskService::new(repo, config.reminder_time()?);

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = reminders::tui::App::new(config, service)?;
            reminders::tui::run_event_loop(app)?;
        }
        Commands::Add { title, notes, date, time, flag } => {
            cli::handle_add(&mut service, title, notes, date, time, flag)?;
        }
        Commands::List { view, json } => cli::handle_list(&service, view, json)?,
        Commands::Search { query, json } => cli::handle_search(&service, &query, json)?,
        Commands::Show { id, json } => cli::handle_show(&service, id, json)?,
        Commands::Complete { id } => cli::handle_set_completion(&mut service, id, true)?,
        Commands::Reopen { id } => cli::handle_set_completion(&mut service, id, false)?,
        Commands::Flag { id } => cli::handle_flag(&mut service, id)?,
        Commands::Delete { id } => cli::handle_delete(&mut service, id)?,
        Commands::ClearCompleted => cli::handle_clear_completed(&mut service)?,
        Commands::Nuke { yes } => cli::handle_nuke(&mut service, yes)?,
        Commands::Counts { json } => cli::handle_counts(&service, json)?,
        Commands::Watch => {
            let poll = Duration::from_secs(config.poll_interval_secs);
            let resync = Duration::from_secs(config.resync_interval_secs);
            cli::handle_watch(service, poll, resync)?;
        }
    }

    Ok(())
}
