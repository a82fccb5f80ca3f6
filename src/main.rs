use clap::Parser;
use tubescribe::cli::{Cli, Commands, HistoryAction};
use tubescribe::commands;
use tubescribe::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tubescribe=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.command {
        // init-config never reads an existing file.
        Commands::InitConfig { .. } => Config::default(),
        _ => {
            let (config, path) = Config::load_with_path(cli.config.as_deref())?;
            if let Some(path) = path {
                tracing::debug!("Loaded config from {}", path.display());
            }
            config
        }
    };

    match cli.command {
        Commands::Transcribe {
            url,
            export,
            output,
        } => commands::transcribe(&config, &url, export, output.as_deref()).await,
        Commands::History { action } => match action {
            HistoryAction::List => commands::history_list(&config),
            HistoryAction::Show { job } => commands::history_show(&config, &job),
            HistoryAction::Delete { job } => commands::history_delete(&config, &job),
        },
        Commands::Edit {
            job,
            segment,
            speaker,
            text,
        } => commands::edit(&config, &job, &segment, speaker, text),
        Commands::Refine { job, segment } => commands::refine(&config, &job, &segment).await,
        Commands::Export {
            job,
            format,
            output,
        } => commands::export(&config, &job, format, output.as_deref()),
        Commands::Login { name, email } => commands::login(&config, &name, &email),
        Commands::Logout => commands::logout(&config),
        Commands::Whoami => commands::whoami(&config),
        Commands::InitConfig { output } => commands::init_config(output),
    }
}
