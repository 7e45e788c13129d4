//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use ferret_core::FerretConfig;
use futures::StreamExt;
use std::io::Write;
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    config: &FerretConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, config, workspace),
        Commands::Chat { prompt } => handle_chat(&prompt, config).await,
    }
}

fn handle_config(action: ConfigAction, config: &FerretConfig, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".ferret");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = ferret_core::to_masked_toml(&FerretConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", ferret_core::to_masked_toml(config)?);
            Ok(())
        }
    }
}

async fn handle_chat(prompt: &str, config: &FerretConfig) -> anyhow::Result<()> {
    let generator = ferret_core::create_text_generator(&config.llm)?;
    let mut stream = generator.stream(prompt, &[], None).await?;

    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        print!("{}", chunk?);
        stdout.flush()?;
    }
    println!();
    Ok(())
}
