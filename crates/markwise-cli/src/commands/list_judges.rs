//! The `markwise list-judges` command.

use std::path::PathBuf;

use anyhow::Result;

use markwise_judges::config::load_config_from;
use markwise_judges::JudgeConfig;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    if config.judges.is_empty() {
        println!("No judges configured. Run `markwise init` to create a config file.");
        return Ok(());
    }

    let mut names: Vec<&String> = config.judges.keys().collect();
    names.sort();

    for name in names {
        let kind = match &config.judges[name] {
            JudgeConfig::OpenAI { .. } => "openai",
            JudgeConfig::Anthropic { .. } => "anthropic",
            JudgeConfig::Mock { .. } => "mock",
        };
        let marker = if *name == config.default_judge {
            " (default)"
        } else {
            ""
        };
        println!("{name}: {kind}{marker}");
    }

    println!("\nDefault model: {}", config.default_model);

    Ok(())
}
