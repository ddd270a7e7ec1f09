//! The `markwise init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("markwise.toml").exists() {
        println!("markwise.toml already exists, skipping.");
    } else {
        std::fs::write("markwise.toml", SAMPLE_CONFIG)?;
        println!("Created markwise.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit markwise.toml with your API keys");
    println!("  2. Run: markwise list-judges");
    println!(
        "  3. Run: markwise grade --student s1 --question-id q1 --subject Databases \\\n       \
         --question \"What is a primary key?\" --answer \"...\" --reference \"...\""
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# markwise configuration

default_judge = "openai"
default_model = "gpt-4o"
temperature = 0.3
max_retries = 3
retry_delay_ms = 1000
parallelism = 4
history_path = "markwise-history.json"

[judges.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[judges.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"
model = "claude-sonnet-4-20250514"

# Offline judge with a fixed verdict, handy for trying things out.
[judges.offline]
type = "mock"
score = 75
feedback = "Offline judge: no external feedback available"

[scoring]
lexical = 0.4
semantic = 0.4
grammar = 0.2
local_share = 0.5
"#;
