use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::Parser;

use treelight::{HighlightOptions, LanguageDefinition, Treelight, TreelightConfig};

mod cli;

use cli::{Action, CliArgs, Input};

fn read_input(input: &Input) -> Result<String> {
    match input {
        Input::Stdin => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("Failed to read stdin")?;
            Ok(code)
        }
        Input::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    treelight::tracing::init();

    let run = CliArgs::parse()
        .into_config()
        .map_err(|e| anyhow::anyhow!(e))?;

    let config = match &run.config {
        Some(path) => TreelightConfig::load_from(path).map_err(|e| anyhow::anyhow!(e))?,
        None => TreelightConfig::load(),
    };

    let highlighter = Treelight::from_config(&config);
    for path in &run.language_files {
        let definition = LanguageDefinition::from_file(path)
            .with_context(|| format!("Failed to load language manifest {}", path.display()))?;
        let id = definition.id.clone();
        highlighter.register_language(&id, definition);
    }

    let mut stdout = std::io::stdout().lock();
    match run.action {
        Action::ListThemes => {
            for id in highlighter.theme_ids() {
                writeln!(stdout, "{id}")?;
            }
        }
        Action::ListLanguages => {
            for id in highlighter.language_ids() {
                writeln!(stdout, "{id}")?;
            }
        }
        Action::Highlight { input, language } => {
            let code = read_input(&input)?;
            let options = HighlightOptions {
                theme: run.theme,
                strict: run.strict.unwrap_or(config.strict),
                timeout: run.timeout,
            };
            let html = highlighter
                .highlight(&code, &language, &options)
                .await
                .with_context(|| format!("Failed to highlight as {language}"))?;
            writeln!(stdout, "{html}")?;
        }
    }

    Ok(())
}
