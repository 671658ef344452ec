use std::io::{BufRead, Write};
use std::time::Duration;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use promptgate::config::Config;
use promptgate::provider::{GeminiProvider, GenerativeProvider};

use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ModelsCommand {
    #[clap(
        long,
        help = "Gemini API key (defaults to the configured environment variable, then a prompt)"
    )]
    pub api_key: Option<String>,
}

impl ModelsCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let api_key = resolve_api_key(
            self.api_key.as_deref(),
            config.provider.server_credential(),
            &mut std::io::stdin().lock(),
            &mut std::io::stderr(),
        )?;

        let provider = GeminiProvider::new(
            &config.provider,
            Duration::from_secs(config.server.timeout_secs),
        )?;

        let models = generation_models(&provider, &api_key).await?;
        println!("{}", render_models(&models, format)?);
        Ok(())
    }
}

/// Pick the API key from the flag, the environment, or an interactive prompt
pub fn resolve_api_key<R: BufRead, W: Write>(
    flag: Option<&str>,
    configured: Option<String>,
    input: &mut R,
    prompt: &mut W,
) -> CliResult<String> {
    if let Some(key) = flag.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    if let Some(key) = configured {
        return Ok(key);
    }

    writeln!(prompt, "Enter your Gemini API key and press Enter:")?;
    prompt.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let key = line.trim();
    if key.is_empty() {
        return Err(CliError::MissingApiKey);
    }

    Ok(key.to_string())
}

/// Names of models that support `generateContent`, in provider order
pub async fn generation_models(
    provider: &dyn GenerativeProvider,
    api_key: &str,
) -> CliResult<Vec<String>> {
    tracing::debug!("Listing models via {}", provider.name());

    let models = provider.list_models(api_key).await?;
    Ok(models
        .into_iter()
        .filter(|m| m.supports_generation())
        .map(|m| m.name)
        .collect())
}

pub fn render_models(models: &[String], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "models": models });
            Ok(serde_json::to_string_pretty(&output)?)
        }
        OutputFormat::Table => {
            if models.is_empty() {
                return Ok("No models support content generation.".to_string());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["Model"]);
            for name in models {
                table.add_row(vec![name.as_str()]);
            }
            Ok(format!("{table}\n{} model(s)", models.len()))
        }
    }
}
