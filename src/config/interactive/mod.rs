
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, EmbeddingConfig, EmbeddingProvider, RetrievalConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 NutriVeda RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Configure the embedding service used for ingestion and retrieval.");
    eprintln!();

    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    config.retrieval.top_k = Input::new()
        .with_prompt("Number of food facts to retrieve per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), ConfigError> {
            RetrievalConfig::check_top_k(*input).map(|_| ())
        })
        .interact_text()?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_embedding_connection(&config.embedding) {
        eprintln!(
            "{}",
            style("✓ Embedding endpoint reachable!").green()
        );
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the embedding endpoint").yellow()
        );
        eprintln!("You can continue, but ingestion and retrieval will fail until it is reachable.");
    }

    if config.embedding.provider == EmbeddingProvider::OpenAi
        && config.embedding.api_key().is_err()
    {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Warning: {} is not set in this environment",
                config.embedding.api_key_env
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Embedding Settings:").bold().yellow());
    println!("  Provider: {}", style(config.embedding.provider).cyan());
    match config.embedding.endpoint_url() {
        Ok(url) => println!("  Endpoint: {}", style(url).cyan()),
        Err(e) => println!("  Endpoint: {} ({})", style("Invalid").red(), e),
    }
    println!("  Model: {}", style(&config.embedding.model).cyan());
    if config.embedding.provider == EmbeddingProvider::OpenAi {
        let key_state = if config.embedding.api_key().is_ok() {
            style("set").green()
        } else {
            style("missing").red()
        };
        println!(
            "  API key variable: {} ({})",
            style(&config.embedding.api_key_env).cyan(),
            key_state
        );
    }
    println!(
        "  Batch Size: {}",
        style(config.embedding.batch_size).cyan()
    );
    println!(
        "  Timeout: {}s, retries: {}",
        style(config.embedding.timeout_seconds).cyan(),
        style(config.embedding.retry_attempts).cyan()
    );

    println!();
    println!("{}", style("Store & Retrieval:").bold().yellow());
    println!(
        "  Store file: {}",
        style(config.store_path().display()).cyan()
    );
    println!("  Top K: {}", style(config.retrieval.top_k).cyan());

    println!();
    println!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let providers = [EmbeddingProvider::OpenAi, EmbeddingProvider::Ollama];
    let current = providers
        .iter()
        .position(|p| *p == embedding.provider)
        .unwrap_or_default();

    let selection = Select::new()
        .with_prompt("Embedding provider")
        .items(&["OpenAI-compatible API (OpenRouter, OpenAI)", "Local Ollama"])
        .default(current)
        .interact()?;
    embedding.set_provider(providers.get(selection).copied().unwrap_or_default());

    let base_url: String = Input::new()
        .with_prompt("Endpoint base URL")
        .default(embedding.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = EmbeddingConfig {
                base_url: input.clone(),
                ..EmbeddingConfig::default()
            };
            temp_config.endpoint_url()?;
            Ok(())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    if embedding.provider == EmbeddingProvider::OpenAi {
        let api_key_env: String = Input::new()
            .with_prompt("Environment variable holding the API key")
            .default(embedding.api_key_env.clone())
            .interact_text()?;
        embedding.set_api_key_env(api_key_env)?;
    }

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout (seconds)")
        .default(embedding.timeout_seconds)
        .interact_text()?;

    embedding.set_base_url(base_url)?;
    embedding.set_model(model)?;
    embedding.set_batch_size(batch_size)?;
    embedding.set_timeout_seconds(timeout_seconds)?;

    Ok(())
}

/// Check the provider's model listing endpoint. Client errors still prove the
/// server is reachable.
fn test_embedding_connection(embedding: &EmbeddingConfig) -> bool {
    let Ok(base) = embedding.endpoint_url() else {
        return false;
    };
    let check_url = match embedding.provider {
        EmbeddingProvider::OpenAi => base.join("models"),
        EmbeddingProvider::Ollama => base.join("api/version"),
    };
    let Ok(url) = check_url else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    let mut request = agent.get(url.as_str());
    if let Ok(key) = embedding.api_key() {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    match request.call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
