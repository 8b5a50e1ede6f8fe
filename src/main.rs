use anyhow::Context;
use background_service::{BackgroundService, ContentFilter, FilterMode, SeenSet};
use discord_webhook::WebhookClient;
use llm_interface::OpenAiProvider;
use reddit_client::RedditClient;
use subwatch_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("subwatch=info,background_service=info,reddit_client=info,discord_webhook=info,llm_interface=info")
        }))
        .init();

    tracing::info!("Starting subwatch - Reddit keyword watcher");

    if let Err(e) = run().await {
        tracing::error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Load .env in development; absence is fine.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("configuration")?;

    let source = RedditClient::new(
        config.reddit_client_id.clone(),
        config.reddit_client_secret.clone(),
        config.reddit_user_agent.clone(),
    )
    .context("failed to build Reddit client")?;

    let delivery =
        WebhookClient::new(&config.discord_webhook_url).context("failed to build webhook client")?;

    let seen = SeenSet::load_or_init(&config.state_file).context("failed to load seen set")?;

    match config.ai {
        Some(ai) => {
            tracing::info!("AI relevance gate enabled ({})", ai.model);
            let provider = OpenAiProvider::new(ai.api_key, ai.model, ai.api_base)
                .context("failed to build LLM provider")?;
            let filter = ContentFilter::new(
                &config.search_term,
                FilterMode::KeywordPlusAi {
                    provider,
                    prompt: ai.prompt,
                },
            );
            BackgroundService::new(
                source,
                filter,
                delivery,
                seen,
                config.subreddits,
                config.state_file,
                config.poll_interval_secs,
            )
            .run()
            .await?;
        }
        None => {
            tracing::info!("AI relevance gate disabled, keyword matching only");
            let filter: ContentFilter<OpenAiProvider> =
                ContentFilter::new(&config.search_term, FilterMode::KeywordOnly);
            BackgroundService::new(
                source,
                filter,
                delivery,
                seen,
                config.subreddits,
                config.state_file,
                config.poll_interval_secs,
            )
            .run()
            .await?;
        }
    }

    Ok(())
}
