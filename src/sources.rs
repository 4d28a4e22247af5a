use anyhow::Result;

use crate::config::Config;
use crate::ingest::Loader;
use crate::models::Provider;

pub async fn list_sources(config: &Config, loader: &Loader) -> Result<()> {
    println!(
        "{:<10} {:<8} {:<44} PENDING",
        "PROVIDER", "ENABLED", "INTAKE DIR"
    );

    for provider in Provider::ALL {
        let dir = config.intake.provider_dir(provider);
        let pending = if !dir.is_dir() {
            "NOT FOUND".to_string()
        } else {
            loader.pending(provider).await?.len().to_string()
        };
        println!(
            "{:<10} {:<8} {:<44} {}",
            provider,
            config.intake.is_enabled(provider),
            dir.display(),
            pending
        );
    }

    Ok(())
}
