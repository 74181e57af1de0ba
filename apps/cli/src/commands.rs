//! CLI command implementations

use crate::output::{clean_filename, format_bytes, item_artist, item_id, item_title};
use crate::progress::{download_bar, finish_failed, finish_ok};
use crate::{ConfigAction, OutputFormat};
use anyhow::{bail, Context, Result};
use console::style;
use futures::stream::{self, StreamExt};
use indicatif::MultiProgress;
use mediarip_core::{build_client, Client, SettingsStore};
use mediarip_types::{MediaType, Settings, Source};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Build the client for `source` and log in
async fn logged_in_client(settings: &Settings, source: Source) -> Result<Box<dyn Client>> {
    let mut client = build_client(source, settings)?;
    client
        .login()
        .await
        .with_context(|| format!("Could not log in to {}", source))?;
    Ok(client)
}

fn default_quality(settings: &Settings, source: Source) -> u8 {
    match source {
        Source::Deezer => settings.deezer.quality,
        Source::Soundcloud => settings.soundcloud.quality,
        Source::Unknown => 0,
    }
}

// ============================================================================
// Download Commands
// ============================================================================

/// Number of tracks transferred at once, at least one
pub fn download_concurrency(settings: &Settings) -> usize {
    settings.downloads.concurrency.max(1)
}

pub async fn download(
    store: &SettingsStore,
    source: Source,
    ids: &[String],
    quality: Option<u8>,
    output: Option<PathBuf>,
) -> Result<()> {
    let settings = store.load().await?;
    let client = logged_in_client(&settings, source).await?;
    let quality = quality.unwrap_or_else(|| default_quality(&settings, source));

    let folder = output.unwrap_or_else(|| settings.downloads.folder.clone());
    tokio::fs::create_dir_all(&folder)
        .await
        .with_context(|| format!("Could not create {}", folder.display()))?;

    let multi = MultiProgress::new();
    let restrict = settings.downloads.restrict_characters;
    let results: Vec<(&String, Result<(PathBuf, u64)>)> = stream::iter(ids)
        .map(|id| {
            let client = client.as_ref();
            let (folder, multi) = (&folder, &multi);
            async move {
                let result = download_track(client, id, quality, folder, restrict, multi).await;
                (id, result)
            }
        })
        .buffer_unordered(download_concurrency(&settings))
        .collect()
        .await;

    let mut failed = 0;
    for (id, result) in &results {
        match result {
            Ok((path, bytes)) => println!(
                "{} {} ({})",
                style("✓").green().bold(),
                style(path.display()).cyan(),
                format_bytes(*bytes)
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {:#}", style("✗").red().bold(), id, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} download(s) failed", failed, results.len());
    }
    Ok(())
}

/// Resolve, name and download one track under a bar of `multi`
async fn download_track(
    client: &dyn Client,
    id: &str,
    quality: u8,
    folder: &Path,
    restrict: bool,
    multi: &MultiProgress,
) -> Result<(PathBuf, u64)> {
    let metadata = client.get_metadata(id, MediaType::Track).await?;
    let downloadable = client.get_downloadable(id, quality).await?;

    let stem = match item_artist(&metadata) {
        Some(artist) => format!("{} - {}", artist, item_title(&metadata)),
        None => item_title(&metadata),
    };
    let filename = clean_filename(&stem, downloadable.extension(), restrict);
    let path = folder.join(&filename);

    let total = match downloadable.size().await {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine size of {}: {}", filename, e);
            0
        }
    };

    let pb = multi.add(download_bar(total, &filename));
    match downloadable.download(&path, |n| pb.inc(n)).await {
        Ok(()) => {
            finish_ok(&pb);
            Ok((path, pb.position()))
        }
        Err(e) => {
            finish_failed(&pb, &e.to_string());
            Err(e.into())
        }
    }
}

// ============================================================================
// Search Commands
// ============================================================================

pub async fn search(
    store: &SettingsStore,
    source: Source,
    media_type: MediaType,
    query: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let settings = store.load().await?;
    let client = logged_in_client(&settings, source).await?;
    let results = client.search(media_type, query, limit).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct ResultRow {
                id: String,
                title: String,
                artist: String,
            }

            let rows: Vec<ResultRow> = results
                .iter()
                .map(|item| ResultRow {
                    id: item_id(item),
                    title: truncate(&item_title(item), 40),
                    artist: item_artist(item).unwrap_or_default(),
                })
                .collect();

            println!("{}", Table::new(rows));
        }
        OutputFormat::Human => {
            if results.is_empty() {
                println!("{}", style("No results found").dim());
                return Ok(());
            }

            for (i, item) in results.iter().enumerate() {
                print_result(i + 1, item);
            }
            println!();
            println!("{} result(s)", style(results.len()).bold());
        }
    }

    Ok(())
}

fn print_result(index: usize, item: &Value) {
    let artist = item_artist(item)
        .map(|a| format!(" by {}", a))
        .unwrap_or_default();

    println!(
        "{:>3}. {}{} {}",
        index,
        style(item_title(item)).bold(),
        artist,
        style(format!("[{}]", item_id(item))).dim()
    );
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

// ============================================================================
// Config Commands
// ============================================================================

pub async fn config_action(store: &SettingsStore, action: Option<ConfigAction>) -> Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let settings = store.load().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
        ConfigAction::Init => {
            if !store.init().await? {
                bail!("Settings file already exists at {}", store.path().display());
            }
            println!(
                "{} Created {}",
                style("✓").green().bold(),
                style(store.path().display()).cyan()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_follows_settings() {
        let mut settings = Settings::default();
        assert_eq!(download_concurrency(&settings), 4);

        settings.downloads.concurrency = 8;
        assert_eq!(download_concurrency(&settings), 8);

        settings.downloads.concurrency = 0;
        assert_eq!(download_concurrency(&settings), 1);
    }

    #[test]
    fn quality_defaults_per_source() {
        let mut settings = Settings::default();
        settings.soundcloud.quality = 1;
        assert_eq!(default_quality(&settings, Source::Deezer), 2);
        assert_eq!(default_quality(&settings, Source::Soundcloud), 1);
    }
}
