// src/cli/search.rs — `devflow papers` / `devflow datasets`

use std::path::PathBuf;

use anyhow::Context;

use crate::infra::config::Config;
use crate::infra::paths;
use crate::tools::{DatasetSearcher, PaperSearcher};

pub async fn run_papers(query: &str, top_n: Option<usize>, config: &Config) -> anyhow::Result<()> {
    let top_n = top_n.unwrap_or(config.search.top_n);
    let papers = PaperSearcher::new().search_papers(query, top_n).await?;

    if papers.is_empty() {
        eprintln!("No papers found for \"{}\"", query);
        return Ok(());
    }
    for (i, paper) in papers.iter().enumerate() {
        println!("{:>2}. {}", i + 1, paper.summary_line());
        if let Some(url) = paper.open_access_pdf.as_ref().and_then(|p| p.url.as_deref()) {
            println!("    {}", url);
        }
    }
    Ok(())
}

pub fn run_datasets(
    query: &str,
    catalog: Option<PathBuf>,
    top_n: Option<usize>,
    config: &Config,
) -> anyhow::Result<()> {
    let path = catalog
        .or_else(paths::dataset_catalog_path)
        .context("No dataset catalog given and no data directory available")?;

    let entries = DatasetSearcher::load_catalog(&path)?;
    let searcher = DatasetSearcher::from_config(entries, &config.search);
    tracing::debug!(indexed = searcher.len(), "Dataset catalog loaded");

    if searcher.is_empty() {
        eprintln!(
            "No datasets pass the popularity filter (likes >= {}, downloads >= {})",
            config.search.min_likes, config.search.min_downloads
        );
        return Ok(());
    }
    for hit in searcher.search(query, top_n.unwrap_or(config.search.top_n)) {
        println!(
            "{:.3}  {}  ({} likes, {} downloads)",
            hit.score,
            hit.entry.id,
            hit.entry.likes.unwrap_or(0),
            hit.entry.downloads.unwrap_or(0)
        );
    }
    Ok(())
}
