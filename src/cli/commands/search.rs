use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_search(config: &Config, query: &str) -> anyhow::Result<()> {
    println!("Searching for: {query}");

    let shared = SharedState::new(config.clone()).await?;
    let hits = shared.catalog.search(query, None, 10).await?;

    if hits.is_empty() {
        println!("No show found matching '{query}'");
        return Ok(());
    }

    println!();
    println!("Search Results:");
    println!("{:-<60}", "");

    for hit in &hits {
        let year = hit
            .show
            .year()
            .map_or_else(|| "????".to_string(), |y| y.to_string());
        println!("• {} ({year})", hit.show.title);
        println!(
            "  ID: {} | Type: {} | Score: {:.1} | Views: {}",
            hit.show.id, hit.show.kind, hit.score, hit.show.views
        );
        if !hit.matched_fields.is_empty() {
            println!("  Matched: {}", hit.matched_fields.join(", "));
        }
        println!();
    }

    Ok(())
}
