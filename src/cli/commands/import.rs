use crate::config::Config;
use crate::models::ShowKind;
use crate::state::SharedState;

pub async fn cmd_import(config: &Config, tmdb_id: i32, kind: ShowKind) -> anyhow::Result<()> {
    if config.tmdb.api_key.is_empty() {
        println!("TMDB API key is not configured. Set tmdb.api_key or TMDB_API_KEY.");
        return Ok(());
    }

    let shared = SharedState::new(config.clone()).await?;
    println!("Importing TMDB {tmdb_id} as {kind}...");

    let imported = shared.catalog.import_from_tmdb(tmdb_id, kind).await?;

    println!("✓ Imported: {}", imported.show.title);
    println!("  ID: {}", imported.show.id);
    if let Some(date) = imported.show.release_date.as_deref() {
        println!("  Release: {date}");
    }
    println!(
        "  Season {}: {} (id {})",
        imported.season.season_number, imported.season.name, imported.season.id
    );

    Ok(())
}
