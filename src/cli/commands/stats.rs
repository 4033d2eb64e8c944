use crate::config::Config;
use crate::db::Store;

pub async fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let stats = store.catalog_stats().await?;

    println!("Catalog");
    println!("{:-<40}", "");
    println!("  Shows:          {}", stats.shows_total);
    println!("    Movies:       {}", stats.movies);
    println!("    Series:       {}", stats.series);
    println!("  Seasons:        {}", stats.seasons);
    println!("  Episodes:       {}", stats.episodes);
    println!("  Video sources:  {}", stats.video_sources);
    println!("  Total views:    {}", stats.total_views);
    println!("  Users:          {}", stats.users);
    println!("  Pending uploads: {}", stats.pending_uploads);

    Ok(())
}
