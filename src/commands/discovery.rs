//! Discovery command handlers.
//!
//! `shuffle`, `progress`, `reset` and `forget` all open the same
//! [`Session`](super::Session): the collection snapshot plus an engine over
//! the persisted ledger.

use super::{FilterArgs, Session};
use rekindle::{BookmarkFilter, BookmarkRef, EngineState, RekindleConfig};

/// Shuffle command: prints a batch of unseen bookmarks and records it.
pub fn cmd_shuffle(
    config: &RekindleConfig,
    count: Option<usize>,
    filters: &FilterArgs,
    no_commit: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(config);
    let pool = session.bookmarks()?;
    let filter = filters.to_filter();
    let count = config.discovery.batch_size(count);

    let result = session.engine.select_batch(&pool, &filter, count)?;

    if result.cycle_completed || session.engine.state() == EngineState::JustReset {
        println!("You have seen every matching bookmark. Starting a new cycle.");
        println!();
        session.engine.acknowledge_reset();
    }

    if result.is_empty() {
        println!("No bookmarks match.");
        return Ok(());
    }

    for (index, bookmark) in result.selected.iter().enumerate() {
        println!("{}", format_entry(index + 1, bookmark));
    }

    let progress = session.engine.progress(&pool, &filter)?;
    let shown_after = if no_commit {
        progress.shown
    } else {
        session
            .engine
            .commit(result.selected.iter().map(|b| b.id.clone()))?;
        progress.shown + result.selected.len()
    };

    println!();
    println!(
        "{shown_after}/{} shown{}",
        progress.total,
        if no_commit { " (not recorded)" } else { "" }
    );

    Ok(())
}

/// Progress command: prints shown/total for the filtered collection.
pub fn cmd_progress(
    config: &RekindleConfig,
    filters: &FilterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(config);
    let pool = session.bookmarks()?;
    let progress = session.engine.progress(&pool, &filters.to_filter())?;

    println!(
        "{}/{} shown ({} remaining)",
        progress.shown,
        progress.total,
        progress.remaining()
    );

    Ok(())
}

/// Reset command: clears the shown history.
pub fn cmd_reset(config: &RekindleConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(config);

    // Record the current collection size as the new watermark when possible.
    match session.bookmarks() {
        Ok(pool) => {
            session.engine.progress(&pool, &BookmarkFilter::new())?;
        },
        Err(e) => tracing::warn!(error = %e, "Resetting without reading the collection"),
    }

    let cleared = session.engine.shown_count()?;
    session.engine.reset_history()?;
    println!("Cleared {cleared} shown bookmark(s).");

    Ok(())
}

/// Forget command: drops a deleted or merged bookmark from the history.
pub fn cmd_forget(config: &RekindleConfig, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(config);
    let id = session.normalizer.identifier_for(url);

    if session.engine.on_bookmark_removed(&id)? {
        println!("Forgot {id}");
    } else {
        println!("{id} was not in the shown history");
    }

    Ok(())
}

fn format_entry(position: usize, bookmark: &BookmarkRef) -> String {
    let title = if bookmark.title.trim().is_empty() {
        "(untitled)"
    } else {
        bookmark.title.as_str()
    };
    let rating = bookmark
        .rating
        .map_or_else(String::new, |r| format!(", rated {r}"));

    format!(
        "{position:>3}. {title}\n     {}  [{}{rating}]",
        bookmark.url, bookmark.category
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry() {
        let bookmark = BookmarkRef::new("https://a.example/", "https://a.example", "Alpha")
            .with_category(Some("Reading"))
            .with_rating(Some(4));
        assert_eq!(
            format_entry(2, &bookmark),
            "  2. Alpha\n     https://a.example  [Reading, rated 4]"
        );
    }

    #[test]
    fn test_format_entry_untitled() {
        let bookmark = BookmarkRef::new("https://b.example/", "https://b.example", " ");
        let entry = format_entry(10, &bookmark);
        assert!(entry.starts_with(" 10. (untitled)"));
        assert!(entry.ends_with("[Uncategorized]"));
    }
}
