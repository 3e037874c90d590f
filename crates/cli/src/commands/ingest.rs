//! `duneguide ingest`: Load deal passages into the collection.

use duneguide_core::store::PassageStore;
use std::path::Path;
use tracing::info;

use super::{CmdResult, backend, load_config, open_store};

pub async fn run(config_path: Option<&Path>, file: &Path) -> CmdResult {
    let config = load_config(config_path)?;

    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let passages = parse_passages(&text)?;
    if passages.is_empty() {
        println!("  No passages found in {}", file.display());
        return Ok(());
    }

    let backend = backend(&config)?;
    let store = open_store(&config, backend.embedder).await?;

    let before = store.count().await?;
    let ids = store.add(passages).await?;
    let after = store.count().await?;

    info!(
        collection = %store.collection(),
        submitted = ids.len(),
        new = after - before,
        "Ingest complete"
    );
    println!(
        "  ✅ {} passages processed, {} new ({} total in '{}')",
        ids.len(),
        after - before,
        after,
        store.collection()
    );
    Ok(())
}

/// Split an ingest file into passages.
///
/// A JSON array holds strings or objects with a `content` field; any other
/// text is one passage per non-empty line.
pub fn parse_passages(text: &str) -> Result<Vec<String>, String> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('[') {
        return Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect());
    }

    let items: Vec<serde_json::Value> =
        serde_json::from_str(trimmed).map_err(|e| format!("Invalid JSON array: {e}"))?;

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let content = match &item {
                serde_json::Value::String(s) => Some(s.as_str()),
                serde_json::Value::Object(map) => map.get("content").and_then(|c| c.as_str()),
                _ => None,
            };
            match content.map(str::trim) {
                Some("") => None,
                Some(c) => Some(Ok(c.to_string())),
                None => Some(Err(format!("Item {i} has no text content"))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_passage_per_line() {
        let passages =
            parse_passages("Burj Khalifa At the Top: 149 AED\n\n  Desert safari: 150 AED  \n")
                .unwrap();
        assert_eq!(
            passages,
            ["Burj Khalifa At the Top: 149 AED", "Desert safari: 150 AED"]
        );
    }

    #[test]
    fn json_strings_and_objects() {
        let passages = parse_passages(
            r#"[
                "Dhow cruise: 120 AED",
                {"content": "Aquarium: 90 AED", "category": "family"},
                ""
            ]"#,
        )
        .unwrap();
        assert_eq!(passages, ["Dhow cruise: 120 AED", "Aquarium: 90 AED"]);
    }

    #[test]
    fn json_item_without_content_is_an_error() {
        let err = parse_passages(r#"[{"title": "no body"}]"#).unwrap_err();
        assert!(err.contains("Item 0"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_passages("[not json").is_err());
    }
}
