use pawkit_core::models::{Card, CardType};
use pawkit_core::sync::SyncService;

use crate::commands::common::format_card_line;
use crate::error::CliError;

/// Save a card locally and queue it for sync
pub async fn run_add(
    service: &SyncService,
    title: &[String],
    url: Option<String>,
    notes: Option<String>,
    tags: Vec<String>,
) -> Result<(), CliError> {
    let title = title.join(" ").trim().to_string();
    if title.is_empty() && url.is_none() && notes.is_none() {
        return Err(CliError::EmptyContent);
    }

    let mut card = match (url.as_deref(), notes.as_deref()) {
        (Some(url), _) => Card::url(fallback_title(&title, url), url),
        (None, Some(notes)) => Card::note(fallback_title(&title, notes), notes),
        (None, None) => Card {
            card_type: CardType::Note,
            title: title.clone(),
            ..Card::default()
        },
    };
    card.tags = tags;

    let record = service.create(card).await?;
    println!("Saved: {}", format_card_line(&record));
    println!("(queued for sync; run `pawkit sync` to push now)");
    Ok(())
}

/// Quick capture: a URL becomes a url card, anything else a note card
pub async fn run_quick_capture(service: &SyncService, words: &[String]) -> Result<(), CliError> {
    let content = words.join(" ").trim().to_string();
    if content.is_empty() {
        return Err(CliError::EmptyContent);
    }

    let card = if content.starts_with("http://") || content.starts_with("https://") {
        Card::url(content.clone(), content)
    } else {
        Card::note(first_words(&content, 8), content.clone())
    };

    let record = service.create(card).await?;
    println!("Saved: {}", format_card_line(&record));
    Ok(())
}

fn fallback_title(title: &str, source: &str) -> String {
    if title.is_empty() {
        first_words(source, 8)
    } else {
        title.to_string()
    }
}

fn first_words(text: &str, count: usize) -> String {
    text.split_whitespace()
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_words_truncates() {
        assert_eq!(first_words("one two three four", 2), "one two");
        assert_eq!(first_words("short", 8), "short");
    }

    #[test]
    fn test_fallback_title_prefers_explicit() {
        assert_eq!(fallback_title("My title", "ignored body"), "My title");
        assert_eq!(fallback_title("", "body words here"), "body words here");
    }
}
