//! `search`: find a place by name and save it as the location.
//!
//! With a query the results are listed and the first match is saved unless the
//! terminal is interactive, in which case the user picks one. Without a query
//! an interactive prompt searches as the user types, once typing pauses.

use anyhow::Result;
use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use std::io::{IsTerminal, Write, stdout};
use std::time::{Duration, Instant};

use super::report_error;
use crate::config::SettingsStore;
use crate::provider::geocoding::{Debouncer, GeocodingClient, PlaceCandidate, is_searchable};

/// Save `place` as the configured location, address label included.
pub fn save_place(store: &mut SettingsStore, place: &PlaceCandidate) -> Result<()> {
    store.update(|settings| {
        settings.set_location(
            place.latitude,
            place.longitude,
            Some(place.address_label()),
        )
    })?;

    log_block_start!("Location saved");
    log_indented!("{}", place.display_name());
    log_indented!("{:.4}, {:.4}", place.latitude, place.longitude);
    log_indented!("in {}", store.path().display());
    Ok(())
}

/// Candidate chosen by a digit key, 1-based as listed.
pub fn choice_index(key: char, candidates: usize) -> Option<usize> {
    let n = key.to_digit(10)? as usize;
    (1..=candidates).contains(&n).then(|| n - 1)
}

pub fn handle_search_command(query: Option<String>) -> Result<()> {
    log_version!();

    let client = GeocodingClient::new()?;
    let mut store = SettingsStore::load()?;
    let interactive = std::io::stdin().is_terminal() && stdout().is_terminal();

    let chosen = match query {
        Some(query) => search_once(&client, &query, interactive)?,
        None if interactive => search_as_you_type(&client)?,
        None => {
            log_pipe!();
            log_error!("No query given and the terminal is not interactive");
            log_indented!("Usage: qiyam search <place>");
            log_end!();
            anyhow::bail!("Missing search query");
        }
    };

    match chosen {
        Some(place) => save_place(&mut store, &place)?,
        None => log_block_start!("Location unchanged"),
    }
    log_end!();
    Ok(())
}

fn search_once(
    client: &GeocodingClient,
    query: &str,
    interactive: bool,
) -> Result<Option<PlaceCandidate>> {
    if !is_searchable(query) {
        log_pipe!();
        log_warning!("Query '{}' is too short to search", query.trim());
        return Ok(None);
    }

    let candidates = match client.search(query) {
        Ok(candidates) => candidates,
        Err(error) => {
            report_error(&error);
            return Err(error.into());
        }
    };

    if candidates.is_empty() {
        log_pipe!();
        log_warning!("No places found for '{}'", query.trim());
        return Ok(None);
    }

    log_block_start!("Places matching '{}'", query.trim());
    for (i, place) in candidates.iter().enumerate() {
        log_indented!("{}. {}", i + 1, place.display_name());
    }

    if !interactive || candidates.len() == 1 {
        return Ok(candidates.into_iter().next());
    }

    log_block_start!("Press 1-{} to choose, Esc to cancel", candidates.len());
    let picked = with_raw_mode(|| {
        loop {
            if let Event::Key(key) = event::read()? {
                if is_cancel(&key) {
                    return Ok(None);
                }
                if let KeyCode::Char(c) = key.code
                    && let Some(i) = choice_index(c, candidates.len())
                {
                    return Ok(Some(i));
                }
            }
        }
    })?;

    Ok(picked.and_then(|i| candidates.into_iter().nth(i)))
}

fn search_as_you_type(client: &GeocodingClient) -> Result<Option<PlaceCandidate>> {
    log_block_start!("Type a place name. Enter picks the first match, 1-5 picks by number, Esc cancels.");

    with_raw_mode(|| {
        let mut query = String::new();
        let mut debouncer = Debouncer::default();
        let mut candidates: Vec<PlaceCandidate> = Vec::new();
        redraw(&query, &candidates)?;

        loop {
            let now = Instant::now();
            if let Some(ready) = debouncer.poll(now) {
                candidates = match client.search(&ready) {
                    Ok(found) => found,
                    Err(error) => {
                        log_debug!("Place search failed: {}", error);
                        Vec::new()
                    }
                };
                redraw(&query, &candidates)?;
            }

            let wait = debouncer
                .remaining(now)
                .unwrap_or(Duration::from_millis(250));
            if !event::poll(wait)? {
                continue;
            }

            let Event::Key(key) = event::read()? else {
                continue;
            };
            if is_cancel(&key) {
                return Ok(None);
            }

            match key.code {
                KeyCode::Enter => {
                    if let Some(first) = candidates.first() {
                        return Ok(Some(first.clone()));
                    }
                }
                KeyCode::Char(c) if !candidates.is_empty() && c.is_ascii_digit() => {
                    if let Some(i) = choice_index(c, candidates.len()) {
                        return Ok(Some(candidates[i].clone()));
                    }
                }
                KeyCode::Char(c) => {
                    query.push(c);
                    debouncer.keystroke(&query, Instant::now());
                }
                KeyCode::Backspace => {
                    query.pop();
                    debouncer.keystroke(&query, Instant::now());
                    if !is_searchable(&query) {
                        candidates.clear();
                    }
                }
                _ => continue,
            }
            redraw(&query, &candidates)?;
        }
    })
}

fn is_cancel(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Rewrite the prompt and the result list below it, leaving the cursor on the prompt line.
fn redraw(query: &str, candidates: &[PlaceCandidate]) -> Result<()> {
    let mut out = stdout();
    execute!(
        out,
        MoveToColumn(0),
        Clear(ClearType::FromCursorDown),
        Print(format!("┃ Search: {query}"))
    )?;
    for (i, place) in candidates.iter().enumerate() {
        execute!(out, Print(format!("\r\n┃   {}. {}", i + 1, place.display_name())))?;
    }
    if !candidates.is_empty() {
        execute!(out, MoveUp(candidates.len() as u16))?;
    }
    execute!(
        out,
        MoveToColumn(0),
        Print(format!("┃ Search: {query}"))
    )?;
    out.flush()?;
    Ok(())
}

/// Run `body` with the terminal in raw mode, restoring it on every exit path.
fn with_raw_mode<T>(body: impl FnOnce() -> Result<T>) -> Result<T> {
    enable_raw_mode()?;
    let result = body();
    disable_raw_mode()?;

    // Leave the prompt area before normal logging resumes
    let mut out = stdout();
    execute!(out, Print("\r\n"), Clear(ClearType::FromCursorDown))?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_index() {
        assert_eq!(choice_index('1', 3), Some(0));
        assert_eq!(choice_index('3', 3), Some(2));
        assert_eq!(choice_index('4', 3), None);
        assert_eq!(choice_index('0', 3), None);
        assert_eq!(choice_index('x', 3), None);
    }

    #[test]
    fn test_is_cancel() {
        assert!(is_cancel(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_cancel(&KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!is_cancel(&KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::NONE
        )));
    }
}
