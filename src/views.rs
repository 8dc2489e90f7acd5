//! Flattens Web API payloads into display-ready [`ViewItem`]s.
//!
//! Raw items arrive as untyped JSON trees. This is the only place that looks
//! at their shape: every lookup tolerates missing or mistyped fields, so one
//! odd item loses its optional fields instead of failing the whole page.
//!
//! # Artwork
//!
//! Spotify lists images largest first (typically 640px, 300px, 64px). Every
//! view takes the image at [`ARTWORK_INDEX`], the medium rendition, and falls
//! back to the only image when there is just one.

use std::{iter::Enumerate, iter::Take, slice};

use serde_json::Value;

use crate::types::{RawItem, UserProfile, ViewItem, ViewKind};

/// Position of the preferred rendition in a size-ordered image list.
pub const ARTWORK_INDEX: usize = 1;

/// Flattens a track object: `name`, `artists[].name`, `album`, `external_urls`.
pub fn build_track_view(raw: &RawItem) -> ViewItem {
    track_view(raw, ViewKind::Track)
}

/// Flattens an artist object: `name`, `genres[]`, `images[]`, `external_urls`.
pub fn build_artist_view(raw: &RawItem) -> ViewItem {
    ViewItem {
        position: 0,
        kind: ViewKind::Artist,
        name: text(raw, "name"),
        subtitle: join_strings(raw.get("genres")),
        album: None,
        album_url: None,
        image: select_image(raw.get("images")),
        url: external_url(raw),
        played_at: None,
    }
}

/// Flattens a play history entry, whose track sits one level deeper under
/// `track`, next to `played_at`.
pub fn build_history_view(raw: &RawItem) -> ViewItem {
    let mut item = track_view(raw.get("track").unwrap_or(&Value::Null), ViewKind::History);
    item.played_at = raw
        .get("played_at")
        .and_then(Value::as_str)
        .map(str::to_string);
    item
}

pub fn build_view(kind: ViewKind, raw: &RawItem) -> ViewItem {
    match kind {
        ViewKind::Track => build_track_view(raw),
        ViewKind::Artist => build_artist_view(raw),
        ViewKind::History => build_history_view(raw),
    }
}

/// Wraps a page of raw items. Nothing is built until the page is iterated,
/// and it can be iterated any number of times.
///
/// Output keeps the input order and stops after `limit` items.
pub fn build_page(kind: ViewKind, raw_items: &[RawItem], limit: u32) -> Page<'_> {
    Page {
        kind,
        raw_items,
        limit: usize::try_from(limit).unwrap_or(usize::MAX),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    kind: ViewKind,
    raw_items: &'a [RawItem],
    limit: usize,
}

impl<'a> Page<'a> {
    pub fn iter(&self) -> PageIter<'a> {
        PageIter {
            kind: self.kind,
            inner: self.raw_items.iter().take(self.limit).enumerate(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw_items.len().min(self.limit)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<ViewItem> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for Page<'a> {
    type Item = ViewItem;
    type IntoIter = PageIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &Page<'a> {
    type Item = ViewItem;
    type IntoIter = PageIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct PageIter<'a> {
    kind: ViewKind,
    inner: Enumerate<Take<slice::Iter<'a, RawItem>>>,
}

impl Iterator for PageIter<'_> {
    type Item = ViewItem;

    fn next(&mut self) -> Option<Self::Item> {
        let (position, raw) = self.inner.next()?;
        let mut item = build_view(self.kind, raw);
        item.position = position;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for PageIter<'_> {}

/// Flattens the `/me` profile object.
pub fn build_profile(raw: &RawItem) -> UserProfile {
    let display_name = raw
        .get("display_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| text(raw, "id"));

    UserProfile {
        id: text(raw, "id"),
        display_name,
        country: raw.get("country").and_then(Value::as_str).map(str::to_string),
        product: raw.get("product").and_then(Value::as_str).map(str::to_string),
        followers: raw
            .get("followers")
            .and_then(|f| f.get("total"))
            .and_then(Value::as_u64)
            .unwrap_or_default(),
        // profile pictures are often a single image
        image: select_image(raw.get("images")),
        url: external_url(raw),
    }
}

/// Picks the preferred rendition from a size-ordered image list.
pub fn select_image(images: Option<&Value>) -> Option<String> {
    let images = images?.as_array()?;
    let image = images.get(ARTWORK_INDEX).or_else(|| images.first())?;
    image.get("url")?.as_str().map(str::to_string)
}

fn track_view(track: &Value, kind: ViewKind) -> ViewItem {
    let album = track.get("album");

    ViewItem {
        position: 0,
        kind,
        name: text(track, "name"),
        subtitle: join_names(track.get("artists")),
        album: album
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        album_url: album.and_then(external_url),
        image: select_image(album.and_then(|a| a.get("images"))),
        url: external_url(track),
        played_at: None,
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn external_url(value: &Value) -> Option<String> {
    value
        .get("external_urls")?
        .get("spotify")?
        .as_str()
        .map(str::to_string)
}

/// Joins the `name` of every object in an array with `", "`.
fn join_names(values: Option<&Value>) -> String {
    values
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("name").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn join_strings(values: Option<&Value>) -> String {
    values
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}
