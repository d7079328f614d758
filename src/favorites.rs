use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::{FavoriteRecord, VideoRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
  Added,
  Removed,
}

/// Favorited videos, newest first, mirrored to a JSON file.
///
/// Each mutation writes the complete list to disk before the in-memory copy is
/// replaced, so a failed write leaves both sides as they were.
#[derive(Debug)]
pub struct FavoritesStore {
  path: PathBuf,
  favorites: Vec<FavoriteRecord>,
}

impl FavoritesStore {
  /// Read the favorites file once. Missing means empty; unreadable or corrupt is logged and treated as empty.
  pub fn load(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let favorites = match std::fs::read_to_string(&path) {
      Ok(content) if content.trim().is_empty() => Vec::new(),
      Ok(content) => match serde_json::from_str::<Vec<FavoriteRecord>>(&content) {
        Ok(list) => list,
        Err(e) => {
          warn!(path = %path.display(), err = %e, "favorites: corrupt file, starting empty");
          Vec::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
      Err(e) => {
        warn!(path = %path.display(), err = %e, "favorites: failed to read file, starting empty");
        Vec::new()
      }
    };
    info!(count = favorites.len(), path = %path.display(), "favorites: loaded");
    Self { path, favorites }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn favorites(&self) -> &[FavoriteRecord] {
    &self.favorites
  }

  pub fn len(&self) -> usize {
    self.favorites.len()
  }

  pub fn is_empty(&self) -> bool {
    self.favorites.is_empty()
  }

  pub fn is_favorite(&self, id: &str) -> bool {
    self.favorites.iter().any(|f| f.video.id == id)
  }

  /// Prepend `video` stamped with the current time. Re-adding an existing id moves it to the
  /// front with a fresh timestamp; the list never holds the same id twice.
  pub fn add(&mut self, video: VideoRecord) -> Result<()> {
    self.add_record(FavoriteRecord::new(video))
  }

  fn add_record(&mut self, record: FavoriteRecord) -> Result<()> {
    let id = record.video.id.clone();
    let mut next = Vec::with_capacity(self.favorites.len() + 1);
    next.push(record);
    next.extend(self.favorites.iter().filter(|f| f.video.id != id).cloned());
    self.commit(next)
  }

  /// Drop the favorite with `id`. Returns whether anything was removed.
  pub fn remove(&mut self, id: &str) -> Result<bool> {
    if !self.is_favorite(id) {
      return Ok(false);
    }
    let next: Vec<FavoriteRecord> = self.favorites.iter().filter(|f| f.video.id != id).cloned().collect();
    self.commit(next)?;
    Ok(true)
  }

  pub fn toggle(&mut self, video: &VideoRecord) -> Result<Toggled> {
    if self.is_favorite(&video.id) {
      self.remove(&video.id)?;
      Ok(Toggled::Removed)
    } else {
      self.add(video.clone())?;
      Ok(Toggled::Added)
    }
  }

  fn commit(&mut self, next: Vec<FavoriteRecord>) -> Result<()> {
    write_atomic(&self.path, &next).inspect_err(|e| {
      warn!(path = %self.path.display(), err = %format!("{:#}", e), "favorites: write failed, keeping previous list");
    })?;
    self.favorites = next;
    Ok(())
  }
}

fn write_atomic(path: &Path, favorites: &[FavoriteRecord]) -> Result<()> {
  let json = serde_json::to_string(favorites).context("Failed to serialize favorites")?;
  if let Some(dir) = path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
  }
  let tmp = path.with_extension("json.tmp");
  std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
  std::fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn video(id: &str) -> VideoRecord {
    VideoRecord { id: id.to_string(), title: format!("Video {}", id), ..Default::default() }
  }

  fn ids(store: &FavoritesStore) -> Vec<&str> {
    store.favorites().iter().map(|f| f.video.id.as_str()).collect()
  }

  #[test]
  fn add_prepends_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("favorites.json");
    let mut store = FavoritesStore::load(&path);
    store.add(video("a")).unwrap();
    store.add(video("b")).unwrap();
    assert_eq!(ids(&store), vec!["b", "a"]);
    assert!(store.favorites()[0].favorited_at > 0);

    let reloaded = FavoritesStore::load(&path);
    assert_eq!(ids(&reloaded), vec!["b", "a"]);
  }

  #[test]
  fn remove_filters_by_id_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("favorites.json");
    let mut store = FavoritesStore::load(&path);
    store.add(video("a")).unwrap();
    store.add(video("b")).unwrap();
    assert!(store.remove("a").unwrap());
    assert!(!store.remove("missing").unwrap());
    assert_eq!(ids(&FavoritesStore::load(&path)), vec!["b"]);
    assert!(!store.is_favorite("a"));
  }

  #[test]
  fn double_add_keeps_one_entry_with_latest_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FavoritesStore::load(dir.path().join("favorites.json"));
    store.add_record(FavoriteRecord { video: video("a"), favorited_at: 1 }).unwrap();
    store.add(video("b")).unwrap();
    store.add_record(FavoriteRecord { video: video("a"), favorited_at: 99 }).unwrap();
    assert_eq!(ids(&store), vec!["a", "b"]);
    assert_eq!(store.favorites()[0].favorited_at, 99);
  }

  #[test]
  fn toggle_flips_membership() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FavoritesStore::load(dir.path().join("favorites.json"));
    let v = video("a");
    assert_eq!(store.toggle(&v).unwrap(), Toggled::Added);
    assert!(store.is_favorite("a"));
    assert_eq!(store.toggle(&v).unwrap(), Toggled::Removed);
    assert!(store.is_empty());
  }

  #[test]
  fn corrupt_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("favorites.json");
    std::fs::write(&path, "[{\"id\": ").unwrap();
    assert!(FavoritesStore::load(&path).is_empty());
  }

  #[test]
  fn failed_write_leaves_memory_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let mut store = FavoritesStore::load(blocker.join("favorites.json"));
    assert!(store.add(video("a")).is_err());
    assert!(store.is_empty());
    assert!(!store.is_favorite("a"));
  }

  #[test]
  fn reads_records_written_by_other_clients() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("favorites.json");
    std::fs::write(&path, r#"[{"id": "z", "title": "Z", "views": "12", "favoritedAt": 1700000000000}]"#).unwrap();
    let store = FavoritesStore::load(&path);
    assert_eq!(store.favorites()[0].video.views, 12);
    assert_eq!(store.favorites()[0].favorited_at, 1_700_000_000_000);
  }
}
