//! Applied vs staged filter state.
//!
//! The panel edits a scratch copy (`staged`) while the result list keeps
//! using `applied`. Nothing reaches `applied` except through [`FilterPanel::apply`].

use tracing::debug;

use crate::model::{Category, FilterState};

/// Field focused inside the filter panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
  Order,
  Category,
  MinDuration,
  MaxDuration,
}

impl FilterField {
  const ALL: [FilterField; 4] =
    [FilterField::Order, FilterField::Category, FilterField::MinDuration, FilterField::MaxDuration];

  pub fn cycle(self, forward: bool) -> Self {
    let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    let len = Self::ALL.len();
    Self::ALL[if forward { (idx + 1) % len } else { (idx + len - 1) % len }]
  }
}

#[derive(Debug, Clone)]
pub struct FilterPanel {
  applied: FilterState,
  staged: FilterState,
  open: bool,
  pub focus: FilterField,
  pub categories: Vec<Category>,
}

impl Default for FilterPanel {
  fn default() -> Self {
    Self::new()
  }
}

impl FilterPanel {
  pub fn new() -> Self {
    Self {
      applied: FilterState::default(),
      staged: FilterState::default(),
      open: false,
      focus: FilterField::Order,
      categories: Vec::new(),
    }
  }

  pub fn applied(&self) -> &FilterState {
    &self.applied
  }

  pub fn staged(&self) -> &FilterState {
    &self.staged
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  /// Open the panel, discarding any unapplied edits from a previous session.
  pub fn open(&mut self) {
    self.staged = self.applied.clone();
    self.focus = FilterField::Order;
    self.open = true;
  }

  /// Close without applying.
  pub fn close(&mut self) {
    self.open = false;
  }

  pub fn toggle(&mut self) {
    if self.open { self.close() } else { self.open() }
  }

  /// Commit staged to applied and close. Returns the new applied filters when they changed.
  pub fn apply(&mut self) -> Option<FilterState> {
    self.open = false;
    if self.staged == self.applied {
      return None;
    }
    self.applied = self.staged.clone();
    debug!(filters = ?self.applied, "filters: applied");
    Some(self.applied.clone())
  }

  /// Reset the staged copy to defaults. Applied filters and the open panel are left alone.
  pub fn reset(&mut self) {
    self.staged = FilterState::default();
  }

  // --- Staged setters ---

  pub fn set_order(&mut self, order: crate::model::SortOrder) {
    self.staged.order = order;
  }

  pub fn set_category(&mut self, category: impl Into<String>) {
    self.staged.category = category.into();
  }

  /// Raising the min above a bounded max drags the max up with it.
  pub fn set_min_duration(&mut self, min: i64) {
    let min = clamp_minutes(min);
    let max = self.staged.duration.1;
    self.staged.duration = (min, if max > 0 { max.max(min) } else { 0 });
  }

  /// A bounded max below the min snaps back up to the min; 0 always means unbounded.
  pub fn set_max_duration(&mut self, max: i64) {
    let max = clamp_minutes(max);
    let min = self.staged.duration.0;
    self.staged.duration.1 = if max > 0 && max < min { min } else { max };
  }

  // --- Keyboard editing helpers ---

  pub fn cycle_order(&mut self, forward: bool) {
    self.staged.order = self.staged.order.cycle(forward);
  }

  /// Step through "All" followed by every known category.
  pub fn cycle_category(&mut self, forward: bool) {
    let names: Vec<&str> = std::iter::once("").chain(self.categories.iter().map(|c| c.name.as_str())).collect();
    let idx = names.iter().position(|n| *n == self.staged.category).unwrap_or(0);
    let len = names.len();
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    self.staged.category = names[next].to_string();
  }

  /// Append a digit to the focused duration field.
  pub fn push_digit(&mut self, digit: u32) {
    match self.focus {
      FilterField::MinDuration => {
        let value = i64::from(self.staged.duration.0) * 10 + i64::from(digit);
        self.set_min_duration(value);
      }
      FilterField::MaxDuration => {
        let value = i64::from(self.staged.duration.1) * 10 + i64::from(digit);
        self.set_max_duration(value);
      }
      _ => {}
    }
  }

  /// Drop the last digit of the focused duration field.
  pub fn pop_digit(&mut self) {
    match self.focus {
      FilterField::MinDuration => self.set_min_duration(i64::from(self.staged.duration.0 / 10)),
      FilterField::MaxDuration => self.set_max_duration(i64::from(self.staged.duration.1 / 10)),
      _ => {}
    }
  }
}

/// Durations are whole minutes; negatives are treated as "no bound".
fn clamp_minutes(value: i64) -> u32 {
  value.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::SortOrder;

  fn panel_with_duration(min: u32, max: u32) -> FilterPanel {
    let mut panel = FilterPanel::new();
    panel.open();
    panel.staged.duration = (min, max);
    panel
  }

  #[test]
  fn raising_min_above_max_raises_max() {
    let mut panel = panel_with_duration(0, 10);
    panel.set_min_duration(20);
    assert_eq!(panel.staged().duration, (20, 20));
  }

  #[test]
  fn raising_min_keeps_unbounded_max() {
    let mut panel = panel_with_duration(0, 0);
    panel.set_min_duration(20);
    assert_eq!(panel.staged().duration, (20, 0));
  }

  #[test]
  fn lowering_max_below_min_snaps_to_min() {
    let mut panel = panel_with_duration(10, 30);
    panel.set_max_duration(5);
    assert_eq!(panel.staged().duration, (10, 10));
  }

  #[test]
  fn max_zero_is_unbounded_even_below_min() {
    let mut panel = panel_with_duration(10, 30);
    panel.set_max_duration(0);
    assert_eq!(panel.staged().duration, (10, 0));
  }

  #[test]
  fn negative_durations_clamp_to_zero() {
    let mut panel = panel_with_duration(5, 10);
    panel.set_min_duration(-3);
    assert_eq!(panel.staged().duration, (0, 10));
  }

  #[test]
  fn staged_edits_do_not_touch_applied() {
    let mut panel = FilterPanel::new();
    panel.open();
    panel.set_order(SortOrder::Longest);
    panel.set_category("hd");
    assert_eq!(panel.applied(), &FilterState::default());
    assert_eq!(panel.staged().order, SortOrder::Longest);
  }

  #[test]
  fn apply_copies_staged_and_closes() {
    let mut panel = FilterPanel::new();
    panel.open();
    panel.set_order(SortOrder::TopRated);
    let applied = panel.apply();
    assert_eq!(applied.map(|f| f.order), Some(SortOrder::TopRated));
    assert_eq!(panel.applied().order, SortOrder::TopRated);
    assert!(!panel.is_open());
  }

  #[test]
  fn apply_without_changes_reports_nothing() {
    let mut panel = FilterPanel::new();
    panel.open();
    assert_eq!(panel.apply(), None);
    assert!(!panel.is_open());
  }

  #[test]
  fn reset_only_touches_staged() {
    let mut panel = FilterPanel::new();
    panel.open();
    panel.set_category("vr");
    panel.apply();
    panel.open();
    panel.set_order(SortOrder::Shortest);
    panel.reset();
    assert!(panel.is_open());
    assert_eq!(panel.staged(), &FilterState::default());
    assert_eq!(panel.applied().category, "vr");
  }

  #[test]
  fn reopening_discards_unapplied_edits() {
    let mut panel = FilterPanel::new();
    panel.open();
    panel.set_order(SortOrder::MostViewed);
    panel.close();
    panel.open();
    assert_eq!(panel.staged(), panel.applied());
  }

  #[test]
  fn category_cycle_includes_all() {
    let mut panel = FilterPanel::new();
    panel.categories =
      vec![Category { id: "1".into(), name: "hd".into() }, Category { id: "2".into(), name: "vr".into() }];
    panel.open();
    panel.cycle_category(true);
    assert_eq!(panel.staged().category, "hd");
    panel.cycle_category(true);
    panel.cycle_category(true);
    assert_eq!(panel.staged().category, "");
    panel.cycle_category(false);
    assert_eq!(panel.staged().category, "vr");
  }

  #[test]
  fn digit_entry_applies_corrections() {
    let mut panel = panel_with_duration(0, 0);
    panel.focus = FilterField::MaxDuration;
    panel.push_digit(1);
    panel.push_digit(0);
    assert_eq!(panel.staged().duration, (0, 10));
    panel.focus = FilterField::MinDuration;
    panel.push_digit(2);
    panel.push_digit(5);
    assert_eq!(panel.staged().duration, (25, 25));
    panel.pop_digit();
    assert_eq!(panel.staged().duration, (2, 25));
  }
}
