use image::{DynamicImage, imageops::FilterType};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};

use crate::display::DisplayMode;

// --- Thumbnail Widget ---

/// Draws a video thumbnail centered in its area. The image is scaled to fit on every render.
pub struct ThumbnailWidget<'a> {
  pub image: &'a DynamicImage,
  pub display_mode: DisplayMode,
}

const ASCII_CHARS: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];

impl Widget for ThumbnailWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self.display_mode {
      DisplayMode::Direct => render_direct(&fit(self.image, area, 2), area, buf),
      DisplayMode::Ascii => render_ascii(&fit(self.image, area, 1), area, buf),
      DisplayMode::Off => {}
    }
  }
}

/// Scale to fit `area`, with `rows_per_cell` image rows per terminal row.
/// Cells are roughly twice as tall as wide, so ASCII output squashes height by half.
pub fn fit(image: &DynamicImage, area: Rect, rows_per_cell: u32) -> DynamicImage {
  let max_w = u32::from(area.width);
  let max_h = u32::from(area.height) * rows_per_cell;
  let aspect = if rows_per_cell == 1 { 2 } else { 1 };
  let src = image.resize(max_w, max_h * aspect, FilterType::Triangle);
  src.resize_exact(src.width(), (src.height() / aspect).max(1), FilterType::Triangle)
}

fn cell(area: Rect, offset_x: u32, offset_y: u32, x: u32, y: u32) -> (u16, u16) {
  let clamp = |v: u32| v.min(u32::from(u16::MAX)) as u16;
  (area.x.saturating_add(clamp(offset_x + x)), area.y.saturating_add(clamp(offset_y + y)))
}

fn render_direct(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let img_w = rgb.width().min(u32::from(area.width));
  let img_h = rgb.height();
  let cell_h = img_h.div_ceil(2);
  let offset_x = u32::from(area.width).saturating_sub(img_w) / 2;
  let offset_y = u32::from(area.height).saturating_sub(cell_h) / 2;

  for y in 0..cell_h.min(u32::from(area.height)) {
    for x in 0..img_w {
      let upper = rgb.get_pixel(x, y * 2);
      let lower_y = y * 2 + 1;
      let fg = Color::Rgb(upper[0], upper[1], upper[2]);
      let bg = if lower_y < img_h {
        let lower = rgb.get_pixel(x, lower_y);
        Color::Rgb(lower[0], lower[1], lower[2])
      } else {
        Color::Reset
      };
      let (cx, cy) = cell(area, offset_x, offset_y, x, y);
      buf.set_string(cx, cy, "▀", Style::default().fg(fg).bg(bg));
    }
  }
}

/// Index into the brightness ramp for a luma value.
pub fn ascii_index(luma: u8) -> usize {
  let idx = ((f32::from(luma) / 255.0) * (ASCII_CHARS.len() - 1) as f32).round() as usize;
  idx.min(ASCII_CHARS.len() - 1)
}

fn render_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let img_w = luma.width().min(u32::from(area.width));
  let img_h = luma.height().min(u32::from(area.height));
  let offset_x = u32::from(area.width).saturating_sub(img_w) / 2;
  let offset_y = u32::from(area.height).saturating_sub(img_h) / 2;

  for y in 0..img_h {
    for x in 0..img_w {
      let (cx, cy) = cell(area, offset_x, offset_y, x, y);
      buf.set_string(cx, cy, ASCII_CHARS[ascii_index(luma.get_pixel(x, y)[0])], Style::default());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb)))
  }

  #[test]
  fn ascii_ramp_bounds() {
    assert_eq!(ascii_index(0), 0);
    assert_eq!(ascii_index(255), ASCII_CHARS.len() - 1);
  }

  #[test]
  fn fit_never_exceeds_area() {
    let area = Rect::new(0, 0, 20, 10);
    let direct = fit(&solid(640, 360, [0, 0, 0]), area, 2);
    assert!(direct.width() <= 20 && direct.height() <= 20);
    let ascii = fit(&solid(640, 360, [0, 0, 0]), area, 1);
    assert!(ascii.width() <= 20 && ascii.height() <= 10);
  }

  #[test]
  fn direct_render_paints_half_blocks() {
    let area = Rect::new(0, 0, 4, 2);
    let mut buf = Buffer::empty(area);
    ThumbnailWidget { image: &solid(4, 4, [255, 0, 0]), display_mode: DisplayMode::Direct }.render(area, &mut buf);
    let c = &buf[(0, 0)];
    assert_eq!(c.symbol(), "▀");
    assert!(matches!(c.fg, Color::Rgb(r, 0..=4, 0..=4) if r > 250));
  }

  #[test]
  fn ascii_render_of_white_is_densest_char() {
    let area = Rect::new(0, 0, 4, 2);
    let mut buf = Buffer::empty(area);
    ThumbnailWidget { image: &solid(8, 8, [255, 255, 255]), display_mode: DisplayMode::Ascii }.render(area, &mut buf);
    assert!((0..4).any(|x| buf[(x, 0)].symbol() == "@" || buf[(x, 1)].symbol() == "@"));
  }

  #[test]
  fn off_mode_draws_nothing() {
    let area = Rect::new(0, 0, 4, 2);
    let mut buf = Buffer::empty(area);
    ThumbnailWidget { image: &solid(4, 4, [255, 0, 0]), display_mode: DisplayMode::Off }.render(area, &mut buf);
    assert_eq!(buf[(0, 0)].symbol(), " ");
  }
}
