use tiny_skia::{Paint, PixmapMut, Rect, Transform};

use super::OverlayStyle;
use super::font::FontHandle;
use super::layout::LayoutResult;
use super::region::OrientedRegion;

/// Blanks the region, then draws its laid-out text on top.
pub fn composite(
    pixmap: &mut PixmapMut<'_>,
    oriented: &OrientedRegion,
    layout: &LayoutResult<FontHandle>,
    style: &OverlayStyle,
) {
    let bbox = oriented.region.bbox;
    let mut fill = Paint::default();
    fill.set_color(style.fill);
    fill.anti_alias = false;
    if let Some(rect) = Rect::from_xywh(bbox.x as f32, bbox.y as f32, bbox.w as f32, bbox.h as f32)
    {
        pixmap.fill_rect(rect, &fill, Transform::identity(), None);
    }

    let mut ink = Paint::default();
    ink.set_color(style.text);
    ink.anti_alias = true;
    match layout {
        LayoutResult::Vertical(vertical) => {
            let mut buf = [0u8; 4];
            for (ch, x, y) in vertical.glyph_positions() {
                vertical
                    .font
                    .draw_text(pixmap, x, y, ch.encode_utf8(&mut buf), &ink);
            }
        }
        LayoutResult::Horizontal(horizontal) => {
            for line in &horizontal.lines {
                horizontal
                    .font
                    .draw_text(pixmap, line.x, line.y, &line.text, &ink);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::BBoxPx;
    use crate::overlay::font::FontResolver;
    use crate::overlay::layout::layout;
    use crate::overlay::region::{Region, classify};
    use tiny_skia::{Color, Pixmap};

    fn red_pixmap(w: u32, h: u32) -> Pixmap {
        let mut pixmap = Pixmap::new(w, h).expect("pixmap");
        pixmap.fill(Color::from_rgba8(255, 0, 0, 255));
        pixmap
    }

    fn rgb(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8) {
        let px = pixmap.pixel(x, y).expect("pixel");
        (px.red(), px.green(), px.blue())
    }

    fn oriented(x: u32, y: u32, w: u32, h: u32, text: &str) -> OrientedRegion {
        classify(Region {
            bbox: BBoxPx { x, y, w, h },
            text: text.to_string(),
        })
    }

    #[test]
    fn fills_exactly_the_half_open_box() {
        let mut pixmap = red_pixmap(20, 20);
        let region = oriented(2, 3, 5, 4, "字");
        let planned = layout(&region, &FontResolver::builtin());
        let style = OverlayStyle {
            fill: Color::from_rgba8(0, 0, 255, 255),
            text: Color::from_rgba8(0, 0, 255, 255),
        };
        composite(&mut pixmap.as_mut(), &region, &planned, &style);
        assert_eq!(rgb(&pixmap, 2, 3), (0, 0, 255));
        assert_eq!(rgb(&pixmap, 6, 6), (0, 0, 255));
        assert_eq!(rgb(&pixmap, 7, 6), (255, 0, 0));
        assert_eq!(rgb(&pixmap, 6, 7), (255, 0, 0));
        assert_eq!(rgb(&pixmap, 1, 3), (255, 0, 0));
    }

    #[test]
    fn draws_glyphs_after_the_mask() {
        let mut pixmap = red_pixmap(64, 64);
        let region = oriented(0, 0, 64, 32, "字");
        let planned = layout(&region, &FontResolver::builtin());
        composite(&mut pixmap.as_mut(), &region, &planned, &OverlayStyle::default());

        let LayoutResult::Horizontal(horizontal) = &planned else {
            panic!("expected horizontal layout");
        };
        // 32px bitmap face: scale 4, tofu side 28, centred in the box.
        assert_eq!(horizontal.font_size, 32);
        let line = &horizontal.lines[0];
        assert_eq!((line.x, line.y, line.width), (16, 0, 32));
        assert_eq!(rgb(&pixmap, 16, 0), (0, 0, 0));
        assert_eq!(rgb(&pixmap, 30, 14), (255, 255, 255));
        assert_eq!(rgb(&pixmap, 0, 0), (255, 255, 255));
        assert_eq!(rgb(&pixmap, 0, 40), (255, 0, 0));
    }

    #[test]
    fn regions_past_the_edge_are_clipped() {
        let mut pixmap = red_pixmap(10, 10);
        let region = oriented(5, 5, 100, 300, "一二三");
        let planned = layout(&region, &FontResolver::builtin());
        composite(&mut pixmap.as_mut(), &region, &planned, &OverlayStyle::default());
        assert_eq!(rgb(&pixmap, 4, 4), (255, 0, 0));
        assert_ne!(rgb(&pixmap, 9, 9), (255, 0, 0));
    }

    #[test]
    fn zero_area_box_skips_the_mask() {
        let mut pixmap = red_pixmap(4, 4);
        let region = oriented(1, 1, 0, 0, "字");
        let planned = layout(&region, &FontResolver::builtin());
        let style = OverlayStyle {
            fill: Color::WHITE,
            text: Color::from_rgba8(255, 0, 0, 255),
        };
        composite(&mut pixmap.as_mut(), &region, &planned, &style);
        assert!(
            pixmap
                .pixels()
                .iter()
                .all(|px| (px.red(), px.green(), px.blue()) == (255, 0, 0))
        );
    }
}
