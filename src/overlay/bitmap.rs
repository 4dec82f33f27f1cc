use tiny_skia::{Paint, PixmapMut, Rect, Transform};

// Glyph cell in font units: 5x7 bitmap plus one unit of spacing on each axis.
const CELL_HEIGHT: u32 = 8;
const GLYPH_ADVANCE: u32 = 6;
const SPACE_ADVANCE: u32 = 4;
const TOFU_ADVANCE: u32 = 8;

#[rustfmt::skip]
const BITMAP_5X7: &[(char, [u8; 7])] = &[
    // Each row is 5 bits, bit 4 is the leftmost column.
    ('0', [0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110]),
    ('1', [0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110]),
    ('2', [0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111]),
    ('3', [0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110]),
    ('4', [0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010]),
    ('5', [0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110]),
    ('6', [0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110]),
    ('7', [0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000]),
    ('8', [0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110]),
    ('9', [0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100]),
    ('#', [0b01010,0b01010,0b11111,0b01010,0b11111,0b01010,0b01010]),
    ('(', [0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010]),
    (')', [0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000]),
    (',', [0b00000,0b00000,0b00000,0b00000,0b01100,0b00100,0b01000]),
    ('-', [0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000]),
    ('.', [0b00000,0b00000,0b00000,0b00000,0b00000,0b01100,0b01100]),
    (':', [0b00000,0b01100,0b01100,0b00000,0b01100,0b01100,0b00000]),
    ('=', [0b00000,0b00000,0b11111,0b00000,0b11111,0b00000,0b00000]),
    ('x', [0b00000,0b10001,0b01010,0b00100,0b01010,0b10001,0b00000]),
];

/// Built-in fallback face. Characters without a bitmap render as a hollow
/// square, which is what CJK text looks like when no outline font loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapFont {
    pixel_size: u32,
    scale: u32,
}

impl BitmapFont {
    pub fn new(pixel_size: u32) -> Self {
        let scale = ((pixel_size + CELL_HEIGHT / 2) / CELL_HEIGHT).max(1);
        Self { pixel_size, scale }
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn char_advance(&self, ch: char) -> u32 {
        let units = if ch == ' ' {
            SPACE_ADVANCE
        } else if glyph_rows(ch).is_some() {
            GLYPH_ADVANCE
        } else {
            TOFU_ADVANCE
        };
        units * self.scale
    }

    pub fn text_width(&self, text: &str) -> u32 {
        text.chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| self.char_advance(ch))
            .sum()
    }

    pub fn line_height(&self) -> u32 {
        CELL_HEIGHT * self.scale
    }

    /// Draws `text` with its line box's top-left corner at `(x, y)`.
    pub fn draw_text(
        &self,
        pixmap: &mut PixmapMut<'_>,
        x: i32,
        y: i32,
        text: &str,
        paint: &Paint<'_>,
    ) {
        // Blocks are pixel aligned; keep their edges hard.
        let mut paint = paint.clone();
        paint.anti_alias = false;
        let mut pen_x = i64::from(x);
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            self.draw_char(pixmap, pen_x, i64::from(y), ch, &paint);
            pen_x += i64::from(self.char_advance(ch));
        }
    }

    fn draw_char(&self, pixmap: &mut PixmapMut<'_>, x: i64, y: i64, ch: char, paint: &Paint<'_>) {
        if ch == ' ' {
            return;
        }
        let s = i64::from(self.scale);
        match glyph_rows(ch) {
            Some(rows) => {
                for (row_idx, bits) in rows.iter().enumerate() {
                    for col in 0..5i64 {
                        if (bits >> (4 - col)) & 1 == 1 {
                            fill_block(pixmap, x + col * s, y + row_idx as i64 * s, s, s, paint);
                        }
                    }
                }
            }
            None => {
                let side = i64::from(TOFU_ADVANCE - 1) * s;
                let left = x;
                let top = y;
                fill_block(pixmap, left, top, side, s, paint);
                fill_block(pixmap, left, top + side - s, side, s, paint);
                fill_block(pixmap, left, top, s, side, paint);
                fill_block(pixmap, left + side - s, top, s, side, paint);
            }
        }
    }
}

fn glyph_rows(ch: char) -> Option<[u8; 7]> {
    BITMAP_5X7
        .iter()
        .find(|(key, _)| *key == ch)
        .map(|(_, rows)| *rows)
}

fn fill_block(pixmap: &mut PixmapMut<'_>, x: i64, y: i64, w: i64, h: i64, paint: &Paint<'_>) {
    if let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) {
        pixmap.fill_rect(rect, paint, Transform::identity(), None);
    }
}
