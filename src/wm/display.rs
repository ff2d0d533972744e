//! Display resources
//!
//! Cursors, color schemes, the core font and the bar painter used by the
//! x11rb adapter.

use anyhow::{Context, Result};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;

use crate::config::{ColorScheme, ColorsConfig};
use crate::wm::xconn::{BarCell, Cursor, Scheme};

/// Cursor management
#[derive(Debug)]
pub struct Cursors {
    pub normal: u32,
    pub resize: u32,
    pub moving: u32,
}

impl Cursors {
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;

        // glyphs of the X cursor font: left_ptr, sizing, fleur
        let create_cursor = |glyph_id: u16| -> Result<u32> {
            let cursor_id = conn.generate_id()?;
            conn.create_glyph_cursor(
                cursor_id,
                font,
                font,
                glyph_id,
                glyph_id + 1,
                0,
                0,
                0,
                0xffff,
                0xffff,
                0xffff,
            )?;
            Ok(cursor_id)
        };

        let cursors = Self {
            normal: create_cursor(68)?,
            resize: create_cursor(120)?,
            moving: create_cursor(52)?,
        };
        conn.close_font(font)?;
        Ok(cursors)
    }

    pub fn get(&self, cursor: Cursor) -> u32 {
        match cursor {
            Cursor::Normal => self.normal,
            Cursor::Resize => self.resize,
            Cursor::Move => self.moving,
        }
    }

    pub fn free<C: Connection>(&self, conn: &C) -> Result<()> {
        for cursor in [self.normal, self.resize, self.moving] {
            conn.free_cursor(cursor)?;
        }
        Ok(())
    }
}

/// Parse `#rrggbb` into 16-bit channels.
pub fn parse_hex_color(s: &str) -> Option<(u16, u16, u16)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| -> Option<u16> {
        let v = u8::from_str_radix(hex.get(i..i + 2)?, 16).ok()?;
        Some(u16::from(v) * 0x101)
    };
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Allocated pixels of one scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemePixels {
    pub fg: u32,
    pub bg: u32,
    pub border: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    norm: SchemePixels,
    sel: SchemePixels,
    urg: SchemePixels,
}

impl Palette {
    pub fn new<C: Connection>(conn: &C, colormap: Colormap, colors: &ColorsConfig) -> Result<Self> {
        Ok(Self {
            norm: alloc_scheme(conn, colormap, &colors.norm)?,
            sel: alloc_scheme(conn, colormap, &colors.sel)?,
            urg: alloc_scheme(conn, colormap, &colors.urg)?,
        })
    }

    pub fn get(&self, scheme: Scheme) -> SchemePixels {
        match scheme {
            Scheme::Norm => self.norm,
            Scheme::Sel => self.sel,
            Scheme::Urg => self.urg,
        }
    }
}

fn alloc_scheme<C: Connection>(
    conn: &C,
    colormap: Colormap,
    scheme: &ColorScheme,
) -> Result<SchemePixels> {
    Ok(SchemePixels {
        fg: alloc_color(conn, colormap, &scheme.fg)?,
        bg: alloc_color(conn, colormap, &scheme.bg)?,
        border: alloc_color(conn, colormap, &scheme.border)?,
    })
}

fn alloc_color<C: Connection>(conn: &C, colormap: Colormap, spec: &str) -> Result<u32> {
    let (r, g, b) = parse_hex_color(spec).with_context(|| format!("invalid color {:?}", spec))?;
    let reply = conn
        .alloc_color(colormap, r, g, b)?
        .reply()
        .with_context(|| format!("cannot allocate color {}", spec))?;
    Ok(reply.pixel)
}

/// Characters as big-endian two byte glyph indices
fn char2b(text: &str) -> Vec<Char2b> {
    text.chars()
        .map(|c| {
            let code = u32::from(c).min(0xffff) as u16;
            let [byte1, byte2] = code.to_be_bytes();
            Char2b { byte1, byte2 }
        })
        .collect()
}

/// Core X font
#[derive(Debug)]
pub struct CoreFont {
    pub id: Font,
    pub ascent: i32,
    pub descent: i32,
}

impl CoreFont {
    /// Open `name`, falling back to `fixed`.
    pub fn open<C: Connection>(conn: &C, name: &str) -> Result<Self> {
        for candidate in [name, "fixed"] {
            let id = conn.generate_id()?;
            if conn.open_font(id, candidate.as_bytes())?.check().is_err() {
                warn!("Cannot load font {:?}", candidate);
                continue;
            }
            let info = conn.query_font(id)?.reply()?;
            debug!("Loaded font {:?}", candidate);
            return Ok(Self {
                id,
                ascent: i32::from(info.font_ascent),
                descent: i32::from(info.font_descent),
            });
        }
        anyhow::bail!("no usable font")
    }

    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    pub fn text_width<C: Connection>(&self, conn: &C, text: &str) -> i32 {
        if text.is_empty() {
            return 0;
        }
        conn.query_text_extents(self.id, &char2b(text))
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or(0, |r| r.overall_width)
    }
}

/// Draws bar cells into an offscreen pixmap and copies it to the bar.
#[derive(Debug)]
pub struct BarPainter {
    gc: Gcontext,
    depth: u8,
}

impl BarPainter {
    pub fn new<C: Connection>(conn: &C, root: Window, depth: u8, font: &CoreFont) -> Result<Self> {
        let gc = conn.generate_id()?;
        conn.create_gc(
            gc,
            root,
            &CreateGCAux::new()
                .font(font.id)
                .line_width(1)
                .graphics_exposures(0),
        )?;
        Ok(Self { gc, depth })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw<C: Connection>(
        &self,
        conn: &C,
        win: Window,
        width: i32,
        height: i32,
        cells: &[BarCell],
        palette: &Palette,
        font: &CoreFont,
    ) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Ok(());
        }
        let pixmap = conn.generate_id()?;
        conn.create_pixmap(self.depth, pixmap, win, width as u16, height as u16)?;
        for cell in cells {
            self.draw_cell(conn, pixmap, height, cell, palette, font)?;
        }
        conn.copy_area(pixmap, win, self.gc, 0, 0, 0, 0, width as u16, height as u16)?;
        conn.free_pixmap(pixmap)?;
        Ok(())
    }

    fn draw_cell<C: Connection>(
        &self,
        conn: &C,
        pixmap: Pixmap,
        height: i32,
        cell: &BarCell,
        palette: &Palette,
        font: &CoreFont,
    ) -> Result<()> {
        if cell.w <= 0 {
            return Ok(());
        }
        let colors = palette.get(cell.scheme);
        let (fg, bg) = if cell.invert {
            (colors.bg, colors.fg)
        } else {
            (colors.fg, colors.bg)
        };
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(bg))?;
        conn.poly_fill_rectangle(
            pixmap,
            self.gc,
            &[Rectangle {
                x: cell.x as i16,
                y: 0,
                width: cell.w as u16,
                height: height as u16,
            }],
        )?;
        conn.change_gc(self.gc, &ChangeGCAux::new().foreground(fg).background(bg))?;

        if !cell.text.is_empty() {
            let room = cell.w - cell.pad;
            let mut text: Vec<char> = cell.text.chars().collect();
            while !text.is_empty()
                && font.text_width(conn, &text.iter().collect::<String>()) > room
            {
                text.pop();
            }
            let glyphs = char2b(&text.iter().collect::<String>());
            let baseline = (height - font.height()) / 2 + font.ascent;
            conn.image_text16(
                pixmap,
                self.gc,
                (cell.x + cell.pad) as i16,
                baseline as i16,
                &glyphs[..glyphs.len().min(255)],
            )?;
        }

        if let Some(filled) = cell.indicator {
            let boxs = font.height() / 9;
            let boxw = font.height() / 6 + 2;
            let rect = Rectangle {
                x: (cell.x + boxs) as i16,
                y: boxs as i16,
                width: boxw as u16,
                height: boxw as u16,
            };
            if filled {
                conn.poly_fill_rectangle(pixmap, self.gc, &[rect])?;
            } else {
                conn.poly_rectangle(pixmap, self.gc, &[rect])?;
            }
        }
        Ok(())
    }

    pub fn free<C: Connection>(&self, conn: &C) -> Result<()> {
        conn.free_gc(self.gc)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some((0xffff, 0x8080, 0)));
        assert_eq!(parse_hex_color("#222222"), Some((0x2222, 0x2222, 0x2222)));
        assert_eq!(parse_hex_color("ff8000"), None);
        assert_eq!(parse_hex_color("#ff80"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn test_char2b_big_endian() {
        let glyphs = char2b("A\u{4e00}");
        assert_eq!((glyphs[0].byte1, glyphs[0].byte2), (0, 0x41));
        assert_eq!((glyphs[1].byte1, glyphs[1].byte2), (0x4e, 0x00));
    }
}
