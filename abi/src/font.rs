//! PSF1 bitmap font parsing.
//!
//! PSF1 files start with a 4-byte header (two magic bytes, a mode byte, and
//! the glyph height in bytes) followed by 256 or 512 glyph bitmaps. Every
//! glyph is 8 pixels wide, one byte per row, most significant bit leftmost.

/// First magic byte of a PSF1 file.
pub const PSF1_MAGIC0: u8 = 0x36;
/// Second magic byte of a PSF1 file.
pub const PSF1_MAGIC1: u8 = 0x04;
/// Mode bit: the file carries 512 glyphs instead of 256.
pub const PSF1_MODE_512: u8 = 0x01;
/// Header length in bytes.
pub const PSF1_HEADER_LEN: usize = 4;
/// Glyph width in pixels, fixed by the format.
pub const PSF1_GLYPH_WIDTH: usize = 8;

/// Why a byte slice was rejected as a PSF1 font.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Psf1Error {
    /// Shorter than the header.
    TooShort,
    /// Magic bytes do not match.
    BadMagic,
    /// Glyph height of zero.
    ZeroCharsize,
    /// Glyph table extends past the end of the data.
    Truncated,
}

/// A validated PSF1 font over a borrowed byte slice.
#[derive(Clone, Copy, Debug)]
pub struct Psf1Font<'a> {
    glyphs: &'a [u8],
    charsize: usize,
    glyph_count: usize,
}

impl<'a> Psf1Font<'a> {
    /// Validate the header and glyph table of a PSF1 file.
    pub fn parse(data: &'a [u8]) -> Result<Self, Psf1Error> {
        if data.len() < PSF1_HEADER_LEN {
            return Err(Psf1Error::TooShort);
        }
        if data[0] != PSF1_MAGIC0 || data[1] != PSF1_MAGIC1 {
            return Err(Psf1Error::BadMagic);
        }
        let mode = data[2];
        let charsize = data[3] as usize;
        if charsize == 0 {
            return Err(Psf1Error::ZeroCharsize);
        }
        let glyph_count = if mode & PSF1_MODE_512 != 0 { 512 } else { 256 };
        let table_len = glyph_count * charsize;
        let Some(glyphs) = data.get(PSF1_HEADER_LEN..PSF1_HEADER_LEN + table_len) else {
            return Err(Psf1Error::Truncated);
        };
        Ok(Self {
            glyphs,
            charsize,
            glyph_count,
        })
    }

    /// Glyph height in pixel rows.
    #[inline]
    pub const fn height(&self) -> usize {
        self.charsize
    }

    /// Glyph width in pixels.
    #[inline]
    pub const fn width(&self) -> usize {
        PSF1_GLYPH_WIDTH
    }

    /// Number of glyphs in the table.
    #[inline]
    pub const fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    /// Bitmap rows for a glyph; out-of-range indices fall back to glyph 0.
    #[inline]
    pub fn glyph(&self, index: usize) -> &'a [u8] {
        let index = if index < self.glyph_count { index } else { 0 };
        &self.glyphs[index * self.charsize..(index + 1) * self.charsize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_font(mode: u8, charsize: u8) -> [u8; 4 + 512 * 16] {
        let mut data = [0u8; 4 + 512 * 16];
        data[0] = PSF1_MAGIC0;
        data[1] = PSF1_MAGIC1;
        data[2] = mode;
        data[3] = charsize;
        // Distinct first row per glyph so slicing is checkable.
        let count = if mode & PSF1_MODE_512 != 0 { 512 } else { 256 };
        for g in 0..count {
            data[4 + g * charsize as usize] = (g & 0xFF) as u8;
        }
        data
    }

    #[test]
    fn parses_standard_font() {
        let data = sample_font(0, 16);
        let font = Psf1Font::parse(&data[..4 + 256 * 16]).expect("valid font");
        assert_eq!(font.height(), 16);
        assert_eq!(font.width(), 8);
        assert_eq!(font.glyph_count(), 256);
        assert_eq!(font.glyph(b'A' as usize)[0], b'A');
        assert_eq!(font.glyph(b'A' as usize).len(), 16);
    }

    #[test]
    fn mode_bit_selects_512_glyphs() {
        let data = sample_font(PSF1_MODE_512, 16);
        let font = Psf1Font::parse(&data).expect("valid font");
        assert_eq!(font.glyph_count(), 512);
        assert_eq!(font.glyph(300)[0], (300 & 0xFF) as u8);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = sample_font(0, 16);
        data[0] = 0x00;
        assert_eq!(Psf1Font::parse(&data).unwrap_err(), Psf1Error::BadMagic);
    }

    #[test]
    fn rejects_truncated_table() {
        let data = sample_font(0, 16);
        assert_eq!(
            Psf1Font::parse(&data[..4 + 255 * 16]).unwrap_err(),
            Psf1Error::Truncated
        );
    }

    #[test]
    fn rejects_short_and_zero_height() {
        assert_eq!(Psf1Font::parse(&[0x36]).unwrap_err(), Psf1Error::TooShort);
        let mut data = sample_font(0, 16);
        data[3] = 0;
        assert_eq!(Psf1Font::parse(&data).unwrap_err(), Psf1Error::ZeroCharsize);
    }

    #[test]
    fn out_of_range_glyph_falls_back() {
        let data = sample_font(0, 16);
        let font = Psf1Font::parse(&data[..4 + 256 * 16]).expect("valid font");
        assert_eq!(font.glyph(9999), font.glyph(0));
    }
}
