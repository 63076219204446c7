/// Represents a color in straight (non-premultiplied) RGBA format.
///
/// Each channel is an 8-bit unsigned integer. Settings and remote payloads
/// carry colors packed into a single 32-bit integer with red in the low byte
/// (`0xAABBGGRR`); [`Color::from_packed`] and [`Color::to_packed`] convert
/// between the two.
///
/// # Examples
///
/// ```
/// use drawsource::Color;
///
/// let red = Color::rgb(255, 0, 0);
/// assert_eq!(red.normalize(), [1.0, 0.0, 0.0, 1.0]);
///
/// // Packed colors keep red in the lowest byte.
/// assert_eq!(Color::from_packed(0xFF0000FF), red);
/// assert_eq!(red.to_packed(), 0xFF0000FF);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub [u8; 4]);

impl Color {
    /// A fully transparent color. Cleared canvas pixels have this value.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);

    /// Creates a new color with the specified RGB values and full opacity.
    ///
    /// ```
    /// use drawsource::Color;
    ///
    /// let green = Color::rgb(0, 255, 0);
    /// assert_eq!(green, Color([0, 255, 0, 255]));
    /// ```
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// Creates a new color with the specified RGBA values.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Unpacks a `0xAABBGGRR` integer.
    ///
    /// ```
    /// use drawsource::Color;
    ///
    /// let c = Color::from_packed(0x80FF8040);
    /// assert_eq!(c, Color::rgba(0x40, 0x80, 0xFF, 0x80));
    /// ```
    pub fn from_packed(packed: u32) -> Self {
        Self(packed.to_le_bytes())
    }

    /// Packs the color into `0xAABBGGRR`.
    pub fn to_packed(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Returns the same color with the alpha channel replaced.
    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.0[3] = alpha;
        self
    }

    pub fn alpha(&self) -> u8 {
        self.0[3]
    }

    /// Normalizes the color values to the range [0.0, 1.0].
    pub fn normalize(&self) -> [f32; 4] {
        [
            self.0[0] as f32 / 255.0,
            self.0[1] as f32 / 255.0,
            self.0[2] as f32 / 255.0,
            self.0[3] as f32 / 255.0,
        ]
    }

    /// Builds a color from normalized channels, clamping each to [0.0, 1.0].
    pub fn from_normalized(channels: [f32; 4]) -> Self {
        let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        Self([
            quantize(channels[0]),
            quantize(channels[1]),
            quantize(channels[2]),
            quantize(channels[3]),
        ])
    }

    /// Returns the color as an array of 4 `u8` values.
    pub fn to_array(&self) -> [u8; 4] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_round_trip_keeps_channel_order() {
        let cursor_default = Color::from_packed(0xFFFFFF00);
        assert_eq!(cursor_default, Color::rgba(0x00, 0xFF, 0xFF, 0xFF));
        assert_eq!(cursor_default.to_packed(), 0xFFFFFF00);
    }

    #[test]
    fn from_normalized_clamps_and_rounds() {
        let c = Color::from_normalized([1.5, -0.2, 0.5, 1.0]);
        assert_eq!(c, Color::rgba(255, 0, 128, 255));
    }
}
