use crate::color::Color;

/// Drawing tools. The numeric ids are stored in settings and accepted by the
/// remote `draw` procedure, so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ToolKind {
    #[default]
    None = 0,
    Pencil = 1,
    Brush = 2,
    Line = 3,
    RectOutline = 4,
    RectFill = 5,
    EllipseOutline = 6,
    EllipseFill = 7,
    SelectRect = 8,
    SelectEllipse = 9,
    Stamp = 10,
    Image = 11,
}

impl ToolKind {
    pub const ALL: [ToolKind; 12] = [
        ToolKind::None,
        ToolKind::Pencil,
        ToolKind::Brush,
        ToolKind::Line,
        ToolKind::RectOutline,
        ToolKind::RectFill,
        ToolKind::EllipseOutline,
        ToolKind::EllipseFill,
        ToolKind::SelectRect,
        ToolKind::SelectEllipse,
        ToolKind::Stamp,
        ToolKind::Image,
    ];

    /// Unknown ids map to [`ToolKind::None`].
    pub fn from_id(id: i64) -> Self {
        usize::try_from(id)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .unwrap_or(ToolKind::None)
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolKind::None => "None",
            ToolKind::Pencil => "Pencil",
            ToolKind::Brush => "Brush",
            ToolKind::Line => "Line",
            ToolKind::RectOutline => "Rectangle outline",
            ToolKind::RectFill => "Rectangle fill",
            ToolKind::EllipseOutline => "Ellipse outline",
            ToolKind::EllipseFill => "Ellipse fill",
            ToolKind::SelectRect => "Select rectangle",
            ToolKind::SelectEllipse => "Select ellipse",
            ToolKind::Stamp => "Stamp",
            ToolKind::Image => "Image",
        }
    }

    /// Tools that paint continuously while the pointer moves.
    pub fn paints_on_move(self) -> bool {
        matches!(self, ToolKind::Pencil | ToolKind::Brush)
    }

    /// Tools that paint once, on release, from the press position to the
    /// release position.
    pub fn commits_on_release(self) -> bool {
        matches!(
            self,
            ToolKind::Line
                | ToolKind::RectOutline
                | ToolKind::RectFill
                | ToolKind::EllipseOutline
                | ToolKind::EllipseFill
                | ToolKind::Image
        )
    }

    pub fn is_selection(self) -> bool {
        matches!(self, ToolKind::SelectRect | ToolKind::SelectEllipse)
    }

    /// Tools that need the tool image to draw anything.
    pub fn uses_image(self) -> bool {
        matches!(self, ToolKind::Stamp | ToolKind::Image)
    }
}

/// The active tool and its paint parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolState {
    pub kind: ToolKind,
    pub color: Color,
    /// Opacity in percent, `-100..=100`. Negative values erase.
    pub alpha: f32,
    /// Stroke diameter in pixels.
    pub size: f32,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            kind: ToolKind::None,
            color: Color::from_packed(0xFF0000FF),
            alpha: 100.0,
            size: 10.0,
        }
    }
}

impl ToolState {
    pub fn erases(&self) -> bool {
        self.alpha < 0.0
    }

    /// Opacity magnitude in `0.0..=1.0`.
    pub fn opacity(&self) -> f32 {
        (self.alpha.abs() / 100.0).min(1.0)
    }

    /// Tool color as normalized RGB with the signed opacity in the fourth lane.
    pub fn signed_color(&self) -> [f32; 4] {
        let [r, g, b, _] = self.color.normalize();
        [r, g, b, (self.alpha / 100.0).clamp(-1.0, 1.0)]
    }
}
