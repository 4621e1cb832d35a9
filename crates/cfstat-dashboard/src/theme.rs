use ratatui::style::{Color, Modifier, Style};

pub const PANEL_BORDER: Color = Color::Cyan;
pub const PANEL_TEXT: Color = Color::White;
pub const SUMMARY_TEXT: Color = Color::Red;
pub const DISK_BAR: Color = Color::Yellow;
pub const SCALE_TEXT: Color = Color::Yellow;

pub const SCALE_TITLE_STYLE: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Red)
    .add_modifier(Modifier::BOLD);
pub const SCALE_BORDER_STYLE: Style = Style::new().fg(Color::Red);

const INSTANCE_PALETTE: [Color; 6] = [
    Color::Green,
    Color::Magenta,
    Color::Red,
    Color::Blue,
    Color::Yellow,
    Color::Cyan,
];

/// Colour for the instance drawn at `position`; the palette wraps after six.
pub fn instance_color(position: usize) -> Color {
    INSTANCE_PALETTE[position % INSTANCE_PALETTE.len()]
}
