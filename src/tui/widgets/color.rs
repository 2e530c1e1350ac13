use ratatui::style::Color;

/// Theme color names, with approximate RGB used for contrast decisions
const NAMED: &[(&str, Color, (u8, u8, u8))] = &[
    ("black", Color::Black, (0, 0, 0)),
    ("red", Color::Red, (205, 0, 0)),
    ("green", Color::Green, (0, 205, 0)),
    ("yellow", Color::Yellow, (205, 205, 0)),
    ("blue", Color::Blue, (0, 0, 238)),
    ("magenta", Color::Magenta, (205, 0, 205)),
    ("cyan", Color::Cyan, (0, 205, 205)),
    ("white", Color::White, (255, 255, 255)),
    ("gray", Color::Gray, (190, 190, 190)),
    ("darkgray", Color::DarkGray, (127, 127, 127)),
    ("lightred", Color::LightRed, (255, 85, 85)),
    ("lightgreen", Color::LightGreen, (85, 255, 85)),
    ("lightyellow", Color::LightYellow, (255, 255, 85)),
    ("lightblue", Color::LightBlue, (92, 92, 255)),
    ("lightmagenta", Color::LightMagenta, (255, 85, 255)),
    ("lightcyan", Color::LightCyan, (85, 255, 255)),
];

/// Parse a theme color: a name ("blue", "darkgrey"), "#RRGGBB", "#RGB" or
/// "rgb(r, g, b)". Anything else is white.
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase().replace("grey", "gray");
    if s == "lightgray" {
        // ratatui has no separate light gray
        return Color::Gray;
    }
    if let Some((_, color, _)) = NAMED.iter().find(|(name, _, _)| *name == s) {
        return *color;
    }
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).unwrap_or(Color::White);
    }
    if let Some(body) = s.strip_prefix("rgb(").and_then(|rest| rest.strip_suffix(')')) {
        return parse_rgb(body).unwrap_or(Color::White);
    }
    Color::White
}

fn parse_hex(hex: &str) -> Option<Color> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            // #abc is #aabbcc
            let r = channel(&hex[0..1])?;
            let g = channel(&hex[1..2])?;
            let b = channel(&hex[2..3])?;
            Some(Color::Rgb(r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

fn parse_rgb(body: &str) -> Option<Color> {
    let parts: Vec<u8> = body
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect::<Option<_>>()?;
    match parts[..] {
        [r, g, b] => Some(Color::Rgb(r, g, b)),
        _ => None,
    }
}

/// Inverse of [`parse_color`] for the colors it produces
pub fn format_color_for_display(color: &Color) -> String {
    match color {
        Color::Rgb(r, g, b) => format!("#{:02X}{:02X}{:02X}", r, g, b),
        Color::Reset => "reset".to_string(),
        Color::Indexed(i) => format!("indexed({})", i),
        other => NAMED
            .iter()
            .find(|(_, named, _)| named == other)
            .map(|(name, _, _)| name.to_string())
            .unwrap_or_else(|| "white".to_string()),
    }
}

fn approximate_rgb(color: Color) -> (u8, u8, u8) {
    match color {
        Color::Rgb(r, g, b) => (r, g, b),
        other => NAMED
            .iter()
            .find(|(_, named, _)| *named == other)
            .map(|(_, _, rgb)| *rgb)
            .unwrap_or((128, 128, 128)),
    }
}

/// WCAG relative luminance, 0.0 (black) to 1.0 (white)
fn relative_luminance(color: Color) -> f64 {
    let linear = |channel: u8| {
        let c = channel as f64 / 255.0;
        if c <= 0.03928 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
    };
    let (r, g, b) = approximate_rgb(color);
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// Black or white, whichever reads better on `background`
pub fn get_contrast_text_color(background: Color) -> Color {
    if relative_luminance(background) < 0.4 {
        Color::White
    } else {
        Color::Black
    }
}
