//! Neon ASCII banner with a vertical gradient (WA-DISPATCH).

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// WhatsApp green (#25d366).
const WA_GREEN: (u8, u8, u8) = (0x25, 0xd3, 0x66);
/// Teal (#128c7e).
const WA_TEAL: (u8, u8, u8) = (0x12, 0x8c, 0x7e);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| (f64::from(x) * (1.0 - t) + f64::from(y) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Banner art, or `None` if figlet cannot render it.
fn render_art(text: &str) -> Option<String> {
    let font = FIGfont::standard().ok()?;
    font.convert(text).map(|figure| figure.to_string())
}

/// Prints "WA-DISPATCH" with a green-to-teal gradient, then the version and
/// whether live delivery is wired.
pub fn print_welcome(live: bool) {
    let mut out = stdout();
    let art = render_art("WA-DISPATCH").unwrap_or_else(|| "WA-DISPATCH".to_string());
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len();

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(WA_GREEN, WA_TEAL, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let (r, g, b) = WA_GREEN;
    let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
    let _ = out.execute(Print(format!("v{}\r\n", env!("CARGO_PKG_VERSION"))));
    let mode = if live {
        "Live delivery via WhatsApp Cloud API\r\n"
    } else {
        "Dry run: provider calls are simulated\r\n"
    };
    let _ = out.execute(Print(mode));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}
