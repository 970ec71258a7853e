//! Text rendering utilities

use crate::canvas::Color;
use crate::Align;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text width in points (for alignment)
    pub text_width: f64,
    /// Fill color (RGB)
    pub color: Color,
}

/// Generate PDF operators for text insertion
///
/// Creates the PDF text operators (BT, rg, Tf, Td, Tj, ET) that render a
/// hex-encoded CID string with its anchor at (`x`, `y`).
///
/// # Arguments
/// * `text_hex` - Hex-encoded CIDs (e.g., "<00010002>")
/// * `x` - X coordinate in points (from left)
/// * `y` - Baseline Y coordinate in points (from bottom)
/// * `align` - Which point of the string sits at `x`
/// * `ctx` - Text rendering context
pub fn generate_text_operators(
    text_hex: &str,
    x: f64,
    y: f64,
    align: Align,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let x_offset = match align {
        Align::Left => 0.0,
        Align::Center => -ctx.text_width / 2.0,
        Align::Right => -ctx.text_width,
    };

    let mut ops = String::new();
    ops.push_str("BT\n");
    ops.push_str(&format!(
        "{} {} {} rg\n",
        fmt_num(ctx.color.r as f64),
        fmt_num(ctx.color.g as f64),
        fmt_num(ctx.color.b as f64)
    ));
    ops.push_str(&format!(
        "/{} {} Tf\n",
        ctx.font_name,
        fmt_num(ctx.font_size as f64)
    ));
    ops.push_str(&format!("{} {} Td\n", fmt_num(x + x_offset), fmt_num(y)));
    ops.push_str(&format!("{text_hex} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

/// Format a number for a content stream: at most three decimals, no trailing zeros
pub(crate) fn fmt_num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() {
        // Avoid "-0"
        format!("{}", rounded.trunc() as i64)
    } else {
        let s = format!("{rounded:.3}");
        s.trim_end_matches('0').to_string()
    }
}
