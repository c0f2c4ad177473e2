//! SVG text helpers: escaping, number and color formatting.

use std::fmt::Write as _;

use crate::util::{ColorTransform, Matrix, Rgba, Vec2};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Escape text for element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Not representable in XML 1.0.
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// Number with at most `precision` decimals and no trailing zeros.
pub fn num(v: f32, precision: usize) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{:.*}", precision, v);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Like [`num`] but keeps one decimal on whole numbers (`1.0`, `0.0`).
pub fn unit(v: f32, precision: usize) -> String {
    let s = num(v, precision.max(1));
    if s.contains('.') {
        s
    } else {
        s + ".0"
    }
}

/// `rgba(r,g,b,a)` with alpha as a unit float.
pub fn rgba(c: Rgba, precision: usize) -> String {
    format!("rgba({},{},{},{})", c.r, c.g, c.b, unit(c.alpha_unit(), precision))
}

/// `rgb(r,g,b)` for attributes that carry alpha separately.
pub fn rgb(c: Rgba) -> String {
    format!("rgb({},{},{})", c.r, c.g, c.b)
}

/// `x,y x,y ...`
pub fn points(pts: impl IntoIterator<Item = Vec2>, precision: usize) -> String {
    let mut out = String::new();
    for (i, p) in pts.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{},{}", num(p.x, precision), num(p.y, precision));
    }
    out
}

/// `matrix(a, b, c, d, e, f)`
pub fn matrix(m: &Matrix, precision: usize) -> String {
    let parts: Vec<String> = m.to_svg_components().iter().map(|&v| num(v, precision)).collect();
    format!("matrix({})", parts.join(", "))
}

/// `feColorMatrix` values for a color transform (offsets in unit color).
pub fn color_matrix(cx: &ColorTransform, precision: usize) -> String {
    let m = |i: usize| num(cx.mul[i], precision);
    let a = |i: usize| num(cx.add[i], precision);
    format!(
        "{} 0 0 0 {} 0 {} 0 0 {} 0 0 {} 0 {} 0 0 0 {} {}",
        m(0),
        a(0),
        m(1),
        a(1),
        m(2),
        a(2),
        m(3),
        a(3)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b & "c" 'd'>"#), "a&lt;b &amp; &quot;c&quot; &apos;d&apos;&gt;");
        assert_eq!(escape("tab\tok\u{1}"), "tab\tok\u{FFFD}");
    }

    #[test]
    fn test_number_format() {
        assert_eq!(num(2.0, 6), "2");
        assert_eq!(num(0.5, 6), "0.5");
        assert_eq!(num(-0.0000001, 3), "0");
        assert_eq!(num(1.0 / 3.0, 3), "0.333");
        assert_eq!(num(f32::NAN, 3), "0");
        assert_eq!(unit(1.0, 6), "1.0");
        assert_eq!(unit(0.5, 6), "0.5");
    }

    #[test]
    fn test_colors() {
        assert_eq!(rgba(Rgba::new(255, 0, 0, 255), 6), "rgba(255,0,0,1.0)");
        assert_eq!(rgba(Rgba::new(1, 2, 3, 0), 6), "rgba(1,2,3,0.0)");
        assert_eq!(rgb(Rgba::WHITE), "rgb(255,255,255)");
    }

    #[test]
    fn test_points_and_matrix() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(10.5, -2.0)];
        assert_eq!(points(pts, 6), "0,0 10.5,-2");
        assert_eq!(matrix(&Matrix::translate(3.0, 4.0), 6), "matrix(1, 0, 0, 1, 3, 4)");
    }

    #[test]
    fn test_color_matrix_layout() {
        let cx = ColorTransform { mul: [0.5, 1.0, 1.0, 0.25], add: [0.0, 0.0, 0.2, 0.0] };
        assert_eq!(color_matrix(&cx, 6), "0.5 0 0 0 0 0 1 0 0 0 0 0 1 0 0.2 0 0 0 0.25 0");
    }
}
