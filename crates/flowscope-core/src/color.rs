//! Deterministic object-type coloring.
//!
//! Either picks from a preselected palette or, when more colors are needed
//! than the palette holds, generates them by sweeping the hue through
//! full-saturation/value HSV. The two schemes are never mixed: a generated
//! color could collide with an already-handed-out preselected one.

/// Fixed palette used when at most nine object types are selected.
const PALETTE: [&str; 9] = [
    "#E53935", "#1E88E5", "#7CB342", "#FF9800", "#5E35B1", "#FDD835",
    "#00897B", "#D81B60", "#795548",
];

/// Returns the display color for the object type at `index` out of `total`
/// selected types.
pub fn object_type_color(total: usize, index: usize) -> String {
    debug_assert!(index < total);

    if total <= PALETTE.len() {
        PALETTE[index].to_string()
    } else {
        hue_swept_color(total, index)
    }
}

/// Full-saturation, full-value HSV color at hue `index / total`, converted
/// to RGB through the standard six-sector formula.
fn hue_swept_color(total: usize, index: usize) -> String {
    let h = index as f64 / total as f64;
    let sector = (h * 6.0) as u32;
    let f = h * 6.0 - sector as f64;
    let q = 1.0 - f;

    let (r, g, b) = match sector % 6 {
        0 => (1.0, f, 0.0),
        1 => (q, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, q, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, q),
    };

    format!(
        "#{:02x}{:02x}{:02x}",
        (r * 255.0) as u8,
        (g * 255.0) as u8,
        (b * 255.0) as u8
    )
}
