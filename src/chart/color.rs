const SATURATION: f64 = 0.7;
const LIGHTNESS: f64 = 0.5;

/// `n` distinct `#rrggbb` colors with hues spread evenly around the wheel.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let hue = (i as f64 * 360.0 / n as f64) % 360.0;
            hsl_to_hex(hue / 360.0, SATURATION, LIGHTNESS)
        })
        .collect()
}

fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    };
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_hex_colors() {
        let colors = palette(3);
        assert_eq!(colors.len(), 3);
        assert!(colors.iter().all(|c| c.starts_with('#') && c.len() == 7));
        assert_eq!(colors[0], "#d92626");
        assert_ne!(colors[1], colors[2]);
    }

    #[test]
    fn empty_palette() {
        assert!(palette(0).is_empty());
    }
}
