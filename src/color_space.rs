//! CIE L*a*b* → XYZ → sRGB conversion.
//!
//! Observer 2°, illuminant D65. The pipeline runs in single precision with
//! the power terms evaluated in double precision, and the final byte values
//! are truncated rather than rounded or clamped. Out-of-gamut Lab input
//! therefore yields channel values outside 0..=255; use [`to_srgb8`] when a
//! real byte triple is needed.

use palette::{Lab, Srgb};

/// Reference white, D65 / 2° observer.
pub const REF_X: f32 = 95.047;
pub const REF_Y: f32 = 100.0;
pub const REF_Z: f32 = 108.883;

const EPSILON: f64 = 0.008856;
const KAPPA: f64 = 7.787;
const SRGB_THRESHOLD: f64 = 0.003_130_8;

/// Undo the cube-root compression of one Lab intermediate.
#[inline]
fn xyz_rectify(v: f32) -> f32 {
    let cube = f64::from(v).powi(3);
    if cube > EPSILON {
        cube as f32
    } else {
        (f64::from(v - 16.0 / 116.0) / KAPPA) as f32
    }
}

/// sRGB gamma encoding of one linear channel.
#[inline]
fn rgb_rectify(v: f32) -> f32 {
    let v = f64::from(v);
    if v > SRGB_THRESHOLD {
        (1.055 * v.powf(1.0 / 2.4) - 0.055) as f32
    } else {
        (12.92 * v) as f32
    }
}

/// Convert Lab to XYZ scaled by the reference white (Y in 0..=100).
pub fn lab_to_xyz(color: Lab) -> [f32; 3] {
    let fy = (color.l + 16.0) / 116.0;
    let fx = color.a / 500.0 + fy;
    let fz = fy - color.b / 200.0;

    [
        REF_X * xyz_rectify(fx),
        REF_Y * xyz_rectify(fy),
        REF_Z * xyz_rectify(fz),
    ]
}

/// Convert XYZ (Y in 0..=100) to gamma-encoded sRGB, truncated to integers.
pub fn xyz_to_rgb([x, y, z]: [f32; 3]) -> [i32; 3] {
    let x = x / 100.0;
    let y = y / 100.0;
    let z = z / 100.0;

    let r = x * 3.2406 + y * -1.5372 + z * -0.4986;
    let g = x * -0.9689 + y * 1.8758 + z * 0.0415;
    let b = x * 0.0557 + y * -0.2040 + z * 1.0570;

    [
        (rgb_rectify(r) * 255.0) as i32,
        (rgb_rectify(g) * 255.0) as i32,
        (rgb_rectify(b) * 255.0) as i32,
    ]
}

/// Convert a Lab color to an sRGB triple, nominally in 0..=255.
///
/// Values are truncated toward zero and never clamped.
pub fn to_rgb(color: Lab) -> [i32; 3] {
    xyz_to_rgb(lab_to_xyz(color))
}

/// Like [`to_rgb`], but clamped into a byte triple.
pub fn to_srgb8(color: Lab) -> Srgb<u8> {
    let [r, g, b] = to_rgb(color);
    let clamp = |c: i32| c.clamp(0, 255) as u8;
    Srgb::new(clamp(r), clamp(g), clamp(b))
}

/// Format a Lab color as an upper-case `RRGGBB` hex string.
pub fn to_hex(color: Lab) -> String {
    let c = to_srgb8(color);
    format!("{:02X}{:02X}{:02X}", c.red, c.green, c.blue)
}
