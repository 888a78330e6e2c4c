//! Synthetic buffers served by `imgbridge host`.

use imgbridge_schema::{BufferDescriptor, BufferType};

/// Pattern names `render` understands.
pub const PATTERNS: [&str; 3] = ["gradient", "checker", "ramp"];

const CHECKER_CELL: i32 = 8;

pub fn is_known(name: &str) -> bool {
    PATTERNS.contains(&name)
}

/// Render the pattern called `name` at `width` × `height`.
pub fn render(name: &str, width: i32, height: i32) -> Option<(BufferDescriptor, Vec<u8>)> {
    let w = width.max(1);
    let h = height.max(1);
    let (mut descriptor, pixels) = match name {
        "gradient" => {
            let span = (w + h - 2).max(1);
            let pixels = coords(w, h)
                .map(|(x, y)| ((x + y) * 255 / span) as u8)
                .collect();
            (
                BufferDescriptor::packed(name, w, h, 1, BufferType::UnsignedByte),
                pixels,
            )
        }
        "checker" => {
            let pixels = coords(w, h)
                .flat_map(|(x, y)| {
                    if (x / CHECKER_CELL + y / CHECKER_CELL) % 2 == 0 {
                        [255u8, 255, 255]
                    } else {
                        [200u8, 0, 0]
                    }
                })
                .collect();
            (
                BufferDescriptor::packed(name, w, h, 3, BufferType::UnsignedByte),
                pixels,
            )
        }
        "ramp" => {
            let span = (w - 1).max(1) as f32;
            let pixels = coords(w, h)
                .flat_map(|(x, _)| (x as f32 / span).to_ne_bytes())
                .collect();
            (
                BufferDescriptor::packed(name, w, h, 1, BufferType::Float32),
                pixels,
            )
        }
        _ => return None,
    };
    descriptor.display_name = format!("{name} ({w}x{h})");
    Some((descriptor, pixels))
}

fn coords(width: i32, height: i32) -> impl Iterator<Item = (i32, i32)> {
    (0..height).flat_map(move |y| (0..width).map(move |x| (x, y)))
}
