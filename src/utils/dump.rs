/// Helpers for rendering raw uevent payloads in trace logs
use std::fmt::Write;

/// Render a NUL-separated payload as `LINE | LINE | ...`.
///
/// Non-printable bytes become `.`; anything past `max_bytes` (default 512)
/// is summarized.
pub fn payload_summary(data: &[u8], max_bytes: Option<usize>) -> String {
    let limit = max_bytes.unwrap_or(512);
    let shown = &data[..limit.min(data.len())];

    let mut output = shown
        .split(|&b| b == 0)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" | ");

    if data.len() > limit {
        let _ = write!(output, " ... ({} more bytes)", data.len() - limit);
    }

    output
}

/// Compact hex of the first `max_bytes` (default 32), for binary headers
pub fn hex_preview(data: &[u8], max_bytes: Option<usize>) -> String {
    let limit = max_bytes.unwrap_or(32);
    let shown = &data[..limit.min(data.len())];

    let mut hex = shown
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");

    if data.len() > limit {
        let _ = write!(hex, " ... ({} more)", data.len() - limit);
    }

    hex
}
