use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const ELLIPSIS: char = '…';
pub const TOKEN_ABBREVIATION_THRESHOLD: u64 = 1_000;

/// `125` renders as `2m 5s`, `45` as `45s`. Minutes are never folded into hours.
pub fn format_elapsed(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// The unit is picked after rounding to tenths, so `999_950` reads `1.0M`
/// rather than `1000.0k`.
pub fn format_tokens(count: u64) -> String {
    if count < TOKEN_ABBREVIATION_THRESHOLD {
        return count.to_string();
    }
    let tenths_k = count.saturating_add(50) / 100;
    if tenths_k < 10_000 {
        return format!("{}.{}k", tenths_k / 10, tenths_k % 10);
    }
    let tenths_m = count.saturating_add(50_000) / 100_000;
    format!("{}.{}M", tenths_m / 10, tenths_m % 10)
}

pub fn format_cost(usd: f64) -> String {
    if !usd.is_finite() || usd < 0.0 {
        return "$0.00".to_string();
    }
    format!("${usd:.2}")
}

/// Terminal columns `text` occupies. CJK and most emoji take two.
pub fn display_width(text: &str) -> usize {
    text.width()
}

/// Longest prefix of `text` that fits in `width` columns. A wide character
/// that would straddle the edge is dropped whole.
pub fn clip_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    out
}

/// Longest suffix of `text` that fits in `width` columns.
pub fn clip_start_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut kept = Vec::new();
    for ch in text.chars().rev() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        kept.push(ch);
    }
    kept.into_iter().rev().collect()
}

/// Clips `text` to `width` columns, ending in an ellipsis when anything was
/// cut.
pub fn truncate(text: &str, width: usize) -> String {
    if display_width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = clip_to_width(text, width - 1);
    out.push(ELLIPSIS);
    out
}

pub fn pad_right(text: &str, width: usize) -> String {
    let clipped = truncate(text, width);
    let fill = width.saturating_sub(display_width(&clipped));
    format!("{clipped}{}", " ".repeat(fill))
}

/// Pads to `width` columns without ever cutting `text`.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{text}{}", " ".repeat(fill))
}

/// Wall-clock `HH:MM:SS` (UTC) for a unix timestamp in milliseconds.
pub fn format_clock(timestamp_ms: u64) -> String {
    let seconds_of_day = (timestamp_ms / 1_000) % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        seconds_of_day / 3_600,
        (seconds_of_day % 3_600) / 60,
        seconds_of_day % 60
    )
}
