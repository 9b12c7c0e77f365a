use chrono::Utc;

/// Offset subtracted from the clock so suffixes stay short
const SLUG_EPOCH_MS: i64 = 1_762_605_336_987;

/// URL-safe organization slug with a time-based suffix, e.g.
/// `grace-community-church-1a2b3c`.
pub fn generate_slug(name: &str) -> String {
    slug_at(name, Utc::now().timestamp_millis())
}

pub fn slug_at(name: &str, now_ms: i64) -> String {
    let mut base = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            base.push(c);
        } else if !base.ends_with('-') {
            base.push('-');
        }
    }
    let base = base.trim_matches('-');

    format!("{}-{}", base, to_base36((now_ms - SLUG_EPOCH_MS).max(0) as u64))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
