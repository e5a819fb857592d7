//! Response hygiene applied to every string that leaves the bot.

/// Hard cap enforced by the Discord API for normal message content.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Truncate `text` so it never exceeds [`DISCORD_MESSAGE_LIMIT`] characters,
/// appending an ellipsis when anything was cut. Operates on chars, never
/// splits a multi-byte sequence.
pub fn truncate_for_discord(text: &str) -> String {
    truncate_with_limit(text, DISCORD_MESSAGE_LIMIT)
}

pub fn truncate_with_limit(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let mut out: String = text.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Strip the `<<sys>> ... <</sys>>` marker pair the system prompt uses to
/// fence operator instructions. Models occasionally echo the fenced block
/// back; anything between the markers must never reach a channel.
pub fn sanitize_response(text: &str) -> String {
    use regex::Regex;

    let fenced = Regex::new(r"(?s)<<sys>>.*?<</sys>>").unwrap();
    let cleaned = fenced.replace_all(text, "");

    // Unpaired markers get dropped as well so a half-leak doesn't render.
    cleaned
        .replace("<<sys>>", "")
        .replace("<</sys>>", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_passes_through_untouched() {
        assert_eq!(truncate_for_discord("hello"), "hello");
    }

    #[test]
    fn truncation_never_exceeds_limit_and_keeps_ellipsis() {
        let long = "x".repeat(DISCORD_MESSAGE_LIMIT + 500);
        let out = truncate_for_discord(&long);
        assert!(out.chars().count() <= DISCORD_MESSAGE_LIMIT);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn truncation_is_char_boundary_safe() {
        let long = "é".repeat(50);
        let out = truncate_with_limit(&long, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn exact_limit_is_not_truncated() {
        let exact = "a".repeat(DISCORD_MESSAGE_LIMIT);
        assert_eq!(truncate_for_discord(&exact), exact);
    }

    #[test]
    fn sanitize_strips_marker_pair_anywhere() {
        let leaked = "before <<sys>>secret instructions<</sys>> after";
        assert_eq!(sanitize_response(leaked), "before  after".trim());

        let leading = "<<sys>>all of it<</sys>>visible";
        assert_eq!(sanitize_response(leading), "visible");
    }

    #[test]
    fn sanitize_strips_multiple_and_unpaired_markers() {
        let twice = "<<sys>>a<</sys>>ok<<sys>>b<</sys>>";
        assert_eq!(sanitize_response(twice), "ok");

        let half = "fine <<sys>> dangling";
        assert_eq!(sanitize_response(half), "fine  dangling".trim());
    }
}
