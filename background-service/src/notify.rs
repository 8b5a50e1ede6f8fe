use crate::filter::truncate_chars;
use discord_webhook::{Embed, EmbedAuthor, WebhookPayload};
use subwatch_core::CandidateItem;

/// Embed descriptions are cut at this many characters.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

const TRUNCATION_MARKER: &str = " ...";

/// Shown when a subreddit exposes neither a primary nor a community icon.
pub const DEFAULT_GROUP_ICON: &str =
    "https://www.redditstatic.com/desktop2x/img/favicon/android-icon-192x192.png";

const UNKNOWN_AUTHOR: &str = "[deleted]";

/// Builds the outbound webhook payload for one item. Pure transformation
/// over already-fetched fields; missing presentation data falls back to
/// raw names and the default icon.
pub fn build_payload(item: &CandidateItem) -> WebhookPayload {
    let display_name = item
        .group_display_name
        .as_deref()
        .unwrap_or(&item.source_group);

    let icon = item
        .group_icon_url
        .as_deref()
        .or(item.group_community_icon_url.as_deref())
        .unwrap_or(DEFAULT_GROUP_ICON);

    let description = match truncate_chars(&item.body, DESCRIPTION_MAX_CHARS) {
        prefix if prefix.len() == item.body.len() => item.body.clone(),
        prefix => format!("{prefix}{TRUNCATION_MARKER}"),
    };

    let author_name = item.author_name.as_deref().unwrap_or(UNKNOWN_AUTHOR);

    WebhookPayload {
        username: format!("r/{display_name}"),
        avatar_url: icon.to_string(),
        embeds: vec![Embed {
            title: format!("New {} in r/{}", item.kind, display_name),
            description,
            url: format!("https://reddit.com{}", item.permalink),
            author: EmbedAuthor {
                name: format!("u/{author_name}"),
                url: format!("https://reddit.com/u/{author_name}"),
                icon_url: item.author_avatar_url.clone(),
            },
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::item;

    #[test]
    fn test_long_body_is_truncated_with_marker() {
        let it = item("a1", &"x".repeat(600));

        let payload = build_payload(&it);
        let description = &payload.embeds[0].description;
        assert_eq!(description.chars().count(), 500 + TRUNCATION_MARKER.len());
        assert!(description.starts_with(&"x".repeat(500)));
        assert!(description.ends_with(" ..."));
    }

    #[test]
    fn test_short_body_is_unmodified() {
        let it = item("a1", &"y".repeat(400));
        let payload = build_payload(&it);
        assert_eq!(payload.embeds[0].description, "y".repeat(400));
    }

    #[test]
    fn test_exactly_500_chars_is_unmodified() {
        let it = item("a1", &"z".repeat(500));
        let payload = build_payload(&it);
        assert_eq!(payload.embeds[0].description, "z".repeat(500));
    }

    #[test]
    fn test_icon_fallback_prefers_primary_icon() {
        let mut it = item("a1", "body");
        it.group_icon_url = Some("https://example.com/primary.png".to_string());
        it.group_community_icon_url = Some("https://example.com/community.png".to_string());

        let payload = build_payload(&it);
        assert_eq!(payload.avatar_url, "https://example.com/primary.png");
    }

    #[test]
    fn test_icon_fallback_uses_community_icon() {
        let mut it = item("a1", "body");
        it.group_icon_url = None;
        it.group_community_icon_url = Some("https://example.com/community.png".to_string());

        let payload = build_payload(&it);
        assert_eq!(payload.avatar_url, "https://example.com/community.png");
    }

    #[test]
    fn test_icon_fallback_defaults_to_hardcoded() {
        let mut it = item("a1", "body");
        it.group_icon_url = None;
        it.group_community_icon_url = None;

        let payload = build_payload(&it);
        assert_eq!(payload.avatar_url, DEFAULT_GROUP_ICON);
    }

    #[test]
    fn test_payload_shape() {
        let it = item("a1", "a subwatch mention");
        let payload = build_payload(&it);

        assert_eq!(payload.username, "r/rust");
        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "New comment in r/rust");
        assert!(embed.url.starts_with("https://reddit.com/r/rust/"));
        assert_eq!(embed.author.name, "u/some_user");
        assert_eq!(embed.author.url, "https://reddit.com/u/some_user");
    }

    #[test]
    fn test_missing_author_renders_as_deleted() {
        let mut it = item("a1", "body");
        it.author_name = None;

        let payload = build_payload(&it);
        assert_eq!(payload.embeds[0].author.name, "u/[deleted]");
    }
}
