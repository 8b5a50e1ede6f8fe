use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Comment,
    Post,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Comment => write!(f, "comment"),
            ItemKind::Post => write!(f, "post"),
        }
    }
}

/// A comment or post fetched for evaluation in one poll cycle. Built fresh
/// each cycle; only `id` outlives the cycle (in the seen set).
#[derive(Debug, Clone)]
pub struct CandidateItem {
    pub id: String,
    pub kind: ItemKind,
    pub body: String,
    pub source_group: String,
    pub permalink: String,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub group_display_name: Option<String>,
    pub group_icon_url: Option<String>,
    pub group_community_icon_url: Option<String>,
}
