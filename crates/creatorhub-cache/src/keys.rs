//! Cache key builders for all CreatorHub cache entries.
//!
//! Keys have the shape `{prefix}:{identifier}[:{params}]` where `params`
//! is `k=v` pairs sorted by name and joined with `&`. Construction is a
//! pure function of its inputs, so the same logical query always maps to
//! the same key no matter what order its parameters were supplied in.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::ttl::CacheCategory;

/// The closed set of entity prefixes a cache key may start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityPrefix {
    Creator,
    Creators,
    Post,
    Posts,
    Likes,
    Comments,
    Followers,
    Following,
    Trending,
}

impl EntityPrefix {
    /// The literal prefix text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Creators => "creators",
            Self::Post => "post",
            Self::Posts => "posts",
            Self::Likes => "likes",
            Self::Comments => "comments",
            Self::Followers => "followers",
            Self::Following => "following",
            Self::Trending => "trending",
        }
    }

    /// Parse the literal prefix text.
    pub fn parse(text: &str) -> Option<Self> {
        let prefix = match text {
            "creator" => Self::Creator,
            "creators" => Self::Creators,
            "post" => Self::Post,
            "posts" => Self::Posts,
            "likes" => Self::Likes,
            "comments" => Self::Comments,
            "followers" => Self::Followers,
            "following" => Self::Following,
            "trending" => Self::Trending,
            _ => return None,
        };
        Some(prefix)
    }

    /// TTL category used when a key under this prefix has no more
    /// specific category (search keys are the exception).
    pub fn category(self) -> CacheCategory {
        match self {
            Self::Creator | Self::Creators => CacheCategory::Creators,
            Self::Post | Self::Posts => CacheCategory::Posts,
            Self::Likes => CacheCategory::Likes,
            Self::Comments => CacheCategory::Comments,
            Self::Followers | Self::Following => CacheCategory::Follows,
            Self::Trending => CacheCategory::Trending,
        }
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier used for paginated collection keys.
pub const LIST: &str = "list";

/// Identifier used for search keys.
pub const SEARCH: &str = "search";

/// TTL category of an existing key, inferred from its prefix and
/// identifier. Keys outside the known prefixes fall in
/// [`CacheCategory::Default`].
pub fn category_of(key: &str) -> CacheCategory {
    let mut segments = key.splitn(3, ':');
    let Some(prefix) = segments.next().and_then(EntityPrefix::parse) else {
        return CacheCategory::Default;
    };
    if segments.next() == Some(SEARCH) {
        return CacheCategory::Search;
    }
    prefix.category()
}

const NO_PARAMS: [(&str, &str); 0] = [];

/// Build a cache key from a prefix, an identifier, and query parameters.
///
/// Parameters are sorted by name; a repeated name keeps its last value.
pub fn build_key<I, K, V>(prefix: EntityPrefix, identifier: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect();

    if sorted.is_empty() {
        return format!("{prefix}:{identifier}");
    }

    let params = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!("{prefix}:{identifier}:{params}")
}

// ── Creator keys ───────────────────────────────────────────

/// Cache key for a creator by ID.
pub fn creator(creator_id: Uuid) -> String {
    build_key(EntityPrefix::Creator, &creator_id.to_string(), NO_PARAMS)
}

/// Cache key for a page of creators.
pub fn creators(page: u32, limit: u32) -> String {
    build_key(
        EntityPrefix::Creators,
        LIST,
        [("page", page.to_string()), ("limit", limit.to_string())],
    )
}

/// Cache key for a creator looked up by username.
pub fn creator_by_username(username: &str) -> String {
    build_key(EntityPrefix::Creator, "username", [("username", username)])
}

/// Cache key for a creator search.
pub fn creator_search(query: &str) -> String {
    build_key(EntityPrefix::Creators, SEARCH, [("query", query)])
}

// ── Post keys ──────────────────────────────────────────────

/// Cache key for a post by ID.
pub fn post(post_id: Uuid) -> String {
    build_key(EntityPrefix::Post, &post_id.to_string(), NO_PARAMS)
}

/// Cache key for a page of the post feed filtered by status.
pub fn posts(page: u32, limit: u32, status: &str) -> String {
    build_key(
        EntityPrefix::Posts,
        LIST,
        [
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("status", status.to_string()),
        ],
    )
}

/// Cache key for a page of one creator's posts.
pub fn posts_by_creator(creator_id: Uuid, page: u32, limit: u32) -> String {
    build_key(
        EntityPrefix::Posts,
        &format!("creator:{creator_id}"),
        [("page", page), ("limit", limit)],
    )
}

/// Cache key for the trending posts list.
pub fn trending_posts(limit: u32) -> String {
    build_key(EntityPrefix::Posts, "trending", [("limit", limit)])
}

/// Cache key for a post search.
pub fn post_search(query: &str) -> String {
    build_key(EntityPrefix::Posts, SEARCH, [("query", query)])
}

// ── Social keys ────────────────────────────────────────────

/// Cache key for the likes on a post.
pub fn post_likes(post_id: Uuid) -> String {
    build_key(EntityPrefix::Likes, &format!("post:{post_id}"), NO_PARAMS)
}

/// Cache key for the posts a user has liked.
pub fn user_likes(user_id: Uuid) -> String {
    build_key(EntityPrefix::Likes, &format!("user:{user_id}"), NO_PARAMS)
}

/// Cache key for a page of comments on a post.
pub fn post_comments(post_id: Uuid, page: u32, limit: u32) -> String {
    build_key(
        EntityPrefix::Comments,
        &format!("post:{post_id}"),
        [("page", page), ("limit", limit)],
    )
}

/// Cache key for a page of a user's followers.
pub fn user_followers(user_id: Uuid, page: u32, limit: u32) -> String {
    build_key(
        EntityPrefix::Followers,
        &format!("user:{user_id}"),
        [("page", page), ("limit", limit)],
    )
}

/// Cache key for a page of the users a user follows.
pub fn user_following(user_id: Uuid, page: u32, limit: u32) -> String {
    build_key(
        EntityPrefix::Following,
        &format!("user:{user_id}"),
        [("page", page), ("limit", limit)],
    )
}

// ── Trending keys ──────────────────────────────────────────

/// Cache key for trending topics.
pub fn trending_topics() -> String {
    build_key(EntityPrefix::Trending, "topics", NO_PARAMS)
}
