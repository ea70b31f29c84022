//! Channel scoping.
//!
//! Both the bulk exporter and the live capturer decide whether a channel is
//! archived through [`ChannelFilter::in_scope`], so the two modes always agree.

use std::collections::BTreeSet;

/// Optional allow-list of channel ids or names.
///
/// With no tokens every channel is in scope. Otherwise a channel is in scope
/// iff its id or its name equals one of the tokens (case-sensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFilter {
    tokens: Option<BTreeSet<String>>,
}

impl ChannelFilter {
    /// Filter that admits every channel.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a filter from tokens. An empty token list admits every channel.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = tokens.into_iter().map(Into::into).collect();
        Self {
            tokens: (!set.is_empty()).then_some(set),
        }
    }

    /// Whether the filter admits every channel.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.tokens.is_none()
    }

    /// Tokens of the allow-list, sorted. Empty when unrestricted.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().flatten().map(String::as_str)
    }

    /// Whether a channel is in scope.
    #[must_use]
    pub fn in_scope(&self, channel_id: &str, channel_name: &str) -> bool {
        match &self.tokens {
            None => true,
            Some(set) => set.contains(channel_id) || set.contains(channel_name),
        }
    }
}

/// Free-function form of [`ChannelFilter::in_scope`]; `None` admits everything.
#[must_use]
pub fn in_scope(channel_id: &str, channel_name: &str, filter: Option<&ChannelFilter>) -> bool {
    filter.map_or(true, |f| f.in_scope(channel_id, channel_name))
}
