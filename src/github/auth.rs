//! GitHub credential handling.
//!
//! GitHub issues two families of tokens. Fine-grained tokens
//! (`github_pat_...`) are sent as `Bearer`, classic tokens (`ghp_`, `gho_`,
//! `ghu_`, `ghs_`, `ghr_`) and anything unrecognised as `token`. The family is
//! decided from the prefix alone.

use std::fmt;

/// Token family, detected from the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    FineGrained,
    PersonalAccess,
    OAuth,
    UserToServer,
    ServerToServer,
    Refresh,
    /// Unknown prefix; treated like a classic token.
    Classic,
}

impl TokenKind {
    #[must_use]
    pub fn classify(token: &str) -> Self {
        const PREFIXES: [(&str, TokenKind); 6] = [
            ("github_pat_", TokenKind::FineGrained),
            ("ghp_", TokenKind::PersonalAccess),
            ("gho_", TokenKind::OAuth),
            ("ghu_", TokenKind::UserToServer),
            ("ghs_", TokenKind::ServerToServer),
            ("ghr_", TokenKind::Refresh),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| token.starts_with(prefix))
            .map_or(TokenKind::Classic, |(_, kind)| *kind)
    }

    #[must_use]
    pub fn is_fine_grained(&self) -> bool {
        matches!(self, TokenKind::FineGrained)
    }

    /// `Authorization` scheme for this family.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.is_fine_grained() { "Bearer" } else { "token" }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TokenKind::FineGrained => "fine-grained",
            TokenKind::PersonalAccess => "classic (personal access)",
            TokenKind::OAuth => "classic (OAuth)",
            TokenKind::UserToServer => "classic (user-to-server)",
            TokenKind::ServerToServer => "classic (server-to-server)",
            TokenKind::Refresh => "classic (refresh)",
            TokenKind::Classic => "classic",
        };
        f.write_str(label)
    }
}

/// A GitHub token that never prints itself in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    kind: TokenKind,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into().trim().to_string();
        let kind = TokenKind::classify(&token);
        Self {
            token,
            kind,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.kind.scheme(), self.token)
    }

    /// Loggable prefix: 15 characters for fine-grained tokens, 10 otherwise.
    #[must_use]
    pub fn masked(&self) -> String {
        let keep = if self.kind.is_fine_grained() { 15 } else { 10 };
        let prefix: String = self.token.chars().take(keep).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("kind", &self.kind)
            .field("token", &self.masked())
            .finish()
    }
}
