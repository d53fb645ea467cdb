//! Document URL classification.

use std::sync::LazyLock;

use regex::Regex;

use larkdoc_shared::{LarkDocError, ResolvedIdentifier, Result};

/// Resolve a Lark document URL into its raw token.
///
/// Accepts `.../docx/<token>` and `.../wiki/<token>` where the token is
/// ASCII alphanumeric. The first match in the URL wins; when the docx group
/// matched its token is used, otherwise the wiki group's.
///
/// `is_wiki` is a plain substring test for `/wiki/` on the whole URL and is
/// not derived from which group matched, so a docx URL that also contains
/// `/wiki/` elsewhere is routed through the wiki lookup.
pub fn resolve(url: &str) -> Result<ResolvedIdentifier> {
    static DOC_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"/docx/([A-Za-z0-9]+)|/wiki/([A-Za-z0-9]+)").expect("valid regex")
    });

    let caps = DOC_RE.captures(url).ok_or(LarkDocError::InvalidUrlFormat)?;
    let raw_id = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
        .ok_or(LarkDocError::InvalidUrlFormat)?;

    Ok(ResolvedIdentifier {
        raw_id,
        is_wiki: url.contains("/wiki/"),
    })
}
