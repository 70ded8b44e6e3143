//! Filename sanitization for data-transfer metadata.

use unicode_normalization::UnicodeNormalization;

use crate::error::CoreError;

/// Reduce a caller-supplied filename to a safe bare name.
///
/// Directory components (`/` or `\` separated) are dropped. The rest is
/// NFKD-normalized so accented letters keep their ASCII base, whitespace runs
/// become `_`, anything outside `[A-Za-z0-9._-]` is removed, and leading or
/// trailing `.`/`_` are stripped. A name with nothing left is rejected.
pub fn sanitize_filename(raw: &str) -> Result<String, CoreError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let normalized: String = base.nfkd().collect();

    let joined = normalized.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let name = filtered.trim_matches(|c| c == '.' || c == '_');

    if name.is_empty() {
        return Err(CoreError::InvalidFilename(raw.to_string()));
    }
    Ok(name.to_string())
}
