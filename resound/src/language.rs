use resound_loaders::FileLoader;

/// Allowlist of languages that have localized sound caches, one language id
/// per line. Lines starting with `#` are comments.
pub const LANGUAGE_ALLOWLIST_PATH: &str = "sound/languages.txt";

/// The primary subtag of the current UI locale, lowercased.
pub fn system_language() -> Option<String> {
    let locale = sys_locale::get_locale()?;
    let language = locale.split(['-', '_']).next().unwrap_or(&locale);

    match language.is_empty() {
        true => None,
        false => Some(language.to_lowercase()),
    }
}

/// Resolves the cache file suffix for a language against the allowlist.
/// Listed languages get `_<lang>`, everything else falls back to the default
/// (no suffix).
pub fn language_suffix(allowlist: &str, language: &str) -> String {
    let listed = allowlist
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.eq_ignore_ascii_case(language));

    match listed {
        true => format!("_{}", language.to_lowercase()),
        false => String::new(),
    }
}

/// The cache file suffix for the current UI language. Missing allowlist file
/// or unknown locale resolve to the default language.
pub fn resolve_language_suffix(loader: &dyn FileLoader) -> String {
    let Some(language) = system_language() else {
        return String::new();
    };

    match loader.get(LANGUAGE_ALLOWLIST_PATH) {
        Ok(bytes) => language_suffix(&String::from_utf8_lossy(&bytes), &language),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::language_suffix;

    const ALLOWLIST: &str = "# localized sound caches\nfrench\ngerman\n\nspanish\n";

    #[test]
    fn listed_languages_get_a_suffix() {
        assert_eq!(language_suffix(ALLOWLIST, "french"), "_french");
        assert_eq!(language_suffix(ALLOWLIST, "German"), "_german");
    }

    #[test]
    fn unlisted_languages_use_the_default() {
        assert_eq!(language_suffix(ALLOWLIST, "english"), "");
        assert_eq!(language_suffix(ALLOWLIST, "korean"), "");
    }

    #[test]
    fn comments_are_not_languages() {
        assert_eq!(language_suffix(ALLOWLIST, "# localized sound caches"), "");
    }
}
