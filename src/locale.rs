// Locale strings
// Loads a locale's string table from disk; lookups fall back to English

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::LocaleError;
use crate::sinks::{StringKey, Strings};

/// Locales the generator ships string files for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    De,
    En,
    Es,
    Fr,
    Ja,
    Nl,
    Ta,
    Zh,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::De => "de",
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::Ja => "ja",
            Locale::Nl => "nl",
            Locale::Ta => "ta",
            Locale::Zh => "zh",
        }
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "de" => Ok(Locale::De),
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            "fr" => Ok(Locale::Fr),
            "ja" => Ok(Locale::Ja),
            "nl" => Ok(Locale::Nl),
            "ta" => Ok(Locale::Ta),
            "zh" => Ok(Locale::Zh),
            _ => Err(LocaleError::Unsupported(s.to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LocaleFile {
    #[serde(default)]
    core: HashMap<String, String>,
}

/// String table for one locale
#[derive(Debug, Clone)]
pub struct LocaleStrings {
    locale: Locale,
    core: HashMap<String, String>,
}

impl LocaleStrings {
    /// Read `<dir>/<code>.json`
    pub async fn load(dir: &Path, locale: Locale) -> Result<Self, LocaleError> {
        let path = dir.join(format!("{}.json", locale.code()));
        let path_str = path.display().to_string();
        tracing::info!("Loading locale strings from {}", path_str);

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LocaleError::Io {
                path: path_str.clone(),
                source,
            })?;

        Self::from_json(locale, &content).map_err(|source| LocaleError::Parse {
            path: path_str,
            source,
        })
    }

    pub fn from_json(locale: Locale, content: &str) -> Result<Self, serde_json::Error> {
        let file: LocaleFile = serde_json::from_str(content)?;
        Ok(Self {
            locale,
            core: file.core,
        })
    }

    /// English table with no overrides
    pub fn fallback() -> Self {
        Self {
            locale: Locale::En,
            core: HashMap::new(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

impl Strings for LocaleStrings {
    fn get(&self, key: StringKey) -> String {
        self.core
            .get(key.id())
            .cloned()
            .unwrap_or_else(|| key.fallback().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locale() {
        assert_eq!("fr".parse::<Locale>().unwrap(), Locale::Fr);
        assert_eq!("ZH".parse::<Locale>().unwrap(), Locale::Zh);
        assert!(matches!(
            "xx".parse::<Locale>(),
            Err(LocaleError::Unsupported(_))
        ));
    }

    #[test]
    fn test_lookup_with_fallback() {
        let strings = LocaleStrings::from_json(
            Locale::Fr,
            r#"{"core": {"nowLoggedIn": "Vous êtes maintenant connecté."}}"#,
        )
        .unwrap();

        assert_eq!(
            strings.get(StringKey::NowLoggedIn),
            "Vous êtes maintenant connecté."
        );
        assert_eq!(
            strings.get(StringKey::NowLoggedOut),
            StringKey::NowLoggedOut.fallback()
        );
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("gd-session-locale-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(
            dir.join("de.json"),
            r#"{"core": {"nowLoggedOut": "Sie wurden abgemeldet."}}"#,
        )
        .await
        .unwrap();

        let strings = LocaleStrings::load(&dir, Locale::De).await.unwrap();
        assert_eq!(strings.locale(), Locale::De);
        assert_eq!(strings.get(StringKey::NowLoggedOut), "Sie wurden abgemeldet.");

        let missing = LocaleStrings::load(&dir, Locale::Ja).await;
        assert!(matches!(missing, Err(LocaleError::Io { .. })));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[test]
    fn test_invalid_json() {
        assert!(LocaleStrings::from_json(Locale::En, "not json").is_err());
    }
}
