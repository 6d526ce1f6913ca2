use std::fmt;
use std::str::FromStr;

use crate::error::EtymapError;

/// A navigable view: `w/:word/:lang`, `l/:lang` or `r/:lang1/:lang2`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Word { word: String, lang: String },
    Language(String),
    Pair(String, String),
}

impl Route {
    pub fn word(word: impl Into<String>, lang: impl Into<String>) -> Self {
        Route::Word { word: word.into(), lang: lang.into() }
    }

    pub fn language(iso: impl Into<String>) -> Self {
        Route::Language(iso.into())
    }

    pub fn pair(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Route::Pair(src.into(), dst.into())
    }
}

impl FromStr for Route {
    type Err = EtymapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches(['#', '/']).trim_end_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();
        let invalid = || EtymapError::InvalidRoute(s.to_string());
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        match parts.as_slice() {
            ["w", word, lang] => Ok(Route::word(*word, *lang)),
            ["l", lang] => Ok(Route::language(*lang)),
            ["r", src, dst] => Ok(Route::pair(*src, *dst)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Word { word, lang } => write!(f, "w/{}/{}", word, lang),
            Route::Language(iso) => write!(f, "l/{}", iso),
            Route::Pair(src, dst) => write!(f, "r/{}/{}", src, dst),
        }
    }
}
