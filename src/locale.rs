//! Session-scoped locale state, string lookup and number formatting.
//!
//! The dashboard does not own its strings: anything implementing [`Translate`]
//! can back a [`LocaleContext`]. [`Catalog`] is the TOML-backed default, with
//! English and French tables embedded from `locales.toml`.
//!
//! Locale changes are broadcast to subscribers synchronously, after the new
//! locale is in place, so every format call made after `set_locale` returns
//! sees the new locale.

use crate::aggregate::round1;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

pub const FALLBACK_LOCALE: &str = "en";

const BUILTIN_CATALOG: &str = include_str!("locales.toml");

/// String lookup collaborator.
pub trait Translate {
    /// Locale codes this source has tables for.
    fn locales(&self) -> Vec<String>;

    /// Value for a dotted key such as `buttons.add`, if present.
    fn lookup(&self, locale: &str, key: &str) -> Option<String>;
}

/// Translation tables keyed by locale code, loaded from TOML.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: toml::Table,
}

impl Catalog {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let tables: toml::Table = toml::from_str(text)?;
        Ok(Self { tables })
    }

    /// The embedded English/French catalog.
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN_CATALOG).expect("embedded locales.toml is valid TOML")
    }
}

impl Translate for Catalog {
    fn locales(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter(|(_, value)| value.is_table())
            .map(|(code, _)| code.clone())
            .collect()
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<String> {
        let mut value = self.tables.get(locale)?;
        for part in key.split('.') {
            value = value.as_table()?.get(part)?;
        }
        value.as_str().map(|s| s.to_string())
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern compiles"))
}

/// Replace `{name}` placeholders. Unknown or empty parameters leave the placeholder as is.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return template.to_string();
    }
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            params
                .iter()
                .find(|(name, value)| *name == &caps[1] && !value.is_empty())
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&str)>;

pub struct LocaleContext {
    current: String,
    translations: Box<dyn Translate>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl fmt::Debug for LocaleContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LocaleContext")
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl LocaleContext {
    /// Context over the embedded catalog, starting at `initial` if it is known.
    pub fn new(initial: &str) -> Self {
        Self::with_translations(Box::new(Catalog::builtin()), initial)
    }

    pub fn with_translations(translations: Box<dyn Translate>, initial: &str) -> Self {
        let available = translations.locales();
        let current = if available.iter().any(|code| code == initial) {
            initial.to_string()
        } else {
            warn!(requested = initial, fallback = FALLBACK_LOCALE, "unknown locale, using fallback");
            FALLBACK_LOCALE.to_string()
        };
        Self {
            current,
            translations,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn locale(&self) -> &str {
        &self.current
    }

    pub fn available_locales(&self) -> Vec<String> {
        self.translations.locales()
    }

    /// Switch locale and notify subscribers. Unknown codes are ignored and return `false`.
    pub fn set_locale(&mut self, code: &str) -> bool {
        if !self.available_locales().iter().any(|c| c == code) {
            debug!(code, "ignoring unknown locale");
            return false;
        }
        self.current = code.to_string();
        info!(locale = code, subscribers = self.observers.len(), "locale changed");
        for (_, observer) in self.observers.iter_mut() {
            observer(code);
        }
        true
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|(sub, _)| *sub != id);
    }

    /// Lookup in the current locale; a missing key comes back unchanged.
    pub fn translate(&self, key: &str) -> String {
        self.translate_with(key, &[])
    }

    pub fn translate_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        match self.translations.lookup(&self.current, key) {
            Some(template) if !template.is_empty() => interpolate(&template, params),
            _ => key.to_string(),
        }
    }

    pub fn format_number(&self, value: f64) -> String {
        format_number(value, &self.current)
    }

    pub fn format_percentage(&self, value: f64) -> String {
        format_percentage(value, &self.current)
    }
}

fn is_french(locale: &str) -> bool {
    locale.starts_with("fr")
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

fn grouping_separator(locale: &str) -> char {
    if is_french(locale) {
        '\u{a0}'
    } else {
        ','
    }
}

/// Whole-number count with thousands grouping: `12,345` (en) or `12 345` (fr).
pub fn format_number(value: f64, locale: &str) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let grouped = group_digits(&digits, grouping_separator(locale));
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// One-decimal percentage: `48.0%` (en) or `48,0 %` (fr).
pub fn format_percentage(value: f64, locale: &str) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = round1(value);
    let text = format!("{:.1}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "0"));
    let sign = if rounded < 0.0 { "-" } else { "" };
    let whole = group_digits(whole, grouping_separator(locale));
    if is_french(locale) {
        format!("{sign}{whole},{fraction} %")
    } else {
        format!("{sign}{whole}.{fraction}%")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LocaleState {
    locale: String,
}

/// Remembers the last selected locale across runs in a small TOML file.
#[derive(Debug, Clone)]
pub struct LocaleStore {
    path: PathBuf,
}

impl LocaleStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The remembered locale, or `None` if nothing readable was saved.
    pub fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match toml::from_str::<LocaleState>(&content) {
            Ok(state) => Some(state.locale),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable locale state");
                None
            }
        }
    }

    pub fn save(&self, locale: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(&LocaleState {
            locale: locale.to_string(),
        })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[test]
    fn builtin_catalog_has_english_and_french() {
        let ctx = LocaleContext::new("en");
        assert_eq!(ctx.available_locales(), vec!["en", "fr"]);
        assert_eq!(ctx.translate("buttons.add"), "Add");
        assert_eq!(ctx.translate("dashboardTitle"), "University Data");
    }

    #[test]
    fn missing_keys_echo_back() {
        let ctx = LocaleContext::new("fr");
        assert_eq!(ctx.translate("no.such.key"), "no.such.key");
        // A table is not a string value.
        assert_eq!(ctx.translate("buttons"), "buttons");
    }

    #[test]
    fn interpolation_fills_known_params() {
        assert_eq!(interpolate("{a} and {b}", &[("a", "x")]), "x and {b}");
        assert_eq!(interpolate("{a}", &[("a", "")]), "{a}");
        let ctx = LocaleContext::new("en");
        assert_eq!(
            ctx.translate_with("charts.enrollmentTitle", &[("institution", "McGill")]),
            "McGill has the largest enrollment"
        );
    }

    #[test]
    fn unknown_initial_locale_falls_back() {
        let ctx = LocaleContext::new("zz");
        assert_eq!(ctx.locale(), FALLBACK_LOCALE);
    }

    #[test]
    fn set_locale_notifies_subscribers_after_change() {
        let mut ctx = LocaleContext::new("en");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = ctx.subscribe(move |code| sink.borrow_mut().push(code.to_string()));

        assert!(ctx.set_locale("fr"));
        assert_eq!(ctx.translate("buttons.add"), "Ajouter");
        assert!(!ctx.set_locale("de"));
        assert_eq!(ctx.locale(), "fr");

        ctx.unsubscribe(id);
        assert!(ctx.set_locale("en"));
        assert_eq!(*seen.borrow(), vec!["fr".to_string()]);
    }

    #[test]
    fn numbers_follow_locale() {
        assert_eq!(format_number(1234567.0, "en"), "1,234,567");
        assert_eq!(format_number(1234567.0, "fr"), "1\u{a0}234\u{a0}567");
        assert_eq!(format_number(999.5, "en"), "1,000");
        assert_eq!(format_number(12.0, "en"), "12");
        assert_eq!(format_number(-4500.0, "en"), "-4,500");
        assert_eq!(format_number(f64::NAN, "en"), "");
    }

    #[test]
    fn percentages_follow_locale() {
        assert_eq!(format_percentage(48.0, "en"), "48.0%");
        assert_eq!(format_percentage(48.0, "fr"), "48,0 %");
        assert_eq!(format_percentage(33.333, "en"), "33.3%");
        assert_eq!(format_percentage(1234.56, "en"), "1,234.6%");
    }

    #[test]
    fn locale_store_round_trips() {
        let dir = tempdir().unwrap();
        let store = LocaleStore::new(dir.path().join("locale.toml"));
        assert_eq!(store.load(), None);
        store.save("fr").unwrap();
        assert_eq!(store.load(), Some("fr".to_string()));
    }

    #[test]
    fn locale_store_ignores_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locale.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert_eq!(LocaleStore::new(&path).load(), None);
    }
}
