//! The typed `:set`-able option registry. Grounded in the shape of
//! `core/src/options.rs` (`Opts` trait, short/long aliases,
//! `opt`/`opt?`/`opt!`/`inv`/`noopt` toggle grammar) but every entry
//! here is a real, working option rather than a placeholder
//! `isize => "0"` stub.

use thiserror::Error;
use std::collections::HashMap;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unknown option: {0}")]
    Unknown(String),
    #[error("invalid argument for option {0}: {1}")]
    InvalidValue(String, String),
    #[error("option {0} is not a boolean")]
    NotBoolean(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn display(&self) -> String {
        match self {
            OptionValue::Bool(b) => b.to_string(),
            OptionValue::Int(i) => i.to_string(),
            OptionValue::Str(s) => s.clone(),
        }
    }
}

struct OptionSpec {
    long: &'static str,
    short: &'static str,
    default: OptionValue,
}

macro_rules! options {
    ($($field:ident: $long:literal / $short:literal = $default:expr),+ $(,)?) => {
        const OPTION_TABLE: &[OptionSpec] = &[
            $(OptionSpec { long: $long, short: $short, default: $default }),+
        ];
    };
}

options! {
    number:         "number" / "nu" = OptionValue::Bool(false),
    relativenumber: "relativenumber" / "rnu" = OptionValue::Bool(false),
    wrap:           "wrap" / "wrap" = OptionValue::Bool(true),
    ignorecase:     "ignorecase" / "ic" = OptionValue::Bool(false),
    smartcase:      "smartcase" / "scs" = OptionValue::Bool(false),
    hlsearch:       "hlsearch" / "hls" = OptionValue::Bool(false),
    incsearch:      "incsearch" / "is" = OptionValue::Bool(false),
    wrapscan:       "wrapscan" / "ws" = OptionValue::Bool(true),
    gdefault:       "gdefault" / "gd" = OptionValue::Bool(false),
    autoindent:     "autoindent" / "ai" = OptionValue::Bool(false),
    smartindent:    "smartindent" / "si" = OptionValue::Bool(false),
    smarttab:       "smarttab" / "sta" = OptionValue::Bool(false),
    expandtab:      "expandtab" / "et" = OptionValue::Bool(false),
    tildeop:        "tildeop" / "top" = OptionValue::Bool(false),
    tabstop:        "tabstop" / "ts" = OptionValue::Int(8),
    shiftwidth:     "shiftwidth" / "sw" = OptionValue::Int(8),
    scrolloff:      "scrolloff" / "so" = OptionValue::Int(0),
    iskeyword:      "iskeyword" / "isk" = OptionValue::Str(String::new()),
    formatoptions:  "formatoptions" / "fo" = OptionValue::Str(String::new()),
    clipboard:      "clipboard" / "cb" = OptionValue::Str(String::new()),
    backspace:      "backspace" / "bs" = OptionValue::Str(String::new()),
    showcmd:        "showcmd" / "sc" = OptionValue::Bool(true),
    startofline:    "startofline" / "sol" = OptionValue::Bool(true),
    passcontrolkey: "passControlKey" / "passControlKey" = OptionValue::Bool(false),
    usecoresearch:  "useCoreSearch" / "useCoreSearch" = OptionValue::Bool(false),
}

/// The full set of resolved option values. Cheap to clone; `Engine`
/// embeds one.
#[derive(Debug, Clone)]
pub struct Settings {
    values: HashMap<&'static str, OptionValue>,
}

impl Default for Settings {
    fn default() -> Self {
        let values = OPTION_TABLE
            .iter()
            .map(|spec| (spec.long, spec.default.clone()))
            .collect();
        Self { values }
    }
}

fn resolve(name: &str) -> Option<&'static str> {
    OPTION_TABLE
        .iter()
        .find(|spec| spec.long == name || spec.short == name)
        .map(|spec| spec.long)
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&OptionValue, SettingsError> {
        let long = resolve(name).ok_or_else(|| SettingsError::Unknown(name.to_string()))?;
        Ok(&self.values[long])
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).ok().and_then(OptionValue::as_bool).unwrap_or(false)
    }

    pub fn get_int(&self, name: &str) -> i64 {
        self.get(name).ok().and_then(OptionValue::as_int).unwrap_or(0)
    }

    pub fn get_str(&self, name: &str) -> String {
        self.get(name).ok().and_then(OptionValue::as_str).map(str::to_string).unwrap_or_default()
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), SettingsError> {
        let long = resolve(name).ok_or_else(|| SettingsError::Unknown(name.to_string()))?;
        match self.values.get(long) {
            Some(OptionValue::Bool(_)) => {
                self.values.insert(long, OptionValue::Bool(value));
                Ok(())
            }
            _ => Err(SettingsError::NotBoolean(name.to_string())),
        }
    }

    pub fn toggle(&mut self, name: &str) -> Result<(), SettingsError> {
        let cur = self.get_bool(name);
        self.set_bool(name, !cur)
    }

    /// Applies one `:set`-style token: `opt`, `nooopt`, `inv`-prefixed,
    /// `opt!`, `opt?` (returns the formatted query result), or `opt=val`.
    pub fn apply(&mut self, token: &str) -> Result<Option<String>, SettingsError> {
        if let Some(query) = token.strip_suffix('?') {
            let long = resolve(query).ok_or_else(|| SettingsError::Unknown(query.to_string()))?;
            return Ok(Some(format!("{}={}", long, self.values[long].display())));
        }
        if let Some((name, val)) = token.split_once('=') {
            let long = resolve(name).ok_or_else(|| SettingsError::Unknown(name.to_string()))?;
            let parsed = match &self.values[long] {
                OptionValue::Int(_) => OptionValue::Int(
                    val.parse()
                        .map_err(|_| SettingsError::InvalidValue(name.to_string(), val.to_string()))?,
                ),
                OptionValue::Str(_) => OptionValue::Str(val.to_string()),
                OptionValue::Bool(_) => return Err(SettingsError::NotBoolean(name.to_string())),
            };
            self.values.insert(long, parsed);
            return Ok(None);
        }
        if let Some(toggled) = token.strip_suffix('!') {
            self.toggle(toggled)?;
            return Ok(None);
        }
        if let Some(name) = token.strip_prefix("inv") {
            if resolve(name).is_some() {
                self.toggle(name)?;
                return Ok(None);
            }
        }
        if let Some(name) = token.strip_prefix("no") {
            if resolve(name).is_some() {
                self.set_bool(name, false)?;
                return Ok(None);
            }
        }
        let long = resolve(token).ok_or_else(|| SettingsError::Unknown(token.to_string()))?;
        if matches!(self.values[long], OptionValue::Bool(_)) {
            self.set_bool(long, true)?;
            Ok(None)
        } else {
            Ok(Some(format!("{}={}", long, self.values[long].display())))
        }
    }

    pub fn list_non_default(&self) -> Vec<String> {
        OPTION_TABLE
            .iter()
            .filter(|spec| self.values[spec.long] != spec.default)
            .map(|spec| format!("{}={}", spec.long, self.values[spec.long].display()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_names_resolve_to_same_option() {
        let mut s = Settings::new();
        s.apply("nu").unwrap();
        assert!(s.get_bool("number"));
    }

    #[test]
    fn bang_toggles_boolean() {
        let mut s = Settings::new();
        assert!(!s.get_bool("hlsearch"));
        s.apply("hls!").unwrap();
        assert!(s.get_bool("hlsearch"));
    }

    #[test]
    fn no_prefix_clears_boolean() {
        let mut s = Settings::new();
        s.apply("wrap").unwrap();
        s.apply("nowrap").unwrap();
        assert!(!s.get_bool("wrap"));
    }

    #[test]
    fn assignment_sets_int_option() {
        let mut s = Settings::new();
        s.apply("shiftwidth=4").unwrap();
        assert_eq!(s.get_int("shiftwidth"), 4);
    }

    #[test]
    fn query_reports_current_value() {
        let s = Settings::new();
        // Settings::apply takes &mut self, so build through a scratch copy.
        let mut s = s;
        let out = s.apply("ts?").unwrap();
        assert_eq!(out, Some("tabstop=8".to_string()));
    }

    #[test]
    fn string_option_assigns_backspace() {
        let mut s = Settings::new();
        s.apply("bs=indent,eol,start").unwrap();
        assert_eq!(s.get_str("backspace"), "indent,eol,start");
    }

    #[test]
    fn unknown_option_errors() {
        let mut s = Settings::new();
        assert_eq!(
            s.apply("bogus"),
            Err(SettingsError::Unknown("bogus".to_string()))
        );
    }
}
