//! Typed setting values and their display formatting.
//!
//! Every leaf in a settings store holds a [`SettingValue`]. This module turns
//! values into the strings shown in the type and value columns, validates
//! edited text with a per-type regular expression and converts it back into a
//! typed value.

use std::{fmt, sync::LazyLock};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

use crate::error::{Result, SettingsError};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// A typed value held by a settings key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SettingValue {
    /// No value or a value of an unknown type.
    #[default]
    Invalid,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    StringList(Vec<String>),
    Char(char),
    ByteArray(Vec<u8>),
    Color(Color),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Point { x: i32, y: i32 },
    Size { width: i32, height: i32 },
    Rect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
}

/// The type of a [`SettingValue`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Invalid,
    Bool,
    Int,
    UInt,
    Double,
    String,
    StringList,
    Char,
    ByteArray,
    Color,
    Date,
    Time,
    DateTime,
    Point,
    Size,
    Rect,
}

impl ValueKind {
    /// Name shown in the type column.
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::Invalid => "Invalid",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::StringList => "stringlist",
            ValueKind::Char => "char",
            ValueKind::ByteArray => "bytearray",
            ValueKind::Color => "color",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::DateTime => "datetime",
            ValueKind::Point => "point",
            ValueKind::Size => "size",
            ValueKind::Rect => "rect",
        }
    }

    /// Whether values of this type can be edited as text.
    pub fn is_editable(self) -> bool {
        self.validator().is_some()
    }

    /// Anchored expression that edited text must match before it is
    /// converted. `None` for types that cannot be edited.
    pub fn validator(self) -> Option<&'static Regex> {
        let re: &'static LazyLock<Regex> = match self {
            ValueKind::Invalid | ValueKind::ByteArray => return None,
            ValueKind::Bool => &BOOL_RE,
            ValueKind::Int => &SIGNED_RE,
            ValueKind::UInt => &UNSIGNED_RE,
            ValueKind::Double => &DOUBLE_RE,
            ValueKind::String | ValueKind::StringList => &ANY_RE,
            ValueKind::Char => &CHAR_RE,
            ValueKind::Color => &COLOR_RE,
            ValueKind::Date => &DATE_RE,
            ValueKind::Time => &TIME_RE,
            ValueKind::DateTime => &DATETIME_RE,
            ValueKind::Point => &POINT_RE,
            ValueKind::Size => &SIZE_RE,
            ValueKind::Rect => &RECT_RE,
        };
        Some(LazyLock::force(re))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in validator pattern")
}

static BOOL_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^(true|false)$"));
static SIGNED_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^[+-]?[0-9]+$"));
static UNSIGNED_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^\+?[0-9]+$"));
static DOUBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$"));
static ANY_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?s)^.*$"));
static CHAR_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^.$"));
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^\(([0-9]{1,3}),([0-9]{1,3}),([0-9]{1,3}),([0-9]{1,3})\)$")
});
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^([0-9]{1,4})-([0-9]{1,2})-([0-9]{1,2})$"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^([0-9]{1,2}):([0-9]{1,2}):([0-9]{1,2})$"));
static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^([0-9]{1,4})-([0-9]{1,2})-([0-9]{1,2})T([0-9]{1,2}):([0-9]{1,2}):([0-9]{1,2})$")
});
static POINT_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^\((-?[0-9]+),(-?[0-9]+)\)$"));
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"^\(([0-9]+),([0-9]+)\)$"));
static RECT_RE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\((-?[0-9]+),(-?[0-9]+),([0-9]+),([0-9]+)\)$"));

impl SettingValue {
    /// The type of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            SettingValue::Invalid => ValueKind::Invalid,
            SettingValue::Bool(_) => ValueKind::Bool,
            SettingValue::Int(_) => ValueKind::Int,
            SettingValue::UInt(_) => ValueKind::UInt,
            SettingValue::Double(_) => ValueKind::Double,
            SettingValue::String(_) => ValueKind::String,
            SettingValue::StringList(_) => ValueKind::StringList,
            SettingValue::Char(_) => ValueKind::Char,
            SettingValue::ByteArray(_) => ValueKind::ByteArray,
            SettingValue::Color(_) => ValueKind::Color,
            SettingValue::Date(_) => ValueKind::Date,
            SettingValue::Time(_) => ValueKind::Time,
            SettingValue::DateTime(_) => ValueKind::DateTime,
            SettingValue::Point { .. } => ValueKind::Point,
            SettingValue::Size { .. } => ValueKind::Size,
            SettingValue::Rect { .. } => ValueKind::Rect,
        }
    }

    /// Name shown in the type column.
    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    /// Text shown in the value column. This is also the initial text of an
    /// in-place editor, so [`parse_edit`] accepts it for finite numbers and
    /// list items without commas.
    pub fn display_text(&self) -> String {
        match self {
            SettingValue::Invalid => "<Invalid>".to_string(),
            SettingValue::Bool(b) => b.to_string(),
            SettingValue::Int(i) => i.to_string(),
            SettingValue::UInt(u) => u.to_string(),
            SettingValue::Double(d) => d.to_string(),
            SettingValue::String(s) => s.clone(),
            SettingValue::StringList(list) => list.join(","),
            SettingValue::Char(c) => c.to_string(),
            SettingValue::ByteArray(bytes) => {
                if bytes.iter().all(|b| (0x20..0x7f).contains(b)) {
                    String::from_utf8_lossy(bytes).into_owned()
                } else {
                    "<binary>".to_string()
                }
            }
            SettingValue::Color(c) => format!("({},{},{},{})", c.r, c.g, c.b, c.a),
            SettingValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            SettingValue::Time(t) => t.format(TIME_FORMAT).to_string(),
            SettingValue::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            SettingValue::Point { x, y } => format!("({x},{y})"),
            SettingValue::Size { width, height } => format!("({width},{height})"),
            SettingValue::Rect {
                x,
                y,
                width,
                height,
            } => format!("({x},{y},{width},{height})"),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v.into())
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Double(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::String(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::String(v)
    }
}

/// Validate `text` against the editor expression of `kind` and convert it
/// into a typed value.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidInput`] when the text does not match the
/// type's validator, a number is out of range, or a date/time does not
/// exist.
pub fn parse_edit(kind: ValueKind, text: &str) -> Result<SettingValue> {
    let invalid = || SettingsError::InvalidInput {
        kind,
        text: text.to_string(),
    };
    let re = kind.validator().ok_or_else(invalid)?;

    // Free-form text is taken verbatim, everything else ignores surrounding
    // blanks.
    let input = match kind {
        ValueKind::String | ValueKind::StringList | ValueKind::Char => text,
        _ => text.trim(),
    };
    let caps = re.captures(input).ok_or_else(invalid)?;

    let value = match kind {
        ValueKind::Bool => SettingValue::Bool(input.eq_ignore_ascii_case("true")),
        ValueKind::Int => SettingValue::Int(input.parse().map_err(|_| invalid())?),
        ValueKind::UInt => {
            SettingValue::UInt(input.trim_start_matches('+').parse().map_err(|_| invalid())?)
        }
        ValueKind::Double => SettingValue::Double(input.parse().map_err(|_| invalid())?),
        ValueKind::String => SettingValue::String(input.to_string()),
        ValueKind::StringList => SettingValue::StringList(if input.is_empty() {
            Vec::new()
        } else {
            input.split(',').map(str::to_string).collect()
        }),
        ValueKind::Char => SettingValue::Char(input.chars().next().ok_or_else(invalid)?),
        ValueKind::Color => SettingValue::Color(Color::rgba(
            group(&caps, 1).ok_or_else(invalid)?,
            group(&caps, 2).ok_or_else(invalid)?,
            group(&caps, 3).ok_or_else(invalid)?,
            group(&caps, 4).ok_or_else(invalid)?,
        )),
        ValueKind::Date => SettingValue::Date(date_from(&caps, 1).ok_or_else(invalid)?),
        ValueKind::Time => SettingValue::Time(time_from(&caps, 1).ok_or_else(invalid)?),
        ValueKind::DateTime => SettingValue::DateTime(NaiveDateTime::new(
            date_from(&caps, 1).ok_or_else(invalid)?,
            time_from(&caps, 4).ok_or_else(invalid)?,
        )),
        ValueKind::Point => SettingValue::Point {
            x: group(&caps, 1).ok_or_else(invalid)?,
            y: group(&caps, 2).ok_or_else(invalid)?,
        },
        ValueKind::Size => SettingValue::Size {
            width: group(&caps, 1).ok_or_else(invalid)?,
            height: group(&caps, 2).ok_or_else(invalid)?,
        },
        ValueKind::Rect => SettingValue::Rect {
            x: group(&caps, 1).ok_or_else(invalid)?,
            y: group(&caps, 2).ok_or_else(invalid)?,
            width: group(&caps, 3).ok_or_else(invalid)?,
            height: group(&caps, 4).ok_or_else(invalid)?,
        },
        ValueKind::Invalid | ValueKind::ByteArray => return Err(invalid()),
    };
    Ok(value)
}

fn group<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

fn date_from(caps: &Captures<'_>, first: usize) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        group(caps, first)?,
        group(caps, first + 1)?,
        group(caps, first + 2)?,
    )
}

fn time_from(caps: &Captures<'_>, first: usize) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(
        group(caps, first)?,
        group(caps, first + 1)?,
        group(caps, first + 2)?,
    )
}

/// Best-effort reinterpretation of a stored string for display.
///
/// Strings that read as a boolean or a signed integer are shown as that type.
/// This is a display convenience only; a setting that legitimately holds the
/// text `"true"` is misreported, which is why it is opt-in.
pub fn guess_string_type(text: &str) -> Option<SettingValue> {
    if BOOL_RE.is_match(text) {
        return Some(SettingValue::Bool(text.eq_ignore_ascii_case("true")));
    }
    if SIGNED_RE.is_match(text) {
        return text.parse().ok().map(SettingValue::Int);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_type_is_shown_literally() {
        assert_eq!(SettingValue::Invalid.type_name(), "Invalid");
        assert_eq!(SettingValue::Invalid.display_text(), "<Invalid>");
        assert!(!ValueKind::Invalid.is_editable());
    }

    #[test]
    fn display_text_of_compound_values() {
        assert_eq!(
            SettingValue::Color(Color::rgba(1, 2, 3, 255)).display_text(),
            "(1,2,3,255)"
        );
        assert_eq!(
            SettingValue::Rect {
                x: -1,
                y: 2,
                width: 30,
                height: 40
            }
            .display_text(),
            "(-1,2,30,40)"
        );
        assert_eq!(
            SettingValue::StringList(vec!["a".into(), "b".into()]).display_text(),
            "a,b"
        );
        assert_eq!(
            SettingValue::ByteArray(vec![0, 159, 146]).display_text(),
            "<binary>"
        );
        assert_eq!(SettingValue::ByteArray(b"abc".to_vec()).display_text(), "abc");
    }

    #[test]
    fn parse_edit_accepts_displayed_text() {
        let values = [
            SettingValue::Bool(true),
            SettingValue::Int(-42),
            SettingValue::UInt(7),
            SettingValue::Double(2.5),
            SettingValue::String("hello, world".into()),
            SettingValue::Char('x'),
            SettingValue::Color(Color::rgba(10, 20, 30, 40)),
            SettingValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            SettingValue::Time(NaiveTime::from_hms_opt(23, 59, 1).unwrap()),
            SettingValue::Point { x: -3, y: 4 },
            SettingValue::Size {
                width: 640,
                height: 480,
            },
        ];
        for value in values {
            let parsed = parse_edit(value.kind(), &value.display_text()).unwrap();
            assert_eq!(parsed, value);
        }
    }

    #[test]
    fn parse_edit_rejects_mismatched_text() {
        assert!(matches!(
            parse_edit(ValueKind::Int, "12a"),
            Err(SettingsError::InvalidInput {
                kind: ValueKind::Int,
                ..
            })
        ));
        assert!(parse_edit(ValueKind::UInt, "-1").is_err());
        assert!(parse_edit(ValueKind::Bool, "yes").is_err());
        assert!(parse_edit(ValueKind::Color, "(256,0,0,0)").is_err());
        assert!(parse_edit(ValueKind::Date, "2023-02-30").is_err());
        assert!(parse_edit(ValueKind::Size, "(-1,2)").is_err());
        assert!(parse_edit(ValueKind::ByteArray, "00").is_err());
    }

    #[test]
    fn parse_edit_is_case_insensitive_for_bool() {
        assert_eq!(
            parse_edit(ValueKind::Bool, " TRUE ").unwrap(),
            SettingValue::Bool(true)
        );
    }

    #[test]
    fn guessing_only_touches_bool_and_integer_text() {
        assert_eq!(guess_string_type("false"), Some(SettingValue::Bool(false)));
        assert_eq!(guess_string_type("-17"), Some(SettingValue::Int(-17)));
        assert_eq!(guess_string_type("1.5"), None);
        assert_eq!(guess_string_type("hello"), None);
    }
}
