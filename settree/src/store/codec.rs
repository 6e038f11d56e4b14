//! Conversion between settings documents and TOML/JSON text.
//!
//! Tables/objects become groups and everything else becomes a key. Values
//! the formats cannot express natively are written as `@Type(args)` strings,
//! e.g. `@Point(10 20)` or `@ByteArray(00ff)`. A plain string that starts
//! with `@` is escaped by doubling it.
//!
//! Arrays of tables are read as a group holding one numbered subgroup per
//! element (`1`, `2`, ...) plus a `size` key, and written back as arrays.
//! Keys remember the file value they were read from, which is written back
//! unchanged until the key is edited. Names are escaped with
//! [`escape_name`] so each one stays a single path segment.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as Json;
use toml::Value as Toml;

use crate::{
    error::{Result, SettingsError},
    store::{
        Format,
        document::{Group, Source, escape_name, unescape_name},
    },
    value::{Color, DATE_FORMAT, DATETIME_FORMAT, SettingValue, TIME_FORMAT},
};

/// Parse file content into a document.
///
/// Blank content yields an empty document.
pub fn parse(format: Format, content: &str) -> Result<Group> {
    if content.trim().is_empty() {
        return Ok(Group::new());
    }
    match format {
        Format::Toml => {
            let table: toml::Table = toml::from_str(content)?;
            Ok(decode_toml(&table))
        }
        Format::Json => match serde_json::from_str::<Json>(content)? {
            Json::Object(map) => Ok(decode_json_object(&map)),
            other => Err(SettingsError::Decode(format!(
                "top-level JSON value must be an object, found {other}"
            ))),
        },
    }
}

/// Render a document as pretty-printed file content.
pub fn render(format: Format, root: &Group) -> Result<String> {
    let s = match format {
        Format::Toml => toml::to_string_pretty(&encode_toml(root))?,
        Format::Json => serde_json::to_string_pretty(&encode_json(root))?,
    };
    Ok(s)
}

pub fn decode_toml(table: &toml::Table) -> Group {
    let mut group = Group::new();
    for (name, value) in table {
        let name = escape_name(name);
        match value {
            Toml::Table(t) => group.insert_group(&name, decode_toml(t)),
            Toml::Array(items) if !items.is_empty() && items.iter().all(Toml::is_table) => {
                group.insert_group(
                    &name,
                    array_group(items.iter().filter_map(|v| v.as_table().map(decode_toml))),
                );
            }
            other => group.insert_with_source(
                &name,
                decode_toml_scalar(other),
                Source::Toml(other.clone()),
            ),
        }
    }
    group
}

fn decode_toml_scalar(value: &Toml) -> SettingValue {
    match value {
        Toml::String(s) => decode_string(s),
        Toml::Integer(i) => SettingValue::Int(*i),
        Toml::Float(f) => SettingValue::Double(*f),
        Toml::Boolean(b) => SettingValue::Bool(*b),
        Toml::Datetime(dt) => decode_datetime(&dt.to_string()),
        Toml::Array(items) => SettingValue::StringList(
            items
                .iter()
                .map(|v| match v {
                    Toml::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Toml::Table(_) => SettingValue::Invalid,
    }
}

pub fn encode_toml(root: &Group) -> toml::Table {
    let mut table = toml::Table::new();
    for (name, value) in root.keys() {
        if root.child(name).is_some() {
            warn!("key {name:?} shadowed by a group of the same name, not written");
            continue;
        }
        let encoded = match (root.source(name), value) {
            (Some(Source::Toml(src)), _) if decode_toml_scalar(src) == *value => src.clone(),
            (Some(Source::Toml(Toml::Array(items))), SettingValue::StringList(list)) => {
                Toml::Array(list.iter().map(|s| toml_list_item(items, s)).collect())
            }
            _ => encode_toml_scalar(value),
        };
        table.insert(unescape_name(name), encoded);
    }
    for (name, group) in root.groups() {
        let encoded = match table_array_elements(group) {
            Some(elements) => Toml::Array(
                elements
                    .into_iter()
                    .map(|g| Toml::Table(encode_toml(g)))
                    .collect(),
            ),
            None => Toml::Table(encode_toml(group)),
        };
        table.insert(unescape_name(name), encoded);
    }
    table
}

/// Element of an edited list, typed like the elements it was read with when
/// those were all numbers or all booleans.
fn toml_list_item(original: &[Toml], text: &str) -> Toml {
    let numeric = |v: &Toml| v.is_integer() || v.is_float();
    if original.is_empty() {
        return Toml::String(text.to_string());
    }
    if original.iter().all(numeric) {
        if let Ok(i) = text.parse() {
            return Toml::Integer(i);
        }
        if let Ok(f) = text.parse() {
            return Toml::Float(f);
        }
    } else if original.iter().all(Toml::is_bool) {
        if let Ok(b) = text.parse() {
            return Toml::Boolean(b);
        }
    }
    Toml::String(text.to_string())
}

fn encode_toml_scalar(value: &SettingValue) -> Toml {
    let datetime = |text: String| match text.parse::<toml::value::Datetime>() {
        Ok(dt) => Toml::Datetime(dt),
        Err(_) => Toml::String(encode_string(value)),
    };
    match value {
        SettingValue::Bool(b) => Toml::Boolean(*b),
        SettingValue::Int(i) => Toml::Integer(*i),
        SettingValue::Double(d) if d.is_finite() => Toml::Float(*d),
        SettingValue::String(s) => Toml::String(escape(s)),
        SettingValue::StringList(list) => {
            Toml::Array(list.iter().map(|s| Toml::String(s.clone())).collect())
        }
        SettingValue::Date(d) => datetime(d.format(DATE_FORMAT).to_string()),
        SettingValue::Time(t) => datetime(t.format(TIME_FORMAT).to_string()),
        SettingValue::DateTime(dt) => datetime(dt.format(DATETIME_FORMAT).to_string()),
        other => Toml::String(encode_string(other)),
    }
}

fn decode_json_object(map: &serde_json::Map<String, Json>) -> Group {
    let mut group = Group::new();
    for (name, value) in map {
        let name = escape_name(name);
        match value {
            Json::Object(obj) => group.insert_group(&name, decode_json_object(obj)),
            Json::Array(items) if !items.is_empty() && items.iter().all(Json::is_object) => {
                group.insert_group(
                    &name,
                    array_group(
                        items
                            .iter()
                            .filter_map(|v| v.as_object().map(decode_json_object)),
                    ),
                );
            }
            other => group.insert_with_source(
                &name,
                decode_json_scalar(other),
                Source::Json(other.clone()),
            ),
        }
    }
    group
}

fn decode_json_scalar(value: &Json) -> SettingValue {
    match value {
        Json::Null => SettingValue::Invalid,
        Json::Bool(b) => SettingValue::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                SettingValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                SettingValue::UInt(u)
            } else {
                SettingValue::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => decode_string(s),
        Json::Array(items) => SettingValue::StringList(
            items
                .iter()
                .map(|v| match v {
                    Json::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Json::Object(_) => SettingValue::Invalid,
    }
}

pub fn encode_json(root: &Group) -> Json {
    let mut map = serde_json::Map::new();
    for (name, value) in root.keys() {
        if root.child(name).is_some() {
            warn!("key {name:?} shadowed by a group of the same name, not written");
            continue;
        }
        let encoded = match (root.source(name), value) {
            (Some(Source::Json(src)), _) if decode_json_scalar(src) == *value => src.clone(),
            (Some(Source::Json(Json::Array(items))), SettingValue::StringList(list)) => {
                Json::Array(list.iter().map(|s| json_list_item(items, s)).collect())
            }
            _ => encode_json_scalar(value),
        };
        map.insert(unescape_name(name), encoded);
    }
    for (name, group) in root.groups() {
        let encoded = match table_array_elements(group) {
            Some(elements) => Json::Array(elements.into_iter().map(encode_json).collect()),
            None => encode_json(group),
        };
        map.insert(unescape_name(name), encoded);
    }
    Json::Object(map)
}

fn json_list_item(original: &[Json], text: &str) -> Json {
    if original.is_empty() {
        return Json::String(text.to_string());
    }
    if original.iter().all(Json::is_number) {
        if let Ok(i) = text.parse::<i64>() {
            return Json::from(i);
        }
        if let Ok(u) = text.parse::<u64>() {
            return Json::from(u);
        }
        if let Some(n) = text.parse().ok().and_then(serde_json::Number::from_f64) {
            return Json::Number(n);
        }
    } else if original.iter().all(Json::is_boolean) {
        if let Ok(b) = text.parse() {
            return Json::Bool(b);
        }
    }
    Json::String(text.to_string())
}

fn encode_json_scalar(value: &SettingValue) -> Json {
    match value {
        SettingValue::Invalid => Json::Null,
        SettingValue::Bool(b) => Json::Bool(*b),
        SettingValue::Int(i) => Json::from(*i),
        // Smaller values would read back as `int`.
        SettingValue::UInt(u) if i64::try_from(*u).is_err() => Json::from(*u),
        SettingValue::Double(d) => match serde_json::Number::from_f64(*d) {
            Some(n) => Json::Number(n),
            None => Json::String(encode_string(value)),
        },
        SettingValue::String(s) => Json::String(escape(s)),
        SettingValue::StringList(list) => {
            Json::Array(list.iter().map(|s| Json::String(s.clone())).collect())
        }
        other => Json::String(encode_string(other)),
    }
}

fn array_group(elements: impl Iterator<Item = Group>) -> Group {
    let mut group = Group::new();
    group.set_table_array(true);
    let mut size = 0i64;
    for (idx, element) in elements.enumerate() {
        group.insert_group(&(idx + 1).to_string(), element);
        size += 1;
    }
    group.insert("size", SettingValue::Int(size));
    group
}

/// Elements of a group read from an array of tables, as long as it still
/// has that shape: groups `1..=n` and no key other than `size`.
fn table_array_elements(group: &Group) -> Option<Vec<&Group>> {
    if !group.is_table_array() || group.key_names().any(|k| k != "size") {
        return None;
    }
    let elements: Vec<&Group> = (1..)
        .map_while(|i: usize| group.child(&i.to_string()))
        .collect();
    (elements.len() == group.group_names().count()).then_some(elements)
}

fn escape(s: &str) -> String {
    if s.starts_with('@') {
        format!("@{s}")
    } else {
        s.to_string()
    }
}

/// `@Type(args)` form of a value.
pub fn encode_string(value: &SettingValue) -> String {
    match value {
        SettingValue::Invalid => "@Invalid()".to_string(),
        SettingValue::Bool(b) => b.to_string(),
        SettingValue::Int(i) => i.to_string(),
        SettingValue::UInt(u) => format!("@UInt({u})"),
        SettingValue::Double(d) => format!("@Double({d})"),
        SettingValue::String(s) => escape(s),
        SettingValue::StringList(list) => list.join(","),
        SettingValue::Char(c) => format!("@Char({c})"),
        SettingValue::ByteArray(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("@ByteArray({hex})")
        }
        SettingValue::Color(c) => format!("@Color({} {} {} {})", c.r, c.g, c.b, c.a),
        SettingValue::Date(d) => format!("@Date({})", d.format(DATE_FORMAT)),
        SettingValue::Time(t) => format!("@Time({})", t.format(TIME_FORMAT)),
        SettingValue::DateTime(dt) => format!("@DateTime({})", dt.format(DATETIME_FORMAT)),
        SettingValue::Point { x, y } => format!("@Point({x} {y})"),
        SettingValue::Size { width, height } => format!("@Size({width} {height})"),
        SettingValue::Rect {
            x,
            y,
            width,
            height,
        } => format!("@Rect({x} {y} {width} {height})"),
    }
}

/// Inverse of [`encode_string`]. Strings that are not a well-formed
/// `@Type(args)` form are kept as plain strings.
pub fn decode_string(s: &str) -> SettingValue {
    if let Some(rest) = s.strip_prefix("@@") {
        return SettingValue::String(format!("@{rest}"));
    }
    let Some(body) = s.strip_prefix('@') else {
        return SettingValue::String(s.to_string());
    };
    match decode_tagged(body) {
        Some(value) => value,
        None => {
            debug!("keeping undecodable tagged value {s:?} as text");
            SettingValue::String(s.to_string())
        }
    }
}

fn decode_tagged(body: &str) -> Option<SettingValue> {
    let (tag, rest) = body.split_once('(')?;
    let args = rest.strip_suffix(')')?;
    let ints = || -> Option<Vec<i32>> {
        args.split_whitespace()
            .map(|a| a.parse().ok())
            .collect::<Option<Vec<_>>>()
    };

    let value = match tag {
        "Invalid" => SettingValue::Invalid,
        "UInt" => SettingValue::UInt(args.parse().ok()?),
        "Double" => SettingValue::Double(args.parse().ok()?),
        "Char" => {
            let mut chars = args.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            SettingValue::Char(c)
        }
        "ByteArray" => {
            if args.len() % 2 != 0 || !args.is_ascii() {
                return None;
            }
            let bytes = (0..args.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&args[i..i + 2], 16).ok())
                .collect::<Option<Vec<_>>>()?;
            SettingValue::ByteArray(bytes)
        }
        "Color" => {
            let parts = args
                .split_whitespace()
                .map(|a| a.parse::<u8>().ok())
                .collect::<Option<Vec<_>>>()?;
            match parts.as_slice() {
                [r, g, b, a] => SettingValue::Color(Color::rgba(*r, *g, *b, *a)),
                [r, g, b] => SettingValue::Color(Color::rgba(*r, *g, *b, 255)),
                _ => return None,
            }
        }
        "Point" => match ints()?.as_slice() {
            [x, y] => SettingValue::Point { x: *x, y: *y },
            _ => return None,
        },
        "Size" => match ints()?.as_slice() {
            [width, height] => SettingValue::Size {
                width: *width,
                height: *height,
            },
            _ => return None,
        },
        "Rect" => match ints()?.as_slice() {
            [x, y, width, height] => SettingValue::Rect {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            },
            _ => return None,
        },
        "Date" => SettingValue::Date(NaiveDate::parse_from_str(args, DATE_FORMAT).ok()?),
        "Time" => SettingValue::Time(NaiveTime::parse_from_str(args, TIME_FORMAT).ok()?),
        "DateTime" => {
            SettingValue::DateTime(NaiveDateTime::parse_from_str(args, DATETIME_FORMAT).ok()?)
        }
        _ => return None,
    };
    Some(value)
}

/// Map a TOML datetime to the closest value type. Offsets are dropped and
/// the local wall time kept.
fn decode_datetime(text: &str) -> SettingValue {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return SettingValue::DateTime(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return SettingValue::DateTime(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return SettingValue::Date(d);
    }
    if let Ok(t) = NaiveTime::parse_from_str(text, "%H:%M:%S%.f") {
        return SettingValue::Time(t);
    }
    warn!("unrecognised TOML datetime {text:?}");
    SettingValue::String(text.to_string())
}
