//! Dynamic property tree.
//!
//! A [`Page`] is an order-preserving bag of named [`Property`] values. Nothing
//! about its shape is declared up front: a key holds whatever the caller last
//! put there, and readers coerce scalars on demand.
use std::borrow::Cow;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

/// Type discriminator carried by every page.
pub const CLASS_KEY: &str = "pxObjClass";
/// Position marker of a page inside a list or group.
pub const SUBSCRIPT_KEY: &str = "pxSubscript";

/// Structural keys that describe a page rather than hold its data.
pub fn is_reserved_key(key: &str) -> bool {
    key.eq_ignore_ascii_case(CLASS_KEY) || key.eq_ignore_ascii_case(SUBSCRIPT_KEY)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    class_name: String,
    properties: IndexMap<String, Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Value(Scalar),
    Page(Page),
    List(Vec<Property>),
    Group(IndexMap<String, Property>),
}

/// Doubles compare by `OrderedFloat`, so `NaN == NaN` and a page holding NaN
/// still equals itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Double(OrderedFloat<f64>),
    Boolean(bool),
}

// ————————————————————————————————————————————————————————————————————————————
// PAGE
// ————————————————————————————————————————————————————————————————————————————

impl Page {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self { class_name: class_name.into(), properties: IndexMap::new() }
    }

    pub fn class_name(&self) -> &str { &self.class_name }
    pub fn set_class_name(&mut self, class_name: impl Into<String>) { self.class_name = class_name.into(); }

    pub fn get(&self, key: &str) -> Option<&Property> { self.properties.get(key) }
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Property> { self.properties.get_mut(key) }
    pub fn contains_key(&self, key: &str) -> bool { self.properties.contains_key(key) }

    /// Set `key`, replacing any previous value in place (position is kept).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Property>) -> Option<Property> {
        self.properties.insert(key.into(), value.into())
    }

    /// Builder form of [`Page::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Property> { self.properties.shift_remove(key) }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.properties.keys().map(String::as_str) }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn len(&self) -> usize { self.properties.len() }
    pub fn is_empty(&self) -> bool { self.properties.is_empty() }

    pub fn scalar(&self, key: &str) -> Option<&Scalar> { self.get(key).and_then(Property::as_scalar) }
    pub fn page(&self, key: &str) -> Option<&Page> { self.get(key).and_then(Property::as_page) }
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> { self.scalar(key).map(Scalar::as_text) }
}

// ————————————————————————————————————————————————————————————————————————————
// PROPERTY
// ————————————————————————————————————————————————————————————————————————————

impl Property {
    /// Short shape name used in type-mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Property::Value(s) => s.kind_name(),
            Property::Page(_) => "page",
            Property::List(_) => "list",
            Property::Group(_) => "group",
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self { Property::Value(s) => Some(s), _ => None }
    }
    pub fn as_page(&self) -> Option<&Page> {
        match self { Property::Page(p) => Some(p), _ => None }
    }
    pub fn as_list(&self) -> Option<&[Property]> {
        match self { Property::List(xs) => Some(xs), _ => None }
    }
    pub fn as_group(&self) -> Option<&IndexMap<String, Property>> {
        match self { Property::Group(g) => Some(g), _ => None }
    }
}

impl From<Scalar> for Property { fn from(s: Scalar) -> Self { Property::Value(s) } }
impl From<Page> for Property { fn from(p: Page) -> Self { Property::Page(p) } }
impl From<Vec<Property>> for Property { fn from(xs: Vec<Property>) -> Self { Property::List(xs) } }
impl From<IndexMap<String, Property>> for Property { fn from(g: IndexMap<String, Property>) -> Self { Property::Group(g) } }
impl From<&str> for Property { fn from(s: &str) -> Self { Scalar::Text(s.to_owned()).into() } }
impl From<String> for Property { fn from(s: String) -> Self { Scalar::Text(s).into() } }
impl From<i32> for Property { fn from(n: i32) -> Self { Scalar::Integer(n.into()).into() } }
impl From<i64> for Property { fn from(n: i64) -> Self { Scalar::Integer(n).into() } }
impl From<f64> for Property { fn from(x: f64) -> Self { Scalar::Double(OrderedFloat(x)).into() } }
impl From<bool> for Property { fn from(b: bool) -> Self { Scalar::Boolean(b).into() } }

// ————————————————————————————————————————————————————————————————————————————
// SCALAR COERCION
// ————————————————————————————————————————————————————————————————————————————

impl Scalar {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Text(_) => "text",
            Scalar::Integer(_) => "integer",
            Scalar::Double(_) => "double",
            Scalar::Boolean(_) => "boolean",
        }
    }

    /// Textual form. Non-finite doubles read `NaN`, `Infinity`, `-Infinity`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Scalar::Text(s) => Cow::Borrowed(s),
            Scalar::Integer(n) => Cow::Owned(n.to_string()),
            Scalar::Double(x) => Cow::Owned(format_double(x.0)),
            Scalar::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }

    pub fn to_long(&self) -> Option<i64> {
        match self {
            Scalar::Integer(n) => Some(*n),
            Scalar::Text(s) => s.parse().ok(),
            Scalar::Double(x) => integral(x.0),
            Scalar::Boolean(_) => None,
        }
    }

    pub fn to_int(&self) -> Option<i32> {
        self.to_long().and_then(|n| i32::try_from(n).ok())
    }

    pub fn to_double(&self) -> Option<f64> {
        match self {
            Scalar::Double(x) => Some(x.0),
            Scalar::Integer(n) => Some(*n as f64),
            Scalar::Text(s) => s.parse().ok(),
            Scalar::Boolean(_) => None,
        }
    }

    /// Finite doubles outside the `f32` range do not narrow to infinity.
    pub fn to_float(&self) -> Option<f32> { self.to_double().and_then(narrow) }

    /// Native booleans, or text spelling `true`/`false` in any case.
    pub fn to_boolean(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(b) => Some(*b),
            Scalar::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Scalar::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

pub(crate) fn format_double(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_owned()
    } else if x.is_infinite() {
        if x > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() }
    } else {
        x.to_string()
    }
}

pub(crate) fn narrow(x: f64) -> Option<f32> {
    let y = x as f32;
    (y.is_finite() || !x.is_finite()).then_some(y)
}

fn integral(x: f64) -> Option<i64> {
    (x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64).then(|| x as i64)
}

// ————————————————————————————————————————————————————————————————————————————
// FACTORY
// ————————————————————————————————————————————————————————————————————————————

/// Creates empty pages by class name; the decoder asks for one per record.
pub trait PageFactory {
    fn create_page(&self, class_name: &str) -> Page;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPageFactory;

impl PageFactory for DefaultPageFactory {
    fn create_page(&self, class_name: &str) -> Page { Page::new(class_name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_position_and_remove_shifts() {
        let mut page = Page::new("City").with("name", "Utrecht").with("area", 99.21).with("population", 334295);
        page.insert("name", "Amsterdam");
        assert_eq!(page.keys().collect::<Vec<_>>(), ["name", "area", "population"]);
        assert_eq!(page.text("name").as_deref(), Some("Amsterdam"));

        page.remove("area");
        assert_eq!(page.keys().collect::<Vec<_>>(), ["name", "population"]);
        assert_eq!(page.class_name(), "City");
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Scalar::Text("13579753135".into()).to_long(), Some(13579753135));
        assert_eq!(Scalar::Text("13579753135".into()).to_int(), None);
        assert_eq!(Scalar::Integer(42).to_int(), Some(42));
        assert_eq!(Scalar::Double(OrderedFloat(7.0)).to_int(), Some(7));
        assert_eq!(Scalar::Double(OrderedFloat(7.5)).to_int(), None);
        assert_eq!(Scalar::Text("4.88".into()).to_double(), Some(4.88));
        assert_eq!(Scalar::Integer(3).to_double(), Some(3.0));
        assert_eq!(Scalar::Boolean(true).to_long(), None);
        assert_eq!(Scalar::Double(OrderedFloat(1.0e300)).to_float(), None);
        assert_eq!(Scalar::Text("-Infinity".into()).to_float(), Some(f32::NEG_INFINITY));
        assert!(Scalar::Double(OrderedFloat(f64::NAN)).to_float().unwrap().is_nan());
        assert_eq!(Scalar::Integer(3).to_float(), Some(3.0));
        assert_eq!(Scalar::Text("".into()).to_int(), None);
    }

    #[test]
    fn non_finite_doubles_survive_text() {
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let text = Scalar::Double(OrderedFloat(x)).as_text().into_owned();
            let back = Scalar::Text(text).to_double().unwrap();
            assert_eq!(OrderedFloat(back), OrderedFloat(x));
        }
        assert_eq!(Scalar::Double(OrderedFloat(f64::NEG_INFINITY)).as_text(), "-Infinity");
    }

    #[test]
    fn boolean_coercion_is_case_insensitive_and_strict() {
        assert_eq!(Scalar::Text("TRUE".into()).to_boolean(), Some(true));
        assert_eq!(Scalar::Text("False".into()).to_boolean(), Some(false));
        assert_eq!(Scalar::Text("yes".into()).to_boolean(), None);
        assert_eq!(Scalar::Integer(1).to_boolean(), None);
        assert_eq!(Scalar::Boolean(false).to_boolean(), Some(false));
    }

    #[test]
    fn reserved_keys_match_any_case() {
        assert!(is_reserved_key("pxObjClass"));
        assert!(is_reserved_key("PXSUBSCRIPT"));
        assert!(!is_reserved_key("name"));
    }
}
