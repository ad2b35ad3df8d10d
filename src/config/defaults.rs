//! Struct-level defaulting applied after all layers are merged

/// Fills fields that no layer populated.
///
/// Implementations must only touch fields still at their zero/unset value;
/// anything a layer provided is left as is. The helpers below implement that
/// test for the common field shapes.
///
/// ```
/// use stratacfg::{default_if_empty, default_if_zero, Defaults};
///
/// #[derive(Default)]
/// struct Db { host: String, port: u16 }
///
/// impl Defaults for Db {
///     fn apply_defaults(&mut self) {
///         default_if_empty(&mut self.host, "localhost");
///         default_if_zero(&mut self.port, 5432);
///     }
/// }
///
/// let mut db = Db { host: String::new(), port: 6543 };
/// db.apply_defaults();
/// assert_eq!(db.host, "localhost");
/// assert_eq!(db.port, 6543);
/// ```
pub trait Defaults {
    fn apply_defaults(&mut self);
}

/// Schemaless destinations carry no declared defaults.
impl Defaults for serde_json::Value {
    fn apply_defaults(&mut self) {}
}

pub fn default_if_empty(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

pub fn default_if_zero<T: Default + PartialEq>(field: &mut T, value: T) {
    if *field == T::default() {
        *field = value;
    }
}

pub fn default_if_none<T>(field: &mut Option<T>, value: T) {
    if field.is_none() {
        *field = Some(value);
    }
}
