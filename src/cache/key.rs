//! Key normalization
//!
//! Cache keys are strings. Other scalar types are accepted and converted,
//! with a warning since that is usually a caller mistake.

use std::borrow::Cow;

use tracing::warn;

/// Converts a value into the string key an entry is stored under.
pub trait IntoCacheKey {
    fn into_cache_key(self) -> String;
}

impl IntoCacheKey for &str {
    fn into_cache_key(self) -> String {
        self.to_string()
    }
}

impl IntoCacheKey for String {
    fn into_cache_key(self) -> String {
        self
    }
}

impl IntoCacheKey for &String {
    fn into_cache_key(self) -> String {
        self.clone()
    }
}

impl IntoCacheKey for Cow<'_, str> {
    fn into_cache_key(self) -> String {
        self.into_owned()
    }
}

macro_rules! coerced_key {
    ($($t:ty),*) => {
        $(
            impl IntoCacheKey for $t {
                fn into_cache_key(self) -> String {
                    let key = self.to_string();
                    warn!("{} used as a key, but it is not a string.", key);
                    key
                }
            }
        )*
    };
}

coerced_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char);
