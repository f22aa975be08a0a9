//! Entries and their value slot.

use slotmap::new_key_type;

new_key_type! {
    /// Arena key of an entry. Buckets and chains link entries through these.
    pub(crate) struct EntryKey;
}

/// The value slot: a reference-like payload or an inlined integer.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Value<V> {
    Ref(V),
    U64(u64),
    I64(i64),
}

impl<V> Value<V> {
    pub fn as_val(&self) -> Option<&V> {
        match self {
            Value::Ref(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U64(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(n) => Some(n),
            _ => None,
        }
    }
}

/// One key/value pair in a bucket chain.
#[derive(Debug)]
pub struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: Value<V>,
    pub(crate) next: Option<EntryKey>,
}

impl<K, V> Entry<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &Value<V> {
        &self.value
    }
}
