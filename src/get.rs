//! The `Get<V>` trait and its implementations provide a single generic,
//! overloaded `get<V>()` for every value type the store reads: the raw string
//! plus the numeric conveniences, all through one shared text codec.

use crate::error::Error;
use crate::platform::Platform;
use crate::{Config, KeyTemplate, sector};
use alloc::string::String;

pub trait Get<V> {
    fn get(&mut self, key: &KeyTemplate, p1: Option<u32>, p2: Option<u32>) -> Result<V, Error>;
}

impl<V, G: Get<V>> Get<V> for &mut G {
    fn get(&mut self, key: &KeyTemplate, p1: Option<u32>, p2: Option<u32>) -> Result<V, Error> {
        (*self).get(key, p1, p2)
    }
}

impl<T: Platform> Get<String> for Config<T> {
    fn get(&mut self, key: &KeyTemplate, p1: Option<u32>, p2: Option<u32>) -> Result<String, Error> {
        self.get_raw(key, p1, p2)
    }
}

impl<T: Platform> Get<i32> for Config<T> {
    fn get(&mut self, key: &KeyTemplate, p1: Option<u32>, p2: Option<u32>) -> Result<i32, Error> {
        let text = self.get_raw(key, p1, p2)?;
        let number = sector::parse_number(&text).ok_or(Error::ValueMalformed)?;
        i32::try_from(number).map_err(|_| Error::ValueMalformed)
    }
}

impl<T: Platform> Get<u32> for Config<T> {
    fn get(&mut self, key: &KeyTemplate, p1: Option<u32>, p2: Option<u32>) -> Result<u32, Error> {
        let text = self.get_raw(key, p1, p2)?;
        let number = sector::parse_number(&text).ok_or(Error::ValueMalformed)?;
        u32::try_from(number).map_err(|_| Error::ValueMalformed)
    }
}
