use crate::error::Error;
use crate::platform::Platform;
use crate::{Config, KeyTemplate};
use alloc::string::ToString;

pub trait Set<V> {
    fn set(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        value: V,
    ) -> Result<(), Error>;
}

impl<V, S: Set<V>> Set<V> for &mut S {
    fn set(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        value: V,
    ) -> Result<(), Error> {
        (*self).set(key, p1, p2, value)
    }
}

impl<T: Platform> Set<&str> for Config<T> {
    fn set(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        value: &str,
    ) -> Result<(), Error> {
        self.set_raw(key, p1, p2, value)
    }
}

impl<T: Platform> Set<i32> for Config<T> {
    fn set(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        value: i32,
    ) -> Result<(), Error> {
        self.set_raw(key, p1, p2, &value.to_string())
    }
}

impl<T: Platform> Set<u32> for Config<T> {
    fn set(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        value: u32,
    ) -> Result<(), Error> {
        self.set_raw(key, p1, p2, &value.to_string())
    }
}
