//! Extension traits over `serde_json` values and strings.

use error_stack::ResultExt;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{CustomResult, ParsingError};

pub trait ValueExt {
    /// Convert `serde_json::Value` into type `<T>` by using `serde::Deserialize`
    fn parse_value<T>(self, type_name: &'static str) -> CustomResult<T, ParsingError>
    where
        T: DeserializeOwned;
}

impl ValueExt for serde_json::Value {
    fn parse_value<T>(self, type_name: &'static str) -> CustomResult<T, ParsingError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value::<T>(self)
            .change_context(ParsingError::StructParseFailure(type_name))
            .attach_printable_lazy(|| format!("Unable to parse {type_name} from serde_json::Value"))
    }
}

pub trait Encode<'e>
where
    Self: 'e + std::fmt::Debug,
{
    fn encode_to_value(&'e self) -> CustomResult<serde_json::Value, ParsingError>
    where
        Self: Serialize;

    /// Encode into a JSON object, failing for values that do not serialize to a map.
    fn encode_to_object(
        &'e self,
        type_name: &'static str,
    ) -> CustomResult<serde_json::Map<String, serde_json::Value>, ParsingError>
    where
        Self: Serialize,
    {
        match self.encode_to_value()? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(error_stack::report!(ParsingError::NotAnObject(type_name))),
        }
    }
}

impl<'e, A> Encode<'e> for A
where
    Self: 'e + std::fmt::Debug,
{
    fn encode_to_value(&'e self) -> CustomResult<serde_json::Value, ParsingError>
    where
        Self: Serialize,
    {
        serde_json::to_value(self)
            .change_context(ParsingError::EncodeError("json-value"))
            .attach_printable_lazy(|| format!("Unable to convert {self:?} to a value"))
    }
}

pub trait StringExt {
    /// Whether the string is present and not empty.
    fn has_content(&self) -> bool;
}

impl StringExt for str {
    fn has_content(&self) -> bool {
        !self.is_empty()
    }
}

impl StringExt for Option<&str> {
    fn has_content(&self) -> bool {
        self.is_some_and(|value| !value.is_empty())
    }
}

impl StringExt for Option<String> {
    fn has_content(&self) -> bool {
        self.as_deref().has_content()
    }
}
