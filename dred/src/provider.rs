//! The interface used by the decoder to reach the crashed process's memory.
//!
//! The decoder never reads memory itself. Everything it knows about a record comes
//! from a [`DredProvider`]: a debugger engine, a minidump reader, or the byte-backed
//! [`MemoryProvider`](crate::MemoryProvider) that ships with this crate.

use std::convert::TryFrom;

use crate::error::{DecodeError, ProviderError};

/// A module loaded in the target process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// The name the module's symbols are known by, e.g. `d3d12`.
    pub name: String,
}

impl LoadedModule {
    pub fn new<S: Into<String>>(name: S) -> LoadedModule {
        LoadedModule { name: name.into() }
    }
}

/// Typed access to the memory of a crashed process.
///
/// A `Value` is a typed view of some location: a struct, a pointer or a scalar.
/// Values are cheap handles; reading through them may fail at any point, since the
/// memory belongs to a process that crashed. Nothing is cached or retried by the
/// decoder, so providers are free to be as lazy or as eager as they like.
///
/// `index_array` carries no bounds information; callers are responsible for
/// keeping indices within counts they read from the record.
pub trait DredProvider {
    type Value: Clone;

    /// The modules loaded in the process, in enumeration order.
    fn loaded_modules(&self) -> Result<Vec<LoadedModule>, ProviderError>;

    /// The address of the global `symbol` exported by `module`.
    fn symbol_address(&self, module: &str, symbol: &str) -> Result<u64, ProviderError>;

    /// View `address` as an instance of `type_name`, as described by the symbols of `module`.
    fn read_typed_value(
        &self,
        address: u64,
        module: &str,
        type_name: &str,
    ) -> Result<Self::Value, ProviderError>;

    /// Reinterpret `value` as `type_name` from the symbols of `module`.
    fn marshal_as(
        &self,
        value: &Self::Value,
        module: &str,
        type_name: &str,
    ) -> Result<Self::Value, ProviderError>;

    /// The field `name` of the struct `value`.
    fn field(&self, value: &Self::Value, name: &str) -> Result<Self::Value, ProviderError>;

    /// The value a pointer points to.
    fn dereference(&self, value: &Self::Value) -> Result<Self::Value, ProviderError>;

    /// The `index`th element of the array a pointer points to.
    fn index_array(&self, value: &Self::Value, index: u64) -> Result<Self::Value, ProviderError>;

    /// Whether `value` is a null pointer.
    fn is_null(&self, value: &Self::Value) -> bool;

    /// The numeric value of a scalar, or the target address of a pointer.
    fn to_u64(&self, value: &Self::Value) -> Result<u64, ProviderError>;

    /// The NUL-terminated narrow or wide string a pointer points to.
    fn read_string(&self, value: &Self::Value) -> Result<String, ProviderError>;
}

/// Read the pointer field `name` of `value`, mapping a null pointer to `None`.
pub(crate) fn optional_pointer<P: DredProvider + ?Sized>(
    provider: &P,
    value: &P::Value,
    name: &str,
) -> Result<Option<P::Value>, ProviderError> {
    let pointer = provider.field(value, name)?;
    if provider.is_null(&pointer) {
        Ok(None)
    } else {
        Ok(Some(pointer))
    }
}

/// Read the string behind the pointer field `name` of `value`.
///
/// A null pointer is `None`, and so is a string that can't be read.
pub(crate) fn optional_string<P: DredProvider + ?Sized>(
    provider: &P,
    value: &P::Value,
    name: &str,
) -> Option<String> {
    let pointer = match optional_pointer(provider, value, name) {
        Ok(Some(pointer)) => pointer,
        Ok(None) => return None,
        Err(e) => {
            tracing::debug!("couldn't read {}: {}", name, e);
            return None;
        }
    };
    match provider.read_string(&pointer) {
        Ok(string) => Some(string),
        Err(e) => {
            tracing::debug!("couldn't read string {}: {}", name, e);
            None
        }
    }
}

/// Read the scalar field `name` of `value`.
pub(crate) fn read_u64<P: DredProvider + ?Sized>(
    provider: &P,
    value: &P::Value,
    name: &str,
) -> Result<u64, ProviderError> {
    let field = provider.field(value, name)?;
    provider.to_u64(&field)
}

/// The value of a scalar that has to fit in a `UINT`. `what` names it in errors.
pub(crate) fn to_u32<P: DredProvider + ?Sized>(
    provider: &P,
    value: &P::Value,
    what: &str,
) -> Result<u32, DecodeError> {
    let raw = provider.to_u64(value)?;
    u32::try_from(raw).map_err(|_| DecodeError::ValueOutOfRange {
        field: what.to_owned(),
        value: raw,
    })
}

/// Read the `UINT` field `name` of `value`.
pub(crate) fn read_u32<P: DredProvider + ?Sized>(
    provider: &P,
    value: &P::Value,
    name: &str,
) -> Result<u32, DecodeError> {
    to_u32(provider, &provider.field(value, name)?, name)
}
