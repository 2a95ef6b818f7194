//! A [`DredProvider`] over raw memory bytes and hand-written type layouts.
//!
//! This is what you want when you already hold the bytes of the interesting
//! memory (from a minidump's memory list, say) but have no debugger engine to
//! answer typed queries. Symbol metadata is supplied per module as a table of
//! [`TypeLayout`]s; [`ModuleSymbols::with_dred_types`] registers the x64 layout of
//! every structure the decoder touches.

use std::collections::HashMap;
use std::convert::TryFrom;

use encoding_rs::UTF_16LE;
use range_map::{Range, RangeMap};
use scroll::{Pread, LE};

use crate::error::ProviderError;
use crate::format as dred;
use crate::provider::{DredProvider, LoadedModule};

/// Strings longer than this are truncated rather than read to the end.
const MAX_STRING_LENGTH: u64 = 4096;

const POINTER_SIZE: u64 = 8;

/// The primitive types a layout can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    U8,
    U16,
    U32,
    I32,
    U64,
}

impl ScalarKind {
    pub fn size(self) -> u64 {
        match self {
            ScalarKind::U8 => 1,
            ScalarKind::U16 => 2,
            ScalarKind::U32 | ScalarKind::I32 => 4,
            ScalarKind::U64 => 8,
        }
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Scalar(ScalarKind),
    Pointer(Box<TypeRef>),
    /// A type looked up by name in the same module's symbols.
    Named(String),
}

impl TypeRef {
    pub fn named(name: &str) -> TypeRef {
        TypeRef::Named(name.to_owned())
    }

    pub fn pointer_to(target: TypeRef) -> TypeRef {
        TypeRef::Pointer(Box::new(target))
    }

    /// `const char *`
    pub fn narrow_string() -> TypeRef {
        TypeRef::pointer_to(TypeRef::Scalar(ScalarKind::U8))
    }

    /// `const wchar_t *`
    pub fn wide_string() -> TypeRef {
        TypeRef::pointer_to(TypeRef::Scalar(ScalarKind::U16))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u64,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub size: u64,
    pub fields: Vec<FieldLayout>,
}

impl StructLayout {
    pub fn new(size: u64) -> StructLayout {
        StructLayout {
            size,
            fields: Vec::new(),
        }
    }

    /// Add a field, builder-style.
    pub fn field(mut self, name: &str, offset: u64, ty: TypeRef) -> StructLayout {
        self.fields.push(FieldLayout {
            name: name.to_owned(),
            offset,
            ty,
        });
        self
    }

    fn find(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// What a module's symbols say about one type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeLayout {
    Struct(StructLayout),
    /// An enum or typedef of a primitive, e.g. `HRESULT`.
    Alias(ScalarKind),
}

/// The symbol metadata of one loaded module.
#[derive(Debug, Clone, Default)]
pub struct ModuleSymbols {
    name: String,
    types: HashMap<String, TypeLayout>,
    symbols: HashMap<String, u64>,
}

impl ModuleSymbols {
    /// A module with no type information at all, like a stripped public pdb.
    pub fn new<S: Into<String>>(name: S) -> ModuleSymbols {
        ModuleSymbols {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_type(mut self, name: &str, layout: TypeLayout) -> ModuleSymbols {
        self.types.insert(name.to_owned(), layout);
        self
    }

    /// Forget a type, as if the module's symbols had been stripped of it.
    pub fn without_type(mut self, name: &str) -> ModuleSymbols {
        self.types.remove(name);
        self
    }

    pub fn with_symbol(mut self, name: &str, address: u64) -> ModuleSymbols {
        self.symbols.insert(name.to_owned(), address);
        self
    }

    /// Register the 64-bit layouts of all DRED structures and enums.
    pub fn with_dred_types(self) -> ModuleSymbols {
        use self::ScalarKind::*;
        use self::TypeLayout::*;

        let ptr = |name: &str| TypeRef::pointer_to(TypeRef::named(name));
        let u32_ = TypeRef::Scalar(U32);
        let u64_ = TypeRef::Scalar(U64);

        let node = StructLayout::new(80)
            .field("pCommandListDebugNameA", 0, TypeRef::narrow_string())
            .field("pCommandListDebugNameW", 8, TypeRef::wide_string())
            .field("pCommandQueueDebugNameA", 16, TypeRef::narrow_string())
            .field("pCommandQueueDebugNameW", 24, TypeRef::wide_string())
            .field("pCommandList", 32, TypeRef::pointer_to(u64_.clone()))
            .field("pCommandQueue", 40, TypeRef::pointer_to(u64_.clone()))
            .field("BreadcrumbCount", 48, u32_.clone())
            .field("pLastBreadcrumbValue", 56, TypeRef::pointer_to(u32_.clone()))
            .field("pCommandHistory", 64, ptr(dred::AUTO_BREADCRUMB_OP))
            .field("pNext", 72, ptr(dred::AUTO_BREADCRUMB_NODE));
        let mut node1 = node.clone();
        node1.size = 96;
        for field in node1.fields.iter_mut() {
            if field.name == "pNext" {
                field.ty = ptr(dred::AUTO_BREADCRUMB_NODE1);
            }
        }
        let node1 = node1
            .field("BreadcrumbContextsCount", 80, u32_.clone())
            .field("pBreadcrumbContexts", 88, ptr(dred::DRED_BREADCRUMB_CONTEXT));

        let context = StructLayout::new(16)
            .field("BreadcrumbIndex", 0, u32_.clone())
            .field("pContextString", 8, TypeRef::wide_string());

        let allocation = StructLayout::new(32)
            .field("ObjectNameA", 0, TypeRef::narrow_string())
            .field("ObjectNameW", 8, TypeRef::wide_string())
            .field("AllocationType", 16, TypeRef::named(dred::DRED_ALLOCATION_TYPE))
            .field("pNext", 24, ptr(dred::DRED_ALLOCATION_NODE));

        let breadcrumbs_output =
            StructLayout::new(8).field("pHeadAutoBreadcrumbNode", 0, ptr(dred::AUTO_BREADCRUMB_NODE));
        let breadcrumbs_output1 = StructLayout::new(8).field(
            "pHeadAutoBreadcrumbNode",
            0,
            ptr(dred::AUTO_BREADCRUMB_NODE1),
        );

        let page_fault_output = StructLayout::new(24)
            .field("PageFaultVA", 0, u64_.clone())
            .field("pHeadExistingAllocationNode", 8, ptr(dred::DRED_ALLOCATION_NODE))
            .field("pHeadRecentFreedAllocationNode", 16, ptr(dred::DRED_ALLOCATION_NODE));

        let data = StructLayout::new(16)
            .field("Flags", 0, u32_.clone())
            .field("pHeadAutoBreadcrumbNode", 8, ptr(dred::AUTO_BREADCRUMB_NODE));
        let data_with_page_fault = |breadcrumbs: &str| {
            StructLayout::new(40)
                .field("DeviceRemovedReason", 0, u32_.clone())
                .field("AutoBreadcrumbsOutput", 8, TypeRef::named(breadcrumbs))
                .field("PageFaultOutput", 16, TypeRef::named(dred::DRED_PAGE_FAULT_OUTPUT))
        };

        let versioned = StructLayout::new(48)
            .field("Version", 0, TypeRef::named(dred::DRED_VERSION))
            .field("Dred_1_0", 8, TypeRef::named(dred::DEVICE_REMOVED_EXTENDED_DATA))
            .field("Dred_1_1", 8, TypeRef::named(dred::DEVICE_REMOVED_EXTENDED_DATA1))
            .field("Dred_1_2", 8, TypeRef::named(dred::DEVICE_REMOVED_EXTENDED_DATA2))
            .field("Dred_1_3", 8, TypeRef::named(dred::DEVICE_REMOVED_EXTENDED_DATA3));

        self.with_type(dred::DRED_VERSION, Alias(U32))
            .with_type(dred::AUTO_BREADCRUMB_OP, Alias(U32))
            .with_type(dred::DRED_ALLOCATION_TYPE, Alias(U32))
            .with_type(dred::HRESULT, Alias(I32))
            .with_type(dred::AUTO_BREADCRUMB_NODE, Struct(node))
            .with_type(dred::AUTO_BREADCRUMB_NODE1, Struct(node1))
            .with_type(dred::DRED_BREADCRUMB_CONTEXT, Struct(context))
            .with_type(dred::DRED_ALLOCATION_NODE, Struct(allocation))
            .with_type(dred::DRED_AUTO_BREADCRUMBS_OUTPUT, Struct(breadcrumbs_output))
            .with_type(dred::DRED_AUTO_BREADCRUMBS_OUTPUT1, Struct(breadcrumbs_output1))
            .with_type(dred::DRED_PAGE_FAULT_OUTPUT, Struct(page_fault_output))
            .with_type(dred::DEVICE_REMOVED_EXTENDED_DATA, Struct(data))
            .with_type(
                dred::DEVICE_REMOVED_EXTENDED_DATA1,
                Struct(data_with_page_fault(dred::DRED_AUTO_BREADCRUMBS_OUTPUT)),
            )
            .with_type(
                dred::DEVICE_REMOVED_EXTENDED_DATA2,
                Struct(data_with_page_fault(dred::DRED_AUTO_BREADCRUMBS_OUTPUT)),
            )
            .with_type(
                dred::DEVICE_REMOVED_EXTENDED_DATA3,
                Struct(data_with_page_fault(dred::DRED_AUTO_BREADCRUMBS_OUTPUT1)),
            )
            .with_type(dred::VERSIONED_DEVICE_REMOVED_EXTENDED_DATA, Struct(versioned))
    }
}

/// A typed view produced by [`MemoryProvider`].
///
/// Scalars and pointers are read when the view is created; structs are just an
/// address and a type name, and their fields are read on access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryValue {
    Scalar {
        value: u64,
        kind: ScalarKind,
    },
    Pointer {
        target: u64,
        pointee: TypeRef,
        module: String,
    },
    Object {
        address: u64,
        type_name: String,
        module: String,
    },
}

/// One contiguous copy of process memory.
#[derive(Debug, Clone)]
struct MemoryRegion {
    base: u64,
    bytes: Vec<u8>,
}

impl MemoryRegion {
    fn memory_range(&self) -> Option<Range<u64>> {
        if self.bytes.is_empty() {
            return None;
        }
        Some(Range::new(
            self.base,
            self.base.checked_add(self.bytes.len() as u64)? - 1,
        ))
    }
}

/// Sort `input` by range and drop entries overlapping an earlier one.
fn into_rangemap_safe(mut input: Vec<(Range<u64>, usize)>) -> RangeMap<u64, usize> {
    input.sort_by_key(|x| x.0);
    let mut vec: Vec<(Range<u64>, usize)> = Vec::with_capacity(input.len());
    for (range, index) in input {
        if let Some((last_range, _)) = vec.last() {
            if range.start <= last_range.end {
                continue;
            }
        }
        vec.push((range, index));
    }
    vec.into_iter().collect()
}

/// A [`DredProvider`] backed by copies of the process's memory.
#[derive(Debug)]
pub struct MemoryProvider {
    /// The memory regions, in the order they were added.
    regions: Vec<MemoryRegion>,
    /// Map from address range to index in regions.
    regions_by_addr: RangeMap<u64, usize>,
    modules: Vec<ModuleSymbols>,
}

impl MemoryProvider {
    pub fn new() -> MemoryProvider {
        MemoryProvider {
            regions: vec![],
            regions_by_addr: RangeMap::new(),
            modules: vec![],
        }
    }

    /// Add the bytes of memory starting at `base`.
    ///
    /// A region overlapping one that starts lower is ignored, as are empty
    /// regions.
    pub fn add_region(&mut self, base: u64, bytes: Vec<u8>) {
        self.regions.push(MemoryRegion { base, bytes });
        self.regions_by_addr = into_rangemap_safe(
            self.regions
                .iter()
                .enumerate()
                .filter_map(|(i, region)| Some((region.memory_range()?, i)))
                .collect(),
        );
    }

    /// Add a loaded module. Modules are enumerated in the order they are added.
    pub fn add_module(&mut self, module: ModuleSymbols) {
        self.modules.push(module);
    }

    fn module(&self, name: &str) -> Result<&ModuleSymbols, ProviderError> {
        self.modules
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ProviderError::ModuleNotFound {
                module: name.to_owned(),
            })
    }

    fn layout(&self, module: &str, type_name: &str) -> Result<&TypeLayout, ProviderError> {
        self.module(module)?
            .types
            .get(type_name)
            .ok_or_else(|| ProviderError::TypeNotFound {
                module: module.to_owned(),
                type_name: type_name.to_owned(),
            })
    }

    fn struct_layout(&self, module: &str, type_name: &str) -> Result<&StructLayout, ProviderError> {
        match self.layout(module, type_name)? {
            TypeLayout::Struct(layout) => Ok(layout),
            TypeLayout::Alias(_) => Err(ProviderError::NotAnObject),
        }
    }

    /// The bytes from `address` to the end of the region containing it.
    fn bytes_at(&self, address: u64) -> Option<&[u8]> {
        let &index = self.regions_by_addr.get(address)?;
        let region = &self.regions[index];
        let offset = usize::try_from(address - region.base).ok()?;
        region.bytes.get(offset..)
    }

    fn read_bytes(&self, address: u64, size: u64) -> Result<&[u8], ProviderError> {
        let err = ProviderError::MemoryReadFailure { address, size };
        let bytes = self.bytes_at(address).ok_or_else(|| err.clone())?;
        let size = usize::try_from(size).map_err(|_| err.clone())?;
        bytes.get(..size).ok_or(err)
    }

    fn read_scalar(&self, address: u64, kind: ScalarKind) -> Result<u64, ProviderError> {
        let bytes = self.read_bytes(address, kind.size())?;
        let err = || ProviderError::MemoryReadFailure {
            address,
            size: kind.size(),
        };
        let value = match kind {
            ScalarKind::U8 => u64::from(bytes[0]),
            ScalarKind::U16 => u64::from(bytes.pread_with::<u16>(0, LE).map_err(|_| err())?),
            ScalarKind::U32 => u64::from(bytes.pread_with::<u32>(0, LE).map_err(|_| err())?),
            // Keep the bit pattern, HRESULTs are compared as u32.
            ScalarKind::I32 => u64::from(bytes.pread_with::<i32>(0, LE).map_err(|_| err())? as u32),
            ScalarKind::U64 => bytes.pread_with::<u64>(0, LE).map_err(|_| err())?,
        };
        Ok(value)
    }

    fn size_of(&self, module: &str, ty: &TypeRef) -> Result<u64, ProviderError> {
        match ty {
            TypeRef::Scalar(kind) => Ok(kind.size()),
            TypeRef::Pointer(_) => Ok(POINTER_SIZE),
            TypeRef::Named(name) => match self.layout(module, name)? {
                TypeLayout::Struct(layout) => Ok(layout.size),
                TypeLayout::Alias(kind) => Ok(kind.size()),
            },
        }
    }

    /// Read a value of type `ty` at `address`.
    fn load(&self, module: &str, ty: &TypeRef, address: u64) -> Result<MemoryValue, ProviderError> {
        match ty {
            TypeRef::Scalar(kind) => Ok(MemoryValue::Scalar {
                value: self.read_scalar(address, *kind)?,
                kind: *kind,
            }),
            TypeRef::Pointer(pointee) => Ok(MemoryValue::Pointer {
                target: self.read_scalar(address, ScalarKind::U64)?,
                pointee: (**pointee).clone(),
                module: module.to_owned(),
            }),
            TypeRef::Named(name) => match self.layout(module, name)? {
                TypeLayout::Struct(_) => Ok(MemoryValue::Object {
                    address,
                    type_name: name.clone(),
                    module: module.to_owned(),
                }),
                TypeLayout::Alias(kind) => Ok(MemoryValue::Scalar {
                    value: self.read_scalar(address, *kind)?,
                    kind: *kind,
                }),
            },
        }
    }

    fn read_narrow(&self, address: u64) -> Result<String, ProviderError> {
        let bytes = self
            .bytes_at(address)
            .ok_or(ProviderError::MemoryReadFailure { address, size: 1 })?;
        let limit = bytes.len().min(MAX_STRING_LENGTH as usize);
        let bytes = &bytes[..limit];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(limit);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    fn read_wide(&self, address: u64) -> Result<String, ProviderError> {
        let bytes = self
            .bytes_at(address)
            .ok_or(ProviderError::MemoryReadFailure { address, size: 2 })?;
        let limit = (bytes.len() / 2).min(MAX_STRING_LENGTH as usize) * 2;
        let bytes = &bytes[..limit];
        let end = bytes
            .chunks_exact(2)
            .position(|c| c == [0, 0])
            .map(|units| units * 2)
            .unwrap_or(limit);
        let (string, _) = UTF_16LE.decode_without_bom_handling(&bytes[..end]);
        Ok(string.into_owned())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DredProvider for MemoryProvider {
    type Value = MemoryValue;

    fn loaded_modules(&self) -> Result<Vec<LoadedModule>, ProviderError> {
        Ok(self
            .modules
            .iter()
            .map(|m| LoadedModule::new(m.name.clone()))
            .collect())
    }

    fn symbol_address(&self, module: &str, symbol: &str) -> Result<u64, ProviderError> {
        self.module(module)?
            .symbols
            .get(symbol)
            .copied()
            .ok_or_else(|| ProviderError::SymbolNotFound {
                module: module.to_owned(),
                symbol: symbol.to_owned(),
            })
    }

    fn read_typed_value(
        &self,
        address: u64,
        module: &str,
        type_name: &str,
    ) -> Result<MemoryValue, ProviderError> {
        let module = self.module(module)?.name.clone();
        self.load(&module, &TypeRef::named(type_name), address)
    }

    fn marshal_as(
        &self,
        value: &MemoryValue,
        module: &str,
        type_name: &str,
    ) -> Result<MemoryValue, ProviderError> {
        match (value, self.layout(module, type_name)?) {
            (MemoryValue::Scalar { value, kind }, TypeLayout::Alias(to)) => {
                if kind.size() != to.size() {
                    return Err(ProviderError::SizeMismatch {
                        type_name: type_name.to_owned(),
                        from: kind.size(),
                        to: to.size(),
                    });
                }
                Ok(MemoryValue::Scalar {
                    value: *value,
                    kind: *to,
                })
            }
            (MemoryValue::Object { address, .. }, TypeLayout::Struct(_)) => {
                Ok(MemoryValue::Object {
                    address: *address,
                    type_name: type_name.to_owned(),
                    module: self.module(module)?.name.clone(),
                })
            }
            (MemoryValue::Object { .. }, TypeLayout::Alias(_)) => Err(ProviderError::NotAScalar),
            _ => Err(ProviderError::NotAnObject),
        }
    }

    fn field(&self, value: &MemoryValue, name: &str) -> Result<MemoryValue, ProviderError> {
        let (address, type_name, module) = match value {
            MemoryValue::Object {
                address,
                type_name,
                module,
            } => (*address, type_name, module),
            _ => return Err(ProviderError::NotAnObject),
        };
        let layout = self.struct_layout(module, type_name)?;
        let field = layout
            .find(name)
            .ok_or_else(|| ProviderError::FieldNotFound {
                type_name: type_name.clone(),
                field: name.to_owned(),
            })?;
        let field_address =
            address
                .checked_add(field.offset)
                .ok_or(ProviderError::MemoryReadFailure {
                    address,
                    size: field.offset,
                })?;
        self.load(module, &field.ty, field_address)
    }

    fn dereference(&self, value: &MemoryValue) -> Result<MemoryValue, ProviderError> {
        self.index_array(value, 0)
    }

    fn index_array(&self, value: &MemoryValue, index: u64) -> Result<MemoryValue, ProviderError> {
        match value {
            MemoryValue::Pointer {
                target,
                pointee,
                module,
            } => {
                let stride = self.size_of(module, pointee)?;
                let address = index
                    .checked_mul(stride)
                    .and_then(|offset| target.checked_add(offset))
                    .ok_or(ProviderError::MemoryReadFailure {
                        address: *target,
                        size: stride,
                    })?;
                self.load(module, pointee, address)
            }
            _ => Err(ProviderError::NotAPointer),
        }
    }

    fn is_null(&self, value: &MemoryValue) -> bool {
        matches!(value, MemoryValue::Pointer { target: 0, .. })
    }

    fn to_u64(&self, value: &MemoryValue) -> Result<u64, ProviderError> {
        match value {
            MemoryValue::Scalar { value, .. } => Ok(*value),
            MemoryValue::Pointer { target, .. } => Ok(*target),
            MemoryValue::Object { .. } => Err(ProviderError::NotAScalar),
        }
    }

    fn read_string(&self, value: &MemoryValue) -> Result<String, ProviderError> {
        match value {
            MemoryValue::Pointer {
                target,
                pointee: TypeRef::Scalar(ScalarKind::U8),
                ..
            } => self.read_narrow(*target),
            MemoryValue::Pointer {
                target,
                pointee: TypeRef::Scalar(ScalarKind::U16),
                ..
            } => self.read_wide(*target),
            _ => Err(ProviderError::NotAPointer),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn provider() -> MemoryProvider {
        let mut bytes = vec![0u8; 0x100];
        // A D3D12_DRED_ALLOCATION_NODE at 0x1000.
        bytes[0..8].copy_from_slice(&0x1080u64.to_le_bytes());
        bytes[8..16].copy_from_slice(&0x10c0u64.to_le_bytes());
        bytes[16..20].copy_from_slice(&34u32.to_le_bytes());
        bytes[0x80..0x84].copy_from_slice(b"heap");
        for (i, unit) in "wide".encode_utf16().enumerate() {
            bytes[0xc0 + i * 2..0xc0 + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        let mut provider = MemoryProvider::new();
        provider.add_region(0x1000, bytes);
        provider.add_module(ModuleSymbols::new("app"));
        provider.add_module(ModuleSymbols::new("d3d12").with_dred_types());
        provider
    }

    #[test]
    fn test_struct_fields() {
        let provider = provider();
        let node = provider
            .read_typed_value(0x1000, "D3D12", dred::DRED_ALLOCATION_NODE)
            .unwrap();
        let ty = provider.field(&node, "AllocationType").unwrap();
        assert_eq!(provider.to_u64(&ty).unwrap(), 34);
        let name = provider.field(&node, "ObjectNameA").unwrap();
        assert!(!provider.is_null(&name));
        assert_eq!(provider.read_string(&name).unwrap(), "heap");
        let name = provider.field(&node, "ObjectNameW").unwrap();
        assert_eq!(provider.read_string(&name).unwrap(), "wide");
        let next = provider.field(&node, "pNext").unwrap();
        assert!(provider.is_null(&next));
        assert_eq!(
            provider.field(&node, "Bogus"),
            Err(ProviderError::FieldNotFound {
                type_name: dred::DRED_ALLOCATION_NODE.to_owned(),
                field: "Bogus".to_owned(),
            })
        );
    }

    #[test]
    fn test_missing_type_and_memory() {
        let provider = provider();
        assert_eq!(
            provider.read_typed_value(0x1000, "app", dred::DRED_ALLOCATION_NODE),
            Err(ProviderError::TypeNotFound {
                module: "app".to_owned(),
                type_name: dred::DRED_ALLOCATION_NODE.to_owned(),
            })
        );
        assert_eq!(
            provider
                .read_typed_value(0x1000, "nvwgf2umx", dred::DRED_ALLOCATION_NODE)
                .unwrap_err()
                .name(),
            "ModuleNotFound"
        );
        let node = provider
            .read_typed_value(0x10f8, "d3d12", dred::DRED_ALLOCATION_NODE)
            .unwrap();
        assert_eq!(
            provider.field(&node, "AllocationType"),
            Err(ProviderError::MemoryReadFailure {
                address: 0x1108,
                size: 4,
            })
        );
    }

    #[test]
    fn test_marshal_as() {
        let provider = provider();
        let node = provider
            .read_typed_value(0x1000, "d3d12", dred::DRED_ALLOCATION_NODE)
            .unwrap();
        let ty = provider.field(&node, "AllocationType").unwrap();
        let hr = provider.marshal_as(&ty, "d3d12", dred::HRESULT).unwrap();
        assert_eq!(provider.to_u64(&hr).unwrap(), 34);
        assert_eq!(
            provider.marshal_as(&ty, "app", dred::HRESULT).unwrap_err().name(),
            "TypeNotFound"
        );
        let name = provider.field(&node, "ObjectNameA").unwrap();
        assert_eq!(
            provider.marshal_as(&name, "d3d12", dred::HRESULT),
            Err(ProviderError::NotAnObject)
        );
    }

    #[test]
    fn test_region_lookup() {
        let mut provider = MemoryProvider::new();
        let mut big = vec![0u8; 0x1000];
        big[0x800..0x804].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        provider.add_region(0x10000, big);
        provider.add_region(0x10100, vec![0xff; 0x10]);
        provider.add_region(0x20000, 7u32.to_le_bytes().to_vec());
        provider.add_region(0x30000, vec![]);

        assert_eq!(provider.read_scalar(0x10800, ScalarKind::U32), Ok(0x1234_5678));
        // The overlapping region is ignored.
        assert_eq!(provider.read_scalar(0x10100, ScalarKind::U32), Ok(0));
        assert_eq!(provider.read_scalar(0x20000, ScalarKind::U32), Ok(7));
        assert_eq!(
            provider.read_scalar(0x20002, ScalarKind::U32),
            Err(ProviderError::MemoryReadFailure {
                address: 0x20002,
                size: 4,
            })
        );
        assert!(provider.read_scalar(0x11000, ScalarKind::U8).is_err());
        assert!(provider.read_scalar(0x30000, ScalarKind::U8).is_err());
    }
}
