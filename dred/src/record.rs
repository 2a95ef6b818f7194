//! Decoding of `D3D12_VERSIONED_DEVICE_REMOVED_EXTENDED_DATA`.

use std::fmt;

use num_traits::FromPrimitive;
use tracing::{debug, info};

use crate::breadcrumbs::{read_breadcrumb_nodes, BreadcrumbNode};
use crate::error::{DecodeError, Diagnostic, Diagnostics, ProviderError, SymbolAttempt};
use crate::format::{self, DredVersion};
use crate::options::DecodeOptions;
use crate::page_fault::{read_page_fault, PageFaultReport};
use crate::provider::{optional_pointer, read_u64, to_u32, DredProvider, LoadedModule};
use crate::symbols::{Resolved, SymbolSourceResolver};

/// State threaded through one decode.
pub(crate) struct DecodeContext<'a, P: DredProvider + ?Sized> {
    pub provider: &'a P,
    /// The module whose symbols describe the record.
    pub module: String,
    pub ring_capacity: u32,
    pub max_list_nodes: usize,
    pub diagnostics: Diagnostics,
}

/// The `HRESULT` the device was removed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRemovedReason(pub u32);

impl DeviceRemovedReason {
    pub fn code(self) -> u32 {
        self.0
    }

    /// The symbolic name of the code, for the handful of codes a device is
    /// usually removed with.
    pub fn name(self) -> Option<&'static str> {
        format::hresult_name(self.0)
    }
}

impl fmt::Display for DeviceRemovedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{:#010x} ({})", self.0, name),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

/// The payload of DRED 1.0.
#[derive(Debug)]
pub struct DredData<'a, P: DredProvider + ?Sized> {
    pub breadcrumb_nodes: Vec<BreadcrumbNode<'a, P>>,
}

/// The payload of DRED 1.1 and later.
#[derive(Debug)]
pub struct DredDataWithPageFault<'a, P: DredProvider + ?Sized> {
    pub breadcrumb_nodes: Vec<BreadcrumbNode<'a, P>>,
    /// `None` if the page fault output could not be read.
    pub page_fault: Option<PageFaultReport>,
    /// `None` if the reason could not be decoded.
    pub removed_reason: Option<DeviceRemovedReason>,
}

/// A DRED record, by version.
#[derive(Debug)]
pub enum VersionedRecord<'a, P: DredProvider + ?Sized> {
    Dred1_0(DredData<'a, P>),
    Dred1_1(DredDataWithPageFault<'a, P>),
    Dred1_2(DredDataWithPageFault<'a, P>),
    Dred1_3(DredDataWithPageFault<'a, P>),
}

impl<'a, P: DredProvider + ?Sized> VersionedRecord<'a, P> {
    pub fn version(&self) -> DredVersion {
        match self {
            VersionedRecord::Dred1_0(_) => DredVersion::Dred1_0,
            VersionedRecord::Dred1_1(_) => DredVersion::Dred1_1,
            VersionedRecord::Dred1_2(_) => DredVersion::Dred1_2,
            VersionedRecord::Dred1_3(_) => DredVersion::Dred1_3,
        }
    }

    pub fn breadcrumb_nodes(&self) -> &[BreadcrumbNode<'a, P>] {
        match self {
            VersionedRecord::Dred1_0(data) => &data.breadcrumb_nodes,
            VersionedRecord::Dred1_1(data)
            | VersionedRecord::Dred1_2(data)
            | VersionedRecord::Dred1_3(data) => &data.breadcrumb_nodes,
        }
    }

    pub fn page_fault(&self) -> Option<&PageFaultReport> {
        match self {
            VersionedRecord::Dred1_0(_) => None,
            VersionedRecord::Dred1_1(data)
            | VersionedRecord::Dred1_2(data)
            | VersionedRecord::Dred1_3(data) => data.page_fault.as_ref(),
        }
    }

    pub fn removed_reason(&self) -> Option<DeviceRemovedReason> {
        match self {
            VersionedRecord::Dred1_0(_) => None,
            VersionedRecord::Dred1_1(data)
            | VersionedRecord::Dred1_2(data)
            | VersionedRecord::Dred1_3(data) => data.removed_reason,
        }
    }
}

/// The result of a successful decode.
#[derive(Debug)]
pub struct DecodedDred<'a, P: DredProvider + ?Sized> {
    pub record: VersionedRecord<'a, P>,
    /// The module whose symbols described the record.
    pub symbol_module: String,
    /// Problems that were worked around while decoding, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode the DRED record at `address`.
///
/// The record's types are looked up in the symbols of each loaded module in
/// turn (see [`SymbolSourceResolver`]); failing to find them anywhere is an
/// error, and so is a version tag or payload that can't be read. Past that
/// point the decode is best-effort: parts of the record that can't be read are
/// left out and reported in [`DecodedDred::diagnostics`].
pub fn decode_device_removed_data<'a, P: DredProvider + ?Sized>(
    provider: &'a P,
    address: u64,
    options: &DecodeOptions,
) -> Result<DecodedDred<'a, P>, DecodeError> {
    let modules = provider.loaded_modules()?;
    let resolver = SymbolSourceResolver::from_options(options);
    let Resolved {
        module,
        value: record,
    } = resolver.resolve(
        &modules,
        format::VERSIONED_DEVICE_REMOVED_EXTENDED_DATA,
        |module| {
            provider.read_typed_value(address, module, format::VERSIONED_DEVICE_REMOVED_EXTENDED_DATA)
        },
    )?;

    let raw_version = read_u64(provider, &record, "Version")?;
    let version =
        DredVersion::from_u64(raw_version).ok_or(DecodeError::UnsupportedVersion(raw_version))?;
    info!("DRED version {:?} at {:#x}", version, address);
    let data = provider.field(&record, version.data_field())?;

    let mut ctx = DecodeContext {
        provider,
        module,
        ring_capacity: options.ring_capacity,
        max_list_nodes: options.max_list_nodes,
        diagnostics: Diagnostics::default(),
    };

    let record = match version {
        DredVersion::Dred1_0 => VersionedRecord::Dred1_0(DredData {
            breadcrumb_nodes: read_breadcrumbs_output(&mut ctx, Ok(data), false),
        }),
        DredVersion::Dred1_1 => VersionedRecord::Dred1_1(read_data_with_page_fault(
            &mut ctx, &data, &resolver, &modules, version,
        )),
        DredVersion::Dred1_2 => VersionedRecord::Dred1_2(read_data_with_page_fault(
            &mut ctx, &data, &resolver, &modules, version,
        )),
        DredVersion::Dred1_3 => VersionedRecord::Dred1_3(read_data_with_page_fault(
            &mut ctx, &data, &resolver, &modules, version,
        )),
    };

    Ok(DecodedDred {
        record,
        symbol_module: ctx.module,
        diagnostics: ctx.diagnostics.into_vec(),
    })
}

/// Decode the node list headed by `output`'s `pHeadAutoBreadcrumbNode`.
fn read_breadcrumbs_output<'a, P: DredProvider + ?Sized>(
    ctx: &mut DecodeContext<'a, P>,
    output: Result<P::Value, ProviderError>,
    has_contexts: bool,
) -> Vec<BreadcrumbNode<'a, P>> {
    let provider = ctx.provider;
    match output.and_then(|output| optional_pointer(provider, &output, "pHeadAutoBreadcrumbNode")) {
        Ok(head) => read_breadcrumb_nodes(ctx, head, has_contexts),
        Err(error) => {
            ctx.diagnostics.push(Diagnostic::BreadcrumbsUnreadable {
                error: error.into(),
            });
            Vec::new()
        }
    }
}

/// Breadcrumbs, page fault and reason are decoded independently; a failure
/// in one is recorded as a diagnostic and leaves the others intact.
fn read_data_with_page_fault<'a, P: DredProvider + ?Sized>(
    ctx: &mut DecodeContext<'a, P>,
    data: &P::Value,
    resolver: &SymbolSourceResolver,
    modules: &[LoadedModule],
    version: DredVersion,
) -> DredDataWithPageFault<'a, P> {
    let provider = ctx.provider;
    let output = provider.field(data, "AutoBreadcrumbsOutput");
    let breadcrumb_nodes =
        read_breadcrumbs_output(ctx, output, version.has_breadcrumb_contexts());

    let page_fault = match provider
        .field(data, "PageFaultOutput")
        .map_err(DecodeError::from)
        .and_then(|output| read_page_fault(ctx, &output))
    {
        Ok(page_fault) => Some(page_fault),
        Err(error) => {
            ctx.diagnostics.push(Diagnostic::PageFaultUnreadable { error });
            None
        }
    };

    let removed_reason = match read_removed_reason(provider, data, resolver, modules, version) {
        Ok(reason) => Some(reason),
        Err(error) => {
            ctx.diagnostics.push(Diagnostic::ReasonUnavailable { error });
            None
        }
    };

    DredDataWithPageFault {
        breadcrumb_nodes,
        page_fault,
        removed_reason,
    }
}

/// DRED 1.1 stores the reason as a plain integer; later versions type it as
/// an `HRESULT`, which has to be found in some module's symbols.
fn read_removed_reason<P: DredProvider + ?Sized>(
    provider: &P,
    data: &P::Value,
    resolver: &SymbolSourceResolver,
    modules: &[LoadedModule],
    version: DredVersion,
) -> Result<DeviceRemovedReason, DecodeError> {
    let raw_reason = provider.field(data, "DeviceRemovedReason")?;
    if version == DredVersion::Dred1_1 {
        return Ok(DeviceRemovedReason(to_u32(
            provider,
            &raw_reason,
            "DeviceRemovedReason",
        )?));
    }
    let resolved = resolver.resolve(modules, format::HRESULT, |module| {
        let hr = provider.marshal_as(&raw_reason, module, format::HRESULT)?;
        provider.to_u64(&hr)
    })?;
    // HRESULT is 32 bits wide; drop any sign extension.
    Ok(DeviceRemovedReason(resolved.value as u32))
}

/// Find the runtime's global DRED record, `D3D12DeviceRemovedExtendedData`.
///
/// The primary module is searched first, then the legacy one.
pub fn locate_device_removed_data<P: DredProvider + ?Sized>(
    provider: &P,
    options: &DecodeOptions,
) -> Result<u64, DecodeError> {
    let candidates = [options.primary_module.as_str(), options.legacy_module.as_str()];
    let mut attempts = Vec::new();
    for &module in candidates.iter() {
        match provider.symbol_address(module, format::DRED_GLOBAL_SYMBOL) {
            Ok(address) => {
                debug!("found {} in {} at {:#x}", format::DRED_GLOBAL_SYMBOL, module, address);
                return Ok(address);
            }
            Err(error) => attempts.push(SymbolAttempt {
                module: module.to_owned(),
                error,
            }),
        }
    }
    Err(DecodeError::SymbolMetadataUnavailable {
        type_name: format::DRED_GLOBAL_SYMBOL.to_owned(),
        attempts,
    })
}

/// Decode the runtime's global DRED record.
///
/// This is what `dx -r1 ((d3d12!D3D12DeviceRemovedExtendedData))` shows in a
/// debugger.
pub fn decode_global_device_removed_data<'a, P: DredProvider + ?Sized>(
    provider: &'a P,
    options: &DecodeOptions,
) -> Result<DecodedDred<'a, P>, DecodeError> {
    let address = locate_device_removed_data(provider, options)?;
    decode_device_removed_data(provider, address, options)
}
