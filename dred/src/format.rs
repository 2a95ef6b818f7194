//! DRED structure definitions.
//!
//! Names and values defined here should match those in [Microsoft's d3d12 headers][msdn].
//! The structures themselves are never read directly: every field is reached through a
//! [`DredProvider`](crate::DredProvider) by name, so only the type names, field names and
//! enum values live here.
//!
//! [msdn]: https://learn.microsoft.com/en-us/windows/win32/api/d3d12/
#![allow(non_camel_case_types)]

use num_traits::FromPrimitive;

/// Size in bytes of the buffer the runtime allocates for each command list's breadcrumbs.
pub const AUTO_BREADCRUMBS_BUFFER_SIZE: u32 = 65536;

/// Offset of the command history within the breadcrumb buffer; the rest is header.
pub const AUTO_BREADCRUMBS_COMMAND_HISTORY_OFFSET: u32 = 4096;

/// Number of `D3D12_AUTO_BREADCRUMB_OP` entries the command history ring can hold.
pub const AUTO_BREADCRUMBS_COMMAND_HISTORY_MAX: u32 =
    (AUTO_BREADCRUMBS_BUFFER_SIZE - AUTO_BREADCRUMBS_COMMAND_HISTORY_OFFSET) / 4;

/// The global in the d3d12 runtime that holds the most recent DRED record.
pub const DRED_GLOBAL_SYMBOL: &str = "D3D12DeviceRemovedExtendedData";

pub const VERSIONED_DEVICE_REMOVED_EXTENDED_DATA: &str =
    "D3D12_VERSIONED_DEVICE_REMOVED_EXTENDED_DATA";
pub const DEVICE_REMOVED_EXTENDED_DATA: &str = "D3D12_DEVICE_REMOVED_EXTENDED_DATA";
pub const DEVICE_REMOVED_EXTENDED_DATA1: &str = "D3D12_DEVICE_REMOVED_EXTENDED_DATA1";
pub const DEVICE_REMOVED_EXTENDED_DATA2: &str = "D3D12_DEVICE_REMOVED_EXTENDED_DATA2";
pub const DEVICE_REMOVED_EXTENDED_DATA3: &str = "D3D12_DEVICE_REMOVED_EXTENDED_DATA3";
pub const DRED_AUTO_BREADCRUMBS_OUTPUT: &str = "D3D12_DRED_AUTO_BREADCRUMBS_OUTPUT";
pub const DRED_AUTO_BREADCRUMBS_OUTPUT1: &str = "D3D12_DRED_AUTO_BREADCRUMBS_OUTPUT1";
pub const DRED_PAGE_FAULT_OUTPUT: &str = "D3D12_DRED_PAGE_FAULT_OUTPUT";
pub const AUTO_BREADCRUMB_NODE: &str = "D3D12_AUTO_BREADCRUMB_NODE";
pub const AUTO_BREADCRUMB_NODE1: &str = "D3D12_AUTO_BREADCRUMB_NODE1";
pub const DRED_BREADCRUMB_CONTEXT: &str = "D3D12_DRED_BREADCRUMB_CONTEXT";
pub const DRED_ALLOCATION_NODE: &str = "D3D12_DRED_ALLOCATION_NODE";
pub const DRED_VERSION: &str = "D3D12_DRED_VERSION";
pub const AUTO_BREADCRUMB_OP: &str = "D3D12_AUTO_BREADCRUMB_OP";
pub const DRED_ALLOCATION_TYPE: &str = "D3D12_DRED_ALLOCATION_TYPE";
pub const HRESULT: &str = "HRESULT";

/// The `Version` tag of a `D3D12_VERSIONED_DEVICE_REMOVED_EXTENDED_DATA`.
///
/// This enum matches the [Microsoft enum][msdn] of the same name.
///
/// [msdn]: https://learn.microsoft.com/en-us/windows/win32/api/d3d12/ne-d3d12-d3d12_dred_version
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Primitive)]
pub enum DredVersion {
    /// Breadcrumbs only.
    Dred1_0 = 1,
    /// Breadcrumbs, page fault output and the raw removal reason.
    Dred1_1 = 2,
    /// As 1.1, with the removal reason typed through symbol metadata.
    Dred1_2 = 3,
    /// Breadcrumbs with per-op context strings, page fault output and the removal reason.
    Dred1_3 = 4,
}

impl DredVersion {
    /// The name of the union member holding this version's payload.
    pub fn data_field(self) -> &'static str {
        match self {
            DredVersion::Dred1_0 => "Dred_1_0",
            DredVersion::Dred1_1 => "Dred_1_1",
            DredVersion::Dred1_2 => "Dred_1_2",
            DredVersion::Dred1_3 => "Dred_1_3",
        }
    }

    /// Whether breadcrumb nodes of this version carry context strings.
    pub fn has_breadcrumb_contexts(self) -> bool {
        self == DredVersion::Dred1_3
    }
}

/// The operation recorded in one slot of a breadcrumb command history.
///
/// This enum matches the [Microsoft enum][msdn] `D3D12_AUTO_BREADCRUMB_OP`.
///
/// [msdn]: https://learn.microsoft.com/en-us/windows/win32/api/d3d12/ne-d3d12-d3d12_auto_breadcrumb_op
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Primitive)]
pub enum AutoBreadcrumbOp {
    SetMarker = 0,
    BeginEvent = 1,
    EndEvent = 2,
    DrawInstanced = 3,
    DrawIndexedInstanced = 4,
    ExecuteIndirect = 5,
    Dispatch = 6,
    CopyBufferRegion = 7,
    CopyTextureRegion = 8,
    CopyResource = 9,
    CopyTiles = 10,
    ResolveSubresource = 11,
    ClearRenderTargetView = 12,
    ClearUnorderedAccessView = 13,
    ClearDepthStencilView = 14,
    ResourceBarrier = 15,
    ExecuteBundle = 16,
    Present = 17,
    ResolveQueryData = 18,
    BeginSubmission = 19,
    EndSubmission = 20,
    DecodeFrame = 21,
    ProcessFrames = 22,
    AtomicCopyBufferUint = 23,
    AtomicCopyBufferUint64 = 24,
    ResolveSubresourceRegion = 25,
    WriteBufferImmediate = 26,
    DecodeFrame1 = 27,
    SetProtectedResourceSession = 28,
    DecodeFrame2 = 29,
    ProcessFrames1 = 30,
    BuildRaytracingAccelerationStructure = 31,
    EmitRaytracingAccelerationStructurePostbuildInfo = 32,
    CopyRaytracingAccelerationStructure = 33,
    DispatchRays = 34,
    InitializeMetaCommand = 35,
    ExecuteMetaCommand = 36,
    EstimateMotion = 37,
    ResolveMotionVectorHeap = 38,
    SetPipelineState1 = 39,
    InitializeExtensionCommand = 40,
    ExecuteExtensionCommand = 41,
    DispatchMesh = 42,
    EncodeFrame = 43,
    ResolveEncoderOutputMetadata = 44,
    Barrier = 45,
    BeginCommandList = 46,
    DispatchGraph = 47,
    SetProgram = 48,
    ProcessFrames2 = 49,
}

impl AutoBreadcrumbOp {
    /// Map a raw history value, `None` if it is not a documented op.
    pub fn from_raw(value: u32) -> Option<AutoBreadcrumbOp> {
        AutoBreadcrumbOp::from_u32(value)
    }
}

/// The kind of object an allocation node describes.
///
/// This enum matches the [Microsoft enum][msdn] `D3D12_DRED_ALLOCATION_TYPE`.
///
/// [msdn]: https://learn.microsoft.com/en-us/windows/win32/api/d3d12/ne-d3d12-d3d12_dred_allocation_type
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Primitive)]
pub enum AllocationType {
    CommandQueue = 19,
    CommandAllocator = 20,
    PipelineState = 21,
    CommandList = 22,
    Fence = 23,
    DescriptorHeap = 24,
    Heap = 25,
    QueryHeap = 27,
    CommandSignature = 28,
    PipelineLibrary = 29,
    VideoDecoder = 30,
    VideoProcessor = 32,
    Resource = 34,
    Pass = 35,
    CryptoSession = 36,
    CryptoSessionPolicy = 37,
    ProtectedResourceSession = 38,
    VideoDecoderHeap = 39,
    CommandPool = 40,
    CommandRecorder = 41,
    StateObject = 42,
    MetaCommand = 43,
    SchedulingGroup = 44,
    VideoMotionEstimator = 45,
    VideoMotionVectorHeap = 46,
    VideoExtensionCommand = 47,
    VideoEncoder = 48,
    VideoEncoderHeap = 49,
    Invalid = 0xffff_ffff_u32,
}

impl AllocationType {
    pub fn from_raw(value: u32) -> Option<AllocationType> {
        AllocationType::from_u32(value)
    }
}

/// Well-known `HRESULT`s a device can be removed with.
pub const DXGI_ERROR_INVALID_CALL: u32 = 0x887a_0001;
pub const DXGI_ERROR_DEVICE_REMOVED: u32 = 0x887a_0005;
pub const DXGI_ERROR_DEVICE_HUNG: u32 = 0x887a_0006;
pub const DXGI_ERROR_DEVICE_RESET: u32 = 0x887a_0007;
pub const DXGI_ERROR_DRIVER_INTERNAL_ERROR: u32 = 0x887a_0020;
pub const E_OUTOFMEMORY: u32 = 0x8007_000e;
pub const S_OK: u32 = 0;

/// Returns the symbolic name of a device-removed `HRESULT`, if it is a known one.
pub fn hresult_name(code: u32) -> Option<&'static str> {
    Some(match code {
        S_OK => "S_OK",
        DXGI_ERROR_INVALID_CALL => "DXGI_ERROR_INVALID_CALL",
        DXGI_ERROR_DEVICE_REMOVED => "DXGI_ERROR_DEVICE_REMOVED",
        DXGI_ERROR_DEVICE_HUNG => "DXGI_ERROR_DEVICE_HUNG",
        DXGI_ERROR_DEVICE_RESET => "DXGI_ERROR_DEVICE_RESET",
        DXGI_ERROR_DRIVER_INTERNAL_ERROR => "DXGI_ERROR_DRIVER_INTERNAL_ERROR",
        E_OUTOFMEMORY => "E_OUTOFMEMORY",
        _ => return None,
    })
}
