//! OpenXR ABI 定義
//!
//! ローダー交渉とレイヤーチェーンに必要な最小限のOpenXR型定義
//! （OpenXR 1.0仕様準拠）。完全なバインディングではなく、
//! このレイヤーが触れる構造体・定数・関数ポインタ型のみを定義する。

use std::ffi::{c_char, c_void};

// ─── 基本型 ───────────────────────────────────────────────

pub type XrResult = i32;
pub type XrVersion = u64;
pub type XrPath = u64;
pub type XrBool32 = u32;
pub type XrTime = i64;

// ハンドルは不透明な64bit値として扱う（中身は一切解釈しない）
pub type XrInstance = u64;
pub type XrSession = u64;
pub type XrAction = u64;

// ─── 定数 ─────────────────────────────────────────────────

pub const XR_TRUE: XrBool32 = 1;
pub const XR_FALSE: XrBool32 = 0;
pub const XR_NULL_PATH: XrPath = 0;
pub const XR_NULL_HANDLE: u64 = 0;

pub const XR_SUCCESS: XrResult = 0;
pub const XR_ERROR_FUNCTION_UNSUPPORTED: XrResult = -1;
pub const XR_ERROR_HANDLE_INVALID: XrResult = -12;
pub const XR_ERROR_INITIALIZATION_FAILED: XrResult = -38;

pub const XR_MAX_API_LAYER_NAME_SIZE: usize = 256;

/// このレイヤーが実装するローダーインターフェースバージョン
pub const LAYER_INTERFACE_VERSION: u32 = 1;

/// レイヤー名（マニフェストと一致させる）
pub const LAYER_NAME: &str = "XR_APILAYER_TREADMILL_driver";

#[inline]
pub const fn xr_make_version(major: u16, minor: u16, patch: u32) -> XrVersion {
    ((major as u64) << 48) | ((minor as u64) << 32) | (patch as u64)
}

pub const XR_CURRENT_API_VERSION: XrVersion = xr_make_version(1, 0, 0);

#[inline]
pub const fn xr_succeeded(result: XrResult) -> bool {
    result >= 0
}

#[inline]
pub const fn xr_failed(result: XrResult) -> bool {
    result < 0
}

// ─── XrStructureType（使用する値のみ） ─────────────────────

pub type XrStructureType = i32;

pub const XR_TYPE_UNKNOWN: XrStructureType = 0;
pub const XR_TYPE_INSTANCE_CREATE_INFO: XrStructureType = 3;
pub const XR_TYPE_ACTION_STATE_FLOAT: XrStructureType = 24;
pub const XR_TYPE_ACTION_STATE_VECTOR2F: XrStructureType = 25;
pub const XR_TYPE_ACTION_STATE_GET_INFO: XrStructureType = 44;
pub const XR_TYPE_INTERACTION_PROFILE_SUGGESTED_BINDING: XrStructureType = 51;

// ─── ローダーインターフェース構造体種別 ────────────────────

pub type XrLoaderInterfaceStructs = i32;

pub const XR_LOADER_INTERFACE_STRUCT_UNINTIALIZED: XrLoaderInterfaceStructs = 0;
pub const XR_LOADER_INTERFACE_STRUCT_LOADER_INFO: XrLoaderInterfaceStructs = 1;
pub const XR_LOADER_INTERFACE_STRUCT_API_LAYER_REQUEST: XrLoaderInterfaceStructs = 2;
pub const XR_LOADER_INTERFACE_STRUCT_RUNTIME_REQUEST: XrLoaderInterfaceStructs = 3;
pub const XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO: XrLoaderInterfaceStructs = 4;
pub const XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO: XrLoaderInterfaceStructs = 5;

// ─── コア構造体 ───────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct XrVector2f {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct XrApplicationInfo {
    pub application_name: [c_char; 128],
    pub application_version: u32,
    pub engine_name: [c_char; 128],
    pub engine_version: u32,
    pub api_version: XrVersion,
}

#[repr(C)]
pub struct XrInstanceCreateInfo {
    pub ty: XrStructureType,
    pub next: *const c_void,
    pub create_flags: u64,
    pub application_info: XrApplicationInfo,
    pub enabled_api_layer_count: u32,
    pub enabled_api_layer_names: *const *const c_char,
    pub enabled_extension_count: u32,
    pub enabled_extension_names: *const *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionStateGetInfo {
    pub ty: XrStructureType,
    pub next: *const c_void,
    pub action: XrAction,
    pub subaction_path: XrPath,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionStateFloat {
    pub ty: XrStructureType,
    pub next: *mut c_void,
    pub current_state: f32,
    pub changed_since_last_sync: XrBool32,
    pub last_change_time: XrTime,
    pub is_active: XrBool32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionStateVector2f {
    pub ty: XrStructureType,
    pub next: *mut c_void,
    pub current_state: XrVector2f,
    pub changed_since_last_sync: XrBool32,
    pub last_change_time: XrTime,
    pub is_active: XrBool32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrActionSuggestedBinding {
    pub action: XrAction,
    pub binding: XrPath,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrInteractionProfileSuggestedBinding {
    pub ty: XrStructureType,
    pub next: *const c_void,
    pub interaction_profile: XrPath,
    pub count_suggested_bindings: u32,
    pub suggested_bindings: *const XrActionSuggestedBinding,
}

// ─── 関数ポインタ型 ───────────────────────────────────────

/// 型消去された関数ポインタ（PFN_xrVoidFunction相当、NULL許容）
pub type PfnVoidFunction = Option<unsafe extern "system" fn()>;

pub type PfnGetInstanceProcAddr = unsafe extern "system" fn(
    instance: XrInstance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult;

pub type PfnDestroyInstance = unsafe extern "system" fn(instance: XrInstance) -> XrResult;

pub type PfnPathToString = unsafe extern "system" fn(
    instance: XrInstance,
    path: XrPath,
    buffer_capacity_input: u32,
    buffer_count_output: *mut u32,
    buffer: *mut c_char,
) -> XrResult;

pub type PfnStringToPath = unsafe extern "system" fn(
    instance: XrInstance,
    path_string: *const c_char,
    path: *mut XrPath,
) -> XrResult;

pub type PfnSuggestInteractionProfileBindings = unsafe extern "system" fn(
    instance: XrInstance,
    suggested_bindings: *const XrInteractionProfileSuggestedBinding,
) -> XrResult;

pub type PfnGetActionStateFloat = unsafe extern "system" fn(
    session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state: *mut XrActionStateFloat,
) -> XrResult;

pub type PfnGetActionStateVector2f = unsafe extern "system" fn(
    session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state: *mut XrActionStateVector2f,
) -> XrResult;

// ─── ローダー交渉構造体 ───────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrNegotiateLoaderInfo {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: XrVersion,
    pub max_api_version: XrVersion,
}

pub type PfnCreateApiLayerInstance = unsafe extern "system" fn(
    info: *const XrInstanceCreateInfo,
    layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult;

#[repr(C)]
pub struct XrApiLayerNextInfo {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_name: [c_char; XR_MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub next_create_api_layer_instance: Option<PfnCreateApiLayerInstance>,
    pub next: *mut XrApiLayerNextInfo,
}

#[repr(C)]
pub struct XrApiLayerCreateInfo {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub loader_instance: *mut c_void,
    pub next_info_name: [c_char; XR_MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub next_info: *mut XrApiLayerNextInfo,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XrNegotiateApiLayerRequest {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_interface_version: u32,
    pub layer_api_version: XrVersion,
    pub get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    pub create_api_layer_instance: Option<PfnCreateApiLayerInstance>,
}
