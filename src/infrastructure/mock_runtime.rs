//! モックランタイムアダプタ
//!
//! テスト用の「次リンク」実装。ローダーチェーンの下流に位置する
//! レイヤー/ランタイムをextern "system"関数群とプロセスグローバルな
//! 状態テーブルで模倣する。
//!
//! 実チェーンと同じく関数ポインタ経由で呼ばれるため状態は必然的に
//! グローバルになる。複数テストから使う場合は直列化すること
//! （tests/layer_integration.rs参照）。

use std::ffi::{c_char, CStr};
use std::sync::Mutex;

use crate::infrastructure::xr_ffi::{
    PfnCreateApiLayerInstance, PfnGetInstanceProcAddr, PfnVoidFunction, XrActionStateFloat,
    XrActionStateGetInfo, XrActionStateVector2f, XrApiLayerCreateInfo, XrInstance,
    XrInstanceCreateInfo, XrInteractionProfileSuggestedBinding, XrPath, XrResult, XrSession,
    XR_ERROR_FUNCTION_UNSUPPORTED, XR_ERROR_HANDLE_INVALID, XR_FALSE, XR_SUCCESS,
    XR_TYPE_ACTION_STATE_FLOAT, XR_TYPE_ACTION_STATE_VECTOR2F,
};

/// モックが返すインスタンスハンドル
pub const MOCK_INSTANCE_HANDLE: XrInstance = 0xBEEF;

struct MockState {
    /// インターン済みパス（id = index + 1）
    paths: Vec<String>,
    /// Vector2fクエリのランタイム側ベースライン
    vec2f_x: f32,
    vec2f_y: f32,
    /// Floatクエリのランタイム側ベースライン
    float_value: f32,
    /// 各転送呼び出しの戻り値（失敗パスのテスト用）
    create_result: XrResult,
    suggest_result: XrResult,
    state_result: XrResult,
    /// オプション機能の有無
    provide_path_to_string: bool,
    provide_string_to_path: bool,
    /// 呼び出し回数
    create_calls: u32,
    destroy_calls: u32,
    suggest_calls: u32,
}

impl MockState {
    const fn new() -> Self {
        Self {
            paths: Vec::new(),
            vec2f_x: 0.0,
            vec2f_y: 0.0,
            float_value: 0.0,
            create_result: XR_SUCCESS,
            suggest_result: XR_SUCCESS,
            state_result: XR_SUCCESS,
            provide_path_to_string: true,
            provide_string_to_path: true,
            create_calls: 0,
            destroy_calls: 0,
            suggest_calls: 0,
        }
    }
}

static STATE: Mutex<MockState> = Mutex::new(MockState::new());

fn state() -> std::sync::MutexGuard<'static, MockState> {
    STATE.lock().unwrap_or_else(|p| p.into_inner())
}

/// モックランタイムの操作ハンドル
pub struct MockRuntime;

impl MockRuntime {
    /// 状態を初期値へ戻す（各テストの冒頭で呼ぶ）
    pub fn reset() {
        *state() = MockState::new();
    }

    /// パスをインターンしてハンドルを得る
    pub fn intern_path(path: &str) -> XrPath {
        let mut st = state();
        if let Some(pos) = st.paths.iter().position(|p| p == path) {
            return (pos + 1) as XrPath;
        }
        st.paths.push(path.to_string());
        st.paths.len() as XrPath
    }

    /// Vector2fクエリのベースライン値を設定
    pub fn set_vector2f(x: f32, y: f32) {
        let mut st = state();
        st.vec2f_x = x;
        st.vec2f_y = y;
    }

    /// Floatクエリのベースライン値を設定
    pub fn set_float(value: f32) {
        state().float_value = value;
    }

    pub fn set_create_result(result: XrResult) {
        state().create_result = result;
    }

    pub fn set_suggest_result(result: XrResult) {
        state().suggest_result = result;
    }

    pub fn set_state_result(result: XrResult) {
        state().state_result = result;
    }

    /// オプションのパス変換機能を提供するかどうか
    pub fn set_path_functions(path_to_string: bool, string_to_path: bool) {
        let mut st = state();
        st.provide_path_to_string = path_to_string;
        st.provide_string_to_path = string_to_path;
    }

    pub fn create_calls() -> u32 {
        state().create_calls
    }

    pub fn destroy_calls() -> u32 {
        state().destroy_calls
    }

    pub fn suggest_calls() -> u32 {
        state().suggest_calls
    }

    /// モックのGetInstanceProcAddr
    pub fn get_instance_proc_addr() -> PfnGetInstanceProcAddr {
        mock_get_instance_proc_addr
    }

    /// モックのCreateApiLayerInstance
    pub fn create_api_layer_instance() -> PfnCreateApiLayerInstance {
        mock_create_api_layer_instance
    }

    /// モックのdestroy関数（ポインタ比較用）
    pub fn destroy_fn_ptr() -> PfnVoidFunction {
        Some(unsafe {
            std::mem::transmute::<
                unsafe extern "system" fn(XrInstance) -> XrResult,
                unsafe extern "system" fn(),
            >(mock_destroy_instance)
        })
    }
}

unsafe extern "system" fn mock_get_instance_proc_addr(
    _instance: XrInstance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult {
    if name.is_null() || function.is_null() {
        return XR_ERROR_HANDLE_INVALID;
    }
    let name = CStr::from_ptr(name).to_string_lossy();
    let st = state();

    macro_rules! provide {
        ($f:expr) => {{
            *function = Some(std::mem::transmute::<_, unsafe extern "system" fn()>($f));
            return XR_SUCCESS;
        }};
    }

    match name.as_ref() {
        "xrDestroyInstance" => provide!(
            mock_destroy_instance as unsafe extern "system" fn(XrInstance) -> XrResult
        ),
        "xrPathToString" if st.provide_path_to_string => provide!(
            mock_path_to_string
                as unsafe extern "system" fn(
                    XrInstance,
                    XrPath,
                    u32,
                    *mut u32,
                    *mut c_char,
                ) -> XrResult
        ),
        "xrStringToPath" if st.provide_string_to_path => provide!(
            mock_string_to_path
                as unsafe extern "system" fn(XrInstance, *const c_char, *mut XrPath) -> XrResult
        ),
        "xrSuggestInteractionProfileBindings" => provide!(
            mock_suggest_bindings
                as unsafe extern "system" fn(
                    XrInstance,
                    *const XrInteractionProfileSuggestedBinding,
                ) -> XrResult
        ),
        "xrGetActionStateVector2f" => provide!(
            mock_get_action_state_vector2f
                as unsafe extern "system" fn(
                    XrSession,
                    *const XrActionStateGetInfo,
                    *mut XrActionStateVector2f,
                ) -> XrResult
        ),
        "xrGetActionStateFloat" => provide!(
            mock_get_action_state_float
                as unsafe extern "system" fn(
                    XrSession,
                    *const XrActionStateGetInfo,
                    *mut XrActionStateFloat,
                ) -> XrResult
        ),
        _ => {
            *function = None;
            XR_ERROR_FUNCTION_UNSUPPORTED
        }
    }
}

unsafe extern "system" fn mock_create_api_layer_instance(
    _info: *const XrInstanceCreateInfo,
    _layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult {
    let mut st = state();
    st.create_calls += 1;
    if st.create_result != XR_SUCCESS {
        return st.create_result;
    }
    if instance.is_null() {
        return XR_ERROR_HANDLE_INVALID;
    }
    *instance = MOCK_INSTANCE_HANDLE;
    XR_SUCCESS
}

unsafe extern "system" fn mock_destroy_instance(_instance: XrInstance) -> XrResult {
    state().destroy_calls += 1;
    XR_SUCCESS
}

unsafe extern "system" fn mock_path_to_string(
    _instance: XrInstance,
    path: XrPath,
    buffer_capacity_input: u32,
    buffer_count_output: *mut u32,
    buffer: *mut c_char,
) -> XrResult {
    let st = state();
    let Some(text) = st.paths.get((path as usize).wrapping_sub(1)) else {
        return XR_ERROR_HANDLE_INVALID;
    };
    let needed = text.len() + 1;
    if !buffer_count_output.is_null() {
        *buffer_count_output = needed as u32;
    }
    if buffer.is_null() || (buffer_capacity_input as usize) < needed {
        return XR_ERROR_HANDLE_INVALID;
    }
    std::ptr::copy_nonoverlapping(text.as_ptr(), buffer as *mut u8, text.len());
    *buffer.add(text.len()) = 0;
    XR_SUCCESS
}

unsafe extern "system" fn mock_string_to_path(
    _instance: XrInstance,
    path_string: *const c_char,
    path: *mut XrPath,
) -> XrResult {
    if path_string.is_null() || path.is_null() {
        return XR_ERROR_HANDLE_INVALID;
    }
    let text = CStr::from_ptr(path_string).to_string_lossy().into_owned();
    *path = MockRuntime::intern_path(&text);
    XR_SUCCESS
}

unsafe extern "system" fn mock_suggest_bindings(
    _instance: XrInstance,
    suggested_bindings: *const XrInteractionProfileSuggestedBinding,
) -> XrResult {
    if suggested_bindings.is_null() {
        return XR_ERROR_HANDLE_INVALID;
    }
    let mut st = state();
    st.suggest_calls += 1;
    st.suggest_result
}

unsafe extern "system" fn mock_get_action_state_vector2f(
    _session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state_out: *mut XrActionStateVector2f,
) -> XrResult {
    if get_info.is_null() || state_out.is_null() {
        return XR_ERROR_HANDLE_INVALID;
    }
    let st = state();
    if st.state_result != XR_SUCCESS {
        return st.state_result;
    }
    let out = &mut *state_out;
    out.ty = XR_TYPE_ACTION_STATE_VECTOR2F;
    out.current_state.x = st.vec2f_x;
    out.current_state.y = st.vec2f_y;
    out.changed_since_last_sync = XR_FALSE;
    out.last_change_time = 0;
    out.is_active = XR_FALSE;
    XR_SUCCESS
}

unsafe extern "system" fn mock_get_action_state_float(
    _session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state_out: *mut XrActionStateFloat,
) -> XrResult {
    if get_info.is_null() || state_out.is_null() {
        return XR_ERROR_HANDLE_INVALID;
    }
    let st = state();
    if st.state_result != XR_SUCCESS {
        return st.state_result;
    }
    let out = &mut *state_out;
    out.ty = XR_TYPE_ACTION_STATE_FLOAT;
    out.current_state = st.float_value;
    out.changed_since_last_sync = XR_FALSE;
    out.last_change_time = 0;
    out.is_active = XR_FALSE;
    XR_SUCCESS
}
