//! ディスパッチ層（FFI境界）
//!
//! ローダー/ホストから直接呼ばれるextern "system"関数群。
//! ここでは生ポインタの検証と構造体の読み書きのみを行い、
//! 判断ロジックはすべてLayerContext（application/context.rs）へ委譲する。
//!
//! インターセプト対象は5つのエントリポイント:
//! xrGetInstanceProcAddr / xrDestroyInstance /
//! xrSuggestInteractionProfileBindings /
//! xrGetActionStateVector2f / xrGetActionStateFloat

use std::ffi::{c_char, CStr};
use std::sync::{Arc, Mutex, OnceLock};

use crate::application::context::{
    current_context, install_context, take_context, LayerContext,
};
use crate::application::negotiation;
use crate::domain::config::LayerConfig;
use crate::domain::ports::{PathResolver, VelocitySource};
use crate::domain::types::{inject_axis, LEFT_HAND_PATH};
use crate::infrastructure::chain::NextChain;
use crate::infrastructure::xr_ffi::{
    xr_failed, PfnVoidFunction, XrActionStateFloat, XrActionStateGetInfo,
    XrActionStateVector2f, XrApiLayerCreateInfo, XrInstance, XrInstanceCreateInfo,
    XrInteractionProfileSuggestedBinding, XrNegotiateApiLayerRequest, XrNegotiateLoaderInfo,
    XrResult, XrSession, LAYER_NAME, XR_ERROR_HANDLE_INVALID,
    XR_ERROR_INITIALIZATION_FAILED, XR_SUCCESS, XR_TRUE,
};

/// プロセス内で一度だけ読まれるレイヤー設定
fn layer_config() -> &'static LayerConfig {
    static CONFIG: OnceLock<LayerConfig> = OnceLock::new();
    CONFIG.get_or_init(LayerConfig::load_or_default)
}

/// テスト用: 次のインスタンス生成で使う速度ソースの差し替えスロット
///
/// 未設定ならプラットフォーム既定（Windowsでは共有メモリチャネル）。
static VELOCITY_OVERRIDE: Mutex<Option<Box<dyn VelocitySource>>> = Mutex::new(None);

#[doc(hidden)]
pub fn override_velocity_source(source: Box<dyn VelocitySource>) {
    *VELOCITY_OVERRIDE.lock().unwrap_or_else(|p| p.into_inner()) = Some(source);
}

/// インスタンス生成に使う速度ソースを選択する
fn select_velocity_source(config: &LayerConfig) -> Box<dyn VelocitySource> {
    if let Some(source) = VELOCITY_OVERRIDE
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .take()
    {
        return source;
    }
    #[cfg(windows)]
    {
        let source = crate::infrastructure::shared_memory::SharedMemoryVelocitySource::new(
            &config.channel.shared_memory_name,
            config.reopen_cooldown(),
        );
        source.open_now();
        Box::new(source)
    }
    #[cfg(not(windows))]
    {
        let _ = config;
        // 共有メモリチャネルはWindows専用。他プラットフォームでは
        // 常に速度0のモックで縮退動作する。
        Box::new(crate::infrastructure::mock_velocity::MockVelocityAdapter::default())
    }
}

// ─── ローダー交渉（エクスポートされる唯一のエントリポイント） ──

/// OpenXRローダーが呼ぶ交渉エントリポイント
///
/// # Safety
/// ローダー契約に従った構造体ポインタが渡されること。
/// NULLは検証して拒否する。
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn xrNegotiateLoaderApiLayerInterface(
    loader_info: *const XrNegotiateLoaderInfo,
    layer_name: *const c_char,
    api_layer_request: *mut XrNegotiateApiLayerRequest,
) -> XrResult {
    // 設定読み込み → ログ初期化（どちらもベストエフォート）
    let config = layer_config();
    crate::logging::init_layer_logging(&config.log.level);

    tracing::info!("=== {LAYER_NAME} loaded ===");

    if loader_info.is_null() || layer_name.is_null() || api_layer_request.is_null() {
        tracing::error!("Negotiation rejected: null parameter");
        return XR_ERROR_INITIALIZATION_FAILED;
    }

    let name = CStr::from_ptr(layer_name).to_string_lossy();
    tracing::info!("Negotiating for layer '{name}'");

    negotiation::negotiate(&*loader_info, &mut *api_layer_request)
}

// ─── xrCreateApiLayerInstance オーバーライド ───────────────

/// チェーンビルダー
///
/// 次リンクの検証 → 1リンク進めたcreate-infoで次のcreateを呼ぶ →
/// 成功時のみディスパッチテーブルと左手パスを解決してコンテキストを設置。
/// 次createの失敗はローカル状態を残さず無改変で伝播する。
///
/// # Safety
/// ローダーが呼ぶ前提。ポインタは検証してから参照する。
pub unsafe extern "system" fn treadmill_create_api_layer_instance(
    info: *const XrInstanceCreateInfo,
    layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult {
    tracing::info!("xrCreateApiLayerInstance entered");

    if info.is_null() || layer_info.is_null() || instance.is_null() {
        tracing::error!("  null parameter");
        return XR_ERROR_INITIALIZATION_FAILED;
    }

    let next_info = (*layer_info).next_info;
    if next_info.is_null() {
        tracing::error!("  nextInfo is null");
        return XR_ERROR_INITIALIZATION_FAILED;
    }

    let (Some(next_gipa), Some(next_create)) = (
        (*next_info).next_get_instance_proc_addr,
        (*next_info).next_create_api_layer_instance,
    ) else {
        tracing::error!("  next function pointers are null");
        return XR_ERROR_INITIALIZATION_FAILED;
    };

    // create-infoのコピーを1リンク先へ進める
    let mut next_layer_info = std::ptr::read(layer_info);
    next_layer_info.next_info = (*next_info).next;

    tracing::info!("  chaining to next layer/runtime...");
    let result = next_create(info, &next_layer_info, instance);
    if xr_failed(result) {
        tracing::error!("  chained create returned {result}");
        return result;
    }

    // ここから先の解決失敗はすべてソフト障害:
    // インスタンスは既にホスト側に存在し、暗黙に破棄してはならない。
    let created = *instance;
    tracing::info!("  instance created: {created:#x}");

    let chain = NextChain::resolve(next_gipa, created);

    let left_hand_path = chain.resolver_for(created).string_to_path(LEFT_HAND_PATH);
    match left_hand_path {
        Some(path) => tracing::info!("  left hand path resolved: {path}"),
        None => tracing::warn!("  left hand path not resolved; injecting regardless of hand"),
    }

    let config = layer_config();
    let velocity = select_velocity_source(config);

    install_context(Arc::new(LayerContext::new(
        created,
        chain,
        left_hand_path,
        velocity,
        config.injection.fallback_before_bindings,
    )));

    tracing::info!("  layer initialization complete");
    XR_SUCCESS
}

// ─── xrGetInstanceProcAddr オーバーライド ──────────────────

macro_rules! return_override {
    ($slot:expr, $f:expr) => {{
        *$slot = Some(std::mem::transmute::<_, unsafe extern "system" fn()>($f));
        return XR_SUCCESS;
    }};
}

/// 関数名ディスパッチ
///
/// インターセプト対象の5名は厳密な文字列一致で自身のオーバーライドを返し、
/// それ以外は次リンクへ転送する。
///
/// # Safety
/// `name` / `function` はホストが保証する有効ポインタ。NULLは検証する。
pub unsafe extern "system" fn treadmill_get_instance_proc_addr(
    instance: XrInstance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult {
    if name.is_null() || function.is_null() {
        return XR_ERROR_HANDLE_INVALID;
    }

    match CStr::from_ptr(name).to_bytes() {
        b"xrGetInstanceProcAddr" => return_override!(
            function,
            treadmill_get_instance_proc_addr
                as unsafe extern "system" fn(
                    XrInstance,
                    *const c_char,
                    *mut PfnVoidFunction,
                ) -> XrResult
        ),
        b"xrDestroyInstance" => return_override!(
            function,
            treadmill_destroy_instance as unsafe extern "system" fn(XrInstance) -> XrResult
        ),
        b"xrSuggestInteractionProfileBindings" => return_override!(
            function,
            treadmill_suggest_interaction_profile_bindings
                as unsafe extern "system" fn(
                    XrInstance,
                    *const XrInteractionProfileSuggestedBinding,
                ) -> XrResult
        ),
        b"xrGetActionStateVector2f" => return_override!(
            function,
            treadmill_get_action_state_vector2f
                as unsafe extern "system" fn(
                    XrSession,
                    *const XrActionStateGetInfo,
                    *mut XrActionStateVector2f,
                ) -> XrResult
        ),
        b"xrGetActionStateFloat" => return_override!(
            function,
            treadmill_get_action_state_float
                as unsafe extern "system" fn(
                    XrSession,
                    *const XrActionStateGetInfo,
                    *mut XrActionStateFloat,
                ) -> XrResult
        ),
        _ => {}
    }

    match current_context() {
        Some(context) => context.chain().forward_get_proc(instance, name, function),
        None => {
            *function = None;
            XR_ERROR_HANDLE_INVALID
        }
    }
}

// ─── xrDestroyInstance オーバーライド ──────────────────────

/// インスタンス破棄
///
/// 速度チャネルを閉じ、追跡状態を完全リセットし、コンテキストを
/// スロットから外してから次リンクのdestroyへ転送する。
///
/// # Safety
/// ホストが呼ぶ前提。
pub unsafe extern "system" fn treadmill_destroy_instance(instance: XrInstance) -> XrResult {
    tracing::info!("xrDestroyInstance");

    let Some(context) = take_context() else {
        return XR_ERROR_HANDLE_INVALID;
    };

    if context.instance() != instance {
        tracing::warn!(
            "  handle mismatch: expected {:#x}, got {instance:#x}",
            context.instance()
        );
    }

    context.reset();
    context.chain().forward_destroy(instance)
}

// ─── xrSuggestInteractionProfileBindings オーバーライド ────

/// バインディング分類
///
/// まず無改変で転送し、成功した場合のみ(action, binding)ペアを走査して
/// 左サムスティック系バインディングを追跡集合へ記録する。
///
/// # Safety
/// `suggested_bindings` はホストが渡したポインタ。参照前に検証する。
pub unsafe extern "system" fn treadmill_suggest_interaction_profile_bindings(
    instance: XrInstance,
    suggested_bindings: *const XrInteractionProfileSuggestedBinding,
) -> XrResult {
    tracing::info!("xrSuggestInteractionProfileBindings called");

    let Some(context) = current_context() else {
        return XR_ERROR_HANDLE_INVALID;
    };

    // 転送が先。失敗したら何も分類せず無改変で返す。
    let result = context
        .chain()
        .forward_suggest_bindings(instance, suggested_bindings);
    if xr_failed(result) {
        tracing::warn!("  chained call failed: {result}");
        return result;
    }

    if suggested_bindings.is_null() {
        return result;
    }
    let suggested = &*suggested_bindings;
    if suggested.suggested_bindings.is_null() || suggested.count_suggested_bindings == 0 {
        return result;
    }

    let pairs = std::slice::from_raw_parts(
        suggested.suggested_bindings,
        suggested.count_suggested_bindings as usize,
    );

    let resolver = context.chain().resolver_for(instance);
    context.classify_suggested(&resolver, pairs.iter().map(|pair| (pair.action, pair.binding)));

    result
}

// ─── xrGetActionStateVector2f オーバーライド ───────────────

/// Vector2f状態クエリ
///
/// 転送 → 失敗なら無改変で返す → 注入判定 → Y成分へ加算クランプし、
/// active/changedフラグを強制的に立てる。
///
/// # Safety
/// `get_info` / `state` はホストが渡したポインタ。参照前に検証する。
pub unsafe extern "system" fn treadmill_get_action_state_vector2f(
    session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state: *mut XrActionStateVector2f,
) -> XrResult {
    let Some(context) = current_context() else {
        return XR_ERROR_HANDLE_INVALID;
    };

    let result = context
        .chain()
        .forward_get_action_state_vector2f(session, get_info, state);
    if xr_failed(result) || get_info.is_null() || state.is_null() {
        return result;
    }

    let info = &*get_info;
    if let Some(velocity) = context.vector2f_injection(info.action, info.subaction_path) {
        let state = &mut *state;
        state.current_state.y = inject_axis(state.current_state.y, velocity);
        state.is_active = XR_TRUE;
        state.changed_since_last_sync = XR_TRUE;

        #[cfg(feature = "verbose-dispatch")]
        tracing::trace!(
            "vector2f injected: action={:#x} y={}",
            info.action,
            state.current_state.y
        );
    }

    result
}

// ─── xrGetActionStateFloat オーバーライド ──────────────────

/// Float状態クエリ
///
/// Vector2fと同じ転送・フィルタ規則。注入はY軸バインディングとして
/// 分類済みのアクションに限る。
///
/// # Safety
/// `get_info` / `state` はホストが渡したポインタ。参照前に検証する。
pub unsafe extern "system" fn treadmill_get_action_state_float(
    session: XrSession,
    get_info: *const XrActionStateGetInfo,
    state: *mut XrActionStateFloat,
) -> XrResult {
    let Some(context) = current_context() else {
        return XR_ERROR_HANDLE_INVALID;
    };

    let result = context
        .chain()
        .forward_get_action_state_float(session, get_info, state);
    if xr_failed(result) || get_info.is_null() || state.is_null() {
        return result;
    }

    let info = &*get_info;
    if let Some(velocity) = context.float_injection(info.action, info.subaction_path) {
        let state = &mut *state;
        state.current_state = inject_axis(state.current_state, velocity);
        state.is_active = XR_TRUE;
        state.changed_since_last_sync = XR_TRUE;

        #[cfg(feature = "verbose-dispatch")]
        tracing::trace!(
            "float injected: action={:#x} value={}",
            info.action,
            state.current_state
        );
    }

    result
}
