//! レイヤー統合テスト
//!
//! モックランタイム（infrastructure::mock_runtime）を次リンクに据えて、
//! 交渉 → チェーン構築 → バインディング分類 → フレーム毎クエリ → 破棄の
//! 全ライフサイクルを実際のFFI境界越しに検証する。
//!
//! レイヤーコンテキストとモックランタイムはプロセスグローバルなため、
//! 全テストをTEST_LOCKで直列化する。

use std::ffi::c_char;
use std::sync::{Arc, Mutex, MutexGuard};

use treadmill_layer::application::context::take_context;
use treadmill_layer::application::dispatch::{
    override_velocity_source, xrNegotiateLoaderApiLayerInterface,
};
use treadmill_layer::domain::ports::VelocitySource;
use treadmill_layer::infrastructure::mock_runtime::{MockRuntime, MOCK_INSTANCE_HANDLE};
use treadmill_layer::infrastructure::mock_velocity::MockVelocityAdapter;
use treadmill_layer::infrastructure::xr_ffi::{
    PfnCreateApiLayerInstance, PfnGetInstanceProcAddr, PfnVoidFunction, XrAction,
    XrActionStateFloat, XrActionStateGetInfo, XrActionStateVector2f, XrActionSuggestedBinding,
    XrApiLayerCreateInfo, XrApiLayerNextInfo, XrInstance, XrInstanceCreateInfo,
    XrInteractionProfileSuggestedBinding, XrNegotiateApiLayerRequest, XrNegotiateLoaderInfo,
    XrPath, XrResult, XR_CURRENT_API_VERSION, XR_ERROR_HANDLE_INVALID,
    XR_ERROR_INITIALIZATION_FAILED, XR_FALSE, XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO,
    XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO,
    XR_LOADER_INTERFACE_STRUCT_API_LAYER_REQUEST, XR_LOADER_INTERFACE_STRUCT_LOADER_INFO,
    XR_NULL_PATH, XR_SUCCESS, XR_TRUE, XR_TYPE_ACTION_STATE_FLOAT,
    XR_TYPE_ACTION_STATE_GET_INFO, XR_TYPE_ACTION_STATE_VECTOR2F,
    XR_TYPE_INTERACTION_PROFILE_SUGGESTED_BINDING,
};

static TEST_LOCK: Mutex<()> = Mutex::new(());

/// グローバル状態をリセットしてテストを直列化する
fn serialized() -> MutexGuard<'static, ()> {
    let guard = TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    MockRuntime::reset();
    let _ = take_context();
    guard
}

/// Arc共有可能な速度ソース（テスト中に値を差し替えるため）
#[derive(Clone)]
struct SharedVelocity(Arc<MockVelocityAdapter>);

impl SharedVelocity {
    fn new(velocity: f32) -> Self {
        Self(Arc::new(MockVelocityAdapter::with_velocity(velocity)))
    }

    fn set(&self, velocity: f32, active: bool) {
        self.0.set_record(velocity, active);
    }
}

impl VelocitySource for SharedVelocity {
    fn read_velocity(&self) -> f32 {
        self.0.read_velocity()
    }

    fn close(&self) {
        self.0.close();
    }
}

// ─── FFIヘルパー ──────────────────────────────────────────

fn loader_info() -> XrNegotiateLoaderInfo {
    XrNegotiateLoaderInfo {
        struct_type: XR_LOADER_INTERFACE_STRUCT_LOADER_INFO,
        struct_version: 1,
        struct_size: std::mem::size_of::<XrNegotiateLoaderInfo>(),
        min_interface_version: 1,
        max_interface_version: 1,
        min_api_version: XR_CURRENT_API_VERSION,
        max_api_version: XR_CURRENT_API_VERSION,
    }
}

fn empty_request() -> XrNegotiateApiLayerRequest {
    XrNegotiateApiLayerRequest {
        struct_type: XR_LOADER_INTERFACE_STRUCT_API_LAYER_REQUEST,
        struct_version: 1,
        struct_size: std::mem::size_of::<XrNegotiateApiLayerRequest>(),
        layer_interface_version: 0,
        layer_api_version: 0,
        get_instance_proc_addr: None,
        create_api_layer_instance: None,
    }
}

/// 交渉を実行してレイヤーのオーバーライド2関数を得る
fn negotiate_layer() -> (PfnGetInstanceProcAddr, PfnCreateApiLayerInstance) {
    let info = loader_info();
    let mut request = empty_request();
    let result = unsafe {
        xrNegotiateLoaderApiLayerInterface(&info, b"TREADMILL\0".as_ptr() as *const c_char, &mut request)
    };
    assert_eq!(result, XR_SUCCESS);
    (
        request.get_instance_proc_addr.expect("gipa"),
        request.create_api_layer_instance.expect("create"),
    )
}

fn next_info() -> XrApiLayerNextInfo {
    XrApiLayerNextInfo {
        struct_type: XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO,
        struct_version: 1,
        struct_size: std::mem::size_of::<XrApiLayerNextInfo>(),
        layer_name: [0; 256],
        next_get_instance_proc_addr: Some(MockRuntime::get_instance_proc_addr()),
        next_create_api_layer_instance: Some(MockRuntime::create_api_layer_instance()),
        next: std::ptr::null_mut(),
    }
}

fn layer_create_info(next: *mut XrApiLayerNextInfo) -> XrApiLayerCreateInfo {
    XrApiLayerCreateInfo {
        struct_type: XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO,
        struct_version: 1,
        struct_size: std::mem::size_of::<XrApiLayerCreateInfo>(),
        loader_instance: std::ptr::null_mut(),
        next_info_name: [0; 256],
        next_get_instance_proc_addr: None,
        next_info: next,
    }
}

/// レイヤー経由でインスタンスを生成する
fn create_instance(create: PfnCreateApiLayerInstance, velocity: &SharedVelocity) -> XrInstance {
    override_velocity_source(Box::new(velocity.clone()));

    let instance_info: XrInstanceCreateInfo = unsafe { std::mem::zeroed() };
    let mut next = next_info();
    let layer_info = layer_create_info(&mut next);
    let mut instance: XrInstance = 0;

    let result = unsafe { create(&instance_info, &layer_info, &mut instance) };
    assert_eq!(result, XR_SUCCESS);
    assert_eq!(instance, MOCK_INSTANCE_HANDLE);
    instance
}

fn lookup(gipa: PfnGetInstanceProcAddr, name: &[u8]) -> PfnVoidFunction {
    assert!(name.ends_with(b"\0"));
    let mut pfn: PfnVoidFunction = None;
    let result =
        unsafe { gipa(MOCK_INSTANCE_HANDLE, name.as_ptr() as *const c_char, &mut pfn) };
    assert_eq!(result, XR_SUCCESS);
    pfn
}

/// レイヤーのsuggestオーバーライドを呼ぶ
fn suggest_bindings(gipa: PfnGetInstanceProcAddr, pairs: &[(XrAction, &str)]) -> XrResult {
    let pfn = lookup(gipa, b"xrSuggestInteractionProfileBindings\0").expect("suggest pfn");
    let suggest: unsafe extern "system" fn(
        XrInstance,
        *const XrInteractionProfileSuggestedBinding,
    ) -> XrResult = unsafe { std::mem::transmute(pfn) };

    let bindings: Vec<XrActionSuggestedBinding> = pairs
        .iter()
        .map(|(action, path)| XrActionSuggestedBinding {
            action: *action,
            binding: MockRuntime::intern_path(path),
        })
        .collect();
    let suggested = XrInteractionProfileSuggestedBinding {
        ty: XR_TYPE_INTERACTION_PROFILE_SUGGESTED_BINDING,
        next: std::ptr::null(),
        interaction_profile: MockRuntime::intern_path("/interaction_profiles/test/controller"),
        count_suggested_bindings: bindings.len() as u32,
        suggested_bindings: bindings.as_ptr(),
    };

    unsafe { suggest(MOCK_INSTANCE_HANDLE, &suggested) }
}

/// レイヤーのVector2fオーバーライドを呼ぶ
fn query_vector2f(
    gipa: PfnGetInstanceProcAddr,
    action: XrAction,
    subaction: XrPath,
) -> (XrResult, XrActionStateVector2f) {
    let pfn = lookup(gipa, b"xrGetActionStateVector2f\0").expect("vector2f pfn");
    let query: unsafe extern "system" fn(
        u64,
        *const XrActionStateGetInfo,
        *mut XrActionStateVector2f,
    ) -> XrResult = unsafe { std::mem::transmute(pfn) };

    let get_info = XrActionStateGetInfo {
        ty: XR_TYPE_ACTION_STATE_GET_INFO,
        next: std::ptr::null(),
        action,
        subaction_path: subaction,
    };
    let mut state: XrActionStateVector2f = unsafe { std::mem::zeroed() };
    state.ty = XR_TYPE_ACTION_STATE_VECTOR2F;

    let result = unsafe { query(1, &get_info, &mut state) };
    (result, state)
}

/// レイヤーのFloatオーバーライドを呼ぶ
fn query_float(
    gipa: PfnGetInstanceProcAddr,
    action: XrAction,
    subaction: XrPath,
) -> (XrResult, XrActionStateFloat) {
    let pfn = lookup(gipa, b"xrGetActionStateFloat\0").expect("float pfn");
    let query: unsafe extern "system" fn(
        u64,
        *const XrActionStateGetInfo,
        *mut XrActionStateFloat,
    ) -> XrResult = unsafe { std::mem::transmute(pfn) };

    let get_info = XrActionStateGetInfo {
        ty: XR_TYPE_ACTION_STATE_GET_INFO,
        next: std::ptr::null(),
        action,
        subaction_path: subaction,
    };
    let mut state: XrActionStateFloat = unsafe { std::mem::zeroed() };
    state.ty = XR_TYPE_ACTION_STATE_FLOAT;

    let result = unsafe { query(1, &get_info, &mut state) };
    (result, state)
}

fn destroy_instance(gipa: PfnGetInstanceProcAddr) -> XrResult {
    let pfn = lookup(gipa, b"xrDestroyInstance\0").expect("destroy pfn");
    let destroy: unsafe extern "system" fn(XrInstance) -> XrResult =
        unsafe { std::mem::transmute(pfn) };
    unsafe { destroy(MOCK_INSTANCE_HANDLE) }
}

// ─── テスト ───────────────────────────────────────────────

#[test]
fn test_negotiation_rejects_null_parameters() {
    let _guard = serialized();

    let info = loader_info();
    let mut request = empty_request();

    // 各引数のNULLは初期化失敗
    let result = unsafe {
        xrNegotiateLoaderApiLayerInterface(
            std::ptr::null(),
            b"TREADMILL\0".as_ptr() as *const c_char,
            &mut request,
        )
    };
    assert_eq!(result, XR_ERROR_INITIALIZATION_FAILED);

    let result = unsafe {
        xrNegotiateLoaderApiLayerInterface(&info, std::ptr::null(), &mut request)
    };
    assert_eq!(result, XR_ERROR_INITIALIZATION_FAILED);

    let result = unsafe {
        xrNegotiateLoaderApiLayerInterface(
            &info,
            b"TREADMILL\0".as_ptr() as *const c_char,
            std::ptr::null_mut(),
        )
    };
    assert_eq!(result, XR_ERROR_INITIALIZATION_FAILED);

    // リクエスト構造体は無改変のまま
    assert!(request.get_instance_proc_addr.is_none());
}

#[test]
fn test_create_requires_next_link() {
    let _guard = serialized();
    let (_gipa, create) = negotiate_layer();

    let instance_info: XrInstanceCreateInfo = unsafe { std::mem::zeroed() };
    let mut instance: XrInstance = 0;

    // nextInfoなし
    let layer_info = layer_create_info(std::ptr::null_mut());
    let result = unsafe { create(&instance_info, &layer_info, &mut instance) };
    assert_eq!(result, XR_ERROR_INITIALIZATION_FAILED);

    // 次リンクの関数ポインタ欠落
    let mut broken = next_info();
    broken.next_create_api_layer_instance = None;
    let layer_info = layer_create_info(&mut broken);
    let result = unsafe { create(&instance_info, &layer_info, &mut instance) };
    assert_eq!(result, XR_ERROR_INITIALIZATION_FAILED);

    // 失敗パスではコンテキストが作られていない
    assert!(take_context().is_none());
}

#[test]
fn test_failing_next_create_propagates_verbatim() {
    let _guard = serialized();
    let (_gipa, create) = negotiate_layer();

    MockRuntime::set_create_result(-2);

    let instance_info: XrInstanceCreateInfo = unsafe { std::mem::zeroed() };
    let mut next = next_info();
    let layer_info = layer_create_info(&mut next);
    let mut instance: XrInstance = 0;

    let result = unsafe { create(&instance_info, &layer_info, &mut instance) };
    // 次リンクのエラーコードが無改変で伝播する
    assert_eq!(result, -2);
    assert!(take_context().is_none());
}

#[test]
fn test_destroy_pointer_is_this_layers_override() {
    let _guard = serialized();
    let (gipa, create) = negotiate_layer();
    let velocity = SharedVelocity::new(0.0);
    create_instance(create, &velocity);

    // destroyのポインタは次リンクのものではなくこのレイヤーのオーバーライド
    let ours = lookup(gipa, b"xrDestroyInstance\0");
    assert!(ours.is_some());
    assert_ne!(
        ours.map(|f| f as usize),
        MockRuntime::destroy_fn_ptr().map(|f| f as usize)
    );

    destroy_instance(gipa);
}

#[test]
fn test_full_lifecycle_with_injection() {
    let _guard = serialized();
    let (gipa, create) = negotiate_layer();
    let velocity = SharedVelocity::new(0.4);
    create_instance(create, &velocity);

    let left_stick: XrAction = 10;
    let left_stick_y: XrAction = 11;
    let unclassified: XrAction = 99;

    // ── 学習前: フォールバックで未分類Vector2fにも注入 ──
    MockRuntime::set_vector2f(0.1, 0.2);
    let (result, state) = query_vector2f(gipa, unclassified, XR_NULL_PATH);
    assert_eq!(result, XR_SUCCESS);
    assert!((state.current_state.y - 0.6).abs() < 1e-6); // 0.2 + 0.4
    assert!((state.current_state.x - 0.1).abs() < 1e-6); // Xは無改変
    assert_eq!(state.is_active, XR_TRUE);
    assert_eq!(state.changed_since_last_sync, XR_TRUE);

    // 学習前でもFloatにはフォールバックなし
    MockRuntime::set_float(0.2);
    let (result, state) = query_float(gipa, left_stick_y, XR_NULL_PATH);
    assert_eq!(result, XR_SUCCESS);
    assert!((state.current_state - 0.2).abs() < 1e-6);
    assert_eq!(state.is_active, XR_FALSE);

    // ── バインディング分類 ──
    let result = suggest_bindings(
        gipa,
        &[
            (left_stick, "/user/hand/left/input/thumbstick"),
            (left_stick_y, "/user/hand/left/input/thumbstick/y"),
            (12, "/user/hand/left/input/thumbstick/x"),
            (13, "/user/hand/right/input/thumbstick"),
        ],
    );
    assert_eq!(result, XR_SUCCESS);
    assert_eq!(MockRuntime::suggest_calls(), 1);

    // ── 学習後: 集合外のアクションは無改変 ──
    let (_, state) = query_vector2f(gipa, unclassified, XR_NULL_PATH);
    assert!((state.current_state.y - 0.2).abs() < 1e-6);
    assert_eq!(state.is_active, XR_FALSE);

    // 右手バインディングのアクション(13)も注入されない
    let (_, state) = query_vector2f(gipa, 13, XR_NULL_PATH);
    assert!((state.current_state.y - 0.2).abs() < 1e-6);

    // 分類済みVectorアクションには注入
    let (_, state) = query_vector2f(gipa, left_stick, XR_NULL_PATH);
    assert!((state.current_state.y - 0.6).abs() < 1e-6);
    assert_eq!(state.is_active, XR_TRUE);

    // 左手サブアクション指定も注入対象
    let left_hand = MockRuntime::intern_path("/user/hand/left");
    let (_, state) = query_vector2f(gipa, left_stick, left_hand);
    assert!((state.current_state.y - 0.6).abs() < 1e-6);

    // 右手サブアクション指定は速度にかかわらず無改変
    let right_hand = MockRuntime::intern_path("/user/hand/right");
    let (_, state) = query_vector2f(gipa, left_stick, right_hand);
    assert!((state.current_state.y - 0.2).abs() < 1e-6);
    assert_eq!(state.is_active, XR_FALSE);

    // Y軸アクションへのFloat注入
    let (_, state) = query_float(gipa, left_stick_y, XR_NULL_PATH);
    assert!((state.current_state - 0.6).abs() < 1e-6);
    assert_eq!(state.is_active, XR_TRUE);

    // ── クランプ: 0.9 + 0.5 = 1.0 ──
    velocity.set(0.5, true);
    MockRuntime::set_vector2f(0.0, 0.9);
    let (_, state) = query_vector2f(gipa, left_stick, XR_NULL_PATH);
    assert_eq!(state.current_state.y, 1.0);

    // ── 速度0はパススルー ──
    velocity.set(0.0, true);
    let (_, state) = query_vector2f(gipa, left_stick, XR_NULL_PATH);
    assert!((state.current_state.y - 0.9).abs() < 1e-6);
    assert_eq!(state.is_active, XR_FALSE);

    // ── activeフラグ0もパススルー ──
    velocity.set(0.7, false);
    let (_, state) = query_vector2f(gipa, left_stick, XR_NULL_PATH);
    assert!((state.current_state.y - 0.9).abs() < 1e-6);

    // ── 破棄: チャネルを閉じ、次リンクへ転送 ──
    assert_eq!(destroy_instance(gipa), XR_SUCCESS);
    assert_eq!(MockRuntime::destroy_calls(), 1);
    assert!(velocity.0.is_closed());

    // ── 同一プロセスでの再生成はフォールバック動作から始まる ──
    let velocity2 = SharedVelocity::new(0.3);
    create_instance(create, &velocity2);
    MockRuntime::set_vector2f(0.0, 0.1);
    let (_, state) = query_vector2f(gipa, unclassified, XR_NULL_PATH);
    assert!((state.current_state.y - 0.4).abs() < 1e-6); // 0.1 + 0.3
    assert_eq!(state.is_active, XR_TRUE);

    destroy_instance(gipa);
}

#[test]
fn test_failed_forward_skips_classification() {
    let _guard = serialized();
    let (gipa, create) = negotiate_layer();
    let velocity = SharedVelocity::new(0.4);
    create_instance(create, &velocity);

    MockRuntime::set_suggest_result(XR_ERROR_HANDLE_INVALID);
    let result = suggest_bindings(gipa, &[(11, "/user/hand/left/input/thumbstick/y")]);
    // 転送は行われ、失敗がそのまま返る
    assert_eq!(result, XR_ERROR_HANDLE_INVALID);
    assert_eq!(MockRuntime::suggest_calls(), 1);

    // 何も分類されていない: Floatは注入されず、フォールバックも健在
    MockRuntime::set_float(0.1);
    let (_, state) = query_float(gipa, 11, XR_NULL_PATH);
    assert!((state.current_state - 0.1).abs() < 1e-6);

    MockRuntime::set_vector2f(0.0, 0.1);
    let (_, state) = query_vector2f(gipa, 99, XR_NULL_PATH);
    assert!((state.current_state.y - 0.5).abs() < 1e-6);

    destroy_instance(gipa);
}

#[test]
fn test_failed_state_query_short_circuits_injection() {
    let _guard = serialized();
    let (gipa, create) = negotiate_layer();
    let velocity = SharedVelocity::new(0.4);
    create_instance(create, &velocity);

    MockRuntime::set_state_result(XR_ERROR_HANDLE_INVALID);
    let (result, state) = query_vector2f(gipa, 99, XR_NULL_PATH);
    // 転送が失敗したら注入ロジックは走らず結果は無改変
    assert_eq!(result, XR_ERROR_HANDLE_INVALID);
    assert_eq!(state.current_state.y, 0.0);
    assert_eq!(state.is_active, XR_FALSE);

    destroy_instance(gipa);
}

#[test]
fn test_unknown_name_is_forwarded_or_unsupported() {
    let _guard = serialized();
    let (gipa, create) = negotiate_layer();
    let velocity = SharedVelocity::new(0.0);
    create_instance(create, &velocity);

    // モックランタイムが知らない名前は見つからない
    let mut pfn: PfnVoidFunction = None;
    let result = unsafe {
        gipa(
            MOCK_INSTANCE_HANDLE,
            b"xrEnumerateSwapchainFormats\0".as_ptr() as *const c_char,
            &mut pfn,
        )
    };
    assert_ne!(result, XR_SUCCESS);
    assert!(pfn.is_none());

    destroy_instance(gipa);
}
