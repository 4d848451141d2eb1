//! レイヤーチェーンアダプタ
//!
//! 次のレイヤー/ランタイムから捕捉したディスパッチテーブルを保持し、
//! 安全な転送メソッドの背後に隠す。テーブルはインスタンス生成時に
//! 一度だけ解決され、以後不変。
//!
//! オプション機能（xrPathToString / xrStringToPath）の欠落はソフト障害:
//! 対応するメソッドがNoneを返し、分類・サブアクションフィルタが縮退する。

use std::ffi::{c_char, CString};

use crate::domain::ports::PathResolver;
use crate::domain::types::PathKey;
use crate::infrastructure::xr_ffi::{
    xr_failed, PfnDestroyInstance, PfnGetActionStateFloat, PfnGetActionStateVector2f,
    PfnGetInstanceProcAddr, PfnPathToString, PfnStringToPath,
    PfnSuggestInteractionProfileBindings, PfnVoidFunction, XrActionStateFloat,
    XrActionStateGetInfo, XrActionStateVector2f, XrInstance,
    XrInteractionProfileSuggestedBinding, XrPath, XrResult, XrSession,
    XR_ERROR_FUNCTION_UNSUPPORTED, XR_NULL_PATH,
};

/// パス文字列変換バッファの上限（OpenXRのパス最大長に準拠）
const PATH_BUFFER_SIZE: usize = 256;

/// 次リンクのディスパッチテーブル
///
/// インスタンス毎に1つだけ存在し、生成後は不変。
/// destroy時にインスタンスと共に破棄される。
pub struct NextChain {
    next_get_instance_proc_addr: PfnGetInstanceProcAddr,
    destroy_instance: Option<PfnDestroyInstance>,
    path_to_string: Option<PfnPathToString>,
    string_to_path: Option<PfnStringToPath>,
    suggest_bindings: Option<PfnSuggestInteractionProfileBindings>,
    get_action_state_vector2f: Option<PfnGetActionStateVector2f>,
    get_action_state_float: Option<PfnGetActionStateFloat>,
}

impl NextChain {
    /// 次リンクのGetInstanceProcAddrから必要な関数ポインタを解決する
    ///
    /// 個々の解決失敗はソフト障害としてログに残すのみ
    /// （インスタンスは既にホスト側に存在しており、暗黙に破棄できない）。
    ///
    /// # Safety
    /// `next_gipa` は有効な次リンクのGetInstanceProcAddrであること。
    pub unsafe fn resolve(next_gipa: PfnGetInstanceProcAddr, instance: XrInstance) -> Self {
        let chain = Self {
            next_get_instance_proc_addr: next_gipa,
            destroy_instance: resolve_pfn(next_gipa, instance, b"xrDestroyInstance\0")
                .map(|f| std::mem::transmute::<unsafe extern "system" fn(), PfnDestroyInstance>(f)),
            path_to_string: resolve_pfn(next_gipa, instance, b"xrPathToString\0")
                .map(|f| std::mem::transmute::<unsafe extern "system" fn(), PfnPathToString>(f)),
            string_to_path: resolve_pfn(next_gipa, instance, b"xrStringToPath\0")
                .map(|f| std::mem::transmute::<unsafe extern "system" fn(), PfnStringToPath>(f)),
            suggest_bindings: resolve_pfn(next_gipa, instance, b"xrSuggestInteractionProfileBindings\0")
                .map(|f| {
                    std::mem::transmute::<unsafe extern "system" fn(), PfnSuggestInteractionProfileBindings>(f)
                }),
            get_action_state_vector2f: resolve_pfn(next_gipa, instance, b"xrGetActionStateVector2f\0")
                .map(|f| {
                    std::mem::transmute::<unsafe extern "system" fn(), PfnGetActionStateVector2f>(f)
                }),
            get_action_state_float: resolve_pfn(next_gipa, instance, b"xrGetActionStateFloat\0")
                .map(|f| {
                    std::mem::transmute::<unsafe extern "system" fn(), PfnGetActionStateFloat>(f)
                }),
        };

        if chain.destroy_instance.is_none() {
            tracing::warn!("xrDestroyInstance not resolved from next layer");
        }
        if chain.path_to_string.is_none() {
            tracing::warn!("xrPathToString not resolved; binding classification disabled");
        }
        if chain.string_to_path.is_none() {
            tracing::warn!("xrStringToPath not resolved; subaction filtering disabled");
        }

        chain
    }

    /// テスト用: 何も解決されていない空のテーブル
    #[doc(hidden)]
    pub fn unresolved(next_gipa: PfnGetInstanceProcAddr) -> Self {
        Self {
            next_get_instance_proc_addr: next_gipa,
            destroy_instance: None,
            path_to_string: None,
            string_to_path: None,
            suggest_bindings: None,
            get_action_state_vector2f: None,
            get_action_state_float: None,
        }
    }

    /// 未処理の関数名を次リンクへ転送する
    ///
    /// # Safety
    /// `name` と `function` は呼び出し元（ホスト）が保証する有効ポインタ。
    pub unsafe fn forward_get_proc(
        &self,
        instance: XrInstance,
        name: *const c_char,
        function: *mut PfnVoidFunction,
    ) -> XrResult {
        (self.next_get_instance_proc_addr)(instance, name, function)
    }

    /// 次リンクのxrDestroyInstanceへ転送する
    pub fn forward_destroy(&self, instance: XrInstance) -> XrResult {
        match self.destroy_instance {
            Some(pfn) => unsafe { pfn(instance) },
            None => XR_ERROR_FUNCTION_UNSUPPORTED,
        }
    }

    /// 次リンクのxrSuggestInteractionProfileBindingsへ無改変で転送する
    ///
    /// # Safety
    /// `suggested_bindings` はホストが渡した有効ポインタであること。
    pub unsafe fn forward_suggest_bindings(
        &self,
        instance: XrInstance,
        suggested_bindings: *const XrInteractionProfileSuggestedBinding,
    ) -> XrResult {
        match self.suggest_bindings {
            Some(pfn) => pfn(instance, suggested_bindings),
            None => XR_ERROR_FUNCTION_UNSUPPORTED,
        }
    }

    /// 次リンクのxrGetActionStateVector2fへ転送する
    ///
    /// # Safety
    /// `get_info` / `state` はホストが渡した有効ポインタであること。
    pub unsafe fn forward_get_action_state_vector2f(
        &self,
        session: XrSession,
        get_info: *const XrActionStateGetInfo,
        state: *mut XrActionStateVector2f,
    ) -> XrResult {
        match self.get_action_state_vector2f {
            Some(pfn) => pfn(session, get_info, state),
            None => XR_ERROR_FUNCTION_UNSUPPORTED,
        }
    }

    /// 次リンクのxrGetActionStateFloatへ転送する
    ///
    /// # Safety
    /// `get_info` / `state` はホストが渡した有効ポインタであること。
    pub unsafe fn forward_get_action_state_float(
        &self,
        session: XrSession,
        get_info: *const XrActionStateGetInfo,
        state: *mut XrActionStateFloat,
    ) -> XrResult {
        match self.get_action_state_float {
            Some(pfn) => pfn(session, get_info, state),
            None => XR_ERROR_FUNCTION_UNSUPPORTED,
        }
    }

    /// パス変換（XrPath -> 文字列）を行うインスタンスハンドル付きリゾルバ
    pub fn resolver_for(&self, instance: XrInstance) -> ChainPathResolver<'_> {
        ChainPathResolver { chain: self, instance }
    }
}

/// インスタンスハンドルを束ねたPathResolver実装
///
/// Domain層のPathResolver traitへ適合させるための薄いビュー。
pub struct ChainPathResolver<'a> {
    chain: &'a NextChain,
    instance: XrInstance,
}

impl PathResolver for ChainPathResolver<'_> {
    fn path_to_string(&self, path: PathKey) -> Option<String> {
        let pfn = self.chain.path_to_string?;
        let mut buffer = [0u8; PATH_BUFFER_SIZE];
        let mut written: u32 = 0;
        let result = unsafe {
            pfn(
                self.instance,
                path as XrPath,
                buffer.len() as u32,
                &mut written,
                buffer.as_mut_ptr() as *mut c_char,
            )
        };
        if xr_failed(result) || written == 0 {
            return None;
        }
        // writtenはNUL終端込みの文字数
        let len = (written as usize).saturating_sub(1).min(buffer.len());
        let text = String::from_utf8_lossy(&buffer[..len]).into_owned();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn string_to_path(&self, path: &str) -> Option<PathKey> {
        let pfn = self.chain.string_to_path?;
        let c_path = CString::new(path).ok()?;
        let mut out: XrPath = XR_NULL_PATH;
        let result = unsafe { pfn(self.instance, c_path.as_ptr(), &mut out) };
        if xr_failed(result) || out == XR_NULL_PATH {
            None
        } else {
            Some(out)
        }
    }
}

/// 次リンクから単一の関数ポインタを解決する
///
/// # Safety
/// `name` はNUL終端されたバイト列であること。
unsafe fn resolve_pfn(
    next_gipa: PfnGetInstanceProcAddr,
    instance: XrInstance,
    name: &'static [u8],
) -> Option<unsafe extern "system" fn()> {
    debug_assert!(name.ends_with(b"\0"));
    let mut pfn: PfnVoidFunction = None;
    let result = next_gipa(instance, name.as_ptr() as *const c_char, &mut pfn);
    if xr_failed(result) {
        return None;
    }
    pfn
}
