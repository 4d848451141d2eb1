//! ローダー交渉（Application層）
//!
//! ローダーが提示するインターフェースバージョン範囲を検証し、
//! このレイヤーのオーバーライド関数をリクエスト構造体へ書き込む。
//! ポインタのNULL検証はFFI境界（dispatch）側で済ませてあり、
//! ここは参照のみを扱う検証ロジック。

use crate::application::dispatch;
use crate::infrastructure::xr_ffi::{
    XrNegotiateApiLayerRequest, XrNegotiateLoaderInfo, XrResult,
    LAYER_INTERFACE_VERSION, XR_CURRENT_API_VERSION, XR_ERROR_INITIALIZATION_FAILED,
    XR_LOADER_INTERFACE_STRUCT_LOADER_INFO, XR_SUCCESS,
};

/// 交渉を実行する
///
/// 成功条件: 構造体タグがLOADER_INFOで、ローダーのバージョン範囲が
/// バージョン1を含むこと。失敗時はリクエスト構造体に触れない。
pub fn negotiate(
    loader_info: &XrNegotiateLoaderInfo,
    request: &mut XrNegotiateApiLayerRequest,
) -> XrResult {
    tracing::info!(
        "Loader info: structType={} minIface={} maxIface={}",
        loader_info.struct_type,
        loader_info.min_interface_version,
        loader_info.max_interface_version
    );

    if loader_info.struct_type != XR_LOADER_INTERFACE_STRUCT_LOADER_INFO {
        tracing::error!("Negotiation rejected: wrong structType");
        return XR_ERROR_INITIALIZATION_FAILED;
    }

    if loader_info.min_interface_version > LAYER_INTERFACE_VERSION
        || loader_info.max_interface_version < LAYER_INTERFACE_VERSION
    {
        tracing::error!("Negotiation rejected: interface version mismatch");
        return XR_ERROR_INITIALIZATION_FAILED;
    }

    request.layer_interface_version = LAYER_INTERFACE_VERSION;
    request.layer_api_version = XR_CURRENT_API_VERSION;
    request.get_instance_proc_addr = Some(dispatch::treadmill_get_instance_proc_addr);
    request.create_api_layer_instance = Some(dispatch::treadmill_create_api_layer_instance);

    tracing::info!("Negotiation OK");
    XR_SUCCESS
}
