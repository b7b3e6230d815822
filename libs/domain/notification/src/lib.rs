// [libs/domain/notification/src/lib.rs]
/*! Sink-facing notification contract: message rendering and signing. */

pub mod message;
pub mod signing;

pub use message::{
    dingtalk_style_payload, feishu_payload, generic_webhook_payload, level_to_severity,
    AlertNotificationContext,
};
pub use signing::{dingtalk_signed_query, sign_dingtalk, SigningError};
