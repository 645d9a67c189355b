//! validation layer 的消息转发到 `log`

use std::ffi::CStr;

use ash::vk;

pub(crate) fn messenger_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR)
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(on_message))
}

unsafe extern "system" fn on_message(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    kind: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let raw = unsafe {
        match data.as_ref() {
            Some(data) if !data.p_message.is_null() => CStr::from_ptr(data.p_message).to_string_lossy(),
            _ => "".into(),
        }
    };
    let text = format_message(kind, &raw);

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("{text}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("{text}");
    } else {
        log::debug!("{text}");
    }

    // 返回 TRUE 会让触发消息的调用失败
    vk::FALSE
}

/// 部分 layer 输出 json，其中 `MainMessage` 带有换行，单独放在最后
fn format_message(kind: vk::DebugUtilsMessageTypeFlagsEXT, raw: &str) -> String {
    let Ok(serde_json::Value::Object(mut fields)) = serde_json::from_str::<serde_json::Value>(raw) else {
        return format!("[{kind:?}] {raw}");
    };

    let main = fields.remove("MainMessage");
    let rest = serde_json::to_string_pretty(&fields).unwrap_or_default();
    match main.as_ref().and_then(|v| v.as_str()) {
        Some(main) => format!("[{kind:?}]\n{rest}\n{main}"),
        None => format!("[{kind:?}]\n{rest}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_kept_on_one_line() {
        let text = format_message(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION, "vkCmdDraw: bad layout");
        assert_eq!(text, "[VALIDATION] vkCmdDraw: bad layout");
    }

    #[test]
    fn json_main_message_goes_last() {
        let raw = r#"{"MessageID": 7, "MainMessage": "line 1\nline 2"}"#;
        let text = format_message(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION, raw);
        assert!(text.ends_with("line 1\nline 2"));
        assert!(text.contains("\"MessageID\": 7"));
        assert!(!text.contains("MainMessage"));
    }
}
