use chrono::Utc;

/// 当前UTC时间的纳秒时间戳，用作订单nonce
pub fn nanos_now() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
