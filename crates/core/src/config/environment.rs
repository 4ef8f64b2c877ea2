use std::env;

/// 读取布尔型环境变量：支持 true/false/1/0（大小写不敏感）
pub fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => {
            let v = v.trim();
            v.eq_ignore_ascii_case("true") || v == "1"
        }
        Err(_) => default,
    }
}

/// 读取字符串环境变量，若不存在则返回默认值
pub fn env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) => v,
        Err(_) => default.to_string(),
    }
}

/// 读取 i64 环境变量，不存在或解析失败返回默认值
pub fn env_i64(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(v) => v.trim().parse::<i64>().ok().unwrap_or(default),
        Err(_) => default,
    }
}

/// 读取 usize 环境变量，不存在或解析失败返回默认值
pub fn env_usize(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_missing() {
        assert_eq!(env_i64("POLYFUND_TEST_NOT_SET", 42), 42);
        assert_eq!(env_or_default("POLYFUND_TEST_NOT_SET", "x"), "x");
        assert!(env_bool("POLYFUND_TEST_NOT_SET", true));
    }

    #[test]
    fn parses_set_values() {
        std::env::set_var("POLYFUND_TEST_I64", " 7 ");
        assert_eq!(env_i64("POLYFUND_TEST_I64", 0), 7);
        std::env::set_var("POLYFUND_TEST_BOOL", "TRUE");
        assert!(env_bool("POLYFUND_TEST_BOOL", false));
    }
}
