//! 有理数类型, 用于时间基 (time_base) 与帧率.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 例如: 时间基 1/1000 表示 FLV 的毫秒时钟, 1/10_000_000 表示 100ns 时钟.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 毫秒时间基 (1/1_000)
    pub const MILLI: Self = Self { num: 1, den: 1_000 };

    /// 100 纳秒时间基 (1/10_000_000), 起播位置使用此单位
    pub const HNS: Self = Self {
        num: 1,
        den: 10_000_000,
    };

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 转换为 f64, 分母为 0 时返回 `f64::NAN`
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_有效性() {
        assert!(Rational::MILLI.is_valid());
        assert!(!Rational::UNDEFINED.is_valid());
        assert!(Rational::UNDEFINED.to_f64().is_nan());
    }

    #[test]
    fn test_rational_显示() {
        assert_eq!(Rational::new(30000, 1001).to_string(), "30000/1001");
    }
}
