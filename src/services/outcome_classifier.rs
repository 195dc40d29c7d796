//! 打卡结果判定 - 业务能力层
//!
//! 门户的成功页没有稳定的机器可读标记，只能对可见文本做关键词匹配。
//! 这是已知的薄弱点：关键词列表可配置，匹配规则保持与现有行为一致。

use crate::config::Config;
use crate::services::html_scan::visible_text;

/// 内置成功关键词（西语/英语），按顺序优先于失败关键词
pub const DEFAULT_SUCCESS_KEYWORDS: [&str; 7] = [
    "éxito",
    "registrado",
    "completado",
    "success",
    "completed",
    "entrada",
    "salida",
];

/// 内置失败关键词
pub const DEFAULT_FAILURE_KEYWORDS: [&str; 5] =
    ["error", "fallo", "problema", "failed", "incorrect"];

/// 判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 命中成功关键词
    Success,
    /// 命中失败关键词
    Failure,
    /// 都未命中，按默认策略处理
    Undetermined,
}

/// 关键词分类器
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    success_keywords: Vec<String>,
    failure_keywords: Vec<String>,
    /// 都未命中时是否视为成功
    default_success: bool,
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_SUCCESS_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_FAILURE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            true,
        )
    }
}

impl OutcomeClassifier {
    pub fn new(
        success_keywords: Vec<String>,
        failure_keywords: Vec<String>,
        default_success: bool,
    ) -> Self {
        Self {
            success_keywords: success_keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            failure_keywords: failure_keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            default_success,
        }
    }

    /// 配置中给出的关键词覆盖内置列表，未给出的沿用内置
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self::new(
            if config.success_keywords.is_empty() {
                defaults.success_keywords
            } else {
                config.success_keywords.clone()
            },
            if config.failure_keywords.is_empty() {
                defaults.failure_keywords
            } else {
                config.failure_keywords.clone()
            },
            defaults.default_success,
        )
    }

    pub fn verdict(&self, html: &str) -> Verdict {
        let text = visible_text(html).to_lowercase();
        if self.success_keywords.iter().any(|k| text.contains(k.as_str())) {
            Verdict::Success
        } else if self.failure_keywords.iter().any(|k| text.contains(k.as_str())) {
            Verdict::Failure
        } else {
            Verdict::Undetermined
        }
    }

    /// 返回 (是否成功, 说明)
    pub fn classify(&self, html: &str) -> (bool, String) {
        match self.verdict(html) {
            Verdict::Success => (true, "考勤标记成功".to_string()),
            Verdict::Failure => (false, "考勤标记失败".to_string()),
            Verdict::Undetermined => (self.default_success, "考勤请求已处理".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_keywords_win() {
        let classifier = OutcomeClassifier::default();
        let html = "<h2>Marca REGISTRADO</h2><p>sin error</p>";
        assert_eq!(classifier.verdict(html), Verdict::Success);
        assert!(classifier.classify(html).0);
    }

    #[test]
    fn test_failure_keywords() {
        let classifier = OutcomeClassifier::default();
        let (success, message) = classifier.classify("<p>Ocurrió un Error</p>");
        assert!(!success);
        assert_eq!(message, "考勤标记失败");
    }

    #[test]
    fn test_optimistic_default() {
        let classifier = OutcomeClassifier::default();
        assert_eq!(classifier.verdict("<p>Gracias</p>"), Verdict::Undetermined);
        assert!(classifier.classify("<p>Gracias</p>").0);

        let strict = OutcomeClassifier::new(vec!["ok".into()], vec!["ko".into()], false);
        assert!(!strict.classify("<p>Gracias</p>").0);
    }

    #[test]
    fn test_accented_keyword_matches_entity() {
        let classifier = OutcomeClassifier::default();
        assert_eq!(
            classifier.verdict("<p>Operaci&oacute;n con &Eacute;XITO</p>"),
            Verdict::Success
        );
    }

    #[test]
    fn test_config_overrides() {
        let config = Config {
            success_keywords: vec!["marcado".into()],
            ..Config::default()
        };
        let classifier = OutcomeClassifier::from_config(&config);
        assert_eq!(classifier.verdict("<p>entrada</p>"), Verdict::Undetermined);
        assert_eq!(classifier.verdict("<p>Marcado</p>"), Verdict::Success);
        assert_eq!(classifier.verdict("<p>error</p>"), Verdict::Failure);
    }
}
