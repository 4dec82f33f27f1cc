pub fn is_target_script(ch: char) -> bool {
    matches!(ch as u32, 0x4E00..=0x9FFF)
}

/// Keeps only CJK Unified Ideographs; everything else is dropped.
pub fn filter_target_script(text: &str) -> String {
    text.chars().filter(|ch| is_target_script(*ch)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_unified_ideographs() {
        assert_eq!(filter_target_script("你好, world! 世界。"), "你好世界");
        assert_eq!(filter_target_script("一"), "一");
        assert_eq!(filter_target_script("\u{9FFF}\u{A000}"), "\u{9FFF}");
    }

    #[test]
    fn drops_kana_hangul_and_extension_a() {
        assert_eq!(filter_target_script("ひらがなカタカナ한국어\u{3400}"), "");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(filter_target_script(""), "");
    }
}
