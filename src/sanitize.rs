/// Escape the characters the full-text query syntax reads as grouping
/// operators, so user text is matched literally.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '(' || c == ')' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// True if every paren in `s` is preceded by a backslash.
    fn all_parens_escaped(s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        chars
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '(' || **c == ')')
            .all(|(i, _)| i > 0 && chars[i - 1] == '\\')
    }

    #[test]
    fn test_escapes_parens() {
        assert_eq!(sanitize("foo (bar)"), r"foo \(bar\)");
    }

    #[test]
    fn test_leaves_other_text_alone() {
        assert_eq!(sanitize("Some.Release-GRP"), "Some.Release-GRP");
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("été | -x *"), "été | -x *");
    }

    #[test]
    fn test_no_unescaped_parens_remain() {
        for input in ["(", ")", "((", "a)b(c", "()()", r"\(", "x (y (z))"] {
            let out = sanitize(input);
            assert!(all_parens_escaped(&out), "{:?} -> {:?}", input, out);
        }
    }
}
