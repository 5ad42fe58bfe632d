//! Environment reference expansion for catalog patterns.

/// Replaces `%NAME%` and `${NAME}` references using `lookup`. References
/// that `lookup` cannot resolve are left untouched.
pub fn expand_env_refs(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    loop {
        let percent = rest.find('%');
        let brace = rest.find("${");
        let (start, closing, skip) = match (percent, brace) {
            (None, None) => break,
            (Some(p), Some(b)) if b < p => (b, "}", 2),
            (Some(p), _) => (p, "%", 1),
            (None, Some(b)) => (b, "}", 2),
        };

        out.push_str(&rest[..start]);
        let after = &rest[start + skip..];
        match after.find(closing) {
            Some(end) if is_var_name(&after[..end]) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + skip + end + closing.len()]),
                }
                rest = &after[end + closing.len()..];
            }
            _ => {
                out.push_str(&rest[start..start + skip]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expands against the real process environment.
pub fn expand_from_process(input: &str) -> String {
    expand_env_refs(input, |name| std::env::var(name).ok())
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')'))
}
