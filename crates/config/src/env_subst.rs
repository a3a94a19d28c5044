/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// `${ENV_VAR:-fallback}` resolves to `fallback` when the variable is unset
/// or empty. Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace placeholders using a custom lookup function.
///
/// Split out from [`substitute_env`] so tests never touch the process
/// environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated placeholder, emit the remainder verbatim.
            result.push_str(&rest[start..]);
            return result;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        let resolved = if name.is_empty() {
            None
        } else {
            lookup(name).filter(|v| !v.is_empty() || fallback.is_none())
        };

        match (resolved, fallback) {
            (Some(value), _) => result.push_str(&value),
            (None, Some(fallback)) if !name.is_empty() => result.push_str(fallback),
            _ => {
                result.push_str("${");
                result.push_str(body);
                result.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}
