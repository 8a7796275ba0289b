/// Join two path fragments so exactly one `/` separates them.
pub fn single_joining_slash(a: &str, b: &str) -> String {
    let a_slash = a.ends_with('/');
    let b_slash = b.starts_with('/');
    match (a_slash, b_slash) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Map a request path onto the object key it is served from.
///
/// The prefix (if any) is joined in front of the path and one leading `/` is
/// stripped, since bucket keys carry no leading separator.
pub fn storage_key(prefix: &str, path: &str) -> String {
    let joined = if prefix.is_empty() {
        path.to_string()
    } else {
        single_joining_slash(prefix, path)
    };

    match joined.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => joined,
    }
}
