/// Convert a snake_case name to PascalCase.
///
/// Each `_`-separated part gets its first character upper-cased; the parts are
/// then joined without separators. Empty input yields an empty string.
pub fn snake_to_pascal(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
