/// Return `name`, or `name` with a `.001`, `.002`, ... suffix when it is already taken
///
/// An existing numeric suffix on `name` is replaced rather than extended.
pub fn check_for_duplicates<'a, I>(existing: I, name: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<&str> = existing.into_iter().collect();

    let base = match name.rsplit_once('.') {
        Some((base, suffix)) if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) => {
            base
        }
        _ => name,
    };

    let mut candidate = name.to_string();
    let mut num = 1;
    while taken.contains(&candidate.as_str()) {
        candidate = format!("{}.{:03}", base, num);
        num += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_name_is_kept() {
        assert_eq!(check_for_duplicates(["Other"], "Action"), "Action");
    }

    #[test]
    fn test_duplicate_gets_suffix() {
        assert_eq!(
            check_for_duplicates(["Action", "Action.001"], "Action"),
            "Action.002"
        );
    }

    #[test]
    fn test_numeric_suffix_is_replaced() {
        assert_eq!(check_for_duplicates(["Action.001"], "Action.001"), "Action.002");
    }
}
