use rand::Rng;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const ID_LEN: usize = 16;

pub const SUFFIX_LEN: usize = 8;

pub fn new_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

pub fn slugify(title: &str) -> String {
    slug::slugify(title)
}

/// e.g. `first-post-chzcBkUq`
pub fn new_name(title: &str) -> Option<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return None;
    }

    Some(format!("{}-{}", slug, new_id(SUFFIX_LEN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_has_requested_length_and_alphabet() {
        let id = new_id(ID_LEN);
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| b.is_ascii_alphabetic()));
    }

    #[test]
    fn blank_titles_have_no_slug() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("\t\n"), "");
        assert_eq!(slugify("!?"), "");
        assert_eq!(new_name(" \t "), None);
    }

    #[test]
    fn slug_is_lowercase_and_hyphenated() {
        assert_eq!(slugify("First Post"), "first-post");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
    }

    #[test]
    fn name_is_slug_plus_suffix() {
        let name = new_name("First Post").unwrap();
        let suffix = name.strip_prefix("first-post-").unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| b.is_ascii_alphabetic()));
    }

    #[test]
    fn names_for_same_title_differ() {
        let names: HashSet<_> = (0..500).map(|_| new_name("Same").unwrap()).collect();
        assert_eq!(names.len(), 500);
    }
}
