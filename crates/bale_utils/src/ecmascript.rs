use std::borrow::Cow;

fn is_identifier_start(ch: char) -> bool {
  ch == '$' || ch == '_' || ch.is_alphabetic()
}

fn is_identifier_part(ch: char) -> bool {
  ch == '$' || ch == '_' || ch.is_alphanumeric()
}

pub fn is_valid_identifier_name(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_part)
}

/// Rewrites an arbitrary string (usually a module id) into something that
/// can be used as a JS identifier.
pub fn legitimize_identifier_name(name: &str) -> Cow<str> {
  if is_valid_identifier_name(name) {
    return Cow::Borrowed(name);
  }
  let mut legitimized = String::with_capacity(name.len());
  for (index, ch) in name.chars().enumerate() {
    let valid = if index == 0 { is_identifier_start(ch) } else { is_identifier_part(ch) };
    legitimized.push(if valid { ch } else { '_' });
  }
  if legitimized.is_empty() {
    legitimized.push('_');
  }
  Cow::Owned(legitimized)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_valid_identifier_name() {
    assert!(is_valid_identifier_name("foo"));
    assert!(is_valid_identifier_name("$foo_bar"));
    assert!(!is_valid_identifier_name("1aaaa"));
    assert!(!is_valid_identifier_name("a-b"));
  }

  #[test]
  fn test_legitimize_identifier_name() {
    assert_eq!(legitimize_identifier_name("foo"), "foo");
    assert_eq!(legitimize_identifier_name("./lib/util.js"), "__lib_util_js");
    assert_eq!(legitimize_identifier_name("123"), "_23");
  }
}
