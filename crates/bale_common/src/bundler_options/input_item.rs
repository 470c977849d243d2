use std::borrow::Cow;

/// One entry point: an import specifier plus an optional user alias.
#[derive(Debug, Default, Clone)]
pub struct InputItem {
  pub name: Option<String>,
  pub import: String,
}

impl InputItem {
  pub fn named(name: impl Into<String>, import: impl Into<String>) -> Self {
    Self { name: Some(name.into()), import: import.into() }
  }
}

impl From<&str> for InputItem {
  fn from(value: &str) -> Self {
    Self { name: None, import: value.to_string() }
  }
}

impl From<String> for InputItem {
  fn from(value: String) -> Self {
    Self { name: None, import: value }
  }
}

impl From<Cow<'_, str>> for InputItem {
  fn from(value: Cow<'_, str>) -> Self {
    Self { name: None, import: value.to_string() }
  }
}
