//! Statement-level scanner for an ES-module subset.
//!
//! The scanner recovers exactly the records the graph core needs: top-level
//! statements with their declared and referenced names, static import
//! records, the named import/export surface, `export *` sources and dynamic
//! import sites. It is deliberately not a JS parser; anything it cannot
//! classify is treated as an opaque statement with side effects, which is
//! always safe for tree-shaking.

use std::path::Path;

use arcstr::ArcStr;
use bale_common::{
  DynamicImportDesc, ImportKind, ImportRecordIdx, ImportRecordMeta, LocalExport, NamedImport,
  RawImportRecord, ReExport, ScannedModule, Specifier, StmtInfo, SymbolData, SymbolIdx,
};
use bale_utils::{ecmascript::legitimize_identifier_name, path_ext::PathExt};

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
  pub allow_top_level_await: bool,
  /// Honor `/*#__PURE__*/` when classifying side effects.
  pub annotations: bool,
}

impl Default for ScanOptions {
  fn default() -> Self {
    Self { allow_top_level_await: false, annotations: true }
  }
}

#[derive(Debug)]
pub struct ScanError {
  pub reason: String,
  pub offset: u32,
}

const KEYWORDS: &[&str] = &[
  "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
  "delete", "do", "else", "export", "extends", "false", "finally", "for", "from", "function",
  "get", "if", "import", "in", "instanceof", "let", "new", "null", "of", "return", "set",
  "static", "super", "switch", "this", "throw", "true", "try", "typeof", "undefined", "var",
  "void", "while", "yield",
];

pub fn scan_module(id: &str, source: &str, options: &ScanOptions) -> Result<ScannedModule, ScanError> {
  Scanner::new(id, options).scan(source)
}

struct Scanner<'a> {
  options: &'a ScanOptions,
  out: ScannedModule,
}

impl<'a> Scanner<'a> {
  fn new(id: &str, options: &'a ScanOptions) -> Self {
    let mut out = ScannedModule::default();
    let repr = legitimize_identifier_name(&Path::new(id).representative_file_name()).into_owned();
    // The namespace symbol is synthetic and never clashes with user
    // bindings, so it stays out of `symbol_by_name`.
    out.namespace_ref = out.symbols.push(SymbolData { name: format!("{repr}_ns").into() });
    Self { options, out }
  }

  fn scan(mut self, source: &str) -> Result<ScannedModule, ScanError> {
    for (start, text) in split_statements(source) {
      self.scan_statement(start, text)?;
    }
    Ok(self.out)
  }

  fn declare(&mut self, name: &str) -> SymbolIdx {
    if let Some(&symbol) = self.out.symbol_by_name.get(name) {
      return symbol;
    }
    let name: ArcStr = name.into();
    let symbol = self.out.symbols.push(SymbolData { name: name.clone() });
    self.out.symbol_by_name.insert(name, symbol);
    symbol
  }

  fn add_import_record(
    &mut self,
    specifier: &str,
    start: u32,
    meta: ImportRecordMeta,
  ) -> ImportRecordIdx {
    let record =
      RawImportRecord::new(specifier.into(), ImportKind::Import, start).with_meta(meta);
    self.out.import_records.push(record)
  }

  fn scan_statement(&mut self, start: u32, text: &str) -> Result<(), ScanError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == ";" {
      return Ok(());
    }

    if has_top_level_await(trimmed) {
      self.out.has_top_level_await = true;
      if !self.options.allow_top_level_await {
        return Err(ScanError {
          reason: "cannot use keyword 'await' outside an async function".to_string(),
          offset: start,
        });
      }
    }

    let mut info = StmtInfo { start, ..StmtInfo::default() };

    if let Some(rest) = strip_keyword(trimmed, "import") {
      if !rest.trim_start().starts_with('(') {
        self.scan_import(rest, start, &mut info);
        self.finish_statement(info, text);
        return Ok(());
      }
      // `import(...)` at statement head falls through to the expression
      // path below.
    }

    if let Some(rest) = strip_keyword(trimmed, "export") {
      self.scan_export(rest, start, &mut info)?;
      self.finish_statement(info, text);
      return Ok(());
    }

    if let Some(declaration) = match_declaration(trimmed, self.options.annotations) {
      for name in &declaration.names {
        let symbol = self.declare(name);
        info.declared_symbols.push(symbol);
      }
      info.referenced_names = referenced_idents(declaration.body);
      info.side_effect = declaration.side_effect;
      self.finish_statement(info, text);
      return Ok(());
    }

    // Arbitrary expression statement: keep it, whatever it does.
    info.referenced_names = referenced_idents(trimmed);
    info.side_effect = true;
    self.finish_statement(info, text);
    Ok(())
  }

  /// Pushes the statement and collects any `import(...)` sites inside it.
  /// A dynamic import always issues its request, so a statement carrying
  /// one is side-effectful no matter how it was classified.
  fn finish_statement(&mut self, mut info: StmtInfo, text: &str) {
    let sites = dynamic_import_sites(text);
    info.side_effect |= !sites.is_empty();
    let stmt_idx = self.out.stmt_infos.add_stmt_info(info);
    for (expression, specifier) in sites {
      self.out.dynamic_imports.push(DynamicImportDesc {
        expression: expression.into(),
        specifier: specifier.map(Into::into),
        stmt_idx,
        resolution: Default::default(),
      });
    }
  }

  fn scan_import(&mut self, rest: &str, start: u32, info: &mut StmtInfo) {
    let Some(specifier) = last_string_literal(rest) else {
      return;
    };

    let clause = match rest.find(" from ") {
      Some(pos) => rest[..pos].trim(),
      None => "",
    };

    let meta =
      if clause.is_empty() { ImportRecordMeta::IS_PLAIN_IMPORT } else { ImportRecordMeta::empty() };
    let record_idx = self.add_import_record(specifier, start, meta);
    info.import_record = Some(record_idx);

    for (imported, local) in parse_import_clause(clause) {
      let symbol = self.declare(&local);
      info.declared_symbols.push(symbol);
      self.out.named_imports.insert(
        symbol,
        NamedImport { imported, imported_as: symbol, record_idx, start },
      );
    }
  }

  fn scan_export(&mut self, rest: &str, start: u32, info: &mut StmtInfo) -> Result<(), ScanError> {
    let rest = rest.trim_start();

    if let Some(value) = strip_keyword(rest, "default") {
      let symbol = self.declare("default");
      info.declared_symbols.push(symbol);
      info.referenced_names = referenced_idents(value);
      info.side_effect = init_has_side_effects(value, self.options.annotations);
      self.out.named_exports.insert("default".into(), LocalExport { referenced: symbol });
      return Ok(());
    }

    if let Some(after_star) = rest.strip_prefix('*') {
      let Some(specifier) = last_string_literal(after_star) else {
        return Err(ScanError { reason: "expected source after `export *`".into(), offset: start });
      };
      let after_star = after_star.trim_start();
      if let Some(alias_clause) = strip_keyword(after_star, "as") {
        // export * as ns from '...'
        let alias = leading_identifier(alias_clause).unwrap_or_default();
        let record_idx = self.add_import_record(specifier, start, ImportRecordMeta::empty());
        info.import_record = Some(record_idx);
        self
          .out
          .reexports
          .insert(alias.into(), ReExport { imported: Specifier::Star, record_idx, start });
      } else {
        let record_idx =
          self.add_import_record(specifier, start, ImportRecordMeta::IS_EXPORT_STAR);
        info.import_record = Some(record_idx);
      }
      return Ok(());
    }

    if rest.starts_with('{') {
      let close = rest.find('}').unwrap_or(rest.len());
      let names = &rest[1..close];
      let tail = &rest[close.min(rest.len() - 1) + 1..];

      if let Some(specifier) = last_string_literal(tail) {
        // export { a as b } from '...'
        let record_idx = self.add_import_record(specifier, start, ImportRecordMeta::empty());
        info.import_record = Some(record_idx);
        for (imported, exported) in parse_named_clause(names) {
          self.out.reexports.insert(
            exported.into(),
            ReExport { imported: Specifier::literal(imported), record_idx, start },
          );
        }
      } else {
        for (local, exported) in parse_named_clause(names) {
          let symbol = self.declare(&local);
          info.referenced_names.push(local.into());
          self.out.named_exports.insert(exported.into(), LocalExport { referenced: symbol });
        }
      }
      return Ok(());
    }

    if let Some(declaration) = match_declaration(rest, self.options.annotations) {
      for name in &declaration.names {
        let symbol = self.declare(name);
        info.declared_symbols.push(symbol);
        self.out.named_exports.insert(name.as_str().into(), LocalExport { referenced: symbol });
      }
      info.referenced_names = referenced_idents(declaration.body);
      info.side_effect = declaration.side_effect;
      return Ok(());
    }

    Err(ScanError { reason: format!("unsupported export form: `export {rest}`"), offset: start })
  }
}

/// Splits top-level statements on `;` and closing `}` at bracket depth
/// zero, skipping strings, template literals and comments.
fn split_statements(source: &str) -> Vec<(u32, &str)> {
  #[derive(PartialEq)]
  enum State {
    Normal,
    LineComment,
    BlockComment,
    Str(char),
    Template,
  }

  let mut state = State::Normal;
  let mut depth = 0usize;
  let mut stmt_start: Option<usize> = None;
  let mut skip_next = false;
  let mut statements = Vec::new();
  let mut chars = source.char_indices().peekable();

  while let Some((i, ch)) = chars.next() {
    if skip_next {
      skip_next = false;
      continue;
    }
    match state {
      State::Normal => match ch {
        '/' => match chars.peek() {
          Some((_, '/')) => state = State::LineComment,
          Some((_, '*')) => state = State::BlockComment,
          _ => {}
        },
        '\'' | '"' => {
          if stmt_start.is_none() {
            stmt_start = Some(i);
          }
          state = State::Str(ch);
        }
        '`' => {
          if stmt_start.is_none() {
            stmt_start = Some(i);
          }
          state = State::Template;
        }
        '(' | '[' | '{' => {
          if stmt_start.is_none() {
            stmt_start = Some(i);
          }
          depth += 1;
        }
        ')' | ']' => depth = depth.saturating_sub(1),
        '}' => {
          depth = depth.saturating_sub(1);
          if depth == 0 {
            if let Some(start) = stmt_start.take() {
              statements.push((start as u32, &source[start..=i]));
            }
          }
        }
        ';' if depth == 0 => {
          if let Some(start) = stmt_start.take() {
            statements.push((start as u32, &source[start..=i]));
          }
        }
        c if c.is_whitespace() => {}
        _ => {
          if stmt_start.is_none() {
            stmt_start = Some(i);
          }
        }
      },
      State::LineComment => {
        if ch == '\n' {
          state = State::Normal;
        }
      }
      State::BlockComment => {
        if ch == '*' && matches!(chars.peek(), Some((_, '/'))) {
          chars.next();
          state = State::Normal;
        }
      }
      State::Str(quote) => match ch {
        '\\' => skip_next = true,
        c if c == quote => state = State::Normal,
        _ => {}
      },
      State::Template => match ch {
        '\\' => skip_next = true,
        '`' => state = State::Normal,
        _ => {}
      },
    }
  }
  if let Some(start) = stmt_start {
    let text = source[start..].trim_end();
    if !text.is_empty() {
      statements.push((start as u32, &source[start..start + text.len()]));
    }
  }
  statements
}

/// `strip_keyword("export default foo", "export")` -> `Some(" default foo")`
/// only when the keyword stands alone as a word.
fn strip_keyword<'s>(text: &'s str, keyword: &str) -> Option<&'s str> {
  let rest = text.strip_prefix(keyword)?;
  match rest.chars().next() {
    None => Some(rest),
    Some(c) if !is_ident_char(c) => Some(rest),
    Some(_) => None,
  }
}

fn is_ident_start(c: char) -> bool {
  c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_char(c: char) -> bool {
  c == '$' || c == '_' || c.is_alphanumeric()
}

fn leading_identifier(text: &str) -> Option<&str> {
  let text = text.trim_start();
  let mut end = 0;
  for (i, c) in text.char_indices() {
    let valid = if i == 0 { is_ident_start(c) } else { is_ident_char(c) };
    if !valid {
      break;
    }
    end = i + c.len_utf8();
  }
  (end > 0).then(|| &text[..end])
}

/// The last `'...'` or `"..."` literal in the text; import statements keep
/// their source there.
fn last_string_literal(text: &str) -> Option<&str> {
  let close = text.rfind(['\'', '"'])?;
  let quote = text.as_bytes()[close] as char;
  let open = text[..close].rfind(quote)?;
  Some(&text[open + 1..close])
}

/// Parses the bindings of an import clause (everything between `import`
/// and `from`) into `(imported, local)` pairs.
fn parse_import_clause(clause: &str) -> Vec<(Specifier, String)> {
  let mut bindings = Vec::new();
  let mut rest = clause.trim();
  while !rest.is_empty() {
    if let Some(after) = rest.strip_prefix('*') {
      let after = after.trim_start();
      if let Some(alias_clause) = strip_keyword(after, "as") {
        if let Some(local) = leading_identifier(alias_clause) {
          bindings.push((Specifier::Star, local.to_string()));
          rest = alias_clause[alias_clause.find(local).unwrap() + local.len()..].trim_start();
          rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
          continue;
        }
      }
      break;
    }
    if let Some(after) = rest.strip_prefix('{') {
      let close = after.find('}').unwrap_or(after.len());
      for (imported, local) in parse_named_clause(&after[..close]) {
        bindings.push((Specifier::literal(imported), local));
      }
      rest = after[close.min(after.len())..].trim_start();
      rest = rest.strip_prefix('}').unwrap_or(rest).trim_start();
      rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
      continue;
    }
    if let Some(local) = leading_identifier(rest) {
      bindings.push((Specifier::literal("default"), local.to_string()));
      rest = rest[rest.find(local).unwrap() + local.len()..].trim_start();
      rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
      continue;
    }
    break;
  }
  bindings
}

/// `a, b as c` -> `[("a", "a"), ("b", "c")]`
fn parse_named_clause(names: &str) -> Vec<(String, String)> {
  names
    .split(',')
    .filter_map(|part| {
      let part = part.trim();
      if part.is_empty() {
        return None;
      }
      match part.split_once(" as ") {
        Some((source, alias)) => Some((source.trim().to_string(), alias.trim().to_string())),
        None => Some((part.to_string(), part.to_string())),
      }
    })
    .collect()
}

struct Declaration<'s> {
  names: Vec<String>,
  /// Text to extract references from.
  body: &'s str,
  side_effect: bool,
}

/// Recognizes `const`/`let`/`var`/`function`/`class` declarations. A
/// declaration only carries side effects when one of its initializers
/// performs a call or construction at declaration time.
fn match_declaration(text: &str, annotations: bool) -> Option<Declaration> {
  for keyword in ["const", "let", "var"] {
    if let Some(rest) = strip_keyword(text, keyword) {
      let mut names = Vec::new();
      let mut side_effect = false;
      for declarator in split_top_level(rest, ',') {
        let (head, init) = declarator.split_once('=').unwrap_or((declarator, ""));
        if head.trim_start().starts_with(['{', '[']) {
          names.extend(referenced_idents(head).iter().map(ToString::to_string));
        } else if let Some(name) = leading_identifier(head) {
          names.push(name.to_string());
        }
        side_effect |= init_has_side_effects(init, annotations);
      }
      return Some(Declaration { names, body: rest, side_effect });
    }
  }
  for keyword in ["function", "class"] {
    if let Some(rest) = strip_keyword(text, keyword) {
      let name = leading_identifier(rest)?.to_string();
      return Some(Declaration { names: vec![name], body: rest, side_effect: false });
    }
  }
  if let Some(rest) = strip_keyword(text, "async") {
    let rest = rest.trim_start();
    if let Some(rest) = strip_keyword(rest, "function") {
      let name = leading_identifier(rest)?.to_string();
      return Some(Declaration { names: vec![name], body: rest, side_effect: false });
    }
  }
  None
}

/// Whether evaluating an initializer expression has observable effects.
/// Function, class and arrow literals defer their bodies, so they are
/// pure by themselves.
fn init_has_side_effects(init: &str, annotations: bool) -> bool {
  let mut text = init.trim();
  if text.is_empty() {
    return false;
  }
  if let Some(rest) = strip_keyword(text, "async") {
    text = rest.trim_start();
  }
  if strip_keyword(text, "function").is_some() || strip_keyword(text, "class").is_some() {
    return false;
  }
  if is_arrow_literal(text) {
    return false;
  }
  expression_has_side_effects(text, annotations)
}

fn is_arrow_literal(text: &str) -> bool {
  if let Some(name) = leading_identifier(text) {
    let after = text[text.find(name).unwrap() + name.len()..].trim_start();
    return after.starts_with("=>");
  }
  if text.starts_with('(') {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
      match ch {
        '(' => depth += 1,
        ')' => {
          depth -= 1;
          if depth == 0 {
            return text[i + 1..].trim_start().starts_with("=>");
          }
        }
        _ => {}
      }
    }
  }
  false
}

/// Splits on a separator at bracket depth zero, ignoring strings.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
  let mut parts = Vec::new();
  let mut depth = 0usize;
  let mut in_str: Option<char> = None;
  let mut part_start = 0;
  for (i, ch) in text.char_indices() {
    if let Some(quote) = in_str {
      if ch == quote {
        in_str = None;
      }
      continue;
    }
    match ch {
      '\'' | '"' | '`' => in_str = Some(ch),
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => depth = depth.saturating_sub(1),
      c if c == separator && depth == 0 => {
        parts.push(&text[part_start..i]);
        part_start = i + ch.len_utf8();
      }
      _ => {}
    }
  }
  parts.push(&text[part_start..]);
  parts
}

/// Identifiers referenced by a statement, in order, deduplicated. Property
/// names after `.` and anything inside strings or comments are skipped.
/// Overcapture is fine: the bind pass only resolves names that exist at
/// module top level.
fn referenced_idents(text: &str) -> Vec<ArcStr> {
  let mut idents: Vec<ArcStr> = Vec::new();
  let mut prev_meaningful = ' ';
  let mut chars = text.char_indices().peekable();
  let mut in_str: Option<char> = None;
  while let Some((i, ch)) = chars.next() {
    if let Some(quote) = in_str {
      if ch == '\\' {
        chars.next();
      } else if ch == quote {
        in_str = None;
      }
      continue;
    }
    match ch {
      '\'' | '"' | '`' => in_str = Some(ch),
      '/' if matches!(chars.peek(), Some((_, '/' | '*'))) => {
        let block = matches!(chars.peek(), Some((_, '*')));
        let mut prev = ' ';
        for (_, c) in chars.by_ref() {
          if block && prev == '*' && c == '/' {
            break;
          }
          if !block && c == '\n' {
            break;
          }
          prev = c;
        }
      }
      c if is_ident_start(c) => {
        let start = i;
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
          if is_ident_char(next) {
            end = j + next.len_utf8();
            chars.next();
          } else {
            break;
          }
        }
        let word = &text[start..end];
        let is_property = prev_meaningful == '.';
        if !is_property && !KEYWORDS.contains(&word) && !idents.iter().any(|known| known == word) {
          idents.push(word.into());
        }
        prev_meaningful = 'a';
      }
      c if c.is_whitespace() => {}
      c => prev_meaningful = c,
    }
  }
  idents
}

/// A call or constructor invocation taints a statement, unless the source
/// carries a PURE annotation and annotations are honored. Function and
/// arrow literals by themselves are not side effects.
fn expression_has_side_effects(text: &str, annotations: bool) -> bool {
  if annotations && text.contains("#__PURE__") {
    return false;
  }
  if contains_word(text, "new") || contains_word(text, "await") {
    return true;
  }
  let bytes = text.as_bytes();
  for (i, &byte) in bytes.iter().enumerate() {
    if byte != b'(' {
      continue;
    }
    // Look back at what precedes the paren.
    let before = text[..i].trim_end();
    let Some(last) = before.chars().last() else { continue };
    if last == ')' || last == ']' {
      return true;
    }
    if is_ident_char(last) {
      let word_start = before
        .rfind(|c: char| !is_ident_char(c))
        .map(|pos| pos + 1)
        .unwrap_or(0);
      let word = &before[word_start..];
      if !KEYWORDS.contains(&word) {
        return true;
      }
    }
  }
  false
}

fn contains_word(text: &str, word: &str) -> bool {
  let mut search_from = 0;
  while let Some(pos) = text[search_from..].find(word) {
    let start = search_from + pos;
    let end = start + word.len();
    let before_ok = start == 0 || !is_ident_char(text[..start].chars().last().unwrap());
    let after_ok = end == text.len() || !is_ident_char(text[end..].chars().next().unwrap());
    if before_ok && after_ok {
      return true;
    }
    search_from = end;
  }
  false
}

fn has_top_level_await(text: &str) -> bool {
  // Only looks at depth zero, so `await` inside async function bodies
  // doesn't count.
  for part in split_top_level(text, '\u{0}') {
    let mut depth_zero = String::new();
    let mut depth = 0usize;
    let mut in_str: Option<char> = None;
    for ch in part.chars() {
      if let Some(quote) = in_str {
        if ch == quote {
          in_str = None;
        }
        continue;
      }
      match ch {
        '\'' | '"' | '`' => in_str = Some(ch),
        '(' | '[' | '{' => depth += 1,
        ')' | ']' | '}' => depth = depth.saturating_sub(1),
        _ if depth == 0 => depth_zero.push(ch),
        _ => {}
      }
    }
    if contains_word(&depth_zero, "await") {
      return true;
    }
  }
  false
}

/// `import(...)` call sites inside a statement, as
/// `(expression, literal_specifier)` pairs.
fn dynamic_import_sites(text: &str) -> Vec<(String, Option<String>)> {
  let mut sites = Vec::new();
  let mut search_from = 0;
  while let Some(pos) = text[search_from..].find("import") {
    let start = search_from + pos;
    let end = start + "import".len();
    search_from = end;
    let before_ok = start == 0 || !is_ident_char(text[..start].chars().last().unwrap());
    if !before_ok {
      continue;
    }
    let after = &text[end..];
    let Some(open_offset) = after.find(|c: char| !c.is_whitespace()) else { continue };
    if !after[open_offset..].starts_with('(') {
      continue;
    }
    let args = &after[open_offset + 1..];
    let mut depth = 1usize;
    let mut close = args.len();
    for (i, ch) in args.char_indices() {
      match ch {
        '(' => depth += 1,
        ')' => {
          depth -= 1;
          if depth == 0 {
            close = i;
            break;
          }
        }
        _ => {}
      }
    }
    let expression = args[..close].trim().to_string();
    let specifier = unquote(&expression).map(ToString::to_string);
    sites.push((expression, specifier));
  }
  sites
}

fn unquote(text: &str) -> Option<&str> {
  let first = text.chars().next()?;
  if (first == '\'' || first == '"')
    && text.len() >= 2
    && text.ends_with(first)
    && !text[1..text.len() - 1].contains(first)
  {
    Some(&text[1..text.len() - 1])
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bale_common::Specifier;

  fn scan(source: &str) -> ScannedModule {
    scan_module("/src/mod.js", source, &ScanOptions::default()).unwrap()
  }

  #[test]
  fn splits_statements_on_semicolons_and_braces() {
    let stmts = split_statements("const a = 1;\nfunction f() { return a; }\ncall();");
    assert_eq!(stmts.len(), 3);
    assert!(stmts[1].1.starts_with("function f"));
  }

  #[test]
  fn collects_named_imports() {
    let scanned = scan("import def, { a, b as c } from './dep.js';");
    assert_eq!(scanned.import_records.len(), 1);
    assert_eq!(scanned.import_records.iter().next().unwrap().specifier, "./dep.js");
    assert_eq!(scanned.named_imports.len(), 3);

    let imported: Vec<_> =
      scanned.named_imports.values().map(|import| import.imported.to_string()).collect();
    assert!(imported.contains(&"default".to_string()));
    assert!(imported.contains(&"a".to_string()));
    assert!(imported.contains(&"b".to_string()));
  }

  #[test]
  fn collects_namespace_import() {
    let scanned = scan("import * as utils from './utils.js';");
    assert_eq!(scanned.named_imports.len(), 1);
    let import = scanned.named_imports.values().next().unwrap();
    assert_eq!(import.imported, Specifier::Star);
  }

  #[test]
  fn bare_import_is_plain() {
    let scanned = scan("import './polyfill.js';");
    let record = scanned.import_records.iter().next().unwrap();
    assert!(record.meta.contains(ImportRecordMeta::IS_PLAIN_IMPORT));
    assert!(scanned.named_imports.is_empty());
  }

  #[test]
  fn collects_exports() {
    let scanned = scan(concat!(
      "export const answer = 42;\n",
      "export function compute() { return answer; }\n",
      "const hidden = 1;\n",
      "export { hidden as visible };\n",
    ));
    assert!(scanned.named_exports.contains_key("answer"));
    assert!(scanned.named_exports.contains_key("compute"));
    assert!(scanned.named_exports.contains_key("visible"));
    assert!(!scanned.named_exports.contains_key("hidden"));
  }

  #[test]
  fn collects_reexports_and_star_exports() {
    let scanned = scan(concat!(
      "export { a as b } from './a.js';\n",
      "export * from './wide.js';\n",
      "export * as ns from './ns.js';\n",
    ));
    assert_eq!(scanned.import_records.len(), 3);
    assert!(scanned.reexports.contains_key("b"));
    assert!(scanned.reexports.contains_key("ns"));
    let star_records: Vec<_> = scanned
      .import_records
      .iter()
      .filter(|record| record.meta.contains(ImportRecordMeta::IS_EXPORT_STAR))
      .collect();
    assert_eq!(star_records.len(), 1);
    assert_eq!(star_records[0].specifier, "./wide.js");
  }

  #[test]
  fn export_default_declares_a_symbol() {
    let scanned = scan("export default compute();");
    assert!(scanned.named_exports.contains_key("default"));
    let stmt = scanned.stmt_infos.iter().next().unwrap();
    assert!(stmt.side_effect);
    assert!(stmt.referenced_names.iter().any(|name| name == "compute"));
  }

  #[test]
  fn declarations_are_pure_calls_are_not() {
    let scanned = scan(concat!(
      "const lazy = () => helper();\n",
      "function helper() { return 1; }\n",
      "helper();\n",
    ));
    let side_effects: Vec<_> = scanned.stmt_infos.iter().map(|stmt| stmt.side_effect).collect();
    assert_eq!(side_effects, [false, false, true]);
  }

  #[test]
  fn pure_annotation_suppresses_call_side_effect() {
    let scanned = scan("const cached = /*#__PURE__*/ compute();");
    assert!(!scanned.stmt_infos.iter().next().unwrap().side_effect);
  }

  #[test]
  fn collects_dynamic_imports() {
    let scanned = scan("const page = import('./page.js');\nimport(dynamicTarget);");
    assert_eq!(scanned.dynamic_imports.len(), 2);
    assert_eq!(scanned.dynamic_imports[0].specifier.as_deref(), Some("./page.js"));
    assert_eq!(scanned.dynamic_imports[1].specifier, None);
    assert_eq!(scanned.dynamic_imports[1].expression, "dynamicTarget");
  }

  #[test]
  fn references_skip_strings_and_properties() {
    let scanned = scan("log(config.flag, 'ignored.name');");
    let stmt = scanned.stmt_infos.iter().next().unwrap();
    assert!(stmt.referenced_names.iter().any(|name| name == "log"));
    assert!(stmt.referenced_names.iter().any(|name| name == "config"));
    assert!(!stmt.referenced_names.iter().any(|name| name == "flag"));
    assert!(!stmt.referenced_names.iter().any(|name| name == "ignored"));
  }

  #[test]
  fn top_level_await_is_rejected_by_default() {
    let result = scan_module("/m.js", "await setup();", &ScanOptions::default());
    assert!(result.is_err());

    let options = ScanOptions { allow_top_level_await: true, ..ScanOptions::default() };
    let scanned = scan_module("/m.js", "await setup();", &options).unwrap();
    assert!(scanned.has_top_level_await);
  }

  #[test]
  fn await_inside_function_body_is_fine() {
    let scanned = scan("async function go() { await fetchData(); }");
    assert!(!scanned.has_top_level_await);
  }
}
