//! Regular expression transpiler.
//!
//! Constraint patterns are written in the Perl-like dialect parsed by
//! `regex-syntax`; JSON Schema `pattern` uses the ECMAScript dialect. The
//! transpiler walks the parsed syntax tree and re-spells each node for the
//! target. Look-around and backreferences do not parse in the source dialect.
//! The few nodes that parse but have no target spelling (half word
//! boundaries) are errors.
//!
//! Inline flags are resolved while walking: `s` turns `.` into `[\s\S]`,
//! `i` expands cased literals into two-character classes, and `U` swaps
//! quantifier greediness. ECMAScript has no inline flag groups.
//!
//! Classes built with set operations or negated members (`[a-z&&[^aeiou]]`,
//! `[[:^digit:]]`) have no direct spelling in the target. They are resolved
//! to their code point ranges and written out as a plain class.

use regex_syntax::ast::{
    self, Ast, AssertionKind, ClassAsciiKind, ClassPerlKind, ClassSet, ClassSetItem,
    ClassUnicodeKind, Flag, FlagsItemKind, GroupKind, RepetitionKind, RepetitionRange,
};
use regex_syntax::hir::translate::{Translator, TranslatorBuilder};
use regex_syntax::hir::{self, Class, HirKind};

/// Characters with special meaning outside a character class.
const META: &str = r"\.+*?()|[]{}^$";

/// Characters with special meaning inside a character class.
const CLASS_META: &str = r"\]^[-";

/// Highest code point a class in the target dialect can name without the
/// `u` flag.
const MAX_CODE_UNIT: u32 = 0xFFFF;

/// Errors raised while transpiling a pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// The pattern is not valid in the source dialect.
    #[error(transparent)]
    Syntax(#[from] regex_syntax::Error),

    /// The pattern parses but contains a construct with no target spelling.
    #[error("{0} has no ECMAScript equivalent")]
    Untranslatable(String),
}

/// Transpile a source-dialect pattern into an ECMAScript pattern.
///
/// Fails if the pattern does not parse, names something the source dialect
/// rejects semantically (e.g. an unknown Unicode class), or uses a construct
/// the target cannot spell.
pub fn transpile(pattern: &str) -> Result<String, PatternError> {
    let ast = ast::parse::Parser::new()
        .parse(pattern)
        .map_err(regex_syntax::Error::from)?;
    Translator::new()
        .translate(pattern, &ast)
        .map_err(regex_syntax::Error::from)?;

    let mut writer = Writer::new(pattern);
    writer.ast(&ast)?;
    Ok(writer.out)
}

/// Escape a literal string so it matches itself.
pub fn quote_meta(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        push_escaped(&mut out, c, META);
    }
    out
}

fn push_escaped(out: &mut String, c: char, meta: &str) {
    match c {
        '\n' => out.push_str(r"\n"),
        '\r' => out.push_str(r"\r"),
        '\t' => out.push_str(r"\t"),
        '\x0B' => out.push_str(r"\v"),
        '\x0C' => out.push_str(r"\f"),
        c if c.is_ascii_control() => out.push_str(&format!(r"\x{:02X}", u32::from(c))),
        c if meta.contains(c) => {
            out.push('\\');
            out.push(c);
        }
        c => out.push(c),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    case_insensitive: bool,
    dot_matches_new_line: bool,
    swap_greed: bool,
}

impl Flags {
    fn apply(&mut self, flags: &ast::Flags) {
        let mut enable = true;
        for item in &flags.items {
            match &item.kind {
                FlagsItemKind::Negation => enable = false,
                FlagsItemKind::Flag(Flag::CaseInsensitive) => self.case_insensitive = enable,
                FlagsItemKind::Flag(Flag::DotMatchesNewLine) => {
                    self.dot_matches_new_line = enable
                }
                FlagsItemKind::Flag(Flag::SwapGreed) => self.swap_greed = enable,
                // Multi-line, Unicode, CRLF and whitespace modes do not change
                // the spelling of anything we emit.
                FlagsItemKind::Flag(_) => {}
            }
        }
    }
}

struct Writer<'p> {
    /// Source text, for error spans when a class is resolved through HIR.
    pattern: &'p str,
    out: String,
    flags: Flags,
}

impl<'p> Writer<'p> {
    fn new(pattern: &'p str) -> Self {
        Writer {
            pattern,
            out: String::with_capacity(pattern.len()),
            flags: Flags::default(),
        }
    }

    fn ast(&mut self, node: &Ast) -> Result<(), PatternError> {
        match node {
            Ast::Empty(_) => {}
            Ast::Flags(set) => self.flags.apply(&set.flags),
            Ast::Literal(literal) => self.literal(literal.c),
            Ast::Dot(_) => {
                if self.flags.dot_matches_new_line {
                    self.out.push_str(r"[\s\S]");
                } else {
                    self.out.push('.');
                }
            }
            Ast::Assertion(assertion) => match assertion.kind {
                AssertionKind::StartLine | AssertionKind::StartText => self.out.push('^'),
                AssertionKind::EndLine | AssertionKind::EndText => self.out.push('$'),
                AssertionKind::WordBoundary => self.out.push_str(r"\b"),
                AssertionKind::NotWordBoundary => self.out.push_str(r"\B"),
                // Half and start/end word boundaries.
                _ => return Err(PatternError::Untranslatable(node.to_string())),
            },
            Ast::ClassUnicode(class) => self.out.push_str(&unicode_class(class)),
            Ast::ClassPerl(class) => self.out.push_str(perl_class(class)),
            Ast::ClassBracketed(class) => self.bracketed(class)?,
            Ast::Repetition(repetition) => self.repetition(repetition)?,
            Ast::Group(group) => self.group(group)?,
            Ast::Alternation(alternation) => {
                for (i, branch) in alternation.asts.iter().enumerate() {
                    if i > 0 {
                        self.out.push('|');
                    }
                    self.ast(branch)?;
                }
            }
            Ast::Concat(concat) => {
                for child in &concat.asts {
                    if matches!(child, Ast::Alternation(_)) {
                        self.wrapped(child)?;
                    } else {
                        self.ast(child)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn wrapped(&mut self, node: &Ast) -> Result<(), PatternError> {
        self.out.push_str("(?:");
        self.ast(node)?;
        self.out.push(')');
        Ok(())
    }

    fn literal(&mut self, c: char) {
        let variants = self.case_variants(c);
        if variants.len() > 1 {
            self.out.push('[');
            for variant in variants {
                push_escaped(&mut self.out, variant, CLASS_META);
            }
            self.out.push(']');
        } else {
            push_escaped(&mut self.out, c, META);
        }
    }

    /// `c` plus its simple case mappings when case-insensitive.
    fn case_variants(&self, c: char) -> Vec<char> {
        let mut variants = vec![c];
        if self.flags.case_insensitive {
            for other in [single(c.to_lowercase()), single(c.to_uppercase())]
                .into_iter()
                .flatten()
            {
                if !variants.contains(&other) {
                    variants.push(other);
                }
            }
        }
        variants
    }

    fn repetition(&mut self, repetition: &ast::Repetition) -> Result<(), PatternError> {
        if matches!(
            *repetition.ast,
            Ast::Repetition(_) | Ast::Concat(_) | Ast::Alternation(_)
        ) {
            self.wrapped(&repetition.ast)?;
        } else {
            self.ast(&repetition.ast)?;
        }

        match &repetition.op.kind {
            RepetitionKind::ZeroOrOne => self.out.push('?'),
            RepetitionKind::ZeroOrMore => self.out.push('*'),
            RepetitionKind::OneOrMore => self.out.push('+'),
            RepetitionKind::Range(RepetitionRange::Exactly(n)) => {
                self.out.push_str(&format!("{{{n}}}"))
            }
            RepetitionKind::Range(RepetitionRange::AtLeast(n)) => {
                self.out.push_str(&format!("{{{n},}}"))
            }
            RepetitionKind::Range(RepetitionRange::Bounded(min, max)) => {
                self.out.push_str(&format!("{{{min},{max}}}"))
            }
        }

        // Lazy unless exactly one of `?` suffix and the `U` flag is present.
        if repetition.greedy == self.flags.swap_greed {
            self.out.push('?');
        }
        Ok(())
    }

    fn group(&mut self, group: &ast::Group) -> Result<(), PatternError> {
        let saved = self.flags;
        match &group.kind {
            GroupKind::CaptureIndex(_) | GroupKind::CaptureName { .. } => self.out.push('('),
            GroupKind::NonCapturing(flags) => {
                self.flags.apply(flags);
                self.out.push_str("(?:");
            }
        }
        self.ast(&group.ast)?;
        self.out.push(')');
        self.flags = saved;
        Ok(())
    }

    fn bracketed(&mut self, class: &ast::ClassBracketed) -> Result<(), PatternError> {
        let mut body = String::new();
        if !self.class_set(&class.kind, &mut body) {
            let resolved = self.resolve_class(class)?;
            self.out.push_str(&resolved);
            return Ok(());
        }
        self.out.push('[');
        if class.negated {
            self.out.push('^');
        }
        self.out.push_str(&body);
        self.out.push(']');
        Ok(())
    }

    /// Spell a class through its translated code point ranges. Negation and
    /// case folding are already applied by the translator.
    fn resolve_class(&self, class: &ast::ClassBracketed) -> Result<String, PatternError> {
        let node = Ast::ClassBracketed(Box::new(class.clone()));
        let hir = TranslatorBuilder::new()
            .case_insensitive(self.flags.case_insensitive)
            .build()
            .translate(self.pattern, &node)
            .map_err(regex_syntax::Error::from)?;

        match hir.kind() {
            HirKind::Class(Class::Unicode(ranges)) => Ok(class_from_ranges(
                ranges.iter().map(|r| (u32::from(r.start()), u32::from(r.end()))),
            )),
            HirKind::Class(Class::Bytes(ranges)) if ranges.is_ascii() => Ok(class_from_ranges(
                ranges.iter().map(|r| (u32::from(r.start()), u32::from(r.end()))),
            )),
            HirKind::Literal(hir::Literal(bytes)) => std::str::from_utf8(bytes)
                .map(quote_meta)
                .map_err(|_| PatternError::Untranslatable(node.to_string())),
            _ => Err(PatternError::Untranslatable(node.to_string())),
        }
    }

    /// Render the body of a class. `false` if it needs set operations the
    /// target dialect lacks (intersection, difference, negated members).
    fn class_set(&self, set: &ClassSet, out: &mut String) -> bool {
        match set {
            ClassSet::Item(item) => self.class_item(item, out),
            ClassSet::BinaryOp(_) => false,
        }
    }

    fn class_item(&self, item: &ClassSetItem, out: &mut String) -> bool {
        match item {
            ClassSetItem::Empty(_) => true,
            ClassSetItem::Literal(literal) => {
                for variant in self.case_variants(literal.c) {
                    push_escaped(out, variant, CLASS_META);
                }
                true
            }
            ClassSetItem::Range(range) => {
                let (start, end) = (range.start.c, range.end.c);
                push_range(out, start, end);
                if self.flags.case_insensitive {
                    if start.is_ascii_lowercase() && end.is_ascii_lowercase() {
                        push_range(out, start.to_ascii_uppercase(), end.to_ascii_uppercase());
                    } else if start.is_ascii_uppercase() && end.is_ascii_uppercase() {
                        push_range(out, start.to_ascii_lowercase(), end.to_ascii_lowercase());
                    }
                }
                true
            }
            ClassSetItem::Ascii(class) => {
                if class.negated {
                    return false;
                }
                out.push_str(ascii_class_body(&class.kind));
                true
            }
            ClassSetItem::Unicode(class) => {
                out.push_str(&unicode_class(class));
                true
            }
            ClassSetItem::Perl(class) => {
                out.push_str(perl_class(class));
                true
            }
            ClassSetItem::Bracketed(inner) => !inner.negated && self.class_set(&inner.kind, out),
            ClassSetItem::Union(union) => union.items.iter().all(|item| self.class_item(item, out)),
        }
    }
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let c = chars.next()?;
    if chars.next().is_some() { None } else { Some(c) }
}

/// Write sorted code point ranges as a class.
///
/// The target matches UTF-16 code units: ranges are clamped to the Basic
/// Multilingual Plane, and a class reaching past it also takes the surrogate
/// block so supplementary characters still match as their two halves. An
/// empty set becomes a class that matches nothing.
fn class_from_ranges(ranges: impl Iterator<Item = (u32, u32)>) -> String {
    let mut units: Vec<(u32, u32)> = Vec::new();
    let mut supplementary = false;
    for (start, end) in ranges {
        supplementary |= end > MAX_CODE_UNIT;
        if start <= MAX_CODE_UNIT {
            units.push((start, end.min(MAX_CODE_UNIT)));
        }
    }
    if supplementary {
        units.push((0xD800, 0xDFFF));
        units.sort_unstable();
    }

    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(units.len());
    for (start, end) in units {
        match merged.last_mut() {
            Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    if merged.is_empty() {
        return r"[^\s\S]".to_string();
    }

    let mut out = String::from("[");
    for (start, end) in merged {
        push_code_unit(&mut out, start);
        if end > start {
            out.push('-');
            push_code_unit(&mut out, end);
        }
    }
    out.push(']');
    out
}

fn push_code_unit(out: &mut String, unit: u32) {
    match char::from_u32(unit) {
        Some(c) if c.is_ascii() => push_escaped(out, c, CLASS_META),
        _ => out.push_str(&format!(r"\u{unit:04X}")),
    }
}

fn push_range(out: &mut String, start: char, end: char) {
    push_escaped(out, start, CLASS_META);
    out.push('-');
    push_escaped(out, end, CLASS_META);
}

fn perl_class(class: &ast::ClassPerl) -> &'static str {
    match (&class.kind, class.negated) {
        (ClassPerlKind::Digit, false) => r"\d",
        (ClassPerlKind::Digit, true) => r"\D",
        (ClassPerlKind::Space, false) => r"\s",
        (ClassPerlKind::Space, true) => r"\S",
        (ClassPerlKind::Word, false) => r"\w",
        (ClassPerlKind::Word, true) => r"\W",
    }
}

fn unicode_class(class: &ast::ClassUnicode) -> String {
    let p = if class.is_negated() { 'P' } else { 'p' };
    match &class.kind {
        ClassUnicodeKind::OneLetter(letter) => format!(r"\{p}{{{letter}}}"),
        ClassUnicodeKind::Named(name) => format!(r"\{p}{{{name}}}"),
        ClassUnicodeKind::NamedValue { name, value, .. } => {
            format!(r"\{p}{{{name}={value}}}")
        }
    }
}

/// POSIX classes spelled as class-body ranges.
fn ascii_class_body(kind: &ClassAsciiKind) -> &'static str {
    match kind {
        ClassAsciiKind::Alnum => "0-9A-Za-z",
        ClassAsciiKind::Alpha => "A-Za-z",
        ClassAsciiKind::Ascii => r"\x00-\x7F",
        ClassAsciiKind::Blank => r"\t ",
        ClassAsciiKind::Cntrl => r"\x00-\x1F\x7F",
        ClassAsciiKind::Digit => "0-9",
        ClassAsciiKind::Graph => "!-~",
        ClassAsciiKind::Lower => "a-z",
        ClassAsciiKind::Print => " -~",
        ClassAsciiKind::Punct => r"!-/:-@\[-`{-~",
        ClassAsciiKind::Space => r"\t\n\v\f\r ",
        ClassAsciiKind::Upper => "A-Z",
        ClassAsciiKind::Word => "0-9A-Za-z_",
        ClassAsciiKind::Xdigit => "0-9A-Fa-f",
    }
}
