//! Error Record: a fixed-shape Varlist plus construction and molding
//! (spec.md §3.5, §4.4, §7).

use crate::error::CoreError;
use crate::varlist::{Archetype, Varlist};
use quill_core::{Cell, Heart, Lift, Sigil, Slot, Symbol, SymbolTable};
use std::sync::OnceLock;

/// Fixed key order every Error Record's keylist begins with (spec.md
/// §3.5). `file`/`line` are appended only when source metadata is
/// available, exactly as specified.
pub const FIXED_KEYS: &[&str] = &["id", "type", "message", "where", "near"];

/// One entry of the boot-time error catalog: a `(category, id)` pair and
/// its message template (spec.md §4.4 entry point 1). `placeholders`
/// names the get-words the template consumes, in order — this is the
/// "count of get-word placeholders" spec.md §8 invariant 7 checks against.
#[derive(Debug, Clone)]
pub struct ErrorTemplate {
    pub category: &'static str,
    pub id: &'static str,
    pub message: &'static str,
    pub placeholders: &'static [&'static str],
}

/// A representative slice of the boot `errors` description (spec.md
/// §4.4: "a boot table built from an `errors` description"). A full
/// catalog is generated at boot from an embedded description file; out
/// of scope here per spec.md §1, but this fixed slice exercises every
/// rule the construction path implements.
pub const BOOT_ERROR_CATALOG: &[ErrorTemplate] = &[
    ErrorTemplate {
        category: "script",
        id: "no-value",
        message: "word :arg has no value",
        placeholders: &["arg"],
    },
    ErrorTemplate {
        category: "script",
        id: "bad-value",
        message: "invalid argument: :arg",
        placeholders: &["arg"],
    },
    ErrorTemplate {
        category: "script",
        id: "expect-arg",
        message: "action :action requires :arg to be :type",
        placeholders: &["action", "arg", "type"],
    },
    ErrorTemplate {
        category: "internal",
        id: "out-of-memory",
        message: "not enough memory",
        placeholders: &[],
    },
    ErrorTemplate {
        category: "internal",
        id: "stack-overflow",
        message: "stack overflow",
        placeholders: &[],
    },
];

fn find_template(category: &str, id: &str) -> Option<&'static ErrorTemplate> {
    BOOT_ERROR_CATALOG.iter().find(|t| t.category == category && t.id == id)
}

/// A Varlist of fixed shape: `id`, `type`, `message`, `where`, `near`,
/// plus optional `file`/`line`, plus user-facing parameter slots
/// (spec.md §3.5).
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    varlist: Varlist,
    id: Option<Symbol>,
    kind: Option<Symbol>,
    message: MessageForm,
    where_block: Vec<Symbol>,
    near: Option<String>,
    file: Option<Symbol>,
    line: Option<u32>,
}

/// `message` is either plain text or a block alternating text/placeholder
/// get-words (spec.md §3.5).
#[derive(Debug, Clone)]
pub enum MessageForm {
    Text(String),
    Template { text: &'static str, placeholders: Vec<(Symbol, Cell)> },
}

impl ErrorRecord {
    fn base(symbols: &mut SymbolTable) -> Varlist {
        let root_sym = symbols.intern("error");
        let mut vl = Varlist::new(Archetype::Error, root_sym);
        for key in FIXED_KEYS {
            let sym = symbols.intern(key);
            vl.push(sym, Cell::ERASED);
        }
        vl
    }

    /// Entry point 1 (spec.md §4.4): category + id + variadic args.
    /// `args` must supply exactly as many values as the template's
    /// placeholders (spec.md §8 invariant 7) or this fails with
    /// [`CoreError::ArgCountMismatch`].
    pub fn from_category_id(
        symbols: &mut SymbolTable,
        category: &str,
        id: &str,
        args: &[Cell],
    ) -> Result<ErrorRecord, CoreError> {
        let template = find_template(category, id).ok_or_else(|| CoreError::UnknownErrorTemplate {
            category: category.to_string(),
            id: id.to_string(),
        })?;
        if args.len() != template.placeholders.len() {
            return Err(CoreError::ArgCountMismatch {
                expected: template.placeholders.len(),
                got: args.len(),
            });
        }
        let mut varlist = Self::base(symbols);
        let id_sym = symbols.intern(template.id);
        let type_sym = symbols.intern(template.category);
        let placeholders: Vec<(Symbol, Cell)> = template
            .placeholders
            .iter()
            .zip(args.iter())
            .map(|(name, cell)| (symbols.intern(name), *cell))
            .collect();
        for (name, cell) in &placeholders {
            varlist.push(*name, *cell);
        }
        Ok(ErrorRecord {
            varlist,
            id: Some(id_sym),
            kind: Some(type_sym),
            message: MessageForm::Template { text: template.message, placeholders },
            where_block: Vec::new(),
            near: None,
            file: None,
            line: None,
        })
    }

    /// Entry point 2 (spec.md §4.4): plain user text; `id`/`type` null.
    pub fn from_text(symbols: &mut SymbolTable, text: &str) -> ErrorRecord {
        let varlist = Self::base(symbols);
        ErrorRecord {
            varlist,
            id: None,
            kind: None,
            message: MessageForm::Text(text.to_string()),
            where_block: Vec::new(),
            near: None,
            file: None,
            line: None,
        }
    }

    /// Entry point 3 (spec.md §4.4): merge a Varlist already shaped as
    /// an error context (the common case: re-raising a caught error).
    pub fn from_value_or_context(varlist: Varlist) -> Result<ErrorRecord, CoreError> {
        if varlist.archetype() != Archetype::Error {
            return Err(CoreError::NotAnErrorContext);
        }
        Ok(ErrorRecord {
            varlist,
            id: None,
            kind: None,
            message: MessageForm::Text(String::new()),
            where_block: Vec::new(),
            near: None,
            file: None,
            line: None,
        })
    }

    pub fn id(&self) -> Option<Symbol> {
        self.id
    }

    pub fn kind(&self) -> Option<Symbol> {
        self.kind
    }

    pub fn varlist(&self) -> &Varlist {
        &self.varlist
    }

    /// `Set_Location_Of_Error` (spec.md §4.4): populate WHERE/NEAR/FILE/
    /// LINE by walking the level chain from topmost downward. The level
    /// chain itself lives in `crate::level`; this takes the already-
    /// walked pieces rather than owning the walk, so this module does
    /// not need to know about `Level`'s internals.
    pub fn set_location(&mut self, where_block: Vec<Symbol>, near: Option<String>, file: Option<Symbol>, line: Option<u32>) {
        self.where_block = where_block;
        self.near = near;
        self.file = file;
        self.line = line;
    }

    pub(crate) fn format_message(&self, symbols: &SymbolTable) -> String {
        match &self.message {
            MessageForm::Text(s) => s.clone(),
            MessageForm::Template { text, placeholders } => {
                let mut out = String::new();
                for word in text.split_whitespace() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    if let Some(name) = word.strip_prefix(':') {
                        match placeholders.iter().find(|(sym, _)| symbols.resolve(*sym) == name) {
                            Some((_, cell)) => out.push_str(&mold_cell(cell, symbols)),
                            None => out.push_str(word),
                        }
                    } else {
                        out.push_str(word);
                    }
                }
                out
            }
        }
    }

    /// Produce the exact four/five-line format of spec.md §7, omitting
    /// absent fields.
    pub fn mold(&self, symbols: &SymbolTable) -> String {
        let type_name = self.kind.map(|s| symbols.resolve(s)).unwrap_or("user");
        let mut out = format!("** {type_name} Error: {}\n", self.format_message(symbols));
        if !self.where_block.is_empty() {
            let labels: Vec<&str> = self.where_block.iter().map(|s| symbols.resolve(*s)).collect();
            out.push_str(&format!("** Where: {}\n", labels.join(" ")));
        }
        if let Some(near) = &self.near {
            out.push_str(&format!("** Near: {near}\n"));
        }
        if let Some(file) = self.file {
            out.push_str(&format!("** File: {}\n", symbols.resolve(file)));
        }
        if let Some(line) = self.line {
            out.push_str(&format!("** Line: {line}\n"));
        }
        out
    }
}

fn mold_cell(cell: &Cell, symbols: &SymbolTable) -> String {
    match cell.heart() {
        Heart::Integer => cell.payload(0).as_i64().to_string(),
        Heart::Word => Symbol::from_raw(cell.payload(0).0 as u32)
            .map(|sym| symbols.resolve(sym).to_string())
            .unwrap_or_else(|| "word".to_string()),
        _ => format!("{:?}", cell.heart()),
    }
}

/// Build a Word cell bound to `sym` (spec.md §3.1/§4.4: the message
/// template's placeholder args are typically bound words).
pub fn word_cell(sym: Symbol) -> Cell {
    Cell::new(Heart::Word, Sigil::None, Lift::Plain, Slot(0), [Slot(sym.to_raw() as u64), Slot(0)])
}

/// Process-wide pre-allocated singletons (spec.md §4.4: "allocating at
/// failure time is unsafe"). Built once, from a fixed template, the same
/// `OnceLock` shape the teacher's `memory_stats.rs` registry uses for
/// process-wide state.
static OUT_OF_MEMORY: OnceLock<ErrorRecord> = OnceLock::new();
static STACK_OVERFLOW: OnceLock<ErrorRecord> = OnceLock::new();

fn singleton_varlist(symbols: &mut SymbolTable) -> Varlist {
    ErrorRecord::base(symbols)
}

/// The pre-allocated out-of-memory error (spec.md §4.4, §9 "global error
/// singletons").
pub fn out_of_memory(symbols: &mut SymbolTable) -> &'static ErrorRecord {
    OUT_OF_MEMORY.get_or_init(|| {
        let mut record = ErrorRecord {
            varlist: singleton_varlist(symbols),
            id: Some(symbols.intern("out-of-memory")),
            kind: Some(symbols.intern("internal")),
            message: MessageForm::Text("not enough memory".to_string()),
            where_block: Vec::new(),
            near: None,
            file: None,
            line: None,
        };
        record.message = MessageForm::Text("not enough memory".to_string());
        record
    })
}

/// The pre-allocated stack-overflow error (spec.md §4.4).
pub fn stack_overflow(symbols: &mut SymbolTable) -> &'static ErrorRecord {
    STACK_OVERFLOW.get_or_init(|| ErrorRecord {
        varlist: singleton_varlist(symbols),
        id: Some(symbols.intern("stack-overflow")),
        kind: Some(symbols.intern("internal")),
        message: MessageForm::Text("stack overflow".to_string()),
        where_block: Vec::new(),
        near: None,
        file: None,
        line: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn from_category_id_sets_id_and_type() {
        let mut symbols = SymbolTable::new();
        let x = symbols.intern("x");
        let record = ErrorRecord::from_category_id(&mut symbols, "script", "no-value", &[word_cell(x)]).unwrap();
        assert_eq!(symbols.resolve(record.id().unwrap()), "no-value");
        assert_eq!(symbols.resolve(record.kind().unwrap()), "script");
    }

    #[test]
    fn from_category_id_rejects_wrong_arg_count() {
        let mut symbols = SymbolTable::new();
        let err = ErrorRecord::from_category_id(&mut symbols, "script", "no-value", &[]);
        assert_eq!(err, Err(CoreError::ArgCountMismatch { expected: 1, got: 0 }));
    }

    #[test]
    fn from_category_id_rejects_unknown_template() {
        let mut symbols = SymbolTable::new();
        let err = ErrorRecord::from_category_id(&mut symbols, "nope", "nope", &[]);
        assert!(matches!(err, Err(CoreError::UnknownErrorTemplate { .. })));
    }

    #[test]
    fn from_text_has_null_id_and_type() {
        let mut symbols = SymbolTable::new();
        let record = ErrorRecord::from_text(&mut symbols, "boom");
        assert_eq!(record.id(), None);
        assert_eq!(record.kind(), None);
        assert_eq!(record.format_message(&symbols), "boom");
    }

    #[test]
    fn mold_omits_absent_fields() {
        let mut symbols = SymbolTable::new();
        let record = ErrorRecord::from_text(&mut symbols, "boom");
        let text = record.mold(&symbols);
        assert!(text.starts_with("** user Error: boom\n"));
        assert!(!text.contains("Where:"));
        assert!(!text.contains("Near:"));
    }

    #[test]
    fn mold_includes_where_and_near_when_present() {
        let mut symbols = SymbolTable::new();
        let mut record = ErrorRecord::from_text(&mut symbols, "boom");
        let frame = symbols.intern("some-action");
        record.set_location(vec![frame], Some("a b c".to_string()), None, None);
        let text = record.mold(&symbols);
        assert!(text.contains("** Where: some-action\n"));
        assert!(text.contains("** Near: a b c\n"));
    }

    #[test]
    fn scenario_s1_no_value_error_contains_argument_spelling() {
        let mut symbols = SymbolTable::new();
        let x = symbols.intern("x");
        let record = ErrorRecord::from_category_id(&mut symbols, "script", "no-value", &[word_cell(x)]).unwrap();
        assert_eq!(symbols.resolve(record.id().unwrap()), "no-value");
        assert_eq!(symbols.resolve(record.kind().unwrap()), "script");
        assert!(record.format_message(&symbols).contains("x"));
    }
}
