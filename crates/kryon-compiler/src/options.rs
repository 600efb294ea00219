//! Configuration knobs threaded through the pipeline (§4.C, §4.D, §4.E).

/// KIR output formatting (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KirStyle {
    /// No insignificant whitespace.
    Compact,
    /// 2-space indentation.
    Readable,
    /// Readable plus sibling fields documenting what expansion changed.
    Verbose,
}

impl Default for KirStyle {
    fn default() -> Self {
        Self::Readable
    }
}

/// Flags controlling the expansion pass (§4.C).
#[derive(Debug, Clone)]
pub struct ExpansionFlags {
    pub expand_components: bool,
    pub expand_includes: bool,
    pub resolve_inheritance: bool,
    /// Keep `@component` definitions in the output AST even after their
    /// instances have been expanded inline.
    pub preserve_definitions: bool,
    pub add_expansion_metadata: bool,
    pub validate_before: bool,
    pub validate_after: bool,
    pub max_depth: u32,
    /// Unroll a plain `@for` over a `@const`-bound array at expansion time
    /// instead of leaving it for the runtime directive engine. `@const_for`
    /// always folds regardless of this flag; this only affects plain `@for`
    /// (§9 open question: treated as an opt-in optimization).
    pub fold_const_for: bool,
}

impl Default for ExpansionFlags {
    fn default() -> Self {
        Self {
            expand_components: true,
            expand_includes: true,
            resolve_inheritance: true,
            preserve_definitions: false,
            add_expansion_metadata: false,
            validate_before: false,
            validate_after: false,
            max_depth: 32,
            fold_const_for: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub deduplicate_strings: bool,
    pub target_version: u32,
    pub kir_style: KirStyle,
    pub max_include_depth: u32,
    pub expansion: ExpansionFlags,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            deduplicate_strings: true,
            target_version: kryon_krb::FORMAT_VERSION,
            kir_style: KirStyle::default(),
            max_include_depth: 32,
            expansion: ExpansionFlags::default(),
        }
    }
}
