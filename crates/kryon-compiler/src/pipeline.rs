//! Orchestrates the whole source-to-binary path (§5): parse, expand, then
//! optionally serialize to KIR and always hand the expanded tree to codegen.
//! Exposes both a byte-buffer entry point (for embedders and tests, in
//! memory end to end) and a file-path one (for the common "compile this
//! `.kry` file" case), the way a CLI front end and an editor-integration
//! front end want two different shapes of the same call.

use crate::ast::Document;
use crate::codegen::{self, CodegenOutput};
use crate::diagnostics::Diagnostics;
use crate::error::{CodegenError, PipelineError};
use crate::expansion::{self, FsIncludeResolver, IncludeResolver, InstanceState};
use crate::options::CompilerOptions;
use std::path::{Path, PathBuf};

pub struct CompileOutput {
    pub expanded: Document,
    pub diagnostics: Diagnostics,
    pub instance_states: Vec<InstanceState>,
    pub krb: CodegenOutput,
}

/// Compiles in-memory source text. `resolver` serves any `@include` paths
/// the source references; pass [`FsIncludeResolver`] to read them from disk,
/// or a virtual-filesystem stub to keep everything in memory.
pub fn compile(
    source: &str,
    filename: Option<PathBuf>,
    resolver: &dyn IncludeResolver,
    options: &CompilerOptions,
) -> Result<CompileOutput, PipelineError> {
    log::debug!("lexing/parsing {}", filename.as_deref().map(Path::display).map(|p| p.to_string()).unwrap_or_else(|| "<memory>".into()));
    let (doc, mut diagnostics) = crate::parser::parse(source, filename);

    log::debug!("expanding {} top-level item(s)", doc.items.len());
    let (expanded, expansion_diags, instance_states) = expansion::expand(&doc, &options.expansion, resolver)?;
    diagnostics.extend(expansion_diags);

    if diagnostics.has_blocking_errors() {
        log::warn!("aborting before codegen: {} blocking diagnostic(s)", diagnostics.len());
        return Err(CodegenError::BlockingDiagnostics(diagnostics.len()).into());
    }

    log::debug!("generating KRB from {} expanded item(s)", expanded.items.len());
    let krb = codegen::generate(&expanded, &instance_states, options)?;
    log::debug!("generated {} bytes, {} string(s), {} element(s)", krb.bytes.len(), krb.string_count, krb.element_count);

    Ok(CompileOutput { expanded, diagnostics, instance_states, krb })
}

/// Reads `path` off disk and compiles it, resolving any `@include` relative
/// to the process's current directory (the same convention [`FsIncludeResolver`] uses).
pub fn compile_file(path: impl AsRef<Path>, options: &CompilerOptions) -> Result<CompileOutput, PipelineError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    compile(&source, Some(path.to_path_buf()), &FsIncludeResolver, options)
}

/// Renders the expanded tree as KIR JSON (§4.D), independent of whether the
/// caller also wants the binary — a KIR-only tool doesn't need to touch codegen at all.
pub fn compile_to_kir(
    source: &str,
    filename: Option<PathBuf>,
    resolver: &dyn IncludeResolver,
    options: &CompilerOptions,
) -> Result<(String, Diagnostics), PipelineError> {
    let (doc, mut diagnostics) = crate::parser::parse(source, filename.clone());
    let (expanded, expansion_diags, _) = expansion::expand(&doc, &options.expansion, resolver)?;
    diagnostics.extend(expansion_diags);

    if diagnostics.has_blocking_errors() {
        return Err(CodegenError::BlockingDiagnostics(diagnostics.len()).into());
    }

    let source_file = filename.map(|p| p.display().to_string());
    let json = crate::kir::write(&expanded, options.kir_style, source_file)?;
    Ok((json, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_simple_document_end_to_end() {
        let out = compile(r#"Text { text: "hi"; }"#, None, &FsIncludeResolver, &CompilerOptions::default()).unwrap();
        assert!(out.diagnostics.is_empty(), "{}", out.diagnostics);
        assert_eq!(out.krb.element_count, 1);
        assert!(!out.krb.bytes.is_empty());
    }

    #[test]
    fn compiles_a_component_instance_to_kir() {
        let (json, diagnostics) = compile_to_kir(
            r#"
            @component Counter {
                @state { count: 0 }
                Text { text: $count; }
            }
            Counter { id: "c1"; }
            "#,
            None,
            &FsIncludeResolver,
            &CompilerOptions::default(),
        )
        .unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics}");
        assert!(json.contains("\"kir_version\""));
    }

    #[test]
    fn blocking_diagnostics_abort_before_codegen() {
        let err = compile(r#"Text { text: ; }"#, None, &FsIncludeResolver, &CompilerOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Codegen(CodegenError::BlockingDiagnostics(_))));

        let err =
            compile_to_kir(r#"Text { text: ; }"#, None, &FsIncludeResolver, &CompilerOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Codegen(CodegenError::BlockingDiagnostics(_))));
    }
}
