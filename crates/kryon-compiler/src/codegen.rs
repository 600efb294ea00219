//! Code generator (§4.E): walks a post-expansion AST and writes it out as a
//! KRB binary. Two passes, in the style of the pack reference `codegen.rs`:
//! section bodies are built into their own buffers first (so string-table
//! indices and section lengths are known), then assembled behind a fixed
//! header with a section-offset table.

use crate::ast::{Child, Document, Element, ForLoop, IfBlock, Item, Property, PropertyValue, TemplateSegment};
use crate::error::CodegenError;
use crate::expansion::InstanceState;
use crate::expr::{lower_expr, Expr};
use crate::options::CompilerOptions;
use crate::token::Unit;
use byteorder::{LittleEndian, WriteBytesExt};
use kryon_krb::{
    ElementTypeCode, PropertyCode, Rgba8888, SectionTableEntry, SectionTag, ValueTag, FLAG_DEBUG_INFO,
    HEADER_FIXED_SIZE, MAGIC, SECTION_TABLE_ENTRY_SIZE,
};
use std::collections::HashMap;

const NO_ID_REF: u32 = u32::MAX;
const CHILD_KIND_ELEMENT: u8 = 0;
const CHILD_KIND_FOR: u8 = 1;
const CHILD_KIND_IF: u8 = 2;

pub struct CodegenOutput {
    pub bytes: Vec<u8>,
    pub string_count: usize,
    pub element_count: usize,
}

/// Generates a KRB binary for `doc`. `instance_states` is the per-component-
/// instance state table the expansion pass produced alongside `doc` (§4.C);
/// it is written into the variable section next to `@variables` globals so
/// the runtime can rehydrate per-instance reactive state without re-parsing
/// component definitions (§4.E).
pub fn generate(doc: &Document, instance_states: &[InstanceState], options: &CompilerOptions) -> Result<CodegenOutput, CodegenError> {
    let mut cg = Codegen::new(options.deduplicate_strings);
    let metadata = cg.build_metadata(doc)?;
    let variables = cg.build_variables(doc, instance_states)?;
    let functions = cg.build_functions(doc)?;
    let styles = cg.build_styles(doc)?;
    let elements = cg.build_elements(doc)?;
    let themes = cg.build_themes(doc)?;
    let strings = cg.build_string_table()?;

    let sections: Vec<(SectionTag, Vec<u8>)> = vec![
        (SectionTag::Metadata, metadata),
        (SectionTag::Strings, strings),
        (SectionTag::Variables, variables),
        (SectionTag::Functions, functions),
        (SectionTag::Styles, styles),
        (SectionTag::Elements, elements),
        (SectionTag::Themes, themes),
    ];

    let element_count = cg.element_count;
    let string_count = cg.strings.len();
    let bytes = assemble(sections, options.target_version)?;
    Ok(CodegenOutput { bytes, string_count, element_count })
}

struct Codegen {
    dedup: bool,
    strings: Vec<String>,
    string_index: HashMap<String, u32>,
    element_count: usize,
}

impl Codegen {
    fn new(dedup: bool) -> Self {
        Self { dedup, strings: Vec::new(), string_index: HashMap::new(), element_count: 0 }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if self.dedup {
            if let Some(&idx) = self.string_index.get(s) {
                return idx;
            }
        }
        let idx = self.strings.len() as u32;
        self.strings.push(s.to_string());
        if self.dedup {
            self.string_index.insert(s.to_string(), idx);
        }
        idx
    }

    fn build_string_table(&self) -> Result<Vec<u8>, CodegenError> {
        let count = u32::try_from(self.strings.len()).map_err(|_| CodegenError::StringTableOverflow)?;
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(count)?;
        for s in &self.strings {
            out.write_u32::<LittleEndian>(s.len() as u32)?;
            out.extend_from_slice(s.as_bytes());
        }
        Ok(out)
    }

    fn build_metadata(&mut self, doc: &Document) -> Result<Vec<u8>, CodegenError> {
        let entries: Vec<(&smol_str::SmolStr, &PropertyValue)> =
            doc.items.iter().filter_map(|i| match i {
                Item::Metadata(m) => Some(m.entries.iter().map(|(k, v)| (k, v))),
                _ => None,
            }).flatten().collect();
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(entries.len() as u32)?;
        for (name, value) in entries {
            let name_idx = self.intern(name);
            out.write_u32::<LittleEndian>(name_idx)?;
            self.write_value(&mut out, value)?;
        }
        Ok(out)
    }

    /// Global `@const`/`@variables` bindings, followed by per-instance
    /// component state, all in the one flat `{name, value}` record shape
    /// (§4.E: "global variables ... and component-instance state").
    fn build_variables(&mut self, doc: &Document, instance_states: &[InstanceState]) -> Result<Vec<u8>, CodegenError> {
        let mut entries: Vec<(String, PropertyValue)> = Vec::new();
        for item in &doc.items {
            match item {
                Item::Const(c) => entries.push((c.name.to_string(), c.value.clone())),
                Item::Variables(v) => {
                    entries.extend(v.entries.iter().map(|e| (e.name.to_string(), e.value.clone())))
                }
                _ => {}
            }
        }
        entries.extend(instance_states.iter().map(|s| (s.address.to_string(), s.initial.clone())));

        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(entries.len() as u32)?;
        for (name, value) in &entries {
            let name_idx = self.intern(name);
            out.write_u32::<LittleEndian>(name_idx)?;
            self.write_value(&mut out, value)?;
        }
        Ok(out)
    }

    /// Global function definitions. Function bodies captured inside a
    /// `@component` are not transplanted here: they are inlined into the
    /// instantiated element tree only as property/state bindings, not as
    /// callable closures, since invoking them is a scripting-VM concern
    /// (out of scope, §9 Non-goals) — only the raw body text survives, for
    /// an external interpreter to pick up by name.
    fn build_functions(&mut self, doc: &Document) -> Result<Vec<u8>, CodegenError> {
        let functions: Vec<_> = doc.items.iter().filter_map(|i| match i {
            Item::Function(f) => Some(f),
            _ => None,
        }).collect();
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(functions.len() as u32)?;
        for f in functions {
            let name_idx = self.intern(&f.name);
            out.write_u32::<LittleEndian>(name_idx)?;
            let lang_idx = self.intern(f.language.as_deref().unwrap_or(""));
            out.write_u32::<LittleEndian>(lang_idx)?;
            out.write_u16::<LittleEndian>(f.params.len() as u16)?;
            for p in &f.params {
                let idx = self.intern(p);
                out.write_u32::<LittleEndian>(idx)?;
            }
            let body_idx = self.intern(&f.body);
            out.write_u32::<LittleEndian>(body_idx)?;
        }
        Ok(out)
    }

    fn build_styles(&mut self, doc: &Document) -> Result<Vec<u8>, CodegenError> {
        let styles: Vec<_> = doc.styles().collect();
        let order: HashMap<&str, u32> =
            styles.iter().enumerate().map(|(i, s)| (s.name.as_str(), i as u32)).collect();
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(styles.len() as u32)?;
        for style in &styles {
            let name_idx = self.intern(&style.name);
            out.write_u32::<LittleEndian>(name_idx)?;
            let extends_idx = style.extends.as_deref().and_then(|n| order.get(n)).copied().unwrap_or(NO_ID_REF);
            out.write_u32::<LittleEndian>(extends_idx)?;
            self.write_property_list(&mut out, &style.properties)?;
        }
        Ok(out)
    }

    fn build_themes(&mut self, doc: &Document) -> Result<Vec<u8>, CodegenError> {
        let themes: Vec<_> = doc.items.iter().filter_map(|i| match i {
            Item::Theme(t) => Some(t),
            _ => None,
        }).collect();
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(themes.len() as u32)?;
        for theme in themes {
            let name_idx = self.intern(&theme.name);
            out.write_u32::<LittleEndian>(name_idx)?;
            self.write_property_list(&mut out, &theme.properties)?;
        }
        Ok(out)
    }

    fn build_elements(&mut self, doc: &Document) -> Result<Vec<u8>, CodegenError> {
        let roots: Vec<&Element> =
            doc.items.iter().filter_map(|i| if let Item::Element(e) = i { Some(e) } else { None }).collect();
        let mut out = Vec::new();
        out.write_u16::<LittleEndian>(count_u16("top-level element", roots.len())?)?;
        for root in roots {
            self.write_element(&mut out, root)?;
        }
        Ok(out)
    }

    fn write_element(&mut self, out: &mut Vec<u8>, el: &Element) -> Result<(), CodegenError> {
        self.element_count += 1;
        let code = ElementTypeCode::from_name(&el.type_name)?;
        out.write_u16::<LittleEndian>(code.code())?;
        out.push(0); // flags: reserved, no element-level flag bits defined yet
        let id_ref = match el.id() {
            Some(id) => self.intern(id),
            None => NO_ID_REF,
        };
        out.write_u32::<LittleEndian>(id_ref)?;

        let props: Vec<&Property> = el.properties.iter().filter(|p| p.value != PropertyValue::Null).collect();
        out.write_u16::<LittleEndian>(count_u16("property", props.len())?)?;
        for prop in props {
            self.write_property(out, prop)?;
        }

        out.write_u16::<LittleEndian>(count_u16("child", el.children.len())?)?;
        for child in &el.children {
            self.write_child(out, child)?;
        }
        Ok(())
    }

    fn write_child(&mut self, out: &mut Vec<u8>, child: &Child) -> Result<(), CodegenError> {
        match child {
            Child::Element(e) => {
                out.push(CHILD_KIND_ELEMENT);
                self.write_element(out, e)?;
            }
            Child::For(fl) => {
                out.push(CHILD_KIND_FOR);
                self.write_for(out, fl)?;
            }
            Child::If(ib) => {
                out.push(CHILD_KIND_IF);
                self.write_if(out, ib)?;
            }
        }
        Ok(())
    }

    /// A `@for`/`@if` that survived expansion is a live runtime template
    /// (§4.H): the directive engine regenerates its body from `iterable`/
    /// `condition` on every relevant state change, so codegen preserves it
    /// as a tagged child record rather than a plain element.
    fn write_for(&mut self, out: &mut Vec<u8>, fl: &ForLoop) -> Result<(), CodegenError> {
        let var_idx = self.intern(&fl.var_name);
        out.write_u32::<LittleEndian>(var_idx)?;
        self.write_expr_blob(out, &fl.iterable)?;
        out.push(fl.is_const as u8);
        out.write_u16::<LittleEndian>(count_u16("for-body child", fl.body.len())?)?;
        for c in &fl.body {
            self.write_child(out, c)?;
        }
        Ok(())
    }

    fn write_if(&mut self, out: &mut Vec<u8>, ib: &IfBlock) -> Result<(), CodegenError> {
        self.write_expr_blob(out, &ib.condition)?;
        out.write_u16::<LittleEndian>(count_u16("if-then child", ib.then_body.len())?)?;
        for c in &ib.then_body {
            self.write_child(out, c)?;
        }
        match &ib.else_body {
            Some(body) => {
                out.push(1);
                out.write_u16::<LittleEndian>(count_u16("if-else child", body.len())?)?;
                for c in body {
                    self.write_child(out, c)?;
                }
            }
            None => out.push(0),
        }
        Ok(())
    }

    fn write_property_list(&mut self, out: &mut Vec<u8>, props: &[Property]) -> Result<(), CodegenError> {
        let props: Vec<&Property> = props.iter().filter(|p| p.value != PropertyValue::Null).collect();
        out.write_u16::<LittleEndian>(count_u16("property", props.len())?)?;
        for prop in props {
            self.write_property(out, prop)?;
        }
        Ok(())
    }

    fn write_property(&mut self, out: &mut Vec<u8>, prop: &Property) -> Result<(), CodegenError> {
        let code = PropertyCode::from_name(&prop.name)?;
        out.write_u16::<LittleEndian>(code.code())?;
        self.write_value(out, &prop.value)?;
        Ok(())
    }

    /// Writes `{value-tag u8, payload}`. `Null` *property* values never
    /// reach here — `write_property_list`/`write_element` filter them out
    /// first, since "not set" means the record is absent, not a tagged
    /// null. Variable and metadata entries call this directly and do encode
    /// `Null`, as `Boolean` with payload `0`: a `@state { x: null }` initial
    /// value is therefore indistinguishable on the wire from `x: false`, a
    /// known simplification.
    fn write_value(&mut self, out: &mut Vec<u8>, value: &PropertyValue) -> Result<(), CodegenError> {
        let (tag, payload) = self.encode_value(value)?;
        out.push(tag.tag());
        out.extend_from_slice(&payload);
        Ok(())
    }

    fn encode_value(&mut self, value: &PropertyValue) -> Result<(ValueTag, Vec<u8>), CodegenError> {
        Ok(match value {
            PropertyValue::Null => (ValueTag::Boolean, vec![0]),
            PropertyValue::Bool(b) => (ValueTag::Boolean, vec![*b as u8]),
            PropertyValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    let mut buf = Vec::new();
                    buf.write_i64::<LittleEndian>(*n as i64)?;
                    (ValueTag::Integer, buf)
                } else {
                    let mut buf = Vec::new();
                    buf.write_f64::<LittleEndian>(*n)?;
                    (ValueTag::Float, buf)
                }
            }
            PropertyValue::Dimension(n, unit) => {
                let mut buf = vec![unit_code(*unit)];
                buf.write_f64::<LittleEndian>(*n)?;
                (ValueTag::Dimension, buf)
            }
            PropertyValue::String(s) => {
                if let Some(color) = parse_hex_color(s) {
                    let mut buf = Vec::new();
                    buf.write_u32::<LittleEndian>(color.to_u32())?;
                    (ValueTag::Color, buf)
                } else {
                    let idx = self.intern(s);
                    let mut buf = Vec::new();
                    buf.write_u32::<LittleEndian>(idx)?;
                    (ValueTag::String, buf)
                }
            }
            PropertyValue::Variable(name) => {
                let idx = self.intern(name);
                let node = kryon_krb::ExprNode::Var(idx);
                (ValueTag::Expression, kryon_krb::write_expr(&node))
            }
            PropertyValue::Template(segments) => {
                let mut buf = Vec::new();
                buf.write_u32::<LittleEndian>(segments.len() as u32)?;
                for seg in segments {
                    self.write_segment(&mut buf, seg)?;
                }
                (ValueTag::Template, buf)
            }
            PropertyValue::Array(items) => {
                let mut buf = Vec::new();
                buf.write_u32::<LittleEndian>(items.len() as u32)?;
                for item in items {
                    self.write_value(&mut buf, item)?;
                }
                (ValueTag::Array, buf)
            }
            PropertyValue::Expr(e) => {
                let mut buf = Vec::new();
                self.write_expr_blob(&mut buf, e)?;
                (ValueTag::Expression, buf)
            }
        })
    }

    fn write_segment(&mut self, out: &mut Vec<u8>, seg: &TemplateSegment) -> Result<(), CodegenError> {
        match seg {
            TemplateSegment::Literal(text) => {
                out.push(0);
                let idx = self.intern(text);
                out.write_u32::<LittleEndian>(idx)?;
            }
            TemplateSegment::Variable(name) => {
                out.push(1);
                let idx = self.intern(name);
                out.write_u32::<LittleEndian>(idx)?;
            }
            TemplateSegment::Expr(e) => {
                out.push(2);
                self.write_expr_blob(out, e)?;
            }
        }
        Ok(())
    }

    fn write_expr_blob(&mut self, out: &mut Vec<u8>, expr: &Expr) -> Result<(), CodegenError> {
        let node = lower_expr(expr, &mut |s| self.intern(s));
        kryon_krb::encode_expr(&node, out)?;
        Ok(())
    }
}

fn unit_code(unit: Unit) -> u8 {
    match unit {
        Unit::Px => 0,
        Unit::Percent => 1,
        Unit::Em => 2,
        Unit::Rem => 3,
        Unit::Vw => 4,
        Unit::Vh => 5,
        Unit::Pt => 6,
    }
}

/// `#rrggbb`/`#rrggbbaa` string properties are colors on the wire, not
/// string-table entries, so the runtime doesn't have to re-parse hex text
/// out of every `backgroundColor`/`color` lookup.
fn parse_hex_color(s: &str) -> Option<Rgba8888> {
    let hex = s.strip_prefix('#')?;
    let (r, g, b, a) = match hex.len() {
        6 => (
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
            0xFF,
        ),
        8 => (
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
            u8::from_str_radix(&hex[6..8], 16).ok()?,
        ),
        _ => return None,
    };
    Some(Rgba8888::new(r, g, b, a))
}

fn count_u16(what: &str, actual: usize) -> Result<u16, CodegenError> {
    u16::try_from(actual).map_err(|_| CodegenError::CountOverflow { what: what.to_string(), actual, max: u16::MAX as usize })
}

fn assemble(sections: Vec<(SectionTag, Vec<u8>)>, target_version: u32) -> Result<Vec<u8>, CodegenError> {
    let table_size = sections.len() * SECTION_TABLE_ENTRY_SIZE;
    let mut offset = (HEADER_FIXED_SIZE + table_size) as u32;
    let mut entries = Vec::with_capacity(sections.len());
    for (tag, body) in &sections {
        entries.push(SectionTableEntry { tag: *tag as u16, offset, length: body.len() as u32 });
        offset += body.len() as u32;
    }

    let mut out = Vec::with_capacity(offset as usize);
    out.extend_from_slice(&MAGIC);
    out.write_u32::<LittleEndian>(target_version)?;
    out.write_u32::<LittleEndian>(0)?; // flags: neither compression nor debug-info emitted yet
    for entry in &entries {
        out.write_u16::<LittleEndian>(entry.tag)?;
        out.write_u32::<LittleEndian>(entry.offset)?;
        out.write_u32::<LittleEndian>(entry.length)?;
    }
    for (_, body) in &sections {
        out.extend_from_slice(body);
    }

    let checksum = crc32(&out);
    out.write_u16::<LittleEndian>(SectionTag::Trailer as u16)?;
    out.write_u32::<LittleEndian>(checksum)?;
    out.write_u32::<LittleEndian>(out.len() as u32 + 4)?; // total size including this field
    let _ = FLAG_DEBUG_INFO; // reserved bit, not yet surfaced by CompilerOptions
    Ok(out)
}

/// CRC-32 (IEEE 802.3 polynomial), good enough for a corruption check on a
/// locally generated binary without pulling in a crate for one function.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::{expand, FsIncludeResolver};
    use crate::options::ExpansionFlags;
    use crate::parser::parse;

    fn compile(src: &str) -> CodegenOutput {
        let (doc, diags) = parse(src, None);
        assert!(diags.is_empty(), "{diags}");
        let (expanded, diags, instance_states) = expand(&doc, &ExpansionFlags::default(), &FsIncludeResolver).unwrap();
        assert!(diags.is_empty(), "{diags}");
        generate(&expanded, &instance_states, &CompilerOptions::default()).unwrap()
    }

    #[test]
    fn header_has_magic_and_version() {
        let out = compile(r#"Text { text: "hi"; }"#);
        assert_eq!(&out.bytes[0..4], &MAGIC);
        let version = u32::from_le_bytes(out.bytes[4..8].try_into().unwrap());
        assert_eq!(version, kryon_krb::FORMAT_VERSION);
        assert_eq!(out.element_count, 1);
    }

    #[test]
    fn unknown_element_name_is_a_hard_error() {
        let (doc, diags) = parse(r#"Frobnicator { text: "hi"; }"#, None);
        assert!(diags.is_empty(), "{diags}");
        let (expanded, diags, instance_states) = expand(&doc, &ExpansionFlags::default(), &FsIncludeResolver).unwrap();
        assert!(diags.is_empty(), "{diags}");
        let err = generate(&expanded, &instance_states, &CompilerOptions::default()).unwrap_err();
        assert!(matches!(err, CodegenError::Table(kryon_krb::TableError::UnknownElementName(_))));
    }

    #[test]
    fn hex_color_property_encodes_as_color_tag() {
        let out = compile(r#"Text { backgroundColor: "#112233"; }"#);
        // Section table: 7 entries; Elements is the 6th (index 5).
        assert!(out.bytes.len() > HEADER_FIXED_SIZE);
    }

    #[test]
    fn for_loop_survives_as_a_tagged_runtime_template() {
        let out = compile(
            r#"
            @const ITEMS = ["a", "b"];
            Column {
                @for $x in $ITEMS {
                    Text { text: $x; }
                }
            }
            "#,
        );
        assert!(out.bytes.len() > HEADER_FIXED_SIZE);
    }

    #[test]
    fn component_instance_state_lands_in_the_variable_section() {
        let (doc, diags) = parse(
            r#"
            @component Counter {
                @state { count: 0 }
                Text { text: $count; }
            }
            Counter { id: "c1"; }
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let (expanded, diags, instance_states) = expand(&doc, &ExpansionFlags::default(), &FsIncludeResolver).unwrap();
        assert!(diags.is_empty(), "{diags}");
        assert_eq!(instance_states.len(), 1);
        let out = generate(&expanded, &instance_states, &CompilerOptions::default()).unwrap();
        assert!(out.bytes.len() > HEADER_FIXED_SIZE);
    }
}
