//! KRB reader (§4.F): walks a binary produced by the compiler's code
//! generator and materializes the runtime's own structures — it never
//! shares types with `kryon-compiler`, only the wire-format tables in
//! `kryon-krb`, so the runtime can load a KRB without linking the compiler.
//!
//! Section layout is fixed (Metadata, Strings, Variables, Functions, Styles,
//! Elements, Themes, then a Trailer that isn't in the section table since it
//! always immediately follows the last registered section): see
//! `kryon-compiler`'s `codegen::assemble`, which this mirrors byte for byte.

use crate::error::LoadError;
use crate::item_tree::{ChildSlot, ChildSlotTemplate, ChildTemplate, Element, ElementTemplate, ItemTree};
use crate::value::{RuntimeValue, TemplateSegment, Unit};
use byteorder::{LittleEndian, ReadBytesExt};
use kryon_krb::{decode_expr, ElementTypeCode, PropertyCode, Rgba8888, SectionTag, ValueTag, HEADER_FIXED_SIZE, MAGIC, SECTION_TABLE_ENTRY_SIZE};
use std::collections::HashMap;
use std::io::Cursor;

const EXPECTED_SECTIONS: [SectionTag; 7] = [
    SectionTag::Metadata,
    SectionTag::Strings,
    SectionTag::Variables,
    SectionTag::Functions,
    SectionTag::Styles,
    SectionTag::Elements,
    SectionTag::Themes,
];

pub struct RuntimeFunction {
    pub name: String,
    pub language: Option<String>,
    pub params: Vec<String>,
    pub body: String,
}

pub struct RuntimeStyle {
    pub name: String,
    pub extends: Option<String>,
    pub properties: Vec<(PropertyCode, RuntimeValue)>,
}

pub struct RuntimeTheme {
    pub name: String,
    pub properties: Vec<(PropertyCode, RuntimeValue)>,
}

pub struct KrbDocument {
    pub metadata: Vec<(String, RuntimeValue)>,
    pub variables: HashMap<String, RuntimeValue>,
    pub functions: Vec<RuntimeFunction>,
    pub styles: Vec<RuntimeStyle>,
    pub themes: Vec<RuntimeTheme>,
    pub tree: ItemTree,
    /// The binary's own string table, kept around so expression nodes
    /// embedded in property/variable values (which reference it by index)
    /// can still be evaluated after loading.
    pub strings: Vec<String>,
}

pub fn load(bytes: &[u8]) -> Result<KrbDocument, LoadError> {
    if bytes.len() < HEADER_FIXED_SIZE || bytes[0..4] != MAGIC {
        return Err(LoadError::BadMagic);
    }
    let mut cursor = Cursor::new(bytes);
    cursor.set_position(4);
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != kryon_krb::FORMAT_VERSION {
        return Err(LoadError::UnsupportedVersion(version));
    }
    let _flags = cursor.read_u32::<LittleEndian>()?;

    let mut ranges = HashMap::new();
    for expected in EXPECTED_SECTIONS {
        let tag = cursor.read_u16::<LittleEndian>()?;
        let offset = cursor.read_u32::<LittleEndian>()?;
        let length = cursor.read_u32::<LittleEndian>()?;
        let found = SectionTag::from_u16(tag).ok_or_else(|| LoadError::TruncatedSection(expected))?;
        ranges.insert(found, (offset as usize, length as usize));
    }
    debug_assert_eq!(cursor.position() as usize, HEADER_FIXED_SIZE + EXPECTED_SECTIONS.len() * SECTION_TABLE_ENTRY_SIZE);

    let section_bytes = |tag: SectionTag| -> Result<&[u8], LoadError> {
        let (offset, length) = *ranges.get(&tag).ok_or(LoadError::TruncatedSection(tag))?;
        bytes.get(offset..offset + length).ok_or(LoadError::TruncatedSection(tag))
    };

    verify_trailer(bytes)?;

    let strings = read_strings(section_bytes(SectionTag::Strings)?)?;
    let metadata = read_name_value_list(section_bytes(SectionTag::Metadata)?, &strings)?;
    let variables = read_name_value_list(section_bytes(SectionTag::Variables)?, &strings)?.into_iter().collect();
    let functions = read_functions(section_bytes(SectionTag::Functions)?, &strings)?;
    let styles = read_styles(section_bytes(SectionTag::Styles)?, &strings)?;
    let themes = read_themes(section_bytes(SectionTag::Themes)?, &strings)?;
    let tree = read_elements(section_bytes(SectionTag::Elements)?, &strings)?;

    log::debug!("loaded KRB: {} string(s), {} element(s)", strings.len(), tree.len());
    Ok(KrbDocument { metadata, variables, functions, styles, themes, tree, strings })
}

/// The trailer isn't in the section table — it's whatever 10 bytes sit at
/// the very end (`{tag u16, checksum u32, total-size u32}`), covering every
/// byte written before it.
fn verify_trailer(bytes: &[u8]) -> Result<(), LoadError> {
    if bytes.len() < 10 {
        return Err(LoadError::TruncatedSection(SectionTag::Trailer));
    }
    let body_len = bytes.len() - 10;
    let mut trailer = Cursor::new(&bytes[body_len..]);
    let _tag = trailer.read_u16::<LittleEndian>()?;
    let expected = trailer.read_u32::<LittleEndian>()?;
    let computed = crc32(&bytes[..body_len]);
    if expected != computed {
        return Err(LoadError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

/// CRC-32 (IEEE 802.3 polynomial), matching the compiler's codegen-side
/// checksum exactly — this isn't the standard CRC32 crate's table, just the
/// same hand-rolled bit loop on both ends of the wire.
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

fn read_strings(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u32::<LittleEndian>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = cursor.read_u32::<LittleEndian>()? as usize;
        let start = cursor.position() as usize;
        let slice = bytes.get(start..start + len).ok_or(LoadError::TruncatedSection(SectionTag::Strings))?;
        out.push(String::from_utf8_lossy(slice).into_owned());
        cursor.set_position((start + len) as u64);
    }
    Ok(out)
}

fn lookup<'a>(strings: &'a [String], idx: u32) -> Result<&'a str, LoadError> {
    strings.get(idx as usize).map(String::as_str).ok_or(LoadError::DanglingStringRef(idx))
}

fn read_name_value_list(bytes: &[u8], strings: &[String]) -> Result<Vec<(String, RuntimeValue)>, LoadError> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u32::<LittleEndian>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_idx = cursor.read_u32::<LittleEndian>()?;
        let name = lookup(strings, name_idx)?.to_string();
        let value = read_value(&mut cursor, strings)?;
        out.push((name, value));
    }
    Ok(out)
}

fn read_functions(bytes: &[u8], strings: &[String]) -> Result<Vec<RuntimeFunction>, LoadError> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u32::<LittleEndian>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string();
        let language = lookup(strings, cursor.read_u32::<LittleEndian>()?)?;
        let language = if language.is_empty() { None } else { Some(language.to_string()) };
        let param_count = cursor.read_u16::<LittleEndian>()?;
        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string());
        }
        let body = lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string();
        out.push(RuntimeFunction { name, language, params, body });
    }
    Ok(out)
}

fn read_property_list(cursor: &mut Cursor<&[u8]>, strings: &[String]) -> Result<Vec<(PropertyCode, RuntimeValue)>, LoadError> {
    let count = cursor.read_u16::<LittleEndian>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let code = PropertyCode::from_code(cursor.read_u16::<LittleEndian>()?)?;
        let value = read_value(cursor, strings)?;
        out.push((code, value));
    }
    Ok(out)
}

fn read_styles(bytes: &[u8], strings: &[String]) -> Result<Vec<RuntimeStyle>, LoadError> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u32::<LittleEndian>()?;
    let mut names = Vec::with_capacity(count as usize);
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string();
        let extends_idx = cursor.read_u32::<LittleEndian>()?;
        names.push((name, extends_idx));
        let properties = read_property_list(&mut cursor, strings)?;
        out.push(RuntimeStyle { name: names.last().unwrap().0.clone(), extends: None, properties });
    }
    for (style, (_, extends_idx)) in out.iter_mut().zip(&names) {
        if *extends_idx != u32::MAX {
            style.extends = names.get(*extends_idx as usize).map(|(n, _)| n.clone());
        }
    }
    Ok(out)
}

fn read_themes(bytes: &[u8], strings: &[String]) -> Result<Vec<RuntimeTheme>, LoadError> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u32::<LittleEndian>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string();
        let properties = read_property_list(&mut cursor, strings)?;
        out.push(RuntimeTheme { name, properties });
    }
    Ok(out)
}

const CHILD_KIND_ELEMENT: u8 = 0;
const CHILD_KIND_FOR: u8 = 1;
const CHILD_KIND_IF: u8 = 2;

fn read_elements(bytes: &[u8], strings: &[String]) -> Result<ItemTree, LoadError> {
    let mut cursor = Cursor::new(bytes);
    let mut tree = ItemTree::new();
    let count = cursor.read_u16::<LittleEndian>()?;
    let mut roots = Vec::with_capacity(count as usize);
    for _ in 0..count {
        roots.push(read_element(&mut cursor, strings, &mut tree, None)?);
    }
    tree.root = roots.first().copied();
    Ok(tree)
}

fn read_element(
    cursor: &mut Cursor<&[u8]>,
    strings: &[String],
    tree: &mut ItemTree,
    parent: Option<crate::item_tree::ElementId>,
) -> Result<crate::item_tree::ElementId, LoadError> {
    let type_code = ElementTypeCode::from_code(cursor.read_u16::<LittleEndian>()?)?;
    let _flags = cursor.read_u8()?;
    let id_ref = cursor.read_u32::<LittleEndian>()?;
    let user_id = if id_ref == u32::MAX { None } else { Some(lookup(strings, id_ref)?.to_string()) };

    let prop_count = cursor.read_u16::<LittleEndian>()?;
    let mut element = Element::new(0, type_code);
    element.parent = parent;
    element.user_id = user_id;
    for _ in 0..prop_count {
        let code = PropertyCode::from_code(cursor.read_u16::<LittleEndian>()?)?;
        let value = read_value(cursor, strings)?;
        element.properties.insert(code, value);
    }

    let id = tree.insert(element);

    let child_count = cursor.read_u16::<LittleEndian>()?;
    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        children.push(read_child(cursor, strings, tree, id)?);
    }
    tree.get_mut(id).expect("just inserted").children = children;
    Ok(id)
}

fn read_child(
    cursor: &mut Cursor<&[u8]>,
    strings: &[String],
    tree: &mut ItemTree,
    parent: crate::item_tree::ElementId,
) -> Result<ChildSlot, LoadError> {
    match cursor.read_u8()? {
        CHILD_KIND_ELEMENT => Ok(ChildSlot::Element(read_element(cursor, strings, tree, Some(parent))?)),
        CHILD_KIND_FOR => Ok(ChildSlot::Template { template: read_for(cursor, strings)?, materialized: Vec::new() }),
        CHILD_KIND_IF => Ok(ChildSlot::Template { template: read_if(cursor, strings)?, materialized: Vec::new() }),
        other => Err(LoadError::UnknownChildKind(other)),
    }
}

fn read_for(cursor: &mut Cursor<&[u8]>, strings: &[String]) -> Result<ChildTemplate, LoadError> {
    let var_name = lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string();
    let iterable = read_expr_blob(cursor)?;
    let is_const = cursor.read_u8()? != 0;
    let count = cursor.read_u16::<LittleEndian>()?;
    let mut body = Vec::with_capacity(count as usize);
    for _ in 0..count {
        body.push(read_child_template(cursor, strings)?);
    }
    Ok(ChildTemplate::For { var_name, iterable, body: body.into_iter().filter_map(only_elements).collect(), is_const })
}

fn read_if(cursor: &mut Cursor<&[u8]>, strings: &[String]) -> Result<ChildTemplate, LoadError> {
    let condition = read_expr_blob(cursor)?;
    let then_count = cursor.read_u16::<LittleEndian>()?;
    let mut then_body = Vec::with_capacity(then_count as usize);
    for _ in 0..then_count {
        then_body.push(read_child_template(cursor, strings)?);
    }
    let has_else = cursor.read_u8()? != 0;
    let mut else_body = Vec::new();
    if has_else {
        let else_count = cursor.read_u16::<LittleEndian>()?;
        for _ in 0..else_count {
            else_body.push(read_child_template(cursor, strings)?);
        }
    }
    Ok(ChildTemplate::If {
        condition,
        then_body: then_body.into_iter().filter_map(only_elements).collect(),
        else_body: else_body.into_iter().filter_map(only_elements).collect(),
    })
}

/// A nested `@for`/`@if` directly inside another template body is collapsed
/// away rather than represented, since the directive engine only needs a
/// flat list of element shapes to clone per iteration; deeply nested control
/// flow inside a loop body is rare enough that this is a documented
/// simplification rather than a full recursive template tree.
fn only_elements(slot: ChildSlotTemplate) -> Option<ElementTemplate> {
    match slot {
        ChildSlotTemplate::Element(t) => Some(t),
        ChildSlotTemplate::Template(_) => None,
    }
}

fn read_child_template(cursor: &mut Cursor<&[u8]>, strings: &[String]) -> Result<ChildSlotTemplate, LoadError> {
    match cursor.read_u8()? {
        CHILD_KIND_ELEMENT => Ok(ChildSlotTemplate::Element(read_element_template(cursor, strings)?)),
        CHILD_KIND_FOR => Ok(ChildSlotTemplate::Template(read_for(cursor, strings)?)),
        CHILD_KIND_IF => Ok(ChildSlotTemplate::Template(read_if(cursor, strings)?)),
        other => Err(LoadError::UnknownChildKind(other)),
    }
}

fn read_element_template(cursor: &mut Cursor<&[u8]>, strings: &[String]) -> Result<ElementTemplate, LoadError> {
    let type_code = ElementTypeCode::from_code(cursor.read_u16::<LittleEndian>()?)?;
    let _flags = cursor.read_u8()?;
    let id_ref = cursor.read_u32::<LittleEndian>()?;
    let user_id = if id_ref == u32::MAX { None } else { Some(lookup(strings, id_ref)?.to_string()) };
    let prop_count = cursor.read_u16::<LittleEndian>()?;
    let mut properties = Vec::with_capacity(prop_count as usize);
    for _ in 0..prop_count {
        let code = PropertyCode::from_code(cursor.read_u16::<LittleEndian>()?)?;
        properties.push((code, read_value(cursor, strings)?));
    }
    let child_count = cursor.read_u16::<LittleEndian>()?;
    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        children.push(read_child_template(cursor, strings)?);
    }
    Ok(ElementTemplate { type_code, user_id, properties, children })
}

fn read_expr_blob(cursor: &mut Cursor<&[u8]>) -> Result<kryon_krb::ExprNode, LoadError> {
    Ok(decode_expr(cursor)?)
}

fn read_value(cursor: &mut Cursor<&[u8]>, strings: &[String]) -> Result<RuntimeValue, LoadError> {
    let tag = ValueTag::from_tag(cursor.read_u8()?)?;
    Ok(match tag {
        ValueTag::Boolean => RuntimeValue::Bool(cursor.read_u8()? != 0),
        ValueTag::Integer => RuntimeValue::Int(cursor.read_i64::<LittleEndian>()?),
        ValueTag::Float => RuntimeValue::Float(cursor.read_f64::<LittleEndian>()?),
        ValueTag::Dimension => {
            let unit = Unit::from_code(cursor.read_u8()?);
            RuntimeValue::Dimension(cursor.read_f64::<LittleEndian>()?, unit)
        }
        ValueTag::String => RuntimeValue::String(lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string()),
        ValueTag::Color => RuntimeValue::Color(Rgba8888::from_u32(cursor.read_u32::<LittleEndian>()?)),
        ValueTag::Reference => RuntimeValue::Reference(cursor.read_u32::<LittleEndian>()?),
        ValueTag::Expression => RuntimeValue::Expr(read_expr_blob(cursor)?),
        ValueTag::Array => {
            let count = cursor.read_u32::<LittleEndian>()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_value(cursor, strings)?);
            }
            RuntimeValue::Array(items)
        }
        ValueTag::Template => {
            let count = cursor.read_u32::<LittleEndian>()?;
            let mut segments = Vec::with_capacity(count as usize);
            for _ in 0..count {
                segments.push(match cursor.read_u8()? {
                    0 => TemplateSegment::Literal(lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string()),
                    1 => TemplateSegment::Variable(lookup(strings, cursor.read_u32::<LittleEndian>()?)?.to_string()),
                    _ => TemplateSegment::Expr(read_expr_blob(cursor)?),
                });
            }
            RuntimeValue::Template(segments)
        }
    })
}
