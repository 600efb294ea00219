//! Binary encoding of expression trees (§4.E: the `expression` value-tag payload).
//!
//! Both the compiler (encoding an AST expression during codegen) and the
//! runtime (decoding a property payload before evaluation) work over this
//! same `ExprNode`, so there is exactly one definition of "what an
//! expression looks like on the wire" for the whole pipeline.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Mod = 4,
    Eq = 5,
    Ne = 6,
    Lt = 7,
    Gt = 8,
    Le = 9,
    Ge = 10,
    And = 11,
    Or = 12,
}

impl BinOp {
    fn from_u8(v: u8) -> io::Result<Self> {
        Ok(match v {
            0 => Self::Add,
            1 => Self::Sub,
            2 => Self::Mul,
            3 => Self::Div,
            4 => Self::Mod,
            5 => Self::Eq,
            6 => Self::Ne,
            7 => Self::Lt,
            8 => Self::Gt,
            9 => Self::Le,
            10 => Self::Ge,
            11 => Self::And,
            12 => Self::Or,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown binary operator tag {other}"),
                ))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnOp {
    Neg = 0,
    Not = 1,
}

impl UnOp {
    fn from_u8(v: u8) -> io::Result<Self> {
        Ok(match v {
            0 => Self::Neg,
            1 => Self::Not,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown unary operator tag {other}"),
                ))
            }
        })
    }
}

/// A literal value inside an expression tree. Strings are string-table indices,
/// same as any other string-typed payload in the binary (§4.E).
#[derive(Debug, Clone, PartialEq)]
pub enum ExprLiteral {
    Null,
    Bool(bool),
    Number(f64),
    StringRef(u32),
}

/// The expression tree shape shared by compiler and runtime (§3 "Expression node").
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Literal(ExprLiteral),
    /// Named variable reference (`$name`), stored as a string-table index.
    Var(u32),
    Unary(UnOp, Box<ExprNode>),
    Binary(BinOp, Box<ExprNode>, Box<ExprNode>),
    Ternary(Box<ExprNode>, Box<ExprNode>, Box<ExprNode>),
}

const TAG_LITERAL_NULL: u8 = 0;
const TAG_LITERAL_BOOL: u8 = 1;
const TAG_LITERAL_NUMBER: u8 = 2;
const TAG_LITERAL_STRING_REF: u8 = 3;
const TAG_VAR: u8 = 4;
const TAG_UNARY: u8 = 5;
const TAG_BINARY: u8 = 6;
const TAG_TERNARY: u8 = 7;

pub fn encode_expr(node: &ExprNode, out: &mut Vec<u8>) -> io::Result<()> {
    match node {
        ExprNode::Literal(ExprLiteral::Null) => out.write_u8(TAG_LITERAL_NULL),
        ExprNode::Literal(ExprLiteral::Bool(b)) => {
            out.write_u8(TAG_LITERAL_BOOL)?;
            out.write_u8(*b as u8)
        }
        ExprNode::Literal(ExprLiteral::Number(n)) => {
            out.write_u8(TAG_LITERAL_NUMBER)?;
            out.write_f64::<LittleEndian>(*n)
        }
        ExprNode::Literal(ExprLiteral::StringRef(idx)) => {
            out.write_u8(TAG_LITERAL_STRING_REF)?;
            out.write_u32::<LittleEndian>(*idx)
        }
        ExprNode::Var(idx) => {
            out.write_u8(TAG_VAR)?;
            out.write_u32::<LittleEndian>(*idx)
        }
        ExprNode::Unary(op, inner) => {
            out.write_u8(TAG_UNARY)?;
            out.write_u8(*op as u8)?;
            encode_expr(inner, out)
        }
        ExprNode::Binary(op, lhs, rhs) => {
            out.write_u8(TAG_BINARY)?;
            out.write_u8(*op as u8)?;
            encode_expr(lhs, out)?;
            encode_expr(rhs, out)
        }
        ExprNode::Ternary(cond, a, b) => {
            out.write_u8(TAG_TERNARY)?;
            encode_expr(cond, out)?;
            encode_expr(a, out)?;
            encode_expr(b, out)
        }
    }
}

pub fn decode_expr(cursor: &mut Cursor<&[u8]>) -> io::Result<ExprNode> {
    let tag = cursor.read_u8()?;
    Ok(match tag {
        TAG_LITERAL_NULL => ExprNode::Literal(ExprLiteral::Null),
        TAG_LITERAL_BOOL => ExprNode::Literal(ExprLiteral::Bool(cursor.read_u8()? != 0)),
        TAG_LITERAL_NUMBER => ExprNode::Literal(ExprLiteral::Number(cursor.read_f64::<LittleEndian>()?)),
        TAG_LITERAL_STRING_REF => {
            ExprNode::Literal(ExprLiteral::StringRef(cursor.read_u32::<LittleEndian>()?))
        }
        TAG_VAR => ExprNode::Var(cursor.read_u32::<LittleEndian>()?),
        TAG_UNARY => {
            let op = UnOp::from_u8(cursor.read_u8()?)?;
            ExprNode::Unary(op, Box::new(decode_expr(cursor)?))
        }
        TAG_BINARY => {
            let op = BinOp::from_u8(cursor.read_u8()?)?;
            let lhs = Box::new(decode_expr(cursor)?);
            let rhs = Box::new(decode_expr(cursor)?);
            ExprNode::Binary(op, lhs, rhs)
        }
        TAG_TERNARY => {
            let cond = Box::new(decode_expr(cursor)?);
            let a = Box::new(decode_expr(cursor)?);
            let b = Box::new(decode_expr(cursor)?);
            ExprNode::Ternary(cond, a, b)
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown expression node tag {other}"),
            ))
        }
    })
}

/// Convenience wrapper mirroring the byte-vector-in, byte-vector-out shape used
/// by the rest of the binary payload encoders.
pub fn write_expr(node: &ExprNode) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_expr(node, &mut buf).expect("writing to a Vec<u8> never fails");
    buf
}

pub fn read_expr(bytes: &[u8]) -> io::Result<ExprNode> {
    let mut cursor = Cursor::new(bytes);
    decode_expr(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_nested_expression() {
        // ($count + 1) > 3 ? "many" : "few"
        let expr = ExprNode::Ternary(
            Box::new(ExprNode::Binary(
                BinOp::Gt,
                Box::new(ExprNode::Binary(
                    BinOp::Add,
                    Box::new(ExprNode::Var(0)),
                    Box::new(ExprNode::Literal(ExprLiteral::Number(1.0))),
                )),
                Box::new(ExprNode::Literal(ExprLiteral::Number(3.0))),
            )),
            Box::new(ExprNode::Literal(ExprLiteral::StringRef(1))),
            Box::new(ExprNode::Literal(ExprLiteral::StringRef(2))),
        );
        let bytes = write_expr(&expr);
        assert_eq!(read_expr(&bytes).unwrap(), expr);
    }

    #[test]
    fn rejects_truncated_buffers() {
        assert!(read_expr(&[TAG_VAR]).is_err());
    }
}
