//! The binary container for assembled bytecode: what a `.bobc`
//! file holds. A four-byte magic word, then the top-level code
//! object, each value tagged with a single ASCII byte:
//!
//! | tag   | payload |
//! |-------|---------|
//! | `'0'` | nothing (the empty list) |
//! | `'b'` | one byte, 0 or 1 |
//! | `'n'` | little-endian 32-bit signed integer |
//! | `'S'` | 32-bit length + symbol bytes |
//! | `'s'` | 32-bit length + string bytes (names, formals, varnames) |
//! | `'p'` | first, then second |
//! | `'i'` | 32-bit word: opcode in the high byte, argument in the low 24 bits |
//! | `'['` | 32-bit length + that many serialized objects |
//! | `'c'` | name, formals, constants, varnames, code, in that exact order |

use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::bytecode::{CodeObject, Constant, Instruction, Opcode, MAX_ARG};
use crate::common::expr::Value;

/// The magic word at the head of every serialized code object,
/// stored little-endian.
pub const MAGIC: u32 = 0x0001_0B0B;

const TAG_NULL: u8 = b'0';
const TAG_BOOLEAN: u8 = b'b';
const TAG_NUMBER: u8 = b'n';
const TAG_SYMBOL: u8 = b'S';
const TAG_STRING: u8 = b's';
const TAG_PAIR: u8 = b'p';
const TAG_INSTRUCTION: u8 = b'i';
const TAG_SEQUENCE: u8 = b'[';
const TAG_CODEOBJECT: u8 = b'c';

/// A codec failure. Encoding only fails on values the format
/// cannot carry; decoding fails on any malformed input, and
/// remembers how far it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    Serialize { reason: String },
    Deserialize { reason: String, offset: usize },
}

impl Display for MarshalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MarshalError::Serialize { reason } => {
                write!(f, "Serialize Error: {}", reason)
            }
            MarshalError::Deserialize { reason, offset } => {
                write!(f, "Deserialize Error: {} [offset {}]", reason, offset)
            }
        }
    }
}

impl std::error::Error for MarshalError {}

/// Serialize a code object into the `.bobc` byte format.
pub fn serialize(code: &CodeObject) -> Result<Vec<u8>, MarshalError> {
    let mut serializer = Serializer { buf: vec![] };
    serializer.buf.extend_from_slice(&MAGIC.to_le_bytes());
    serializer.code_object(code)?;
    Ok(serializer.buf)
}

struct Serializer {
    buf: Vec<u8>,
}

impl Serializer {
    fn word(&mut self, word: u32) {
        self.buf.extend_from_slice(&word.to_le_bytes());
    }

    fn string(&mut self, tag: u8, s: &str) {
        self.buf.push(tag);
        self.word(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn sequence<T>(
        &mut self,
        items: &[T],
        mut each: impl FnMut(&mut Self, &T) -> Result<(), MarshalError>,
    ) -> Result<(), MarshalError> {
        self.buf.push(TAG_SEQUENCE);
        self.word(items.len() as u32);
        for item in items {
            each(self, item)?;
        }
        Ok(())
    }

    fn value(&mut self, value: &Value) -> Result<(), MarshalError> {
        match value {
            Value::Null => self.buf.push(TAG_NULL),
            Value::Boolean(b) => {
                self.buf.push(TAG_BOOLEAN);
                self.buf.push(*b as u8);
            }
            Value::Number(n) => {
                let narrow = i32::try_from(*n).map_err(|_| MarshalError::Serialize {
                    reason: format!("number {} does not fit in 32 bits", n),
                })?;
                self.buf.push(TAG_NUMBER);
                self.buf.extend_from_slice(&narrow.to_le_bytes());
            }
            Value::Symbol(name) => self.string(TAG_SYMBOL, name),
            Value::Pair(pair) => {
                self.buf.push(TAG_PAIR);
                self.value(&pair.first.borrow())?;
                self.value(&pair.second.borrow())?;
            }
            other => {
                return Err(MarshalError::Serialize {
                    reason: format!("{} cannot appear in a constants table", other),
                })
            }
        }
        Ok(())
    }

    fn instruction(&mut self, instr: &Instruction) -> Result<(), MarshalError> {
        if instr.arg > MAX_ARG {
            return Err(MarshalError::Serialize {
                reason: format!("instruction argument {} does not fit in 24 bits", instr.arg),
            });
        }
        self.buf.push(TAG_INSTRUCTION);
        self.word(((instr.opcode as u32) << 24) | instr.arg);
        Ok(())
    }

    fn code_object(&mut self, code: &CodeObject) -> Result<(), MarshalError> {
        self.buf.push(TAG_CODEOBJECT);
        self.string(TAG_STRING, &code.name);
        self.sequence(&code.formals, |s, formal| {
            s.string(TAG_STRING, formal);
            Ok(())
        })?;
        self.sequence(&code.constants, |s, constant| match constant {
            Constant::Value(value) => s.value(value),
            Constant::Code(inner) => s.code_object(inner),
        })?;
        self.sequence(&code.varnames, |s, varname| {
            s.string(TAG_STRING, varname);
            Ok(())
        })?;
        self.sequence(&code.code, Serializer::instruction)
    }
}

/// Deserialize a `.bobc` byte string back into a code object.
pub fn deserialize(bytes: &[u8]) -> Result<CodeObject, MarshalError> {
    let mut deserializer = Deserializer { bytes, pos: 0 };

    let magic = deserializer.word()?;
    if magic != MAGIC {
        return Err(deserializer.error(&format!("bad magic word {:#010x}", magic)));
    }

    deserializer.code_object()
}

struct Deserializer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Deserializer<'a> {
    fn error(&self, reason: &str) -> MarshalError {
        MarshalError::Deserialize { reason: reason.to_string(), offset: self.pos }
    }

    fn byte(&mut self) -> Result<u8, MarshalError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of stream"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn word(&mut self) -> Result<u32, MarshalError> {
        let end = self.pos + 4;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| self.error("unexpected end of stream"))?;
        self.pos = end;
        Ok(u32::from_le_bytes(chunk.try_into().unwrap()))
    }

    fn expect(&mut self, tag: u8) -> Result<(), MarshalError> {
        let found = self.byte()?;
        if found != tag {
            return Err(self.error(&format!(
                "expected tag {:?}, found {:?}",
                tag as char, found as char,
            )));
        }
        Ok(())
    }

    fn string(&mut self) -> Result<String, MarshalError> {
        self.expect(TAG_STRING)?;
        self.string_body()
    }

    fn string_body(&mut self) -> Result<String, MarshalError> {
        let length = self.word()? as usize;
        let end = self
            .pos
            .checked_add(length)
            .ok_or_else(|| self.error("string length overflows"))?;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| self.error("unexpected end of stream"))?;
        let string = String::from_utf8(chunk.to_vec())
            .map_err(|_| self.error("string is not valid UTF-8"))?;
        self.pos = end;
        Ok(string)
    }

    fn sequence<T>(
        &mut self,
        mut each: impl FnMut(&mut Self) -> Result<T, MarshalError>,
    ) -> Result<Vec<T>, MarshalError> {
        self.expect(TAG_SEQUENCE)?;
        let length = self.word()? as usize;
        let mut items = Vec::new();
        for _ in 0..length {
            items.push(each(self)?);
        }
        Ok(items)
    }

    fn value(&mut self) -> Result<Value, MarshalError> {
        match self.byte()? {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOLEAN => Ok(Value::Boolean(self.byte()? != 0)),
            TAG_NUMBER => {
                let word = self.word()?;
                Ok(Value::Number(word as i32 as i64))
            }
            TAG_SYMBOL => Ok(Value::Symbol(self.string_body()?)),
            TAG_PAIR => {
                let first = self.value()?;
                let second = self.value()?;
                Ok(Value::pair(first, second))
            }
            tag => Err(self.error(&format!("unexpected value tag {:?}", tag as char))),
        }
    }

    fn constant(&mut self) -> Result<Constant, MarshalError> {
        // A constants table mixes plain values and nested code
        // objects; peek at the tag to tell them apart.
        match self.bytes.get(self.pos) {
            Some(&TAG_CODEOBJECT) => Ok(Constant::Code(Rc::new(self.code_object()?))),
            _ => Ok(Constant::Value(self.value()?)),
        }
    }

    fn instruction(&mut self) -> Result<Instruction, MarshalError> {
        self.expect(TAG_INSTRUCTION)?;
        let word = self.word()?;
        let opcode = Opcode::from_byte((word >> 24) as u8)
            .ok_or_else(|| self.error(&format!("invalid opcode {:#04x}", word >> 24)))?;
        Ok(Instruction::new(opcode, word & MAX_ARG))
    }

    fn code_object(&mut self) -> Result<CodeObject, MarshalError> {
        self.expect(TAG_CODEOBJECT)?;
        Ok(CodeObject {
            name: self.string()?,
            formals: self.sequence(Deserializer::string)?,
            constants: self.sequence(Deserializer::constant)?,
            varnames: self.sequence(Deserializer::string)?,
            code: self.sequence(Deserializer::instruction)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn value_strategy() -> impl Strategy<Value = Value> {
        let atom = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Boolean),
            any::<i32>().prop_map(|n| Value::Number(n as i64)),
            "[a-z][a-z0-9-]{0,8}".prop_map(Value::Symbol),
        ];
        atom.prop_recursive(4, 16, 2, |inner| {
            (inner.clone(), inner)
                .prop_map(|(first, second)| Value::pair(first, second))
        })
    }

    fn sample_code() -> CodeObject {
        let inner = CodeObject {
            name: "adder".to_string(),
            formals: vec!["x".to_string()],
            constants: vec![Constant::Value(Value::Number(1))],
            varnames: vec!["x".to_string(), "+".to_string()],
            code: vec![
                Instruction::new(Opcode::Const, 0),
                Instruction::new(Opcode::LoadVar, 0),
                Instruction::new(Opcode::LoadVar, 1),
                Instruction::new(Opcode::Call, 2),
                Instruction::new(Opcode::Return, 0),
            ],
        };
        CodeObject {
            name: String::new(),
            formals: vec![],
            constants: vec![
                Constant::Value(Value::pair(Value::Number(1), Value::Number(2))),
                Constant::Code(Rc::new(inner)),
            ],
            varnames: vec!["adder".to_string()],
            code: vec![
                Instruction::new(Opcode::Function, 1),
                Instruction::new(Opcode::DefVar, 0),
                Instruction::new(Opcode::Pop, 0),
                Instruction::new(Opcode::Const, 0),
            ],
        }
    }

    #[test]
    fn round_trip() {
        let code = sample_code();
        let bytes = serialize(&code).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), code);
    }

    #[test]
    fn magic_is_first_and_little_endian() {
        let bytes = serialize(&CodeObject::default()).unwrap();
        assert_eq!(&bytes[..4], &[0x0B, 0x0B, 0x01, 0x00]);
        assert_eq!(bytes[4], b'c');
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = serialize(&CodeObject::default()).unwrap();
        bytes[0] = 0xFF;
        assert!(matches!(
            deserialize(&bytes),
            Err(MarshalError::Deserialize { .. }),
        ));
    }

    #[test]
    fn truncation_is_rejected() {
        let bytes = serialize(&sample_code()).unwrap();
        for cut in [3, 5, 9, bytes.len() - 1] {
            assert!(deserialize(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn corrupt_tag_is_rejected() {
        let mut bytes = serialize(&CodeObject::default()).unwrap();
        bytes[4] = b'z';
        assert!(deserialize(&bytes).is_err());
    }

    #[test]
    fn oversized_number_does_not_serialize() {
        let code = CodeObject {
            constants: vec![Constant::Value(Value::Number(i64::MAX))],
            ..CodeObject::default()
        };
        assert!(matches!(
            serialize(&code),
            Err(MarshalError::Serialize { .. }),
        ));
    }

    #[test]
    fn deserialized_pairs_stay_distinct() {
        let shape = Value::pair(Value::Number(1), Value::Number(2));
        let code = CodeObject {
            constants: vec![
                Constant::Value(shape.clone()),
                Constant::Value(shape.clone()),
            ],
            ..CodeObject::default()
        };
        let back = deserialize(&serialize(&code).unwrap()).unwrap();
        match (&back.constants[0], &back.constants[1]) {
            (Constant::Value(a), Constant::Value(b)) => {
                assert_eq!(a, b);
                assert!(!a.identical(b));
            }
            _ => panic!("expected value constants"),
        }
    }

    proptest! {
        #[test]
        fn value_constants_round_trip(value in value_strategy()) {
            let code = CodeObject {
                constants: vec![Constant::Value(value)],
                ..CodeObject::default()
            };
            let bytes = serialize(&code).unwrap();
            prop_assert_eq!(deserialize(&bytes).unwrap(), code);
        }
    }
}
