//! Argument coercion between call-expression text and ABI tokens.
//!
//! The type vocabulary is a closed pair of tagged unions: `ScalarKind` for
//! the supported element kinds and `ArgKind` to mark an argument as scalar
//! or a single-dimension array of scalars.

use std::str::FromStr;

use ethers_core::abi::{ParamType, Token};
use ethers_core::types::{Address, I256, U256};

use crate::error::ArgumentError;

/// A supported scalar ABI kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `uintN`, width in bits.
    Uint(usize),
    /// `intN`, width in bits.
    Int(usize),
    Bool,
    Address,
    /// `bytesN`, length in bytes.
    FixedBytes(usize),
    Bytes,
    String,
}

/// A declared argument kind: scalar or a single-dimension array of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Scalar(ScalarKind),
    Array(ScalarKind),
}

impl ScalarKind {
    fn parse(text: &str) -> Result<Self, ArgumentError> {
        match text {
            "bool" => Ok(ScalarKind::Bool),
            "address" => Ok(ScalarKind::Address),
            "string" => Ok(ScalarKind::String),
            "bytes" => Ok(ScalarKind::Bytes),
            _ if text.starts_with("uint") => {
                Ok(ScalarKind::Uint(parse_bit_width(&text["uint".len()..], text)?))
            }
            _ if text.starts_with("int") => {
                Ok(ScalarKind::Int(parse_bit_width(&text["int".len()..], text)?))
            }
            _ if text.starts_with("bytes") => {
                let size: usize = text["bytes".len()..]
                    .parse()
                    .map_err(|_| ArgumentError::UnsupportedType(text.to_string()))?;
                if size == 0 || size > 32 {
                    return Err(ArgumentError::UnsupportedType(text.to_string()));
                }
                Ok(ScalarKind::FixedBytes(size))
            }
            _ => Err(ArgumentError::UnsupportedType(text.to_string())),
        }
    }

    /// Canonical ABI name, with width aliases expanded (`uint` -> `uint256`).
    pub fn canonical(&self) -> String {
        match self {
            ScalarKind::Uint(width) => format!("uint{width}"),
            ScalarKind::Int(width) => format!("int{width}"),
            ScalarKind::Bool => "bool".to_string(),
            ScalarKind::Address => "address".to_string(),
            ScalarKind::FixedBytes(size) => format!("bytes{size}"),
            ScalarKind::Bytes => "bytes".to_string(),
            ScalarKind::String => "string".to_string(),
        }
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            ScalarKind::Uint(width) => ParamType::Uint(*width),
            ScalarKind::Int(width) => ParamType::Int(*width),
            ScalarKind::Bool => ParamType::Bool,
            ScalarKind::Address => ParamType::Address,
            ScalarKind::FixedBytes(size) => ParamType::FixedBytes(*size),
            ScalarKind::Bytes => ParamType::Bytes,
            ScalarKind::String => ParamType::String,
        }
    }
}

/// Widthless `uint`/`int` default to 256 bits.
fn parse_bit_width(suffix: &str, whole: &str) -> Result<usize, ArgumentError> {
    if suffix.is_empty() {
        return Ok(256);
    }
    let width: usize = suffix
        .parse()
        .map_err(|_| ArgumentError::UnsupportedType(whole.to_string()))?;
    if width == 0 || width > 256 || width % 8 != 0 {
        return Err(ArgumentError::UnsupportedType(whole.to_string()));
    }
    Ok(width)
}

impl ArgKind {
    pub fn parse(text: &str) -> Result<Self, ArgumentError> {
        let text = text.trim().to_ascii_lowercase();
        if let Some(element) = text.strip_suffix("[]") {
            Ok(ArgKind::Array(ScalarKind::parse(element)?))
        } else {
            Ok(ArgKind::Scalar(ScalarKind::parse(&text)?))
        }
    }

    pub fn canonical(&self) -> String {
        match self {
            ArgKind::Scalar(kind) => kind.canonical(),
            ArgKind::Array(kind) => format!("{}[]", kind.canonical()),
        }
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            ArgKind::Scalar(kind) => kind.param_type(),
            ArgKind::Array(kind) => ParamType::Array(Box::new(kind.param_type())),
        }
    }
}

/// Coerce one raw text token into an ABI token of the given scalar kind.
pub fn to_typed(input: &str, kind: ScalarKind) -> Result<Token, ArgumentError> {
    let text = input.trim();
    match kind {
        ScalarKind::Uint(width) => {
            if width <= 64 {
                let value: u64 = text
                    .parse()
                    .map_err(|_| ArgumentError::InvalidInteger(text.to_string()))?;
                if width < 64 && value >> width != 0 {
                    return Err(ArgumentError::IntegerOverflow(
                        text.to_string(),
                        format!("uint{width}"),
                    ));
                }
                Ok(Token::Uint(U256::from(value)))
            } else {
                let value = U256::from_dec_str(text)
                    .map_err(|_| ArgumentError::InvalidBigInt(text.to_string()))?;
                if width < 256 && !(value >> width).is_zero() {
                    return Err(ArgumentError::IntegerOverflow(
                        text.to_string(),
                        format!("uint{width}"),
                    ));
                }
                Ok(Token::Uint(value))
            }
        }
        ScalarKind::Int(width) => {
            if width <= 64 {
                let value: i64 = text
                    .parse()
                    .map_err(|_| ArgumentError::InvalidInteger(text.to_string()))?;
                if width < 64 {
                    let bound = 1i128 << (width - 1);
                    if i128::from(value) >= bound || i128::from(value) < -bound {
                        return Err(ArgumentError::IntegerOverflow(
                            text.to_string(),
                            format!("int{width}"),
                        ));
                    }
                }
                Ok(Token::Int(I256::from(value).into_raw()))
            } else {
                let value = I256::from_dec_str(text)
                    .map_err(|_| ArgumentError::InvalidBigInt(text.to_string()))?;
                if width < 256 {
                    let bound = I256::from_raw(U256::one() << (width - 1));
                    if value >= bound || value < -bound {
                        return Err(ArgumentError::IntegerOverflow(
                            text.to_string(),
                            format!("int{width}"),
                        ));
                    }
                }
                Ok(Token::Int(value.into_raw()))
            }
        }
        ScalarKind::Bool => match text {
            "true" => Ok(Token::Bool(true)),
            "false" => Ok(Token::Bool(false)),
            _ => Err(ArgumentError::InvalidBool(text.to_string())),
        },
        ScalarKind::Address => {
            let digits = text.strip_prefix("0x").unwrap_or(text);
            if digits.len() > 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ArgumentError::InvalidAddress(text.to_string()));
            }
            // Short addresses are left-padded with zeroes.
            let padded = format!("{digits:0>40}");
            Address::from_str(&padded)
                .map(Token::Address)
                .map_err(|_| ArgumentError::InvalidAddress(text.to_string()))
        }
        ScalarKind::FixedBytes(size) => {
            let bytes = decode_hex(text)?;
            if bytes.len() != size {
                return Err(ArgumentError::InvalidHex(text.to_string()));
            }
            Ok(Token::FixedBytes(bytes))
        }
        ScalarKind::Bytes => Ok(Token::Bytes(decode_hex(text)?)),
        ScalarKind::String => Ok(Token::String(strip_quotes(text).to_string())),
    }
}

/// Reassemble a bracket-delimited array from the flat raw-token stream.
///
/// Because the expression parser splits on every comma, `[1,2,3]` arrives as
/// the tokens `["[1", "2", "3]"]`. Consumption is greedy from `start` until
/// a token carrying the closing bracket; returns the coerced elements and
/// the index of the first unconsumed token. `[]` is an empty array consuming
/// one token.
pub fn to_typed_array(
    raw: &[String],
    start: usize,
    element: ScalarKind,
) -> Result<(Vec<Token>, usize), ArgumentError> {
    let first = raw
        .get(start)
        .ok_or(ArgumentError::UnterminatedArray)?
        .trim();
    let Some(first) = first.strip_prefix('[') else {
        return Err(ArgumentError::ExpectedArray(first.to_string()));
    };
    if first == "]" {
        return Ok((Vec::new(), start + 1));
    }

    let mut elements = Vec::new();
    let mut index = start;
    let mut current = first.to_string();
    loop {
        let trimmed = current.trim();
        let (text, done) = match trimmed.strip_suffix(']') {
            Some(stripped) => (stripped, true),
            None => (trimmed, false),
        };
        elements.push(to_typed(text, element)?);
        index += 1;
        if done {
            return Ok((elements, index));
        }
        match raw.get(index) {
            Some(next) => current = next.clone(),
            None => return Err(ArgumentError::UnterminatedArray),
        }
    }
}

/// Render a token back to call-expression text. Inverse of `to_typed` for
/// every supported kind: integers in decimal, addresses and byte data as
/// `0x`-prefixed lowercase hex, arrays bracketed and comma-joined.
pub fn to_text(token: &Token) -> String {
    match token {
        Token::Uint(value) => value.to_string(),
        Token::Int(value) => I256::from_raw(*value).to_string(),
        Token::Bool(value) => value.to_string(),
        Token::Address(address) => format!("{address:#x}"),
        Token::FixedBytes(bytes) | Token::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Token::String(text) => text.clone(),
        Token::Array(items) | Token::FixedArray(items) => {
            let rendered: Vec<String> = items.iter().map(to_text).collect();
            format!("[{}]", rendered.join(","))
        }
        Token::Tuple(items) => {
            let rendered: Vec<String> = items.iter().map(to_text).collect();
            format!("({})", rendered.join(","))
        }
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>, ArgumentError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|_| ArgumentError::InvalidHex(text.to_string()))
}

/// Strip at most one pair of surrounding double quotes.
fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_expands_aliases() {
        assert_eq!(ArgKind::parse("uint").unwrap().canonical(), "uint256");
        assert_eq!(ArgKind::parse("int").unwrap().canonical(), "int256");
        assert_eq!(ArgKind::parse(" Uint8 ").unwrap().canonical(), "uint8");
        assert_eq!(ArgKind::parse("uint[]").unwrap().canonical(), "uint256[]");
        assert_eq!(ArgKind::parse("bytes32").unwrap().canonical(), "bytes32");
        assert!(matches!(
            ArgKind::parse("float"),
            Err(ArgumentError::UnsupportedType(_))
        ));
        assert!(matches!(
            ArgKind::parse("uint7"),
            Err(ArgumentError::UnsupportedType(_))
        ));
        assert!(matches!(
            ArgKind::parse("bytes33"),
            Err(ArgumentError::UnsupportedType(_))
        ));
    }

    #[test]
    fn narrow_integer_overflow_is_rejected() {
        assert!(to_typed("255", ScalarKind::Uint(8)).is_ok());
        assert!(matches!(
            to_typed("256", ScalarKind::Uint(8)),
            Err(ArgumentError::IntegerOverflow(..))
        ));
        assert!(to_typed("-128", ScalarKind::Int(8)).is_ok());
        assert!(matches!(
            to_typed("128", ScalarKind::Int(8)),
            Err(ArgumentError::IntegerOverflow(..))
        ));
        assert!(matches!(
            to_typed("-129", ScalarKind::Int(8)),
            Err(ArgumentError::IntegerOverflow(..))
        ));
    }

    #[test]
    fn wide_integer_overflow_is_rejected() {
        let uint128_max = "340282366920938463463374607431768211455";
        assert!(to_typed(uint128_max, ScalarKind::Uint(128)).is_ok());
        assert!(matches!(
            to_typed("340282366920938463463374607431768211456", ScalarKind::Uint(128)),
            Err(ArgumentError::IntegerOverflow(..))
        ));
        let int128_max = "170141183460469231731687303715884105727";
        let int128_min = "-170141183460469231731687303715884105728";
        assert!(to_typed(int128_max, ScalarKind::Int(128)).is_ok());
        assert!(to_typed(int128_min, ScalarKind::Int(128)).is_ok());
        assert!(matches!(
            to_typed("170141183460469231731687303715884105728", ScalarKind::Int(128)),
            Err(ArgumentError::IntegerOverflow(..))
        ));
        assert!(matches!(
            to_typed("-170141183460469231731687303715884105729", ScalarKind::Int(128)),
            Err(ArgumentError::IntegerOverflow(..))
        ));
    }

    #[test]
    fn wide_integers_parse_as_decimal() {
        let token = to_typed("115792089237316195423570985008687907853269984665640564039457584007913129639935", ScalarKind::Uint(256)).unwrap();
        assert_eq!(token, Token::Uint(U256::MAX));
        assert!(matches!(
            to_typed("not-a-number", ScalarKind::Uint(256)),
            Err(ArgumentError::InvalidBigInt(_))
        ));
        let token = to_typed("-5", ScalarKind::Int(256)).unwrap();
        assert_eq!(to_text(&token), "-5");
    }

    #[test]
    fn bool_literals_are_strict() {
        assert_eq!(to_typed("true", ScalarKind::Bool).unwrap(), Token::Bool(true));
        assert!(matches!(
            to_typed("TRUE", ScalarKind::Bool),
            Err(ArgumentError::InvalidBool(_))
        ));
    }

    #[test]
    fn short_addresses_are_left_padded() {
        let token = to_typed("0xaa", ScalarKind::Address).unwrap();
        assert_eq!(
            to_text(&token),
            "0x00000000000000000000000000000000000000aa"
        );
        assert!(matches!(
            to_typed("0xzz", ScalarKind::Address),
            Err(ArgumentError::InvalidAddress(_))
        ));
    }

    #[test]
    fn strings_lose_one_quote_pair() {
        assert_eq!(
            to_typed("\"hello\"", ScalarKind::String).unwrap(),
            Token::String("hello".to_string())
        );
        assert_eq!(
            to_typed("plain", ScalarKind::String).unwrap(),
            Token::String("plain".to_string())
        );
    }

    #[test]
    fn fixed_bytes_require_exact_length() {
        assert!(to_typed(&format!("0x{}", "ab".repeat(32)), ScalarKind::FixedBytes(32)).is_ok());
        assert!(matches!(
            to_typed("0xabcd", ScalarKind::FixedBytes(32)),
            Err(ArgumentError::InvalidHex(_))
        ));
    }

    #[test]
    fn array_reassembly_is_greedy() {
        let raw: Vec<String> = vec!["[1".into(), "2".into(), "3]".into(), "9".into()];
        let (items, next) = to_typed_array(&raw, 0, ScalarKind::Uint(256)).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(next, 3);
        assert_eq!(to_text(&Token::Array(items)), "[1,2,3]");
    }

    #[test]
    fn single_element_and_empty_arrays() {
        let raw: Vec<String> = vec!["[7]".into()];
        let (items, next) = to_typed_array(&raw, 0, ScalarKind::Uint(256)).unwrap();
        assert_eq!(items, vec![Token::Uint(U256::from(7u64))]);
        assert_eq!(next, 1);

        let raw: Vec<String> = vec!["[]".into(), "x".into()];
        let (items, next) = to_typed_array(&raw, 0, ScalarKind::Uint(256)).unwrap();
        assert!(items.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn unterminated_and_non_arrays_fail() {
        let raw: Vec<String> = vec!["[1".into(), "2".into()];
        assert!(matches!(
            to_typed_array(&raw, 0, ScalarKind::Uint(256)),
            Err(ArgumentError::UnterminatedArray)
        ));
        let raw: Vec<String> = vec!["1".into()];
        assert!(matches!(
            to_typed_array(&raw, 0, ScalarKind::Uint(256)),
            Err(ArgumentError::ExpectedArray(_))
        ));
    }
}
