//! ABI call marshalling.
//!
//! Bridges call-expression text and ABI calldata: signature parsing with
//! alias normalization, keccak-256 selectors, argument packing, and the
//! reverse rendering for decode.

use ethers_core::abi::{self, ParamType, Token};
use ethers_core::utils::keccak256;

use crate::abi::coerce::{to_text, to_typed, to_typed_array, ArgKind};
use crate::abi::expr::parse_call;
use crate::error::{ArgumentError, Error, Result, SignatureError};

/// First four bytes of the keccak-256 hash of a canonical signature.
pub fn selector(canonical_signature: &str) -> [u8; 4] {
    let hash = keccak256(canonical_signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector plus pre-coerced arguments, for fixed well-known calls.
pub fn encode_call(canonical_signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(canonical_signature).to_vec();
    data.extend(abi::encode(tokens));
    data
}

/// A declared method signature, e.g. `transfer(address,uint256)`.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    pub name: String,
    pub kinds: Vec<ArgKind>,
}

impl MethodSignature {
    pub fn parse(signature: &str) -> Result<Self> {
        let (name, raw_types) = parse_call(signature)?;
        let mut kinds = Vec::with_capacity(raw_types.len());
        for raw in &raw_types {
            let raw = raw.trim();
            // `name()` parses as a single empty type token.
            if raw.is_empty() && raw_types.len() == 1 {
                continue;
            }
            kinds.push(ArgKind::parse(raw)?);
        }
        Ok(MethodSignature { name, kinds })
    }

    /// Canonical form with all width aliases expanded, which is what the
    /// selector hash is computed over.
    pub fn canonical(&self) -> String {
        let types: Vec<String> = self.kinds.iter().map(ArgKind::canonical).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.canonical())
    }
}

/// Coerce the raw argument tokens of a call expression against the declared
/// kinds. Array kinds consume greedily; running out of raw tokens is
/// `NotEnoughParameters`.
pub fn coerce_arguments(kinds: &[ArgKind], raw: &[String]) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(kinds.len());
    let mut index = 0;
    for kind in kinds {
        if index >= raw.len() {
            return Err(ArgumentError::NotEnoughParameters {
                expected: kinds.len(),
                got: tokens.len(),
            }
            .into());
        }
        match kind {
            ArgKind::Scalar(scalar) => {
                tokens.push(to_typed(&raw[index], *scalar)?);
                index += 1;
            }
            ArgKind::Array(element) => {
                let (items, next) = to_typed_array(raw, index, *element)?;
                tokens.push(Token::Array(items));
                index = next;
            }
        }
    }
    Ok(tokens)
}

/// Encode a call expression against a declared signature.
///
/// The call's method name must match the signature's, case-insensitively.
/// With `include_selector` the 4-byte selector of the canonical signature is
/// prepended to the packed arguments.
pub fn encode(signature: &str, call: &str, include_selector: bool) -> Result<Vec<u8>> {
    let signature = MethodSignature::parse(signature)?;
    let (called, raw_args) = parse_call(call)?;
    if !called.eq_ignore_ascii_case(&signature.name) {
        return Err(SignatureError::NameMismatch {
            declared: signature.name,
            called,
        }
        .into());
    }

    let tokens = coerce_arguments(&signature.kinds, &raw_args)?;
    let mut data = Vec::new();
    if include_selector {
        data.extend_from_slice(&signature.selector());
    }
    data.extend(abi::encode(&tokens));
    Ok(data)
}

/// Decode calldata against a declared signature, rendering the result as a
/// call expression. With `has_selector` the leading four bytes must equal
/// the signature's selector.
pub fn decode(signature: &str, data: &[u8], has_selector: bool) -> Result<String> {
    let signature = MethodSignature::parse(signature)?;
    let mut payload = data;
    if has_selector {
        let expected = signature.selector();
        if payload.len() < 4 || payload[..4] != expected {
            return Err(SignatureError::SelectorMismatch {
                expected: hex::encode(expected),
                found: hex::encode(&payload[..payload.len().min(4)]),
            }
            .into());
        }
        payload = &payload[4..];
    }

    let types: Vec<ParamType> = signature.kinds.iter().map(ArgKind::param_type).collect();
    let tokens = abi::decode(&types, payload)
        .map_err(|e| Error::Argument(ArgumentError::Codec(e.to_string())))?;
    let rendered: Vec<String> = tokens.iter().map(to_text).collect();
    Ok(format!("{}({})", signature.name, rendered.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0x00000000000000000000000000000000000000aa";

    #[test]
    fn known_selectors() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn aliases_hash_to_the_same_selector() {
        let widthless = MethodSignature::parse("transfer(address,uint)").unwrap();
        assert_eq!(widthless.canonical(), "transfer(address,uint256)");
        assert_eq!(widthless.selector(), selector("transfer(address,uint256)"));
    }

    #[test]
    fn encode_prepends_selector_on_request() {
        let call = format!("transfer({OWNER},100)");
        let with = encode("transfer(address,uint256)", &call, true).unwrap();
        let without = encode("transfer(address,uint256)", &call, false).unwrap();
        assert_eq!(with.len(), 4 + 64 + 64);
        assert_eq!(&with[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&with[4..], &without[..]);
    }

    #[test]
    fn call_name_match_is_case_insensitive() {
        let call = format!("TRANSFER({OWNER},1)");
        assert!(encode("transfer(address,uint256)", &call, true).is_ok());
        let call = format!("send({OWNER},1)");
        assert!(matches!(
            encode("transfer(address,uint256)", &call, true),
            Err(Error::SignatureMismatch(SignatureError::NameMismatch { .. }))
        ));
    }

    #[test]
    fn missing_arguments_are_reported() {
        let call = format!("transfer({OWNER})");
        assert!(matches!(
            encode("transfer(address,uint256)", &call, true),
            Err(Error::Argument(ArgumentError::NotEnoughParameters {
                expected: 2,
                got: 1
            }))
        ));
    }

    #[test]
    fn encode_decode_round_trip() {
        let signature = "transfer(address,uint256)";
        let call = format!("transfer({OWNER},100)");
        let data = encode(signature, &call, true).unwrap();
        assert_eq!(decode(signature, &data, true).unwrap(), call);
    }

    #[test]
    fn array_arguments_round_trip() {
        let signature = "batch(uint256[],address)";
        let call = format!("batch([1,2,3],{OWNER})");
        let data = encode(signature, &call, false).unwrap();
        assert_eq!(decode(signature, &data, false).unwrap(), call);

        let call = format!("batch([],{OWNER})");
        let data = encode(signature, &call, false).unwrap();
        assert_eq!(decode(signature, &data, false).unwrap(), call);
    }

    #[test]
    fn parameterless_calls_encode_to_selector_only() {
        let data = encode("totalSupply()", "totalSupply()", true).unwrap();
        assert_eq!(data, selector("totalSupply()").to_vec());
    }

    #[test]
    fn decode_rejects_wrong_selector() {
        let call = format!("transfer({OWNER},1)");
        let data = encode("transfer(address,uint256)", &call, true).unwrap();
        assert!(matches!(
            decode("approve(address,uint256)", &data, true),
            Err(Error::SignatureMismatch(
                SignatureError::SelectorMismatch { .. }
            ))
        ));
        assert!(matches!(
            decode("transfer(address,uint256)", &data[..2], true),
            Err(Error::SignatureMismatch(
                SignatureError::SelectorMismatch { .. }
            ))
        ));
    }
}
