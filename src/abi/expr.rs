//! Call-expression parser.
//!
//! A call expression is `name(arg1,arg2,...)`. The split is a flat comma
//! split; bracketed array arguments therefore arrive as multiple raw tokens
//! and are reassembled by the coercion layer.

use crate::error::ArgumentError;

/// Parse `name(a,b)` into the method name and its raw argument tokens.
///
/// The name and the whole expression are whitespace-trimmed; the raw
/// arguments are not (coercion trims each as it is consumed). `name()`
/// yields a single empty-string argument.
pub fn parse_call(text: &str) -> Result<(String, Vec<String>), ArgumentError> {
    let text = text.trim();
    let open = text
        .find('(')
        .ok_or_else(|| ArgumentError::MalformedExpression(text.to_string()))?;
    let name = text[..open].trim().to_string();

    let rest = &text[open + 1..];
    let close = rest
        .find(')')
        .ok_or_else(|| ArgumentError::MalformedExpression(text.to_string()))?;
    let args = rest[..close].split(',').map(str::to_string).collect();

    Ok((name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_and_args() {
        let (name, args) = parse_call("transfer(0xabc, 100)").unwrap();
        assert_eq!(name, "transfer");
        assert_eq!(args, vec!["0xabc", " 100"]);
    }

    #[test]
    fn empty_parens_yield_one_empty_arg() {
        let (name, args) = parse_call("totalSupply()").unwrap();
        assert_eq!(name, "totalSupply");
        assert_eq!(args, vec![""]);
    }

    #[test]
    fn array_args_split_into_raw_tokens() {
        let (_, args) = parse_call("batch([1,2,3],0xabc)").unwrap();
        assert_eq!(args, vec!["[1", "2", "3]", "0xabc"]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let (name, args) = parse_call("  f (x) ").unwrap();
        assert_eq!(name, "f");
        assert_eq!(args, vec!["x"]);
    }

    #[test]
    fn missing_parenthesis_is_malformed() {
        assert!(matches!(
            parse_call("transfer"),
            Err(ArgumentError::MalformedExpression(_))
        ));
        assert!(matches!(
            parse_call("transfer(1,2"),
            Err(ArgumentError::MalformedExpression(_))
        ));
    }
}
