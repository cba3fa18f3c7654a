// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP entity tokenizer using nom combinators
//!
//! Parses STEP/IFC entity definitions into [`AttributeValue`]s. The inverse
//! direction (encoding) lives on the model types themselves.

use ifc_passport_model::{AttributeValue, Entity, EntityId, IfcType};
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair},
    IResult, Parser,
};

/// Raw token from a STEP attribute list (borrowed from the source)
#[derive(Clone, Debug, PartialEq)]
pub enum Token<'a> {
    /// Entity reference (#123)
    EntityRef(u32),
    /// String value ('text')
    String(&'a str),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enumeration (.VALUE.)
    Enum(&'a str),
    /// List of tokens
    List(Vec<Token<'a>>),
    /// Typed value like IFCLABEL('text')
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value ($)
    Null,
    /// Derived value (*)
    Derived,
}

impl<'a> Token<'a> {
    /// Convert token to owned AttributeValue
    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Token::EntityRef(id) => AttributeValue::EntityRef(EntityId(*id)),
            Token::String(s) => AttributeValue::String(s.replace("''", "'")),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(s) => AttributeValue::Enum((*s).to_string()),
            Token::List(items) => {
                AttributeValue::List(items.iter().map(|t| t.to_attribute_value()).collect())
            }
            Token::TypedValue(name, args) => AttributeValue::TypedValue(
                (*name).to_string(),
                args.iter().map(|t| t.to_attribute_value()).collect(),
            ),
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }
}

// ============================================================================
// Parsing Primitives
// ============================================================================

/// Parse whitespace
fn ws(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    Ok((input, ()))
}

/// Parse an entity reference (#123)
fn entity_ref(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('#')(input)?;
    let (input, digits) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    let id = digits.parse::<u32>().unwrap_or(0);
    Ok((input, Token::EntityRef(id)))
}

/// Parse a STEP string ('text' with '' for escaped quotes)
fn step_string(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('\'')(input)?;

    // Find the end of the string, handling escaped quotes ('')
    let mut end = 0;
    let bytes = input.as_bytes();
    while end < bytes.len() {
        if bytes[end] == b'\'' {
            if end + 1 < bytes.len() && bytes[end + 1] == b'\'' {
                end += 2;
                continue;
            }
            break;
        }
        end += 1;
    }

    if end >= bytes.len() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }
    let content = &input[..end];
    let remaining = &input[end + 1..]; // Skip closing quote

    Ok((remaining, Token::String(content)))
}

/// Parse a number (integer or float)
fn number(input: &str) -> IResult<&str, Token> {
    let (input, num_str) = recognize((
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))),
        opt((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            take_while1(|c: char| c.is_ascii_digit()),
        )),
    ))
    .parse(input)?;

    // Use lexical-core for fast parsing
    if num_str.contains('.') || num_str.contains('e') || num_str.contains('E') {
        let f: f64 = lexical_core::parse(num_str.as_bytes()).unwrap_or(0.0);
        Ok((input, Token::Float(f)))
    } else {
        let i: i64 = lexical_core::parse(num_str.as_bytes()).unwrap_or(0);
        Ok((input, Token::Integer(i)))
    }
}

/// Parse an enumeration (.VALUE.)
fn enumeration(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('.')(input)?;
    let (input, name) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    let (input, _) = char('.')(input)?;
    Ok((input, Token::Enum(name)))
}

/// Parse null ($)
fn null_value(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('$')(input)?;
    Ok((input, Token::Null))
}

/// Parse derived (*)
fn derived_value(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('*')(input)?;
    Ok((input, Token::Derived))
}

/// Parse a list of tokens
fn list(input: &str) -> IResult<&str, Token> {
    let (input, items) = delimited(
        pair(char('('), ws),
        separated_list0((ws, char(','), ws), token),
        pair(ws, char(')')),
    )
    .parse(input)?;
    Ok((input, Token::List(items)))
}

/// Parse a typed value like IFCLABEL('text')
fn typed_value(input: &str) -> IResult<&str, Token> {
    let (input, type_name) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    let (input, _) = ws(input)?;
    let (input, args) = delimited(
        pair(char('('), ws),
        separated_list0((ws, char(','), ws), token),
        pair(ws, char(')')),
    )
    .parse(input)?;
    Ok((input, Token::TypedValue(type_name, args)))
}

/// Parse any token
fn token(input: &str) -> IResult<&str, Token> {
    alt((
        entity_ref,
        step_string,
        null_value,
        derived_value,
        enumeration,
        number,
        list,
        typed_value,
    ))
    .parse(input)
}

/// Parse entity attribute list
fn attribute_list(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        pair(char('('), ws),
        separated_list0((ws, char(','), ws), token),
        pair(ws, char(')')),
    )
    .parse(input)
}

// ============================================================================
// Entity Parsing
// ============================================================================

/// Parse a complete entity definition
///
/// Format: `#123=IFCWALL(attr1,attr2,...);`
pub fn parse_entity(input: &str) -> Result<Entity, String> {
    let input = input.trim_start();

    // Parse entity ID
    let (input, _) = char::<&str, nom::error::Error<&str>>('#')
        .parse(input)
        .map_err(|_| "Expected # at start of entity")?;

    let (input, id_str) =
        take_while1::<_, &str, nom::error::Error<&str>>(|c: char| c.is_ascii_digit())
            .parse(input)
            .map_err(|_| "Expected entity ID")?;

    let id: u32 = id_str.parse().map_err(|_| "Invalid entity ID")?;

    // Skip =
    let (input, _) = (ws, char('='), ws)
        .parse(input)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| "Expected = after entity ID")?;

    // Parse type name
    let (input, type_name) =
        take_while1::<_, &str, nom::error::Error<&str>>(|c: char| c.is_alphanumeric() || c == '_')
            .parse(input)
            .map_err(|_| "Expected type name")?;

    // Parse attributes
    let (input, _) = ws(input).unwrap_or((input, ()));

    let (_, tokens) =
        attribute_list(input).map_err(|e| format!("Failed to parse attributes: {:?}", e))?;

    let attributes: Vec<AttributeValue> = tokens.iter().map(|t| t.to_attribute_value()).collect();

    Ok(Entity {
        id: EntityId(id),
        ifc_type: IfcType::parse(type_name),
        attributes,
    })
}

/// Parse entity from a source span reported by the scanner
pub fn parse_entity_at(content: &str, start: usize, end: usize) -> Result<Entity, String> {
    parse_entity(&content[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_ref() {
        let (remaining, token) = entity_ref("#123").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::EntityRef(123));
    }

    #[test]
    fn test_parse_string_with_escaped_quote() {
        let (remaining, token) = step_string("'it''s a test'").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::String("it''s a test"));
        assert_eq!(
            token.to_attribute_value(),
            AttributeValue::String("it's a test".to_string())
        );
    }

    #[test]
    fn test_parse_number_scientific() {
        let (remaining, token) = number("1.5E-3").unwrap();
        assert_eq!(remaining, "");
        if let Token::Float(f) = token {
            assert!((f - 0.0015).abs() < 1e-10);
        } else {
            panic!("Expected float");
        }
    }

    #[test]
    fn test_parse_enum() {
        let (remaining, token) = enumeration(".TRUE.").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::Enum("TRUE"));
    }

    #[test]
    fn test_parse_entity() {
        let entity = parse_entity("#1=IFCWALL('abc',$,#2);").unwrap();
        assert_eq!(entity.id, EntityId(1));
        assert_eq!(entity.ifc_type, IfcType::IfcWall);
        assert_eq!(entity.attributes.len(), 3);
    }

    #[test]
    fn test_parse_typed_value_attribute() {
        let entity =
            parse_entity("#9=IFCPROPERTYSINGLEVALUE('Lambda',$,IFCTHERMALCONDUCTIVITYMEASURE(0.035),$);")
                .unwrap();
        assert_eq!(
            entity.get(2),
            Some(&AttributeValue::TypedValue(
                "IFCTHERMALCONDUCTIVITYMEASURE".to_string(),
                vec![AttributeValue::Float(0.035)]
            ))
        );
    }

    #[test]
    fn test_parse_and_reencode_roundtrip() {
        let src = "#4=IFCDOCUMENTREFERENCE('http://example.com/doc.pdf','DOC','Datasheet',$,#3);";
        let entity = parse_entity(src).unwrap();
        assert_eq!(entity.encode_step(), src);
    }
}
