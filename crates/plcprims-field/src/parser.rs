use crate::descriptor::{Address, DataType, FieldDescriptor};
use crate::error::{FieldError, Result};

/// Translates caller-facing address strings into field descriptors.
///
/// Drivers never look at address syntax themselves; whichever parser the
/// caller picks is the only component that does.
pub trait AddressParser: Send + Sync {
    /// Build a descriptor for `address`, naming it after the container and
    /// element the caller uses to refer to it.
    fn parse(&self, container: &str, element: &str, address: &str) -> Result<FieldDescriptor>;
}

/// Address syntax for Allen-Bradley DF1 controllers.
///
/// - `<offset>:<TYPE>`, e.g. `100:INTEGER`, yields an offset address.
/// - `<file><number>:<element>[/<bit>]:<TYPE>`, e.g. `N7:0:INTEGER`, yields a
///   logical address.
///
/// Fields are named `"{container}/{element}"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Df1AddressParser;

impl AddressParser for Df1AddressParser {
    fn parse(&self, container: &str, element: &str, address: &str) -> Result<FieldDescriptor> {
        let (location, type_name) = address
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| invalid(address, "expected <location>:<TYPE>"))?;
        let data_type: DataType = type_name.parse()?;

        let location = if !location.is_empty() && location.bytes().all(|b| b.is_ascii_digit()) {
            let offset = location
                .parse::<u32>()
                .map_err(|_| invalid(address, "offset out of range"))?;
            Address::Offset(offset)
        } else if is_logical_path(location) {
            Address::Logical(location.to_ascii_uppercase())
        } else {
            return Err(invalid(address, "unrecognized location"));
        };

        let name = match (container.is_empty(), element.is_empty()) {
            (true, true) => return Err(FieldError::EmptyName),
            (false, true) => container.to_string(),
            (true, false) => element.to_string(),
            (false, false) => format!("{container}/{element}"),
        };
        FieldDescriptor::new(name, location, data_type)
    }
}

// File letter, file number, ':' element, optional '/' bit.
fn is_logical_path(path: &str) -> bool {
    let mut chars = path.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    let rest = chars.as_str();
    let Some((file, tail)) = rest.split_once(':') else {
        return false;
    };
    let (element, bit) = match tail.split_once('/') {
        Some((element, bit)) => (element, Some(bit)),
        None => (tail, None),
    };
    is_number(file) && is_number(element) && bit.map_or(true, is_number)
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn invalid(address: &str, reason: &str) -> FieldError {
    FieldError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AddressKind;

    #[test]
    fn parses_offset_address() {
        let field = Df1AddressParser
            .parse("DB1", "DB100", "100:INTEGER")
            .unwrap();
        assert_eq!(field.name(), "DB1/DB100");
        assert_eq!(field.address(), &Address::Offset(100));
        assert_eq!(field.data_type(), DataType::Integer);
    }

    #[test]
    fn parses_logical_address() {
        let field = Df1AddressParser.parse("plant", "level", "n7:12:integer").unwrap();
        assert_eq!(field.address_kind(), AddressKind::Logical);
        assert_eq!(field.address(), &Address::Logical("N7:12".into()));

        let bit = Df1AddressParser.parse("plant", "pump", "B3:0/4:BIT").unwrap();
        assert_eq!(bit.address(), &Address::Logical("B3:0/4".into()));
    }

    #[test]
    fn single_part_names() {
        let field = Df1AddressParser.parse("", "speed", "4:FLOAT").unwrap();
        assert_eq!(field.name(), "speed");
        assert_eq!(
            Df1AddressParser.parse("", "", "4:FLOAT").unwrap_err(),
            FieldError::EmptyName
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["100", "N7:INTEGER", "7N:0:INTEGER", "B3:0/:BIT", ":INTEGER", "99999999999:BIT"] {
            let err = Df1AddressParser.parse("c", "e", bad).unwrap_err();
            assert!(
                matches!(err, FieldError::InvalidAddress { .. }),
                "{bad} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let err = Df1AddressParser.parse("c", "e", "10:WORD").unwrap_err();
        assert_eq!(err, FieldError::UnknownDataType("WORD".into()));
    }
}
