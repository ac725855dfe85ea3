use err_derive::Error;
use rust_decimal::Decimal;

use infra::ids::{Entity, Id};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(display = "{} not found: {}", kind, id)]
pub struct NotFound {
    pub kind: &'static str,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error(display = "{} must not be empty", _0)]
    Empty(&'static str),
    #[error(display = "{} must not be negative, got {}", _0, _1)]
    Negative(&'static str, Decimal),
    #[error(display = "order line for {} must have a quantity of at least 1", _0)]
    ZeroQuantity(String),
}

impl NotFound {
    pub fn of<T: Entity>(id: &Id<T>) -> Self {
        NotFound {
            kind: T::PREFIX,
            id: id.to_string(),
        }
    }
}

pub(crate) fn non_empty(field: &'static str, value: &str) -> Result<(), InvalidInput> {
    if value.trim().is_empty() {
        return Err(InvalidInput::Empty(field));
    }
    Ok(())
}

pub(crate) fn non_negative(field: &'static str, value: Decimal) -> Result<(), InvalidInput> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(InvalidInput::Negative(field, value));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn negative_zero_is_not_negative() {
        let zero = Decimal::from_parts(0, 0, 0, true, 2);
        assert_eq!(non_negative("price", zero), Ok(()));
        assert_eq!(
            non_negative("price", Decimal::new(-1, 0)),
            Err(InvalidInput::Negative("price", Decimal::new(-1, 0)))
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(non_empty("name", "  "), Err(InvalidInput::Empty("name")));
        assert_eq!(non_empty("name", "Eclair"), Ok(()));
    }
}
