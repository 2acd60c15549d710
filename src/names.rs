//! Validation for bus, interface and member names.

use core::fmt;
use std::error;

/// The maximum length of any D-Bus name.
const MAX_NAME: usize = 255;

/// Error raised when a name fails validation.
#[derive(Debug, PartialEq, Eq)]
pub struct NameError {
    what: &'static str,
    name: Box<str>,
}

impl NameError {
    fn new(what: &'static str, name: &str) -> Self {
        Self {
            what,
            name: name.into(),
        }
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} name: {:?}", self.what, self.name)
    }
}

impl error::Error for NameError {}

/// Validate a bus name.
///
/// A well-known bus name is a dotted sequence of at least two elements,
/// each beginning with a non-digit from `[A-Za-z_-]` and continuing with
/// the same plus digits. A unique name begins with `:` and allows digits
/// at element starts.
///
/// # Examples
///
/// ```
/// use corebus::names;
///
/// assert!(names::validate_bus_name("com.example.Foo").is_ok());
/// assert!(names::validate_bus_name(":1.42").is_ok());
/// assert!(names::validate_bus_name("com").is_err());
/// assert!(names::validate_bus_name("com..Foo").is_err());
/// assert!(names::validate_bus_name("com.1digit").is_err());
/// ```
pub fn validate_bus_name(name: &str) -> Result<(), NameError> {
    let err = || NameError::new("bus", name);

    if name.len() > MAX_NAME || name.is_empty() {
        return Err(err());
    }

    let (unique, rest) = match name.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, name),
    };

    let mut elements = 0;

    for element in rest.split('.') {
        let mut chars = element.chars();

        let Some(first) = chars.next() else {
            return Err(err());
        };

        if !unique && first.is_ascii_digit() {
            return Err(err());
        }

        if !matches!(first, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-') {
            return Err(err());
        }

        if !chars.all(|c| matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-')) {
            return Err(err());
        }

        elements += 1;
    }

    if elements < 2 {
        return Err(err());
    }

    Ok(())
}

/// Validate an interface name.
///
/// A dotted sequence of at least two elements, each matching
/// `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Examples
///
/// ```
/// use corebus::names;
///
/// assert!(names::validate_interface_name("org.freedesktop.DBus").is_ok());
/// assert!(names::validate_interface_name("org").is_err());
/// assert!(names::validate_interface_name("org.9foo").is_err());
/// ```
pub fn validate_interface_name(name: &str) -> Result<(), NameError> {
    let err = || NameError::new("interface", name);

    if name.len() > MAX_NAME || name.is_empty() {
        return Err(err());
    }

    let mut elements = 0;

    for element in name.split('.') {
        if !valid_member(element) {
            return Err(err());
        }

        elements += 1;
    }

    if elements < 2 {
        return Err(err());
    }

    Ok(())
}

/// Validate a member (method or signal) name.
///
/// A single element matching `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Examples
///
/// ```
/// use corebus::names;
///
/// assert!(names::validate_member_name("Hello").is_ok());
/// assert!(names::validate_member_name("_private2").is_ok());
/// assert!(names::validate_member_name("has.dot").is_err());
/// assert!(names::validate_member_name("1st").is_err());
/// ```
pub fn validate_member_name(name: &str) -> Result<(), NameError> {
    if name.len() > MAX_NAME || !valid_member(name) {
        return Err(NameError::new("member", name));
    }

    Ok(())
}

fn valid_member(element: &str) -> bool {
    let mut chars = element.chars();

    let Some(first) = chars.next() else {
        return false;
    };

    if !matches!(first, 'A'..='Z' | 'a'..='z' | '_') {
        return false;
    }

    chars.all(|c| matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_'))
}

#[cfg(test)]
mod tests {
    use super::{validate_bus_name, validate_interface_name, validate_member_name};

    #[test]
    fn bus_names() {
        assert!(validate_bus_name("com.example.Foo").is_ok());
        assert!(validate_bus_name("com.example-dash.Foo").is_ok());
        assert!(validate_bus_name(":1.0").is_ok());
        assert!(validate_bus_name(":1.42").is_ok());
        assert!(validate_bus_name("").is_err());
        assert!(validate_bus_name(":").is_err());
        assert!(validate_bus_name("com").is_err());
        assert!(validate_bus_name(".com.example").is_err());
        assert!(validate_bus_name("com.example.").is_err());
        assert!(validate_bus_name("com.2digit.Foo").is_err());
        assert!(validate_bus_name("com.exa mple").is_err());

        let long = format!("com.{}", "x".repeat(300));
        assert!(validate_bus_name(&long).is_err());
    }

    #[test]
    fn interface_names() {
        assert!(validate_interface_name("org.freedesktop.DBus").is_ok());
        assert!(validate_interface_name("a.b").is_ok());
        assert!(validate_interface_name("a").is_err());
        assert!(validate_interface_name("a..b").is_err());
        assert!(validate_interface_name("a.b-c").is_err());
    }

    #[test]
    fn member_names() {
        assert!(validate_member_name("Hello").is_ok());
        assert!(validate_member_name("_x9").is_ok());
        assert!(validate_member_name("").is_err());
        assert!(validate_member_name("9x").is_err());
        assert!(validate_member_name("a.b").is_err());
    }
}
