use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Key used for errors that are not tied to a single input.
pub const GENERIC_ERROR_KEY: &str = "generic";

const BLANK_MESSAGE: &str = "This field cannot be blank";
const INVALID_MESSAGE: &str = "This field is invalid";

/// Pattern used to validate submitted email addresses.
pub static EMAIL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// Field-keyed validation messages accumulated while checking a form.
#[derive(Debug, Clone, Default)]
pub struct FormErrors {
    inner: HashMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.inner
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// First message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.inner
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn all(&self, field: &str) -> &[String] {
        self.inner.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.inner.values().all(Vec::is_empty)
    }
}

/// Snapshot of submitted form values plus the errors found while validating them.
#[derive(Debug, Clone, Default)]
pub struct Form {
    values: HashMap<String, Vec<String>>,
    pub errors: FormErrors,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form from decoded `application/x-www-form-urlencoded` pairs. Repeated keys keep
    /// every value in submission order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            values.entry(key.into()).or_default().push(value.into());
        }

        Self {
            values,
            errors: FormErrors::default(),
        }
    }

    /// First submitted value for `field`, or the empty string.
    pub fn get(&self, field: &str) -> &str {
        self.values
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Convenience for templates: the first error message for `field`, or the empty string.
    pub fn error(&self, field: &str) -> &str {
        self.errors.get(field).unwrap_or("")
    }

    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).trim().is_empty() {
                self.errors.add(field, BLANK_MESSAGE);
            }
        }
    }

    pub fn max_length(&mut self, field: &str, max: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }

        if value.chars().count() > max {
            self.errors.add(
                field,
                format!("This field is too long (maximum is {max} characters)"),
            );
        }
    }

    pub fn min_length(&mut self, field: &str, min: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }

        if value.chars().count() < min {
            self.errors.add(
                field,
                format!("This field is too short (minimum is {min} characters)"),
            );
        }
    }

    pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }

        if !pattern.is_match(value) {
            self.errors.add(field, INVALID_MESSAGE);
        }
    }

    pub fn permitted_values(&mut self, field: &str, allowed: &[&str]) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }

        if !allowed.contains(&value) {
            self.errors.add(field, INVALID_MESSAGE);
        }
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}
