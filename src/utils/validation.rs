//! Helpers de validación
//!
//! Se usan como `#[validate(custom = "...")]` en los DTOs de request, y
//! directamente desde los servicios para valores que no llegan por un DTO.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use validator::ValidationError;

lazy_static! {
    /// Fleet numbers and registrations: letters, digits, spaces and dashes
    static ref VEHICLE_CODE_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{1,31}$").unwrap();
    static ref PHONE_DIGITS_RE: Regex = Regex::new(r"\d").unwrap();
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Matrícula o número de flota: al menos dos caracteres, sin símbolos
pub fn validate_vehicle_code(value: &str) -> Result<(), ValidationError> {
    if !VEHICLE_CODE_RE.is_match(value.trim()) {
        let mut error = ValidationError::new("vehicle_code");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"2-32 letters, digits, spaces or dashes".to_string());
        return Err(error);
    }
    Ok(())
}

/// Validación básica de teléfono: de 7 a 15 dígitos sin formato
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = PHONE_DIGITS_RE.find_iter(value).count();
    if !(7..=15).contains(&digits) {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un valor sea estrictamente positivo
pub fn validate_positive<T: PartialOrd + num_traits::Zero + Serialize>(value: T) -> Result<(), ValidationError> {
    if value <= T::zero() {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Validar que un valor sea cero o mayor
pub fn validate_non_negative<T: PartialOrd + num_traits::Zero + Serialize>(value: T) -> Result<(), ValidationError> {
    if value < T::zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Fold a single field failure into `ValidationErrors` for `AppError::Validation`
pub fn field_error(field: &'static str, error: ValidationError) -> validator::ValidationErrors {
    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);
    errors
}
