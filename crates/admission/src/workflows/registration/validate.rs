use std::fmt;

use serde::Serialize;

use super::domain::{AcademicData, ParentData, PersonalData};

/// Single field-level validation failure, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Collection of field errors for one request. Empty reports never escape
/// the validators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    fn require(&mut self, field: &str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.push(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self
            .errors
            .iter()
            .map(|error| error.field.as_str())
            .collect();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationReport {}

pub fn validate_personal(data: &PersonalData) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::new();
    report.require("personal.full_name", &data.full_name, "full name is required");
    report.require(
        "personal.birth_place",
        &data.birth_place,
        "birth place is required",
    );
    report.require(
        "personal.address.street",
        &data.address.street,
        "street address is required",
    );
    report.require("personal.address.city", &data.address.city, "city is required");
    report.require(
        "personal.phone_number",
        &data.phone_number,
        "phone number is required",
    );
    if !is_plausible_email(&data.email) {
        report.push("personal.email", "email address is not valid");
    }
    report.into_result()
}

pub fn validate_parent(data: &ParentData) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::new();
    report.require(
        "parent.father.name",
        &data.father.name,
        "father's name is required",
    );
    report.require(
        "parent.mother.name",
        &data.mother.name,
        "mother's name is required",
    );
    report.into_result()
}

pub fn validate_academic(data: &AcademicData) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::new();
    report.require(
        "academic.previous_school.name",
        &data.previous_school.name,
        "previous school name is required",
    );
    report.require(
        "academic.last_grade",
        &data.last_grade,
        "last grade is required",
    );
    report.into_result()
}

pub(crate) fn is_plausible_email(value: &str) -> bool {
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}
