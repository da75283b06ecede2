use chrono::NaiveDate;
use platform_api::ApiError;
use thiserror::Error;
use uuid::Uuid;

pub const DEPARTMENT_NAME_MAX: usize = 100;
pub const POSITION_NAME_MAX: usize = 100;
pub const PROGRAM_NAME_MAX: usize = 255;
pub const PERSON_NAME_MAX: usize = 255;
pub const INSTRUCTION_TITLE_MAX: usize = 255;
pub const CATEGORY_MAX: usize = 100;
pub const USERNAME_MAX: usize = 64;
pub const DISPLAY_NAME_MAX: usize = 100;
pub const RECURRENCE_YEARS: std::ops::RangeInclusive<i32> = 1..=50;
pub const PASSWORD_MIN: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("dismissal date is set but the employee is not marked as dismissed")]
    DismissalDateWithoutFlag,
    #[error("employee is marked as dismissed but no dismissal date is given")]
    DismissedWithoutDate,
    #[error("birth date cannot be in the future")]
    BirthDateInFuture,
    #[error("dismissal date cannot be earlier than hire date")]
    DismissalBeforeHire,
    #[error("recurrence period must be between {min} and {max} years")]
    RecurrenceOutOfRange { min: i32, max: i32 },
    #[error("completion date cannot be in the future")]
    CompletionInFuture,
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApiError::Validation(value.to_string())
    }
}

/// Trim and require a non-empty value within `max` characters.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Trim; blank collapses to `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: Option<usize>,
) -> Result<Option<String>, ValidationError> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Some(max) = max {
        if trimmed.chars().count() > max {
            return Err(ValidationError::TooLong { field, max });
        }
    }
    Ok(Some(trimmed.to_string()))
}

pub fn recurrence_years(value: Option<i32>) -> Result<Option<i32>, ValidationError> {
    match value {
        Some(years) if !RECURRENCE_YEARS.contains(&years) => {
            Err(ValidationError::RecurrenceOutOfRange {
                min: *RECURRENCE_YEARS.start(),
                max: *RECURRENCE_YEARS.end(),
            })
        }
        other => Ok(other),
    }
}

pub fn completion_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if date > today {
        return Err(ValidationError::CompletionInFuture);
    }
    Ok(date)
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(ValidationError::TooShort {
            field: "password",
            min: PASSWORD_MIN,
        });
    }
    Ok(())
}

/// Employee fields as submitted, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmployeeDraft {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub birth_date: Option<NaiveDate>,
    pub position_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub hire_date: Option<NaiveDate>,
    pub is_dismissed: bool,
    pub dismissal_date: Option<NaiveDate>,
    pub is_on_maternity_leave: bool,
    pub is_external_part_time: bool,
    pub is_safety_commission_member: bool,
}

impl EmployeeDraft {
    /// Normalize names and enforce the employee invariants.
    pub fn validate(mut self, today: NaiveDate) -> Result<Self, ValidationError> {
        self.last_name = required_text("lastName", &self.last_name, PERSON_NAME_MAX)?;
        self.first_name = required_text("firstName", &self.first_name, PERSON_NAME_MAX)?;
        self.middle_name = optional_text(
            "middleName",
            Some(self.middle_name.as_str()),
            Some(PERSON_NAME_MAX),
        )?
        .unwrap_or_default();

        match (self.is_dismissed, self.dismissal_date) {
            (false, Some(_)) => return Err(ValidationError::DismissalDateWithoutFlag),
            (true, None) => return Err(ValidationError::DismissedWithoutDate),
            _ => {}
        }
        if self.birth_date.is_some_and(|born| born > today) {
            return Err(ValidationError::BirthDateInFuture);
        }
        if let (Some(hired), Some(dismissed)) = (self.hire_date, self.dismissal_date) {
            if dismissed < hired {
                return Err(ValidationError::DismissalBeforeHire);
            }
        }
        Ok(self)
    }
}
