//! Validation of backend-specific configuration tables.
//!
//! Each pluggable backend receives its own raw TOML table from the
//! configuration file. A [`Schema`] describes which keys the table may carry
//! so that typos and wrong types fail at startup instead of being ignored.

use thiserror::Error;

/// Errors that can occur while validating a configuration table.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Unknown field: {0}")]
	UnknownField(String),
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
		}
	}
}

/// A named field of a [`Schema`].
#[derive(Debug)]
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
		}
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		let mismatch = || ValidationError::TypeMismatch {
			field: self.name.clone(),
			expected: self.field_type.name().to_string(),
			actual: value.type_str().to_string(),
		};

		match &self.field_type {
			FieldType::String => value.as_str().map(|_| ()).ok_or_else(mismatch),
			FieldType::Boolean => value.as_bool().map(|_| ()).ok_or_else(mismatch),
			FieldType::Integer { min, max } => {
				let int_val = value.as_integer().ok_or_else(mismatch)?;
				if min.is_some_and(|min| int_val < min) || max.is_some_and(|max| int_val > max) {
					return Err(ValidationError::InvalidValue {
						field: self.name.clone(),
						message: format!("{} is outside [{:?}, {:?}]", int_val, min, max),
					});
				}
				Ok(())
			},
		}
	}
}

/// Required and optional fields of a configuration table.
///
/// Keys that are neither required nor optional are rejected.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for (key, value) in table {
			if self.required.iter().any(|f| &f.name == key) {
				continue;
			}
			match self.optional.iter().find(|f| &f.name == key) {
				Some(field) => field.check(value)?,
				None => return Err(ValidationError::UnknownField(key.clone())),
			}
		}

		Ok(())
	}
}

/// Implemented by every backend to describe its configuration table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
