//! Parser selection from a handler's declared data parameter.
//!
//! A handler describes the one data parameter it takes (besides the request)
//! with a [`DataParam`]. [`Parser::select`] turns that declaration into the
//! strategy run on every merged payload:
//!
//! | Declaration | Strategy | On failure |
//! |-------------|----------|------------|
//! | [`DataParam::Untyped`], [`DataParam::Any`] | passthrough | never fails |
//! | [`DataParam::Model`] | coerce scalars, then `validator::Validate` | 422, field list |
//! | [`DataParam::Record`] | strict `serde_json` construction | 422, `{"errors": [...]}` |
//! | [`DataParam::Plain`] | exact shape check | 422, `{"error": "..."}` |

use serde::de::DeserializeOwned;
use serde_json::Value;
use sift_core::coerce;
use sift_core::{FieldError, Payload, SiftError, SiftResult, ValidationReport};
use std::any::Any;
use std::fmt;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// A parsed, type-erased handler argument.
pub type BoxedValue = Box<dyn Any + Send>;

/// Converts a merged payload into a typed value.
pub type ParseFn = fn(&Value) -> Result<BoxedValue, ValidationReport>;

/// A concrete Rust type a payload is parsed into.
#[derive(Clone, Copy)]
pub struct TypedBinding {
    type_name: &'static str,
    parse: ParseFn,
}

impl TypedBinding {
    /// Returns the bound type's name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Parses `value` into the bound type.
    pub fn parse(&self, value: &Value) -> Result<BoxedValue, ValidationReport> {
        (self.parse)(value)
    }
}

impl fmt::Debug for TypedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedBinding")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Runtime shape expected by a plain-typed parameter.
///
/// Element and key types are not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    /// A key to value mapping.
    Mapping,
    /// A sequence.
    List,
    /// A string.
    Str,
    /// An integer.
    Int,
    /// A float.
    Float,
    /// A boolean.
    Bool,
}

impl PayloadShape {
    /// Returns the shape's short name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mapping => "dict",
            Self::List => "list",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }

    /// Returns `true` if `payload` has exactly this shape.
    pub fn matches(self, payload: &Payload) -> bool {
        match payload {
            Payload::Record(_) => self == Self::Mapping,
            Payload::List(_) => self == Self::List,
        }
    }
}

/// The declared type of a handler's data parameter.
#[derive(Debug, Clone, Copy)]
pub enum DataParam {
    /// Declared without a type.
    Untyped,
    /// Declared as accepting anything.
    Any,
    /// A validation model: scalars are coerced, then `Validate` runs.
    Model(TypedBinding),
    /// A plain record: built strictly, no coercion.
    Record(TypedBinding),
    /// A plain value type checked by shape only.
    Plain(PayloadShape),
}

impl DataParam {
    /// Declares a validation model parameter.
    pub fn model<T>() -> Self
    where
        T: DeserializeOwned + Validate + Send + 'static,
    {
        Self::Model(TypedBinding {
            type_name: std::any::type_name::<T>(),
            parse: parse_model::<T>,
        })
    }

    /// Declares a plain record parameter.
    pub fn record<T>() -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self::Record(TypedBinding {
            type_name: std::any::type_name::<T>(),
            parse: parse_record::<T>,
        })
    }

    /// Declares a plain-typed parameter.
    pub const fn plain(shape: PayloadShape) -> Self {
        Self::Plain(shape)
    }
}

/// The data parameters a handler declares, excluding the request itself.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<DataParam>,
}

impl Signature {
    /// A handler taking only the request.
    pub fn none() -> Self {
        Self::default()
    }

    /// A handler taking the request and one data parameter.
    pub fn single(param: DataParam) -> Self {
        Self {
            params: vec![param],
        }
    }

    /// A handler with an arbitrary parameter list.
    pub fn new(params: Vec<DataParam>) -> Self {
        Self { params }
    }

    /// Returns the declared parameters.
    pub fn params(&self) -> &[DataParam] {
        &self.params
    }

    /// Returns the single data parameter, if any.
    ///
    /// More than one data parameter cannot be served.
    pub fn data_param(&self) -> SiftResult<Option<&DataParam>> {
        match self.params.as_slice() {
            [] => Ok(None),
            [param] => Ok(Some(param)),
            params => Err(SiftError::configuration(format!(
                "handler declares {} data parameters; at most one is supported",
                params.len()
            ))),
        }
    }

    /// Checks that the signature can be served.
    pub fn validate(&self) -> SiftResult<()> {
        self.data_param().map(|_| ())
    }
}

/// Output of a parser.
pub enum Parsed {
    /// The payload, unchanged.
    Payload(Payload),
    /// A typed value built from the payload.
    Value(BoxedValue),
}

impl fmt::Debug for Parsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload(payload) => f.debug_tuple("Payload").field(payload).finish(),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// A parse strategy.
#[derive(Debug, Clone, Copy)]
pub enum Parser {
    /// Returns the payload unchanged.
    Passthrough,
    /// Coerce and validate into a model.
    Model(TypedBinding),
    /// Strictly construct a record.
    Record(TypedBinding),
    /// Check the payload's shape.
    Shape(PayloadShape),
}

impl Parser {
    /// Selects the strategy for a declared parameter.
    pub const fn select(param: &DataParam) -> Self {
        match *param {
            DataParam::Untyped | DataParam::Any => Self::Passthrough,
            DataParam::Model(binding) => Self::Model(binding),
            DataParam::Record(binding) => Self::Record(binding),
            DataParam::Plain(shape) => Self::Shape(shape),
        }
    }

    /// Selects the strategy for a signature.
    ///
    /// `Ok(None)` means the handler takes no data and needs no parser.
    pub fn for_signature(signature: &Signature) -> SiftResult<Option<Self>> {
        Ok(signature.data_param()?.map(Self::select))
    }

    /// Returns a short strategy name for logs.
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Model(_) => "model",
            Self::Record(_) => "record",
            Self::Shape(_) => "shape",
        }
    }

    /// Parses a merged payload.
    pub async fn parse(&self, payload: Payload) -> SiftResult<Parsed> {
        match self {
            Self::Passthrough => Ok(Parsed::Payload(payload)),
            Self::Model(binding) | Self::Record(binding) => {
                let value = payload.into_value();
                binding
                    .parse(&value)
                    .map(Parsed::Value)
                    .map_err(|report| {
                        tracing::debug!(
                            target_type = binding.type_name(),
                            %report,
                            "Payload rejected"
                        );
                        SiftError::validation(report)
                    })
            }
            Self::Shape(shape) => {
                if shape.matches(&payload) {
                    Ok(Parsed::Payload(payload))
                } else {
                    let actual = match &payload {
                        Payload::Record(_) => PayloadShape::Mapping.name(),
                        Payload::List(_) => PayloadShape::List.name(),
                    };
                    Err(SiftError::validation(ValidationReport::message(format!(
                        "{actual} value passed, expecting {}",
                        shape.name()
                    ))))
                }
            }
        }
    }
}

fn parse_model<T>(value: &Value) -> Result<BoxedValue, ValidationReport>
where
    T: DeserializeOwned + Validate + Send + 'static,
{
    let model: T =
        coerce::from_value(value).map_err(|e| ValidationReport::fields(vec![e.into()]))?;
    model
        .validate()
        .map_err(|errors| ValidationReport::fields(field_errors(&errors)))?;
    Ok(Box::new(model))
}

fn parse_record<T>(value: &Value) -> Result<BoxedValue, ValidationReport>
where
    T: DeserializeOwned + Send + 'static,
{
    serde_json::from_value::<T>(value.clone())
        .map(|record| Box::new(record) as BoxedValue)
        .map_err(|e| ValidationReport::errors(vec![e.to_string()]))
}

/// Flattens `validator` errors into located field errors, sorted by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    flatten(errors, &[], &mut out);
    out
}

fn flatten(errors: &ValidationErrors, prefix: &[String], out: &mut Vec<FieldError>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let mut loc = prefix.to_vec();
        loc.push(field.to_string());
        match kind {
            ValidationErrorsKind::Field(errors) => {
                for error in errors {
                    let msg = error
                        .message
                        .as_ref()
                        .map_or_else(|| format!("invalid value ({})", error.code), ToString::to_string);
                    out.push(FieldError::new(
                        loc.clone(),
                        msg,
                        format!("value_error.{}", error.code),
                    ));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, &loc, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let mut item_loc = loc.clone();
                    item_loc.push(index.to_string());
                    flatten(inner, &item_loc, out);
                }
            }
        }
    }
}
