//! Coders write one value; providers pick a coder for a value.

use std::sync::Arc;

use crate::codec::Encoder;
use crate::error::SpearalError;
use crate::types::Value;

/// Writes a value through the encoder's primitive operations.
pub trait Coder: Send + Sync {
    fn encode(&self, encoder: &mut Encoder<'_>, value: &Value) -> Result<(), SpearalError>;
}

impl<F> Coder for F
where
    F: Fn(&mut Encoder<'_>, &Value) -> Result<(), SpearalError> + Send + Sync,
{
    fn encode(&self, encoder: &mut Encoder<'_>, value: &Value) -> Result<(), SpearalError> {
        self(encoder, value)
    }
}

/// Offers a coder for the values it recognizes.
///
/// Providers are consulted in order and the first `Some` wins; the result is
/// cached per class name, so a provider must answer the same way for every
/// value of a class.
pub trait CoderProvider: Send + Sync {
    fn coder(&self, value: &Value) -> Option<Arc<dyn Coder>>;
}

/// Handles every built-in variant except [`Value::Custom`].
pub struct StandardCoderProvider {
    coder: Arc<dyn Coder>,
}

impl Default for StandardCoderProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardCoderProvider {
    pub fn new() -> Self {
        Self {
            coder: Arc::new(StandardCoder),
        }
    }
}

impl CoderProvider for StandardCoderProvider {
    fn coder(&self, value: &Value) -> Option<Arc<dyn Coder>> {
        match value {
            Value::Custom(_) => None,
            _ => Some(self.coder.clone()),
        }
    }
}

struct StandardCoder;

impl Coder for StandardCoder {
    fn encode(&self, encoder: &mut Encoder<'_>, value: &Value) -> Result<(), SpearalError> {
        match value {
            Value::Null => {
                encoder.write_null();
                Ok(())
            }
            Value::Boolean(b) => {
                encoder.write_bool(*b);
                Ok(())
            }
            Value::Integral(n) => {
                encoder.write_int(*n);
                Ok(())
            }
            Value::Floating(f) => {
                encoder.write_double(*f);
                Ok(())
            }
            Value::BigIntegral(n) => encoder.write_big_integral(n),
            Value::BigFloating(n) => encoder.write_big_floating(n),
            Value::String(s) => encoder.write_string(s),
            Value::ByteArray(bytes) => encoder.write_byte_array(bytes),
            Value::DateTime(dt) => encoder.write_date_time(dt),
            Value::Collection(items) => encoder.write_collection(items),
            Value::Map(entries) => encoder.write_map(entries),
            Value::Enum(e) => encoder.write_enum(e),
            Value::Class(name) => encoder.write_class(name),
            Value::Bean(bean) => encoder.write_bean(bean),
            Value::Custom(custom) => Err(SpearalError::NoCoder(custom.class_name().to_owned())),
        }
    }
}

/// Serves one coder for every value of a single class.
pub struct ClassCoderProvider {
    class_name: String,
    coder: Arc<dyn Coder>,
}

impl ClassCoderProvider {
    pub fn new(class_name: impl Into<String>, coder: impl Coder + 'static) -> Self {
        Self {
            class_name: class_name.into(),
            coder: Arc::new(coder),
        }
    }
}

impl CoderProvider for ClassCoderProvider {
    fn coder(&self, value: &Value) -> Option<Arc<dyn Coder>> {
        (value.class_name() == self.class_name.as_str()).then(|| self.coder.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CustomValue;
    use std::any::Any;

    #[derive(Debug)]
    struct Money;

    impl CustomValue for Money {
        fn class_name(&self) -> &str {
            "Money"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn standard_provider_skips_custom_values() {
        let provider = StandardCoderProvider::new();
        assert!(provider.coder(&Value::from(1)).is_some());
        assert!(provider.coder(&Value::collection([])).is_some());
        assert!(provider.coder(&Value::custom(Money)).is_none());
    }

    #[test]
    fn class_provider_matches_by_name() {
        let provider = ClassCoderProvider::new("Money", |encoder: &mut Encoder<'_>, _: &Value| {
            encoder.write_string("money")
        });
        assert!(provider.coder(&Value::custom(Money)).is_some());
        assert!(provider.coder(&Value::from("Money")).is_none());
    }
}
