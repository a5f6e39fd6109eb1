//! Spearal encoder: one session writing value graphs to a buffer.

use std::sync::Arc;

use bytes::BufMut;

use crate::codec::big_number;
use crate::codec::description;
use crate::codec::reference::ReferenceTable;
use crate::codec::tag::{self, TypeTag};
use crate::codec::var_width::{self, MAX_LENGTH0_U32};
use crate::context::{Context, PropertyFilter};
use crate::error::SpearalError;
use crate::types::{
    Bean, BeanRef, BigNumber, DateTime, EnumValue, Shared, UnsupportedBean, Value,
};

// Largest integral double written in INTEGRAL form (2^52 - 1).
const MAX_INTEGRAL_DOUBLE: i64 = 0x000F_FFFF_FFFF_FFFF;
// Largest magnitude of the scaled-by-1000 FLOATING form.
const MAX_SCALED_DOUBLE: i64 = 0xFFFF_FFFF;
const I64_MIN_F64: f64 = i64::MIN as f64;
const I64_MAX_F64: f64 = i64::MAX as f64;

/// Writes values to `out`, sharing back-reference tables across all writes
/// of the session.
pub struct Encoder<'a> {
    context: &'a Context,
    out: &'a mut dyn BufMut,
    references: ReferenceTable,
    filter: Option<&'a PropertyFilter>,
}

impl<'a> Encoder<'a> {
    pub fn new(context: &'a Context, out: &'a mut dyn BufMut) -> Self {
        Self {
            context,
            out,
            references: ReferenceTable::new(),
            filter: None,
        }
    }

    /// Restricts the properties written for the filtered classes.
    pub fn with_filter(mut self, filter: &'a PropertyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }

    /// Writes any value through the coder of its class. Null needs no coder.
    pub fn write_any(&mut self, value: &Value) -> Result<(), SpearalError> {
        if value.is_null() {
            self.write_null();
            return Ok(());
        }
        match self.context.coder_for(value) {
            Some(coder) => coder.encode(self, value),
            None => {
                let class_name = self.context.introspector().class_name_of(value);
                tracing::warn!(class = %class_name, "no coder for value");
                Err(SpearalError::NoCoder(class_name.into_owned()))
            }
        }
    }

    pub fn write_null(&mut self) {
        self.out.put_u8(TypeTag::Null.id());
    }

    pub fn write_bool(&mut self, value: bool) {
        let tag = if value { TypeTag::True } else { TypeTag::False };
        self.out.put_u8(tag.id());
    }

    pub fn write_int(&mut self, value: i64) {
        let magnitude = value.unsigned_abs();
        let length0 = var_width::length0(magnitude);
        // i64::MIN goes out unsigned: its magnitude 2^63 has no negation.
        let sign = if value < 0 && value != i64::MIN {
            tag::INTEGRAL_NEGATIVE
        } else {
            0
        };
        self.out.put_u8(TypeTag::Integral.id() | sign | length0);
        var_width::put_magnitude(&mut *self.out, magnitude, length0);
    }

    /// Writes a double in the most compact exact form: as an integral, as an
    /// integer scaled by 1000, or as the raw IEEE-754 bits.
    pub fn write_double(&mut self, value: f64) {
        if value.is_finite()
            && !(value == 0.0 && value.is_sign_negative())
            && (I64_MIN_F64..=I64_MAX_F64).contains(&value)
        {
            let truncated = value as i64;
            if value == truncated as f64 {
                if (-MAX_INTEGRAL_DOUBLE..=MAX_INTEGRAL_DOUBLE).contains(&truncated) {
                    self.write_int(truncated);
                    return;
                }
            } else if let Some(scaled) = scaled_by_1000(value) {
                let magnitude = scaled.unsigned_abs();
                let length0 = var_width::length0(magnitude);
                let sign = if scaled < 0 { tag::FLOATING_NEGATIVE } else { 0 };
                self.out
                    .put_u8(TypeTag::Floating.id() | tag::FLOATING_SCALED | sign | length0);
                var_width::put_magnitude(&mut *self.out, magnitude, length0);
                return;
            }
        }
        self.out.put_u8(TypeTag::Floating.id());
        self.out.put_f64(value);
    }

    pub fn write_big_integral(&mut self, value: &BigNumber) -> Result<(), SpearalError> {
        self.write_big_number(TypeTag::BigIntegral, value)
    }

    pub fn write_big_floating(&mut self, value: &BigNumber) -> Result<(), SpearalError> {
        self.write_big_number(TypeTag::BigFloating, value)
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), SpearalError> {
        self.write_string_data(TypeTag::String, value)
    }

    pub fn write_byte_array(&mut self, value: &Arc<[u8]>) -> Result<(), SpearalError> {
        if let Some(index) = self.references.object(&Value::ByteArray(value.clone())) {
            return self.write_object_reference(TypeTag::ByteArray, index);
        }
        self.write_length(TypeTag::ByteArray.id(), value.len())?;
        self.out.put_slice(value);
        Ok(())
    }

    pub fn write_date_time(&mut self, value: &DateTime) -> Result<(), SpearalError> {
        value.validate()?;

        let (unit, subseconds) = value
            .time
            .map_or((tag::SUBSECONDS_NONE, 0), |time| subseconds(time.nanosecond));
        let mut parameterized = TypeTag::DateTime.id();
        if value.date.is_some() {
            parameterized |= tag::DATE_PRESENT;
        }
        if value.time.is_some() {
            parameterized |= tag::TIME_PRESENT | unit;
        }
        self.out.put_u8(parameterized);

        if let Some(date) = &value.date {
            let year = i64::from(date.year) - 2000;
            let magnitude = year.unsigned_abs();
            let length0 = var_width::length0(magnitude);
            let sign = if year < 0 { tag::YEAR_NEGATIVE } else { 0 };
            self.out.put_u8(sign | (length0 << 4) | date.month);
            self.out.put_u8(date.day);
            var_width::put_magnitude(&mut *self.out, magnitude, length0);
        }

        if let Some(time) = &value.time {
            let length0 = if unit == tag::SUBSECONDS_NONE {
                0
            } else {
                var_width::length0(subseconds)
            };
            self.out.put_u8((length0 << 5) | time.hour);
            self.out.put_u8(time.minute);
            self.out.put_u8(time.second);
            if unit != tag::SUBSECONDS_NONE {
                var_width::put_magnitude(&mut *self.out, subseconds, length0);
            }
        }
        Ok(())
    }

    pub fn write_collection(&mut self, items: &Shared<Vec<Value>>) -> Result<(), SpearalError> {
        if let Some(index) = self.references.object(&Value::Collection(items.clone())) {
            return self.write_object_reference(TypeTag::Collection, index);
        }
        // Snapshot so no lock is held while coders run.
        let items = items.read().clone();
        self.write_length(TypeTag::Collection.id(), items.len())?;
        for item in &items {
            self.write_any(item)?;
        }
        Ok(())
    }

    pub fn write_map(&mut self, entries: &Shared<Vec<(Value, Value)>>) -> Result<(), SpearalError> {
        if let Some(index) = self.references.object(&Value::Map(entries.clone())) {
            return self.write_object_reference(TypeTag::Map, index);
        }
        let entries = entries.read().clone();
        self.write_length(TypeTag::Map.id(), entries.len())?;
        for (key, value) in &entries {
            self.write_any(key)?;
            self.write_any(value)?;
        }
        Ok(())
    }

    pub fn write_enum(&mut self, value: &EnumValue) -> Result<(), SpearalError> {
        let remote = self
            .context
            .alias_strategy()
            .local_to_remote_class_name(&value.class_name);
        self.write_string_data(TypeTag::Enum, &remote)?;
        self.write_string_data(TypeTag::String, &value.name)
    }

    pub fn write_class(&mut self, local_class_name: &str) -> Result<(), SpearalError> {
        let remote = self
            .context
            .alias_strategy()
            .local_to_remote_class_name(local_class_name);
        self.write_string_data(TypeTag::Class, &remote)
    }

    pub fn write_bean(&mut self, bean: &BeanRef) -> Result<(), SpearalError> {
        if let Some(index) = self.references.object(&Value::Bean(bean.clone())) {
            return self.write_object_reference(TypeTag::Bean, index);
        }

        let (description, values) = {
            let bean = bean.read();
            let class_name = bean.class_name();
            let properties = self.bean_properties(&**bean)?;
            let selected = match self.filter {
                Some(filter) => filter.select(class_name, &properties),
                None => properties.iter().map(String::as_str).collect(),
            };
            let selected: Vec<&str> = selected
                .into_iter()
                .filter(|property| bean.is_defined(property))
                .collect();
            let values: Vec<Value> = selected
                .iter()
                .map(|property| bean.get(property).unwrap_or(Value::Null))
                .collect();
            let aliases = self.context.alias_strategy();
            // Placeholders keep the class name they were received under.
            let description = match bean.downcast_ref::<UnsupportedBean>() {
                Some(unsupported) => description::describe_as(
                    unsupported.remote_class_name(),
                    class_name,
                    selected.iter().copied(),
                    aliases,
                ),
                None => description::describe(class_name, selected.iter().copied(), aliases),
            };
            (description, values)
        };

        self.write_string_data(TypeTag::Bean, &description)?;
        for value in &values {
            self.write_any(value)?;
        }
        Ok(())
    }

    fn bean_properties(&self, bean: &dyn Bean) -> Result<Vec<String>, SpearalError> {
        let introspector = self.context.introspector();
        if let Some(class) = introspector.class_for_name(bean.class_name()) {
            return Ok(introspector.properties(&class).to_vec());
        }
        match bean.downcast_ref::<UnsupportedBean>() {
            Some(unsupported) => Ok(unsupported.property_names().map(str::to_owned).collect()),
            None => {
                tracing::warn!(class = bean.class_name(), "bean class not registered");
                Err(SpearalError::UnknownClass(bean.class_name().to_owned()))
            }
        }
    }

    fn write_big_number(&mut self, tag: TypeTag, value: &BigNumber) -> Result<(), SpearalError> {
        let repr = value.as_str();
        if let Some(index) = self.references.string(repr) {
            return self.write_string_reference(tag, index);
        }
        // The alphabet is ASCII: one byte per symbol.
        self.write_length(tag.id(), repr.len())?;
        self.out.put_slice(&big_number::pack(repr));
        Ok(())
    }

    fn write_string_data(&mut self, tag: TypeTag, value: &str) -> Result<(), SpearalError> {
        if value.is_empty() {
            self.out.put_u8(tag.id());
            self.out.put_u8(0);
            return Ok(());
        }
        if let Some(index) = self.references.string(value) {
            return self.write_string_reference(tag, index);
        }
        self.write_length(tag.id(), value.len())?;
        self.out.put_slice(value.as_bytes());
        Ok(())
    }

    fn write_string_reference(&mut self, tag: TypeTag, index: usize) -> Result<(), SpearalError> {
        self.write_length(tag.id() | tag::STRING_REFERENCE, index)
    }

    fn write_object_reference(&mut self, tag: TypeTag, index: usize) -> Result<(), SpearalError> {
        self.write_length(tag.id() | tag::OBJECT_REFERENCE, index)
    }

    /// Writes a tag carrying a length or reference index, then the value.
    fn write_length(&mut self, parameterized: u8, value: usize) -> Result<(), SpearalError> {
        let value = u32::try_from(value)
            .map_err(|_| SpearalError::TooLarge(format!("length or index {value}")))?;
        let value = u64::from(value);
        let length0 = var_width::length0(value);
        debug_assert!(length0 <= MAX_LENGTH0_U32);
        self.out.put_u8(parameterized | length0);
        var_width::put_magnitude(&mut *self.out, value, length0);
        Ok(())
    }
}

/// `value * 1000` as an integer when that is exact and fits 32 bits.
///
/// The product is truncated toward zero; when that misses, the neighbour one
/// unit away from zero is tried, absorbing the rounding of the product.
fn scaled_by_1000(value: f64) -> Option<i64> {
    let by_1000 = value * 1000.0;
    if !(I64_MIN_F64..=I64_MAX_F64).contains(&by_1000) {
        return None;
    }
    let truncated = by_1000 as i64;
    let scaled = if truncated as f64 / 1000.0 == value {
        truncated
    } else {
        let away = if truncated < 0 {
            truncated.saturating_sub(1)
        } else {
            truncated.saturating_add(1)
        };
        if away as f64 / 1000.0 != value {
            return None;
        }
        away
    };
    (-MAX_SCALED_DOUBLE..=MAX_SCALED_DOUBLE)
        .contains(&scaled)
        .then_some(scaled)
}

/// Coarsest exact sub-second unit and the count in that unit.
fn subseconds(nanosecond: u32) -> (u8, u64) {
    let nanosecond = u64::from(nanosecond);
    if nanosecond == 0 {
        (tag::SUBSECONDS_NONE, 0)
    } else if nanosecond % 1_000_000 == 0 {
        (tag::SUBSECONDS_MILLIS, nanosecond / 1_000_000)
    } else if nanosecond % 1_000 == 0 {
        (tag::SUBSECONDS_MICROS, nanosecond / 1_000)
    } else {
        (tag::SUBSECONDS_NANOS, nanosecond)
    }
}
