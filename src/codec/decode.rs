//! Spearal decoder: one session reading value graphs from a buffer.

use std::sync::Arc;

use bytes::Buf;

use crate::codec::big_number;
use crate::codec::description;
use crate::codec::reference::ReferenceList;
use crate::codec::tag::{self, TypeTag};
use crate::codec::var_width::{self, ensure_remaining};
use crate::context::{Context, Position};
use crate::error::SpearalError;
use crate::types::{
    BeanRef, BigNumber, Date, DateTime, EnumValue, Shared, Time, UnsupportedBean, Value,
};

/// Reads values from `input`, sharing back-reference tables across all reads
/// of the session.
pub struct Decoder<'a, B: Buf> {
    context: &'a Context,
    input: &'a mut B,
    references: ReferenceList,
    depth: usize,
}

impl<'a, B: Buf> Decoder<'a, B> {
    pub fn new(context: &'a Context, input: &'a mut B) -> Self {
        Self {
            context,
            input,
            references: ReferenceList::new(),
            depth: 0,
        }
    }

    /// Reads the next value of the stream.
    pub fn read_any(&mut self) -> Result<Value, SpearalError> {
        self.read_at(&Position::Root)
    }

    /// Whether unread input remains.
    pub fn has_remaining(&self) -> bool {
        self.input.has_remaining()
    }

    fn read_at(&mut self, position: &Position<'_>) -> Result<Value, SpearalError> {
        let max_depth = self.context.max_depth();
        if self.depth >= max_depth {
            return Err(SpearalError::DepthExceeded(max_depth));
        }
        self.depth += 1;
        let value = self.read_value();
        self.depth -= 1;
        self.context.convert(value?, position)
    }

    fn read_value(&mut self) -> Result<Value, SpearalError> {
        ensure_remaining(&*self.input, 1)?;
        let parameterized = self.input.get_u8();
        let tag = TypeTag::from_parameterized(parameterized)
            .ok_or(SpearalError::UnknownType(parameterized))?;

        match tag {
            TypeTag::Null => Ok(Value::Null),
            TypeTag::True => Ok(Value::Boolean(true)),
            TypeTag::False => Ok(Value::Boolean(false)),
            TypeTag::Integral => self.read_integral(parameterized).map(Value::Integral),
            TypeTag::BigIntegral => self.read_big_number(parameterized).map(Value::BigIntegral),
            TypeTag::Floating => self.read_floating(parameterized).map(Value::Floating),
            TypeTag::BigFloating => self.read_big_number(parameterized).map(Value::BigFloating),
            TypeTag::String => self.read_string_data(parameterized).map(Value::String),
            TypeTag::ByteArray => self.read_byte_array(parameterized),
            TypeTag::DateTime => self.read_date_time(parameterized).map(Value::DateTime),
            TypeTag::Collection => self.read_collection(parameterized),
            TypeTag::Map => self.read_map(parameterized),
            TypeTag::Enum => self.read_enum(parameterized),
            TypeTag::Class => self.read_class(parameterized),
            TypeTag::Bean => self.read_bean(parameterized),
        }
    }

    fn read_integral(&mut self, parameterized: u8) -> Result<i64, SpearalError> {
        let magnitude =
            var_width::get_magnitude(&mut *self.input, parameterized & tag::INTEGRAL_LENGTH0_MASK)?;
        let negative = parameterized & tag::INTEGRAL_NEGATIVE != 0;
        // i64::MIN is written as the unsigned magnitude 2^63. The signed
        // form is accepted as well.
        if magnitude == i64::MIN.unsigned_abs() {
            return Ok(i64::MIN);
        }
        let value = i64::try_from(magnitude).map_err(|_| {
            SpearalError::Protocol(format!("integral magnitude {magnitude} overflows"))
        })?;
        Ok(if negative { -value } else { value })
    }

    fn read_floating(&mut self, parameterized: u8) -> Result<f64, SpearalError> {
        if parameterized & tag::FLOATING_SCALED != 0 {
            let magnitude =
                var_width::get_magnitude(&mut *self.input, parameterized & tag::LENGTH0_MASK)?;
            let value = magnitude as f64 / 1000.0;
            return Ok(if parameterized & tag::FLOATING_NEGATIVE != 0 {
                -value
            } else {
                value
            });
        }
        ensure_remaining(&*self.input, 8)?;
        Ok(self.input.get_f64())
    }

    /// Reads the length or reference index following a tag.
    fn read_length(&mut self, parameterized: u8) -> Result<usize, SpearalError> {
        let value = var_width::get_magnitude(&mut *self.input, parameterized & tag::LENGTH0_MASK)?;
        usize::try_from(value)
            .map_err(|_| SpearalError::TooLarge(format!("length or index {value}")))
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, SpearalError> {
        ensure_remaining(&*self.input, len)?;
        let mut data = vec![0; len];
        self.input.copy_to_slice(&mut data);
        Ok(data)
    }

    fn read_string_data(&mut self, parameterized: u8) -> Result<Arc<str>, SpearalError> {
        let index_or_length = self.read_length(parameterized)?;
        self.read_string_payload(parameterized, index_or_length)
    }

    fn read_string_payload(
        &mut self,
        parameterized: u8,
        index_or_length: usize,
    ) -> Result<Arc<str>, SpearalError> {
        if tag::is_string_reference(parameterized) {
            return self.references.string(index_or_length);
        }
        if index_or_length == 0 {
            return Ok(Arc::from(""));
        }
        let data = self.read_bytes(index_or_length)?;
        let value: Arc<str> = Arc::from(String::from_utf8(data)?);
        self.references.push_string(value.clone());
        Ok(value)
    }

    fn read_big_number(&mut self, parameterized: u8) -> Result<BigNumber, SpearalError> {
        let index_or_count = self.read_length(parameterized)?;
        if tag::is_string_reference(parameterized) {
            return BigNumber::from_shared(self.references.string(index_or_count)?);
        }
        let packed = self.read_bytes(big_number::packed_len(index_or_count))?;
        let repr: Arc<str> = Arc::from(big_number::unpack(&packed, index_or_count)?);
        let value = BigNumber::from_shared(repr.clone())?;
        self.references.push_string(repr);
        Ok(value)
    }

    fn read_byte_array(&mut self, parameterized: u8) -> Result<Value, SpearalError> {
        let index_or_length = self.read_length(parameterized)?;
        if tag::is_object_reference(parameterized) {
            return self.object_reference(TypeTag::ByteArray, index_or_length);
        }
        let data = self.read_bytes(index_or_length)?;
        let value = Value::ByteArray(Arc::from(data));
        self.references.push_object(value.clone());
        Ok(value)
    }

    fn read_date_time(&mut self, parameterized: u8) -> Result<DateTime, SpearalError> {
        let mut value = DateTime::default();

        if parameterized & tag::DATE_PRESENT != 0 {
            ensure_remaining(&*self.input, 2)?;
            let month_byte = self.input.get_u8();
            let day = self.input.get_u8();
            let magnitude = var_width::get_magnitude(&mut *self.input, (month_byte >> 4) & 0x03)?;
            // At most four bytes: always fits an i64.
            let offset = magnitude as i64;
            let year = if month_byte & tag::YEAR_NEGATIVE != 0 {
                2000 - offset
            } else {
                2000 + offset
            };
            let year = i32::try_from(year)
                .map_err(|_| SpearalError::InvalidDateTime(format!("year {year} out of range")))?;
            value.date = Some(Date::new(year, month_byte & 0x0F, day)?);
        }

        if parameterized & tag::TIME_PRESENT != 0 {
            ensure_remaining(&*self.input, 3)?;
            let hour_byte = self.input.get_u8();
            let minute = self.input.get_u8();
            let second = self.input.get_u8();
            let nanosecond = match parameterized & tag::SUBSECONDS_MASK {
                tag::SUBSECONDS_NONE => 0,
                unit => {
                    let count = var_width::get_magnitude(&mut *self.input, hour_byte >> 5)?;
                    let factor = match unit {
                        tag::SUBSECONDS_NANOS => 1,
                        tag::SUBSECONDS_MICROS => 1_000,
                        _ => 1_000_000,
                    };
                    count
                        .checked_mul(factor)
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| {
                            SpearalError::InvalidDateTime(format!(
                                "sub-second count {count} out of range"
                            ))
                        })?
                }
            };
            value.time = Some(Time::new(
                hour_byte & tag::HOUR_MASK,
                minute,
                second,
                nanosecond,
            )?);
        }

        Ok(value)
    }

    fn read_collection(&mut self, parameterized: u8) -> Result<Value, SpearalError> {
        let index_or_count = self.read_length(parameterized)?;
        if tag::is_object_reference(parameterized) {
            return self.object_reference(TypeTag::Collection, index_or_count);
        }
        // Every item takes at least one byte.
        let capacity = index_or_count.min(self.input.remaining());
        let items = Shared::new(Vec::with_capacity(capacity));
        // Registered before the items so they can refer back to it.
        self.references.push_object(Value::Collection(items.clone()));
        for index in 0..index_or_count {
            let item = self.read_at(&Position::CollectionIndex(index))?;
            items.write().push(item);
        }
        Ok(Value::Collection(items))
    }

    fn read_map(&mut self, parameterized: u8) -> Result<Value, SpearalError> {
        let index_or_count = self.read_length(parameterized)?;
        if tag::is_object_reference(parameterized) {
            return self.object_reference(TypeTag::Map, index_or_count);
        }
        let capacity = index_or_count.min(self.input.remaining() / 2);
        let entries = Shared::new(Vec::with_capacity(capacity));
        self.references.push_object(Value::Map(entries.clone()));
        for _ in 0..index_or_count {
            let key = self.read_at(&Position::MapKey)?;
            let value = self.read_at(&Position::MapValue)?;
            entries.write().push((key, value));
        }
        Ok(Value::Map(entries))
    }

    fn read_enum(&mut self, parameterized: u8) -> Result<Value, SpearalError> {
        let remote_class_name = self.read_string_data(parameterized)?;
        ensure_remaining(&*self.input, 1)?;
        let name_tag = self.input.get_u8();
        if TypeTag::from_parameterized(name_tag) != Some(TypeTag::String) {
            return Err(SpearalError::Protocol(format!(
                "enum constant of {remote_class_name} must be a string, got tag 0x{name_tag:02X}"
            )));
        }
        let name = self.read_string_data(name_tag)?;
        let class_name = self
            .context
            .alias_strategy()
            .remote_to_local_class_name(&remote_class_name);
        Ok(Value::Enum(EnumValue {
            class_name: Arc::from(class_name),
            name,
        }))
    }

    fn read_class(&mut self, parameterized: u8) -> Result<Value, SpearalError> {
        let remote_class_name = self.read_string_data(parameterized)?;
        let class_name = self
            .context
            .alias_strategy()
            .remote_to_local_class_name(&remote_class_name);
        Ok(Value::Class(Arc::from(class_name)))
    }

    fn read_bean(&mut self, parameterized: u8) -> Result<Value, SpearalError> {
        let index_or_length = self.read_length(parameterized)?;
        if tag::is_object_reference(parameterized) {
            return self.object_reference(TypeTag::Bean, index_or_length);
        }
        let context = self.context;
        let raw = self.read_string_payload(parameterized, index_or_length)?;
        let description = description::parse(&raw, context.alias_strategy())?;
        let introspector = context.introspector();

        let Some(class) = introspector.class_for_name(&description.local_class_name) else {
            tracing::debug!(
                class = %description.remote_class_name,
                "unknown class, decoding placeholder"
            );
            let bean: BeanRef = Shared::new(Box::new(UnsupportedBean::new(
                description.local_class_name.as_str(),
                description.remote_class_name.as_str(),
            )));
            self.references.push_object(Value::Bean(bean.clone()));
            for property in &description.local_property_names {
                let value = self.read_at(&Position::Property {
                    class_name: &description.local_class_name,
                    property: property.as_str(),
                })?;
                bean.write().set(property, value)?;
            }
            return Ok(Value::Bean(bean));
        };

        let properties = introspector.properties(&class);
        let bean: BeanRef = Shared::new(class.instantiate());
        // Registered before the properties so cycles resolve to this instance.
        self.references.push_object(Value::Bean(bean.clone()));
        for property in &description.local_property_names {
            let value = self.read_at(&Position::Property {
                class_name: &description.local_class_name,
                property: property.as_str(),
            })?;
            if properties.iter().any(|p| p == property) {
                bean.write().set(property, value)?;
            } else {
                tracing::trace!(
                    class = %description.local_class_name,
                    property = %property,
                    "ignoring undeclared property"
                );
            }
        }
        Ok(Value::Bean(bean))
    }

    fn object_reference(&self, expected: TypeTag, index: usize) -> Result<Value, SpearalError> {
        let value = self.references.object(index)?;
        let matches = matches!(
            (expected, value),
            (TypeTag::ByteArray, Value::ByteArray(_))
                | (TypeTag::Collection, Value::Collection(_))
                | (TypeTag::Map, Value::Map(_))
                | (TypeTag::Bean, Value::Bean(_))
        );
        if !matches {
            return Err(SpearalError::Protocol(format!(
                "object reference {index} is a {}, expected {expected:?}",
                value.class_name()
            )));
        }
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;
    use crate::context::{
        BasicAliasStrategy, ClassConverterProvider, ClassDescriptor, RegistryIntrospector,
    };
    use crate::types::DynamicBean;

    fn registry() -> RegistryIntrospector {
        RegistryIntrospector::new()
            .with_class(ClassDescriptor::new("Person", ["name", "age", "friend"]))
            .with_class(ClassDescriptor::new("Node", ["label", "next"]))
    }

    fn round_trip_with(context: &Context, value: &Value) -> (Value, usize) {
        let bytes = context.encode(value).unwrap();
        (context.decode(&bytes).unwrap(), bytes.len())
    }

    fn round_trip(value: &Value) -> (Value, usize) {
        round_trip_with(&Context::default(), value)
    }

    fn decode(data: &[u8]) -> Result<Value, SpearalError> {
        Context::default().decode(data)
    }

    #[test]
    fn integrals() {
        let cases = [
            (0_i64, 2),
            (255, 2),
            (-255, 2),
            (256, 3),
            (0xFF_FFFF, 4),
            (-0xFF_FFFF, 4),
            (i64::MAX, 9),
            (i64::MIN, 9),
            (i64::MIN + 1, 9),
        ];
        for (n, size) in cases {
            let (decoded, len) = round_trip(&Value::from(n));
            assert_eq!(decoded, Value::from(n));
            assert_eq!(len, size, "size of {n}");
        }
    }

    #[test]
    fn doubles() {
        let cases = [
            (0.1, 2),
            (-0.1, 2),
            (0.256, 3),
            (4_294_967.295, 5),
            (-4_294_967.295, 5),
            (4_294_967.296, 9),
            (0x000F_FFFF_FFFF_FFFF_i64 as f64, 8),
            (0x0010_0000_0000_0000_i64 as f64, 9),
            (f64::INFINITY, 9),
            (f64::NEG_INFINITY, 9),
            (f64::MAX, 9),
            (f64::MIN_POSITIVE, 9),
            (std::f64::consts::PI, 9),
        ];
        for (f, size) in cases {
            let (decoded, len) = round_trip(&Value::from(f));
            assert_eq!(decoded.as_f64(), Some(f), "value {f}");
            assert_eq!(len, size, "size of {f}");
        }
    }

    #[test]
    fn nan_and_negative_zero_survive() {
        let (decoded, len) = round_trip(&Value::from(f64::NAN));
        assert!(decoded.as_f64().unwrap().is_nan());
        assert_eq!(len, 9);

        let (decoded, len) = round_trip(&Value::from(-0.0));
        let f = decoded.as_f64().unwrap();
        assert!(f == 0.0 && f.is_sign_negative());
        assert_eq!(len, 9);
    }

    #[test]
    fn int_min_is_written_unsigned() {
        let bytes = [0x17, 0x80, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(decode(&bytes).unwrap(), Value::from(i64::MIN));
        assert_eq!(decode(&[0x1F, 0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap(), Value::from(i64::MIN));
        assert_eq!(&Context::default().encode(&Value::from(i64::MIN)).unwrap()[..], bytes);
    }

    #[test]
    fn strings_cover_every_scalar_value() {
        let all: String = (0u32..=0x10_FFFF).filter_map(char::from_u32).collect();
        let (decoded, len) = round_trip(&Value::from(all.as_str()));
        assert_eq!(decoded.as_str(), Some(all.as_str()));
        assert_eq!(len, all.len() + 4);
    }

    #[test]
    fn strings() {
        let (decoded, len) = round_trip(&Value::from(""));
        assert_eq!(decoded, Value::from(""));
        assert_eq!(len, 2);

        let printable: String = (0x20u8..=0x7E).map(char::from).collect();
        let (decoded, len) = round_trip(&Value::from(printable.as_str()));
        assert_eq!(decoded.as_str(), Some(printable.as_str()));
        assert_eq!(len, printable.len() + 2);

        let unicode = "Grüße, 世界 🎉";
        assert_eq!(round_trip(&Value::from(unicode)).0.as_str(), Some(unicode));
    }

    #[test]
    fn repeated_strings_decode_to_one_allocation() {
        let value = Value::collection([Value::from("shared"), Value::from("shared")]);
        let (decoded, _) = round_trip(&value);
        let items = decoded.as_collection().unwrap().read().clone();
        match (&items[0], &items[1]) {
            (Value::String(a), Value::String(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("unexpected items {other:?}"),
        }
    }

    #[test]
    fn big_numbers() {
        for repr in ["0", "-12345678901234567890", "+1.5E-300", "9.99"] {
            let value = Value::BigFloating(BigNumber::new(repr).unwrap());
            assert_eq!(round_trip(&value).0, value);
        }
        let n = Value::BigIntegral(BigNumber::from(u128::MAX));
        assert_eq!(round_trip(&n).0, n);
    }

    #[test]
    fn date_times() {
        let values = [
            DateTime::date_only(Date::new(2014, 6, 12).unwrap()),
            DateTime::date_only(Date::new(-44, 3, 15).unwrap()),
            DateTime::time_only(Time::new(0, 0, 0, 0).unwrap()),
            DateTime::new(
                Date::new(1969, 12, 31).unwrap(),
                Time::new(23, 59, 59, 999_999_999).unwrap(),
            ),
            DateTime::new(
                Date::new(275_760, 9, 13).unwrap(),
                Time::new(12, 30, 0, 250_000).unwrap(),
            ),
            DateTime::default(),
        ];
        for dt in values {
            assert_eq!(round_trip(&Value::from(dt)).0, Value::from(dt), "{dt}");
        }
    }

    #[test]
    fn collections_and_maps() {
        let value = Value::map([
            (Value::from("list"), Value::collection([Value::from(1), Value::Null])),
            (Value::from(2), Value::from(vec![0u8, 255])),
            (Value::Null, Value::collection([])),
        ]);
        assert_eq!(round_trip(&value).0, value);
    }

    #[test]
    fn shared_objects_keep_identity() {
        let inner = Value::collection([Value::from(1)]);
        let bytes = Value::from(vec![9u8]);
        let value = Value::collection([inner.clone(), inner, bytes.clone(), bytes]);
        let (decoded, _) = round_trip(&value);
        let items = decoded.as_collection().unwrap().read().clone();
        assert!(items[0].as_collection().unwrap().ptr_eq(items[1].as_collection().unwrap()));
        match (&items[2], &items[3]) {
            (Value::ByteArray(a), Value::ByteArray(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("unexpected items {other:?}"),
        }
    }

    #[test]
    fn cyclic_collection() {
        let list = Shared::new(Vec::new());
        list.write().push(Value::from("head"));
        list.write().push(Value::Collection(list.clone()));
        let (decoded, _) = round_trip(&Value::Collection(list.clone()));
        list.write().clear();

        let decoded = decoded.as_collection().unwrap().clone();
        let items = decoded.read().clone();
        assert_eq!(items[0], Value::from("head"));
        assert!(items[1].as_collection().unwrap().ptr_eq(&decoded));
        drop(items);
        decoded.write().clear();
    }

    #[test]
    fn enums_and_classes() {
        let context = Context::builder()
            .alias_strategy(BasicAliasStrategy::new().class_alias("Color", "com.acme.Color"))
            .build();
        let value = Value::collection([
            Value::enumeration("Color", "RED"),
            Value::enumeration("Color", "GREEN"),
            Value::class("Color"),
            Value::class("Unaliased"),
        ]);
        let bytes = context.encode(&value).unwrap();
        assert!(bytes.windows(14).any(|w| w == b"com.acme.Color"));
        assert_eq!(context.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn beans_round_trip_with_shared_references() {
        let context = Context::builder().introspector(registry()).build();
        let ada = Value::bean(DynamicBean::new("Person").with("name", "Ada").with("age", 36));
        let bob = Value::bean(
            DynamicBean::new("Person")
                .with("name", "Bob")
                .with("friend", ada.clone()),
        );
        let value = Value::collection([ada, bob]);
        let (decoded, _) = round_trip_with(&context, &value);

        let items = decoded.as_collection().unwrap().read().clone();
        let ada = items[0].as_bean().unwrap();
        let bob = items[1].as_bean().unwrap().read();
        assert_eq!(ada.read().get("name"), Some(Value::from("Ada")));
        assert_eq!(ada.read().get("age"), Some(Value::from(36)));
        assert!(!ada.read().is_defined("friend"));
        let friend = bob.get("friend").unwrap();
        assert!(friend.as_bean().unwrap().ptr_eq(ada));
    }

    #[test]
    fn cyclic_beans() {
        let context = Context::builder().introspector(registry()).build();
        let node = Shared::new(Box::new(DynamicBean::new("Node").with("label", "loop"))
            as Box<dyn crate::types::Bean>);
        node.write()
            .set("next", Value::Bean(node.clone()))
            .unwrap();

        let (decoded, _) = round_trip_with(&context, &Value::Bean(node.clone()));
        node.write().set("next", Value::Null).unwrap();

        let decoded = decoded.as_bean().unwrap().clone();
        let next = decoded.read().get("next").unwrap();
        assert!(next.as_bean().unwrap().ptr_eq(&decoded));
        assert_eq!(decoded.read().get("label"), Some(Value::from("loop")));
        decoded.write().set("next", Value::Null).unwrap();
    }

    #[test]
    fn aliased_beans() {
        let context = Context::builder()
            .introspector(registry())
            .alias_strategy(
                BasicAliasStrategy::new()
                    .class_alias("Person", "org.example.PersonEntity")
                    .properties_alias("Person", [("name", "full_name")]),
            )
            .build();
        let person = Value::bean(DynamicBean::new("Person").with("name", "Ada"));
        let bytes = context.encode(&person).unwrap();
        let description = b"org.example.PersonEntity#full_name";
        assert_eq!(&bytes[2..2 + description.len()], description);

        let decoded = context.decode(&bytes).unwrap();
        let bean = decoded.as_bean().unwrap().read();
        assert_eq!(bean.class_name(), "Person");
        assert_eq!(bean.get("name"), Some(Value::from("Ada")));
    }

    #[test]
    fn unknown_classes_decode_to_placeholders() {
        let sender = Context::builder().introspector(registry()).build();
        let bytes = sender
            .encode(&Value::bean(
                DynamicBean::new("Person").with("name", "Ada").with("age", 36),
            ))
            .unwrap();

        let receiver = Context::default();
        let decoded = receiver.decode(&bytes).unwrap();
        {
            let bean = decoded.as_bean().unwrap().read();
            let placeholder = bean.downcast_ref::<UnsupportedBean>().unwrap();
            assert_eq!(placeholder.remote_class_name(), "Person");
            assert_eq!(
                placeholder.property_names().collect::<Vec<_>>(),
                ["name", "age"]
            );
        }

        // The placeholder re-encodes to the same bytes.
        assert_eq!(receiver.encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn placeholders_re_encode_under_the_received_class_name() {
        let sender = Context::builder()
            .introspector(registry())
            .alias_strategy(BasicAliasStrategy::new().class_alias("Person", "org.acme.Person"))
            .build();
        let bytes = sender
            .encode(&Value::bean(DynamicBean::new("Person").with("name", "Ada")))
            .unwrap();

        let receiver = Context::builder()
            .alias_strategy(BasicAliasStrategy::new().remote_to_local_aliaser(|name: &str| {
                name.rsplit('.').next().unwrap_or(name).to_owned()
            }))
            .build();
        let decoded = receiver.decode(&bytes).unwrap();
        {
            let bean = decoded.as_bean().unwrap().read();
            assert_eq!(bean.class_name(), "Person");
            let placeholder = bean.downcast_ref::<UnsupportedBean>().unwrap();
            assert_eq!(placeholder.remote_class_name(), "org.acme.Person");
        }
        assert_eq!(receiver.encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn undeclared_properties_are_skipped() {
        let sender = Context::builder()
            .introspector(
                RegistryIntrospector::new()
                    .with_class(ClassDescriptor::new("Person", ["name", "nickname"])),
            )
            .build();
        let bytes = sender
            .encode(&Value::bean(
                DynamicBean::new("Person")
                    .with("name", "Ada")
                    .with("nickname", "Countess"),
            ))
            .unwrap();

        let receiver = Context::builder().introspector(registry()).build();
        let decoded = receiver.decode(&bytes).unwrap();
        let bean = decoded.as_bean().unwrap().read();
        assert_eq!(bean.get("name"), Some(Value::from("Ada")));
        assert!(!bean.is_defined("nickname"));
    }

    #[test]
    fn converters_see_positions() {
        let context = Context::builder()
            .introspector(registry())
            .converter_provider(ClassConverterProvider::new(
                "i64",
                |value: Value, position: &Position<'_>| match position {
                    Position::Property {
                        class_name: "Person",
                        property: "age",
                    } => Ok(Value::from(value.as_int().unwrap_or(0) + 1)),
                    Position::CollectionIndex(_) => Ok(Value::from("indexed")),
                    _ => Ok(value),
                },
            ))
            .build();

        let value = Value::collection([
            Value::from(1),
            Value::bean(DynamicBean::new("Person").with("age", 41)),
        ]);
        let (decoded, _) = round_trip_with(&context, &value);
        let items = decoded.as_collection().unwrap().read().clone();
        assert_eq!(items[0], Value::from("indexed"));
        assert_eq!(
            items[1].as_bean().unwrap().read().get("age"),
            Some(Value::from(42))
        );

        // Root values are handed over with the root position.
        assert_eq!(round_trip_with(&context, &Value::from(7)).0, Value::from(7));
    }

    #[test]
    fn several_values_share_one_session() {
        let context = Context::default();
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&context, &mut out);
        encoder.write_string("again").unwrap();
        encoder.write_string("again").unwrap();
        drop(encoder);
        assert_eq!(&out[7..], [0x54, 0x00]);

        let mut input = &out[..];
        let mut decoder = Decoder::new(&context, &mut input);
        assert_eq!(decoder.read_any().unwrap(), Value::from("again"));
        assert!(decoder.has_remaining());
        assert_eq!(decoder.read_any().unwrap(), Value::from("again"));
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn unknown_tags() {
        for byte in [0x03, 0x0F, 0xD0, 0xE5, 0xFF] {
            assert!(
                matches!(decode(&[byte]), Err(SpearalError::UnknownType(b)) if b == byte),
                "byte 0x{byte:02X}"
            );
        }
    }

    #[test]
    fn truncated_input() {
        for data in [
            &[][..],
            &[0x11, 0x01][..],
            &[0x30, 0, 0, 0][..],
            &[0x50, 0x05, b'a'][..],
            &[0x80, 0x02, 0x00][..],
            &[0x7C, 0x06][..],
        ] {
            assert!(
                matches!(decode(data), Err(SpearalError::Truncated { .. })),
                "input {data:02X?}"
            );
        }
    }

    #[test]
    fn invalid_references() {
        assert!(matches!(
            decode(&[0x54, 0x00]),
            Err(SpearalError::InvalidReference { index: 0, len: 0, .. })
        ));
        assert!(matches!(
            decode(&[0x88, 0x00]),
            Err(SpearalError::InvalidReference { index: 0, len: 0, .. })
        ));
        // A collection back-reference pointing at a byte array.
        assert!(matches!(
            decode(&[0x80, 0x02, 0x60, 0x00, 0x88, 0x01]),
            Err(SpearalError::Protocol(_))
        ));
    }

    #[test]
    fn malformed_payloads() {
        assert!(matches!(
            decode(&[0x50, 0x01, 0xFF]),
            Err(SpearalError::InvalidUtf8(_))
        ));
        assert!(matches!(
            decode(&[0x20, 0x01, 0xF0]),
            Err(SpearalError::InvalidBigNumber(_))
        ));
        // Month 13.
        assert!(matches!(
            decode(&[0x78, 0x0D, 0x01, 0x00]),
            Err(SpearalError::InvalidDateTime(_))
        ));
        // Magnitude above 2^63.
        assert!(matches!(
            decode(&[0x17, 0x80, 0, 0, 0, 0, 0, 0, 1]),
            Err(SpearalError::Protocol(_))
        ));
        // Enum constant that is not a string.
        assert!(matches!(
            decode(&[0xA0, 0x01, b'E', 0x10, 0x00]),
            Err(SpearalError::Protocol(_))
        ));
    }

    #[test]
    fn nesting_limit() {
        let context = Context::builder().max_depth(3).build();
        assert!(context.decode(&[0x80, 0x01, 0x80, 0x00]).is_ok());
        assert!(matches!(
            context.decode(&[0x80, 0x01, 0x80, 0x01, 0x80, 0x01, 0x00]),
            Err(SpearalError::DepthExceeded(3))
        ));
    }

    #[test]
    fn huge_declared_count_does_not_preallocate() {
        // Claims u32::MAX items but holds none.
        assert!(matches!(
            decode(&[0x83, 0xFF, 0xFF, 0xFF, 0xFF]),
            Err(SpearalError::Truncated { .. })
        ));
    }
}
